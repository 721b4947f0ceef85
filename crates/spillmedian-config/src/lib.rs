//! TOML configuration for spillmedian hosts.
//!
//! ```toml
//! [sort]
//! work_mem_kb = 5000
//! spill_dir = "/var/tmp"
//! max_frame_bytes = 1048576
//! merge_fan_in = 64
//! ```
//!
//! Every key is optional; unknown keys are rejected.


use serde::Deserialize;
use spillmedian_core::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    sort::SortConfig,
};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error as ThisError;

/// File name hosts look for when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "spillmedian.toml";

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("could not read config {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("could not parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: Box<toml::de::Error>,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<ConfigError> for InternalError {
    fn from(err: ConfigError) -> Self {
        let class = match err {
            ConfigError::Read { .. } => ErrorClass::Io,
            ConfigError::Parse { .. } | ConfigError::Invalid(_) => ErrorClass::Unsupported,
        };

        Self::new(class, ErrorOrigin::Config, err.to_string())
    }
}

///
/// ConfigFile
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub sort: SortSection,
}

impl ConfigFile {
    /// Build the sorter config, validated.
    pub fn to_sort_config(&self) -> Result<SortConfig, ConfigError> {
        self.sort.to_sort_config()
    }
}

///
/// SortSection
///
/// `[sort]` table. Unset keys fall back to the sorter defaults.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SortSection {
    pub work_mem_kb: Option<usize>,
    pub spill_dir: Option<PathBuf>,
    pub max_frame_bytes: Option<usize>,
    pub merge_fan_in: Option<usize>,
}

impl SortSection {
    /// Layer `overrides` on top of this section; set keys win.
    #[must_use]
    pub fn overlay(self, overrides: Self) -> Self {
        Self {
            work_mem_kb: overrides.work_mem_kb.or(self.work_mem_kb),
            spill_dir: overrides.spill_dir.or(self.spill_dir),
            max_frame_bytes: overrides.max_frame_bytes.or(self.max_frame_bytes),
            merge_fan_in: overrides.merge_fan_in.or(self.merge_fan_in),
        }
    }

    pub fn to_sort_config(&self) -> Result<SortConfig, ConfigError> {
        if self.work_mem_kb == Some(0) {
            return Err(ConfigError::Invalid(
                "sort.work_mem_kb must be greater than zero".to_string(),
            ));
        }

        let mut config = SortConfig::default();
        if let Some(kb) = self.work_mem_kb {
            config = config.with_work_mem_kb(kb);
        }
        if let Some(dir) = &self.spill_dir {
            config = config.with_spill_dir(dir);
        }
        if let Some(bytes) = self.max_frame_bytes {
            config = config.with_max_frame_bytes(bytes);
        }
        if let Some(runs) = self.merge_fan_in {
            config = config.with_merge_fan_in(runs);
        }

        config
            .validate()
            .map_err(|err| ConfigError::Invalid(err.message))?;

        Ok(config)
    }
}

/// Parse config text. `origin` names the source in error messages.
pub fn parse_config(raw: &str, origin: &Path) -> Result<ConfigFile, ConfigError> {
    toml::from_str(raw).map_err(|source| ConfigError::Parse {
        path: origin.to_path_buf(),
        source: Box::new(source),
    })
}

/// Read and parse a config file.
pub fn load_config(path: &Path) -> Result<ConfigFile, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    parse_config(&raw, path)
}

/// Load `path` if given, else `spillmedian.toml` in the working directory
/// when present, else defaults.
pub fn discover_config(path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if default.is_file() {
                load_config(default)
            } else {
                Ok(ConfigFile::default())
            }
        }
    }
}
