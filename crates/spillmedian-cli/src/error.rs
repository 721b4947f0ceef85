use spillmedian_config::ConfigError;
use spillmedian_core::error::InternalError;
use std::io;
use thiserror::Error as ThisError;

///
/// CliError
///

#[derive(Debug, ThisError)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error("line {line}: {message}")]
    Input { line: usize, message: String },

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{}", .0.display_with_class())]
    Core(#[from] InternalError),
}

impl CliError {
    pub(crate) fn input(line: usize, message: impl Into<String>) -> Self {
        Self::Input {
            line,
            message: message.into(),
        }
    }
}
