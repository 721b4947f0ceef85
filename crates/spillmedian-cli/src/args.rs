use clap::{Parser, ValueEnum};
use spillmedian_config::SortSection;
use spillmedian_core::value::ValueType;
use std::path::PathBuf;

///
/// Args
///

#[derive(Debug, Parser)]
#[command(
    name = "spillmedian",
    version,
    about = "Exact median of a value stream, spilling sorted runs to disk under a memory budget"
)]
pub struct Args {
    /// Declared value type: bool, int, uint, float64, text or blob.
    #[arg(short = 't', long = "type", value_name = "TYPE", default_value = "float64")]
    pub value_type: ValueType,

    /// Input file; stdin when absent or "-".
    #[arg(short, long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// How each input line is read.
    #[arg(short, long, value_enum, default_value_t = InputFormat::Lines)]
    pub format: InputFormat,

    /// JSON field holding the value (jsonl only; whole line when absent).
    #[arg(long, value_name = "FIELD")]
    pub field: Option<String>,

    /// JSON field whose value names the group (jsonl only).
    #[arg(short, long, value_name = "FIELD")]
    pub group_by: Option<String>,

    /// Sort memory budget in KiB before a run is spilled.
    #[arg(long, env = "SPILLMEDIAN_WORK_MEM_KB")]
    pub work_mem_kb: Option<usize>,

    /// Most spilled runs read at once by one merge pass.
    #[arg(long, env = "SPILLMEDIAN_MERGE_FAN_IN", value_name = "RUNS")]
    pub merge_fan_in: Option<usize>,

    /// Parent directory for spill files.
    #[arg(long, env = "SPILLMEDIAN_SPILL_DIR", value_name = "DIR")]
    pub spill_dir: Option<PathBuf>,

    /// Config file; `spillmedian.toml` is used when present.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print sorter and event counters to stderr when done.
    #[arg(long)]
    pub stats: bool,

    /// Log every sorter event.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Sort settings given on the command line, to layer over the file.
    #[must_use]
    pub fn sort_overrides(&self) -> SortSection {
        SortSection {
            work_mem_kb: self.work_mem_kb,
            spill_dir: self.spill_dir.clone(),
            max_frame_bytes: None,
            merge_fan_in: self.merge_fan_in,
        }
    }
}

///
/// InputFormat
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum InputFormat {
    /// One value per line; empty lines, `NULL` and `\N` are nulls.
    Lines,
    /// One JSON document per line.
    Jsonl,
}
