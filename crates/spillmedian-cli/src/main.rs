//! `spillmedian`: exact medians over line or JSON-lines input.

mod args;
mod error;
mod input;
mod run;
mod sink;


use crate::{args::Args, error::CliError, run::Runner, sink::TracingSink};
use clap::Parser;
use serde::Serialize;
use spillmedian_core::obs::{EventReport, metrics_report, with_metrics_sink};
use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::Path,
    process::ExitCode,
    rc::Rc,
};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match with_metrics_sink(Rc::new(TracingSink), || execute(&args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "median failed");
            let _ = writeln!(io::stderr(), "spillmedian: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .init();
}

///
/// StatsReport
///

#[derive(Serialize)]
struct StatsReport<'a> {
    summary: &'a run::RunSummary,
    events: EventReport,
}

fn execute(args: &Args) -> Result<(), CliError> {
    let runner = Runner::from_args(args)?;
    let mut out = BufWriter::new(io::stdout().lock());

    let summary = match args.input.as_deref().filter(|path| *path != Path::new("-")) {
        Some(path) => {
            tracing::info!(path = %path.display(), "reading input file");
            runner.run(BufReader::new(File::open(path)?), &mut out)?
        }
        None => runner.run(io::stdin().lock(), &mut out)?,
    };
    out.flush()?;

    tracing::info!(
        rows = summary.rows,
        groups = summary.groups,
        runs_spilled = summary.sorter.runs_spilled,
        "done"
    );

    if args.stats {
        let report = StatsReport {
            summary: &summary,
            events: metrics_report(),
        };
        let text = serde_json::to_string_pretty(&report).map_err(io::Error::from)?;
        writeln!(io::stderr(), "{text}")?;
    }

    Ok(())
}
