use crate::{
    args::Args,
    error::CliError,
    input::{RecordParser, to_json},
};
use serde::Serialize;
use serde_json::Value as JsonValue;
use spillmedian_config::discover_config;
use spillmedian_core::{
    compare::ValueComparatorRegistry,
    median::{MedianAccumulator, MedianAggregate},
    sort::{SortConfig, SorterStats},
    value::{Value, ValueType},
};
use std::{
    collections::{BTreeMap, btree_map::Entry},
    io::{self, BufRead, Write},
};

///
/// GroupResult
///
/// One output line.
///

#[derive(Debug, Serialize)]
pub struct GroupResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub count: u64,
    pub median: JsonValue,
}

///
/// RunSummary
///

#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub rows: u64,
    pub groups: usize,
    pub sorter: SorterStats,
}

///
/// Runner
///
/// Reads records, keeps one accumulator per group and writes one JSON
/// result per group, ordered by group key.
///

pub struct Runner {
    aggregate: MedianAggregate<ValueComparatorRegistry>,
    ty: ValueType,
    parser: RecordParser,
}

impl Runner {
    pub fn from_args(args: &Args) -> Result<Self, CliError> {
        let file = discover_config(args.config.as_deref())?;
        let config = file.sort.overlay(args.sort_overrides()).to_sort_config()?;
        let parser = RecordParser::new(
            args.value_type,
            args.format,
            args.field.clone(),
            args.group_by.clone(),
        )?;

        Self::new(args.value_type, config, parser)
    }

    pub fn new(ty: ValueType, config: SortConfig, parser: RecordParser) -> Result<Self, CliError> {
        let aggregate = MedianAggregate::builtin(config);

        // an unorderable type fails here, before any input is read
        aggregate.init::<Value>(&ty)?;
        tracing::debug!(%ty, config = ?aggregate.config(), "median aggregate ready");

        Ok(Self {
            aggregate,
            ty,
            parser,
        })
    }

    pub fn run(&self, input: impl BufRead, out: &mut impl Write) -> Result<RunSummary, CliError> {
        let mut groups: BTreeMap<Option<String>, MedianAccumulator<Value>> = BTreeMap::new();
        let mut summary = RunSummary::default();

        for (index, line) in input.lines().enumerate() {
            let line = line?;
            let Some(record) = self.parser.parse(index + 1, &line)? else {
                continue;
            };
            summary.rows += 1;

            let state = match groups.entry(record.group) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    tracing::debug!(group = ?entry.key(), "new group");
                    entry.insert(self.aggregate.init(&self.ty)?)
                }
            };
            self.aggregate.insert(state, record.value)?;
        }

        // an ungrouped aggregate still reports on empty input
        if groups.is_empty() && !self.parser.is_grouped() {
            groups.insert(None, self.aggregate.init(&self.ty)?);
        }

        summary.groups = groups.len();
        summary.sorter = groups.values().map(MedianAccumulator::stats).sum();

        for (group, state) in groups {
            let count = state.count();
            let median = self.aggregate.finalize(state)?;

            let result = GroupResult {
                group,
                count,
                median: median.as_ref().map_or(JsonValue::Null, to_json),
            };
            serde_json::to_writer(&mut *out, &result).map_err(io::Error::from)?;
            writeln!(out)?;
        }

        Ok(summary)
    }
}
