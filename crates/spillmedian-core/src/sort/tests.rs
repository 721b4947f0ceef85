use crate::{
    compare::Comparator,
    error::{ErrorClass, ErrorOrigin, SortError},
    sort::{
        ExternalSorter, FileSpillStorage, MemorySpillStorage, SortConfig, SortPhase,
        SortedSequence, SpillStorage,
        codec::{RunReader, encode_frame},
    },
    value::Value,
};
use proptest::prelude::*;
use std::{cmp::Ordering, io::Cursor};

// ---- helpers -----------------------------------------------------------

fn int_sorter(budget: usize) -> ExternalSorter<i64, MemorySpillStorage> {
    int_sorter_with(SortConfig::default().with_memory_budget(budget))
}

fn int_sorter_with(config: SortConfig) -> ExternalSorter<i64, MemorySpillStorage> {
    ExternalSorter::new(Comparator::natural(), MemorySpillStorage::new(), config)
        .expect("valid config")
}

fn drain<T, S>(sorter: &mut ExternalSorter<T, S>) -> Vec<T>
where
    T: crate::sort::SortValue,
    S: SpillStorage,
{
    let mut out = Vec::new();
    if sorter.remaining() == Some(0) {
        return out;
    }

    loop {
        let (value, is_last) = sorter.next_value().expect("value before end");
        out.push(value);
        if is_last {
            return out;
        }
    }
}

fn sorted_via(budget: usize, input: &[i64]) -> Vec<i64> {
    sorted_with(SortConfig::default().with_memory_budget(budget), input)
}

fn sorted_with(config: SortConfig, input: &[i64]) -> Vec<i64> {
    let mut sorter = int_sorter_with(config);
    for value in input {
        sorter.insert(*value).expect("insert");
    }
    sorter.sort().expect("sort");

    drain(&mut sorter)
}

// ---- in-memory path ----------------------------------------------------

#[test]
fn in_memory_sort_keeps_duplicates_and_flags_last() {
    let mut sorter = int_sorter(1024 * 1024);
    for value in [9, 2, 2, 4, 4] {
        sorter.insert(value).expect("insert");
    }
    assert_eq!(sorter.phase(), SortPhase::Accepting);
    assert_eq!(sorter.remaining(), None);

    sorter.sort().expect("sort");
    assert_eq!(sorter.phase(), SortPhase::Sorted);
    assert_eq!(sorter.remaining(), Some(5));
    assert_eq!(sorter.run_count(), 0);

    assert_eq!(sorter.next_value().expect("first"), (2, false));
    sorter.skip(2).expect("skip");
    assert_eq!(sorter.next_value().expect("fourth"), (4, false));
    assert_eq!(sorter.next_value().expect("fifth"), (9, true));

    let stats = sorter.stats();
    assert_eq!(stats.values, 5);
    assert_eq!(stats.in_memory_sorts, 1);
    assert_eq!(stats.runs_spilled, 0);
}

#[test]
fn empty_sorter_sorts_to_empty_sequence() {
    let mut sorter = int_sorter(64);
    sorter.sort().expect("sort");

    assert_eq!(sorter.remaining(), Some(0));
    sorter.skip(0).expect("skipping nothing is allowed");

    let err = sorter.next_value().expect_err("nothing to read");
    assert_eq!(err.class, ErrorClass::Exhausted);
}

// ---- state machine -----------------------------------------------------

#[test]
fn insert_after_sort_is_rejected() {
    let mut sorter = int_sorter(64);
    sorter.insert(1).expect("insert");
    sorter.sort().expect("sort");

    let err = sorter.insert(2).expect_err("sorted sorter must reject inserts");
    assert_eq!(err.class, ErrorClass::Misuse);
    assert_eq!(err.sort_error(), Some(&SortError::NotAccepting));

    let err = sorter.sort().expect_err("second sort must be rejected");
    assert_eq!(err.sort_error(), Some(&SortError::NotAccepting));
}

#[test]
fn reads_before_sort_are_rejected() {
    let mut sorter = int_sorter(64);
    sorter.insert(1).expect("insert");

    let err = sorter.next_value().expect_err("unsorted sorter must reject reads");
    assert_eq!(err.sort_error(), Some(&SortError::NotSorted));

    let err = sorter.skip(0).expect_err("unsorted sorter must reject skip");
    assert_eq!(err.origin, ErrorOrigin::Sort);
    assert_eq!(err.sort_error(), Some(&SortError::NotSorted));
}

#[test]
fn skip_past_end_is_out_of_range_and_consumes_nothing() {
    let mut sorter = int_sorter(64);
    for value in [3, 1, 2] {
        sorter.insert(value).expect("insert");
    }
    sorter.sort().expect("sort");

    let err = sorter.skip(4).expect_err("only three elements");
    assert_eq!(err.class, ErrorClass::OutOfRange);
    assert_eq!(
        err.sort_error(),
        Some(&SortError::OutOfRange {
            requested: 4,
            remaining: 3
        })
    );
    assert_eq!(sorter.remaining(), Some(3));

    sorter.skip(3).expect("skip to the end");
    let err = sorter.next_value().expect_err("exhausted");
    assert_eq!(err.sort_error(), Some(&SortError::Exhausted));
}

// ---- spill path --------------------------------------------------------

#[test]
fn exceeding_budget_spills_sorted_runs() {
    // i64 charges 8 bytes; a 16-byte budget spills on every third insert
    let mut sorter = int_sorter(16);
    for value in [10, 4, 7, 1, 9, 3, 8, 2, 6, 5] {
        sorter.insert(value).expect("insert");
    }

    assert_eq!(sorter.run_count(), 3);
    assert_eq!(sorter.buffered_bytes(), 8);
    assert_eq!(sorter.storage().segment_count(), 3);

    sorter.sort().expect("sort");
    assert_eq!(drain(&mut sorter), (1..=10).collect::<Vec<_>>());

    let stats = sorter.stats();
    assert_eq!(stats.runs_spilled, 3);
    assert_eq!(stats.values_spilled, 9);
    assert!(stats.bytes_spilled > 0);
    assert_eq!(stats.external_merges, 1);
    assert_eq!(stats.in_memory_sorts, 0);
}

#[test]
fn merge_skip_discards_across_runs() {
    let mut sorter = int_sorter(16);
    for value in (0..50).rev() {
        sorter.insert(value).expect("insert");
    }
    sorter.sort().expect("sort");

    sorter.skip(25).expect("skip half");
    assert_eq!(sorter.next_value().expect("middle"), (25, false));
    assert_eq!(sorter.remaining(), Some(24));
}

// Sort (key, seq) pairs by key alone and return them in output order.
fn keyed_output(config: SortConfig) -> (Vec<(i64, i64)>, u64) {
    // order by the first list element only; the second records insertion order
    let by_key = Comparator::new("key", |a: &Value, b: &Value| match (a, b) {
        (Value::List(a), Value::List(b)) => crate::compare::value_cmp(&a[0], &b[0]),
        _ => Ordering::Equal,
    });
    let mut sorter =
        ExternalSorter::new(by_key, MemorySpillStorage::new(), config).expect("valid config");

    for seq in 0..40i64 {
        let key = seq % 3;
        sorter
            .insert(Value::List(vec![Value::Int(key), Value::Int(seq)]))
            .expect("insert");
    }
    assert!(sorter.run_count() > 2, "budget should force several runs");
    sorter.sort().expect("sort");

    let pairs = drain(&mut sorter)
        .iter()
        .map(|value| match value {
            Value::List(items) => match (&items[0], &items[1]) {
                (Value::Int(key), Value::Int(seq)) => (*key, *seq),
                other => panic!("unexpected items {other:?}"),
            },
            other => panic!("unexpected value {other:?}"),
        })
        .collect();

    (pairs, sorter.stats().merge_passes)
}

#[test]
fn equal_keys_keep_insertion_order_across_runs() {
    let (pairs, _) = keyed_output(SortConfig::default().with_memory_budget(256));

    let mut expected = pairs.clone();
    expected.sort_unstable();
    assert_eq!(pairs, expected);
}

#[test]
fn equal_keys_keep_insertion_order_through_merge_passes() {
    let (pairs, passes) = keyed_output(
        SortConfig::default()
            .with_memory_budget(256)
            .with_merge_fan_in(2),
    );
    assert!(passes > 0, "fan-in of two should need intermediate passes");

    let mut expected = pairs.clone();
    expected.sort_unstable();
    assert_eq!(pairs, expected);
}

#[test]
fn many_runs_are_merged_in_passes_of_fan_in() {
    let mut sorter = int_sorter_with(
        SortConfig::default()
            .with_memory_budget(16)
            .with_merge_fan_in(4),
    );
    for value in (0..300).rev() {
        sorter.insert(value).expect("insert");
    }
    assert_eq!(sorter.run_count(), 100);

    sorter.sort().expect("sort");

    // each pass folds four runs into one: 100 -> 97 -> ... -> 4
    assert_eq!(sorter.run_count(), 4);
    assert_eq!(sorter.storage().segment_count(), 4);

    let stats = sorter.stats();
    assert_eq!(stats.runs_spilled, 100);
    assert_eq!(stats.merge_passes, 32);
    assert_eq!(stats.external_merges, 1);

    assert_eq!(drain(&mut sorter), (0..300).collect::<Vec<_>>());
}

#[test]
fn runs_at_fan_in_need_no_extra_pass() {
    let mut sorter = int_sorter_with(
        SortConfig::default()
            .with_memory_budget(16)
            .with_merge_fan_in(4),
    );
    for value in 0..13 {
        sorter.insert(value).expect("insert");
    }
    assert_eq!(sorter.run_count(), 4);

    sorter.sort().expect("sort");
    assert_eq!(sorter.stats().merge_passes, 0);
    assert_eq!(sorter.remaining(), Some(13));
}

#[test]
fn failed_spill_leaves_no_segment_behind() {
    let mut sorter: ExternalSorter<String, _> = ExternalSorter::new(
        Comparator::natural(),
        MemorySpillStorage::new(),
        SortConfig::default()
            .with_memory_budget(16)
            .with_max_frame_bytes(16),
    )
    .expect("valid config");

    let err = sorter
        .insert("x".repeat(100))
        .expect_err("value cannot fit one frame");
    assert_eq!(err.origin, ErrorOrigin::Serialize);

    assert_eq!(sorter.run_count(), 0);
    assert_eq!(sorter.storage().segment_count(), 0);
}

#[test]
fn fan_in_below_two_is_rejected() {
    let err = ExternalSorter::<i64, _>::new(
        Comparator::natural(),
        MemorySpillStorage::new(),
        SortConfig::default().with_merge_fan_in(1),
    )
    .err()
    .expect("fan-in of one cannot make progress");

    assert_eq!(err.origin, ErrorOrigin::Config);
}

#[test]
fn file_storage_spills_under_configured_dir_and_cleans_up() {
    let parent = tempfile::tempdir().expect("tempdir");
    let config = SortConfig::default()
        .with_memory_budget(64)
        .with_spill_dir(parent.path());

    let mut sorter: ExternalSorter<String, FileSpillStorage> =
        ExternalSorter::provision(Comparator::natural(), config).expect("provision");
    let dir = sorter.storage().dir().to_path_buf();
    assert!(dir.starts_with(parent.path()));

    for word in ["pear", "fig", "apple", "kiwi", "date", "lime", "plum", "yuzu"] {
        sorter.insert(word.to_string()).expect("insert");
    }
    assert!(sorter.run_count() > 0);
    assert!(std::fs::read_dir(&dir).expect("spill dir").count() > 0);

    sorter.sort().expect("sort");
    assert_eq!(
        drain(&mut sorter),
        vec!["apple", "date", "fig", "kiwi", "lime", "pear", "plum", "yuzu"]
    );

    drop(sorter);
    assert!(!dir.exists(), "spill directory must be removed with the sorter");
}

#[test]
fn zero_budget_is_rejected() {
    let err = ExternalSorter::<i64, _>::new(
        Comparator::natural(),
        MemorySpillStorage::new(),
        SortConfig::default().with_memory_budget(0),
    )
    .err()
    .expect("zero budget must be rejected");

    assert_eq!(err.origin, ErrorOrigin::Config);
}

// ---- run codec ---------------------------------------------------------

fn encoded_run(values: &[i64]) -> Vec<u8> {
    values
        .iter()
        .flat_map(|value| encode_frame(value, 1024).expect("encode"))
        .collect()
}

fn segment_id() -> crate::sort::SegmentId {
    MemorySpillStorage::new().create().expect("segment")
}

#[test]
fn run_reader_yields_recorded_frames_then_none() {
    let mut reader = RunReader::<i64, _>::new(Cursor::new(encoded_run(&[1, 5])), segment_id(), 2, 1024);

    assert_eq!(reader.next_value().expect("first"), Some(1));
    assert_eq!(reader.next_value().expect("second"), Some(5));
    assert_eq!(reader.next_value().expect("end"), None);
}

#[test]
fn truncated_run_is_corruption() {
    let mut bytes = encoded_run(&[1, 5, 9]);
    bytes.truncate(bytes.len() - 1);
    let mut reader = RunReader::<i64, _>::new(Cursor::new(bytes), segment_id(), 3, 1024);

    reader.next_value().expect("first");
    reader.next_value().expect("second");
    let err = reader.next_value().expect_err("third frame is cut short");
    assert_eq!(err.class, ErrorClass::Corruption);
    assert!(err.message.contains("ended after 2 of 3 frames"), "{err:?}");
}

#[test]
fn run_with_extra_frames_is_corruption() {
    let mut reader = RunReader::<i64, _>::new(Cursor::new(encoded_run(&[1, 5])), segment_id(), 1, 1024);

    reader.next_value().expect("first");
    let err = reader.next_value().expect_err("unrecorded frame");
    assert_eq!(err.class, ErrorClass::Corruption);
}

#[test]
fn oversized_frame_header_is_corruption() {
    let mut bytes = u32::MAX.to_le_bytes().to_vec();
    bytes.extend_from_slice(&[0; 8]);
    let mut reader = RunReader::<i64, _>::new(Cursor::new(bytes), segment_id(), 1, 1024);

    let err = reader.next_value().expect_err("declared length over limit");
    assert_eq!(err.class, ErrorClass::Corruption);
    assert_eq!(err.origin, ErrorOrigin::Spill);
}

#[test]
fn encode_rejects_values_over_frame_limit() {
    let err = encode_frame(&"x".repeat(100), 16).expect_err("payload over limit");
    assert_eq!(err.origin, ErrorOrigin::Serialize);
}

// ---- spill storage -----------------------------------------------------

#[test]
fn memory_storage_enforces_segment_lifecycle() {
    let mut storage = MemorySpillStorage::new();
    let id = storage.create().expect("create");

    storage.append(id, b"abc").expect("append");
    assert!(storage.open(id).is_err(), "unsealed segment must not open");
    assert_eq!(storage.seal(id).expect("seal"), 3);
    assert!(storage.append(id, b"d").is_err(), "sealed segment is read-only");
    assert_eq!(&*storage.open(id).expect("open").into_inner(), b"abc");

    storage.delete(id).expect("delete");
    assert_eq!(storage.segment_count(), 0);
    assert!(storage.open(id).is_err());
    assert!(storage.delete(id).is_err());
}

#[test]
fn memory_storage_readers_share_sealed_bytes() {
    let mut storage = MemorySpillStorage::new();
    let id = storage.create().expect("create");
    storage.append(id, &[7; 64]).expect("append");
    storage.seal(id).expect("seal");

    let first = storage.open(id).expect("open").into_inner();
    let second = storage.open(id).expect("open").into_inner();
    assert!(std::sync::Arc::ptr_eq(&first, &second));
}

#[test]
fn file_storage_round_trips_segment_bytes() {
    use std::io::Read;

    let mut storage = FileSpillStorage::new(None).expect("storage");
    let id = storage.create().expect("create");
    storage.append(id, b"hello ").expect("append");
    storage.append(id, b"runs").expect("append");
    assert_eq!(storage.seal(id).expect("seal"), 10);

    let mut text = String::new();
    storage
        .open(id)
        .expect("open")
        .read_to_string(&mut text)
        .expect("read");
    assert_eq!(text, "hello runs");

    storage.delete(id).expect("delete");
    assert!(storage.open(id).is_err());
}

// ---- properties --------------------------------------------------------

proptest! {
    #[test]
    fn spilling_never_changes_sorted_output(
        input in prop::collection::vec(-1_000i64..1_000, 0..300),
        budget in 8usize..256,
    ) {
        let spilled = sorted_via(budget, &input);
        let in_memory = sorted_via(1024 * 1024, &input);

        let mut expected = input;
        expected.sort_unstable();

        prop_assert_eq!(&spilled, &expected);
        prop_assert_eq!(&in_memory, &expected);
    }

    #[test]
    fn hundreds_of_runs_merge_in_bounded_passes(
        input in prop::collection::vec(-500i64..500, 200..800),
        fan_in in 2usize..8,
    ) {
        // an 8-byte budget spills every second value
        let config = SortConfig::default()
            .with_memory_budget(8)
            .with_merge_fan_in(fan_in);
        let spilled = sorted_with(config, &input);

        let mut expected = input;
        expected.sort_unstable();

        prop_assert_eq!(spilled, expected);
    }
}
