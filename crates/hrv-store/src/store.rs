//! Record store - idempotent appends and range queries over day partitions

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use hrv_core::{Clock, DayKey, HrvResult, TelemetryRecord};

use crate::{format_line, parse_line, PartitionStorage};

/// Trailing window the classifier compares against (3 days)
pub const BASELINE_LOOKBACK_SECS: u64 = 3 * 24 * 3600;

/// Trailing window the classifier evaluates (3 hours)
pub const SAMPLE_LOOKBACK_SECS: u64 = 3 * 3600;

/// What an append did to its partition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The partition did not exist and was created with this record
    Created,
    /// The record was appended to an existing partition
    Appended,
    /// An identical line was already present; nothing was written
    Duplicate,
}

/// Append-only, day-partitioned telemetry store.
///
/// Operations on one partition are serialized in-process through a lock
/// per partition name; different partitions proceed independently.
pub struct RecordStore {
    storage: Arc<dyn PartitionStorage>,
    clock: Arc<dyn Clock>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RecordStore {
    pub fn new(storage: Arc<dyn PartitionStorage>, clock: Arc<dyn Clock>) -> Self {
        RecordStore {
            storage,
            clock,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Current time as seen by the store
    pub fn now_unix(&self) -> i64 {
        self.clock.now_unix()
    }

    /// Run `f` holding the partition's lock. The table entry is dropped
    /// again once no other caller holds it, so the table only holds
    /// partitions in use.
    fn with_partition<T>(&self, name: &str, f: impl FnOnce() -> T) -> T {
        let lock = self
            .locks
            .lock()
            .entry(name.to_string())
            .or_default()
            .clone();

        let result = {
            let _guard = lock.lock();
            f()
        };

        let mut locks = self.locks.lock();
        drop(lock);
        if locks.get(name).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(name);
        }
        result
    }

    /// Partitions with a lock entry, i.e. with an operation in flight
    pub fn locked_partitions(&self) -> usize {
        self.locks.lock().len()
    }

    /// Persist a record in its UTC day partition unless its exact line is
    /// already there.
    pub fn append(&self, record: &TelemetryRecord) -> HrvResult<AppendOutcome> {
        let line = format_line(record)?;
        let name = DayKey::from_unix_secs(record.unix_secs())?.partition_name();

        self.with_partition(&name, || match self.storage.read_all(&name) {
            Ok(contents) => {
                let wanted = line.trim_end_matches('\n');
                if contents.lines().any(|existing| existing == wanted) {
                    debug!(partition = %name, timestamp = record.timestamp, "duplicate record skipped");
                    return Ok(AppendOutcome::Duplicate);
                }
                self.storage.append(&name, &line)?;
                Ok(AppendOutcome::Appended)
            }
            Err(e) if e.is_not_found() => {
                self.storage.write_new(&name, &line)?;
                debug!(partition = %name, "partition created");
                Ok(AppendOutcome::Created)
            }
            Err(e) => Err(e),
        })
    }

    /// Records from the last `lookback_secs` seconds up to now, ascending
    pub fn query(&self, lookback_secs: u64) -> HrvResult<Vec<TelemetryRecord>> {
        let upper = self.clock.now_unix();
        let lower = upper.saturating_sub(lookback_secs.min(i64::MAX as u64) as i64);
        self.range(lower, upper)
    }

    /// Records with `lower <= timestamp <= upper`, ascending by timestamp.
    ///
    /// Missing partitions read as empty and malformed lines are skipped.
    pub fn range(&self, lower: i64, upper: i64) -> HrvResult<Vec<TelemetryRecord>> {
        if lower > upper || upper < 0 || lower > u32::MAX as i64 {
            return Ok(Vec::new());
        }

        let first = DayKey::from_unix_secs(lower.max(0))?;
        let last = DayKey::from_unix_secs(upper.min(u32::MAX as i64))?;

        let mut records = Vec::new();
        for day in DayKey::span(first, last) {
            let name = day.partition_name();
            let contents = match self.with_partition(&name, || self.storage.read_all(&name)) {
                Ok(contents) => contents,
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            };

            for line in contents.lines().filter(|l| !l.is_empty()) {
                match parse_line(line) {
                    Ok(record) if (lower..=upper).contains(&record.unix_secs()) => {
                        records.push(record)
                    }
                    Ok(_) => {}
                    Err(e) => warn!(partition = %name, error = %e, "skipping malformed line"),
                }
            }
        }

        records.sort_by_key(|r| r.timestamp);
        Ok(records)
    }

    /// Trailing 3-hour window
    pub fn sample_window(&self) -> HrvResult<Vec<TelemetryRecord>> {
        self.query(SAMPLE_LOOKBACK_SECS)
    }

    /// Trailing 3-day window
    pub fn baseline_window(&self) -> HrvResult<Vec<TelemetryRecord>> {
        self.query(BASELINE_LOOKBACK_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FsPartitionStorage, MemoryPartitionStorage};
    use hrv_core::ManualClock;
    use proptest::prelude::*;
    use std::thread;

    const NOW: i64 = 1_700_000_000;

    fn memory_store(now: i64) -> (RecordStore, Arc<MemoryPartitionStorage>, ManualClock) {
        let storage = Arc::new(MemoryPartitionStorage::new());
        let clock = ManualClock::new(now);
        let store = RecordStore::new(storage.clone(), Arc::new(clock.clone()));
        (store, storage, clock)
    }

    #[test]
    fn test_append_writes_expected_partition() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(FsPartitionStorage::new(dir.path()));
        let store = RecordStore::new(storage, Arc::new(ManualClock::new(NOW)));

        let outcome = store
            .append(&TelemetryRecord::new(1_700_000_000, 55.25))
            .unwrap();
        assert_eq!(outcome, AppendOutcome::Created);

        let contents = std::fs::read_to_string(dir.path().join("HRV-20231114.txt")).unwrap();
        assert_eq!(contents, "1700000000 055.25\n");
    }

    #[test]
    fn test_append_is_idempotent() {
        let (store, storage, _) = memory_store(NOW);
        let record = TelemetryRecord::new(1_699_990_000, 80.5);

        assert_eq!(store.append(&record).unwrap(), AppendOutcome::Created);
        assert_eq!(store.append(&record).unwrap(), AppendOutcome::Duplicate);
        assert_eq!(
            store.append(&TelemetryRecord::new(1_699_990_001, 80.5)).unwrap(),
            AppendOutcome::Appended
        );

        assert_eq!(
            storage.contents("HRV-20231114.txt").as_deref(),
            Some("1699990000 080.50\n1699990001 080.50\n")
        );
    }

    #[test]
    fn test_duplicate_check_is_line_exact() {
        let (store, storage, _) = memory_store(NOW);
        // a longer timestamp whose tail matches the new line
        storage.insert_raw("HRV-20231114.txt", "11700000000 055.25\n");

        assert_eq!(
            store.append(&TelemetryRecord::new(1_700_000_000, 55.25)).unwrap(),
            AppendOutcome::Appended
        );
    }

    #[test]
    fn test_append_rejects_non_finite() {
        let (store, storage, _) = memory_store(NOW);
        assert!(store.append(&TelemetryRecord::new(NOW as u32, f32::NAN)).is_err());
        assert!(storage.names().is_empty());
    }

    #[test]
    fn test_query_spans_days_and_sorts() {
        let (store, _, _) = memory_store(NOW);
        let day = 24 * 3600;
        for ts in [NOW - 10, NOW - 2 * day, NOW - day - 5, NOW - 4 * day, NOW] {
            store.append(&TelemetryRecord::new(ts as u32, 60.0)).unwrap();
        }

        let records = store.query(3 * day as u64).unwrap();
        let stamps: Vec<i64> = records.iter().map(|r| r.unix_secs()).collect();
        assert_eq!(stamps, vec![NOW - 2 * day, NOW - day - 5, NOW - 10, NOW]);
    }

    #[test]
    fn test_query_skips_malformed_and_missing() {
        let (store, storage, _) = memory_store(NOW);
        storage.insert_raw(
            "HRV-20231114.txt",
            "1699999000 070.00\ngarbage\n\n1699999500 abc\n1699998000 050.00\n",
        );

        let records = store.query(3600).unwrap();
        assert_eq!(
            records,
            vec![
                TelemetryRecord::new(1_699_998_000, 50.0),
                TelemetryRecord::new(1_699_999_000, 70.0),
            ]
        );
    }

    #[test]
    fn test_query_bounds_are_closed() {
        let (store, _, clock) = memory_store(NOW);
        store.append(&TelemetryRecord::new((NOW - 100) as u32, 1.0)).unwrap();
        store.append(&TelemetryRecord::new(NOW as u32, 2.0)).unwrap();
        store.append(&TelemetryRecord::new((NOW + 1) as u32, 3.0)).unwrap();

        assert_eq!(store.query(100).unwrap().len(), 2);
        assert_eq!(store.query(99).unwrap().len(), 1);

        clock.advance(1);
        assert_eq!(store.query(101).unwrap().len(), 3);
    }

    #[test]
    fn test_query_is_repeatable() {
        let (store, _, _) = memory_store(NOW);
        for i in 0..20 {
            store
                .append(&TelemetryRecord::new((NOW - i * 37) as u32, i as f32))
                .unwrap();
        }
        assert_eq!(store.baseline_window().unwrap(), store.baseline_window().unwrap());
        assert_eq!(store.sample_window().unwrap().len(), 20);
    }

    #[test]
    fn test_concurrent_appends_do_not_duplicate() {
        let (store, storage, _) = memory_store(NOW);
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..25u32 {
                        store
                            .append(&TelemetryRecord::new(1_699_990_000 + i, 42.0))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let contents = storage.contents("HRV-20231114.txt").unwrap();
        assert_eq!(contents.lines().count(), 25);
        assert_eq!(store.locked_partitions(), 0);
    }

    #[test]
    fn test_lock_table_does_not_grow_with_days() {
        let (store, storage, _) = memory_store(NOW);

        for day in 0..30i64 {
            let ts = NOW - day * 24 * 3600;
            store.append(&TelemetryRecord::new(ts as u32, 50.0)).unwrap();
            assert_eq!(store.locked_partitions(), 0);
        }
        assert_eq!(storage.names().len(), 30);

        assert_eq!(store.query(40 * 24 * 3600).unwrap().len(), 30);
        assert_eq!(store.locked_partitions(), 0);
    }

    proptest! {
        #[test]
        fn prop_query_within_bounds_and_sorted(
            offsets in proptest::collection::vec(0i64..(5 * 24 * 3600), 0..40),
            junk in proptest::collection::vec("[a-z0-9 .]{0,12}", 0..10),
            lookback in 0u64..(4 * 24 * 3600),
        ) {
            let (store, storage, _) = memory_store(NOW);
            for offset in &offsets {
                store.append(&TelemetryRecord::new((NOW - offset) as u32, 70.0)).unwrap();
            }
            for (i, text) in junk.iter().enumerate() {
                let day = DayKey::from_unix_secs(NOW - (i as i64 % 5) * 24 * 3600).unwrap();
                let name = day.partition_name();
                let existing = storage.contents(&name).unwrap_or_default();
                storage.insert_raw(&name, &format!("{}{}\n", existing, text));
            }

            let records = store.query(lookback).unwrap();
            let lower = NOW - lookback as i64;
            for pair in records.windows(2) {
                prop_assert!(pair[0].timestamp <= pair[1].timestamp);
            }
            for record in &records {
                prop_assert!(record.unix_secs() >= lower && record.unix_secs() <= NOW);
            }
        }
    }
}
