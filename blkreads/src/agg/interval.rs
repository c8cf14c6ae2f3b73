use std::{collections::HashMap, mem};

use crate::model::event::ReadEvent;

/// Per-executable read-byte totals for the current interval.
///
/// One instance is built at startup and shared behind a mutex by the
/// ring buffer poll thread (`record`) and the reporter thread (`drain`),
/// so increments and the drain-and-clear boundary never interleave.
#[derive(Debug, Default)]
pub struct IntervalAggregator {
    table: HashMap<String, u64>,
}

impl IntervalAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an accepted read to the issuing executable's running total.
    /// Entries are created lazily; an executable with no reads in the
    /// current interval has no entry.
    pub fn record(&mut self, event: ReadEvent) {
        *self.table.entry(event.comm).or_default() += event.bytes;
    }

    /// Capture the current totals and reset the table to empty.
    ///
    /// The returned snapshot holds exactly the totals accumulated since
    /// the previous drain (or startup); the table is immediately ready
    /// to accept further records.
    pub fn drain(&mut self) -> HashMap<String, u64> {
        mem::take(&mut self.table)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        thread,
    };

    use super::*;

    fn read(comm: &str, bytes: u64) -> ReadEvent {
        ReadEvent {
            comm: comm.to_string(),
            bytes,
        }
    }

    #[test]
    fn totals_sum_grouped_by_executable() {
        let mut agg = IntervalAggregator::new();
        agg.record(read("catd", 4096));
        agg.record(read("catd", 8192));
        agg.record(read("httpd", 1024));

        let snapshot = agg.drain();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["catd"], 12288);
        assert_eq!(snapshot["httpd"], 1024);
    }

    #[test]
    fn drain_leaves_table_empty() {
        let mut agg = IntervalAggregator::new();
        agg.record(read("catd", 4096));

        let first = agg.drain();
        assert_eq!(first["catd"], 4096);

        let second = agg.drain();
        assert!(second.is_empty());
    }

    #[test]
    fn drain_on_empty_table_returns_empty_snapshot() {
        let mut agg = IntervalAggregator::new();
        assert!(agg.drain().is_empty());
        assert!(agg.drain().is_empty());
    }

    #[test]
    fn totals_do_not_carry_over_across_drains() {
        let mut agg = IntervalAggregator::new();

        agg.record(read("a", 100));
        let snapshot = agg.drain();
        assert_eq!(snapshot["a"], 100);

        agg.record(read("a", 50));
        let snapshot = agg.drain();
        assert_eq!(snapshot["a"], 50);
    }

    #[test]
    fn zero_byte_reads_still_create_an_entry() {
        let mut agg = IntervalAggregator::new();
        agg.record(read("dd", 0));

        let snapshot = agg.drain();
        assert_eq!(snapshot["dd"], 0);
    }

    #[test]
    fn concurrent_record_and_drain_lose_no_bytes() {
        let agg = Arc::new(Mutex::new(IntervalAggregator::new()));

        let recorder = {
            let agg = Arc::clone(&agg);
            thread::spawn(move || {
                for _ in 0..1000 {
                    agg.lock().unwrap().record(read("catd", 1));
                }
            })
        };

        let mut drained = 0u64;
        for _ in 0..100 {
            let snapshot = agg.lock().unwrap().drain();
            drained += snapshot.get("catd").copied().unwrap_or(0);
        }
        recorder.join().unwrap();
        drained += agg.lock().unwrap().drain().get("catd").copied().unwrap_or(0);

        assert_eq!(drained, 1000);
    }
}
