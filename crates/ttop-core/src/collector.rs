//! Snapshot collection.
//!
//! Walks every live thread once, converts cumulative cycle counters into
//! per-interval deltas against a bounded previous-cycle table, and produces
//! a sorted, bounded [`Snapshot`]. Nothing here aborts a sample: every
//! failed read degrades to a sentinel or validity flag.

use tracing::debug;

use crate::model::{MAX_ROWS, Snapshot, ThreadId, ThreadRow};
use crate::sources::SystemSource;

/// Fixed-capacity map from thread identity to last-seen cumulative cycles.
///
/// Linear scan over at most `MAX_ROWS` entries. Once full, new threads are
/// silently dropped and never get delta tracking; entries for exited threads
/// are not reclaimed. Bounded memory is the priority here, and the capacity
/// matches the snapshot's row capacity so every detailed thread can be
/// tracked from a cold start.
#[derive(Debug, Default)]
struct PrevCycles {
    entries: Vec<(ThreadId, u64)>,
}

impl PrevCycles {
    /// Last cumulative count for `id`, or `None` if never seen.
    fn get(&self, id: ThreadId) -> Option<u64> {
        self.entries
            .iter()
            .find(|(tid, _)| *tid == id)
            .map(|(_, total)| *total)
    }

    /// Updates in place, inserting only while below capacity.
    fn set(&mut self, id: ThreadId, total: u64) {
        if let Some(entry) = self.entries.iter_mut().find(|(tid, _)| *tid == id) {
            entry.1 = total;
        } else if self.entries.len() < MAX_ROWS {
            self.entries.push((id, total));
        }
    }
}

/// Produces snapshots from a [`SystemSource`].
///
/// Holds the previous-cycle baseline between passes; one collector instance
/// per monitoring session, driven from a single task.
#[derive(Debug, Default)]
pub struct Collector {
    prev: PrevCycles,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs one sampling pass. Never fails: degraded reads surface as
    /// `None` fields and sentinel values in the snapshot.
    pub fn sample(&mut self, source: &mut dyn SystemSource) -> Snapshot {
        let mut snap = Snapshot {
            load_permille: source.cpu_load_permille().min(1000),
            uptime_secs: source.uptime_secs(),
            ..Snapshot::default()
        };

        snap.wall_clock = match source.wall_clock() {
            Ok(now) => Some(now),
            Err(e) => {
                debug!("wall clock unavailable: {e:#}");
                None
            }
        };

        let mut min_free_stack = u64::MAX;
        for stat in source.threads() {
            snap.total_threads_seen += 1;
            if snap.rows.len() >= MAX_ROWS {
                // Capacity bounds detail, not the count.
                continue;
            }

            let stack_free = match stat.stack_free {
                Some(bytes) => {
                    min_free_stack = min_free_stack.min(bytes);
                    bytes
                }
                None => {
                    snap.unknown_stack += 1;
                    0
                }
            };

            let delta_cycles = match stat.total_cycles {
                Some(total) => {
                    // First sight has no baseline, so its delta is 0. If the
                    // table is full the insert is dropped and the thread
                    // stays at delta 0 on every pass.
                    let delta = self
                        .prev
                        .get(stat.id)
                        .map_or(0, |prev| total.saturating_sub(prev));
                    self.prev.set(stat.id, total);
                    delta
                }
                None => 0,
            };

            snap.rows.push(ThreadRow {
                id: stat.id,
                name: stat.name,
                priority: stat.priority,
                stack_free,
                delta_cycles,
            });
        }

        snap.rows
            .sort_by(|a, b| b.delta_cycles.cmp(&a.delta_cycles));
        snap.delta_sum = snap.rows.iter().map(|r| r.delta_cycles).sum();
        snap.min_free_stack = if min_free_stack == u64::MAX {
            0
        } else {
            min_free_stack
        };

        snap.heap = match source.heap_stats() {
            Ok(heap) => Some(heap),
            Err(e) => {
                debug!("heap stats unavailable: {e:#}");
                None
            }
        };
        snap.cycles = match source.cycle_totals() {
            Ok(totals) => Some(totals),
            Err(e) => {
                debug!("cycle totals unavailable: {e:#}");
                None
            }
        };

        snap
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{Result, anyhow};
    use chrono::NaiveDateTime;

    use super::*;
    use crate::model::{CycleTotals, HeapStats};
    use crate::sources::ThreadStat;

    /// In-memory source scripted per test.
    #[derive(Default)]
    struct FakeSource {
        threads: Vec<ThreadStat>,
        load_permille: u32,
        uptime_secs: u64,
        heap: Option<HeapStats>,
        cycles: Option<CycleTotals>,
        clock_ok: bool,
    }

    impl SystemSource for FakeSource {
        fn threads(&mut self) -> Vec<ThreadStat> {
            self.threads.clone()
        }

        fn cpu_load_permille(&mut self) -> u32 {
            self.load_permille
        }

        fn uptime_secs(&mut self) -> u64 {
            self.uptime_secs
        }

        fn wall_clock(&mut self) -> Result<NaiveDateTime> {
            if self.clock_ok {
                Ok(NaiveDateTime::default())
            } else {
                Err(anyhow!("no clock"))
            }
        }

        fn heap_stats(&mut self) -> Result<HeapStats> {
            self.heap.ok_or_else(|| anyhow!("no heap stats"))
        }

        fn cycle_totals(&mut self) -> Result<CycleTotals> {
            self.cycles.ok_or_else(|| anyhow!("no cycle totals"))
        }
    }

    fn thread(id: u64, total_cycles: u64) -> ThreadStat {
        ThreadStat {
            id: ThreadId(id),
            name: Some(format!("t{id}")),
            priority: 5,
            stack_free: Some(1024),
            total_cycles: Some(total_cycles),
        }
    }

    #[test]
    fn test_first_sight_yields_zero_delta() {
        let mut source = FakeSource {
            threads: vec![thread(1, 100), thread(2, 100), thread(3, 100)],
            ..FakeSource::default()
        };
        let mut collector = Collector::new();

        let snap = collector.sample(&mut source);
        assert_eq!(snap.rows.len(), 3);
        assert!(snap.rows.iter().all(|r| r.delta_cycles == 0));
        assert_eq!(snap.delta_sum, 0);
    }

    #[test]
    fn test_deltas_sort_and_share_after_second_pass() {
        // Cumulative {100,100,100} then {150,300,100}.
        let mut source = FakeSource {
            threads: vec![thread(1, 100), thread(2, 100), thread(3, 100)],
            ..FakeSource::default()
        };
        let mut collector = Collector::new();
        collector.sample(&mut source);

        source.threads = vec![thread(1, 150), thread(2, 300), thread(3, 100)];
        let snap = collector.sample(&mut source);

        assert_eq!(snap.rows[0].id, ThreadId(2));
        assert_eq!(snap.rows[0].delta_cycles, 200);
        assert_eq!(snap.rows[1].delta_cycles, 50);
        assert_eq!(snap.rows[2].delta_cycles, 0);
        assert_eq!(snap.delta_sum, 250);
        assert_eq!(snap.share_percent(snap.rows[0].delta_cycles), 80);
    }

    #[test]
    fn test_rows_sorted_non_increasing() {
        let mut source = FakeSource {
            threads: (0..10).map(|i| thread(i, 100)).collect(),
            ..FakeSource::default()
        };
        let mut collector = Collector::new();
        collector.sample(&mut source);

        source.threads = (0..10).map(|i| thread(i, 100 + i * 7 % 50)).collect();
        let snap = collector.sample(&mut source);
        assert!(
            snap.rows
                .windows(2)
                .all(|w| w[0].delta_cycles >= w[1].delta_cycles)
        );
        assert_eq!(
            snap.delta_sum,
            snap.rows.iter().map(|r| r.delta_cycles).sum::<u64>()
        );
    }

    #[test]
    fn test_capacity_bounds_detail_not_count() {
        // 25 live threads against a capacity of 20.
        let mut source = FakeSource {
            threads: (0..25).map(|i| thread(i, 100)).collect(),
            ..FakeSource::default()
        };
        let mut collector = Collector::new();

        let snap = collector.sample(&mut source);
        assert_eq!(snap.rows.len(), MAX_ROWS);
        assert_eq!(snap.total_threads_seen, 25);
        // The 5 excess threads produced no row.
        assert!(snap.rows.iter().all(|r| r.id.0 < 20));
    }

    #[test]
    fn test_overflowed_table_never_tracks_new_threads() {
        let mut source = FakeSource {
            threads: (0..MAX_ROWS as u64).map(|i| thread(i, 100)).collect(),
            ..FakeSource::default()
        };
        let mut collector = Collector::new();
        collector.sample(&mut source);

        // Old threads gone, one new thread appears; the table is already
        // full so it never gets a baseline and stays at delta 0.
        source.threads = vec![thread(99, 500)];
        let snap = collector.sample(&mut source);
        assert_eq!(snap.rows[0].delta_cycles, 0);

        source.threads = vec![thread(99, 900)];
        let snap = collector.sample(&mut source);
        assert_eq!(snap.rows[0].delta_cycles, 0);
    }

    #[test]
    fn test_min_free_stack_and_unknown_stack() {
        let mut threads = vec![thread(1, 0), thread(2, 0), thread(3, 0)];
        threads[0].stack_free = Some(4096);
        threads[1].stack_free = Some(256);
        threads[2].stack_free = None;
        let mut source = FakeSource {
            threads,
            ..FakeSource::default()
        };

        let snap = Collector::new().sample(&mut source);
        assert_eq!(snap.min_free_stack, 256);
        assert_eq!(snap.unknown_stack, 1);
        // The failed read records a 0 sentinel in its row.
        assert_eq!(
            snap.rows.iter().find(|r| r.id == ThreadId(3)).unwrap().stack_free,
            0
        );
    }

    #[test]
    fn test_min_free_stack_zero_when_no_stack_read_succeeds() {
        let mut t = thread(1, 0);
        t.stack_free = None;
        let mut source = FakeSource {
            threads: vec![t],
            ..FakeSource::default()
        };

        let snap = Collector::new().sample(&mut source);
        assert_eq!(snap.min_free_stack, 0);
        assert_eq!(snap.unknown_stack, 1);
    }

    #[test]
    fn test_failed_cycle_read_yields_zero_delta() {
        let mut t = thread(1, 0);
        t.total_cycles = None;
        let mut source = FakeSource {
            threads: vec![t],
            ..FakeSource::default()
        };
        let mut collector = Collector::new();

        let snap = collector.sample(&mut source);
        assert_eq!(snap.rows[0].delta_cycles, 0);

        // The thread was never baselined, so a later successful read is
        // still first sight.
        source.threads = vec![thread(1, 700)];
        let snap = collector.sample(&mut source);
        assert_eq!(snap.rows[0].delta_cycles, 0);
    }

    #[test]
    fn test_degraded_reads_do_not_abort_the_sample() {
        let mut source = FakeSource {
            threads: vec![thread(1, 100)],
            load_permille: 430,
            uptime_secs: 77,
            heap: None,
            cycles: None,
            clock_ok: false,
        };

        let snap = Collector::new().sample(&mut source);
        assert_eq!(snap.rows.len(), 1);
        assert_eq!(snap.load_permille, 430);
        assert_eq!(snap.uptime_secs, 77);
        assert!(snap.wall_clock.is_none());
        assert!(snap.heap.is_none());
        assert!(snap.cycles.is_none());
    }

    #[test]
    fn test_load_permille_clamped() {
        let mut source = FakeSource {
            load_permille: 2500,
            ..FakeSource::default()
        };
        let snap = Collector::new().sample(&mut source);
        assert_eq!(snap.load_permille, 1000);
    }

    #[test]
    fn test_optional_stats_populate_when_available() {
        let mut source = FakeSource {
            heap: Some(HeapStats {
                allocated: 3000,
                free: 1000,
                peak: 3500,
            }),
            cycles: Some(CycleTotals {
                non_idle: 900,
                idle: 100,
            }),
            clock_ok: true,
            ..FakeSource::default()
        };

        let snap = Collector::new().sample(&mut source);
        assert_eq!(snap.heap.unwrap().allocated, 3000);
        assert_eq!(snap.cycles.unwrap().idle, 100);
        assert!(snap.wall_clock.is_some());
    }
}
