//! System introspection contracts the collector samples from.
//!
//! Every read is independently fallible: the collector degrades a failed
//! read to "unavailable" for that one field and keeps going. Sources must
//! never block the sampling loop for long; each read is expected to be a
//! cheap, non-blocking kernel/procfs query.

use anyhow::Result;
use chrono::NaiveDateTime;

use crate::model::{CycleTotals, HeapStats, ThreadId};

pub mod proc;

/// One live thread as reported by a source.
///
/// `None` fields are reads that failed for this thread; each one fails
/// independently of the others.
#[derive(Debug, Clone, Default)]
pub struct ThreadStat {
    pub id: ThreadId,
    pub name: Option<String>,
    pub priority: i32,
    /// Free stack bytes, when the source can determine headroom.
    pub stack_free: Option<u64>,
    /// Cumulative CPU cycles since the thread started. Monotonic
    /// non-decreasing from the source.
    pub total_cycles: Option<u64>,
}

/// Bundle of system counters the collector samples once per pass.
pub trait SystemSource {
    /// Visits every currently live thread exactly once.
    fn threads(&mut self) -> Vec<ThreadStat>;

    /// CPU busy fraction for the last interval in parts-per-thousand.
    /// Never fails; degrades to 0 on internal error.
    fn cpu_load_permille(&mut self) -> u32;

    /// Seconds since system boot. Degrades to 0.
    fn uptime_secs(&mut self) -> u64;

    /// Calendar time. Fallible as a whole.
    fn wall_clock(&mut self) -> Result<NaiveDateTime>;

    /// Heap occupancy counters. Fallible as a whole.
    fn heap_stats(&mut self) -> Result<HeapStats>;

    /// Aggregate non-idle/idle cycle counts since boot. Fallible as a whole.
    fn cycle_totals(&mut self) -> Result<CycleTotals>;
}
