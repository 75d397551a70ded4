//! Snapshot data model shared by the collector and the renderer.

use chrono::NaiveDateTime;

/// Maximum number of threads detailed in one snapshot. Threads beyond this are
/// counted in `total_threads_seen` but get no row.
pub const MAX_ROWS: usize = 20;

/// Maximum number of thread rows rendered on screen at once (≤ `MAX_ROWS`).
pub const VISIBLE_ROWS: usize = 8;

/// Opaque thread identity, stable for the thread's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ThreadId(pub u64);

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One thread's sample within a snapshot. Constructed fresh each sampling
/// pass; only the cumulative-cycle baseline survives between passes.
#[derive(Debug, Clone, Default)]
pub struct ThreadRow {
    pub id: ThreadId,
    /// Display name; `None` when the source could not provide one.
    pub name: Option<String>,
    /// Lower value = higher priority, by kernel convention.
    pub priority: i32,
    /// Free stack bytes; 0 when the read failed (counted in `unknown_stack`).
    pub stack_free: u64,
    /// CPU cycles consumed since the previous sample. 0 on first sight.
    pub delta_cycles: u64,
}

/// Heap occupancy counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapStats {
    pub allocated: u64,
    pub free: u64,
    pub peak: u64,
}

/// Aggregate cycle counters across all threads since boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleTotals {
    pub non_idle: u64,
    pub idle: u64,
}

/// One sampling pass's complete, immutable result set.
///
/// `delta_sum` covers the produced rows only, so the percentage shares derived
/// from it are relative to the *visible* threads, not the whole system. A
/// thread skipped for capacity contributes to `total_threads_seen` but not to
/// `delta_sum`.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Rows sorted descending by `delta_cycles`; at most `MAX_ROWS`.
    pub rows: Vec<ThreadRow>,
    /// Every thread observed this pass, including ones over row capacity.
    pub total_threads_seen: u32,
    /// Threads whose stack headroom could not be determined.
    pub unknown_stack: u32,
    /// Minimum free stack among rows that reported headroom; 0 if none did.
    pub min_free_stack: u64,
    /// Sum of all rows' `delta_cycles` (percentage denominator).
    pub delta_sum: u64,
    /// System CPU busy fraction for the interval, 0–1000.
    pub load_permille: u32,
    pub uptime_secs: u64,
    /// Wall-clock reading; `None` when the clock was unavailable.
    pub wall_clock: Option<NaiveDateTime>,
    /// Heap counters; `None` when the heap stats read failed.
    pub heap: Option<HeapStats>,
    /// Aggregate cycle counters; `None` when the read failed.
    pub cycles: Option<CycleTotals>,
}

impl Snapshot {
    /// Percentage share of `delta_cycles` against this snapshot's visible
    /// delta sum. 0 when the sum is 0.
    pub fn share_percent(&self, delta_cycles: u64) -> u64 {
        if self.delta_sum == 0 {
            0
        } else {
            delta_cycles * 100 / self.delta_sum
        }
    }
}
