//! Linux `/proc` backend for [`SystemSource`].
//!
//! Monitors one target process (default: our own). Threads come from
//! `/proc/<pid>/task/*/stat`; "cycles" are cumulative `utime + stime` clock
//! ticks, which are monotonic non-decreasing as the contract requires.
//!
//! Stack headroom is only derivable for the main thread (from `VmStk` in
//! `status` against the soft stack rlimit in `limits`); every other thread
//! reports unknown headroom and shows up in the snapshot's `unknown_stack`
//! counter.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDateTime;

use crate::model::{CycleTotals, HeapStats, ThreadId};
use crate::sources::{SystemSource, ThreadStat};

#[derive(Debug, Clone, Copy)]
struct CpuTicks {
    busy: u64,
    idle: u64,
}

/// `/proc`-backed system source for a single target process.
#[derive(Debug)]
pub struct ProcSource {
    pid: i32,
    /// Aggregate tick baseline for the busy-fraction delta.
    cpu_prev: Option<CpuTicks>,
    /// High-water mark of allocated bytes, tracked source-side since
    /// `/proc/meminfo` has no peak counter.
    heap_peak: u64,
}

impl ProcSource {
    /// Creates a source for `pid`, defaulting to the current process.
    pub fn new(pid: Option<i32>) -> Self {
        Self {
            pid: pid.unwrap_or_else(|| std::process::id() as i32),
            cpu_prev: None,
            heap_peak: 0,
        }
    }

    pub fn pid(&self) -> i32 {
        self.pid
    }

    fn task_dir(&self) -> PathBuf {
        PathBuf::from(format!("/proc/{}/task", self.pid))
    }

    fn read_cpu_ticks(&self) -> Result<CpuTicks> {
        let raw = fs::read_to_string("/proc/stat").context("read /proc/stat")?;
        parse_cpu_line(&raw).ok_or_else(|| anyhow!("no aggregate cpu line in /proc/stat"))
    }

    /// Main-thread stack headroom: soft rlimit minus current stack size.
    fn main_stack_free(&self) -> Option<u64> {
        let status = fs::read_to_string(format!("/proc/{}/status", self.pid)).ok()?;
        let limits = fs::read_to_string(format!("/proc/{}/limits", self.pid)).ok()?;
        let used = parse_vm_stk_bytes(&status)?;
        let limit = parse_stack_limit_bytes(&limits)?;
        Some(limit.saturating_sub(used))
    }
}

impl SystemSource for ProcSource {
    fn threads(&mut self) -> Vec<ThreadStat> {
        let Ok(entries) = fs::read_dir(self.task_dir()) else {
            return Vec::new();
        };

        let main_stack_free = self.main_stack_free();
        let mut stats = Vec::new();
        for entry in entries.flatten() {
            let Some(tid) = entry
                .file_name()
                .to_str()
                .and_then(|s| s.parse::<u64>().ok())
            else {
                continue;
            };

            let mut stat = ThreadStat {
                id: ThreadId(tid),
                ..ThreadStat::default()
            };
            // A thread can exit mid-walk; a vanished stat file degrades to
            // an id-only row rather than aborting the pass.
            if let Some(task) = fs::read_to_string(entry.path().join("stat"))
                .ok()
                .as_deref()
                .and_then(parse_task_stat)
            {
                stat.name = Some(task.name);
                stat.priority = task.priority;
                stat.total_cycles = Some(task.utime + task.stime);
            }
            if tid == self.pid as u64 {
                stat.stack_free = main_stack_free;
            }
            stats.push(stat);
        }
        stats
    }

    fn cpu_load_permille(&mut self) -> u32 {
        let Ok(now) = self.read_cpu_ticks() else {
            return 0;
        };
        let prev = self.cpu_prev.replace(now);
        let Some(prev) = prev else {
            // No baseline on the first read.
            return 0;
        };

        let busy = now.busy.saturating_sub(prev.busy);
        let total = busy + now.idle.saturating_sub(prev.idle);
        if total == 0 {
            return 0;
        }
        (busy * 1000 / total) as u32
    }

    fn uptime_secs(&mut self) -> u64 {
        fs::read_to_string("/proc/uptime")
            .ok()
            .and_then(|raw| {
                raw.split_whitespace()
                    .next()
                    .and_then(|s| s.parse::<f64>().ok())
            })
            .map_or(0, |secs| secs as u64)
    }

    fn wall_clock(&mut self) -> Result<NaiveDateTime> {
        Ok(chrono::Local::now().naive_local())
    }

    fn heap_stats(&mut self) -> Result<HeapStats> {
        let raw = fs::read_to_string("/proc/meminfo").context("read /proc/meminfo")?;
        let total = parse_meminfo_kb(&raw, "MemTotal:")
            .ok_or_else(|| anyhow!("MemTotal missing from /proc/meminfo"))?
            * 1024;
        let free = parse_meminfo_kb(&raw, "MemAvailable:")
            .ok_or_else(|| anyhow!("MemAvailable missing from /proc/meminfo"))?
            * 1024;

        let allocated = total.saturating_sub(free);
        self.heap_peak = self.heap_peak.max(allocated);
        Ok(HeapStats {
            allocated,
            free,
            peak: self.heap_peak,
        })
    }

    fn cycle_totals(&mut self) -> Result<CycleTotals> {
        let ticks = self.read_cpu_ticks()?;
        Ok(CycleTotals {
            non_idle: ticks.busy,
            idle: ticks.idle,
        })
    }
}

#[derive(Debug)]
struct TaskStat {
    name: String,
    priority: i32,
    utime: u64,
    stime: u64,
}

/// Parses one `/proc/<pid>/task/<tid>/stat` line. The comm field may contain
/// spaces and parentheses, so everything is anchored on the last `)`.
fn parse_task_stat(raw: &str) -> Option<TaskStat> {
    let open = raw.find('(')?;
    let close = raw.rfind(')')?;
    let name = raw.get(open + 1..close)?.to_string();

    // Fields after the comm, 0-based: state=0, utime=11, stime=12, priority=15.
    let rest: Vec<&str> = raw.get(close + 1..)?.split_whitespace().collect();
    Some(TaskStat {
        name,
        priority: rest.get(15)?.parse().ok()?,
        utime: rest.get(11)?.parse().ok()?,
        stime: rest.get(12)?.parse().ok()?,
    })
}

/// Parses the aggregate `cpu` line of `/proc/stat` into busy/idle tick sums.
fn parse_cpu_line(raw: &str) -> Option<CpuTicks> {
    let line = raw.lines().find(|l| l.starts_with("cpu "))?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .filter_map(|s| s.parse().ok())
        .collect();
    // user nice system idle iowait irq softirq steal
    if fields.len() < 8 {
        return None;
    }
    Some(CpuTicks {
        busy: fields[0] + fields[1] + fields[2] + fields[5] + fields[6] + fields[7],
        idle: fields[3] + fields[4],
    })
}

fn parse_meminfo_kb(raw: &str, key: &str) -> Option<u64> {
    raw.lines()
        .find(|l| l.starts_with(key))?
        .split_whitespace()
        .nth(1)?
        .parse()
        .ok()
}

fn parse_vm_stk_bytes(status: &str) -> Option<u64> {
    parse_meminfo_kb(status, "VmStk:").map(|kb| kb * 1024)
}

/// Soft stack limit from `/proc/<pid>/limits`; `None` when unlimited.
fn parse_stack_limit_bytes(limits: &str) -> Option<u64> {
    let line = limits.lines().find(|l| l.starts_with("Max stack size"))?;
    line.split_whitespace()
        .find_map(|tok| tok.parse::<u64>().ok())
}
