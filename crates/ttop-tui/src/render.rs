//! Dashboard renderer.
//!
//! Paints the static chrome once, then repaints only the dynamic regions in
//! place using absolute cursor addressing, so the terminal is never cleared
//! and re-scrolled between ticks. Every region write ends with a
//! clear-to-end-of-line so content that shrinks never leaves stale trailing
//! characters. The sink is any `io::Write`; tests render into a buffer.

use std::io::Write;

use anyhow::Result;
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::queue;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};
use ttop_core::model::{Snapshot, ThreadRow, VISIBLE_ROWS};

/// Character-cell width of the CPU and heap bars.
pub const BAR_WIDTH: usize = 30;

// Fixed dashboard rows, 0-based.
const ROW_TITLE: u16 = 0;
const ROW_CPU: u16 = 1;
const ROW_HEAP: u16 = 2;
const ROW_THREADS: u16 = 3;
const ROW_CYCLES: u16 = 4;
const ROW_HEADER: u16 = 6;
const ROW_LIST_START: u16 = 7;

// CPU severity tiers (percent). Fixed, not configurable.
const CPU_HIGH_PCT: u32 = 80;
const CPU_MEDIUM_PCT: u32 = 50;

/// In-place dashboard renderer over a character sink.
pub struct Renderer<W: Write> {
    out: W,
    layout_drawn: bool,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            layout_drawn: false,
        }
    }

    /// Consumes the renderer, returning the sink.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Paints the static chrome (title, section labels, column header, blank
    /// row reservations) exactly once. Subsequent calls are no-ops until
    /// [`Renderer::reset`].
    pub fn draw_static_layout(&mut self) -> Result<()> {
        if self.layout_drawn {
            return Ok(());
        }

        queue!(self.out, Clear(ClearType::All), MoveTo(0, 0), Hide)?;
        queue!(
            self.out,
            MoveTo(0, ROW_TITLE),
            SetForegroundColor(Color::Cyan),
            Print("ttop"),
            ResetColor
        )?;
        for (row, label) in [
            (ROW_CPU, "CPU"),
            (ROW_HEAP, "HEAP"),
            (ROW_THREADS, "THR"),
            (ROW_CYCLES, "CYC"),
        ] {
            queue!(self.out, MoveTo(0, row), Print(label))?;
        }
        queue!(self.out, MoveTo(0, ROW_HEADER), Print(header_line()))?;
        for i in 0..VISIBLE_ROWS {
            queue!(
                self.out,
                MoveTo(0, ROW_LIST_START + i as u16),
                Clear(ClearType::UntilNewLine)
            )?;
        }
        self.out.flush()?;
        self.layout_drawn = true;
        Ok(())
    }

    /// Repaints the dynamic regions from `snap`.
    pub fn draw(&mut self, snap: &Snapshot) -> Result<()> {
        self.draw_title(snap)?;
        self.draw_cpu(snap)?;
        self.draw_heap(snap)?;
        self.draw_threads_summary(snap)?;
        self.draw_cycles(snap)?;
        // Restating the header every tick is cheap and keeps alignment
        // robust against any terminal corruption.
        queue!(
            self.out,
            MoveTo(0, ROW_HEADER),
            Print(header_line()),
            Clear(ClearType::UntilNewLine)
        )?;
        self.draw_thread_rows(snap)?;
        self.out.flush()?;
        Ok(())
    }

    /// Restores default attributes and the cursor, parking it below the
    /// dashboard. Called once when a monitoring run stops; re-arms the
    /// static layout for the next run.
    pub fn reset(&mut self) -> Result<()> {
        queue!(
            self.out,
            ResetColor,
            MoveTo(0, ROW_LIST_START + VISIBLE_ROWS as u16),
            Show
        )?;
        self.out.flush()?;
        self.layout_drawn = false;
        Ok(())
    }

    fn draw_title(&mut self, snap: &Snapshot) -> Result<()> {
        let clock = snap.wall_clock.map_or_else(
            || "clock:n/a".to_string(),
            |now| now.format("%Y-%m-%d %H:%M:%S").to_string(),
        );
        queue!(
            self.out,
            MoveTo(0, ROW_TITLE),
            SetForegroundColor(Color::Cyan),
            Print("ttop"),
            ResetColor,
            Print(format!("  up:{}s  {}", snap.uptime_secs, clock)),
            Clear(ClearType::UntilNewLine)
        )?;
        Ok(())
    }

    fn draw_cpu(&mut self, snap: &Snapshot) -> Result<()> {
        let pct = snap.load_permille / 10;
        let color = if pct >= CPU_HIGH_PCT {
            Color::Red
        } else if pct >= CPU_MEDIUM_PCT {
            Color::Yellow
        } else {
            Color::Green
        };
        queue!(
            self.out,
            MoveTo(0, ROW_CPU),
            SetForegroundColor(color),
            Print(format!(
                "CPU  [{}] {}.{}%",
                fill_bar(u64::from(pct)),
                snap.load_permille / 10,
                snap.load_permille % 10
            )),
            ResetColor,
            Clear(ClearType::UntilNewLine)
        )?;
        Ok(())
    }

    fn draw_heap(&mut self, snap: &Snapshot) -> Result<()> {
        queue!(
            self.out,
            MoveTo(0, ROW_HEAP),
            SetForegroundColor(Color::Cyan),
            Print("HEAP"),
            ResetColor
        )?;
        match snap.heap {
            Some(heap) => {
                let total = heap.allocated + heap.free;
                let pct = if total == 0 {
                    0
                } else {
                    heap.allocated * 100 / total
                };
                queue!(
                    self.out,
                    Print(format!(
                        " [{}] used:{}B free:{}B peak:{}B",
                        fill_bar(pct),
                        heap.allocated,
                        heap.free,
                        heap.peak
                    ))
                )?;
            }
            None => {
                queue!(self.out, Print(format!(" [{}] n/a", fill_bar(0))))?;
            }
        }
        queue!(self.out, Clear(ClearType::UntilNewLine))?;
        Ok(())
    }

    fn draw_threads_summary(&mut self, snap: &Snapshot) -> Result<()> {
        queue!(
            self.out,
            MoveTo(0, ROW_THREADS),
            SetForegroundColor(Color::Cyan),
            Print("THR "),
            ResetColor,
            Print(format!(
                " total:{} shown:{} min_free_stack:{}B unknown_stack:{}",
                snap.total_threads_seen,
                snap.rows.len(),
                snap.min_free_stack,
                snap.unknown_stack
            )),
            Clear(ClearType::UntilNewLine)
        )?;
        Ok(())
    }

    fn draw_cycles(&mut self, snap: &Snapshot) -> Result<()> {
        let body = snap.cycles.map_or_else(
            || " n/a".to_string(),
            |totals| format!(" total_non_idle:{} idle:{}", totals.non_idle, totals.idle),
        );
        queue!(
            self.out,
            MoveTo(0, ROW_CYCLES),
            SetForegroundColor(Color::Cyan),
            Print("CYC "),
            ResetColor,
            Print(body),
            Clear(ClearType::UntilNewLine)
        )?;
        Ok(())
    }

    fn draw_thread_rows(&mut self, snap: &Snapshot) -> Result<()> {
        let top_n = snap.rows.len().min(VISIBLE_ROWS);
        for (i, row) in snap.rows.iter().take(top_n).enumerate() {
            queue!(
                self.out,
                MoveTo(0, ROW_LIST_START + i as u16),
                Print(thread_line(row, snap)),
                Clear(ClearType::UntilNewLine)
            )?;
        }
        // Slots beyond the populated rows are erased, never left stale.
        for i in top_n..VISIBLE_ROWS {
            queue!(
                self.out,
                MoveTo(0, ROW_LIST_START + i as u16),
                Clear(ClearType::UntilNewLine)
            )?;
        }
        Ok(())
    }
}

fn header_line() -> String {
    format!(
        "{:<12} {:>5} {:>9} {:>12} {:>6}",
        "thread", "prio", "stack(B)", "delta", "share%"
    )
}

fn thread_line(row: &ThreadRow, snap: &Snapshot) -> String {
    let name: String = row
        .name
        .as_deref()
        .unwrap_or("(noname)")
        .chars()
        .take(12)
        .collect();
    format!(
        "{:<12} {:>5} {:>9} {:>12} {:>6}",
        name,
        row.priority,
        row.stack_free,
        row.delta_cycles,
        snap.share_percent(row.delta_cycles)
    )
}

/// Proportional ASCII bar, clamped to `BAR_WIDTH` even when `pct` > 100.
fn fill_bar(pct: u64) -> String {
    let filled = ((pct as usize * BAR_WIDTH) / 100).min(BAR_WIDTH);
    let mut bar = String::with_capacity(BAR_WIDTH);
    for i in 0..BAR_WIDTH {
        bar.push(if i < filled { '#' } else { '-' });
    }
    bar
}
