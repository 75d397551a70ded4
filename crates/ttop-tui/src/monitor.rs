//! Monitor lifecycle controller.
//!
//! Owns the background sampling task: `start` paints the static layout and
//! spawns the loop, `stop` cancels and joins it, `status` is a pure read.
//! Start/stop calls from different tasks serialize on an internal mutex, so
//! at most one sampling loop exists at a time. `stop` only returns after the
//! loop task has exited, so its resources are known to be quiescent.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use ttop_core::collector::Collector;
use ttop_core::sources::SystemSource;

use crate::render::Renderer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// Benign: a loop is already running, no second one was spawned.
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    /// Benign: nothing was running, the terminal reset was not re-emitted.
    AlreadyStopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Running,
    Stopped,
}

struct RunningTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Lifecycle controller for the sampling loop.
pub struct Monitor {
    interval: Duration,
    task: Mutex<Option<RunningTask>>,
}

impl Monitor {
    /// `interval` is clamped to at least 1ms; `tokio::time::interval`
    /// panics on a zero period, which would kill the sampling task.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            task: Mutex::new(None),
        }
    }

    /// Starts the sampling loop over `source`, rendering into `out`.
    ///
    /// Paints the static layout once before the first tick. A second call
    /// while running spawns nothing and reports [`StartOutcome::AlreadyRunning`].
    ///
    /// # Errors
    /// Fails only when the initial layout paint fails; the loop itself
    /// absorbs all degraded conditions.
    pub async fn start<S, W>(&self, source: S, out: W) -> Result<StartOutcome>
    where
        S: SystemSource + Send + 'static,
        W: Write + Send + 'static,
    {
        let mut task = self.task.lock().await;
        if task.is_some() {
            info!("monitor already running");
            return Ok(StartOutcome::AlreadyRunning);
        }

        let mut renderer = Renderer::new(out);
        renderer
            .draw_static_layout()
            .context("paint static layout")?;

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(sampling_loop(
            Collector::new(),
            source,
            renderer,
            self.interval,
            cancel.clone(),
        ));
        *task = Some(RunningTask { cancel, handle });
        info!(interval_ms = self.interval.as_millis() as u64, "monitor started");
        Ok(StartOutcome::Started)
    }

    /// Stops the sampling loop and waits for the task to exit.
    ///
    /// # Errors
    /// Fails if the loop task panicked.
    pub async fn stop(&self) -> Result<StopOutcome> {
        let mut task = self.task.lock().await;
        let Some(running) = task.take() else {
            info!("monitor already stopped");
            return Ok(StopOutcome::AlreadyStopped);
        };

        running.cancel.cancel();
        running.handle.await.context("join sampling task")?;
        info!("monitor stopped");
        Ok(StopOutcome::Stopped)
    }

    /// Current state; no side effects.
    pub async fn status(&self) -> Status {
        if self.task.lock().await.is_some() {
            Status::Running
        } else {
            Status::Stopped
        }
    }
}

async fn sampling_loop<S, W>(
    mut collector: Collector,
    mut source: S,
    mut renderer: Renderer<W>,
    interval: Duration,
    cancel: CancellationToken,
) where
    S: SystemSource + Send,
    W: Write + Send,
{
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let snap = collector.sample(&mut source);
                if let Err(e) = renderer.draw(&snap) {
                    warn!("dashboard draw failed: {e:#}");
                }
            }
        }
    }
    // The reset belongs to the run that painted the dashboard; emitting it
    // here (before stop() observes the join) means a stop() on an
    // already-stopped monitor never re-emits it.
    if let Err(e) = renderer.reset() {
        warn!("terminal reset failed: {e:#}");
    }
}
