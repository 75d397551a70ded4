//! Run command: drives the monitor until interrupted.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;
use ttop_core::sources::proc::ProcSource;
use ttop_tui::monitor::Monitor;
use ttop_tui::terminal;

use crate::{interrupt, logging};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub pid: Option<i32>,
    pub interval: Duration,
    pub log_file: Option<PathBuf>,
}

pub fn run(opts: RunOptions) -> Result<()> {
    // Held for the life of the process so buffered log lines flush on exit.
    let _log_guard = logging::init(opts.log_file.as_deref())?;
    interrupt::init();

    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(run_monitor(opts))
}

async fn run_monitor(opts: RunOptions) -> Result<()> {
    // Panic hook and restore hook BEFORE entering the alternate screen.
    terminal::install_panic_hook();
    interrupt::set_restore_hook(|| {
        let _ = terminal::restore_terminal();
    });
    terminal::setup_terminal()?;

    let source = ProcSource::new(opts.pid);
    info!(pid = source.pid(), "monitoring target process");

    let monitor = Monitor::new(opts.interval);
    let result = match monitor.start(source, io::stdout()).await {
        Ok(_) => {
            interrupt::wait_for_interrupt().await;
            monitor.stop().await.map(|_| ())
        }
        Err(e) => Err(e),
    };

    // Restore unconditionally; the alternate screen must not outlive the run.
    let _ = terminal::restore_terminal();
    result
}
