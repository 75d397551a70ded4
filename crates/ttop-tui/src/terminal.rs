//! Terminal lifecycle management.
//!
//! The dashboard owns the terminal for the duration of a monitoring run.
//! Terminal state is guaranteed to be restored on:
//! - Normal stop
//! - Ctrl+C signal
//! - Panic

use std::io;
use std::panic;

use anyhow::{Context, Result};
use crossterm::cursor::Show;
use crossterm::execute;
use crossterm::style::ResetColor;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};

/// Sets up the terminal for the dashboard.
///
/// Enters the alternate screen so the caller's scrollback survives the run.
/// Raw mode is not needed: the dashboard has no input path.
///
/// Call `install_panic_hook()` before this to ensure terminal restore on panic.
///
/// # Errors
/// Returns an error if the operation fails.
pub fn setup_terminal() -> Result<()> {
    execute!(io::stdout(), EnterAlternateScreen).context("Failed to enter alternate screen")?;
    Ok(())
}

/// Restores terminal state.
///
/// - Resets text attributes (safe even if none are set)
/// - Shows the cursor (the renderer hides it)
/// - Leaves the alternate screen
///
/// This function is idempotent and safe to call multiple times.
///
/// # Errors
/// Returns an error if the operation fails.
pub fn restore_terminal() -> Result<()> {
    execute!(io::stdout(), ResetColor, Show, LeaveAlternateScreen)
        .context("Failed to restore terminal")?;
    Ok(())
}

/// Installs a panic hook that restores the terminal before printing the panic.
///
/// Call this BEFORE `setup_terminal()` to ensure terminal restore on panic.
pub fn install_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        original_hook(panic_info);
    }));
}
