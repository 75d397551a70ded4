//! Ctrl+C / termination-signal handling.
//!
//! The handler sets a flag only; it does not print anything. The dashboard
//! owns the terminal, so the run loop is responsible for restoring it after
//! the interrupt is observed. A second Ctrl+C force-exits, restoring the
//! terminal through the registered hook first.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);
static INTERRUPT_NOTIFY: OnceLock<Notify> = OnceLock::new();
static RESTORE_HOOK: OnceLock<Box<dyn Fn() + Send + Sync>> = OnceLock::new();

/// Initializes the signal handler. The `termination` feature of `ctrlc`
/// routes SIGTERM and SIGHUP here as well, so service managers get a clean
/// shutdown too.
///
/// # Panics
/// Panics if registering the handler fails.
pub fn init() {
    ctrlc::set_handler(trigger).expect("Error setting Ctrl+C handler");
}

/// Registers a hook run before a forced exit (second Ctrl+C).
pub fn set_restore_hook<F>(hook: F)
where
    F: Fn() + Send + Sync + 'static,
{
    let _ = RESTORE_HOOK.set(Box::new(hook));
}

fn trigger() {
    if INTERRUPTED.swap(true, Ordering::SeqCst) {
        // Second interrupt - force exit. process::exit() bypasses Drop
        // handlers, so restore the terminal first.
        if let Some(hook) = RESTORE_HOOK.get() {
            hook();
        }
        std::process::exit(130);
    }
    INTERRUPT_NOTIFY.get_or_init(Notify::new).notify_waiters();
}

pub fn is_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Waits until an interrupt is triggered.
pub async fn wait_for_interrupt() {
    loop {
        if is_interrupted() {
            return;
        }
        INTERRUPT_NOTIFY.get_or_init(Notify::new).notified().await;
    }
}
