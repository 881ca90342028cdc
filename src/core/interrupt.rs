//! Operator interrupt handling.
//!
//! A Ctrl+C reaches the running stage directly (it shares our terminal's
//! process group), so the pipeline only has to remember that it happened and
//! refuse to start another stage. A second Ctrl+C exits immediately.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::warn;

use crate::domain::EXIT_INTERRUPTED;

/// Shared flag set when the operator interrupts the run
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the run as interrupted
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Set this flag on Ctrl+C; exit the process on a second Ctrl+C.
    ///
    /// Must be called from within a tokio runtime.
    pub fn listen_for_ctrl_c(&self) -> JoinHandle<()> {
        let flag = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            warn!("Interrupt received, waiting for the current stage to exit");
            flag.trigger();

            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Second interrupt received, exiting");
                std::process::exit(EXIT_INTERRUPTED);
            }
        })
    }
}
