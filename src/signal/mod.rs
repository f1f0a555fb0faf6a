//! Cooperative cancellation (SIGINT/SIGTERM)
//!
//! The first signal trips the shared [`CancelToken`]; the runner notices on
//! its next poll, terminates the uploader and reports `Cancelled`. A second
//! signal exits immediately with the cancelled exit code.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use tracing::warn;

use crate::outcome::ExitCode;

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// What to do with a received signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// First signal: cancel the running upload
    Cancel,
    /// Second signal: exit now
    ImmediateExit,
    /// Third and later: nothing left to do
    Ignore,
}

/// Counts signals and trips the token
#[derive(Debug, Clone)]
pub struct SignalHandler {
    token: CancelToken,
    count: Arc<AtomicU8>,
}

impl SignalHandler {
    pub fn new(token: CancelToken) -> Self {
        Self {
            token,
            count: Arc::new(AtomicU8::new(0)),
        }
    }

    /// Record one signal and decide what to do.
    pub fn handle_signal(&self) -> SignalAction {
        match self.count.fetch_add(1, Ordering::SeqCst) {
            0 => {
                self.token.cancel();
                SignalAction::Cancel
            }
            1 => SignalAction::ImmediateExit,
            _ => SignalAction::Ignore,
        }
    }

    /// Install the process-wide handler. Call once at startup.
    pub fn install(&self) -> Result<(), ctrlc::Error> {
        let handler = self.clone();
        ctrlc::set_handler(move || match handler.handle_signal() {
            SignalAction::Cancel => {
                warn!("received interrupt, cancelling upload");
            }
            SignalAction::ImmediateExit => {
                warn!("received second interrupt, exiting immediately");
                std::process::exit(ExitCode::Cancelled.as_i32());
            }
            SignalAction::Ignore => {}
        })
    }
}
