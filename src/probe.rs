//! Uploader availability probe.
//!
//! Runs the uploader runtime with a version query before anything else
//! happens. The probe never errors: anything other than a clean exit 0
//! within the time limit means "unavailable".

use std::process::{Command, Stdio};
use std::time::Duration;

use tracing::debug;

use crate::runner::{terminate_child, wait_child, WaitResult};
use crate::timeout::Deadline;

/// Checks that the uploader runtime can be executed.
#[derive(Debug, Clone)]
pub struct AvailabilityProbe {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl AvailabilityProbe {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// True only if the process started and exited 0 within the limit.
    pub fn probe(&self) -> bool {
        let mut child = match Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                debug!(program = %self.program, error = %e, "probe failed to start");
                return false;
            }
        };

        let deadline = Deadline::after(self.timeout);
        match wait_child(&mut child, &deadline, None) {
            Ok(WaitResult::Exited(status)) => {
                debug!(program = %self.program, status = %status, "probe finished");
                status.success()
            }
            Ok(WaitResult::TimedOut) => {
                debug!(program = %self.program, "probe timed out");
                terminate_child(&mut child, Duration::ZERO);
                false
            }
            Ok(WaitResult::Cancelled) | Err(_) => {
                terminate_child(&mut child, Duration::ZERO);
                false
            }
        }
    }
}
