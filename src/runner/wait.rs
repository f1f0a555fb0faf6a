//! Bounded waiting on a child process and best-effort termination.

use std::io;
use std::process::{Child, ExitStatus};
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::signal::CancelToken;
use crate::timeout::Deadline;

/// How often a running child is polled.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How a bounded wait ended.
#[derive(Debug)]
pub(crate) enum WaitResult {
    Exited(ExitStatus),
    TimedOut,
    Cancelled,
}

/// Poll `child` until it exits, the deadline passes, or `cancel` trips.
///
/// The child is left running on `TimedOut` and `Cancelled`.
pub(crate) fn wait_child(
    child: &mut Child,
    deadline: &Deadline,
    cancel: Option<&CancelToken>,
) -> io::Result<WaitResult> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(WaitResult::Exited(status));
        }
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return Ok(WaitResult::Cancelled);
        }
        if deadline.is_expired() {
            return Ok(WaitResult::TimedOut);
        }
        thread::sleep(POLL_INTERVAL.min(deadline.remaining()));
    }
}

/// Stop `child`, reaping it before returning.
///
/// On unix the child first gets SIGTERM and `grace` to exit, then SIGKILL.
/// Elsewhere it is killed straight away. All errors are swallowed.
pub(crate) fn terminate_child(child: &mut Child, grace: Duration) {
    debug!(pid = child.id(), "terminating uploader");

    #[cfg(unix)]
    {
        use nix::sys::signal::{self, Signal};
        use nix::unistd::Pid;

        if !grace.is_zero() {
            let pid = Pid::from_raw(child.id() as i32);
            if signal::kill(pid, Signal::SIGTERM).is_ok() {
                let deadline = Deadline::after(grace);
                while !deadline.is_expired() {
                    match child.try_wait() {
                        Ok(Some(_)) => return,
                        Ok(None) => thread::sleep(POLL_INTERVAL),
                        Err(_) => break,
                    }
                }
            }
        }
    }
    #[cfg(not(unix))]
    let _ = grace;

    let _ = child.kill();
    let _ = child.wait();
}
