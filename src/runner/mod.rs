//! Uploader process runner.
//!
//! Launches the uploader with inherited stdout/stderr, applies the
//! credential/site overlay, enforces the wall-clock limit and maps the
//! exit status to an [`UploadOutcome`]. One attempt per call; retries are
//! the host's business.

mod env;
mod wait;

pub use env::{
    credential_overlay, CredentialSource, EnvOverlay, API_KEY_VAR, DRY_RUN_PLACEHOLDER_KEY,
    LEGACY_API_KEY_VAR, SITE_VAR,
};
pub(crate) use wait::{terminate_child, wait_child, WaitResult};

use std::process::{Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use symup_command::{Credential, Invocation};
use tracing::{debug, info, warn};

use crate::outcome::{FailureReason, UploadOutcome};
use crate::signal::CancelToken;
use crate::timeout::{Deadline, TimeoutConfig};

/// Per-run inputs that are not part of the argument vector.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions<'a> {
    pub credential: Option<&'a Credential>,
    pub site: Option<&'a str>,
    pub dry_run: bool,
}

type AmbientEnv = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Runs one uploader invocation to completion.
#[derive(Clone)]
pub struct ProcessRunner {
    timeout: Duration,
    grace: Duration,
    cancel: CancelToken,
    ambient: AmbientEnv,
}

impl std::fmt::Debug for ProcessRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRunner")
            .field("timeout", &self.timeout)
            .field("grace", &self.grace)
            .finish_non_exhaustive()
    }
}

impl ProcessRunner {
    pub fn new(timeouts: &TimeoutConfig, cancel: CancelToken) -> Self {
        Self {
            timeout: timeouts.upload(),
            grace: timeouts.termination_grace(),
            cancel,
            ambient: Arc::new(|name| std::env::var(name).ok()),
        }
    }

    /// Replace the lookup used to inspect the inherited environment.
    pub fn with_ambient_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.ambient = Arc::new(lookup);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn run(&self, invocation: &Invocation, options: &RunOptions<'_>) -> UploadOutcome {
        let overlay = credential_overlay(
            options.credential,
            options.site,
            options.dry_run,
            |name| (self.ambient)(name),
        );

        match overlay.credential {
            CredentialSource::Supplied => debug!("using supplied API key"),
            CredentialSource::Ambient => debug!("using API key from environment"),
            CredentialSource::Placeholder => info!(
                "dry run without API key, setting {} to a placeholder",
                API_KEY_VAR
            ),
            CredentialSource::Missing => warn!(
                "no API key supplied and neither {} nor {} is set; the upload will likely fail",
                API_KEY_VAR, LEGACY_API_KEY_VAR
            ),
        }
        if let Some(site) = overlay.vars.get(SITE_VAR) {
            debug!(site = %site, "upload site selected");
        }

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .envs(&invocation.env)
            .envs(&overlay.vars)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(dir) = &invocation.working_dir {
            command.current_dir(dir);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => return UploadOutcome::Failed(FailureReason::SpawnFailure(e.to_string())),
        };
        debug!(pid = child.id(), "uploader started");

        let deadline = Deadline::after(self.timeout);
        match wait_child(&mut child, &deadline, Some(&self.cancel)) {
            Ok(WaitResult::Exited(status)) => interpret_status(status),
            Ok(WaitResult::TimedOut) => {
                terminate_child(&mut child, self.grace);
                UploadOutcome::Failed(FailureReason::Timeout {
                    seconds: self.timeout.as_secs(),
                })
            }
            Ok(WaitResult::Cancelled) => {
                terminate_child(&mut child, self.grace);
                UploadOutcome::Failed(FailureReason::Cancelled)
            }
            Err(e) => {
                terminate_child(&mut child, self.grace);
                UploadOutcome::Failed(FailureReason::SpawnFailure(format!(
                    "lost track of uploader process: {}",
                    e
                )))
            }
        }
    }
}

fn interpret_status(status: ExitStatus) -> UploadOutcome {
    if status.success() {
        return UploadOutcome::Succeeded;
    }

    #[cfg(unix)]
    let signal = {
        use std::os::unix::process::ExitStatusExt;
        status.signal()
    };
    #[cfg(not(unix))]
    let signal = None;

    UploadOutcome::Failed(FailureReason::NonZeroExit {
        code: status.code(),
        signal,
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;

    fn runner(upload_seconds: u64) -> ProcessRunner {
        let timeouts = TimeoutConfig {
            upload_seconds,
            probe_seconds: 5,
            termination_grace_seconds: 1,
        };
        ProcessRunner::new(&timeouts, CancelToken::new()).with_ambient_env(|_| None)
    }

    fn sh(script: &str) -> Invocation {
        let mut inv = Invocation::new("sh");
        inv.args(["-c", script, "sh"]);
        inv
    }

    fn options(dry_run: bool) -> RunOptions<'static> {
        RunOptions {
            credential: None,
            site: None,
            dry_run,
        }
    }

    #[test]
    fn test_exit_zero_succeeds() {
        let outcome = runner(10).run(&sh("exit 0"), &options(false));
        assert_eq!(outcome, UploadOutcome::Succeeded);
    }

    #[test]
    fn test_nonzero_exit_code_reported() {
        let outcome = runner(10).run(&sh("exit 3"), &options(false));
        assert_eq!(
            outcome,
            UploadOutcome::Failed(FailureReason::NonZeroExit {
                code: Some(3),
                signal: None
            })
        );
    }

    #[test]
    fn test_killed_by_signal_reported() {
        let outcome = runner(10).run(&sh("kill -9 $$"), &options(false));
        assert_eq!(
            outcome,
            UploadOutcome::Failed(FailureReason::NonZeroExit {
                code: None,
                signal: Some(9)
            })
        );
    }

    #[test]
    fn test_spawn_failure() {
        let inv = Invocation::new("/nonexistent/symup-uploader");
        let outcome = runner(10).run(&inv, &options(false));
        assert!(matches!(
            outcome,
            UploadOutcome::Failed(FailureReason::SpawnFailure(_))
        ));
    }

    #[test]
    fn test_timeout_terminates() {
        let start = Instant::now();
        let outcome = runner(1).run(&sh("exec sleep 30"), &options(false));
        assert_eq!(
            outcome,
            UploadOutcome::Failed(FailureReason::Timeout { seconds: 1 })
        );
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_cancel_terminates() {
        let token = CancelToken::new();
        let timeouts = TimeoutConfig::default();
        let runner = ProcessRunner::new(&timeouts, token.clone()).with_ambient_env(|_| None);
        token.cancel();
        let outcome = runner.run(&sh("exec sleep 30"), &options(false));
        assert_eq!(outcome, UploadOutcome::Failed(FailureReason::Cancelled));
    }

    #[test]
    fn test_placeholder_visible_to_child_on_dry_run() {
        let script = format!("test \"${}\" = \"{}\"", API_KEY_VAR, DRY_RUN_PLACEHOLDER_KEY);
        let outcome = runner(10).run(&sh(&script), &options(true));
        assert_eq!(outcome, UploadOutcome::Succeeded);
    }

    #[test]
    fn test_supplied_credential_and_site_visible_to_child() {
        let key = Credential::new("k-123");
        let script = format!(
            "test \"${}\" = k-123 && test \"${}\" = datadoghq.eu",
            API_KEY_VAR, SITE_VAR
        );
        let outcome = runner(10).run(
            &sh(&script),
            &RunOptions {
                credential: Some(&key),
                site: Some("datadoghq.eu"),
                dry_run: false,
            },
        );
        assert_eq!(outcome, UploadOutcome::Succeeded);
    }

    #[test]
    fn test_working_dir_applied() {
        let dir = tempfile::tempdir().unwrap();
        let mut inv = sh("test -f marker");
        std::fs::write(dir.path().join("marker"), b"").unwrap();
        inv.working_dir = Some(dir.path().to_path_buf());
        assert_eq!(runner(10).run(&inv, &options(false)), UploadOutcome::Succeeded);
    }
}
