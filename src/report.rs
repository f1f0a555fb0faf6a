//! Machine-readable summary of one pipeline run

use chrono::{DateTime, Utc};
use serde::Serialize;
use symup_command::Platform;

use crate::outcome::{FailureKind, FailureReason, OutcomeStatus, UploadOutcome};

/// Written to stdout with `--json`; also what the library hands back to
/// hosts.
#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub platform: Platform,
    pub version: String,
    pub dry_run: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<String>,

    /// Uploader command line with secrets redacted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    pub status: OutcomeStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<FailureKind>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploader_exit_code: Option<i32>,

    /// Stable exit code for this outcome
    pub exit_code: i32,

    /// What the host should be told
    pub task_succeeded: bool,

    #[serde(skip)]
    pub outcome: UploadOutcome,
}

impl UploadReport {
    /// Fill in the outcome-derived fields.
    pub(crate) fn with_outcome(mut self, outcome: UploadOutcome, message: Option<String>) -> Self {
        self.status = outcome.status();
        self.exit_code = outcome.exit_code().as_i32();
        self.task_succeeded = outcome.is_task_success();
        self.failure_kind = outcome.failure().map(FailureReason::kind);
        self.remediation = outcome.failure().and_then(FailureReason::remediation);
        self.uploader_exit_code = match &outcome {
            UploadOutcome::Succeeded => Some(0),
            UploadOutcome::Failed(FailureReason::NonZeroExit { code, .. }) => *code,
            _ => None,
        };
        self.message = match outcome.failure() {
            Some(reason) => Some(reason.to_string()),
            None => message,
        };
        self.outcome = outcome;
        self
    }

    pub(crate) fn started(
        run_id: String,
        started_at: DateTime<Utc>,
        platform: Platform,
        version: &str,
        dry_run: bool,
    ) -> Self {
        Self {
            run_id,
            started_at,
            duration_ms: 0,
            platform,
            version: version.to_string(),
            dry_run,
            service_name: None,
            artifact_path: None,
            command: None,
            status: OutcomeStatus::Failed,
            failure_kind: None,
            message: None,
            remediation: None,
            uploader_exit_code: None,
            exit_code: 0,
            task_succeeded: false,
            outcome: UploadOutcome::Failed(FailureReason::Cancelled),
        }
    }

    /// Process exit code for this run. See [`crate::ExitCode::for_mode`].
    pub fn process_exit_code(&self, strict: bool) -> i32 {
        self.outcome.exit_code().for_mode(strict).as_i32()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
