//! Upload outcomes, failure taxonomy and stable exit codes

use serde::{Deserialize, Serialize};
use symup_command::Platform;

/// Terminal value of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The uploader ran and exited 0
    Succeeded,
    /// No symbol artifact to upload; reported to the host as success
    SkippedMissingArtifact,
    /// Hard failure
    Failed(FailureReason),
}

impl UploadOutcome {
    /// Whether the host should treat the task as passed.
    ///
    /// Soft-skip counts as success.
    pub fn is_task_success(&self) -> bool {
        !matches!(self, UploadOutcome::Failed(_))
    }

    pub fn status(&self) -> OutcomeStatus {
        match self {
            UploadOutcome::Succeeded => OutcomeStatus::Succeeded,
            UploadOutcome::SkippedMissingArtifact => OutcomeStatus::SkippedMissingArtifact,
            UploadOutcome::Failed(_) => OutcomeStatus::Failed,
        }
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match self {
            UploadOutcome::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        match self {
            UploadOutcome::Failed(reason) => reason.kind().exit_code(),
            _ => ExitCode::Success,
        }
    }
}

/// Serializable status tag for an [`UploadOutcome`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Succeeded,
    SkippedMissingArtifact,
    Failed,
}

/// Why an upload failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureReason {
    #[error("uploader toolchain unavailable: '{program}' could not be executed")]
    ToolchainUnavailable { program: String },

    #[error("no service name resolved for platform '{platform}'")]
    IdentityUnresolved { platform: Platform },

    #[error("artifact path was supplied but is empty")]
    ArtifactPathRequired,

    #[error("failed to start uploader: {0}")]
    SpawnFailure(String),

    #[error("uploader did not finish within {seconds}s")]
    Timeout { seconds: u64 },

    #[error("uploader exited with {}", describe_exit(.code, .signal))]
    NonZeroExit {
        code: Option<i32>,
        signal: Option<i32>,
    },

    #[error("upload cancelled")]
    Cancelled,
}

fn describe_exit(code: &Option<i32>, signal: &Option<i32>) -> String {
    match (code, signal) {
        (Some(code), _) => format!("exit code {}", code),
        (None, Some(signal)) => format!("signal {}", signal),
        (None, None) => "unknown status".to_string(),
    }
}

impl FailureReason {
    pub fn kind(&self) -> FailureKind {
        match self {
            FailureReason::ToolchainUnavailable { .. } => FailureKind::ToolchainUnavailable,
            FailureReason::IdentityUnresolved { .. } => FailureKind::IdentityUnresolved,
            FailureReason::ArtifactPathRequired => FailureKind::ArtifactPathRequired,
            FailureReason::SpawnFailure(_) => FailureKind::SpawnFailure,
            FailureReason::Timeout { .. } => FailureKind::Timeout,
            FailureReason::NonZeroExit { .. } => FailureKind::NonZeroExit,
            FailureReason::Cancelled => FailureKind::Cancelled,
        }
    }

    /// What the user can do about it, if anything.
    pub fn remediation(&self) -> Option<String> {
        match self {
            FailureReason::ToolchainUnavailable { program } => Some(format!(
                "install the uploader runtime so that `{} --version` succeeds, \
                 or point [tool].program at it",
                program
            )),
            FailureReason::IdentityUnresolved { platform } => Some(format!(
                "set --service-name, or --service-name-override {}=<name> \
                 ([upload.service_name_overrides].{} in config)",
                platform, platform
            )),
            FailureReason::ArtifactPathRequired => Some(
                "pass --artifact-path with the symbol file or directory, or omit it to skip"
                    .to_string(),
            ),
            FailureReason::Timeout { .. } => {
                Some("raise [timeouts].upload_seconds or check network access".to_string())
            }
            FailureReason::SpawnFailure(_)
            | FailureReason::NonZeroExit { .. }
            | FailureReason::Cancelled => None,
        }
    }
}

/// Failure kind - categorizes the cause of failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    ToolchainUnavailable,
    IdentityUnresolved,
    ArtifactPathRequired,
    SpawnFailure,
    Timeout,
    NonZeroExit,
    Cancelled,
    /// Flags or configuration rejected before the pipeline started
    InvalidInput,
}

impl FailureKind {
    /// Get the stable exit code for this failure kind
    pub fn exit_code(&self) -> ExitCode {
        match self {
            FailureKind::ToolchainUnavailable => ExitCode::ToolchainUnavailable,
            FailureKind::IdentityUnresolved => ExitCode::IdentityUnresolved,
            FailureKind::ArtifactPathRequired => ExitCode::ArtifactPathRequired,
            FailureKind::SpawnFailure => ExitCode::SpawnFailure,
            FailureKind::Timeout => ExitCode::Timeout,
            FailureKind::NonZeroExit => ExitCode::UploaderFailed,
            FailureKind::Cancelled => ExitCode::Cancelled,
            FailureKind::InvalidInput => ExitCode::Usage,
        }
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            FailureKind::ToolchainUnavailable => "Uploader toolchain unavailable",
            FailureKind::IdentityUnresolved => "Service name unresolved",
            FailureKind::ArtifactPathRequired => "Artifact path required",
            FailureKind::SpawnFailure => "Uploader failed to start",
            FailureKind::Timeout => "Uploader timed out",
            FailureKind::NonZeroExit => "Uploader failed",
            FailureKind::Cancelled => "Upload cancelled",
            FailureKind::InvalidInput => "Invalid flags or configuration",
        }
    }
}

/// Stable process exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum ExitCode {
    /// Upload succeeded or was skipped
    Success = 0,
    /// Bad flags or configuration
    Usage = 2,
    ToolchainUnavailable = 10,
    IdentityUnresolved = 20,
    ArtifactPathRequired = 21,
    SpawnFailure = 30,
    Timeout = 40,
    /// Uploader exited nonzero
    UploaderFailed = 50,
    Cancelled = 80,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Code the process should exit with. Outside strict mode every
    /// outcome exits 0 so the host build carries on.
    pub fn for_mode(self, strict: bool) -> ExitCode {
        if strict {
            self
        } else {
            ExitCode::Success
        }
    }
}
