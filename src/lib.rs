//! symup - build-time debug symbol upload orchestrator
//!
//! Locates platform debug symbols (Android mapping files, iOS dSYM
//! bundles), resolves the service name to upload under, and drives the
//! external uploader as a subprocess with a hard time limit. Missing
//! symbols skip the upload instead of failing the build.

pub mod artifact;
pub mod config;
pub mod identity;
pub mod logging;
pub mod outcome;
pub mod pipeline;
pub mod probe;
pub mod report;
pub mod runner;
pub mod signal;
pub mod timeout;

pub use config::{ConfigError, EffectiveConfig, Settings};
pub use outcome::{ExitCode, FailureKind, FailureReason, UploadOutcome};
pub use pipeline::{PlanStop, UploadPlan, UploadPipeline};
pub use report::UploadReport;
pub use signal::CancelToken;
pub use symup_command::{
    build_invocation, Credential, Invocation, Platform, ResolvedIdentity, Tool, UploadRequest,
};
