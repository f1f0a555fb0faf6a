//! Upload pipeline driver
//!
//! Runs the stages strictly in order:
//! 1. Availability probe
//! 2. Identity resolution
//! 3. Artifact validation
//! 4. Command construction
//! 5. Uploader execution
//!
//! Each stage either hands over to the next or ends the run with an
//! [`UploadOutcome`]. This module is the only place that turns an outcome
//! into a log level.

use std::time::Instant;

use chrono::Utc;
use symup_command::{build_invocation, Invocation, ResolvedIdentity, Tool, UploadRequest};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::artifact::{self, PathState};
use crate::config::Settings;
use crate::identity::resolve_identity;
use crate::outcome::{FailureReason, UploadOutcome};
use crate::probe::AvailabilityProbe;
use crate::report::UploadReport;
use crate::runner::{ProcessRunner, RunOptions};
use crate::signal::CancelToken;
use crate::timeout::TimeoutConfig;

/// Everything needed to launch the uploader for one request.
#[derive(Debug, Clone)]
pub struct UploadPlan {
    pub identity: ResolvedIdentity,
    pub path_state: PathState,
    pub invocation: Invocation,
}

/// Why planning stopped before an invocation was built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanStop {
    pub outcome: UploadOutcome,
    pub message: Option<String>,
}

impl PlanStop {
    fn failed(reason: FailureReason) -> Self {
        Self {
            outcome: UploadOutcome::Failed(reason),
            message: None,
        }
    }

    fn skipped(message: String) -> Self {
        Self {
            outcome: UploadOutcome::SkippedMissingArtifact,
            message: Some(message),
        }
    }
}

/// Stateless pipeline; one instance can serve any number of requests.
#[derive(Debug, Clone)]
pub struct UploadPipeline {
    tool: Tool,
    probe: AvailabilityProbe,
    runner: ProcessRunner,
}

impl UploadPipeline {
    pub fn new(settings: &Settings, cancel: CancelToken) -> Self {
        let timeouts = TimeoutConfig::from(settings.timeouts);
        let probe = AvailabilityProbe::new(
            &settings.tool.program,
            settings.tool.probe_args.clone(),
            timeouts.probe(),
        );
        Self {
            tool: settings.tool.to_tool(),
            probe,
            runner: ProcessRunner::new(&timeouts, cancel),
        }
    }

    pub fn from_parts(tool: Tool, probe: AvailabilityProbe, runner: ProcessRunner) -> Self {
        Self {
            tool,
            probe,
            runner,
        }
    }

    /// Run the full pipeline for `request`.
    pub fn run(&self, request: &UploadRequest) -> UploadReport {
        let clock = Instant::now();
        let mut report = UploadReport::started(
            Uuid::new_v4().to_string(),
            Utc::now(),
            request.platform(),
            request.version(),
            request.dry_run(),
        );
        report.artifact_path = request
            .artifact_path()
            .map(|p| p.to_string_lossy().into_owned());

        info!(
            run_id = %report.run_id,
            platform = %request.platform(),
            version = %request.version(),
            dry_run = request.dry_run(),
            "starting symbol upload"
        );

        let (outcome, message) = self.execute(request, &mut report);
        let mut report = report.with_outcome(outcome, message);
        report.duration_ms = clock.elapsed().as_millis() as u64;

        log_outcome(&report);
        report
    }

    fn execute(
        &self,
        request: &UploadRequest,
        report: &mut UploadReport,
    ) -> (UploadOutcome, Option<String>) {
        if !self.probe.probe() {
            return (
                UploadOutcome::Failed(FailureReason::ToolchainUnavailable {
                    program: self.probe.program().to_string(),
                }),
                None,
            );
        }

        let plan = match self.plan(request) {
            Ok(plan) => plan,
            Err(stop) => return (stop.outcome, stop.message),
        };

        let secrets: Vec<&str> = request.credential().map(|c| c.expose()).into_iter().collect();
        let command = plan.invocation.display_redacted(&secrets);
        report.service_name = Some(plan.identity.to_string());
        report.command = Some(command.clone());

        info!(
            service = %plan.identity,
            timeout_secs = self.runner.timeout().as_secs(),
            "running uploader: {}",
            command
        );

        let outcome = self.runner.run(
            &plan.invocation,
            &RunOptions {
                credential: request.credential(),
                site: request.site(),
                dry_run: request.dry_run(),
            },
        );
        (outcome, None)
    }

    /// Resolve identity, check the artifact and build the invocation,
    /// without probing or running anything.
    pub fn plan(&self, request: &UploadRequest) -> Result<UploadPlan, PlanStop> {
        let identity = resolve_identity(request).ok_or_else(|| {
            PlanStop::failed(FailureReason::IdentityUnresolved {
                platform: request.platform(),
            })
        })?;

        let spec = request.platform().spec();
        let path = match request.artifact_path() {
            None => {
                return Err(PlanStop::skipped(format!(
                    "no {} supplied for {}; skipping symbol upload",
                    spec.artifact,
                    request.platform()
                )))
            }
            Some(path) if path.as_os_str().to_string_lossy().trim().is_empty() => {
                return Err(PlanStop::failed(FailureReason::ArtifactPathRequired))
            }
            Some(path) => path,
        };

        let path_state = artifact::validate(path);
        match path_state {
            PathState::Missing => {
                return Err(PlanStop::skipped(format!(
                    "{} not found at {}; skipping symbol upload",
                    spec.artifact,
                    path.display()
                )))
            }
            PathState::File => info!(path = %path.display(), "found {}", spec.artifact),
            PathState::Directory => info!(
                path = %path.display(),
                dsym_bundles = artifact::count_dsym_bundles(path),
                "found {}",
                spec.artifact
            ),
        }

        let invocation = build_invocation(&self.tool, &identity, request);
        Ok(UploadPlan {
            identity,
            path_state,
            invocation,
        })
    }
}

fn log_outcome(report: &UploadReport) {
    match &report.outcome {
        UploadOutcome::Succeeded => info!(
            run_id = %report.run_id,
            duration_ms = report.duration_ms,
            "symbols uploaded for {} {}",
            report.platform,
            report.version
        ),
        UploadOutcome::SkippedMissingArtifact => warn!(
            run_id = %report.run_id,
            "{}",
            report.message.as_deref().unwrap_or("symbol artifact missing; upload skipped")
        ),
        UploadOutcome::Failed(reason) => {
            error!(
                run_id = %report.run_id,
                kind = reason.kind().description(),
                exit_code = report.exit_code,
                "symbol upload failed: {}",
                reason
            );
            if let Some(hint) = &report.remediation {
                error!("hint: {}", hint);
            }
        }
    }
}
