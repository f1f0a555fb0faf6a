//! Uploader command construction for symup.
//!
//! Turns an [`UploadRequest`] plus a resolved service name into the exact
//! argument vector handed to the external uploader. Construction is pure:
//! no I/O, no environment lookups, no clock.

mod invocation;
mod platform;
mod request;

pub use invocation::{Invocation, REDACTED};
pub use platform::{supported_ids, Platform, PlatformSpec, UnknownPlatform, PLATFORMS};
pub use request::{
    parse_override, Credential, RequestError, ResolvedIdentity, UploadRequest,
    UploadRequestBuilder,
};

use std::path::PathBuf;

/// Uploader subcommand for mobile symbol upload.
pub const UPLOAD_SUBCOMMAND: &[&str] = &["flutter-symbols", "upload"];

pub const SERVICE_NAME_FLAG: &str = "--service-name";
pub const VERSION_FLAG: &str = "--version";
pub const DRY_RUN_FLAG: &str = "--dry-run";
pub const FLAVOR_FLAG: &str = "--flavor";

/// How to launch the uploader: a program plus the arguments that come
/// before the upload subcommand (e.g. `npx --yes @datadog/datadog-ci`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tool {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl Tool {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

/// Build the uploader invocation for `request`.
///
/// Layout: tool args, subcommand, `--service-name`, `--version`, the
/// platform's flag pair from the platform table (only when an artifact
/// path is present), then `--dry-run` and `--flavor` when requested.
pub fn build_invocation(
    tool: &Tool,
    identity: &ResolvedIdentity,
    request: &UploadRequest,
) -> Invocation {
    let mut inv = Invocation::new(&tool.program);
    inv.working_dir = tool.working_dir.clone();

    inv.args(tool.args.iter().map(String::as_str))
        .args(UPLOAD_SUBCOMMAND.iter().copied())
        .arg(SERVICE_NAME_FLAG)
        .arg(identity.as_str())
        .arg(VERSION_FLAG)
        .arg(request.version());

    if let Some(path) = request.artifact_path() {
        let spec = request.platform().spec();
        inv.arg(spec.symbols_flag)
            .arg(spec.location_flag)
            .arg(path.as_os_str());
    }

    if request.dry_run() {
        inv.arg(DRY_RUN_FLAG);
    }

    if let Some(flavor) = request.flavor().filter(|f| !f.trim().is_empty()) {
        inv.arg(FLAVOR_FLAG).arg(flavor);
    }

    inv
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    fn tool() -> Tool {
        Tool::new("npx").with_args(["--yes", "@datadog/datadog-ci"])
    }

    fn identity(name: &str) -> ResolvedIdentity {
        ResolvedIdentity::new(name).unwrap()
    }

    #[test]
    fn test_android_layout() {
        let request = UploadRequest::builder(Platform::ANDROID, "2.3.0")
            .artifact_path("/build/mapping.txt")
            .build()
            .unwrap();
        let inv = build_invocation(&tool(), &identity("svc-a"), &request);

        assert_eq!(inv.program, "npx");
        assert_eq!(
            inv.args_lossy(),
            vec![
                "--yes",
                "@datadog/datadog-ci",
                "flutter-symbols",
                "upload",
                "--service-name",
                "svc-a",
                "--version",
                "2.3.0",
                "--android-mapping",
                "--android-mapping-location",
                "/build/mapping.txt",
            ]
        );
        assert!(!inv.has_arg("--ios-dsyms"));
        assert!(!inv.has_arg("--ios-dsyms-location"));
        assert!(inv.env.is_empty());
    }

    #[test]
    fn test_ios_layout_with_dry_run_and_flavor() {
        let request = UploadRequest::builder(Platform::IOS, "1.0.0")
            .artifact_path("/build/dSYMs")
            .dry_run(true)
            .flavor("staging")
            .build()
            .unwrap();
        let inv = build_invocation(&tool(), &identity("svc-i"), &request);

        assert!(inv.has_arg("--ios-dsyms"));
        assert_eq!(inv.value_of("--ios-dsyms-location"), Some(OsStr::new("/build/dSYMs")));
        assert!(inv.has_arg(DRY_RUN_FLAG));
        assert_eq!(inv.value_of(FLAVOR_FLAG), Some(OsStr::new("staging")));
        assert!(!inv.has_arg("--android-mapping"));
    }

    #[test]
    fn test_blank_flavor_omitted() {
        let request = UploadRequest::builder(Platform::IOS, "1.0.0")
            .flavor("   ")
            .build()
            .unwrap();
        let inv = build_invocation(&tool(), &identity("svc"), &request);
        assert!(!inv.has_arg(FLAVOR_FLAG));
        assert!(!inv.has_arg(DRY_RUN_FLAG));
    }

    #[test]
    fn test_path_with_spaces_stays_one_argument() {
        let request = UploadRequest::builder(Platform::IOS, "1.0.0")
            .artifact_path("/Users/dev/My App/Build Products/App.app.dSYM")
            .build()
            .unwrap();
        let inv = build_invocation(&tool(), &identity("svc"), &request);
        assert_eq!(
            inv.value_of("--ios-dsyms-location"),
            Some(OsStr::new("/Users/dev/My App/Build Products/App.app.dSYM"))
        );
    }

    #[test]
    fn test_build_is_deterministic() {
        let request = UploadRequest::builder(Platform::ANDROID, "3.1.4")
            .artifact_path("/m.txt")
            .dry_run(true)
            .flavor("release")
            .build()
            .unwrap();
        let first = build_invocation(&tool(), &identity("svc"), &request);
        let second = build_invocation(&tool(), &identity("svc"), &request);
        assert_eq!(first, second);
    }

    #[test]
    fn test_every_platform_gets_its_own_pair() {
        for platform in Platform::all() {
            let request = UploadRequest::builder(*platform, "1.0")
                .artifact_path("/artifact")
                .build()
                .unwrap();
            let inv = build_invocation(&tool(), &identity("svc"), &request);
            let spec = platform.spec();
            assert!(inv.has_arg(spec.symbols_flag));
            assert_eq!(inv.value_of(spec.location_flag), Some(OsStr::new("/artifact")));
            for other in Platform::all().iter().filter(|o| *o != platform) {
                assert!(!inv.has_arg(other.spec().symbols_flag));
            }
        }
    }

    #[test]
    fn test_version_passed_verbatim() {
        let request = UploadRequest::builder(Platform::IOS, "1.0.0-beta+42")
            .build()
            .unwrap();
        let inv = build_invocation(&tool(), &identity("svc"), &request);
        assert_eq!(inv.value_of(VERSION_FLAG), Some(OsStr::new("1.0.0-beta+42")));
    }
}
