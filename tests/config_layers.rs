//! Configuration layering wired through to the pipeline

use std::fs;

use serde_json::json;
use symup::config::{ConfigOrigin, PROJECT_CONFIG_FILE};
use symup::{
    CancelToken, ConfigError, EffectiveConfig, Platform, UploadOutcome, UploadPipeline,
    UploadRequest,
};
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_cli_layer_beats_project_and_host() {
    let dir = TempDir::new().unwrap();
    let host = write(
        &dir,
        "host.toml",
        r#"
        [upload]
        service_name = "host-name"
        flavor = "release"
        "#,
    );
    let project = write(
        &dir,
        PROJECT_CONFIG_FILE,
        r#"
        [upload]
        service_name = "project-name"
        dry_run = true
        "#,
    );
    let cli = json!({"upload": {"service_name": "cli-name"}});

    let config = EffectiveConfig::build(Some(&host), Some(&project), Some(cli)).unwrap();
    let upload = &config.settings.upload;
    assert_eq!(upload.service_name.as_deref(), Some("cli-name"));
    assert_eq!(upload.flavor.as_deref(), Some("release"));
    assert!(upload.dry_run);
    assert!(!upload.strict);

    let project_source = config
        .sources
        .iter()
        .find(|s| s.origin == ConfigOrigin::Project)
        .expect("project layer recorded");
    assert_eq!(
        project_source.path.as_deref(),
        Some(project.to_string_lossy().as_ref())
    );
}

#[test]
fn test_secret_in_host_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let host = write(
        &dir,
        "host.toml",
        r#"
        [upload]
        service_name = "svc"
        api_key = "0123456789abcdef"
        "#,
    );

    let err = EffectiveConfig::build(Some(&host), None, None).unwrap_err();
    assert!(matches!(err, ConfigError::SecretInFile(_)));
    assert!(!err.to_string().contains("0123456789abcdef"));
}

#[test]
fn test_unknown_section_is_rejected() {
    let dir = TempDir::new().unwrap();
    let project = write(&dir, PROJECT_CONFIG_FILE, "[workers]\nhost = \"mac-1\"\n");

    assert!(matches!(
        EffectiveConfig::build(None, Some(&project), None),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn test_grace_above_limit_is_rejected() {
    let cli = json!({"timeouts": {"termination_grace_seconds": 61}});
    assert!(matches!(
        EffectiveConfig::build(None, None, Some(cli)),
        Err(ConfigError::ValidationError(_))
    ));
}

#[cfg(unix)]
#[test]
fn test_configured_tool_drives_pipeline() {
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("uploaded");
    let mapping = write(&dir, "mapping.txt", "x");
    let project = write(
        &dir,
        PROJECT_CONFIG_FILE,
        &format!(
            r#"
            [tool]
            program = "sh"
            args = ["-c", "touch '{}'", "uploader"]
            probe_args = ["-c", "exit 0"]

            [upload]
            service_name = "svc-from-config"
            "#,
            marker.display()
        ),
    );

    let config = EffectiveConfig::build(None, Some(&project), None).unwrap();
    let settings = &config.settings;

    let mut builder = UploadRequest::builder(Platform::ANDROID, "4.0.0").artifact_path(&mapping);
    if let Some(name) = &settings.upload.service_name {
        builder = builder.service_name(name);
    }
    let request = builder.build().unwrap();

    let report = UploadPipeline::new(settings, CancelToken::new()).run(&request);
    assert_eq!(report.outcome, UploadOutcome::Succeeded);
    assert_eq!(report.service_name.as_deref(), Some("svc-from-config"));
    assert!(marker.exists());
}
