//! symup CLI
//!
//! Entry point for the `symup` command-line tool.

use clap::{Args, Parser, Subcommand};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tracing::{error, warn};

use symup::config::{default_host_config_path, default_project_config_path, Settings};
use symup::outcome::OutcomeStatus;
use symup::probe::AvailabilityProbe;
use symup::runner::{credential_overlay, CredentialSource};
use symup::signal::SignalHandler;
use symup::{
    CancelToken, ConfigError, Credential, EffectiveConfig, ExitCode, FailureKind, Platform,
    UploadPipeline, UploadReport, UploadRequest,
};
use symup_command::{parse_override, RequestError};

#[derive(Parser)]
#[command(name = "symup")]
#[command(about = "Upload mobile debug symbols at build time", version)]
struct Cli {
    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload symbols for one platform
    #[command(disable_version_flag = true)]
    Upload {
        #[command(flatten)]
        request: RequestArgs,

        /// Exit with the failure's exit code instead of 0
        #[arg(long)]
        strict: bool,

        /// Upload time limit in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Print the run report as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Check that the uploader runtime can be executed
    Probe {
        /// Path to project config file (default: .symup.toml)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show what an upload would run, without running it
    #[command(disable_version_flag = true)]
    Explain {
        #[command(flatten)]
        request: RequestArgs,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration and where it came from
    Config {
        /// Path to project config file (default: .symup.toml)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },
}

/// Inputs shared by `upload` and `explain`.
#[derive(Args)]
struct RequestArgs {
    /// Target platform (android, ios)
    #[arg(long)]
    platform: String,

    /// Application version the symbols belong to
    #[arg(long = "version", value_name = "VERSION")]
    app_version: String,

    /// Mapping file (android) or dSYM directory (ios)
    #[arg(long)]
    artifact_path: Option<PathBuf>,

    /// Service name used when no platform override applies
    #[arg(long)]
    service_name: Option<String>,

    /// Per-platform service name, as <platform>=<name> (repeatable)
    #[arg(long = "service-name-override", value_name = "PLATFORM=NAME")]
    service_name_overrides: Vec<String>,

    /// API key for the uploader (otherwise taken from the environment)
    #[arg(long)]
    api_key: Option<String>,

    /// Upload site / region
    #[arg(long)]
    site: Option<String>,

    /// Build flavor
    #[arg(long)]
    flavor: Option<String>,

    /// Ask the uploader to validate without sending anything
    #[arg(long)]
    dry_run: bool,

    /// Upload for real even if the config sets dry_run
    #[arg(long, conflicts_with = "dry_run")]
    no_dry_run: bool,

    /// Path to project config file (default: .symup.toml)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    symup::logging::init(cli.verbose);

    match cli.command {
        Commands::Upload {
            request,
            strict,
            timeout,
            json,
        } => run_upload(request, strict, timeout, json),
        Commands::Probe { config, json } => run_probe(config, json),
        Commands::Explain { request, json } => run_explain(request, json),
        Commands::Config { config } => run_config(config),
    }
}

fn run_upload(args: RequestArgs, strict: bool, timeout: Option<u64>, json_output: bool) {
    let mut overlay = or_input_failure(request_overlay(&args), &args, strict, json_output);
    if strict {
        overlay["upload"]["strict"] = Value::Bool(true);
    }
    if let Some(seconds) = timeout {
        overlay["timeouts"] = json!({ "upload_seconds": seconds });
    }

    let config = or_input_failure(
        load_config(args.config.as_deref(), Some(overlay)),
        &args,
        strict,
        json_output,
    );
    let strict = config.settings.upload.strict;
    let request = or_input_failure(build_request(&args, &config.settings), &args, strict, json_output);

    let cancel = CancelToken::new();
    if let Err(e) = SignalHandler::new(cancel.clone()).install() {
        warn!("could not install interrupt handler: {}", e);
    }

    let pipeline = UploadPipeline::new(&config.settings, cancel);
    let report = pipeline.run(&request);

    if json_output {
        print_report(&report);
    }

    process::exit(report.process_exit_code(strict));
}

fn print_report(report: &UploadReport) {
    match report.to_json() {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(ExitCode::Usage.as_i32());
        }
    }
}

/// Bad flags or configuration on `upload`. Like any other hard failure
/// this only fails the process in strict mode.
fn or_input_failure<T, E: std::fmt::Display>(
    result: Result<T, E>,
    args: &RequestArgs,
    strict: bool,
    json_output: bool,
) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            let message = e.to_string();
            error!("symbol upload not attempted: {}", message);
            if json_output {
                let report = input_failure_report(args, &message);
                println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
            }
            process::exit(ExitCode::Usage.for_mode(strict).as_i32());
        }
    }
}

/// Failed run report for input that never reached the pipeline.
fn input_failure_report(args: &RequestArgs, message: &str) -> Value {
    json!({
        "platform": args.platform,
        "version": args.app_version,
        "dry_run": args.dry_run,
        "status": OutcomeStatus::Failed,
        "failure_kind": FailureKind::InvalidInput,
        "message": message,
        "exit_code": FailureKind::InvalidInput.exit_code().as_i32(),
        "task_succeeded": false,
    })
}

fn run_probe(config_path: Option<PathBuf>, json_output: bool) {
    let config = or_usage_exit(load_config(config_path.as_deref(), None));
    let settings = &config.settings;
    let probe = AvailabilityProbe::new(
        &settings.tool.program,
        settings.tool.probe_args.clone(),
        Duration::from_secs(settings.timeouts.probe_seconds),
    );
    let available = probe.probe();

    if json_output {
        let output = json!({
            "program": probe.program(),
            "args": settings.tool.probe_args,
            "available": available,
        });
        match serde_json::to_string_pretty(&output) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(ExitCode::Usage.as_i32());
            }
        }
    } else if available {
        println!("Uploader available: {}", probe.program());
    } else {
        println!("Uploader unavailable: {}", probe.program());
    }

    if available {
        process::exit(ExitCode::Success.as_i32());
    } else {
        process::exit(ExitCode::ToolchainUnavailable.as_i32());
    }
}

fn run_explain(args: RequestArgs, json_output: bool) {
    let overlay = or_usage_exit(request_overlay(&args));
    let config = or_usage_exit(load_config(args.config.as_deref(), Some(overlay)));
    let request = or_usage_exit(build_request(&args, &config.settings));

    let pipeline = UploadPipeline::new(&config.settings, CancelToken::new());
    let plan = match pipeline.plan(&request) {
        Ok(plan) => plan,
        Err(stop) => {
            let message = match stop.outcome.failure() {
                Some(reason) => reason.to_string(),
                None => stop.message.unwrap_or_default(),
            };
            if json_output {
                let output = json!({
                    "platform": request.platform(),
                    "status": stop.outcome.status(),
                    "message": message,
                });
                println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
            } else {
                println!("Would not upload: {}", message);
            }
            process::exit(stop.outcome.exit_code().as_i32());
        }
    };

    let secrets: Vec<&str> = request.credential().map(|c| c.expose()).into_iter().collect();
    let command = plan.invocation.display_redacted(&secrets);
    let env = credential_overlay(
        request.credential(),
        request.site(),
        request.dry_run(),
        |name| std::env::var(name).ok(),
    );
    let env_keys: Vec<&str> = env.vars.keys().map(String::as_str).collect();
    let source = credential_label(env.credential);

    if json_output {
        let output = json!({
            "platform": request.platform(),
            "service_name": plan.identity.as_str(),
            "artifact": format!("{:?}", plan.path_state).to_lowercase(),
            "command": command,
            "env": env_keys,
            "credential": source,
        });
        match serde_json::to_string_pretty(&output) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(ExitCode::Usage.as_i32());
            }
        }
    } else {
        println!("Platform:     {}", request.platform());
        println!("Service name: {}", plan.identity);
        println!("Artifact:     {:?}", plan.path_state);
        println!("Command:      {}", command);
        if !env_keys.is_empty() {
            println!("Environment:  {}", env_keys.join(", "));
        }
        println!("Credential:   {}", source);
    }
}

fn credential_label(source: CredentialSource) -> &'static str {
    match source {
        CredentialSource::Supplied => "supplied",
        CredentialSource::Ambient => "environment",
        CredentialSource::Placeholder => "dry-run placeholder",
        CredentialSource::Missing => "missing",
    }
}

fn run_config(config_path: Option<PathBuf>) {
    let config = or_usage_exit(load_config(config_path.as_deref(), None));
    match config.to_json() {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(ExitCode::Usage.as_i32());
        }
    }
}

/// Load the layered config. An explicit `--config` must exist; the
/// default project file is optional.
fn load_config(
    explicit: Option<&Path>,
    cli_overrides: Option<Value>,
) -> Result<EffectiveConfig, ConfigError> {
    let project = match explicit {
        Some(path) if !path.exists() => {
            return Err(ConfigError::NotFound(path.display().to_string()))
        }
        Some(path) => path.to_path_buf(),
        None => default_project_config_path(),
    };
    let host = default_host_config_path();
    EffectiveConfig::build(host.as_deref(), Some(&project), cli_overrides)
}

/// CLI layer for the config merge, holding only flags that were given.
fn request_overlay(args: &RequestArgs) -> Result<Value, RequestError> {
    let mut upload = Map::new();
    if let Some(name) = &args.service_name {
        upload.insert("service_name".to_string(), json!(name));
    }
    if let Some(site) = &args.site {
        upload.insert("site".to_string(), json!(site));
    }
    if let Some(flavor) = &args.flavor {
        upload.insert("flavor".to_string(), json!(flavor));
    }
    if args.dry_run {
        upload.insert("dry_run".to_string(), Value::Bool(true));
    } else if args.no_dry_run {
        upload.insert("dry_run".to_string(), Value::Bool(false));
    }

    let mut overrides = Map::new();
    for raw in &args.service_name_overrides {
        let (platform, name) = parse_override(raw)?;
        overrides.insert(platform.id().to_string(), json!(name));
    }
    if !overrides.is_empty() {
        upload.insert("service_name_overrides".to_string(), Value::Object(overrides));
    }

    Ok(json!({ "upload": upload }))
}

fn build_request(args: &RequestArgs, settings: &Settings) -> Result<UploadRequest, RequestError> {
    let platform: Platform = args.platform.parse()?;
    let upload = &settings.upload;

    let mut builder = UploadRequest::builder(platform, args.app_version.as_str())
        .dry_run(upload.dry_run);
    if let Some(path) = &args.artifact_path {
        builder = builder.artifact_path(path);
    }
    if let Some(name) = &upload.service_name {
        builder = builder.service_name(name);
    }
    for (platform, name) in &upload.service_name_overrides {
        builder = builder.service_name_override(*platform, name);
    }
    if let Some(site) = &upload.site {
        builder = builder.site(site);
    }
    if let Some(flavor) = &upload.flavor {
        builder = builder.flavor(flavor);
    }
    if let Some(key) = &args.api_key {
        builder = builder.credential(Credential::new(key));
    }
    builder.build()
}

fn or_usage_exit<T, E: std::fmt::Display>(result: Result<T, E>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(ExitCode::Usage.as_i32());
        }
    }
}
