//! Effective configuration with provenance
//!
//! Layers are merged as JSON objects (objects merge by key, everything
//! else is replaced by the later layer) and then read into [`Settings`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use symup_command::{supported_ids, Platform};

use super::defaults::builtin_layer;
use super::settings::Settings;
use crate::timeout::TimeoutConfig;

/// Origin of a configuration layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    Host,
    Project,
    Cli,
}

/// A contributing layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 of the raw file bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Merged configuration and the layers it came from.
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub created_at: DateTime<Utc>,

    /// Merged settings
    pub settings: Settings,

    /// Contributing layers, lowest precedence first
    pub sources: Vec<ConfigSource>,
}

/// Key fragments that mark a value as secret
const SECRET_KEYS: &[&str] = &[
    "api_key",
    "apikey",
    "credential",
    "password",
    "secret",
    "token",
];

impl EffectiveConfig {
    /// Merge builtin defaults, the host file, the project file and CLI
    /// overrides, in that order. Files that do not exist are skipped.
    pub fn build(
        host_config_path: Option<&Path>,
        project_config_path: Option<&Path>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let mut merged = builtin_layer();
        let mut sources = vec![ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        }];
        let mut secrets = Vec::new();

        let files = [
            (ConfigOrigin::Host, host_config_path),
            (ConfigOrigin::Project, project_config_path),
        ];
        for (origin, path) in files {
            let Some(path) = path.filter(|p| p.exists()) else {
                continue;
            };
            let (mut layer, digest) = load_toml_file(path)?;
            canonicalize_override_keys(&mut layer, &path.display().to_string())?;
            collect_secret_paths(&layer, "", &mut secrets);
            merge_into(&mut merged, layer);
            sources.push(ConfigSource {
                origin,
                path: Some(path.to_string_lossy().into_owned()),
                digest: Some(digest),
            });
        }

        if let Some(mut cli) = cli_overrides {
            canonicalize_override_keys(&mut cli, "command line")?;
            merge_into(&mut merged, cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        if !secrets.is_empty() {
            return Err(ConfigError::SecretInFile(secrets.join(", ")));
        }

        let settings: Settings = serde_json::from_value(merged)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        TimeoutConfig::from(settings.timeouts)
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        if settings.tool.program.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "tool.program must not be empty".to_string(),
            ));
        }

        Ok(Self {
            created_at: Utc::now(),
            settings,
            sources,
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Merge `overlay` into `base`: objects merge by key, anything else in
/// `overlay` replaces what is in `base`.
pub fn merge_into(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_into(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, overlay) => *slot = overlay,
    }
}

fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
    let bytes = fs::read(path)
        .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

    let digest = hex::encode(Sha256::digest(&bytes));

    let contents = String::from_utf8(bytes).map_err(|e| {
        ConfigError::ParseError(format!("{}: invalid UTF-8: {}", path.display(), e))
    })?;

    let table: toml::Value = toml::from_str(&contents)
        .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;

    Ok((toml_to_json(table), digest))
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Rewrite `upload.service_name_overrides` keys to platform ids, so that
/// `Android` in one layer replaces `android` from a lower one.
fn canonicalize_override_keys(layer: &mut Value, origin: &str) -> Result<(), ConfigError> {
    let Some(overrides) = layer
        .get_mut("upload")
        .and_then(|upload| upload.get_mut("service_name_overrides"))
        .and_then(Value::as_object_mut)
    else {
        return Ok(());
    };

    let mut canonical = Map::new();
    for (key, name) in std::mem::take(overrides) {
        let platform = Platform::lookup(&key).ok_or_else(|| {
            ConfigError::ParseError(format!(
                "{}: unknown platform '{}' in upload.service_name_overrides (supported: {})",
                origin,
                key,
                supported_ids()
            ))
        })?;
        if canonical.insert(platform.id().to_string(), name).is_some() {
            return Err(ConfigError::ValidationError(format!(
                "{}: override for '{}' given more than once in upload.service_name_overrides",
                origin, platform
            )));
        }
    }
    *overrides = canonical;
    Ok(())
}

/// Record dotted paths of keys that look like they hold secrets.
fn collect_secret_paths(value: &Value, prefix: &str, found: &mut Vec<String>) {
    if let Value::Object(map) = value {
        for (key, child) in map {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", prefix, key)
            };
            let lower = key.to_lowercase();
            if SECRET_KEYS.iter().any(|s| lower.contains(s)) && !child.is_object() {
                found.push(path);
            } else {
                collect_secret_paths(child, &path, found);
            }
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("config file not found: {0}")]
    NotFound(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("secrets must not be stored in config files (found: {0}); pass --api-key or set the environment variable")]
    SecretInFile(String),
}
