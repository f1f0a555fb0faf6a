//! Built-in defaults (layer 1)

use serde_json::Value;

use super::settings::{Settings, TimeoutSettings, ToolSettings, UploadSettings};

/// Uploader runtime launched by default
pub const DEFAULT_PROGRAM: &str = "npx";

/// Arguments placing `datadog-ci` behind `npx`
pub const DEFAULT_TOOL_ARGS: &[&str] = &["--yes", "@datadog/datadog-ci"];

/// Version query used by the availability probe
pub const DEFAULT_PROBE_ARGS: &[&str] = &["--version"];

/// Host config location relative to `$HOME`
pub const HOST_CONFIG_RELATIVE: &str = ".config/symup/config.toml";

/// Project config file name, looked up in the working directory
pub const PROJECT_CONFIG_FILE: &str = ".symup.toml";

impl Default for Settings {
    fn default() -> Self {
        Self {
            tool: ToolSettings {
                program: DEFAULT_PROGRAM.to_string(),
                args: DEFAULT_TOOL_ARGS.iter().map(|s| s.to_string()).collect(),
                probe_args: DEFAULT_PROBE_ARGS.iter().map(|s| s.to_string()).collect(),
                working_dir: None,
            },
            timeouts: TimeoutSettings::default(),
            upload: UploadSettings::default(),
        }
    }
}

/// The defaults as a mergeable JSON layer.
pub fn builtin_layer() -> Value {
    serde_json::to_value(Settings::default()).unwrap_or(Value::Null)
}
