//! Layered configuration
//!
//! Implements the 4-layer configuration merge:
//! 1. Built-in defaults
//! 2. Host/user config (~/.config/symup/config.toml)
//! 3. Project config (.symup.toml, or --config)
//! 4. CLI flags

mod defaults;
mod effective;
mod settings;

pub use defaults::{
    builtin_layer, DEFAULT_PROBE_ARGS, DEFAULT_PROGRAM, DEFAULT_TOOL_ARGS, HOST_CONFIG_RELATIVE,
    PROJECT_CONFIG_FILE,
};
pub use effective::{merge_into, ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig};
pub use settings::{Settings, TimeoutSettings, ToolSettings, UploadSettings};

use std::path::PathBuf;

/// `~/.config/symup/config.toml`, when `HOME` is set.
pub fn default_host_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(HOST_CONFIG_RELATIVE))
}

/// `.symup.toml` in the current directory.
pub fn default_project_config_path() -> PathBuf {
    PathBuf::from(PROJECT_CONFIG_FILE)
}
