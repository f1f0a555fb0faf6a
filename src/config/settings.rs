//! Typed view of the merged configuration.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use symup_command::{Platform, Tool};

use crate::timeout::TimeoutConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub tool: ToolSettings,
    pub timeouts: TimeoutSettings,
    pub upload: UploadSettings,
}

/// `[tool]`: how to launch the uploader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolSettings {
    pub program: String,
    pub args: Vec<String>,
    pub probe_args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

impl ToolSettings {
    pub fn to_tool(&self) -> Tool {
        let mut tool = Tool::new(&self.program).with_args(self.args.iter().cloned());
        tool.working_dir = self.working_dir.clone();
        tool
    }
}

/// `[timeouts]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutSettings {
    pub upload_seconds: u64,
    pub probe_seconds: u64,
    pub termination_grace_seconds: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        let defaults = TimeoutConfig::default();
        Self {
            upload_seconds: defaults.upload_seconds,
            probe_seconds: defaults.probe_seconds,
            termination_grace_seconds: defaults.termination_grace_seconds,
        }
    }
}

impl From<TimeoutSettings> for TimeoutConfig {
    fn from(t: TimeoutSettings) -> Self {
        TimeoutConfig {
            upload_seconds: t.upload_seconds,
            probe_seconds: t.probe_seconds,
            termination_grace_seconds: t.termination_grace_seconds,
        }
    }
}

/// `[upload]`: request defaults shared by every platform
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UploadSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,

    #[serde(default)]
    pub service_name_overrides: BTreeMap<Platform, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flavor: Option<String>,

    #[serde(default)]
    pub dry_run: bool,

    /// Fail the build (nonzero exit) on hard failures
    #[serde(default)]
    pub strict: bool,
}
