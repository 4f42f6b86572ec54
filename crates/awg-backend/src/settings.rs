//! Backend Settings
//!
//! Tool names, paths and timing used by the quick-tool backend. Every
//! field has a default, so an empty TOML file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings for [`AwgQuickBackend`](crate::AwgQuickBackend)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Query tool (`<tool> show ...`)
    pub tool: String,
    /// Tool that applies a config file (`<quick_tool> up|down <path>`)
    pub quick_tool: String,
    /// Kernel module directory; `<module_dir>/version` holds the version
    pub module_dir: PathBuf,
    /// Where rendered configs are written before invoking the quick tool
    pub temp_dir: PathBuf,
    /// Allow more than one tunnel up at a time
    pub multiple_tunnels: bool,
    /// Handshake poll interval in milliseconds
    pub poll_interval_ms: u64,
    /// Program that runs privileged command lines
    pub shell_program: String,
    /// Arguments placed before the command line
    pub shell_args: Vec<String>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            tool: "awg".to_string(),
            quick_tool: "awg-quick".to_string(),
            module_dir: PathBuf::from("/sys/module/amneziawg"),
            temp_dir: std::env::temp_dir().join("awg"),
            multiple_tunnels: false,
            poll_interval_ms: 1000,
            shell_program: "su".to_string(),
            shell_args: vec!["-c".to_string()],
        }
    }
}

impl BackendSettings {
    /// Load from TOML file
    pub fn from_toml_file(path: &Path) -> Result<Self, SettingsError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| SettingsError::IoError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Load from TOML string
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        toml::from_str(content).map_err(|e| SettingsError::ParseError(e.to_string()))
    }

    /// Export as TOML
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// File holding the loaded module's version string
    pub fn module_version_path(&self) -> PathBuf {
        self.module_dir.join("version")
    }
}

/// Settings errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}
