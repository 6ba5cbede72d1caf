//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Apps locked permanently; merged into the store at startup
    #[serde(default)]
    pub locked_apps: Vec<String>,

    /// Service-level settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Parent controls
    #[serde(default)]
    pub parent: RawParentConfig,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// IPC socket path
    pub socket_path: Option<PathBuf>,

    /// Data directory for the store
    pub data_dir: Option<PathBuf>,

    /// Identifier of the enforcement app itself; its foreground events are ignored
    pub self_app_id: Option<String>,
}

/// Parent controls
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawParentConfig {
    /// PIN checked before completing a task
    pub pin: Option<String>,

    /// Initial value of the require-pin setting (the store wins once set)
    pub require_pin: Option<bool>,
}
