//! Validated settings

use crate::schema::RawConfig;
use focuslock_util::{default_data_dir, default_socket_path, AppId};
use std::path::PathBuf;

/// Identifier the service uses for itself when none is configured
pub const DEFAULT_SELF_APP_ID: &str = "com.focuslock2";

/// PIN used when the config does not set one
pub const DEFAULT_PIN: &str = "0000";

/// Validated settings ready for use by the service
#[derive(Debug, Clone)]
pub struct Settings {
    pub service: ServiceConfig,
    pub parent: ParentConfig,
    /// Apps to add to the locked set at startup
    pub locked_apps: Vec<AppId>,
}

impl Settings {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            service: ServiceConfig {
                socket_path: raw.service.socket_path.unwrap_or_else(default_socket_path),
                data_dir: raw.service.data_dir.unwrap_or_else(default_data_dir),
                self_app_id: AppId::new(
                    raw.service
                        .self_app_id
                        .unwrap_or_else(|| DEFAULT_SELF_APP_ID.to_string()),
                ),
            },
            parent: ParentConfig {
                pin: raw.parent.pin.unwrap_or_else(|| DEFAULT_PIN.to_string()),
                require_pin: raw.parent.require_pin.unwrap_or(true),
            },
            locked_apps: raw.locked_apps.into_iter().map(AppId::from).collect(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            parent: ParentConfig::default(),
            locked_apps: Vec::new(),
        }
    }
}

/// Service-level configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub socket_path: PathBuf,
    pub data_dir: PathBuf,
    pub self_app_id: AppId,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            data_dir: default_data_dir(),
            self_app_id: AppId::new(DEFAULT_SELF_APP_ID),
        }
    }
}

/// Parent controls
#[derive(Debug, Clone)]
pub struct ParentConfig {
    pub pin: String,
    /// Seed for the stored require-pin setting
    pub require_pin: bool,
}

impl ParentConfig {
    pub fn pin_matches(&self, candidate: &str) -> bool {
        self.pin == candidate
    }
}

impl Default for ParentConfig {
    fn default() -> Self {
        Self {
            pin: DEFAULT_PIN.to_string(),
            require_pin: true,
        }
    }
}
