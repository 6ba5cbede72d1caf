//! Event types for focuslockd -> client streaming

use chrono::{DateTime, Local};
use focuslock_util::AppId;
use serde::{Deserialize, Serialize};

use crate::{BlockReason, HideReason, PresentationCommand, ServiceStateSnapshot, API_VERSION};

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub api_version: u32,
    pub timestamp: DateTime<Local>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            api_version: API_VERSION,
            timestamp: focuslock_util::now(),
            payload,
        }
    }
}

/// All possible events from the service to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// Command for the presentation client (overlay, home, countdown)
    Presentation(PresentationCommand),

    /// Full state snapshot (sent on major changes)
    StateChanged(ServiceStateSnapshot),

    /// A foreground app was blocked
    AppBlocked { app_id: AppId, reason: BlockReason },

    /// Overlay became visible
    OverlayShown { app_id: AppId },

    /// Overlay was removed and the session returned to idle
    OverlayHidden {
        app_id: Option<AppId>,
        reason: HideReason,
    },

    /// Session was reset after a presentation fault
    SessionAborted {
        app_id: Option<AppId>,
        error: String,
    },

    /// Locked set or scheduled blocks changed
    PolicyChanged {
        locked_count: usize,
        scheduled_count: usize,
    },

    /// Task list changed
    TasksChanged { tasks: Vec<String> },

    /// Service is shutting down
    Shutdown,
}
