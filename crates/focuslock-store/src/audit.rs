//! Audit event types

use chrono::{DateTime, Local};
use focuslock_api::{BlockReason, HideReason};
use focuslock_util::AppId;
use serde::{Deserialize, Serialize};

/// Types of audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Service started
    ServiceStarted,

    /// Service stopped
    ServiceStopped,

    /// Configuration applied at startup
    ConfigLoaded { locked_apps: usize },

    AppLocked { app_id: AppId },

    AppUnlocked { app_id: AppId },

    LockedSetReplaced { count: usize },

    BlockScheduled {
        app_id: AppId,
        until: DateTime<Local>,
    },

    BlockCleared { app_id: AppId },

    /// Foreground app was blocked
    AppBlocked { app_id: AppId, reason: BlockReason },

    OverlayShown { app_id: AppId },

    OverlayHidden {
        app_id: Option<AppId>,
        reason: HideReason,
    },

    /// Block session reset after a presentation fault
    SessionAborted {
        app_id: Option<AppId>,
        error: String,
    },

    TaskAdded { task: String },

    TaskCompleted { task: String },

    RequirePinChanged { enabled: bool },

    /// Client connected
    ClientConnected {
        client_id: String,
        role: String,
        uid: Option<u32>,
    },

    /// Client disconnected
    ClientDisconnected { client_id: String },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Local>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self::at(focuslock_util::now(), event)
    }

    /// Event stamped with an explicit time (service clock)
    pub fn at(timestamp: DateTime<Local>, event: AuditEventType) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp,
            event,
        }
    }
}
