//! Command types for the focuslockd protocol

use chrono::{DateTime, Local};
use focuslock_util::{AppId, ClientId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{
    ClientRole, CompletionLogEntry, Decision, HealthStatus, PolicyView, ServiceStateSnapshot,
    API_VERSION,
};

/// Request wrapper with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Request ID for correlation
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// The command
    pub command: Command,
}

impl Request {
    pub fn new(request_id: u64, command: Command) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            command,
        }
    }
}

/// Response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Corresponding request ID
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// Response payload or error
    pub result: ResponseResult,
}

impl Response {
    pub fn success(request_id: u64, payload: ResponsePayload) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Ok(payload),
        }
    }

    pub fn error(request_id: u64, error: ErrorInfo) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Err(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseResult {
    Ok(ResponsePayload),
    Err(ErrorInfo),
}

/// Error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Error codes for the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    InvalidAppId,
    TaskNotFound,
    PinRequired,
    PermissionDenied,
    StoreError,
    InternalError,
}

/// All possible commands from clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Get current service state
    GetState,

    /// Get health status
    GetHealth,

    /// Subscribe to events (presentation commands included)
    SubscribeEvents,

    /// Unsubscribe from events
    UnsubscribeEvents,

    /// An application came to the foreground
    ReportForeground {
        app_id: AppId,
        /// When the change was observed; defaults to the service clock
        #[serde(default)]
        observed_at: Option<DateTime<Local>>,
    },

    /// Get the locked set and active scheduled blocks
    GetPolicy,

    /// List outstanding tasks
    ListTasks,

    /// Read the task completion log (newest last)
    GetCompletionLog {
        #[serde(default)]
        limit: Option<usize>,
    },

    /// Complete a task; needs the parent PIN while require-pin is on
    CompleteTask {
        task: String,
        #[serde(default)]
        pin: Option<String>,
    },

    // Admin commands

    /// Permanently lock an app (admin only)
    LockApp { app_id: AppId },

    /// Remove an app from the locked set (admin only)
    UnlockApp { app_id: AppId },

    /// Replace the whole locked set (admin only)
    SetLockedApps { app_ids: Vec<AppId> },

    /// Block an app until now + duration (admin only)
    BlockFor { app_id: AppId, duration: Duration },

    /// Remove a scheduled block (admin only)
    ClearBlock { app_id: AppId },

    /// Add a task (admin only)
    AddTask { task: String },

    /// Toggle whether completing a task needs the PIN (admin only)
    SetRequirePin { enabled: bool },

    /// Ping for keepalive
    Ping,
}

impl Command {
    /// Whether the command changes the policy or parent settings
    pub fn requires_admin(&self) -> bool {
        matches!(
            self,
            Command::LockApp { .. }
                | Command::UnlockApp { .. }
                | Command::SetLockedApps { .. }
                | Command::BlockFor { .. }
                | Command::ClearBlock { .. }
                | Command::AddTask { .. }
                | Command::SetRequirePin { .. }
        )
    }
}

/// Response payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    State(ServiceStateSnapshot),
    Health(HealthStatus),
    Subscribed {
        client_id: ClientId,
    },
    Unsubscribed,
    /// `decision` is `None` when the event was debounced or dropped
    ForegroundProcessed {
        decision: Option<Decision>,
    },
    Policy(PolicyView),
    PolicyUpdated,
    BlockScheduled {
        app_id: AppId,
        until: DateTime<Local>,
    },
    Tasks {
        tasks: Vec<String>,
    },
    TaskCompleted,
    CompletionLog {
        entries: Vec<CompletionLogEntry>,
    },
    RequirePinSet {
        enabled: bool,
    },
    Pong,
}

/// Client connection info (set by IPC layer)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub client_id: ClientId,
    pub role: ClientRole,
    /// Unix UID if available
    pub uid: Option<u32>,
}

impl ClientInfo {
    pub fn new(role: ClientRole) -> Self {
        Self {
            client_id: ClientId::new(),
            role,
            uid: None,
        }
    }

    pub fn with_uid(mut self, uid: u32) -> Self {
        self.uid = Some(uid);
        self
    }
}
