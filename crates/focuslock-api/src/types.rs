//! Shared types for the focuslockd API

use chrono::{DateTime, Local};
use focuslock_util::AppId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Why an application is blocked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockReason {
    /// Permanently locked by a parent
    Locked,
    /// Scheduled block that has not yet expired
    Scheduled { until: DateTime<Local> },
}

/// Outcome of evaluating the policy for one foreground application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Block { reason: BlockReason },
}

impl Decision {
    pub fn is_block(&self) -> bool {
        matches!(self, Decision::Block { .. })
    }
}

/// State of the single block session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockState {
    /// Nothing blocked, no timers pending
    #[default]
    Idle,
    /// Blocked app chosen, overlay show delay running
    PendingShow,
    /// Overlay on screen
    Visible,
    /// Overlay on screen, hide deferred until the minimum hold elapses
    PendingHide,
}

impl BlockState {
    /// Whether an app is currently being handled by the session
    pub fn is_active(self) -> bool {
        !matches!(self, BlockState::Idle)
    }
}

/// Why the overlay was hidden
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HideReason {
    /// An allowed app came to the foreground after the hold window
    AppAllowed,
    /// Deferred hide fired once the hold window elapsed
    HoldElapsed,
    /// The scheduled block for the app ran out
    BlockExpired,
    /// The service is stopping
    Shutdown,
}

/// Countdown shown on the overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CountdownDisplay {
    /// Permanent lock, no end time
    Locked,
    /// Time left on a scheduled block
    Remaining { hours: u64, minutes: u64, seconds: u64 },
    /// Scheduled block has ended
    Expired,
}

impl fmt::Display for CountdownDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountdownDisplay::Locked => f.write_str("Locked"),
            CountdownDisplay::Remaining {
                hours,
                minutes,
                seconds,
            } => write!(f, "{}h {}m {}s remaining", hours, minutes, seconds),
            CountdownDisplay::Expired => f.write_str("Block expired"),
        }
    }
}

/// Commands the core issues to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum PresentationCommand {
    /// Move the user to the home/neutral screen
    NavigateHome,
    /// Show the blocking overlay for an app
    ShowOverlay { app_id: AppId },
    /// Remove the blocking overlay
    HideOverlay,
    /// Replace the countdown text on the overlay
    UpdateCountdownText { text: String },
}

/// Role of a connected client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientRole {
    /// Event sources and presentation clients
    Shell,
    /// Parent tooling; may change the policy
    Admin,
}

impl ClientRole {
    pub fn can_administer(self) -> bool {
        matches!(self, ClientRole::Admin)
    }
}

/// Scheduled block as reported to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledBlockView {
    pub app_id: AppId,
    pub until: DateTime<Local>,
    pub remaining: Duration,
}

/// Current policy as reported to clients
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyView {
    pub locked_apps: Vec<AppId>,
    /// Only blocks that have not yet expired
    pub scheduled_blocks: Vec<ScheduledBlockView>,
    pub require_pin: bool,
}

/// Snapshot of the block session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    pub state: BlockState,
    pub active_app: Option<AppId>,
    pub overlay_visible_since: Option<DateTime<Local>>,
}

/// Full service state snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStateSnapshot {
    pub api_version: u32,
    pub session: SessionView,
    pub locked_count: usize,
    pub scheduled_count: usize,
}

/// Completion status recorded for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Incomplete,
    Completed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Incomplete => f.write_str("Incomplete"),
            TaskStatus::Completed => f.write_str("Completed"),
        }
    }
}

/// One line of the task completion log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionLogEntry {
    pub recorded_at: DateTime<Local>,
    pub task: String,
    pub status: TaskStatus,
}

impl fmt::Display for CompletionLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} - {}",
            focuslock_util::format_log_stamp(&self.recorded_at),
            self.task,
            self.status
        )
    }
}

/// Health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub live: bool,
    pub ready: bool,
    pub store_healthy: bool,
    pub presenter_connected: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn countdown_text() {
        let display = CountdownDisplay::Remaining {
            hours: 1,
            minutes: 2,
            seconds: 3,
        };
        assert_eq!(display.to_string(), "1h 2m 3s remaining");
        assert_eq!(CountdownDisplay::Locked.to_string(), "Locked");
    }

    #[test]
    fn presentation_command_wire_format() {
        let cmd = PresentationCommand::ShowOverlay {
            app_id: AppId::new("com.example.game"),
        };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["command"], "show_overlay");
        assert_eq!(json["app_id"], "com.example.game");
    }

    #[test]
    fn completion_log_line() {
        let entry = CompletionLogEntry {
            recorded_at: Local.with_ymd_and_hms(2025, 3, 1, 17, 5, 0).unwrap(),
            task: "Homework".into(),
            status: TaskStatus::Completed,
        };
        assert_eq!(entry.to_string(), "2025-03-01 17:05: Homework - Completed");
    }

    #[test]
    fn decision_helpers() {
        assert!(!Decision::Allow.is_block());
        assert!(Decision::Block {
            reason: BlockReason::Locked
        }
        .is_block());
        assert!(!BlockState::Idle.is_active());
        assert!(BlockState::PendingHide.is_active());
    }
}
