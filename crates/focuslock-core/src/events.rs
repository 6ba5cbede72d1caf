//! Core events emitted by the scheduler

use chrono::{DateTime, Local};
use focuslock_api::{BlockReason, CountdownDisplay, HideReason};
use focuslock_util::AppId;

/// What the scheduler did. The service audits and broadcasts these; the
/// core itself never writes to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    /// A forwarded event was evaluated as Allow
    AppAllowed { app_id: AppId },

    /// A forwarded event was evaluated as Block
    AppBlocked { app_id: AppId, reason: BlockReason },

    /// Overlay went up
    OverlayShown {
        app_id: AppId,
        at: DateTime<Local>,
    },

    /// Overlay came down and the session is idle
    OverlayHidden {
        app_id: Option<AppId>,
        reason: HideReason,
    },

    /// A show/hide command failed and the session was reset
    SessionAborted {
        app_id: Option<AppId>,
        error: String,
    },

    /// Countdown text refreshed
    CountdownUpdated {
        app_id: AppId,
        display: CountdownDisplay,
    },
}
