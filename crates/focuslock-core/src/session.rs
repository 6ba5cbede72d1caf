//! The single block session

use chrono::{DateTime, Local};
use focuslock_api::{BlockState, SessionView};
use focuslock_util::{elapsed_between, AppId};
use std::time::Duration;

/// State of the one overlay session the scheduler manages.
///
/// Pending timers live in the scheduler's [`TimerSet`](crate::TimerSet); the
/// session only records which app is being handled and since when its
/// overlay has been on screen.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BlockSession {
    state: BlockState,
    active_app: Option<AppId>,
    overlay_visible_since: Option<DateTime<Local>>,
    overlay_app: Option<AppId>,
}

impl BlockSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> BlockState {
        self.state
    }

    pub fn active_app(&self) -> Option<&AppId> {
        self.active_app.as_ref()
    }

    pub fn overlay_visible_since(&self) -> Option<DateTime<Local>> {
        self.overlay_visible_since
    }

    /// Whether the session is already handling `app_id` without a hide pending
    pub fn is_handling(&self, app_id: &AppId) -> bool {
        matches!(self.state, BlockState::PendingShow | BlockState::Visible)
            && self.active_app.as_ref() == Some(app_id)
    }

    /// App whose overlay is on screen; differs from the active app while a
    /// retargeted show is pending
    pub fn overlay_app(&self) -> Option<&AppId> {
        self.overlay_app.as_ref()
    }

    /// Whether the overlay is on screen, for any app
    pub fn overlay_up(&self) -> bool {
        self.overlay_visible_since.is_some()
    }

    /// Whether the overlay on screen belongs to the active app
    pub fn showing_active(&self) -> bool {
        self.overlay_up() && self.overlay_app.is_some() && self.overlay_app == self.active_app
    }

    /// How long the overlay has been visible; `None` if it never appeared
    pub fn visible_for(&self, now: DateTime<Local>) -> Option<Duration> {
        self.overlay_visible_since
            .map(|since| elapsed_between(since, now))
    }

    /// Start handling `app_id`; the overlay is not yet shown
    pub fn begin(&mut self, app_id: AppId) {
        self.state = BlockState::PendingShow;
        self.active_app = Some(app_id);
        self.overlay_visible_since = None;
        self.overlay_app = None;
    }

    /// Switch to `app_id` while an overlay may still be on screen.
    ///
    /// The visible-since time is kept so the hold is never shortened.
    pub fn retarget(&mut self, app_id: AppId) {
        self.state = BlockState::PendingShow;
        self.active_app = Some(app_id);
    }

    /// Overlay for the active app is on screen from `at`
    pub fn mark_visible(&mut self, at: DateTime<Local>) {
        self.state = BlockState::Visible;
        self.overlay_visible_since = Some(at);
        self.overlay_app = self.active_app.clone();
    }

    /// Hide requested but held back
    pub fn mark_pending_hide(&mut self) {
        self.state = BlockState::PendingHide;
    }

    /// Back to idle, returning the app that was being handled
    pub fn reset(&mut self) -> Option<AppId> {
        self.state = BlockState::Idle;
        self.overlay_visible_since = None;
        self.overlay_app = None;
        self.active_app.take()
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            state: self.state,
            active_app: self.active_app.clone(),
            overlay_visible_since: self.overlay_visible_since,
        }
    }
}
