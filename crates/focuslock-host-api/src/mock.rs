//! Mock presenter for testing

use focuslock_api::PresentationCommand;
use focuslock_util::AppId;
use std::sync::{Arc, Mutex};

use crate::{PresentError, PresentResult, Presenter};

/// Presenter that records every delivered command.
///
/// Failed commands are not recorded.
#[derive(Debug, Clone, Default)]
pub struct MockPresenter {
    commands: Arc<Mutex<Vec<PresentationCommand>>>,

    /// Make `navigate_home` fail
    pub fail_navigate: Arc<Mutex<bool>>,

    /// Make `show_overlay` fail
    pub fail_show: Arc<Mutex<bool>>,

    /// Make `hide_overlay` fail
    pub fail_hide: Arc<Mutex<bool>>,

    /// Make `update_countdown_text` fail
    pub fail_countdown: Arc<Mutex<bool>>,
}

impl MockPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All commands delivered so far
    pub fn commands(&self) -> Vec<PresentationCommand> {
        self.commands
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Remove and return the commands delivered so far
    pub fn take_commands(&self) -> Vec<PresentationCommand> {
        std::mem::take(&mut *self.commands.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Last countdown text delivered, if any
    pub fn last_countdown_text(&self) -> Option<String> {
        self.commands().into_iter().rev().find_map(|c| match c {
            PresentationCommand::UpdateCountdownText { text } => Some(text),
            _ => None,
        })
    }

    /// Number of `HideOverlay` commands delivered
    pub fn hide_count(&self) -> usize {
        self.commands()
            .iter()
            .filter(|c| matches!(c, PresentationCommand::HideOverlay))
            .count()
    }

    /// Number of `ShowOverlay` commands delivered
    pub fn show_count(&self) -> usize {
        self.commands()
            .iter()
            .filter(|c| matches!(c, PresentationCommand::ShowOverlay { .. }))
            .count()
    }

    pub fn set_fail_show(&self, fail: bool) {
        *self.fail_show.lock().unwrap_or_else(|e| e.into_inner()) = fail;
    }

    pub fn set_fail_hide(&self, fail: bool) {
        *self.fail_hide.lock().unwrap_or_else(|e| e.into_inner()) = fail;
    }

    fn deliver(&self, toggle: &Mutex<bool>, command: PresentationCommand) -> PresentResult<()> {
        if *toggle.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(PresentError::Rejected("mock failure".into()));
        }
        self.commands
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(command);
        Ok(())
    }
}

impl Presenter for MockPresenter {
    fn navigate_home(&self) -> PresentResult<()> {
        self.deliver(&self.fail_navigate, PresentationCommand::NavigateHome)
    }

    fn show_overlay(&self, app_id: &AppId) -> PresentResult<()> {
        self.deliver(
            &self.fail_show,
            PresentationCommand::ShowOverlay {
                app_id: app_id.clone(),
            },
        )
    }

    fn hide_overlay(&self) -> PresentResult<()> {
        self.deliver(&self.fail_hide, PresentationCommand::HideOverlay)
    }

    fn update_countdown_text(&self, text: &str) -> PresentResult<()> {
        self.deliver(
            &self.fail_countdown,
            PresentationCommand::UpdateCountdownText {
                text: text.to_string(),
            },
        )
    }
}
