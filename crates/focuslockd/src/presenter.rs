//! Presenter that forwards commands to subscribed IPC clients

use focuslock_api::{Event, EventPayload, PresentationCommand};
use focuslock_host_api::{PresentError, PresentResult, Presenter};
use focuslock_ipc::EventBroadcaster;
use focuslock_util::AppId;
use tracing::trace;

/// Broadcasts each command as an [`EventPayload::Presentation`] event.
///
/// With no subscribed client the command cannot reach a screen, so it fails
/// with [`PresentError::NotConnected`].
pub struct IpcPresenter {
    events: EventBroadcaster,
}

impl IpcPresenter {
    pub fn new(events: EventBroadcaster) -> Self {
        Self { events }
    }

    fn send(&self, command: PresentationCommand) -> PresentResult<()> {
        if self.events.subscriber_count() == 0 {
            return Err(PresentError::NotConnected);
        }
        trace!(?command, "Presentation command");
        self.events
            .broadcast(Event::new(EventPayload::Presentation(command)));
        Ok(())
    }
}

impl Presenter for IpcPresenter {
    fn navigate_home(&self) -> PresentResult<()> {
        self.send(PresentationCommand::NavigateHome)
    }

    fn show_overlay(&self, app_id: &AppId) -> PresentResult<()> {
        self.send(PresentationCommand::ShowOverlay {
            app_id: app_id.clone(),
        })
    }

    fn hide_overlay(&self) -> PresentResult<()> {
        self.send(PresentationCommand::HideOverlay)
    }

    fn update_countdown_text(&self, text: &str) -> PresentResult<()> {
        self.send(PresentationCommand::UpdateCountdownText {
            text: text.to_string(),
        })
    }

    fn is_connected(&self) -> bool {
        self.events.subscriber_count() > 0
    }
}
