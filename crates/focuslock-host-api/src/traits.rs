//! Presenter trait

use focuslock_util::AppId;
use thiserror::Error;

/// Errors from presentation commands
#[derive(Debug, Clone, Error)]
pub enum PresentError {
    /// Nobody is listening for presentation commands
    #[error("No presentation client connected")]
    NotConnected,

    #[error("Command rejected: {0}")]
    Rejected(String),
}

pub type PresentResult<T> = Result<T, PresentError>;

/// Write-only command sink for the presentation layer.
///
/// Calls are fire-and-forget: the core never reads UI state back. An `Err`
/// means the command could not be delivered.
pub trait Presenter: Send + Sync {
    /// Move the user to the home/neutral screen
    fn navigate_home(&self) -> PresentResult<()>;

    /// Show the blocking overlay for `app_id`
    fn show_overlay(&self, app_id: &AppId) -> PresentResult<()>;

    /// Remove the blocking overlay
    fn hide_overlay(&self) -> PresentResult<()>;

    /// Replace the countdown text on the overlay
    fn update_countdown_text(&self, text: &str) -> PresentResult<()>;

    /// Whether commands can currently be delivered
    fn is_connected(&self) -> bool {
        true
    }
}
