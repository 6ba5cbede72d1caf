//! Enforcement core for focuslockd
//!
//! This crate is the heart of focuslockd, containing:
//! - Debouncing of foreground-app events
//! - Policy evaluation (locked apps, scheduled blocks)
//! - The block session state machine (Idle -> PendingShow -> Visible -> PendingHide -> Idle)
//! - Overlay show delay, minimum hold and countdown timing
//!
//! Everything here is synchronous and driven by an injected clock. The
//! service owns one [`EnforcementScheduler`] and feeds it events and timer
//! wakeups from a single loop.

mod countdown;
mod debounce;
mod events;
mod policy;
mod scheduler;
mod session;
mod timer;

pub use countdown::*;
pub use debounce::*;
pub use events::*;
pub use policy::*;
pub use scheduler::*;
pub use session::*;
pub use timer::*;

use std::time::Duration;

/// Same-app events closer together than this are collapsed
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(1500);

/// Delay between a block decision and the overlay appearing
pub const SHOW_DELAY: Duration = Duration::from_millis(400);

/// Minimum time the overlay stays up once shown
pub const MIN_HOLD: Duration = Duration::from_millis(10_000);

/// Countdown refresh period
pub const COUNTDOWN_TICK: Duration = Duration::from_millis(1000);
