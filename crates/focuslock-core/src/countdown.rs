//! Overlay countdown

use chrono::{DateTime, Local};
use focuslock_api::CountdownDisplay;
use std::time::Duration;

const MS_PER_HOUR: u128 = 3_600_000;
const MS_PER_MINUTE: u128 = 60_000;
const MS_PER_SECOND: u128 = 1_000;

/// What the overlay should show at `now` for a block ending at `expiry`.
///
/// `None` means a permanent lock.
pub fn evaluate(expiry: Option<DateTime<Local>>, now: DateTime<Local>) -> CountdownDisplay {
    match expiry {
        None => CountdownDisplay::Locked,
        Some(until) if now >= until => CountdownDisplay::Expired,
        Some(until) => remaining((until - now).to_std().unwrap_or(Duration::ZERO)),
    }
}

/// Split a remaining duration into whole hours, minutes and seconds.
/// Sub-second remainders are truncated.
pub fn remaining(left: Duration) -> CountdownDisplay {
    let ms = left.as_millis();
    CountdownDisplay::Remaining {
        hours: (ms / MS_PER_HOUR) as u64,
        minutes: ((ms % MS_PER_HOUR) / MS_PER_MINUTE) as u64,
        seconds: ((ms % MS_PER_MINUTE) / MS_PER_SECOND) as u64,
    }
}
