//! Foreground event debouncing

use chrono::{DateTime, Local};
use focuslock_util::{elapsed_between, AppId};
use std::time::Duration;
use tracing::trace;

use crate::DEBOUNCE_WINDOW;

/// A foreground-application change as reported by the event source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForegroundEvent {
    pub app_id: AppId,
    pub observed_at: DateTime<Local>,
}

impl ForegroundEvent {
    pub fn new(app_id: impl Into<AppId>, observed_at: DateTime<Local>) -> Self {
        Self {
            app_id: app_id.into(),
            observed_at,
        }
    }
}

/// Result of passing an event through the [`Debouncer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebounceOutcome {
    /// Semantically new event; evaluate it
    Forward(ForegroundEvent),
    /// Duplicate of the last forwarded event
    Suppressed,
    /// Self-originated or malformed; ignored without logging an error
    Dropped,
}

/// Collapses repeated events for the same app.
///
/// Last-seen state is global, not per app: switching between two apps is
/// never suppressed.
#[derive(Debug)]
pub struct Debouncer {
    self_app_id: AppId,
    window: Duration,
    last: Option<(AppId, DateTime<Local>)>,
}

impl Debouncer {
    pub fn new(self_app_id: AppId) -> Self {
        Self::with_window(self_app_id, DEBOUNCE_WINDOW)
    }

    pub fn with_window(self_app_id: AppId, window: Duration) -> Self {
        Self {
            self_app_id,
            window,
            last: None,
        }
    }

    pub fn accept(&mut self, event: ForegroundEvent) -> DebounceOutcome {
        if !event.app_id.is_well_formed() || event.app_id == self.self_app_id {
            trace!(app_id = %event.app_id, "Dropping foreground event");
            return DebounceOutcome::Dropped;
        }

        if let Some((last_app, last_at)) = &self.last {
            if *last_app == event.app_id
                && elapsed_between(*last_at, event.observed_at) < self.window
            {
                trace!(app_id = %event.app_id, "Suppressing duplicate foreground event");
                return DebounceOutcome::Suppressed;
            }
        }

        self.last = Some((event.app_id.clone(), event.observed_at));
        DebounceOutcome::Forward(event)
    }

    /// App of the last forwarded event
    pub fn last_app(&self) -> Option<&AppId> {
        self.last.as_ref().map(|(app, _)| app)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    fn t(ms: i64) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap() + TimeDelta::milliseconds(ms)
    }

    fn debouncer() -> Debouncer {
        Debouncer::new(AppId::new("com.focuslock2"))
    }

    #[test]
    fn same_app_inside_window_is_suppressed() {
        let mut d = debouncer();
        assert!(matches!(
            d.accept(ForegroundEvent::new("com.example.a", t(0))),
            DebounceOutcome::Forward(_)
        ));
        assert_eq!(
            d.accept(ForegroundEvent::new("com.example.a", t(1499))),
            DebounceOutcome::Suppressed
        );
    }

    #[test]
    fn same_app_at_window_edge_is_forwarded() {
        let mut d = debouncer();
        d.accept(ForegroundEvent::new("com.example.a", t(0)));
        assert!(matches!(
            d.accept(ForegroundEvent::new("com.example.a", t(1500))),
            DebounceOutcome::Forward(_)
        ));
    }

    #[test]
    fn suppressed_events_do_not_extend_window() {
        let mut d = debouncer();
        d.accept(ForegroundEvent::new("com.example.a", t(0)));
        assert_eq!(
            d.accept(ForegroundEvent::new("com.example.a", t(1000))),
            DebounceOutcome::Suppressed
        );
        assert!(matches!(
            d.accept(ForegroundEvent::new("com.example.a", t(1600))),
            DebounceOutcome::Forward(_)
        ));
    }

    #[test]
    fn different_app_is_never_suppressed() {
        let mut d = debouncer();
        d.accept(ForegroundEvent::new("com.example.a", t(0)));
        assert!(matches!(
            d.accept(ForegroundEvent::new("com.example.b", t(100))),
            DebounceOutcome::Forward(_)
        ));
        assert!(matches!(
            d.accept(ForegroundEvent::new("com.example.a", t(200))),
            DebounceOutcome::Forward(_)
        ));
        assert_eq!(d.last_app(), Some(&AppId::new("com.example.a")));
    }

    #[test]
    fn self_and_malformed_events_are_dropped() {
        let mut d = debouncer();
        assert_eq!(
            d.accept(ForegroundEvent::new("com.focuslock2", t(0))),
            DebounceOutcome::Dropped
        );
        assert_eq!(d.accept(ForegroundEvent::new("", t(0))), DebounceOutcome::Dropped);
        assert_eq!(
            d.accept(ForegroundEvent::new("com.example a", t(0))),
            DebounceOutcome::Dropped
        );
        assert!(d.last_app().is_none());
    }
}
