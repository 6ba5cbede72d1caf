//! Enforcement scheduler: the single actor that owns the block session

use chrono::{DateTime, Local};
use focuslock_api::{BlockReason, BlockState, CountdownDisplay, Decision, HideReason, SessionView};
use focuslock_host_api::{PresentError, Presenter};
use focuslock_store::PolicyStore;
use focuslock_util::{checked_after, AppId, Clock};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{
    countdown, BlockSession, CoreEvent, DebounceOutcome, Debouncer, ForegroundEvent,
    PolicyEvaluator, TimerKind, TimerSet, COUNTDOWN_TICK, MIN_HOLD, SHOW_DELAY,
};

/// Drives overlay show/hide timing for foreground events.
///
/// All methods are synchronous and must be called from one loop. Timers are
/// deadlines in a [`TimerSet`]; the caller sleeps until [`next_deadline`]
/// and then calls [`fire_due`].
///
/// [`next_deadline`]: EnforcementScheduler::next_deadline
/// [`fire_due`]: EnforcementScheduler::fire_due
pub struct EnforcementScheduler {
    debouncer: Debouncer,
    evaluator: PolicyEvaluator,
    presenter: Arc<dyn Presenter>,
    clock: Arc<dyn Clock>,
    session: BlockSession,
    timers: TimerSet,
}

fn after(at: DateTime<Local>, delay: Duration) -> DateTime<Local> {
    checked_after(at, delay).unwrap_or(at)
}

impl EnforcementScheduler {
    pub fn new(
        self_app_id: AppId,
        store: Arc<dyn PolicyStore>,
        presenter: Arc<dyn Presenter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        info!(self_app_id = %self_app_id, "Enforcement scheduler initialized");

        Self {
            debouncer: Debouncer::new(self_app_id),
            evaluator: PolicyEvaluator::new(store),
            presenter,
            clock,
            session: BlockSession::new(),
            timers: TimerSet::new(),
        }
    }

    /// Process one foreground event.
    ///
    /// Timers already due are fired first so they keep their order relative
    /// to the event.
    pub fn handle_foreground(&mut self, event: ForegroundEvent) -> Vec<CoreEvent> {
        let event = match self.debouncer.accept(event) {
            DebounceOutcome::Forward(event) => event,
            DebounceOutcome::Suppressed | DebounceOutcome::Dropped => return Vec::new(),
        };

        let mut events = self.fire_due();
        let now = self.clock.now();

        match self.evaluator.decide(&event.app_id, now) {
            Decision::Block { reason } => {
                events.push(CoreEvent::AppBlocked {
                    app_id: event.app_id.clone(),
                    reason: reason.clone(),
                });
                self.on_block(event.app_id, reason, now);
            }
            Decision::Allow => {
                debug!(app_id = %event.app_id, "App allowed");
                events.push(CoreEvent::AppAllowed {
                    app_id: event.app_id,
                });
                self.on_allow(now, &mut events);
            }
        }

        events
    }

    /// Fire every timer whose deadline has passed, earliest first.
    ///
    /// Each timer is handled as of its own deadline.
    pub fn fire_due(&mut self) -> Vec<CoreEvent> {
        let now = self.clock.now();
        let mut events = Vec::new();

        while let Some((kind, at)) = self.timers.pop_due(now) {
            match kind {
                TimerKind::Show => self.on_show_timer(at, &mut events),
                TimerKind::Hide => self.on_hide_timer(&mut events),
                TimerKind::CountdownTick => self.on_countdown_tick(at, now, &mut events),
            }
        }

        events
    }

    /// Earliest pending timer deadline
    pub fn next_deadline(&self) -> Option<DateTime<Local>> {
        self.timers.next_deadline()
    }

    /// Cancel every timer and take down a visible overlay
    pub fn shutdown(&mut self) -> Vec<CoreEvent> {
        let mut events = Vec::new();

        if self.session.overlay_up() {
            self.hide_now(HideReason::Shutdown, &mut events);
        } else {
            self.timers.cancel_all();
            self.session.reset();
        }

        info!("Enforcement scheduler stopped");
        events
    }

    pub fn state(&self) -> BlockState {
        self.session.state()
    }

    pub fn session(&self) -> &BlockSession {
        &self.session
    }

    pub fn timers(&self) -> &TimerSet {
        &self.timers
    }

    pub fn snapshot(&self) -> SessionView {
        self.session.view()
    }

    fn on_block(&mut self, app_id: AppId, reason: BlockReason, now: DateTime<Local>) {
        info!(app_id = %app_id, ?reason, state = ?self.session.state(), "Blocking app");

        if let Err(e) = self.presenter.navigate_home() {
            warn!(app_id = %app_id, error = %e, "Navigate home failed");
        }

        if self.session.is_handling(&app_id) {
            debug!(app_id = %app_id, "Already handling app");
            return;
        }

        if self.session.state() == BlockState::PendingHide
            && self.session.active_app() == Some(&app_id)
            && self.session.showing_active()
        {
            // Overlay never went down; keep it and restart the hold
            self.timers.cancel(TimerKind::Hide);
            self.session.mark_visible(now);
            debug!(app_id = %app_id, "Re-blocked during hold, hide cancelled");
            return;
        }

        self.timers.cancel(TimerKind::Hide);
        self.timers.cancel(TimerKind::CountdownTick);
        if self.session.overlay_up() {
            // Old overlay stays up until the new one replaces it
            self.session.retarget(app_id.clone());
        } else {
            self.session.begin(app_id.clone());
        }
        let show_at = after(now, SHOW_DELAY);
        self.timers.schedule(TimerKind::Show, show_at);
        debug!(app_id = %app_id, show_at = %show_at, "Overlay show scheduled");
    }

    fn on_allow(&mut self, now: DateTime<Local>, events: &mut Vec<CoreEvent>) {
        let state = self.session.state();
        if state == BlockState::Idle {
            return;
        }
        if state == BlockState::PendingShow {
            self.timers.cancel(TimerKind::Show);
        }

        // A pending show that never appeared has no hold to honour
        match self.session.visible_for(now) {
            Some(elapsed) if elapsed < MIN_HOLD => {
                let hide_at = after(now, MIN_HOLD - elapsed);
                self.timers.schedule(TimerKind::Hide, hide_at);
                self.session.mark_pending_hide();
                debug!(hide_at = %hide_at, "Overlay hide deferred until hold elapses");
            }
            _ => self.hide_now(HideReason::AppAllowed, events),
        }
    }

    fn on_show_timer(&mut self, at: DateTime<Local>, events: &mut Vec<CoreEvent>) {
        if self.session.state() != BlockState::PendingShow {
            return;
        }
        let Some(app_id) = self.session.active_app().cloned() else {
            return;
        };

        match self.presenter.show_overlay(&app_id) {
            Ok(()) => {
                self.session.mark_visible(at);
                self.timers.schedule(TimerKind::CountdownTick, at);
                info!(app_id = %app_id, "Overlay shown");
                events.push(CoreEvent::OverlayShown { app_id, at });
            }
            Err(e) => self.abort(e, events),
        }
    }

    fn on_hide_timer(&mut self, events: &mut Vec<CoreEvent>) {
        if self.session.state() == BlockState::PendingHide {
            self.hide_now(HideReason::HoldElapsed, events);
        }
    }

    fn on_countdown_tick(
        &mut self,
        at: DateTime<Local>,
        now: DateTime<Local>,
        events: &mut Vec<CoreEvent>,
    ) {
        if !self.session.showing_active() {
            return;
        }
        let Some(app_id) = self.session.active_app().cloned() else {
            return;
        };

        let snapshot = match self.evaluator.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(app_id = %app_id, error = %e, "Countdown skipped, policy unavailable");
                self.schedule_tick(at, None, now);
                return;
            }
        };

        let expiry = if snapshot.is_locked(&app_id) {
            None
        } else {
            snapshot.expiry_for(&app_id)
        };

        let display = countdown::evaluate(expiry, at);
        if display == CountdownDisplay::Expired {
            info!(app_id = %app_id, "Scheduled block expired");
            self.hide_now(HideReason::BlockExpired, events);
            return;
        }

        if let Err(e) = self.presenter.update_countdown_text(&display.to_string()) {
            warn!(app_id = %app_id, error = %e, "Countdown update failed");
        }
        events.push(CoreEvent::CountdownUpdated { app_id, display });
        self.schedule_tick(at, expiry, now);
    }

    /// Next tick one period after `at`, pulled in to the expiry if that comes
    /// first. Missed ticks collapse into one at `now`.
    fn schedule_tick(
        &mut self,
        at: DateTime<Local>,
        expiry: Option<DateTime<Local>>,
        now: DateTime<Local>,
    ) {
        let mut next = after(at, COUNTDOWN_TICK);
        if let Some(until) = expiry {
            next = next.min(until);
        }
        if next < now {
            next = now;
        }
        self.timers.schedule(TimerKind::CountdownTick, next);
    }

    fn hide_now(&mut self, reason: HideReason, events: &mut Vec<CoreEvent>) {
        let result = self.presenter.hide_overlay();
        self.timers.cancel_all();
        let app_id = self.session.reset();

        match result {
            Ok(()) => {
                info!(app_id = ?app_id, ?reason, "Overlay hidden");
                events.push(CoreEvent::OverlayHidden { app_id, reason });
            }
            Err(e) => {
                warn!(app_id = ?app_id, error = %e, "Hide overlay failed, session reset");
                events.push(CoreEvent::SessionAborted {
                    app_id,
                    error: e.to_string(),
                });
            }
        }
    }

    fn abort(&mut self, error: PresentError, events: &mut Vec<CoreEvent>) {
        self.timers.cancel_all();
        let app_id = self.session.reset();
        warn!(app_id = ?app_id, error = %error, "Presentation failed, session reset");
        events.push(CoreEvent::SessionAborted {
            app_id,
            error: error.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};
    use focuslock_api::PresentationCommand;
    use focuslock_host_api::MockPresenter;
    use focuslock_store::{MemoryStore, Store};
    use focuslock_util::ManualClock;

    const GAME: &str = "com.example.game";
    const VIDEO: &str = "com.example.video";
    const NOTES: &str = "com.example.notes";

    struct Harness {
        scheduler: EnforcementScheduler,
        store: MemoryStore,
        presenter: MockPresenter,
        clock: Arc<ManualClock>,
    }

    fn t(ms: i64) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap() + TimeDelta::milliseconds(ms)
    }

    impl Harness {
        fn new() -> Self {
            let store = MemoryStore::new();
            store.lock_app(&AppId::new(GAME)).unwrap();
            let presenter = MockPresenter::new();
            let clock = Arc::new(ManualClock::new(t(0)));
            let scheduler = EnforcementScheduler::new(
                AppId::new("com.focuslock2"),
                Arc::new(store.clone()),
                Arc::new(presenter.clone()),
                clock.clone(),
            );
            Self {
                scheduler,
                store,
                presenter,
                clock,
            }
        }

        fn report(&mut self, app: &str, ms: i64) -> Vec<CoreEvent> {
            self.clock.set(t(ms));
            self.scheduler
                .handle_foreground(ForegroundEvent::new(app, t(ms)))
        }

        fn advance_to(&mut self, ms: i64) -> Vec<CoreEvent> {
            self.clock.set(t(ms));
            self.scheduler.fire_due()
        }

        fn navigate_count(&self) -> usize {
            self.presenter
                .commands()
                .iter()
                .filter(|c| matches!(c, PresentationCommand::NavigateHome))
                .count()
        }

        /// Block GAME at t=0 and let the overlay come up at t=400
        fn visible_game(&mut self) {
            self.report(GAME, 0);
            self.advance_to(400);
            assert_eq!(self.scheduler.state(), BlockState::Visible);
        }
    }

    #[test]
    fn block_navigates_home_and_delays_overlay() {
        let mut h = Harness::new();

        let events = h.report(GAME, 0);
        assert!(matches!(
            events.as_slice(),
            [CoreEvent::AppBlocked {
                reason: BlockReason::Locked,
                ..
            }]
        ));
        assert_eq!(h.presenter.commands(), vec![PresentationCommand::NavigateHome]);
        assert_eq!(h.scheduler.state(), BlockState::PendingShow);
        assert_eq!(h.scheduler.next_deadline(), Some(t(400)));

        assert!(h.advance_to(399).is_empty());
        assert_eq!(h.presenter.show_count(), 0);

        let events = h.advance_to(400);
        assert!(events.contains(&CoreEvent::OverlayShown {
            app_id: AppId::new(GAME),
            at: t(400)
        }));
        assert_eq!(
            h.presenter.commands(),
            vec![
                PresentationCommand::NavigateHome,
                PresentationCommand::ShowOverlay {
                    app_id: AppId::new(GAME)
                },
                PresentationCommand::UpdateCountdownText {
                    text: "Locked".into()
                },
            ]
        );
        assert_eq!(h.scheduler.session().overlay_visible_since(), Some(t(400)));
        assert_eq!(h.scheduler.next_deadline(), Some(t(1400)));
    }

    #[test]
    fn minimum_hold_defers_hide() {
        let mut h = Harness::new();
        h.visible_game();

        h.report(NOTES, 5000);
        assert_eq!(h.scheduler.state(), BlockState::PendingHide);
        assert_eq!(h.scheduler.timers().deadline(TimerKind::Hide), Some(t(10_400)));

        h.advance_to(10_399);
        assert_eq!(h.presenter.hide_count(), 0);
        assert_eq!(h.scheduler.state(), BlockState::PendingHide);

        let events = h.advance_to(10_400);
        assert_eq!(h.presenter.hide_count(), 1);
        assert_eq!(h.scheduler.state(), BlockState::Idle);
        assert!(h.scheduler.timers().is_empty());
        assert!(events.contains(&CoreEvent::OverlayHidden {
            app_id: Some(AppId::new(GAME)),
            reason: HideReason::HoldElapsed
        }));
    }

    #[test]
    fn same_app_allowed_mid_hold_waits_for_hold() {
        let mut h = Harness::new();
        h.visible_game();

        h.store.unlock_app(&AppId::new(GAME)).unwrap();
        let events = h.report(GAME, 5000);
        assert!(events.contains(&CoreEvent::AppAllowed {
            app_id: AppId::new(GAME)
        }));
        assert_eq!(h.scheduler.timers().deadline(TimerKind::Hide), Some(t(10_400)));
    }

    #[test]
    fn hide_is_immediate_once_hold_satisfied() {
        let mut h = Harness::new();
        h.visible_game();

        let events = h.report(NOTES, 11_000);
        assert_eq!(h.presenter.hide_count(), 1);
        assert_eq!(h.scheduler.state(), BlockState::Idle);
        assert!(h.scheduler.timers().is_empty());
        assert!(events.contains(&CoreEvent::OverlayHidden {
            app_id: Some(AppId::new(GAME)),
            reason: HideReason::AppAllowed
        }));
    }

    #[test]
    fn second_allow_keeps_single_hide_deadline() {
        let mut h = Harness::new();
        h.visible_game();

        h.report(NOTES, 3000);
        h.report(VIDEO, 6000);
        assert_eq!(h.scheduler.state(), BlockState::PendingHide);
        assert_eq!(h.scheduler.timers().deadline(TimerKind::Hide), Some(t(10_400)));
    }

    #[test]
    fn re_block_cancels_pending_hide() {
        let mut h = Harness::new();
        h.visible_game();

        h.report(NOTES, 5000);
        assert!(h.scheduler.timers().is_pending(TimerKind::Hide));

        h.report(GAME, 6000);
        assert_eq!(h.scheduler.state(), BlockState::Visible);
        assert!(!h.scheduler.timers().is_pending(TimerKind::Hide));
        assert!(!h.scheduler.timers().is_pending(TimerKind::Show));
        assert_eq!(h.scheduler.session().overlay_visible_since(), Some(t(6000)));
        assert_eq!(h.navigate_count(), 2);

        h.advance_to(30_000);
        assert_eq!(h.presenter.hide_count(), 0);
        assert_eq!(h.presenter.show_count(), 1);
        assert_eq!(h.scheduler.state(), BlockState::Visible);
    }

    #[test]
    fn re_block_restarts_hold() {
        let mut h = Harness::new();
        h.visible_game();

        h.report(NOTES, 5000);
        h.report(GAME, 9000);
        h.report(NOTES, 12_000);

        assert_eq!(h.scheduler.timers().deadline(TimerKind::Hide), Some(t(19_000)));
    }

    #[test]
    fn scheduled_expiry_ends_session_on_tick() {
        let mut h = Harness::new();
        h.store.set_block_until(&AppId::new(VIDEO), t(5000)).unwrap();

        let events = h.report(VIDEO, 0);
        assert!(matches!(
            events.as_slice(),
            [CoreEvent::AppBlocked {
                reason: BlockReason::Scheduled { .. },
                ..
            }]
        ));

        h.advance_to(400);
        assert_eq!(
            h.presenter.last_countdown_text().as_deref(),
            Some("0h 0m 4s remaining")
        );

        h.advance_to(4999);
        assert_eq!(h.scheduler.state(), BlockState::Visible);
        assert_eq!(h.scheduler.next_deadline(), Some(t(5000)));

        let events = h.advance_to(5000);
        assert_eq!(h.presenter.hide_count(), 1);
        assert_eq!(h.scheduler.state(), BlockState::Idle);
        assert!(events.contains(&CoreEvent::OverlayHidden {
            app_id: Some(AppId::new(VIDEO)),
            reason: HideReason::BlockExpired
        }));
    }

    #[test]
    fn expiry_overrides_pending_hold() {
        let mut h = Harness::new();
        h.store.set_block_until(&AppId::new(VIDEO), t(5000)).unwrap();
        h.report(VIDEO, 0);
        h.advance_to(400);

        h.report(NOTES, 2000);
        assert_eq!(h.scheduler.state(), BlockState::PendingHide);

        h.advance_to(5000);
        assert_eq!(h.presenter.hide_count(), 1);
        assert_eq!(h.scheduler.state(), BlockState::Idle);
    }

    #[test]
    fn store_failure_fails_open() {
        let mut h = Harness::new();
        h.store.set_fail_reads(true);

        let events = h.report(GAME, 0);
        assert_eq!(
            events,
            vec![CoreEvent::AppAllowed {
                app_id: AppId::new(GAME)
            }]
        );
        assert!(h.presenter.commands().is_empty());
        assert_eq!(h.scheduler.state(), BlockState::Idle);
    }

    #[test]
    fn countdown_store_failure_skips_tick() {
        let mut h = Harness::new();
        h.visible_game();
        h.presenter.take_commands();

        h.store.set_fail_reads(true);
        let events = h.advance_to(1400);
        assert!(events.is_empty());
        assert!(h.presenter.commands().is_empty());
        assert_eq!(h.scheduler.state(), BlockState::Visible);
        assert_eq!(h.scheduler.next_deadline(), Some(t(2400)));

        h.store.set_fail_reads(false);
        h.advance_to(2400);
        assert_eq!(h.presenter.last_countdown_text().as_deref(), Some("Locked"));
    }

    #[test]
    fn show_failure_resets_session() {
        let mut h = Harness::new();
        h.presenter.set_fail_show(true);

        h.report(GAME, 0);
        let events = h.advance_to(400);
        assert!(matches!(
            events.as_slice(),
            [CoreEvent::SessionAborted { app_id: Some(_), .. }]
        ));
        assert_eq!(h.scheduler.state(), BlockState::Idle);
        assert!(h.scheduler.timers().is_empty());

        h.presenter.set_fail_show(false);
        h.report(GAME, 2000);
        assert_eq!(h.scheduler.state(), BlockState::PendingShow);
        h.advance_to(2400);
        assert_eq!(h.presenter.show_count(), 1);
    }

    #[test]
    fn hide_failure_resets_session() {
        let mut h = Harness::new();
        h.visible_game();
        h.presenter.set_fail_hide(true);

        let events = h.report(NOTES, 11_000);
        assert!(events
            .iter()
            .any(|e| matches!(e, CoreEvent::SessionAborted { .. })));
        assert_eq!(h.scheduler.state(), BlockState::Idle);
        assert!(h.scheduler.timers().is_empty());
    }

    #[test]
    fn navigate_failure_does_not_stop_block() {
        let mut h = Harness::new();
        *h.presenter.fail_navigate.lock().unwrap() = true;

        h.report(GAME, 0);
        h.advance_to(400);
        assert_eq!(h.scheduler.state(), BlockState::Visible);
    }

    #[test]
    fn different_app_replays_show_delay() {
        let mut h = Harness::new();
        h.store.lock_app(&AppId::new(VIDEO)).unwrap();
        h.visible_game();

        h.report(VIDEO, 1000);
        assert_eq!(h.scheduler.state(), BlockState::PendingShow);
        assert_eq!(h.scheduler.session().active_app(), Some(&AppId::new(VIDEO)));
        assert_eq!(h.scheduler.timers().deadline(TimerKind::Show), Some(t(1400)));
        assert!(!h.scheduler.timers().is_pending(TimerKind::CountdownTick));

        h.advance_to(1400);
        assert_eq!(h.scheduler.state(), BlockState::Visible);
        assert!(h.presenter.commands().contains(&PresentationCommand::ShowOverlay {
            app_id: AppId::new(VIDEO)
        }));
    }

    #[test]
    fn allow_after_retarget_keeps_hold_of_visible_overlay() {
        let mut h = Harness::new();
        h.store.lock_app(&AppId::new(VIDEO)).unwrap();
        h.visible_game();

        h.report(VIDEO, 1000);
        assert_eq!(h.scheduler.session().overlay_visible_since(), Some(t(400)));

        h.report(NOTES, 1200);
        assert_eq!(h.presenter.hide_count(), 0);
        assert_eq!(h.scheduler.state(), BlockState::PendingHide);
        assert!(!h.scheduler.timers().is_pending(TimerKind::Show));
        assert_eq!(h.scheduler.timers().deadline(TimerKind::Hide), Some(t(10_400)));

        h.advance_to(10_399);
        assert_eq!(h.presenter.hide_count(), 0);

        let events = h.advance_to(10_400);
        assert!(events.iter().any(|e| matches!(
            e,
            CoreEvent::OverlayHidden {
                reason: HideReason::HoldElapsed,
                ..
            }
        )));
        assert_eq!(h.presenter.hide_count(), 1);
        assert_eq!(h.presenter.show_count(), 1);
        assert_eq!(h.scheduler.state(), BlockState::Idle);
    }

    #[test]
    fn allow_after_retarget_from_pending_hide_keeps_hold() {
        let mut h = Harness::new();
        h.store.lock_app(&AppId::new(VIDEO)).unwrap();
        h.visible_game();

        h.report(NOTES, 2000);
        assert_eq!(h.scheduler.state(), BlockState::PendingHide);

        h.report(VIDEO, 3000);
        assert_eq!(h.scheduler.state(), BlockState::PendingShow);
        assert!(!h.scheduler.timers().is_pending(TimerKind::Hide));
        assert_eq!(h.scheduler.timers().deadline(TimerKind::Show), Some(t(3400)));

        h.report(NOTES, 3200);
        assert_eq!(h.presenter.hide_count(), 0);
        assert_eq!(h.scheduler.state(), BlockState::PendingHide);
        assert_eq!(h.scheduler.timers().deadline(TimerKind::Hide), Some(t(10_400)));

        h.advance_to(10_400);
        assert_eq!(h.presenter.hide_count(), 1);
        assert_eq!(h.presenter.show_count(), 1);
        assert_eq!(h.scheduler.state(), BlockState::Idle);
    }

    #[test]
    fn retargeted_show_restarts_hold() {
        let mut h = Harness::new();
        h.store.lock_app(&AppId::new(VIDEO)).unwrap();
        h.visible_game();

        h.report(VIDEO, 1000);
        h.advance_to(1400);
        assert_eq!(h.scheduler.session().overlay_visible_since(), Some(t(1400)));
        assert_eq!(h.scheduler.session().overlay_app(), Some(&AppId::new(VIDEO)));

        h.report(NOTES, 2000);
        assert_eq!(h.scheduler.timers().deadline(TimerKind::Hide), Some(t(11_400)));
    }

    #[test]
    fn re_block_of_unshown_retarget_shows_it() {
        let mut h = Harness::new();
        h.store.lock_app(&AppId::new(VIDEO)).unwrap();
        h.visible_game();
        h.report(VIDEO, 1000);
        h.report(NOTES, 1200);
        assert_eq!(h.scheduler.state(), BlockState::PendingHide);

        // The overlay on screen is still GAME's, so VIDEO needs its own show
        h.report(VIDEO, 3000);
        assert_eq!(h.scheduler.state(), BlockState::PendingShow);
        assert!(!h.scheduler.timers().is_pending(TimerKind::Hide));

        h.advance_to(3400);
        assert_eq!(h.scheduler.state(), BlockState::Visible);
        assert_eq!(h.presenter.hide_count(), 0);
        assert!(h.presenter.commands().contains(&PresentationCommand::ShowOverlay {
            app_id: AppId::new(VIDEO)
        }));
    }

    #[test]
    fn shutdown_during_retarget_hides_old_overlay() {
        let mut h = Harness::new();
        h.store.lock_app(&AppId::new(VIDEO)).unwrap();
        h.visible_game();
        h.report(VIDEO, 1000);

        h.scheduler.shutdown();
        assert_eq!(h.presenter.hide_count(), 1);
        assert_eq!(h.scheduler.state(), BlockState::Idle);
        assert!(h.scheduler.next_deadline().is_none());
    }

    #[test]
    fn allow_before_show_cancels_overlay() {
        let mut h = Harness::new();
        h.report(GAME, 0);

        h.report(NOTES, 200);
        assert_eq!(h.presenter.hide_count(), 1);
        assert_eq!(h.scheduler.state(), BlockState::Idle);

        h.advance_to(1000);
        assert_eq!(h.presenter.show_count(), 0);
    }

    #[test]
    fn repeated_block_for_same_app_keeps_session() {
        let mut h = Harness::new();
        h.visible_game();

        h.report(GAME, 2000);
        assert_eq!(h.navigate_count(), 2);
        assert_eq!(h.scheduler.state(), BlockState::Visible);
        assert_eq!(h.scheduler.session().overlay_visible_since(), Some(t(400)));
        assert!(!h.scheduler.timers().is_pending(TimerKind::Show));
    }

    #[test]
    fn debounced_events_have_no_effect() {
        let mut h = Harness::new();
        h.report(GAME, 0);
        assert!(h.report(GAME, 100).is_empty());
        assert!(h.report("com.focuslock2", 150).is_empty());
        assert_eq!(h.navigate_count(), 1);
    }

    #[test]
    fn allow_while_idle_is_quiet() {
        let mut h = Harness::new();
        h.report(NOTES, 0);
        assert!(h.presenter.commands().is_empty());
        assert!(h.scheduler.next_deadline().is_none());
    }

    #[test]
    fn shutdown_hides_visible_overlay() {
        let mut h = Harness::new();
        h.visible_game();

        let events = h.scheduler.shutdown();
        assert_eq!(
            events,
            vec![CoreEvent::OverlayHidden {
                app_id: Some(AppId::new(GAME)),
                reason: HideReason::Shutdown
            }]
        );
        assert!(h.scheduler.next_deadline().is_none());
    }

    #[test]
    fn shutdown_while_pending_show_sends_nothing() {
        let mut h = Harness::new();
        h.report(GAME, 0);

        assert!(h.scheduler.shutdown().is_empty());
        assert_eq!(h.presenter.hide_count(), 0);
        assert_eq!(h.scheduler.state(), BlockState::Idle);
    }
}
