//! Cancel-and-replace timers

use chrono::{DateTime, Local};
use std::collections::BTreeMap;

/// The kinds of timer the scheduler uses. At most one of each is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerKind {
    Show,
    Hide,
    CountdownTick,
}

/// One optional deadline per [`TimerKind`]
#[derive(Debug, Default, Clone)]
pub struct TimerSet {
    deadlines: BTreeMap<TimerKind, DateTime<Local>>,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `kind` for `at`, returning the deadline it replaced
    pub fn schedule(&mut self, kind: TimerKind, at: DateTime<Local>) -> Option<DateTime<Local>> {
        self.deadlines.insert(kind, at)
    }

    /// Cancel `kind`. Returns whether it was pending.
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        self.deadlines.remove(&kind).is_some()
    }

    pub fn cancel_all(&mut self) {
        self.deadlines.clear();
    }

    pub fn deadline(&self, kind: TimerKind) -> Option<DateTime<Local>> {
        self.deadlines.get(&kind).copied()
    }

    pub fn is_pending(&self, kind: TimerKind) -> bool {
        self.deadlines.contains_key(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<DateTime<Local>> {
        self.deadlines.values().min().copied()
    }

    /// Remove and return the earliest timer due at `now`. Ties go to the
    /// lower kind.
    pub fn pop_due(&mut self, now: DateTime<Local>) -> Option<(TimerKind, DateTime<Local>)> {
        let (kind, at) = self
            .deadlines
            .iter()
            .filter(|(_, at)| **at <= now)
            .min_by_key(|(kind, at)| (**at, **kind))
            .map(|(kind, at)| (*kind, *at))?;
        self.deadlines.remove(&kind);
        Some((kind, at))
    }
}
