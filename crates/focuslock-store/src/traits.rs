//! Store trait definitions

use chrono::{DateTime, Local};
use focuslock_api::CompletionLogEntry;
use focuslock_util::AppId;
use std::collections::{HashMap, HashSet};

use crate::{AuditEvent, StoreResult};

/// Read side of the policy, as seen by the enforcement core.
///
/// Both reads may fail; callers decide how to degrade.
pub trait PolicyStore: Send + Sync {
    /// Apps that are blocked with no end time
    fn get_locked_set(&self) -> StoreResult<HashSet<AppId>>;

    /// Block expiry per app. Entries may be in the past.
    fn get_scheduled_expiries(&self) -> StoreResult<HashMap<AppId, DateTime<Local>>>;

    /// Fetch both halves of the policy at once
    fn snapshot(&self) -> StoreResult<PolicySnapshot> {
        Ok(PolicySnapshot {
            locked: self.get_locked_set()?,
            scheduled_expiry: self.get_scheduled_expiries()?,
        })
    }
}

/// Full store: policy administration, tasks, settings and audit
pub trait Store: PolicyStore {
    // Locked apps

    /// Add an app to the locked set. Returns false if it was already locked.
    fn lock_app(&self, app_id: &AppId) -> StoreResult<bool>;

    /// Remove an app from the locked set. Returns false if it was not locked.
    fn unlock_app(&self, app_id: &AppId) -> StoreResult<bool>;

    /// Replace the locked set
    fn set_locked_apps(&self, app_ids: &[AppId]) -> StoreResult<()>;

    // Scheduled blocks

    /// Block an app until the given time, replacing any previous expiry
    fn set_block_until(&self, app_id: &AppId, until: DateTime<Local>) -> StoreResult<()>;

    /// Remove a scheduled block. Returns false if none existed.
    fn clear_block(&self, app_id: &AppId) -> StoreResult<bool>;

    // Tasks

    /// Outstanding tasks in insertion order
    fn get_tasks(&self) -> StoreResult<Vec<String>>;

    /// Append a task. Returns false if the task already exists.
    fn add_task(&self, task: &str) -> StoreResult<bool>;

    /// Remove a task. Returns false if it was not present.
    fn remove_task(&self, task: &str) -> StoreResult<bool>;

    // Completion log

    /// Append a completion log line
    fn append_completion(&self, entry: &CompletionLogEntry) -> StoreResult<()>;

    /// Most recent completion log lines, oldest first
    fn get_completion_log(&self, limit: usize) -> StoreResult<Vec<CompletionLogEntry>>;

    // Settings

    /// Stored require-pin setting, `None` if never set
    fn get_require_pin(&self) -> StoreResult<Option<bool>>;

    fn set_require_pin(&self, enabled: bool) -> StoreResult<()>;

    // Audit log

    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events, newest first
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}

/// Policy as read at one instant. Never cached across decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicySnapshot {
    pub locked: HashSet<AppId>,
    pub scheduled_expiry: HashMap<AppId, DateTime<Local>>,
}

impl PolicySnapshot {
    pub fn is_locked(&self, app_id: &AppId) -> bool {
        self.locked.contains(app_id)
    }

    pub fn expiry_for(&self, app_id: &AppId) -> Option<DateTime<Local>> {
        self.scheduled_expiry.get(app_id).copied()
    }

    /// Scheduled blocks that have not expired at `now`
    pub fn active_blocks(&self, now: DateTime<Local>) -> Vec<(AppId, DateTime<Local>)> {
        let mut blocks: Vec<_> = self
            .scheduled_expiry
            .iter()
            .filter(|(_, until)| now < **until)
            .map(|(app, until)| (app.clone(), *until))
            .collect();
        blocks.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        blocks
    }
}
