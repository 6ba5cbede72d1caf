//! In-memory store with fault injection

use chrono::{DateTime, Local};
use focuslock_api::CompletionLogEntry;
use focuslock_util::AppId;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{AuditEvent, PolicyStore, Store, StoreError, StoreResult};

#[derive(Debug, Default)]
struct MemoryState {
    locked: HashSet<AppId>,
    scheduled: HashMap<AppId, DateTime<Local>>,
    tasks: Vec<String>,
    completion_log: Vec<CompletionLogEntry>,
    require_pin: Option<bool>,
    audit: Vec<AuditEvent>,
    next_audit_id: i64,
}

/// Store kept entirely in memory.
///
/// `fail_reads` and `fail_writes` make every read or write return
/// [`StoreError::Unavailable`], so callers can exercise their degraded paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    fail_reads: Arc<Mutex<bool>>,
    fail_writes: Arc<Mutex<bool>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        *self.fail_reads.lock().unwrap_or_else(|e| e.into_inner()) = fail;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap_or_else(|e| e.into_inner()) = fail;
    }

    fn read(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        if *self.fail_reads.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(StoreError::Unavailable("reads disabled".into()));
        }
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        if *self.fail_writes.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(StoreError::Unavailable("writes disabled".into()));
        }
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl PolicyStore for MemoryStore {
    fn get_locked_set(&self) -> StoreResult<HashSet<AppId>> {
        Ok(self.read()?.locked.clone())
    }

    fn get_scheduled_expiries(&self) -> StoreResult<HashMap<AppId, DateTime<Local>>> {
        Ok(self.read()?.scheduled.clone())
    }
}

impl Store for MemoryStore {
    fn lock_app(&self, app_id: &AppId) -> StoreResult<bool> {
        Ok(self.write()?.locked.insert(app_id.clone()))
    }

    fn unlock_app(&self, app_id: &AppId) -> StoreResult<bool> {
        Ok(self.write()?.locked.remove(app_id))
    }

    fn set_locked_apps(&self, app_ids: &[AppId]) -> StoreResult<()> {
        self.write()?.locked = app_ids.iter().cloned().collect();
        Ok(())
    }

    fn set_block_until(&self, app_id: &AppId, until: DateTime<Local>) -> StoreResult<()> {
        self.write()?.scheduled.insert(app_id.clone(), until);
        Ok(())
    }

    fn clear_block(&self, app_id: &AppId) -> StoreResult<bool> {
        Ok(self.write()?.scheduled.remove(app_id).is_some())
    }

    fn get_tasks(&self) -> StoreResult<Vec<String>> {
        Ok(self.read()?.tasks.clone())
    }

    fn add_task(&self, task: &str) -> StoreResult<bool> {
        let mut state = self.write()?;
        if state.tasks.iter().any(|t| t == task) {
            return Ok(false);
        }
        state.tasks.push(task.to_string());
        Ok(true)
    }

    fn remove_task(&self, task: &str) -> StoreResult<bool> {
        let mut state = self.write()?;
        let before = state.tasks.len();
        state.tasks.retain(|t| t != task);
        Ok(state.tasks.len() != before)
    }

    fn append_completion(&self, entry: &CompletionLogEntry) -> StoreResult<()> {
        self.write()?.completion_log.push(entry.clone());
        Ok(())
    }

    fn get_completion_log(&self, limit: usize) -> StoreResult<Vec<CompletionLogEntry>> {
        let state = self.read()?;
        let skip = state.completion_log.len().saturating_sub(limit);
        Ok(state.completion_log[skip..].to_vec())
    }

    fn get_require_pin(&self) -> StoreResult<Option<bool>> {
        Ok(self.read()?.require_pin)
    }

    fn set_require_pin(&self, enabled: bool) -> StoreResult<()> {
        self.write()?.require_pin = Some(enabled);
        Ok(())
    }

    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let mut state = self.write()?;
        state.next_audit_id += 1;
        event.id = state.next_audit_id;
        state.audit.push(event);
        Ok(())
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let state = self.read()?;
        Ok(state.audit.iter().rev().take(limit).cloned().collect())
    }

    fn is_healthy(&self) -> bool {
        !*self.fail_reads.lock().unwrap_or_else(|e| e.into_inner())
            && !*self.fail_writes.lock().unwrap_or_else(|e| e.into_inner())
    }
}
