//! SQLite-based store implementation

use chrono::{DateTime, Local};
use focuslock_api::{CompletionLogEntry, TaskStatus};
use focuslock_util::AppId;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::{AuditEvent, AuditEventType, PolicyStore, Store, StoreError, StoreResult};

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Permanently locked apps
            CREATE TABLE IF NOT EXISTS locked_apps (
                app_id TEXT PRIMARY KEY
            );

            -- Scheduled blocks
            CREATE TABLE IF NOT EXISTS scheduled_blocks (
                app_id TEXT PRIMARY KEY,
                until TEXT NOT NULL
            );

            -- Outstanding tasks, ordered by insertion
            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                task TEXT NOT NULL UNIQUE
            );

            -- Task completion log (append-only)
            CREATE TABLE IF NOT EXISTS completion_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                recorded_at TEXT NOT NULL,
                task TEXT NOT NULL,
                status TEXT NOT NULL
            );

            -- Key/value settings
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            -- Audit log (append-only)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

const REQUIRE_PIN_KEY: &str = "require_pin";

fn parse_timestamp(raw: &str) -> StoreResult<DateTime<Local>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Local))
        .map_err(|e| StoreError::Serialization(format!("bad timestamp '{}': {}", raw, e)))
}

fn status_to_str(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Incomplete => "incomplete",
        TaskStatus::Completed => "completed",
    }
}

fn status_from_str(raw: &str) -> StoreResult<TaskStatus> {
    match raw {
        "incomplete" => Ok(TaskStatus::Incomplete),
        "completed" => Ok(TaskStatus::Completed),
        other => Err(StoreError::Serialization(format!(
            "unknown task status '{}'",
            other
        ))),
    }
}

impl PolicyStore for SqliteStore {
    fn get_locked_set(&self) -> StoreResult<HashSet<AppId>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT app_id FROM locked_apps")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut locked = HashSet::new();
        for row in rows {
            locked.insert(AppId::new(row?));
        }
        Ok(locked)
    }

    fn get_scheduled_expiries(&self) -> StoreResult<HashMap<AppId, DateTime<Local>>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT app_id, until FROM scheduled_blocks")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut expiries = HashMap::new();
        for row in rows {
            let (app_id, until) = row?;
            match parse_timestamp(&until) {
                Ok(until) => {
                    expiries.insert(AppId::new(app_id), until);
                }
                Err(e) => warn!(app_id = %app_id, error = %e, "Skipping unreadable block expiry"),
            }
        }
        Ok(expiries)
    }
}

impl Store for SqliteStore {
    fn lock_app(&self, app_id: &AppId) -> StoreResult<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "INSERT OR IGNORE INTO locked_apps (app_id) VALUES (?)",
            [app_id.as_str()],
        )?;
        debug!(app_id = %app_id, changed, "App locked");
        Ok(changed > 0)
    }

    fn unlock_app(&self, app_id: &AppId) -> StoreResult<bool> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM locked_apps WHERE app_id = ?", [app_id.as_str()])?;
        debug!(app_id = %app_id, changed, "App unlocked");
        Ok(changed > 0)
    }

    fn set_locked_apps(&self, app_ids: &[AppId]) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM locked_apps", [])?;
        for app_id in app_ids {
            tx.execute(
                "INSERT OR IGNORE INTO locked_apps (app_id) VALUES (?)",
                [app_id.as_str()],
            )?;
        }
        tx.commit()?;
        debug!(count = app_ids.len(), "Locked set replaced");
        Ok(())
    }

    fn set_block_until(&self, app_id: &AppId, until: DateTime<Local>) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO scheduled_blocks (app_id, until)
            VALUES (?, ?)
            ON CONFLICT(app_id)
            DO UPDATE SET until = excluded.until
            "#,
            params![app_id.as_str(), until.to_rfc3339()],
        )?;

        debug!(app_id = %app_id, until = %until, "Block scheduled");
        Ok(())
    }

    fn clear_block(&self, app_id: &AppId) -> StoreResult<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "DELETE FROM scheduled_blocks WHERE app_id = ?",
            [app_id.as_str()],
        )?;
        Ok(changed > 0)
    }

    fn get_tasks(&self) -> StoreResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT task FROM tasks ORDER BY id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    fn add_task(&self, task: &str) -> StoreResult<bool> {
        let conn = self.conn()?;
        let changed = conn.execute("INSERT OR IGNORE INTO tasks (task) VALUES (?)", [task])?;
        Ok(changed > 0)
    }

    fn remove_task(&self, task: &str) -> StoreResult<bool> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM tasks WHERE task = ?", [task])?;
        Ok(changed > 0)
    }

    fn append_completion(&self, entry: &CompletionLogEntry) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO completion_log (recorded_at, task, status) VALUES (?, ?, ?)",
            params![
                entry.recorded_at.to_rfc3339(),
                entry.task,
                status_to_str(entry.status)
            ],
        )?;
        Ok(())
    }

    fn get_completion_log(&self, limit: usize) -> StoreResult<Vec<CompletionLogEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT recorded_at, task, status FROM completion_log ORDER BY id DESC LIMIT ?",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map([limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (recorded_at, task, status) = row?;
            entries.push(CompletionLogEntry {
                recorded_at: parse_timestamp(&recorded_at)?,
                task,
                status: status_from_str(&status)?,
            });
        }
        entries.reverse();
        Ok(entries)
    }

    fn get_require_pin(&self) -> StoreResult<Option<bool>> {
        let conn = self.conn()?;
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?",
                [REQUIRE_PIN_KEY],
                |row| row.get(0),
            )
            .optional()?;

        Ok(value.map(|v| v == "true"))
    }

    fn set_require_pin(&self, enabled: bool) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO settings (key, value)
            VALUES (?, ?)
            ON CONFLICT(key)
            DO UPDATE SET value = excluded.value
            "#,
            params![REQUIRE_PIN_KEY, enabled.to_string()],
        )?;
        Ok(())
    }

    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let conn = self.conn()?;
        let event_json = serde_json::to_string(&event.event)?;

        conn.execute(
            "INSERT INTO audit_log (timestamp, event_json) VALUES (?, ?)",
            params![event.timestamp.to_rfc3339(), event_json],
        )?;

        event.id = conn.last_insert_rowid();
        debug!(event_id = event.id, "Audit event appended");

        Ok(())
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_json FROM audit_log ORDER BY id DESC LIMIT ?",
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map([limit], |row| {
            let id: i64 = row.get(0)?;
            let timestamp_str: String = row.get(1)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp_str, event_json))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp_str, event_json) = row?;
            let timestamp = parse_timestamp(&timestamp_str)?;
            let event: AuditEventType = serde_json::from_str(&event_json)?;

            events.push(AuditEvent {
                id,
                timestamp,
                event,
            });
        }

        Ok(events)
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn test_in_memory_store() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.is_healthy());
        assert!(store.snapshot().unwrap().locked.is_empty());
    }

    #[test]
    fn test_locked_apps() {
        let store = SqliteStore::in_memory().unwrap();
        let game = AppId::new("com.example.game");

        assert!(store.lock_app(&game).unwrap());
        assert!(!store.lock_app(&game).unwrap());
        assert!(store.get_locked_set().unwrap().contains(&game));

        assert!(store.unlock_app(&game).unwrap());
        assert!(!store.unlock_app(&game).unwrap());
        assert!(store.get_locked_set().unwrap().is_empty());

        store
            .set_locked_apps(&[AppId::new("a"), AppId::new("b")])
            .unwrap();
        store.set_locked_apps(&[AppId::new("c")]).unwrap();
        let locked = store.get_locked_set().unwrap();
        assert_eq!(locked.len(), 1);
        assert!(locked.contains(&AppId::new("c")));
    }

    #[test]
    fn test_scheduled_blocks() {
        let store = SqliteStore::in_memory().unwrap();
        let video = AppId::new("com.example.video");
        let until = focuslock_util::now() + TimeDelta::hours(1);

        store.set_block_until(&video, until).unwrap();
        let stored = store.get_scheduled_expiries().unwrap()[&video];
        assert!((stored - until).num_seconds().abs() < 1);

        // Replaces the previous expiry
        let later = until + TimeDelta::hours(1);
        store.set_block_until(&video, later).unwrap();
        let stored = store.get_scheduled_expiries().unwrap()[&video];
        assert!((stored - later).num_seconds().abs() < 1);

        assert!(store.clear_block(&video).unwrap());
        assert!(!store.clear_block(&video).unwrap());
        assert!(store.get_scheduled_expiries().unwrap().is_empty());
    }

    #[test]
    fn test_tasks_keep_order() {
        let store = SqliteStore::in_memory().unwrap();

        assert!(store.add_task("Homework").unwrap());
        assert!(store.add_task("Dishes").unwrap());
        assert!(!store.add_task("Homework").unwrap());
        assert_eq!(store.get_tasks().unwrap(), vec!["Homework", "Dishes"]);

        assert!(store.remove_task("Homework").unwrap());
        assert!(!store.remove_task("Homework").unwrap());
        assert_eq!(store.get_tasks().unwrap(), vec!["Dishes"]);
    }

    #[test]
    fn test_completion_log_limit() {
        let store = SqliteStore::in_memory().unwrap();
        let now = focuslock_util::now();

        for (i, task) in ["one", "two", "three"].iter().enumerate() {
            store
                .append_completion(&CompletionLogEntry {
                    recorded_at: now + TimeDelta::minutes(i as i64),
                    task: task.to_string(),
                    status: TaskStatus::Completed,
                })
                .unwrap();
        }

        let tail = store.get_completion_log(2).unwrap();
        let tasks: Vec<_> = tail.iter().map(|e| e.task.as_str()).collect();
        assert_eq!(tasks, vec!["two", "three"]);
        assert_eq!(tail[1].status, TaskStatus::Completed);
    }

    #[test]
    fn test_completion_log_limit_beyond_i64() {
        let store = SqliteStore::in_memory().unwrap();
        let now = focuslock_util::now();

        for task in ["one", "two"] {
            store
                .append_completion(&CompletionLogEntry {
                    recorded_at: now,
                    task: task.to_string(),
                    status: TaskStatus::Incomplete,
                })
                .unwrap();
        }

        assert_eq!(store.get_completion_log(usize::MAX).unwrap().len(), 2);
        assert_eq!(
            store.get_completion_log(i64::MAX as usize + 1).unwrap().len(),
            2
        );
        assert!(store.get_completion_log(0).unwrap().is_empty());
    }

    #[test]
    fn test_require_pin_setting() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.get_require_pin().unwrap(), None);

        store.set_require_pin(false).unwrap();
        assert_eq!(store.get_require_pin().unwrap(), Some(false));
        store.set_require_pin(true).unwrap();
        assert_eq!(store.get_require_pin().unwrap(), Some(true));
    }

    #[test]
    fn test_audit_log() {
        let store = SqliteStore::in_memory().unwrap();

        store
            .append_audit(AuditEvent::new(AuditEventType::ServiceStarted))
            .unwrap();
        store
            .append_audit(AuditEvent::new(AuditEventType::AppLocked {
                app_id: AppId::new("com.example.game"),
            }))
            .unwrap();

        let events = store.get_recent_audits(10).unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0].event, AuditEventType::AppLocked { .. }));
        assert!(matches!(events[1].event, AuditEventType::ServiceStarted));
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("focuslock.db");
        let game = AppId::new("com.example.game");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.lock_app(&game).unwrap();
            store.add_task("Homework").unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert!(store.get_locked_set().unwrap().contains(&game));
        assert_eq!(store.get_tasks().unwrap(), vec!["Homework"]);
    }
}
