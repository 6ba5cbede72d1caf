//! Service state and command handling
//!
//! Everything here runs on the main loop; the scheduler is owned, not
//! shared, so no locking is involved.

use focuslock_api::{
    ClientInfo, Command, CompletionLogEntry, Decision, ErrorCode, ErrorInfo, Event, EventPayload,
    HealthStatus, PolicyView, Response, ResponsePayload, ScheduledBlockView, ServiceStateSnapshot,
    TaskStatus, API_VERSION,
};
use focuslock_config::Settings;
use focuslock_core::{CoreEvent, EnforcementScheduler, ForegroundEvent};
use focuslock_host_api::Presenter;
use focuslock_ipc::EventBroadcaster;
use focuslock_store::{AuditEvent, AuditEventType, PolicyStore, Store, StoreError, StoreResult};
use focuslock_util::{checked_after, elapsed_between, AppId, Clock};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Completion log lines returned when the client gives no limit
const DEFAULT_LOG_LIMIT: usize = 50;

type CommandResult = Result<ResponsePayload, ErrorInfo>;

fn store_error(e: StoreError) -> ErrorInfo {
    warn!(error = %e, "Store operation failed");
    ErrorInfo::new(ErrorCode::StoreError, e.to_string())
}

/// Main service state
pub struct Service {
    settings: Settings,
    scheduler: EnforcementScheduler,
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    events: EventBroadcaster,
}

impl Service {
    /// Wire the scheduler to the store and presenter, and apply the
    /// configured locked apps and require-pin default.
    pub fn new<S: Store + 'static>(
        settings: Settings,
        store: Arc<S>,
        presenter: Arc<dyn Presenter>,
        clock: Arc<dyn Clock>,
        events: EventBroadcaster,
    ) -> StoreResult<Self> {
        for app_id in &settings.locked_apps {
            if store.lock_app(app_id)? {
                debug!(app_id = %app_id, "Locked app from config");
            }
        }

        if store.get_require_pin()?.is_none() {
            store.set_require_pin(settings.parent.require_pin)?;
        }

        let policy_store: Arc<dyn PolicyStore> = store.clone();
        let store: Arc<dyn Store> = store;
        let scheduler = EnforcementScheduler::new(
            settings.service.self_app_id.clone(),
            policy_store,
            presenter,
            clock.clone(),
        );

        let service = Self {
            settings,
            scheduler,
            store,
            clock,
            events,
        };
        service.audit(AuditEventType::ConfigLoaded {
            locked_apps: service.settings.locked_apps.len(),
        });

        Ok(service)
    }

    /// Earliest pending timer, for the main loop to sleep until
    pub fn next_wakeup(&self) -> Option<Duration> {
        self.scheduler
            .next_deadline()
            .map(|at| elapsed_between(self.clock.now(), at))
    }

    /// Run due timers
    pub fn fire_due(&mut self) {
        let events = self.scheduler.fire_due();
        self.publish(events);
    }

    /// Take down the overlay and announce shutdown
    pub fn shutdown(&mut self) {
        let events = self.scheduler.shutdown();
        self.publish(events);
        self.events.broadcast(Event::new(EventPayload::Shutdown));
    }

    pub fn audit(&self, event: AuditEventType) {
        if let Err(e) = self.store.append_audit(AuditEvent::at(self.clock.now(), event)) {
            warn!(error = %e, "Failed to write audit event");
        }
    }

    pub fn state_snapshot(&self) -> ServiceStateSnapshot {
        let (locked_count, scheduled_count) = match self.store.snapshot() {
            Ok(snapshot) => (
                snapshot.locked.len(),
                snapshot.active_blocks(self.clock.now()).len(),
            ),
            Err(e) => {
                warn!(error = %e, "Policy unavailable for state snapshot");
                (0, 0)
            }
        };

        ServiceStateSnapshot {
            api_version: API_VERSION,
            session: self.scheduler.snapshot(),
            locked_count,
            scheduled_count,
        }
    }

    /// Audit and broadcast what the scheduler did
    fn publish(&self, events: Vec<CoreEvent>) {
        let mut state_changed = false;

        for event in events {
            match event {
                CoreEvent::AppAllowed { app_id } => {
                    debug!(app_id = %app_id, "Foreground app allowed");
                }
                CoreEvent::AppBlocked { app_id, reason } => {
                    self.audit(AuditEventType::AppBlocked {
                        app_id: app_id.clone(),
                        reason: reason.clone(),
                    });
                    self.events
                        .broadcast(Event::new(EventPayload::AppBlocked { app_id, reason }));
                    state_changed = true;
                }
                CoreEvent::OverlayShown { app_id, .. } => {
                    self.audit(AuditEventType::OverlayShown {
                        app_id: app_id.clone(),
                    });
                    self.events
                        .broadcast(Event::new(EventPayload::OverlayShown { app_id }));
                    state_changed = true;
                }
                CoreEvent::OverlayHidden { app_id, reason } => {
                    self.audit(AuditEventType::OverlayHidden {
                        app_id: app_id.clone(),
                        reason,
                    });
                    self.events
                        .broadcast(Event::new(EventPayload::OverlayHidden { app_id, reason }));
                    state_changed = true;
                }
                CoreEvent::SessionAborted { app_id, error } => {
                    self.audit(AuditEventType::SessionAborted {
                        app_id: app_id.clone(),
                        error: error.clone(),
                    });
                    self.events
                        .broadcast(Event::new(EventPayload::SessionAborted { app_id, error }));
                    state_changed = true;
                }
                CoreEvent::CountdownUpdated { app_id, display: countdown } => {
                    debug!(app_id = %app_id, display = %countdown, "Countdown updated");
                }
            }
        }

        if state_changed {
            self.events
                .broadcast(Event::new(EventPayload::StateChanged(self.state_snapshot())));
        }
    }

    fn policy_changed(&self) {
        let snapshot = self.state_snapshot();
        self.events.broadcast(Event::new(EventPayload::PolicyChanged {
            locked_count: snapshot.locked_count,
            scheduled_count: snapshot.scheduled_count,
        }));
    }

    fn tasks_changed(&self) {
        match self.store.get_tasks() {
            Ok(tasks) => self
                .events
                .broadcast(Event::new(EventPayload::TasksChanged { tasks })),
            Err(e) => warn!(error = %e, "Could not read tasks for broadcast"),
        }
    }

    /// Handle one client command
    pub fn handle_command(
        &mut self,
        client: &ClientInfo,
        request_id: u64,
        command: Command,
    ) -> Response {
        if command.requires_admin() && !client.role.can_administer() {
            warn!(
                client_id = %client.client_id,
                uid = ?client.uid,
                ?command,
                "Admin command from non-admin client"
            );
            return Response::error(
                request_id,
                ErrorInfo::new(ErrorCode::PermissionDenied, "Admin role required"),
            );
        }

        match self.dispatch(client, command) {
            Ok(payload) => Response::success(request_id, payload),
            Err(error) => Response::error(request_id, error),
        }
    }

    fn dispatch(&mut self, client: &ClientInfo, command: Command) -> CommandResult {
        match command {
            Command::GetState => Ok(ResponsePayload::State(self.state_snapshot())),

            Command::GetHealth => Ok(ResponsePayload::Health(HealthStatus {
                live: true,
                ready: true,
                store_healthy: self.store.is_healthy(),
                presenter_connected: self.events.subscriber_count() > 0,
            })),

            Command::SubscribeEvents => Ok(ResponsePayload::Subscribed {
                client_id: client.client_id.clone(),
            }),

            Command::UnsubscribeEvents => Ok(ResponsePayload::Unsubscribed),

            Command::ReportForeground {
                app_id,
                observed_at,
            } => {
                let observed_at = observed_at.unwrap_or_else(|| self.clock.now());
                let events = self
                    .scheduler
                    .handle_foreground(ForegroundEvent::new(app_id, observed_at));

                let decision = events.iter().find_map(|e| match e {
                    CoreEvent::AppBlocked { reason, .. } => Some(Decision::Block {
                        reason: reason.clone(),
                    }),
                    CoreEvent::AppAllowed { .. } => Some(Decision::Allow),
                    _ => None,
                });
                self.publish(events);

                Ok(ResponsePayload::ForegroundProcessed { decision })
            }

            Command::GetPolicy => self.policy_view().map(ResponsePayload::Policy),

            Command::ListTasks => {
                let tasks = self.store.get_tasks().map_err(store_error)?;
                Ok(ResponsePayload::Tasks { tasks })
            }

            Command::GetCompletionLog { limit } => {
                let entries = self
                    .store
                    .get_completion_log(limit.unwrap_or(DEFAULT_LOG_LIMIT))
                    .map_err(store_error)?;
                Ok(ResponsePayload::CompletionLog { entries })
            }

            Command::CompleteTask { task, pin } => self.complete_task(&task, pin.as_deref()),

            Command::LockApp { app_id } => {
                self.check_lockable(&app_id)?;
                if self.store.lock_app(&app_id).map_err(store_error)? {
                    info!(app_id = %app_id, "App locked");
                    self.audit(AuditEventType::AppLocked { app_id });
                    self.policy_changed();
                }
                Ok(ResponsePayload::PolicyUpdated)
            }

            Command::UnlockApp { app_id } => {
                if self.store.unlock_app(&app_id).map_err(store_error)? {
                    info!(app_id = %app_id, "App unlocked");
                    self.audit(AuditEventType::AppUnlocked { app_id });
                    self.policy_changed();
                }
                Ok(ResponsePayload::PolicyUpdated)
            }

            Command::SetLockedApps { app_ids } => {
                for app_id in &app_ids {
                    self.check_lockable(app_id)?;
                }
                self.store.set_locked_apps(&app_ids).map_err(store_error)?;
                info!(count = app_ids.len(), "Locked set replaced");
                self.audit(AuditEventType::LockedSetReplaced {
                    count: app_ids.len(),
                });
                self.policy_changed();
                Ok(ResponsePayload::PolicyUpdated)
            }

            Command::BlockFor { app_id, duration } => {
                self.check_lockable(&app_id)?;
                if duration.is_zero() {
                    return Err(ErrorInfo::new(
                        ErrorCode::InvalidRequest,
                        "Block duration must be greater than zero",
                    ));
                }
                let until = checked_after(self.clock.now(), duration).ok_or_else(|| {
                    ErrorInfo::new(ErrorCode::InvalidRequest, "Block duration out of range")
                })?;

                self.store
                    .set_block_until(&app_id, until)
                    .map_err(store_error)?;
                info!(app_id = %app_id, until = %until, "Block scheduled");
                self.audit(AuditEventType::BlockScheduled {
                    app_id: app_id.clone(),
                    until,
                });
                self.policy_changed();
                Ok(ResponsePayload::BlockScheduled { app_id, until })
            }

            Command::ClearBlock { app_id } => {
                if self.store.clear_block(&app_id).map_err(store_error)? {
                    info!(app_id = %app_id, "Block cleared");
                    self.audit(AuditEventType::BlockCleared { app_id });
                    self.policy_changed();
                }
                Ok(ResponsePayload::PolicyUpdated)
            }

            Command::AddTask { task } => {
                let task = task.trim().to_string();
                if task.is_empty() {
                    return Err(ErrorInfo::new(ErrorCode::InvalidRequest, "Task is empty"));
                }
                if !self.store.add_task(&task).map_err(store_error)? {
                    return Err(ErrorInfo::new(
                        ErrorCode::InvalidRequest,
                        format!("Task already exists: {}", task),
                    ));
                }
                self.store
                    .append_completion(&CompletionLogEntry {
                        recorded_at: self.clock.now(),
                        task: task.clone(),
                        status: TaskStatus::Incomplete,
                    })
                    .map_err(store_error)?;

                info!(task = %task, "Task added");
                self.audit(AuditEventType::TaskAdded { task });
                self.tasks_changed();
                Ok(ResponsePayload::Tasks {
                    tasks: self.store.get_tasks().map_err(store_error)?,
                })
            }

            Command::SetRequirePin { enabled } => {
                self.store.set_require_pin(enabled).map_err(store_error)?;
                info!(enabled, "Require-pin changed");
                self.audit(AuditEventType::RequirePinChanged { enabled });
                Ok(ResponsePayload::RequirePinSet { enabled })
            }

            Command::Ping => Ok(ResponsePayload::Pong),
        }
    }

    fn check_lockable(&self, app_id: &AppId) -> Result<(), ErrorInfo> {
        if !app_id.is_well_formed() {
            return Err(ErrorInfo::new(
                ErrorCode::InvalidAppId,
                format!("Invalid app id: '{}'", app_id),
            ));
        }
        if *app_id == self.settings.service.self_app_id {
            return Err(ErrorInfo::new(
                ErrorCode::InvalidAppId,
                "The service's own app cannot be blocked",
            ));
        }
        Ok(())
    }

    fn require_pin(&self) -> StoreResult<bool> {
        Ok(self
            .store
            .get_require_pin()?
            .unwrap_or(self.settings.parent.require_pin))
    }

    fn complete_task(&self, task: &str, pin: Option<&str>) -> CommandResult {
        if self.require_pin().map_err(store_error)? {
            let accepted = pin.is_some_and(|p| self.settings.parent.pin_matches(p));
            if !accepted {
                return Err(ErrorInfo::new(
                    ErrorCode::PinRequired,
                    "A valid parent PIN is required",
                ));
            }
        }

        if !self.store.remove_task(task).map_err(store_error)? {
            return Err(ErrorInfo::new(
                ErrorCode::TaskNotFound,
                format!("No such task: {}", task),
            ));
        }

        self.store
            .append_completion(&CompletionLogEntry {
                recorded_at: self.clock.now(),
                task: task.to_string(),
                status: TaskStatus::Completed,
            })
            .map_err(store_error)?;

        info!(task = %task, "Task completed");
        self.audit(AuditEventType::TaskCompleted {
            task: task.to_string(),
        });
        self.tasks_changed();
        Ok(ResponsePayload::TaskCompleted)
    }

    fn policy_view(&self) -> Result<PolicyView, ErrorInfo> {
        let now = self.clock.now();
        let snapshot = self.store.snapshot().map_err(store_error)?;

        let mut locked_apps: Vec<AppId> = snapshot.locked.iter().cloned().collect();
        locked_apps.sort();

        let scheduled_blocks = snapshot
            .active_blocks(now)
            .into_iter()
            .map(|(app_id, until)| ScheduledBlockView {
                app_id,
                until,
                remaining: elapsed_between(now, until),
            })
            .collect();

        Ok(PolicyView {
            locked_apps,
            scheduled_blocks,
            require_pin: self.require_pin().map_err(store_error)?,
        })
    }
}
