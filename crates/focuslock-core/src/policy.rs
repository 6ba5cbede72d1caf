//! Block/allow policy evaluation

use chrono::{DateTime, Local};
use focuslock_api::{BlockReason, Decision};
use focuslock_store::{PolicySnapshot, PolicyStore, StoreResult};
use focuslock_util::AppId;
use std::sync::Arc;
use tracing::warn;

/// Decides whether a foreground app must be blocked.
///
/// The snapshot is fetched fresh for every decision so that policy edits
/// take effect on the next event.
pub struct PolicyEvaluator {
    store: Arc<dyn PolicyStore>,
}

impl PolicyEvaluator {
    pub fn new(store: Arc<dyn PolicyStore>) -> Self {
        Self { store }
    }

    /// Pure decision over a snapshot. A locked app reports `Locked` even if
    /// it also has a scheduled block.
    pub fn evaluate(app_id: &AppId, now: DateTime<Local>, snapshot: &PolicySnapshot) -> Decision {
        if snapshot.is_locked(app_id) {
            return Decision::Block {
                reason: BlockReason::Locked,
            };
        }

        match snapshot.expiry_for(app_id) {
            Some(until) if now < until => Decision::Block {
                reason: BlockReason::Scheduled { until },
            },
            _ => Decision::Allow,
        }
    }

    /// Fetch the policy and evaluate. Fails open: a store error yields `Allow`.
    pub fn decide(&self, app_id: &AppId, now: DateTime<Local>) -> Decision {
        match self.store.snapshot() {
            Ok(snapshot) => Self::evaluate(app_id, now, &snapshot),
            Err(e) => {
                warn!(app_id = %app_id, error = %e, "Policy unavailable, allowing app");
                Decision::Allow
            }
        }
    }

    /// Fresh snapshot for the countdown
    pub fn snapshot(&self) -> StoreResult<PolicySnapshot> {
        self.store.snapshot()
    }
}
