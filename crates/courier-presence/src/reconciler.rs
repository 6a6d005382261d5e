// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lock-guarded presence transitions.

use std::sync::Arc;
use std::time::Duration;

use courier_config::model::PresenceConfig;
use courier_core::{CourierError, DistributedLock, PresenceStatus, PresenceStore};
use tracing::{debug, info};

use crate::event::PresenceEvent;

/// Lock key guarding a user's offline transition.
pub fn offline_lock_key(user_id: &str) -> String {
    format!("presence:offline:{user_id}")
}

/// What this instance did with a leave event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// This instance won the lock and wrote the offline status.
    MarkedOffline,
    /// Another instance holds the lock; nothing was written.
    HandledElsewhere,
}

pub struct PresenceReconciler {
    lock: Arc<dyn DistributedLock>,
    store: Arc<dyn PresenceStore>,
    instance_id: String,
    lock_ttl: Duration,
}

impl PresenceReconciler {
    pub fn new(
        lock: Arc<dyn DistributedLock>,
        store: Arc<dyn PresenceStore>,
        instance_id: impl Into<String>,
        config: &PresenceConfig,
    ) -> Self {
        Self {
            lock,
            store,
            instance_id: instance_id.into(),
            lock_ttl: config.lock_ttl(),
        }
    }

    /// Mark `user_id` offline unless another instance already claimed it.
    ///
    /// Lock acquisition never waits. The lock is left to expire.
    pub async fn handle_leave(&self, user_id: &str) -> Result<LeaveOutcome, CourierError> {
        let key = offline_lock_key(user_id);
        if !self
            .lock
            .try_acquire(&key, &self.instance_id, self.lock_ttl)
            .await?
        {
            debug!(user_id, "offline transition handled by another instance");
            return Ok(LeaveOutcome::HandledElsewhere);
        }

        self.store
            .set_user_presence(user_id, PresenceStatus::Offline)
            .await?;
        info!(user_id, instance_id = %self.instance_id, "user marked offline");
        Ok(LeaveOutcome::MarkedOffline)
    }

    /// Mark `user_id` online. Idempotent, so every instance may write it.
    pub async fn handle_join(&self, user_id: &str) -> Result<(), CourierError> {
        self.store
            .set_user_presence(user_id, PresenceStatus::Online)
            .await?;
        debug!(user_id, "user marked online");
        Ok(())
    }

    pub async fn handle(&self, event: &PresenceEvent) -> Result<(), CourierError> {
        match event {
            PresenceEvent::Join { user_id } => self.handle_join(user_id).await,
            PresenceEvent::Leave { user_id } => self.handle_leave(user_id).await.map(|_| ()),
        }
    }
}
