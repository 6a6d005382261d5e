// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;
use tokio::sync::Mutex;

use courier_core::{CourierError, PresenceStatus, PresenceStore};

/// Records every presence write in order.
#[derive(Default)]
pub struct MemoryPresenceStore {
    writes: Mutex<Vec<(String, PresenceStatus)>>,
}

impl MemoryPresenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn writes(&self) -> Vec<(String, PresenceStatus)> {
        self.writes.lock().await.clone()
    }

    /// Latest status written for `user_id`.
    pub async fn status(&self, user_id: &str) -> Option<PresenceStatus> {
        self.writes
            .lock()
            .await
            .iter()
            .rev()
            .find(|(user, _)| user == user_id)
            .map(|(_, status)| *status)
    }
}

#[async_trait]
impl PresenceStore for MemoryPresenceStore {
    async fn set_user_presence(
        &self,
        user_id: &str,
        status: PresenceStatus,
    ) -> Result<(), CourierError> {
        self.writes.lock().await.push((user_id.to_string(), status));
        Ok(())
    }
}
