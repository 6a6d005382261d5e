// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`DistributedLock`] backed by the shared `locks` table.

use std::time::Duration;

use async_trait::async_trait;
use courier_core::{CourierError, DistributedLock};
use tracing::trace;

use crate::database::{Database, now_ms};
use crate::queries;

/// TTL lock visible to every instance that opens the same database file.
#[derive(Clone)]
pub struct SqliteLock {
    db: Database,
}

impl SqliteLock {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Drop rows whose TTL has passed.
    pub async fn purge_expired(&self) -> Result<usize, CourierError> {
        queries::locks::purge_expired(&self.db, now_ms()).await
    }
}

#[async_trait]
impl DistributedLock for SqliteLock {
    async fn try_acquire(
        &self,
        key: &str,
        holder: &str,
        ttl: Duration,
    ) -> Result<bool, CourierError> {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX / 2);
        let acquired = queries::locks::try_acquire(&self.db, key, holder, now_ms(), ttl_ms).await?;
        trace!(key, holder, acquired, "lock attempt");
        Ok(acquired)
    }
}
