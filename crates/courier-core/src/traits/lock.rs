// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Distributed lock trait.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CourierError;

/// Mutual exclusion over a store shared by every backend instance.
///
/// There is deliberately no release: a lock expires after its TTL, even if
/// the holder crashed.
#[async_trait]
pub trait DistributedLock: Send + Sync + 'static {
    /// Set `key` if it is absent or expired. Never waits.
    ///
    /// Returns `Ok(true)` if this call now holds the lock, `Ok(false)` if a
    /// live holder already exists.
    async fn try_acquire(
        &self,
        key: &str,
        holder: &str,
        ttl: Duration,
    ) -> Result<bool, CourierError>;
}
