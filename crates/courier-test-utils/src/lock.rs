// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory TTL lock. Clones share state, so two clones act like two
//! instances talking to one lock store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use courier_core::{CourierError, DistributedLock};

#[derive(Clone, Default)]
pub struct MemoryLock {
    entries: Arc<Mutex<HashMap<String, (String, Instant)>>>,
}

impl MemoryLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Holder of `key` if its TTL has not elapsed.
    pub async fn holder(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().await;
        entries
            .get(key)
            .filter(|(_, expires)| *expires > Instant::now())
            .map(|(holder, _)| holder.clone())
    }
}

#[async_trait]
impl DistributedLock for MemoryLock {
    async fn try_acquire(
        &self,
        key: &str,
        holder: &str,
        ttl: Duration,
    ) -> Result<bool, CourierError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        if let Some((_, expires)) = entries.get(key)
            && *expires > now
        {
            return Ok(false);
        }
        entries.insert(key.to_string(), (holder.to_string(), now + ttl));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn lock_expires_after_ttl() {
        let lock = MemoryLock::new();
        let other_instance = lock.clone();
        let ttl = Duration::from_secs(10);

        assert!(lock.try_acquire("k", "a", ttl).await.unwrap());
        assert!(!other_instance.try_acquire("k", "b", ttl).await.unwrap());

        tokio::time::advance(ttl).await;
        assert!(other_instance.try_acquire("k", "b", ttl).await.unwrap());
        assert_eq!(lock.holder("k").await.as_deref(), Some("b"));
    }
}
