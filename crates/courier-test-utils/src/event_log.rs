// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared, ordered record of side effects.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// One recorded side effect and when it happened (tokio clock).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedEvent {
    pub name: String,
    pub at: Instant,
}

/// Append-only log shared by cloning.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<LoggedEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, name: impl Into<String>) {
        self.events.lock().await.push(LoggedEvent {
            name: name.into(),
            at: Instant::now(),
        });
    }

    /// Event names in the order they were recorded.
    pub async fn names(&self) -> Vec<String> {
        self.events
            .lock()
            .await
            .iter()
            .map(|e| e.name.clone())
            .collect()
    }

    pub async fn events(&self) -> Vec<LoggedEvent> {
        self.events.lock().await.clone()
    }

    pub async fn clear(&self) {
        self.events.lock().await.clear();
    }
}
