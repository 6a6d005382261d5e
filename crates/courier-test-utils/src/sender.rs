// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messaging collaborator that records bot messages.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use courier_core::{BotMessage, CourierError, MessageSender};

use crate::event_log::EventLog;

/// Records sent messages and returns sequential ids (`msg-1`, `msg-2`, ...).
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<BotMessage>>,
    failures_left: AtomicU32,
    log: Option<EventLog>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `"message"` to `log` for every successful send.
    pub fn with_log(log: EventLog) -> Self {
        Self {
            log: Some(log),
            ..Self::default()
        }
    }

    /// Make the next `n` sends fail.
    pub fn fail_next(&self, n: u32) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<BotMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send_bot_message(&self, message: &BotMessage) -> Result<String, CourierError> {
        let injected = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(CourierError::delivery("injected send failure"));
        }
        if let Some(log) = &self.log {
            log.push("message").await;
        }
        let mut sent = self.sent.lock().await;
        sent.push(message.clone());
        Ok(format!("msg-{}", sent.len()))
    }
}
