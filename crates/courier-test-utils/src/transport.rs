// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signal transport that records every publish.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use courier_core::{CourierError, SignalEnvelope, SignalTransport};

use crate::event_log::EventLog;

/// Captures published envelopes. Failed publishes are not captured.
///
/// Publishing to a channel registered with [`fail_channel`](Self::fail_channel),
/// or to any channel after [`fail_all`](Self::fail_all), returns a signal error.
#[derive(Default)]
pub struct RecordingTransport {
    published: Arc<Mutex<Vec<SignalEnvelope>>>,
    attempts: Arc<Mutex<Vec<String>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    fail_all: AtomicBool,
    log: Option<EventLog>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also append each successful publish's event name to `log`.
    pub fn with_log(log: EventLog) -> Self {
        Self {
            log: Some(log),
            ..Self::default()
        }
    }

    pub async fn fail_channel(&self, channel: impl Into<String>) {
        self.failing.lock().await.insert(channel.into());
    }

    pub fn fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Successfully published envelopes, in order.
    pub async fn published(&self) -> Vec<SignalEnvelope> {
        self.published.lock().await.clone()
    }

    /// Channels of every publish attempt, including failed ones.
    pub async fn attempted_channels(&self) -> Vec<String> {
        self.attempts.lock().await.clone()
    }

    /// Successful publishes of `event`, as channel names.
    pub async fn channels_for(&self, event: &str) -> Vec<String> {
        self.published
            .lock()
            .await
            .iter()
            .filter(|e| e.event == event)
            .map(|e| e.channel.clone())
            .collect()
    }

    pub async fn count(&self) -> usize {
        self.published.lock().await.len()
    }

    pub async fn clear(&self) {
        self.published.lock().await.clear();
        self.attempts.lock().await.clear();
    }
}

#[async_trait]
impl SignalTransport for RecordingTransport {
    async fn publish(&self, envelope: SignalEnvelope) -> Result<(), CourierError> {
        self.attempts.lock().await.push(envelope.channel.clone());
        if self.fail_all.load(Ordering::SeqCst)
            || self.failing.lock().await.contains(&envelope.channel)
        {
            return Err(CourierError::signal(format!(
                "injected failure on {}",
                envelope.channel
            )));
        }
        if let Some(log) = &self.log {
            log.push(envelope.event.clone()).await;
        }
        self.published.lock().await.push(envelope);
        Ok(())
    }
}
