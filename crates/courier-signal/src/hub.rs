// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process pub/sub transport.
//!
//! Each channel is a `tokio::sync::broadcast` sender created on first
//! subscribe. Publishing to a channel nobody listens on drops the message.

use async_trait::async_trait;
use courier_config::model::SignalingConfig;
use courier_core::{CourierError, SignalEnvelope, SignalTransport};
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::trace;

pub struct LocalHub {
    channels: DashMap<String, broadcast::Sender<SignalEnvelope>>,
    capacity: usize,
}

impl LocalHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn from_config(config: &SignalingConfig) -> Self {
        Self::new(config.channel_capacity)
    }

    /// Receive every envelope published on `channel` from now on.
    pub fn subscribe(&self, channel: &str) -> broadcast::Receiver<SignalEnvelope> {
        self.channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Number of live subscribers on `channel`.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .get(channel)
            .map_or(0, |sender| sender.receiver_count())
    }

    /// Drop channels whose subscribers have all gone away.
    pub fn prune(&self) -> usize {
        let mut removed = 0;
        self.channels.retain(|_, sender| {
            let live = sender.receiver_count() > 0;
            if !live {
                removed += 1;
            }
            live
        });
        removed
    }
}

#[async_trait]
impl SignalTransport for LocalHub {
    async fn publish(&self, envelope: SignalEnvelope) -> Result<(), CourierError> {
        let Some(sender) = self.channels.get(&envelope.channel) else {
            trace!(channel = %envelope.channel, "no subscribers, dropping signal");
            return Ok(());
        };
        // A send error only means every receiver has been dropped.
        if let Err(broadcast::error::SendError(envelope)) = sender.send(envelope) {
            trace!(channel = %envelope.channel, "no subscribers, dropping signal");
        }
        Ok(())
    }
}
