// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Publish and fan-out over a [`SignalTransport`].

use std::sync::Arc;

use courier_core::{CourierError, SignalEnvelope, SignalTransport};
use futures::future::join_all;
use serde_json::{Value, json};
use tracing::{debug, trace};

use crate::channels::{self, SignalKind};

/// Sends ephemeral events through the configured transport. Cheap to clone.
#[derive(Clone)]
pub struct SignalingRelay {
    transport: Arc<dyn SignalTransport>,
}

impl SignalingRelay {
    pub fn new(transport: Arc<dyn SignalTransport>) -> Self {
        Self { transport }
    }

    /// Send one event on one channel.
    pub async fn publish(
        &self,
        channel: &str,
        event: &str,
        payload: Value,
    ) -> Result<(), CourierError> {
        trace!(channel, event, "publishing signal");
        self.transport
            .publish(SignalEnvelope::new(channel, event, payload))
            .await
    }

    /// Publish the same event to every channel concurrently.
    ///
    /// All publishes are attempted even if some fail. Returns the number of
    /// channels published to, or [`CourierError::FanOut`] naming each
    /// failed channel.
    pub async fn fan_out<I>(
        &self,
        channels: I,
        event: &str,
        payload: &Value,
    ) -> Result<usize, CourierError>
    where
        I: IntoIterator<Item = String>,
    {
        let channels: Vec<String> = channels.into_iter().collect();
        let total = channels.len();
        let results = join_all(
            channels
                .iter()
                .map(|channel| self.publish(channel, event, payload.clone())),
        )
        .await;

        let errors: Vec<String> = channels
            .iter()
            .zip(results)
            .filter_map(|(channel, result)| result.err().map(|e| format!("{channel}: {e}")))
            .collect();

        if errors.is_empty() {
            debug!(event, total, "fan-out complete");
            Ok(total)
        } else {
            Err(CourierError::FanOut {
                failed: errors.len(),
                total,
                errors,
            })
        }
    }

    /// Fan out to each user's `call-events:<userId>` channel.
    pub async fn notify_users<'a, I>(
        &self,
        user_ids: I,
        event: &str,
        payload: &Value,
    ) -> Result<usize, CourierError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.fan_out(
            user_ids.into_iter().map(channels::call_events),
            event,
            payload,
        )
        .await
    }

    /// Relay an opaque WebRTC blob to the other side of a call.
    pub async fn relay_webrtc(
        &self,
        call_id: &str,
        from_user: &str,
        kind: SignalKind,
        data: Value,
    ) -> Result<(), CourierError> {
        self.publish(
            &channels::call_signaling(call_id),
            kind.event(),
            json!({
                "callId": call_id,
                "fromUserId": from_user,
                "data": data,
            }),
        )
        .await
    }

    /// Publish an indicator on `conversation-events:<conversationId>`.
    pub async fn indicate(
        &self,
        conversation_id: &str,
        event: &str,
        payload: Value,
    ) -> Result<(), CourierError> {
        self.publish(&channels::conversation_events(conversation_id), event, payload)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::ErrorKind;
    use courier_test_utils::RecordingTransport;

    fn relay() -> (SignalingRelay, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::new());
        (SignalingRelay::new(transport.clone()), transport)
    }

    #[tokio::test]
    async fn publish_wraps_envelope() {
        let (relay, transport) = relay();
        relay
            .publish("call-events:u1", "call_answered", json!({"callId": "c1"}))
            .await
            .unwrap();

        let published = transport.published().await;
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].channel, "call-events:u1");
        assert_eq!(published[0].event, "call_answered");
        assert_eq!(published[0].payload["callId"], "c1");
    }

    #[tokio::test]
    async fn fan_out_publishes_once_per_channel() {
        let (relay, transport) = relay();
        let sent = relay
            .notify_users(["u1", "u2", "u3"], "call_ended", &json!({}))
            .await
            .unwrap();
        assert_eq!(sent, 3);

        let mut channels = transport.channels_for("call_ended").await;
        channels.sort();
        assert_eq!(
            channels,
            ["call-events:u1", "call-events:u2", "call-events:u3"]
        );
    }

    #[tokio::test]
    async fn partial_failure_is_aggregated_after_all_attempts() {
        let (relay, transport) = relay();
        transport.fail_channel("call-events:u2").await;

        let err = relay
            .notify_users(["u1", "u2", "u3"], "call_missed", &json!({}))
            .await
            .unwrap_err();
        match &err {
            CourierError::FanOut {
                failed,
                total,
                errors,
            } => {
                assert_eq!((*failed, *total), (1, 3));
                assert!(errors[0].starts_with("call-events:u2"));
            }
            other => panic!("expected FanOut, got {other:?}"),
        }
        assert_eq!(err.kind(), ErrorKind::NonCritical);
        assert_eq!(transport.attempted_channels().await.len(), 3);
        assert_eq!(transport.count().await, 2);
    }

    #[tokio::test]
    async fn empty_fan_out_succeeds() {
        let (relay, transport) = relay();
        let sent = relay
            .fan_out(Vec::<String>::new(), "call_missed", &json!({}))
            .await
            .unwrap();
        assert_eq!(sent, 0);
        assert_eq!(transport.count().await, 0);
    }

    #[tokio::test]
    async fn webrtc_is_scoped_to_call_channel() {
        let (relay, transport) = relay();
        relay
            .relay_webrtc("c1", "alice", SignalKind::Offer, json!({"sdp": "v=0"}))
            .await
            .unwrap();
        relay
            .relay_webrtc("c2", "bob", SignalKind::IceCandidate, json!({"candidate": "x"}))
            .await
            .unwrap();

        let published = transport.published().await;
        assert_eq!(published[0].channel, "call-signaling:c1");
        assert_eq!(published[0].event, "webrtc_offer");
        assert_eq!(published[0].payload["fromUserId"], "alice");
        assert_eq!(published[0].payload["data"]["sdp"], "v=0");
        assert_eq!(published[1].channel, "call-signaling:c2");
        assert_eq!(published[1].event, "webrtc_ice_candidate");
    }
}
