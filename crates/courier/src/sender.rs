// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message sender used by `courier serve`.

use async_trait::async_trait;
use courier_core::{BotMessage, CourierError, MessageSender};
use courier_signal::SignalingRelay;
use courier_signal::channels::conversation_events;
use serde_json::json;
use tracing::debug;

/// Publishes bot messages on the conversation's event channel.
///
/// Stands in for a messaging service: the message id is generated here and
/// nothing is persisted.
pub struct RelayMessageSender {
    relay: SignalingRelay,
}

impl RelayMessageSender {
    pub fn new(relay: SignalingRelay) -> Self {
        Self { relay }
    }
}

#[async_trait]
impl MessageSender for RelayMessageSender {
    async fn send_bot_message(&self, message: &BotMessage) -> Result<String, CourierError> {
        let message_id = uuid::Uuid::new_v4().to_string();
        self.relay
            .publish(
                &conversation_events(&message.conversation_id),
                "message",
                json!({
                    "messageId": message_id,
                    "senderId": message.bot_user_id,
                    "conversationId": message.conversation_id,
                    "content": message.content,
                    "emoticons": message.emoticons,
                }),
            )
            .await
            .map_err(|e| CourierError::Delivery {
                message: "bot message publish failed".to_string(),
                source: Some(Box::new(e)),
            })?;
        debug!(
            message_id = %message_id,
            conversation_id = %message.conversation_id,
            "bot message published"
        );
        Ok(message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use courier_test_utils::RecordingTransport;

    fn message() -> BotMessage {
        BotMessage {
            bot_user_id: "bot1".into(),
            conversation_id: "conv1".into(),
            content: "hello".into(),
            emoticons: vec!["wave".into()],
        }
    }

    #[tokio::test]
    async fn publishes_message_event() {
        let transport = Arc::new(RecordingTransport::new());
        let sender = RelayMessageSender::new(SignalingRelay::new(transport.clone()));

        let id = sender.send_bot_message(&message()).await.unwrap();

        let published = transport.published().await;
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].channel, "conversation-events:conv1");
        assert_eq!(published[0].event, "message");
        assert_eq!(published[0].payload["messageId"], id.as_str());
        assert_eq!(published[0].payload["senderId"], "bot1");
    }

    #[tokio::test]
    async fn transport_failure_is_delivery_error() {
        let transport = Arc::new(RecordingTransport::new());
        transport.fail_all(true);
        let sender = RelayMessageSender::new(SignalingRelay::new(transport));

        let err = sender.send_bot_message(&message()).await.unwrap_err();
        assert!(matches!(err, CourierError::Delivery { .. }));
    }
}
