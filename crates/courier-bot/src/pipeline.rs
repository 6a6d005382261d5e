// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The bot-response job and its delivery steps.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use courier_config::model::BotConfig;
use courier_core::{BotMessage, CourierError, MessageSender};
use courier_queue::{EnqueueOptions, JobContext, JobHandle, JobHandler, JobQueue};
use courier_signal::{IndicatorEvent, SignalingRelay};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

/// Queue name for bot-response jobs.
pub const BOT_RESPONSE_QUEUE: &str = "bot-response";

/// Payload of a bot-response job. Produced upstream, delivered unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotResponseJob {
    pub bot_user_id: String,
    pub conversation_id: String,
    pub content: String,
    #[serde(default)]
    pub emoticons: Vec<String>,
    pub typing_duration_ms: u64,
    #[serde(default)]
    pub should_nudge: bool,
}

impl BotResponseJob {
    pub fn typing_duration(&self) -> Duration {
        Duration::from_millis(self.typing_duration_ms)
    }

    fn message(&self) -> BotMessage {
        BotMessage {
            bot_user_id: self.bot_user_id.clone(),
            conversation_id: self.conversation_id.clone(),
            content: self.content.clone(),
            emoticons: self.emoticons.clone(),
        }
    }
}

/// Result of a completed delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub message_id: String,
    /// False if the final typing-stop publish failed.
    pub typing_cleared: bool,
}

/// Runs the delivery steps for one job, strictly in order.
pub struct BotDeliveryPipeline {
    relay: SignalingRelay,
    sender: Arc<dyn MessageSender>,
    nudge_pause: Duration,
}

impl BotDeliveryPipeline {
    pub fn new(relay: SignalingRelay, sender: Arc<dyn MessageSender>, config: &BotConfig) -> Self {
        Self {
            relay,
            sender,
            nudge_pause: config.nudge_pause(),
        }
    }

    /// Deliver one bot reply.
    ///
    /// Any failure up to and including the message send aborts the rest and
    /// is returned so the job is retried. Once the message is sent, a failed
    /// typing-stop is only logged: retrying would send the message twice.
    ///
    /// The typing delay is a plain sleep. It is not raced against shutdown,
    /// so a job that reaches it always runs to the send.
    pub async fn deliver(&self, job: &BotResponseJob) -> Result<Delivery, CourierError> {
        if job.should_nudge {
            self.indicate(job, IndicatorEvent::Nudge).await?;
            tokio::time::sleep(self.nudge_pause).await;
        }

        self.indicate(job, IndicatorEvent::TypingStart).await?;
        tokio::time::sleep(job.typing_duration()).await;

        let message_id = self.sender.send_bot_message(&job.message()).await?;
        debug!(
            bot_user_id = %job.bot_user_id,
            conversation_id = %job.conversation_id,
            message_id = %message_id,
            "bot message sent"
        );

        let typing_cleared = match self.indicate(job, IndicatorEvent::TypingStop).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    bot_user_id = %job.bot_user_id,
                    conversation_id = %job.conversation_id,
                    error = %e,
                    "failed to clear typing indicator"
                );
                false
            }
        };

        Ok(Delivery {
            message_id,
            typing_cleared,
        })
    }

    async fn indicate(
        &self,
        job: &BotResponseJob,
        event: IndicatorEvent,
    ) -> Result<(), CourierError> {
        self.relay
            .indicate(
                &job.conversation_id,
                event.as_ref(),
                json!({
                    "userId": job.bot_user_id,
                    "conversationId": job.conversation_id,
                }),
            )
            .await
    }

    /// Submit a bot reply for delivery.
    pub async fn enqueue(
        queue: &JobQueue,
        job: &BotResponseJob,
    ) -> Result<JobHandle, CourierError> {
        queue
            .enqueue(BOT_RESPONSE_QUEUE, job, EnqueueOptions::default())
            .await
    }
}

/// Worker handler for the bot-response queue.
pub struct BotResponseHandler {
    pipeline: Arc<BotDeliveryPipeline>,
}

impl BotResponseHandler {
    pub fn new(pipeline: Arc<BotDeliveryPipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl JobHandler for BotResponseHandler {
    type Payload = BotResponseJob;

    async fn handle(&self, ctx: &JobContext, job: BotResponseJob) -> Result<(), CourierError> {
        let delivery = self.pipeline.deliver(&job).await?;
        info!(
            bot_user_id = %job.bot_user_id,
            conversation_id = %job.conversation_id,
            message_id = %delivery.message_id,
            attempt = ctx.attempt,
            "bot response delivered"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_test_utils::{EventLog, RecordingSender, RecordingTransport};
    use tokio::time::Instant;

    struct Fixture {
        log: EventLog,
        transport: Arc<RecordingTransport>,
        sender: Arc<RecordingSender>,
        pipeline: BotDeliveryPipeline,
    }

    fn fixture() -> Fixture {
        let log = EventLog::new();
        let transport = Arc::new(RecordingTransport::with_log(log.clone()));
        let sender = Arc::new(RecordingSender::with_log(log.clone()));
        let pipeline = BotDeliveryPipeline::new(
            SignalingRelay::new(transport.clone()),
            sender.clone(),
            &BotConfig::default(),
        );
        Fixture {
            log,
            transport,
            sender,
            pipeline,
        }
    }

    fn job(should_nudge: bool) -> BotResponseJob {
        BotResponseJob {
            bot_user_id: "bot-1".into(),
            conversation_id: "conv1".into(),
            content: "hello there".into(),
            emoticons: vec![":wave:".into()],
            typing_duration_ms: 2_000,
            should_nudge,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn nudge_precedes_typing_and_message() {
        let f = fixture();
        let start = Instant::now();
        let delivery = f.pipeline.deliver(&job(true)).await.unwrap();

        assert_eq!(delivery.message_id, "msg-1");
        assert!(delivery.typing_cleared);
        assert_eq!(
            f.log.names().await,
            ["nudge", "typing_start", "message", "typing_stop"]
        );

        let events = f.log.events().await;
        assert_eq!(events[0].at - start, Duration::ZERO);
        assert_eq!(events[1].at - start, Duration::from_millis(1_500));
        assert_eq!(events[2].at - start, Duration::from_millis(3_500));
        assert_eq!(events[3].at, events[2].at);
    }

    #[tokio::test(start_paused = true)]
    async fn without_nudge_typing_starts_immediately() {
        let f = fixture();
        let start = Instant::now();
        f.pipeline.deliver(&job(false)).await.unwrap();

        assert_eq!(
            f.log.names().await,
            ["typing_start", "message", "typing_stop"]
        );
        let events = f.log.events().await;
        assert_eq!(events[0].at - start, Duration::ZERO);
        assert_eq!(events[1].at - start, Duration::from_millis(2_000));
    }

    #[tokio::test(start_paused = true)]
    async fn indicators_use_conversation_channel() {
        let f = fixture();
        f.pipeline.deliver(&job(true)).await.unwrap();

        let published = f.transport.published().await;
        assert!(
            published
                .iter()
                .all(|e| e.channel == "conversation-events:conv1")
        );
        assert_eq!(published[0].payload["userId"], "bot-1");

        let sent = f.sender.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].content, "hello there");
        assert_eq!(sent[0].emoticons, [":wave:"]);
    }

    #[tokio::test(start_paused = true)]
    async fn typing_start_failure_aborts_before_send() {
        let f = fixture();
        f.transport.fail_all(true);

        let err = f.pipeline.deliver(&job(false)).await.unwrap_err();
        assert!(matches!(err, CourierError::Signal { .. }));
        assert!(f.sender.sent().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn send_failure_skips_typing_stop() {
        let f = fixture();
        f.sender.fail_next(1);

        assert!(f.pipeline.deliver(&job(false)).await.is_err());
        assert_eq!(f.log.names().await, ["typing_start"]);
    }

    #[tokio::test(start_paused = true)]
    async fn typing_stop_failure_is_not_an_error() {
        let log = EventLog::new();
        let transport = Arc::new(RecordingTransport::with_log(log.clone()));
        let pipeline = BotDeliveryPipeline::new(
            SignalingRelay::new(transport.clone()),
            Arc::new(RecordingSender::with_log(log.clone())),
            &BotConfig::default(),
        );

        let job = job(false);
        let run = pipeline.deliver(&job);
        tokio::pin!(run);
        // Break the transport while the pipeline is sleeping through the typing delay.
        tokio::select! {
            _ = &mut run => panic!("delivery finished before the typing delay"),
            _ = tokio::time::sleep(Duration::from_millis(1_000)) => {}
        }
        transport.fail_all(true);

        let delivery = run.await.unwrap();
        assert!(!delivery.typing_cleared);
        assert_eq!(log.names().await, ["typing_start", "message"]);
    }

    #[tokio::test(start_paused = true)]
    #[tracing_test::traced_test]
    async fn handler_logs_delivery() {
        let f = fixture();
        let handler = BotResponseHandler::new(Arc::new(f.pipeline));
        let ctx = JobContext {
            job_id: 9,
            queue: BOT_RESPONSE_QUEUE.into(),
            attempt: 1,
            max_attempts: 3,
        };
        handler.handle(&ctx, job(false)).await.unwrap();
        assert!(logs_contain("bot response delivered"));
        assert!(logs_contain("msg-1"));
    }

    #[test]
    fn payload_defaults_optional_fields() {
        let job: BotResponseJob = serde_json::from_value(json!({
            "botUserId": "bot-1",
            "conversationId": "conv1",
            "content": "hi",
            "typingDurationMs": 500
        }))
        .unwrap();
        assert!(!job.should_nudge);
        assert!(job.emoticons.is_empty());
        assert_eq!(job.typing_duration(), Duration::from_millis(500));
    }
}
