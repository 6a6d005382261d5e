// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The call state machine.

use std::sync::Arc;

use chrono::Utc;
use courier_config::model::CallsConfig;
use courier_core::types::CallUpdate;
use courier_core::{Call, CallStatus, CallStore, CallType, CourierError, SystemMessage};
use courier_queue::{JobHandle, JobQueue};
use courier_signal::{CallEvent, SignalingRelay};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::timeout::{CALL_TIMEOUT_QUEUE, schedule_call_timeout, timeout_key};

/// Outcome of a state-machine operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The status write committed; holds the call as written.
    Applied(Call),
    /// The precondition did not hold. `current` is the status observed
    /// afterwards, or `None` if the call does not exist.
    Stale { current: Option<CallStatus> },
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn call(&self) -> Option<&Call> {
        match self {
            Self::Applied(call) => Some(call),
            Self::Stale { .. } => None,
        }
    }
}

/// Drives call status transitions and their notifications.
pub struct CallManager {
    store: Arc<dyn CallStore>,
    relay: SignalingRelay,
    queue: Option<JobQueue>,
    config: CallsConfig,
}

impl CallManager {
    pub fn new(store: Arc<dyn CallStore>, relay: SignalingRelay, config: CallsConfig) -> Self {
        Self {
            store,
            relay,
            queue: None,
            config,
        }
    }

    /// Attach the job queue used to schedule and cancel timeout jobs.
    pub fn with_queue(mut self, queue: JobQueue) -> Self {
        self.queue = Some(queue);
        self
    }

    /// `ringing -> active`. Notifies participants with `call_answered`.
    pub async fn answer(&self, call_id: &str) -> Result<Transition, CourierError> {
        let now = Utc::now();
        let transition = self
            .transition(
                call_id,
                &[CallStatus::Ringing],
                CallUpdate::status(CallStatus::Active).started_at(now),
            )
            .await?;
        if let Transition::Applied(call) = &transition {
            self.cancel_timeout(call).await;
            self.notify(call, CallEvent::CallAnswered, json!({ "startedAt": call.started_at }))
                .await;
        }
        Ok(transition)
    }

    /// `ringing -> declined`. Notifies participants with `call_declined`.
    pub async fn decline(&self, call_id: &str) -> Result<Transition, CourierError> {
        let transition = self
            .transition(
                call_id,
                &[CallStatus::Ringing],
                CallUpdate::status(CallStatus::Declined),
            )
            .await?;
        if let Transition::Applied(call) = &transition {
            self.cancel_timeout(call).await;
            self.notify(call, CallEvent::CallDeclined, json!({})).await;
        }
        Ok(transition)
    }

    /// `active | ringing -> ended`. Ending a ringing call is an initiator-side
    /// cancel and reports a duration of zero.
    pub async fn end(&self, call_id: &str) -> Result<Transition, CourierError> {
        let transition = self
            .transition(
                call_id,
                &[CallStatus::Active, CallStatus::Ringing],
                CallUpdate::status(CallStatus::Ended).ended_at(Utc::now()),
            )
            .await?;
        if let Transition::Applied(call) = &transition {
            self.cancel_timeout(call).await;
            self.notify(
                call,
                CallEvent::CallEnded,
                json!({
                    "endedAt": call.ended_at,
                    "durationSeconds": call.duration_seconds(),
                }),
            )
            .await;
        }
        Ok(transition)
    }

    /// `ringing -> missed`, run by the call-timeout worker.
    ///
    /// On success a "Missed voice/video call" system message is appended to
    /// the conversation and participants still in the call get `call_missed`.
    /// A call that is no longer ringing, or does not exist, is left alone.
    pub async fn timeout(&self, call_id: &str) -> Result<Transition, CourierError> {
        let transition = self
            .transition(
                call_id,
                &[CallStatus::Ringing],
                CallUpdate::status(CallStatus::Missed).ended_at(Utc::now()),
            )
            .await?;
        if let Transition::Applied(call) = &transition {
            self.record_missed_call(call).await;
            self.notify(call, CallEvent::CallMissed, json!({ "endedAt": call.ended_at }))
                .await;
        }
        Ok(transition)
    }

    /// Any live status `-> failed`, recording `reason`.
    pub async fn fail(&self, call_id: &str, reason: &str) -> Result<Transition, CourierError> {
        let transition = self
            .transition(
                call_id,
                &[CallStatus::Ringing, CallStatus::Active],
                CallUpdate::status(CallStatus::Failed)
                    .ended_at(Utc::now())
                    .error_reason(reason),
            )
            .await?;
        if let Transition::Applied(call) = &transition {
            self.cancel_timeout(call).await;
            self.notify(call, CallEvent::CallFailed, json!({ "reason": reason }))
                .await;
        }
        Ok(transition)
    }

    /// Tell every participant except the initiator that `call` is ringing.
    ///
    /// Returns the number of users notified.
    pub async fn announce_ringing(&self, call: &Call) -> Result<usize, CourierError> {
        let recipients: Vec<String> = self
            .store
            .list_participants(&call.id)
            .await?
            .into_iter()
            .filter(|p| p.is_present() && p.user_id != call.initiator_id)
            .map(|p| p.user_id)
            .collect();
        self.relay
            .notify_users(
                recipients.iter().map(String::as_str),
                CallEvent::CallRinging.as_ref(),
                &event_payload(call, json!({})),
            )
            .await
    }

    /// Schedule the timeout job for a newly ringing call using `calls.timeout_secs`.
    pub async fn schedule_timeout(&self, call: &Call) -> Result<JobHandle, CourierError> {
        let queue = self.queue.as_ref().ok_or_else(|| CourierError::Queue {
            message: "call manager has no job queue attached".into(),
            source: None,
        })?;
        schedule_call_timeout(queue, call, self.config.timeout()).await
    }

    async fn transition(
        &self,
        call_id: &str,
        expected: &[CallStatus],
        update: CallUpdate,
    ) -> Result<Transition, CourierError> {
        let next = update.status;
        match self.store.update_call_status(call_id, expected, update).await? {
            Some(call) => {
                info!(call_id, status = %call.status, "call transitioned");
                Ok(Transition::Applied(call))
            }
            None => {
                let current = self.current_status(call_id).await;
                debug!(call_id, ?current, target = %next, "stale call transition ignored");
                Ok(Transition::Stale { current })
            }
        }
    }

    async fn current_status(&self, call_id: &str) -> Option<CallStatus> {
        match self.store.get_call(call_id).await {
            Ok(call) => call.map(|c| c.status),
            Err(e) => {
                warn!(call_id, error = %e, "failed to read call after stale transition");
                None
            }
        }
    }

    async fn notify(&self, call: &Call, event: CallEvent, extra: Value) {
        let participants = match self.store.list_participants(&call.id).await {
            Ok(participants) => participants,
            Err(e) => {
                warn!(
                    call_id = %call.id,
                    %event,
                    error = %e,
                    "failed to list participants, skipping notification"
                );
                return;
            }
        };
        let present: Vec<String> = participants
            .into_iter()
            .filter(|p| p.is_present())
            .map(|p| p.user_id)
            .collect();

        let payload = event_payload(call, extra);
        if let Err(e) = self
            .relay
            .notify_users(present.iter().map(String::as_str), event.as_ref(), &payload)
            .await
        {
            warn!(call_id = %call.id, %event, error = %e, "call notification incomplete");
        }
    }

    async fn record_missed_call(&self, call: &Call) {
        let message = SystemMessage {
            conversation_id: call.conversation_id.clone(),
            content: missed_call_text(call.call_type).to_string(),
            metadata: json!({
                "type": "call_missed",
                "callId": call.id,
                "callType": call.call_type,
                "initiatorId": call.initiator_id,
            }),
        };
        if let Err(e) = self.store.insert_system_message(&message).await {
            warn!(call_id = %call.id, error = %e, "failed to record missed call message");
        }
    }

    async fn cancel_timeout(&self, call: &Call) {
        if !self.config.cancel_timeout_on_resolve {
            return;
        }
        let Some(queue) = &self.queue else {
            return;
        };
        match queue.cancel_by_key(CALL_TIMEOUT_QUEUE, &timeout_key(&call.id)).await {
            Ok(cancelled) => debug!(call_id = %call.id, cancelled, "timeout job cleanup"),
            Err(e) => warn!(call_id = %call.id, error = %e, "failed to cancel timeout job"),
        }
    }
}

fn missed_call_text(call_type: CallType) -> &'static str {
    match call_type {
        CallType::Voice => "Missed voice call",
        CallType::Video => "Missed video call",
    }
}

/// Common fields of every call event, merged with event-specific `extra`.
fn event_payload(call: &Call, extra: Value) -> Value {
    let mut payload = json!({
        "callId": call.id,
        "conversationId": call.conversation_id,
        "initiatorId": call.initiator_id,
        "callType": call.call_type,
        "status": call.status,
    });
    if let (Some(base), Value::Object(extra)) = (payload.as_object_mut(), extra) {
        base.extend(extra);
    }
    payload
}
