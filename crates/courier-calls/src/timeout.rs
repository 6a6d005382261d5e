// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The call-timeout job: payload, scheduling, and worker handler.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use courier_core::{Call, CallType, CourierError};
use courier_queue::{EnqueueOptions, JobContext, JobHandle, JobHandler, JobQueue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::manager::{CallManager, Transition};

/// Queue name for call-timeout jobs.
pub const CALL_TIMEOUT_QUEUE: &str = "call-timeout";

/// Payload of a call-timeout job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallTimeoutJob {
    pub call_id: String,
    pub conversation_id: String,
    pub initiator_id: String,
    pub call_type: CallType,
}

impl CallTimeoutJob {
    pub fn for_call(call: &Call) -> Self {
        Self {
            call_id: call.id.clone(),
            conversation_id: call.conversation_id.clone(),
            initiator_id: call.initiator_id.clone(),
            call_type: call.call_type,
        }
    }
}

/// Dedupe key for a call's timeout job. One timeout per call at most.
pub fn timeout_key(call_id: &str) -> String {
    format!("call-timeout:{call_id}")
}

/// Schedule the timeout for a call that just entered `ringing`.
///
/// Scheduling twice for the same call returns the existing job.
pub async fn schedule_call_timeout(
    queue: &JobQueue,
    call: &Call,
    delay: Duration,
) -> Result<JobHandle, CourierError> {
    let handle = queue
        .enqueue(
            CALL_TIMEOUT_QUEUE,
            &CallTimeoutJob::for_call(call),
            EnqueueOptions::default()
                .delay(delay)
                .dedupe_key(timeout_key(&call.id)),
        )
        .await?;
    debug!(
        call_id = %call.id,
        job_id = handle.id,
        delay_secs = delay.as_secs(),
        "call timeout scheduled"
    );
    Ok(handle)
}

/// Runs [`CallManager::timeout`] for each due job.
///
/// A stale precondition completes the job. Only a failed status write
/// returns an error, so the queue retries it.
pub struct CallTimeoutHandler {
    manager: Arc<CallManager>,
}

impl CallTimeoutHandler {
    pub fn new(manager: Arc<CallManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl JobHandler for CallTimeoutHandler {
    type Payload = CallTimeoutJob;

    async fn handle(&self, ctx: &JobContext, job: CallTimeoutJob) -> Result<(), CourierError> {
        match self.manager.timeout(&job.call_id).await? {
            Transition::Applied(_) => {
                debug!(call_id = %job.call_id, attempt = ctx.attempt, "call timed out");
            }
            Transition::Stale { current } => {
                debug!(call_id = %job.call_id, ?current, "timeout skipped, call already resolved");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_uses_camel_case() {
        let call = Call::ringing("c1", "conv1", "alice", CallType::Video);
        let value = serde_json::to_value(CallTimeoutJob::for_call(&call)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "callId": "c1",
                "conversationId": "conv1",
                "initiatorId": "alice",
                "callType": "video"
            })
        );
    }

    #[test]
    fn timeout_key_is_per_call() {
        assert_eq!(timeout_key("c1"), "call-timeout:c1");
        assert_ne!(timeout_key("c1"), timeout_key("c2"));
    }
}
