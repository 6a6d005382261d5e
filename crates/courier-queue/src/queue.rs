// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job submission, cancellation, and lifecycle events.

use std::sync::Arc;
use std::time::Duration;

use courier_config::model::QueueConfig;
use courier_core::CourierError;
use courier_storage::database::now_ms;
use courier_storage::models::{JobCount, JobRecord, NewJob};
use courier_storage::{Database, queries};
use serde::Serialize;
use tokio::sync::{Notify, broadcast};
use tracing::debug;

const EVENT_CAPACITY: usize = 256;

/// Options for [`JobQueue::enqueue`].
#[derive(Debug, Clone, Default)]
pub struct EnqueueOptions {
    /// Earliest time the job may run, relative to now.
    pub delay: Option<Duration>,
    /// At most one job per key and queue exists at a time.
    pub dedupe_key: Option<String>,
    /// Overrides `queue.max_attempts`.
    pub max_attempts: Option<u32>,
}

impl EnqueueOptions {
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn dedupe_key(mut self, key: impl Into<String>) -> Self {
        self.dedupe_key = Some(key.into());
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }
}

/// Identity of a submitted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub id: i64,
    pub queue: String,
    /// True if an existing job with the same dedupe key was returned instead.
    pub deduplicated: bool,
}

/// Lifecycle notifications emitted by workers in this process.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Completed {
        queue: String,
        job_id: i64,
        attempts: u32,
    },
    Retrying {
        queue: String,
        job_id: i64,
        attempt: u32,
        error: String,
        retry_in: Duration,
    },
    /// The job ran out of attempts (or had an unreadable payload) and is now dead.
    Failed {
        queue: String,
        job_id: i64,
        attempts: u32,
        error: String,
    },
}

/// Handle to the shared job table. Cheap to clone.
#[derive(Clone)]
pub struct JobQueue {
    db: Database,
    max_attempts: u32,
    events: broadcast::Sender<JobEvent>,
    wake: Arc<Notify>,
}

impl JobQueue {
    pub fn new(db: Database, config: &QueueConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            db,
            max_attempts: config.max_attempts,
            events,
            wake: Arc::new(Notify::new()),
        }
    }

    /// Submit a job. The payload is stored as JSON.
    pub async fn enqueue<P: Serialize>(
        &self,
        queue: &str,
        payload: &P,
        options: EnqueueOptions,
    ) -> Result<JobHandle, CourierError> {
        let payload = serde_json::to_string(payload)?;
        let delay_ms = options
            .delay
            .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX / 2));
        let inserted = queries::jobs::insert(
            &self.db,
            NewJob {
                queue_name: queue.to_string(),
                payload,
                dedupe_key: options.dedupe_key,
                run_at: now_ms().saturating_add(delay_ms),
                max_attempts: options.max_attempts.unwrap_or(self.max_attempts),
            },
        )
        .await?;

        debug!(
            queue,
            job_id = inserted.id,
            delay_ms,
            deduplicated = inserted.deduplicated,
            "job enqueued"
        );
        if delay_ms == 0 && !inserted.deduplicated {
            self.wake.notify_waiters();
        }
        Ok(JobHandle {
            id: inserted.id,
            queue: queue.to_string(),
            deduplicated: inserted.deduplicated,
        })
    }

    /// Delete a job that has not started yet. Returns false if it already ran,
    /// is running, or never existed. Never interrupts a running handler.
    pub async fn cancel_by_key(&self, queue: &str, dedupe_key: &str) -> Result<bool, CourierError> {
        let cancelled = queries::jobs::cancel_pending_by_key(&self.db, queue, dedupe_key).await?;
        debug!(queue, dedupe_key, cancelled, "job cancel requested");
        Ok(cancelled)
    }

    /// Receive lifecycle events from workers running in this process.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events.subscribe()
    }

    pub async fn get(&self, id: i64) -> Result<Option<JobRecord>, CourierError> {
        queries::jobs::get(&self.db, id).await
    }

    /// Job counts grouped by queue and status.
    pub async fn stats(&self) -> Result<Vec<JobCount>, CourierError> {
        queries::jobs::count_by_status(&self.db).await
    }

    /// Dead jobs in `queue`, newest first.
    pub async fn dead_jobs(&self, queue: &str, limit: i64) -> Result<Vec<JobRecord>, CourierError> {
        queries::jobs::list_dead(&self.db, queue, limit).await
    }

    /// Put a dead job back in line with a fresh attempt budget.
    pub async fn retry_dead(&self, id: i64) -> Result<bool, CourierError> {
        let revived = queries::jobs::revive(&self.db, id, now_ms()).await?;
        if revived {
            self.wake.notify_waiters();
        }
        Ok(revived)
    }

    pub(crate) fn database(&self) -> &Database {
        &self.db
    }

    pub(crate) fn emit(&self, event: JobEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub(crate) fn wake(&self) -> &Notify {
        &self.wake
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    async fn setup_queue() -> (JobQueue, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("q.db").to_str().unwrap())
            .await
            .unwrap();
        (JobQueue::new(db, &QueueConfig::default()), dir)
    }

    #[tokio::test]
    async fn enqueue_applies_delay_and_default_attempts() {
        let (queue, _dir) = setup_queue().await;
        let before = now_ms();
        let handle = queue
            .enqueue(
                "call-timeout",
                &json!({"callId": "c1"}),
                EnqueueOptions::default().delay(Duration::from_secs(30)),
            )
            .await
            .unwrap();
        assert!(!handle.deduplicated);

        let job = queue.get(handle.id).await.unwrap().unwrap();
        assert!(job.run_at >= before + 30_000);
        assert_eq!(job.max_attempts, 3);
        assert_eq!(job.payload, r#"{"callId":"c1"}"#);
    }

    #[tokio::test]
    async fn duplicate_key_returns_same_handle() {
        let (queue, _dir) = setup_queue().await;
        let options = EnqueueOptions::default().dedupe_key("call-timeout:c1");
        let first = queue
            .enqueue("call-timeout", &json!({}), options.clone())
            .await
            .unwrap();
        let second = queue
            .enqueue("call-timeout", &json!({}), options)
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert!(second.deduplicated);
    }

    #[tokio::test]
    async fn cancel_by_key_removes_pending_job() {
        let (queue, _dir) = setup_queue().await;
        let handle = queue
            .enqueue(
                "call-timeout",
                &json!({}),
                EnqueueOptions::default()
                    .dedupe_key("call-timeout:c1")
                    .delay(Duration::from_secs(30)),
            )
            .await
            .unwrap();
        assert!(queue.cancel_by_key("call-timeout", "call-timeout:c1").await.unwrap());
        assert!(queue.get(handle.id).await.unwrap().is_none());
        assert!(!queue.cancel_by_key("call-timeout", "call-timeout:c1").await.unwrap());
    }

    #[tokio::test]
    async fn max_attempts_override_is_stored() {
        let (queue, _dir) = setup_queue().await;
        let handle = queue
            .enqueue("q", &json!({}), EnqueueOptions::default().max_attempts(7))
            .await
            .unwrap();
        assert_eq!(queue.get(handle.id).await.unwrap().unwrap().max_attempts, 7);
    }
}
