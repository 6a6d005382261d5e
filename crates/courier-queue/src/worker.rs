// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Worker pool for one queue.
//!
//! A single poll loop claims due jobs and spawns each onto a [`JoinSet`],
//! bounded by a semaphore sized to the configured concurrency. While a
//! handler runs, its lease is renewed every third of the lease period so a
//! slow job is never reclaimed by another instance. On shutdown the loop
//! stops claiming and waits for every in-flight job to finish.

use std::sync::Arc;
use std::time::{Duration, Instant};

use courier_config::model::{QueueConfig, WorkerConfig};
use courier_core::CourierError;
use courier_storage::database::now_ms;
use courier_storage::models::{ExpiredJob, FailOutcome, JobRecord};
use courier_storage::queries;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::backoff::Backoff;
use crate::handler::{JobContext, JobHandler};
use crate::queue::{JobEvent, JobQueue};
use crate::rate_limit::{RateLimit, RateLimiter};
use crate::recording;

/// Tuning for one worker pool.
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Written to `locked_by` on claimed jobs.
    pub worker_id: String,
    pub concurrency: usize,
    pub rate_limit: Option<RateLimit>,
    pub poll_interval: Duration,
    pub lease: Duration,
    pub backoff: Backoff,
}

impl WorkerOptions {
    pub fn from_config(instance_id: &str, worker: &WorkerConfig, queue: &QueueConfig) -> Self {
        Self {
            worker_id: instance_id.to_string(),
            concurrency: worker.concurrency,
            rate_limit: RateLimit::from_config(worker),
            poll_interval: queue.poll_interval(),
            lease: queue.lease(),
            backoff: Backoff::from_config(queue),
        }
    }
}

struct JobRunner<H> {
    queue: JobQueue,
    handler: Arc<H>,
    worker_id: String,
    backoff: Backoff,
    lease: Duration,
}

/// Pulls due jobs from one named queue and runs them through a handler.
pub struct Worker<H: JobHandler> {
    name: String,
    runner: Arc<JobRunner<H>>,
    options: WorkerOptions,
}

/// Running worker. Dropping it does not stop the worker; cancel the token
/// passed to [`Worker::spawn`] and then call [`WorkerHandle::drain`].
pub struct WorkerHandle {
    queue: String,
    join: JoinHandle<()>,
}

impl<H: JobHandler> Worker<H> {
    pub fn new(
        queue: JobQueue,
        name: impl Into<String>,
        handler: H,
        options: WorkerOptions,
    ) -> Self {
        let runner = JobRunner {
            queue,
            handler: Arc::new(handler),
            worker_id: options.worker_id.clone(),
            backoff: options.backoff,
            lease: options.lease,
        };
        Self {
            name: name.into(),
            runner: Arc::new(runner),
            options,
        }
    }

    /// Start pulling jobs until `shutdown` is cancelled.
    pub fn spawn(self, shutdown: CancellationToken) -> WorkerHandle {
        let queue = self.name.clone();
        let join = tokio::spawn(self.run(shutdown));
        WorkerHandle { queue, join }
    }

    async fn run(self, shutdown: CancellationToken) {
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let limiter = self.options.rate_limit.map(RateLimiter::new);
        let lease_ms = millis(self.options.lease);
        let mut in_flight: JoinSet<()> = JoinSet::new();

        info!(
            queue = %self.name,
            worker_id = %self.options.worker_id,
            concurrency = self.options.concurrency,
            rate_limited = limiter.is_some(),
            "worker started"
        );

        loop {
            while let Some(finished) = in_flight.try_join_next() {
                if let Err(e) = finished {
                    error!(queue = %self.name, error = %e, "job task panicked");
                }
            }

            let permit = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            if let Some(limiter) = &limiter {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = limiter.ready() => {}
                }
            }

            // Registered before the claim so an enqueue during it is not missed.
            let woken = self.runner.queue.wake().notified();
            tokio::pin!(woken);
            woken.as_mut().enable();

            let claimed = queries::jobs::claim_due(
                self.runner.queue.database(),
                &self.name,
                &self.options.worker_id,
                now_ms(),
                lease_ms,
            )
            .await
            .map(|claim| {
                for expired in &claim.expired {
                    self.runner.report_expired(&self.name, expired);
                }
                claim.job
            });

            match claimed {
                Ok(Some(job)) => {
                    if let Some(limiter) = &limiter {
                        limiter.record().await;
                    }
                    let runner = Arc::clone(&self.runner);
                    in_flight.spawn(async move {
                        runner.execute(job).await;
                        drop(permit);
                    });
                }
                Ok(None) => {
                    drop(permit);
                    tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => break,
                        _ = woken => {}
                        _ = tokio::time::sleep(self.options.poll_interval) => {}
                    }
                }
                Err(e) => {
                    drop(permit);
                    warn!(queue = %self.name, error = %e, "failed to claim job");
                    tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.options.poll_interval) => {}
                    }
                }
            }
        }

        info!(
            queue = %self.name,
            in_flight = in_flight.len(),
            "worker stopping, draining in-flight jobs"
        );
        while let Some(finished) = in_flight.join_next().await {
            if let Err(e) = finished {
                error!(queue = %self.name, error = %e, "job task panicked");
            }
        }
        info!(queue = %self.name, "worker stopped");
    }
}

impl<H: JobHandler> JobRunner<H> {
    async fn execute(&self, job: JobRecord) {
        let ctx = JobContext {
            job_id: job.id,
            queue: job.queue_name.clone(),
            attempt: job.attempts,
            max_attempts: job.max_attempts,
        };
        let span = info_span!(
            "job",
            queue = %ctx.queue,
            job_id = ctx.job_id,
            attempt = ctx.attempt
        );
        async {
            let payload = match serde_json::from_str::<H::Payload>(&job.payload) {
                Ok(payload) => payload,
                Err(e) => {
                    self.bury(&ctx, format!("invalid payload: {e}")).await;
                    return;
                }
            };

            let started = Instant::now();
            let result = self.handle_with_heartbeat(&ctx, payload).await;
            recording::record_duration(&ctx.queue, started.elapsed().as_secs_f64());

            match result {
                Ok(()) => self.complete(&ctx).await,
                Err(e) => self.retry_or_bury(&ctx, e).await,
            }
        }
        .instrument(span)
        .await
    }

    /// Run the handler, pushing the lease forward until it returns.
    async fn handle_with_heartbeat(
        &self,
        ctx: &JobContext,
        payload: H::Payload,
    ) -> Result<(), CourierError> {
        let period = (self.lease / 3).max(Duration::from_millis(1));
        let mut heartbeat = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let handled = self.handler.handle(ctx, payload);
        tokio::pin!(handled);
        loop {
            tokio::select! {
                result = &mut handled => return result,
                _ = heartbeat.tick() => self.renew_lease(ctx).await,
            }
        }
    }

    async fn renew_lease(&self, ctx: &JobContext) {
        let until = now_ms().saturating_add(millis(self.lease));
        match queries::jobs::extend_lease(self.queue.database(), ctx.job_id, &self.worker_id, until)
            .await
        {
            Ok(true) => debug!(locked_until = until, "job lease renewed"),
            Ok(false) => warn!("job lease was lost while the handler was running"),
            Err(e) => warn!(error = %e, "failed to renew job lease"),
        }
    }

    /// Surface a job the store buried because its holder never finished.
    fn report_expired(&self, queue: &str, expired: &ExpiredJob) {
        error!(
            queue,
            job_id = expired.id,
            attempts = expired.attempts,
            locked_by = expired.locked_by.as_deref().unwrap_or("-"),
            "job lease expired on last attempt, moved to dead"
        );
        recording::record_dead(queue);
        self.queue.emit(JobEvent::Failed {
            queue: queue.to_string(),
            job_id: expired.id,
            attempts: expired.attempts,
            error: queries::jobs::LEASE_EXPIRED.to_string(),
        });
    }

    async fn complete(&self, ctx: &JobContext) {
        match queries::jobs::complete(self.queue.database(), ctx.job_id, &self.worker_id).await {
            Ok(true) => {
                debug!("job completed");
                recording::record_completed(&ctx.queue);
                self.queue.emit(JobEvent::Completed {
                    queue: ctx.queue.clone(),
                    job_id: ctx.job_id,
                    attempts: ctx.attempt,
                });
            }
            Ok(false) => warn!("job lease was lost before completion"),
            Err(e) => error!(error = %e, "failed to acknowledge job, it will run again"),
        }
    }

    async fn retry_or_bury(&self, ctx: &JobContext, err: CourierError) {
        recording::record_failed(&ctx.queue);
        let retry_in = self.backoff.delay_for(ctx.attempt);
        let retry_at = now_ms().saturating_add(millis(retry_in));
        let message = err.to_string();

        let outcome = queries::jobs::fail(
            self.queue.database(),
            ctx.job_id,
            &self.worker_id,
            &message,
            retry_at,
        )
        .await;

        match outcome {
            Ok(FailOutcome::Retrying { attempts, .. }) => {
                warn!(
                    error = %message,
                    kind = ?err.kind(),
                    retry_in_ms = retry_in.as_millis() as u64,
                    "job failed, retrying"
                );
                self.queue.emit(JobEvent::Retrying {
                    queue: ctx.queue.clone(),
                    job_id: ctx.job_id,
                    attempt: attempts,
                    error: message,
                    retry_in,
                });
            }
            Ok(FailOutcome::Dead { attempts }) => {
                error!(error = %message, attempts, "job failed on last attempt, moved to dead");
                recording::record_dead(&ctx.queue);
                self.queue.emit(JobEvent::Failed {
                    queue: ctx.queue.clone(),
                    job_id: ctx.job_id,
                    attempts,
                    error: message,
                });
            }
            Ok(FailOutcome::Missing) => {
                warn!(error = %message, "job lease was lost before failure was recorded")
            }
            Err(e) => error!(error = %e, job_error = %message, "failed to record job failure"),
        }
    }

    async fn bury(&self, ctx: &JobContext, message: String) {
        let buried =
            queries::jobs::bury(self.queue.database(), ctx.job_id, &self.worker_id, &message).await;
        match buried {
            Ok(true) => {
                error!(error = %message, "job moved to dead");
                recording::record_dead(&ctx.queue);
                self.queue.emit(JobEvent::Failed {
                    queue: ctx.queue.clone(),
                    job_id: ctx.job_id,
                    attempts: ctx.attempt,
                    error: message,
                });
            }
            Ok(false) => warn!("job lease was lost before it could be buried"),
            Err(e) => error!(error = %e, "failed to bury job"),
        }
    }
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX / 4)
}

impl WorkerHandle {
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Wait for the worker to finish its in-flight jobs.
    ///
    /// Returns false if `timeout` elapsed first; the worker task is then
    /// aborted and its claimed jobs are reclaimed once their lease expires.
    pub async fn drain(mut self, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, &mut self.join).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!(queue = %self.queue, error = %e, "worker task failed");
                true
            }
            Err(_) => {
                warn!(
                    queue = %self.queue,
                    timeout_secs = timeout.as_secs(),
                    "worker drain timed out"
                );
                self.join.abort();
                false
            }
        }
    }
}
