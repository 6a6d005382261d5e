// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable job queue and worker harness.
//!
//! [`JobQueue`] submits delayed, optionally de-duplicated jobs to the shared
//! SQLite job table. [`Worker`] pulls due jobs for one queue and runs them
//! through a [`JobHandler`] with bounded concurrency, an optional sliding
//! window rate limit, exponential backoff on failure, and a dead state after
//! the last attempt.
//!
//! Delivery is at-least-once. A job whose lease expires (its worker died) is
//! picked up again by any instance, so handlers must re-check persisted state
//! before mutating it.

pub mod backoff;
pub mod handler;
pub mod queue;
pub mod rate_limit;
pub mod recording;
pub mod worker;

pub use backoff::Backoff;
pub use handler::{JobContext, JobHandler};
pub use queue::{EnqueueOptions, JobEvent, JobHandle, JobQueue};
pub use rate_limit::{RateLimit, RateLimiter};
pub use worker::{Worker, WorkerHandle, WorkerOptions};
