// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The seam between the worker harness and job-specific logic.

use async_trait::async_trait;
use courier_core::CourierError;
use serde::de::DeserializeOwned;

/// Metadata about the attempt being executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobContext {
    pub job_id: i64,
    pub queue: String,
    /// 1-based attempt number, including this one.
    pub attempt: u32,
    pub max_attempts: u32,
}

impl JobContext {
    pub fn is_last_attempt(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}

/// Processes jobs from one queue.
///
/// Returning `Err` schedules a retry (or dead-letters the job on its last
/// attempt). A payload that fails to deserialize is dead-lettered without
/// calling the handler.
#[async_trait]
pub trait JobHandler: Send + Sync + 'static {
    type Payload: DeserializeOwned + Send + 'static;

    async fn handle(&self, ctx: &JobContext, payload: Self::Payload) -> Result<(), CourierError>;
}
