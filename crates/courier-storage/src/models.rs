// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage entities owned by this crate.
//!
//! Call and presence types live in `courier-core` because they cross trait
//! boundaries; they are re-exported here for convenience.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub use courier_core::types::{Call, CallParticipant, CallStatus, PresenceStatus, SystemMessage};

/// Status of a row in the `jobs` table. Completed jobs are deleted, not kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Dead,
}

/// A job as stored in the `jobs` table.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub id: i64,
    pub queue_name: String,
    pub dedupe_key: Option<String>,
    pub payload: String,
    pub status: JobStatus,
    /// Number of times the job has been claimed, including the current claim.
    pub attempts: u32,
    pub max_attempts: u32,
    /// Earliest time (epoch millis) the job may run.
    pub run_at: i64,
    pub locked_until: Option<i64>,
    pub locked_by: Option<String>,
    pub last_error: Option<String>,
    pub created_at: String,
}

/// Parameters for inserting a job.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub queue_name: String,
    pub payload: String,
    pub dedupe_key: Option<String>,
    pub run_at: i64,
    pub max_attempts: u32,
}

/// Result of an insert that may collide with an existing dedupe key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertedJob {
    pub id: i64,
    /// True if a job with the same dedupe key already existed and was returned instead.
    pub deduplicated: bool,
}

/// What happened to a job after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOutcome {
    /// Rescheduled for another attempt at `run_at`.
    Retrying { attempts: u32, run_at: i64 },
    /// Out of attempts; parked in the dead state.
    Dead { attempts: u32 },
    /// The job no longer exists or is not held (e.g. its lease was reclaimed).
    Missing,
}

/// Result of one claim pass over a queue.
#[derive(Debug, Clone, Default)]
pub struct Claim {
    /// The job now leased to the caller, if any was due.
    pub job: Option<JobRecord>,
    /// Jobs whose lease expired on their final attempt and were moved to
    /// the dead state during this pass.
    pub expired: Vec<ExpiredJob>,
}

/// A job buried because its holder vanished on the last attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiredJob {
    pub id: i64,
    pub attempts: u32,
    pub locked_by: Option<String>,
}

/// Count of jobs per queue and status, for operator visibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobCount {
    pub queue_name: String,
    pub status: JobStatus,
    pub count: i64,
}
