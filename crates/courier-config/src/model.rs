// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Courier coordination layer.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Courier configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CourierConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Call/presence storage.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Durable job queue settings shared by all workers.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Per-queue worker pool settings.
    #[serde(default)]
    pub workers: WorkersConfig,

    /// Call lifecycle settings.
    #[serde(default)]
    pub calls: CallsConfig,

    /// Bot delivery settings.
    #[serde(default)]
    pub bot: BotConfig,

    /// Presence reconciler settings.
    #[serde(default)]
    pub presence: PresenceConfig,

    /// Signaling hub settings.
    #[serde(default)]
    pub signaling: SignalingConfig,
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Identifier of this backend instance, recorded as the lock holder.
    #[serde(default = "default_instance_id")]
    pub instance_id: String,

    /// Logging level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            instance_id: default_instance_id(),
            log_level: default_log_level(),
        }
    }
}

fn default_instance_id() -> String {
    format!("courier-{}", uuid::Uuid::new_v4())
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file shared by every instance.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// How long a writer waits on a lock held by another process.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("courier").join("courier.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("courier.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// Durable job queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Separate database for the queue. Defaults to `storage.database_path`.
    #[serde(default)]
    pub database_path: Option<String>,

    /// How often an idle worker polls for due jobs.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long a claimed job stays invisible before another instance may reclaim it.
    #[serde(default = "default_lease_secs")]
    pub lease_secs: u64,

    /// Attempts before a job is moved to the dead state.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First retry delay; doubles per attempt.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Upper bound on the retry delay.
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    /// How long shutdown waits for in-flight jobs.
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            poll_interval_ms: default_poll_interval_ms(),
            lease_secs: default_lease_secs(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            drain_timeout_secs: default_drain_timeout_secs(),
        }
    }
}

impl QueueConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn lease(&self) -> Duration {
        Duration::from_secs(self.lease_secs)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_lease_secs() -> u64 {
    300
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_backoff_max_ms() -> u64 {
    60_000
}

fn default_drain_timeout_secs() -> u64 {
    30
}

/// Worker pools for the two registered queues.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkersConfig {
    #[serde(default = "default_call_timeout_worker")]
    pub call_timeout: WorkerConfig,

    #[serde(default = "default_bot_response_worker")]
    pub bot_response: WorkerConfig,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            call_timeout: default_call_timeout_worker(),
            bot_response: default_bot_response_worker(),
        }
    }
}

/// Concurrency and rate limit for one worker pool.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    /// Maximum jobs executing at once in this process.
    pub concurrency: usize,

    /// Maximum jobs started per window. `None` disables rate limiting.
    #[serde(default)]
    pub rate_limit_max: Option<u32>,

    /// Rate limit window length.
    #[serde(default = "default_rate_limit_window_ms")]
    pub rate_limit_window_ms: u64,
}

fn default_call_timeout_worker() -> WorkerConfig {
    WorkerConfig {
        concurrency: 10,
        rate_limit_max: None,
        rate_limit_window_ms: default_rate_limit_window_ms(),
    }
}

fn default_bot_response_worker() -> WorkerConfig {
    WorkerConfig {
        concurrency: 100,
        rate_limit_max: Some(1000),
        rate_limit_window_ms: default_rate_limit_window_ms(),
    }
}

fn default_rate_limit_window_ms() -> u64 {
    60_000
}

/// Call lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CallsConfig {
    /// How long a call may ring before it is marked missed.
    #[serde(default = "default_call_timeout_secs")]
    pub timeout_secs: u64,

    /// Delete the pending timeout job once a call is answered, declined, or ended.
    #[serde(default = "default_cancel_timeout_on_resolve")]
    pub cancel_timeout_on_resolve: bool,
}

impl Default for CallsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_call_timeout_secs(),
            cancel_timeout_on_resolve: default_cancel_timeout_on_resolve(),
        }
    }
}

impl CallsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_call_timeout_secs() -> u64 {
    30
}

fn default_cancel_timeout_on_resolve() -> bool {
    true
}

/// Bot delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Pause between a nudge and the typing indicator that follows it.
    #[serde(default = "default_nudge_pause_ms")]
    pub nudge_pause_ms: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            nudge_pause_ms: default_nudge_pause_ms(),
        }
    }
}

impl BotConfig {
    pub fn nudge_pause(&self) -> Duration {
        Duration::from_millis(self.nudge_pause_ms)
    }
}

fn default_nudge_pause_ms() -> u64 {
    1500
}

/// Presence reconciler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PresenceConfig {
    /// Separate database for the lock table. Defaults to `storage.database_path`.
    #[serde(default)]
    pub lock_database_path: Option<String>,

    /// Lifetime of the offline-transition lock. Should exceed the expected
    /// spread in presence-event delivery across instances.
    #[serde(default = "default_lock_ttl_secs")]
    pub lock_ttl_secs: u64,

    /// Signaling channel carrying presence join/leave events.
    #[serde(default = "default_presence_channel")]
    pub channel: String,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            lock_database_path: None,
            lock_ttl_secs: default_lock_ttl_secs(),
            channel: default_presence_channel(),
        }
    }
}

impl PresenceConfig {
    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }
}

fn default_lock_ttl_secs() -> u64 {
    10
}

fn default_presence_channel() -> String {
    "presence".to_string()
}

/// In-process signaling hub configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SignalingConfig {
    /// Buffered events per channel before slow subscribers start lagging.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_channel_capacity() -> usize {
    64
}

impl CourierConfig {
    /// Database used by the job queue.
    pub fn queue_database_path(&self) -> &str {
        self.queue
            .database_path
            .as_deref()
            .unwrap_or(&self.storage.database_path)
    }

    /// Database used by the presence lock.
    pub fn lock_database_path(&self) -> &str {
        self.presence
            .lock_database_path
            .as_deref()
            .unwrap_or(&self.storage.database_path)
    }
}
