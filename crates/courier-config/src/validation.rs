// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::{CourierConfig, WorkerConfig};

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every problem instead of stopping at the first.
pub fn validate_config(config: &CourierConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.service.instance_id.trim().is_empty() {
        fail("service.instance_id must not be empty".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }
    if let Some(path) = &config.queue.database_path
        && path.trim().is_empty()
    {
        fail("queue.database_path must not be empty when set".to_string());
    }
    if let Some(path) = &config.presence.lock_database_path
        && path.trim().is_empty()
    {
        fail("presence.lock_database_path must not be empty when set".to_string());
    }

    if config.queue.max_attempts < 1 {
        fail("queue.max_attempts must be at least 1".to_string());
    }
    if config.queue.poll_interval_ms == 0 {
        fail("queue.poll_interval_ms must be greater than 0".to_string());
    }
    if config.queue.lease_secs == 0 {
        fail("queue.lease_secs must be greater than 0".to_string());
    }
    if config.queue.backoff_base_ms > config.queue.backoff_max_ms {
        fail(format!(
            "queue.backoff_base_ms ({}) must not exceed queue.backoff_max_ms ({})",
            config.queue.backoff_base_ms, config.queue.backoff_max_ms
        ));
    }

    for (name, worker) in [
        ("call_timeout", &config.workers.call_timeout),
        ("bot_response", &config.workers.bot_response),
    ] {
        for message in validate_worker(name, worker) {
            fail(message);
        }
    }

    if config.calls.timeout_secs == 0 {
        fail("calls.timeout_secs must be greater than 0".to_string());
    }

    if config.presence.lock_ttl_secs < 1 {
        fail("presence.lock_ttl_secs must be at least 1".to_string());
    }
    if config.presence.channel.trim().is_empty() {
        fail("presence.channel must not be empty".to_string());
    }

    if config.signaling.channel_capacity == 0 {
        fail("signaling.channel_capacity must be greater than 0".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_worker(name: &str, worker: &WorkerConfig) -> Vec<String> {
    let mut messages = Vec::new();
    if worker.concurrency < 1 {
        messages.push(format!("workers.{name}.concurrency must be at least 1"));
    }
    if let Some(max) = worker.rate_limit_max {
        if max < 1 {
            messages.push(format!("workers.{name}.rate_limit_max must be at least 1"));
        }
        if worker.rate_limit_window_ms == 0 {
            messages.push(format!(
                "workers.{name}.rate_limit_window_ms must be greater than 0 when rate limiting"
            ));
        }
    }
    messages
}
