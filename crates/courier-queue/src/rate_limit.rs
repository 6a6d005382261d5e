// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sliding-window limit on job starts.

use std::collections::VecDeque;
use std::time::Duration;

use courier_config::model::WorkerConfig;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// At most `max` job starts in any `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub max: u32,
    pub window: Duration,
}

impl RateLimit {
    pub fn from_config(config: &WorkerConfig) -> Option<Self> {
        config.rate_limit_max.map(|max| Self {
            max,
            window: Duration::from_millis(config.rate_limit_window_ms),
        })
    }
}

/// Tracks start times within the current window.
///
/// Limits are per process: N instances admit up to N * `max` starts per window.
#[derive(Debug)]
pub struct RateLimiter {
    limit: RateLimit,
    starts: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(limit: RateLimit) -> Self {
        Self {
            limit,
            starts: Mutex::new(VecDeque::with_capacity(limit.max as usize)),
        }
    }

    /// Wait until a start would be admitted. Does not consume a slot.
    pub async fn ready(&self) {
        loop {
            let wait = {
                let mut starts = self.starts.lock().await;
                self.evict(&mut starts, Instant::now());
                if starts.len() < self.limit.max as usize {
                    return;
                }
                match starts.front() {
                    Some(oldest) => *oldest + self.limit.window,
                    None => return,
                }
            };
            tokio::time::sleep_until(wait).await;
        }
    }

    /// Record a start at the current instant.
    pub async fn record(&self) {
        let mut starts = self.starts.lock().await;
        starts.push_back(Instant::now());
    }

    /// Starts counted in the current window.
    pub async fn in_window(&self) -> usize {
        let mut starts = self.starts.lock().await;
        self.evict(&mut starts, Instant::now());
        starts.len()
    }

    fn evict(&self, starts: &mut VecDeque<Instant>, now: Instant) {
        while let Some(oldest) = starts.front() {
            if now.duration_since(*oldest) >= self.limit.window {
                starts.pop_front();
            } else {
                break;
            }
        }
    }
}
