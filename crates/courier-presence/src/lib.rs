// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Presence reconciliation across backend instances.
//!
//! Every instance receives every presence event. For a leave, only the
//! instance that wins `presence:offline:<userId>` writes the offline status.
//! The lock is never released; its short TTL bounds how long a reconnecting
//! user's next leave can be suppressed.

pub mod event;
pub mod reconciler;
pub mod service;

pub use event::PresenceEvent;
pub use reconciler::{LeaveOutcome, PresenceReconciler, offline_lock_key};
pub use service::PresenceService;
