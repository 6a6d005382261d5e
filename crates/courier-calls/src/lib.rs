// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call lifecycle management.
//!
//! [`CallManager`] drives the call state machine. Every transition is one
//! conditional write keyed by the expected current status, so concurrent
//! callers (a client answering while the timeout job fires) always resolve
//! to exactly one winner. The loser gets [`Transition::Stale`] and performs
//! no side effects.
//!
//! Side effects of a committed transition (participant notifications, the
//! missed-call system message) are best-effort: failures are logged and
//! never undo the transition.

pub mod manager;
pub mod timeout;

pub use manager::{CallManager, Transition};
pub use timeout::{
    CALL_TIMEOUT_QUEUE, CallTimeoutHandler, CallTimeoutJob, schedule_call_timeout, timeout_key,
};
