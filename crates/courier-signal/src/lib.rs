// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signaling relay for call lifecycle notifications, WebRTC negotiation,
//! and conversation indicators.
//!
//! Every publish is one ephemeral message on a named channel. Nothing is
//! persisted, and a channel with no subscribers silently drops the message.

pub mod channels;
pub mod hub;
pub mod relay;

pub use channels::{CallEvent, IndicatorEvent, SignalKind};
pub use hub::LocalHub;
pub use relay::SignalingRelay;
