// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Paced delivery of bot replies.
//!
//! Content is generated upstream; this crate only sequences its delivery so
//! the bot appears to type: optional nudge, typing indicator, a typing delay,
//! the message itself, then the typing indicator is cleared.

pub mod pipeline;

pub use pipeline::{
    BOT_RESPONSE_QUEUE, BotDeliveryPipeline, BotResponseHandler, BotResponseJob, Delivery,
};
