// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messaging collaborator trait.

use async_trait::async_trait;

use crate::error::CourierError;
use crate::types::BotMessage;

/// Persists a message and broadcasts it to the conversation.
#[async_trait]
pub trait MessageSender: Send + Sync + 'static {
    /// Returns the id of the stored message.
    async fn send_bot_message(&self, message: &BotMessage) -> Result<String, CourierError>;
}
