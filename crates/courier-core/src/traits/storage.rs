// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage collaborator traits for call and presence state.

use async_trait::async_trait;

use crate::error::CourierError;
use crate::types::{Call, CallParticipant, CallStatus, CallUpdate, PresenceStatus, SystemMessage};

/// Persisted call state.
#[async_trait]
pub trait CallStore: Send + Sync + 'static {
    /// Fetch a call by id.
    async fn get_call(&self, call_id: &str) -> Result<Option<Call>, CourierError>;

    /// Atomically apply `update` if the stored status is one of `expected`.
    ///
    /// Implementations must perform the check and the write as one conditional
    /// write, never a read followed by a write. Returns the updated call, or
    /// `None` if the call does not exist or its status did not match.
    async fn update_call_status(
        &self,
        call_id: &str,
        expected: &[CallStatus],
        update: CallUpdate,
    ) -> Result<Option<Call>, CourierError>;

    /// Append a system message to a conversation.
    async fn insert_system_message(&self, message: &SystemMessage) -> Result<(), CourierError>;

    /// All participants of a call, including those who already left.
    async fn list_participants(&self, call_id: &str) -> Result<Vec<CallParticipant>, CourierError>;
}

/// Persisted user presence.
#[async_trait]
pub trait PresenceStore: Send + Sync + 'static {
    async fn set_user_presence(
        &self,
        user_id: &str,
        status: PresenceStatus,
    ) -> Result<(), CourierError>;
}
