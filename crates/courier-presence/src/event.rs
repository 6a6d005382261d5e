// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Presence events as carried on the presence channel.

use courier_core::SignalEnvelope;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PresenceEvent {
    Join {
        #[serde(rename = "userId")]
        user_id: String,
    },
    Leave {
        #[serde(rename = "userId")]
        user_id: String,
    },
}

impl PresenceEvent {
    pub fn user_id(&self) -> &str {
        match self {
            Self::Join { user_id } | Self::Leave { user_id } => user_id,
        }
    }

    /// Decode an envelope whose event name is `join` or `leave` and whose
    /// payload carries `userId`. Anything else yields `None`.
    pub fn from_envelope(envelope: &SignalEnvelope) -> Option<Self> {
        let user_id = envelope.payload.get("userId")?.as_str()?.to_string();
        match envelope.event.as_str() {
            "join" => Some(Self::Join { user_id }),
            "leave" => Some(Self::Leave { user_id }),
            _ => None,
        }
    }

    /// Wrap as an envelope on `channel`.
    pub fn to_envelope(&self, channel: &str) -> SignalEnvelope {
        let event = match self {
            Self::Join { .. } => "join",
            Self::Leave { .. } => "leave",
        };
        SignalEnvelope::new(channel, event, json!({ "userId": self.user_id() }))
    }
}
