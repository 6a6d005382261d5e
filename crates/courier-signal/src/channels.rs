// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel naming and event names.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Per-user lifecycle notifications: `call-events:<userId>`.
pub fn call_events(user_id: &str) -> String {
    format!("call-events:{user_id}")
}

/// Per-call WebRTC negotiation: `call-signaling:<callId>`.
pub fn call_signaling(call_id: &str) -> String {
    format!("call-signaling:{call_id}")
}

/// Per-conversation ephemeral indicators: `conversation-events:<conversationId>`.
pub fn conversation_events(conversation_id: &str) -> String {
    format!("conversation-events:{conversation_id}")
}

/// Call lifecycle events published on `call-events:<userId>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum CallEvent {
    CallRinging,
    CallAnswered,
    CallDeclined,
    CallEnded,
    CallMissed,
    CallFailed,
}

/// WebRTC negotiation message kinds relayed on `call-signaling:<callId>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
}

impl SignalKind {
    pub fn event(self) -> &'static str {
        match self {
            Self::Offer => "webrtc_offer",
            Self::Answer => "webrtc_answer",
            Self::IceCandidate => "webrtc_ice_candidate",
        }
    }
}

/// Bot indicators published on `conversation-events:<conversationId>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum IndicatorEvent {
    Nudge,
    TypingStart,
    TypingStop,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn channel_names() {
        assert_eq!(call_events("u1"), "call-events:u1");
        assert_eq!(call_signaling("c1"), "call-signaling:c1");
        assert_eq!(conversation_events("conv1"), "conversation-events:conv1");
    }

    #[test]
    fn event_names_are_snake_case() {
        let names: Vec<String> = CallEvent::iter().map(|e| e.to_string()).collect();
        assert_eq!(
            names,
            [
                "call_ringing",
                "call_answered",
                "call_declined",
                "call_ended",
                "call_missed",
                "call_failed"
            ]
        );
        assert_eq!(IndicatorEvent::TypingStart.as_ref(), "typing_start");
        assert_eq!(
            IndicatorEvent::from_str("nudge").unwrap(),
            IndicatorEvent::Nudge
        );
        assert_eq!(SignalKind::IceCandidate.event(), "webrtc_ice_candidate");
    }
}
