// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Courier crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Lifecycle status of a call.
///
/// `Ringing` is the only initial state. `Active` is the only other live
/// state. Every other status is terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Ringing,
    Active,
    Declined,
    Missed,
    Ended,
    Failed,
}

impl CallStatus {
    /// Returns true for statuses that can never change again.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Ringing | Self::Active)
    }

    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition_to(self, next: CallStatus) -> bool {
        use CallStatus::*;
        matches!(
            (self, next),
            (Ringing, Active | Declined | Missed | Ended | Failed) | (Active, Ended | Failed)
        )
    }
}

/// Media type of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CallType {
    Voice,
    Video,
}

/// A voice or video call between members of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    pub id: String,
    pub conversation_id: String,
    pub initiator_id: String,
    pub call_type: CallType,
    pub status: CallStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub error_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Call {
    /// A freshly initiated call in the `Ringing` state.
    pub fn ringing(
        id: impl Into<String>,
        conversation_id: impl Into<String>,
        initiator_id: impl Into<String>,
        call_type: CallType,
    ) -> Self {
        Self {
            id: id.into(),
            conversation_id: conversation_id.into(),
            initiator_id: initiator_id.into(),
            call_type,
            status: CallStatus::Ringing,
            started_at: None,
            ended_at: None,
            error_reason: None,
            created_at: Utc::now(),
        }
    }

    /// Whole seconds between `started_at` and `ended_at`, or 0 if the call never started.
    pub fn duration_seconds(&self) -> i64 {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => (end - start).num_seconds().max(0),
            _ => 0,
        }
    }
}

/// Fields written by a conditional status update.
///
/// `None` leaves the stored value untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct CallUpdate {
    pub status: CallStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub error_reason: Option<String>,
}

impl CallUpdate {
    /// An update that only changes the status.
    pub fn status(status: CallStatus) -> Self {
        Self {
            status,
            started_at: None,
            ended_at: None,
            error_reason: None,
        }
    }

    pub fn started_at(mut self, at: DateTime<Utc>) -> Self {
        self.started_at = Some(at);
        self
    }

    pub fn ended_at(mut self, at: DateTime<Utc>) -> Self {
        self.ended_at = Some(at);
        self
    }

    pub fn error_reason(mut self, reason: impl Into<String>) -> Self {
        self.error_reason = Some(reason.into());
        self
    }
}

/// Membership of a user in a call. Participants with `left_at` set receive no events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallParticipant {
    pub call_id: String,
    pub user_id: String,
    pub joined_at: DateTime<Utc>,
    pub left_at: Option<DateTime<Utc>>,
}

impl CallParticipant {
    pub fn is_present(&self) -> bool {
        self.left_at.is_none()
    }
}

/// A system-authored message appended to a conversation (e.g. "Missed voice call").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemMessage {
    pub conversation_id: String,
    pub content: String,
    pub metadata: serde_json::Value,
}

/// A bot-authored message handed to the messaging collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotMessage {
    pub bot_user_id: String,
    pub conversation_id: String,
    pub content: String,
    #[serde(default)]
    pub emoticons: Vec<String>,
}

/// Online state of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    Online,
    Offline,
}

/// One ephemeral event on a named signaling channel. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalEnvelope {
    pub channel: String,
    pub event: String,
    pub payload: serde_json::Value,
    pub sent_at: DateTime<Utc>,
}

impl SignalEnvelope {
    pub fn new(
        channel: impl Into<String>,
        event: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            channel: channel.into(),
            event: event.into(),
            payload,
            sent_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    fn any_status() -> impl Strategy<Value = CallStatus> {
        prop::sample::select(CallStatus::iter().collect::<Vec<_>>())
    }

    proptest! {
        #[test]
        fn terminal_statuses_never_transition(from in any_status(), to in any_status()) {
            if from.is_terminal() {
                prop_assert!(!from.can_transition_to(to));
            }
        }

        #[test]
        fn transitions_never_return_to_ringing(from in any_status()) {
            prop_assert!(!from.can_transition_to(CallStatus::Ringing));
        }
    }

    #[test]
    fn ringing_resolves_to_every_outcome() {
        for next in [
            CallStatus::Active,
            CallStatus::Declined,
            CallStatus::Missed,
            CallStatus::Ended,
            CallStatus::Failed,
        ] {
            assert!(CallStatus::Ringing.can_transition_to(next), "{next}");
        }
        assert!(CallStatus::Active.can_transition_to(CallStatus::Ended));
        assert!(!CallStatus::Active.can_transition_to(CallStatus::Missed));
    }

    #[test]
    fn status_strings_are_snake_case() {
        assert_eq!(CallStatus::Missed.to_string(), "missed");
        assert_eq!(CallStatus::from_str("active").unwrap(), CallStatus::Active);
        assert_eq!(
            serde_json::to_string(&CallType::Video).unwrap(),
            "\"video\""
        );
    }

    #[test]
    fn duration_is_zero_without_start() {
        let mut call = Call::ringing("c1", "conv1", "u1", CallType::Voice);
        call.ended_at = Some(Utc::now());
        assert_eq!(call.duration_seconds(), 0);

        let start = Utc::now();
        call.started_at = Some(start);
        call.ended_at = Some(start + chrono::Duration::seconds(42));
        assert_eq!(call.duration_seconds(), 42);
    }
}
