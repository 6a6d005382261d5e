// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Courier realtime coordination layer.
//!
//! This crate provides the error type, the call/presence domain model, and the
//! collaborator traits (storage, lock, signaling transport, message delivery)
//! that the queue, call, bot, and presence crates are written against.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{CourierError, ErrorKind};
pub use types::{
    BotMessage, Call, CallParticipant, CallStatus, CallType, CallUpdate, PresenceStatus,
    SignalEnvelope, SystemMessage,
};

pub use traits::{CallStore, DistributedLock, MessageSender, PresenceStore, SignalTransport};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_follow_taxonomy() {
        let storage = CourierError::Storage {
            source: Box::new(std::io::Error::other("disk")),
        };
        assert_eq!(storage.kind(), ErrorKind::TransientInfra);

        let fan_out = CourierError::FanOut {
            failed: 1,
            total: 3,
            errors: vec!["call-events:u1: closed".into()],
        };
        assert_eq!(fan_out.kind(), ErrorKind::NonCritical);

        let internal = CourierError::Internal("boom".into());
        assert_eq!(internal.kind(), ErrorKind::FatalToJob);
    }

    #[test]
    fn all_traits_are_exported() {
        fn _assert_call_store<T: CallStore>() {}
        fn _assert_presence_store<T: PresenceStore>() {}
        fn _assert_lock<T: DistributedLock>() {}
        fn _assert_transport<T: SignalTransport>() {}
        fn _assert_sender<T: MessageSender>() {}
    }
}
