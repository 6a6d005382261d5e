// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Courier coordination layer.

use thiserror::Error;

/// The primary error type used across all Courier crates.
///
/// A precondition that no longer holds (a call already answered when its
/// timeout fires) is not an error; see `Transition::Stale` in `courier-calls`.
#[derive(Debug, Error)]
pub enum CourierError {
    /// Configuration errors (invalid TOML, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Job queue errors (enqueue, claim, ack).
    #[error("queue error: {message}")]
    Queue {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A single publish on the signaling transport failed.
    #[error("signal error: {message}")]
    Signal {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Some publishes of a fan-out failed.
    #[error("fan-out failed for {failed} of {total} channels: {}", errors.join("; "))]
    FanOut {
        failed: usize,
        total: usize,
        errors: Vec<String>,
    },

    /// The messaging collaborator failed to persist or broadcast a message.
    #[error("delivery error: {message}")]
    Delivery {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Payload (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A referenced entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// How a failure should be treated by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connectivity to storage, queue, or signaling failed. Retried by queue backoff.
    TransientInfra,
    /// A side effect failed. Logged; never rolls back the primary transition.
    NonCritical,
    /// Anything else. Retried, then dead-lettered after max attempts.
    FatalToJob,
}

impl CourierError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Storage { .. }
            | Self::Queue { .. }
            | Self::Signal { .. }
            | Self::Delivery { .. }
            | Self::Timeout { .. } => ErrorKind::TransientInfra,
            Self::FanOut { .. } => ErrorKind::NonCritical,
            Self::Config(_)
            | Self::Serialization(_)
            | Self::NotFound { .. }
            | Self::Internal(_) => ErrorKind::FatalToJob,
        }
    }

    /// Shorthand for a [`CourierError::Signal`] without a source.
    pub fn signal(message: impl Into<String>) -> Self {
        Self::Signal {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a [`CourierError::Delivery`] without a source.
    pub fn delivery(message: impl Into<String>) -> Self {
        Self::Delivery {
            message: message.into(),
            source: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fan_out_message_lists_failures() {
        let err = CourierError::FanOut {
            failed: 2,
            total: 3,
            errors: vec!["a: closed".into(), "b: closed".into()],
        };
        assert_eq!(
            err.to_string(),
            "fan-out failed for 2 of 3 channels: a: closed; b: closed"
        );
    }

    #[test]
    fn serde_errors_convert() {
        let bad: Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: CourierError = bad.unwrap_err().into();
        assert!(matches!(err, CourierError::Serialization(_)));
        assert_eq!(err.kind(), ErrorKind::FatalToJob);
    }
}
