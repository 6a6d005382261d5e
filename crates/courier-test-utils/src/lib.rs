// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Courier.
//!
//! In-memory implementations of every collaborator trait in `courier-core`,
//! with failure injection and an ordered [`EventLog`] that several fakes can
//! share so cross-collaborator ordering can be asserted.

pub mod call_store;
pub mod event_log;
pub mod lock;
pub mod presence_store;
pub mod sender;
pub mod transport;

pub use call_store::MemoryCallStore;
pub use event_log::{EventLog, LoggedEvent};
pub use lock::MemoryLock;
pub use presence_store::MemoryPresenceStore;
pub use sender::RecordingSender;
pub use transport::RecordingTransport;
