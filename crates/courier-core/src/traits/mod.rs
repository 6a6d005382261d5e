// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits the coordination layer is written against.
//!
//! Every trait uses `#[async_trait]` so implementations can be held as
//! `Arc<dyn Trait>` and swapped for in-memory fakes in tests.

pub mod lock;
pub mod messaging;
pub mod storage;
pub mod transport;

pub use lock::DistributedLock;
pub use messaging::MessageSender;
pub use storage::{CallStore, PresenceStore};
pub use transport::SignalTransport;
