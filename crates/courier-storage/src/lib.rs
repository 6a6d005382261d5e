// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Courier coordination layer.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed operations for calls,
//! participants, system messages, user presence, the durable job table, and
//! the TTL lock table.
//!
//! Several backend instances may point at the same database file. Every
//! check-then-write is either a single conditional statement or runs inside
//! an `IMMEDIATE` transaction, so races between processes resolve in SQLite.

pub mod adapter;
pub mod database;
pub mod lock;
pub mod migrations;
pub mod models;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
pub use lock::SqliteLock;
pub use models::*;
