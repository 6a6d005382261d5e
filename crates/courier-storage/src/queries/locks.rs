// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TTL lock rows.
//!
//! A lock is held by whoever wrote the row until `expires_at`. Acquisition
//! is a single upsert that only overwrites an expired row, so the database
//! decides which of several racing instances wins.

use courier_core::CourierError;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

/// Try to take `key` for `holder` until `now_ms + ttl_ms`.
///
/// Returns true only if no unexpired row existed. A lock is never extended
/// by re-acquiring, not even by its current holder.
pub async fn try_acquire(
    db: &Database,
    key: &str,
    holder: &str,
    now_ms: i64,
    ttl_ms: i64,
) -> Result<bool, CourierError> {
    let key = key.to_string();
    let holder = holder.to_string();
    db.connection()
        .call(move |conn| -> rusqlite::Result<bool> {
            let changed = conn.execute(
                "INSERT INTO locks (key, holder, expires_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT (key) DO UPDATE SET
                     holder = excluded.holder,
                     expires_at = excluded.expires_at
                 WHERE locks.expires_at <= ?4",
                params![key, holder, now_ms + ttl_ms, now_ms],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Current holder of `key`, if the lock is unexpired at `now_ms`.
pub async fn holder(db: &Database, key: &str, now_ms: i64) -> Result<Option<String>, CourierError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| -> rusqlite::Result<Option<String>> {
            conn.query_row(
                "SELECT holder FROM locks WHERE key = ?1 AND expires_at > ?2",
                params![key, now_ms],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Delete expired rows. Returns how many were removed.
pub async fn purge_expired(db: &Database, now_ms: i64) -> Result<usize, CourierError> {
    db.connection()
        .call(move |conn| -> rusqlite::Result<usize> {
            conn.execute("DELETE FROM locks WHERE expires_at <= ?1", params![now_ms])
        })
        .await
        .map_err(map_tr_err)
}
