// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call and participant queries.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use courier_core::CourierError;
use courier_core::types::{CallType, CallUpdate};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::{Call, CallParticipant, CallStatus};

const CALL_COLUMNS: &str =
    "id, conversation_id, initiator_id, call_type, status, started_at, ended_at, error_reason, created_at";

fn parse_text<T: FromStr>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    T::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn call_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Call> {
    Ok(Call {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        initiator_id: row.get(2)?,
        call_type: parse_text::<CallType>(row, 3)?,
        status: parse_text::<CallStatus>(row, 4)?,
        started_at: row.get(5)?,
        ended_at: row.get(6)?,
        error_reason: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn participant_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CallParticipant> {
    Ok(CallParticipant {
        call_id: row.get(0)?,
        user_id: row.get(1)?,
        joined_at: row.get(2)?,
        left_at: row.get(3)?,
    })
}

/// Insert a new call row.
pub async fn create_call(db: &Database, call: &Call) -> Result<(), CourierError> {
    let call = call.clone();
    db.connection()
        .call(move |conn| -> rusqlite::Result<()> {
            conn.execute(
                "INSERT INTO calls (id, conversation_id, initiator_id, call_type, status,
                                    started_at, ended_at, error_reason, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    call.id,
                    call.conversation_id,
                    call.initiator_id,
                    call.call_type.to_string(),
                    call.status.to_string(),
                    call.started_at,
                    call.ended_at,
                    call.error_reason,
                    call.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a call by id.
pub async fn get_call(db: &Database, id: &str) -> Result<Option<Call>, CourierError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> rusqlite::Result<Option<Call>> {
            conn.query_row(
                &format!("SELECT {CALL_COLUMNS} FROM calls WHERE id = ?1"),
                params![id],
                call_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Apply `update` only if the call's current status is one of `expected`.
///
/// Runs as a single `UPDATE ... WHERE status IN (...) RETURNING`, so of two
/// racing writers exactly one sees `Some`. Timestamp and reason fields that
/// are `None` in the update keep their stored value.
pub async fn update_call_status(
    db: &Database,
    id: &str,
    expected: &[CallStatus],
    update: CallUpdate,
) -> Result<Option<Call>, CourierError> {
    if expected.is_empty() {
        return Ok(None);
    }
    // Status names come from the enum, never from callers.
    let allowed = expected
        .iter()
        .map(|s| format!("'{s}'"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "UPDATE calls SET status = ?1,
                started_at = COALESCE(?2, started_at),
                ended_at = COALESCE(?3, ended_at),
                error_reason = COALESCE(?4, error_reason)
         WHERE id = ?5 AND status IN ({allowed})
         RETURNING {CALL_COLUMNS}"
    );
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> rusqlite::Result<Option<Call>> {
            conn.query_row(
                &sql,
                params![
                    update.status.to_string(),
                    update.started_at,
                    update.ended_at,
                    update.error_reason,
                    id,
                ],
                call_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Add a participant, or rejoin one who previously left.
pub async fn add_participant(
    db: &Database,
    call_id: &str,
    user_id: &str,
    joined_at: DateTime<Utc>,
) -> Result<(), CourierError> {
    let call_id = call_id.to_string();
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| -> rusqlite::Result<()> {
            conn.execute(
                "INSERT INTO call_participants (call_id, user_id, joined_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (call_id, user_id) DO UPDATE SET joined_at = excluded.joined_at, left_at = NULL",
                params![call_id, user_id, joined_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Mark a participant as departed. Returns false if they were not present.
pub async fn mark_participant_left(
    db: &Database,
    call_id: &str,
    user_id: &str,
    left_at: DateTime<Utc>,
) -> Result<bool, CourierError> {
    let call_id = call_id.to_string();
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| -> rusqlite::Result<bool> {
            let updated = conn.execute(
                "UPDATE call_participants SET left_at = ?1
                 WHERE call_id = ?2 AND user_id = ?3 AND left_at IS NULL",
                params![left_at, call_id, user_id],
            )?;
            Ok(updated == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// All participants of a call, present or departed, in join order.
pub async fn list_participants(
    db: &Database,
    call_id: &str,
) -> Result<Vec<CallParticipant>, CourierError> {
    let call_id = call_id.to_string();
    db.connection()
        .call(move |conn| -> rusqlite::Result<Vec<CallParticipant>> {
            let mut stmt = conn.prepare(
                "SELECT call_id, user_id, joined_at, left_at FROM call_participants
                 WHERE call_id = ?1
                 ORDER BY joined_at ASC, user_id ASC",
            )?;
            let rows = stmt.query_map(params![call_id], participant_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
