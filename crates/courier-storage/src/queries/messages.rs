// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! System message persistence.

use courier_core::CourierError;
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::models::SystemMessage;

/// Append a system message to its conversation. Returns the new row id.
pub async fn insert_system_message(
    db: &Database,
    message: &SystemMessage,
) -> Result<i64, CourierError> {
    let conversation_id = message.conversation_id.clone();
    let content = message.content.clone();
    let metadata = serde_json::to_string(&message.metadata)?;
    db.connection()
        .call(move |conn| -> rusqlite::Result<i64> {
            conn.execute(
                "INSERT INTO system_messages (conversation_id, content, metadata)
                 VALUES (?1, ?2, ?3)",
                params![conversation_id, content, metadata],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// System messages of a conversation, oldest first.
pub async fn list_system_messages(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<SystemMessage>, CourierError> {
    let conversation_id = conversation_id.to_string();
    let rows = db
        .connection()
        .call(move |conn| -> rusqlite::Result<Vec<(String, String, Option<String>)>> {
            let mut stmt = conn.prepare(
                "SELECT conversation_id, content, metadata FROM system_messages
                 WHERE conversation_id = ?1 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![conversation_id], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)?;

    rows.into_iter()
        .map(|(conversation_id, content, metadata)| -> Result<SystemMessage, CourierError> {
            let metadata = match metadata {
                Some(raw) => serde_json::from_str(&raw)?,
                None => serde_json::Value::Null,
            };
            Ok(SystemMessage {
                conversation_id,
                content,
                metadata,
            })
        })
        .collect()
}
