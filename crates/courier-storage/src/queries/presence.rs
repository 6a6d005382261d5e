// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistent user presence.

use std::str::FromStr;

use courier_core::CourierError;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::PresenceStatus;

/// Upsert the stored presence of a user.
pub async fn set_user_presence(
    db: &Database,
    user_id: &str,
    status: PresenceStatus,
) -> Result<(), CourierError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| -> rusqlite::Result<()> {
            conn.execute(
                "INSERT INTO user_presence (user_id, status) VALUES (?1, ?2)
                 ON CONFLICT (user_id) DO UPDATE SET
                     status = excluded.status,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![user_id, status.to_string()],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Stored presence of a user, if any has been recorded.
pub async fn get_user_presence(
    db: &Database,
    user_id: &str,
) -> Result<Option<PresenceStatus>, CourierError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| -> rusqlite::Result<Option<PresenceStatus>> {
            conn.query_row(
                "SELECT status FROM user_presence WHERE user_id = ?1",
                params![user_id],
                |row| {
                    let raw: String = row.get(0)?;
                    PresenceStatus::from_str(&raw).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            0,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn presence_upserts() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("p.db").to_str().unwrap())
            .await
            .unwrap();

        assert_eq!(get_user_presence(&db, "u1").await.unwrap(), None);
        set_user_presence(&db, "u1", PresenceStatus::Online).await.unwrap();
        set_user_presence(&db, "u1", PresenceStatus::Offline).await.unwrap();
        assert_eq!(
            get_user_presence(&db, "u1").await.unwrap(),
            Some(PresenceStatus::Offline)
        );
    }
}
