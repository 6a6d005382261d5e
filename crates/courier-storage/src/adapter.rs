// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the call and presence store traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use courier_config::model::StorageConfig;
use courier_core::types::CallUpdate;
use courier_core::{CallStore, CourierError, PresenceStore};

use crate::database::Database;
use crate::models::{Call, CallParticipant, CallStatus, PresenceStatus, SystemMessage};
use crate::queries;

/// SQLite-backed store for calls, participants, system messages, and presence.
///
/// The database is opened lazily by [`SqliteStorage::initialize`]. Every
/// operation before that returns a storage error.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a store for `config`. Nothing is opened yet.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Wrap an already-open database.
    pub fn from_database(config: StorageConfig, db: Database) -> Self {
        Self {
            config,
            db: OnceCell::new_with(Some(db)),
        }
    }

    /// Open the database and run migrations. Fails if called twice.
    pub async fn initialize(&self) -> Result<(), CourierError> {
        let db = Database::open_with(&self.config).await?;
        self.db.set(db).map_err(|_| CourierError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    /// The underlying database handle, for sharing with the job queue and lock.
    pub fn database(&self) -> Result<&Database, CourierError> {
        self.db.get().ok_or_else(|| CourierError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    /// Round-trip a trivial statement.
    pub async fn health_check(&self) -> Result<(), CourierError> {
        self.database()?
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)
    }

    /// Checkpoint the WAL. The connection thread stays up for other clones.
    pub async fn close(&self) -> Result<(), CourierError> {
        self.database()?
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    pub async fn create_call(&self, call: &Call) -> Result<(), CourierError> {
        queries::calls::create_call(self.database()?, call).await
    }

    pub async fn add_participant(
        &self,
        call_id: &str,
        user_id: &str,
        joined_at: DateTime<Utc>,
    ) -> Result<(), CourierError> {
        queries::calls::add_participant(self.database()?, call_id, user_id, joined_at).await
    }

    pub async fn mark_participant_left(
        &self,
        call_id: &str,
        user_id: &str,
        left_at: DateTime<Utc>,
    ) -> Result<bool, CourierError> {
        queries::calls::mark_participant_left(self.database()?, call_id, user_id, left_at).await
    }

    pub async fn list_system_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<SystemMessage>, CourierError> {
        queries::messages::list_system_messages(self.database()?, conversation_id).await
    }

    pub async fn get_presence(
        &self,
        user_id: &str,
    ) -> Result<Option<PresenceStatus>, CourierError> {
        queries::presence::get_user_presence(self.database()?, user_id).await
    }
}

#[async_trait]
impl CallStore for SqliteStorage {
    async fn get_call(&self, call_id: &str) -> Result<Option<Call>, CourierError> {
        queries::calls::get_call(self.database()?, call_id).await
    }

    async fn update_call_status(
        &self,
        call_id: &str,
        expected: &[CallStatus],
        update: CallUpdate,
    ) -> Result<Option<Call>, CourierError> {
        queries::calls::update_call_status(self.database()?, call_id, expected, update).await
    }

    async fn insert_system_message(&self, message: &SystemMessage) -> Result<(), CourierError> {
        queries::messages::insert_system_message(self.database()?, message).await?;
        Ok(())
    }

    async fn list_participants(&self, call_id: &str) -> Result<Vec<CallParticipant>, CourierError> {
        queries::calls::list_participants(self.database()?, call_id).await
    }
}

#[async_trait]
impl PresenceStore for SqliteStorage {
    async fn set_user_presence(
        &self,
        user_id: &str,
        status: PresenceStatus,
    ) -> Result<(), CourierError> {
        queries::presence::set_user_presence(self.database()?, user_id, status).await
    }
}
