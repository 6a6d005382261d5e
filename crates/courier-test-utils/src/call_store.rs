// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory call store.
//!
//! `update_call_status` checks and writes under one mutex guard, giving the
//! same compare-and-set semantics as the SQLite conditional update.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use courier_core::types::CallUpdate;
use courier_core::{Call, CallParticipant, CallStatus, CallStore, CourierError, SystemMessage};

#[derive(Default)]
pub struct MemoryCallStore {
    calls: Mutex<HashMap<String, Call>>,
    participants: Mutex<HashMap<String, Vec<CallParticipant>>>,
    messages: Mutex<Vec<SystemMessage>>,
    fail_messages: AtomicBool,
    update_failures_left: AtomicU32,
    update_calls: AtomicU32,
}

impl MemoryCallStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_call(&self, call: Call) {
        self.calls.lock().await.insert(call.id.clone(), call);
    }

    /// Add present participants to a call.
    pub async fn add_participants(&self, call_id: &str, user_ids: &[&str]) {
        let mut participants = self.participants.lock().await;
        let entry = participants.entry(call_id.to_string()).or_default();
        for user_id in user_ids {
            entry.push(CallParticipant {
                call_id: call_id.to_string(),
                user_id: (*user_id).to_string(),
                joined_at: Utc::now(),
                left_at: None,
            });
        }
    }

    pub async fn mark_left(&self, call_id: &str, user_id: &str) {
        if let Some(list) = self.participants.lock().await.get_mut(call_id) {
            for participant in list.iter_mut().filter(|p| p.user_id == user_id) {
                participant.left_at = Some(Utc::now());
            }
        }
    }

    pub async fn call(&self, call_id: &str) -> Option<Call> {
        self.calls.lock().await.get(call_id).cloned()
    }

    pub async fn system_messages(&self) -> Vec<SystemMessage> {
        self.messages.lock().await.clone()
    }

    /// Make every system message insert fail.
    pub fn fail_system_messages(&self, fail: bool) {
        self.fail_messages.store(fail, Ordering::SeqCst);
    }

    /// Make the next `n` status updates fail before touching state.
    pub fn fail_next_updates(&self, n: u32) {
        self.update_failures_left.store(n, Ordering::SeqCst);
    }

    /// Number of `update_call_status` invocations, including failed ones.
    pub fn update_count(&self) -> u32 {
        self.update_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CallStore for MemoryCallStore {
    async fn get_call(&self, call_id: &str) -> Result<Option<Call>, CourierError> {
        Ok(self.call(call_id).await)
    }

    async fn update_call_status(
        &self,
        call_id: &str,
        expected: &[CallStatus],
        update: CallUpdate,
    ) -> Result<Option<Call>, CourierError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .update_failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(CourierError::Storage {
                source: "injected update failure".into(),
            });
        }

        let mut calls = self.calls.lock().await;
        let Some(call) = calls.get_mut(call_id) else {
            return Ok(None);
        };
        if !expected.contains(&call.status) {
            return Ok(None);
        }
        call.status = update.status;
        if let Some(at) = update.started_at {
            call.started_at = Some(at);
        }
        if let Some(at) = update.ended_at {
            call.ended_at = Some(at);
        }
        if let Some(reason) = update.error_reason {
            call.error_reason = Some(reason);
        }
        Ok(Some(call.clone()))
    }

    async fn insert_system_message(&self, message: &SystemMessage) -> Result<(), CourierError> {
        if self.fail_messages.load(Ordering::SeqCst) {
            return Err(CourierError::Storage {
                source: "injected system message failure".into(),
            });
        }
        self.messages.lock().await.push(message.clone());
        Ok(())
    }

    async fn list_participants(&self, call_id: &str) -> Result<Vec<CallParticipant>, CourierError> {
        Ok(self
            .participants
            .lock()
            .await
            .get(call_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::CallType;

    #[tokio::test]
    async fn update_respects_expected_status() {
        let store = MemoryCallStore::new();
        store
            .insert_call(Call::ringing("c1", "conv1", "alice", CallType::Voice))
            .await;

        let missed = store
            .update_call_status(
                "c1",
                &[CallStatus::Active],
                CallUpdate::status(CallStatus::Ended),
            )
            .await
            .unwrap();
        assert!(missed.is_none());

        let answered = store
            .update_call_status(
                "c1",
                &[CallStatus::Ringing],
                CallUpdate::status(CallStatus::Active).started_at(Utc::now()),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(answered.status, CallStatus::Active);
        assert_eq!(store.update_count(), 2);
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let store = MemoryCallStore::new();
        store
            .insert_call(Call::ringing("c1", "conv1", "alice", CallType::Voice))
            .await;
        store.fail_next_updates(1);

        let update = || CallUpdate::status(CallStatus::Missed);
        assert!(
            store
                .update_call_status("c1", &[CallStatus::Ringing], update())
                .await
                .is_err()
        );
        assert!(
            store
                .update_call_status("c1", &[CallStatus::Ringing], update())
                .await
                .unwrap()
                .is_some()
        );
    }
}
