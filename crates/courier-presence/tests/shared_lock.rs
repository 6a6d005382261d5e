// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Two instances sharing one SQLite lock table.

use std::sync::Arc;

use courier_config::model::PresenceConfig;
use courier_core::PresenceStatus;
use courier_presence::{LeaveOutcome, PresenceReconciler};
use courier_storage::{Database, SqliteLock};
use courier_test_utils::MemoryPresenceStore;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn leave_delivered_to_both_instances_is_applied_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("locks.db");
    let store = Arc::new(MemoryPresenceStore::new());
    let config = PresenceConfig::default();

    let mut instances = Vec::new();
    for name in ["instance-a", "instance-b"] {
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        instances.push(Arc::new(PresenceReconciler::new(
            Arc::new(SqliteLock::new(db)),
            store.clone(),
            name,
            &config,
        )));
    }

    for user in ["u1", "u2", "u3"] {
        let handles: Vec<_> = instances
            .iter()
            .map(|instance| {
                let instance = instance.clone();
                let user = user.to_string();
                tokio::spawn(async move { instance.handle_leave(&user).await.unwrap() })
            })
            .collect();

        let mut marked = 0;
        for handle in handles {
            if handle.await.unwrap() == LeaveOutcome::MarkedOffline {
                marked += 1;
            }
        }
        assert_eq!(marked, 1, "exactly one instance handles {user}");
    }

    let writes = store.writes().await;
    assert_eq!(writes.len(), 3);
    assert!(writes.iter().all(|(_, s)| *s == PresenceStatus::Offline));
}
