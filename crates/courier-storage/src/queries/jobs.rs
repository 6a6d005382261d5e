// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable job table operations: delayed insert, lease-based claim, ack, retry.
//!
//! Claims run inside `BEGIN IMMEDIATE` so that two processes sharing the
//! database file can never claim the same row.

use std::str::FromStr;

use courier_core::CourierError;
use rusqlite::{OptionalExtension, TransactionBehavior, params};

use crate::database::{Database, map_tr_err};
use crate::models::{
    Claim, ExpiredJob, FailOutcome, InsertedJob, JobCount, JobRecord, JobStatus, NewJob,
};

/// `last_error` recorded when a job's holder vanished on its last attempt.
pub const LEASE_EXPIRED: &str = "lease expired on final attempt";

const JOB_COLUMNS: &str = "id, queue_name, dedupe_key, payload, status, attempts, max_attempts, \
                           run_at, locked_until, locked_by, last_error, created_at";

fn job_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<JobRecord> {
    let status: String = row.get(4)?;
    let status = JobStatus::from_str(&status).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(JobRecord {
        id: row.get(0)?,
        queue_name: row.get(1)?,
        dedupe_key: row.get(2)?,
        payload: row.get(3)?,
        status,
        attempts: row.get(5)?,
        max_attempts: row.get(6)?,
        run_at: row.get(7)?,
        locked_until: row.get(8)?,
        locked_by: row.get(9)?,
        last_error: row.get(10)?,
        created_at: row.get(11)?,
    })
}

/// Insert a job. If `dedupe_key` matches an existing job in the same queue,
/// nothing is inserted and the existing id is returned.
pub async fn insert(db: &Database, job: NewJob) -> Result<InsertedJob, CourierError> {
    db.connection()
        .call(move |conn| -> rusqlite::Result<InsertedJob> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO jobs (queue_name, dedupe_key, payload, run_at, max_attempts)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    job.queue_name,
                    job.dedupe_key,
                    job.payload,
                    job.run_at,
                    job.max_attempts
                ],
            )?;
            let result = if inserted == 1 {
                InsertedJob {
                    id: tx.last_insert_rowid(),
                    deduplicated: false,
                }
            } else {
                let id: i64 = tx.query_row(
                    "SELECT id FROM jobs WHERE queue_name = ?1 AND dedupe_key = ?2",
                    params![job.queue_name, job.dedupe_key],
                    |row| row.get(0),
                )?;
                InsertedJob {
                    id,
                    deduplicated: true,
                }
            };
            tx.commit()?;
            Ok(result)
        })
        .await
        .map_err(map_tr_err)
}

/// Claim the next due job in `queue_name` for `worker_id`.
///
/// A job is due when it is pending with `run_at <= now_ms`, or when it is
/// processing but its lease expired (the claiming instance died). Claiming
/// increments `attempts` and sets a lease of `lease_ms`. A reclaimed job that
/// already used its last attempt is moved to the dead state instead and
/// reported in [`Claim::expired`] so the caller can surface it.
pub async fn claim_due(
    db: &Database,
    queue_name: &str,
    worker_id: &str,
    now_ms: i64,
    lease_ms: i64,
) -> Result<Claim, CourierError> {
    let queue_name = queue_name.to_string();
    let worker_id = worker_id.to_string();
    db.connection()
        .call(move |conn| -> rusqlite::Result<Claim> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let mut expired = Vec::new();
            let job = loop {
                let candidate = tx
                    .query_row(
                        &format!(
                            "SELECT {JOB_COLUMNS} FROM jobs
                             WHERE queue_name = ?1
                               AND ((status = 'pending' AND run_at <= ?2)
                                 OR (status = 'processing' AND locked_until <= ?2))
                             ORDER BY run_at ASC, id ASC
                             LIMIT 1"
                        ),
                        params![queue_name, now_ms],
                        job_from_row,
                    )
                    .optional()?;

                let Some(job) = candidate else {
                    break None;
                };

                if job.status == JobStatus::Processing && job.attempts >= job.max_attempts {
                    tx.execute(
                        "UPDATE jobs SET status = 'dead', locked_until = NULL, locked_by = NULL,
                         last_error = COALESCE(last_error, ?2),
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                         WHERE id = ?1",
                        params![job.id, LEASE_EXPIRED],
                    )?;
                    expired.push(ExpiredJob {
                        id: job.id,
                        attempts: job.attempts,
                        locked_by: job.locked_by,
                    });
                    continue;
                }

                let locked_until = now_ms + lease_ms;
                tx.execute(
                    "UPDATE jobs SET status = 'processing', attempts = attempts + 1,
                     locked_until = ?1, locked_by = ?2,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?3",
                    params![locked_until, worker_id, job.id],
                )?;
                break Some(JobRecord {
                    status: JobStatus::Processing,
                    attempts: job.attempts + 1,
                    locked_until: Some(locked_until),
                    locked_by: Some(worker_id.clone()),
                    ..job
                });
            };
            tx.commit()?;
            Ok(Claim { job, expired })
        })
        .await
        .map_err(map_tr_err)
}

/// Push the lease of a held job out to `locked_until_ms`.
///
/// Returns false if `worker_id` no longer holds the job.
pub async fn extend_lease(
    db: &Database,
    id: i64,
    worker_id: &str,
    locked_until_ms: i64,
) -> Result<bool, CourierError> {
    let worker_id = worker_id.to_string();
    db.connection()
        .call(move |conn| -> rusqlite::Result<bool> {
            let updated = conn.execute(
                "UPDATE jobs SET locked_until = ?1
                 WHERE id = ?2 AND status = 'processing' AND locked_by = ?3",
                params![locked_until_ms, id, worker_id],
            )?;
            Ok(updated == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Acknowledge a successful job by deleting it.
///
/// Returns false if `worker_id` no longer holds the job.
pub async fn complete(db: &Database, id: i64, worker_id: &str) -> Result<bool, CourierError> {
    let worker_id = worker_id.to_string();
    db.connection()
        .call(move |conn| -> rusqlite::Result<bool> {
            let deleted = conn.execute(
                "DELETE FROM jobs WHERE id = ?1 AND status = 'processing' AND locked_by = ?2",
                params![id, worker_id],
            )?;
            Ok(deleted == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Record a failed attempt.
///
/// If the job has attempts left it returns to pending at `retry_at_ms`,
/// otherwise it moves to the dead state. `error` is kept as `last_error`.
pub async fn fail(
    db: &Database,
    id: i64,
    worker_id: &str,
    error: &str,
    retry_at_ms: i64,
) -> Result<FailOutcome, CourierError> {
    let worker_id = worker_id.to_string();
    let error = error.to_string();
    db.connection()
        .call(move |conn| -> rusqlite::Result<FailOutcome> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let held: Option<(u32, u32)> = tx
                .query_row(
                    "SELECT attempts, max_attempts FROM jobs
                     WHERE id = ?1 AND status = 'processing' AND locked_by = ?2",
                    params![id, worker_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let outcome = match held {
                None => FailOutcome::Missing,
                Some((attempts, max_attempts)) if attempts >= max_attempts => {
                    tx.execute(
                        "UPDATE jobs SET status = 'dead', last_error = ?1,
                         locked_until = NULL, locked_by = NULL,
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                         WHERE id = ?2",
                        params![error, id],
                    )?;
                    FailOutcome::Dead { attempts }
                }
                Some((attempts, _)) => {
                    tx.execute(
                        "UPDATE jobs SET status = 'pending', last_error = ?1, run_at = ?2,
                         locked_until = NULL, locked_by = NULL,
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                         WHERE id = ?3",
                        params![error, retry_at_ms, id],
                    )?;
                    FailOutcome::Retrying {
                        attempts,
                        run_at: retry_at_ms,
                    }
                }
            };
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(map_tr_err)
}

/// Move a held job straight to the dead state, skipping remaining attempts.
pub async fn bury(
    db: &Database,
    id: i64,
    worker_id: &str,
    error: &str,
) -> Result<bool, CourierError> {
    let worker_id = worker_id.to_string();
    let error = error.to_string();
    db.connection()
        .call(move |conn| -> rusqlite::Result<bool> {
            let updated = conn.execute(
                "UPDATE jobs SET status = 'dead', last_error = ?1,
                 locked_until = NULL, locked_by = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2 AND status = 'processing' AND locked_by = ?3",
                params![error, id, worker_id],
            )?;
            Ok(updated == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a still-pending job by its dedupe key. Claimed jobs are left alone.
pub async fn cancel_pending_by_key(
    db: &Database,
    queue_name: &str,
    dedupe_key: &str,
) -> Result<bool, CourierError> {
    let queue_name = queue_name.to_string();
    let dedupe_key = dedupe_key.to_string();
    db.connection()
        .call(move |conn| -> rusqlite::Result<bool> {
            let deleted = conn.execute(
                "DELETE FROM jobs WHERE queue_name = ?1 AND dedupe_key = ?2 AND status = 'pending'",
                params![queue_name, dedupe_key],
            )?;
            Ok(deleted == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Return a dead job to pending with a fresh attempt budget.
pub async fn revive(db: &Database, id: i64, now_ms: i64) -> Result<bool, CourierError> {
    db.connection()
        .call(move |conn| -> rusqlite::Result<bool> {
            let updated = conn.execute(
                "UPDATE jobs SET status = 'pending', attempts = 0, run_at = ?1,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2 AND status = 'dead'",
                params![now_ms, id],
            )?;
            Ok(updated == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a job by id.
pub async fn get(db: &Database, id: i64) -> Result<Option<JobRecord>, CourierError> {
    db.connection()
        .call(move |conn| -> rusqlite::Result<Option<JobRecord>> {
            conn.query_row(
                &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1"),
                params![id],
                job_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Dead jobs in a queue, newest first.
pub async fn list_dead(
    db: &Database,
    queue_name: &str,
    limit: i64,
) -> Result<Vec<JobRecord>, CourierError> {
    let queue_name = queue_name.to_string();
    db.connection()
        .call(move |conn| -> rusqlite::Result<Vec<JobRecord>> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {JOB_COLUMNS} FROM jobs
                 WHERE queue_name = ?1 AND status = 'dead'
                 ORDER BY updated_at DESC, id DESC
                 LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![queue_name, limit], job_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Job counts grouped by queue and status.
pub async fn count_by_status(db: &Database) -> Result<Vec<JobCount>, CourierError> {
    db.connection()
        .call(|conn| -> rusqlite::Result<Vec<JobCount>> {
            let mut stmt = conn.prepare(
                "SELECT queue_name, status, COUNT(*) FROM jobs
                 GROUP BY queue_name, status
                 ORDER BY queue_name, status",
            )?;
            let rows = stmt.query_map([], |row| {
                let status: String = row.get(1)?;
                let status = JobStatus::from_str(&status).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        1,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok(JobCount {
                    queue_name: row.get(0)?,
                    status,
                    count: row.get(2)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("jobs.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn job(queue: &str, run_at: i64, key: Option<&str>) -> NewJob {
        NewJob {
            queue_name: queue.to_string(),
            payload: r#"{"callId":"c1"}"#.to_string(),
            dedupe_key: key.map(str::to_string),
            run_at,
            max_attempts: 3,
        }
    }

    #[tokio::test]
    async fn insert_claim_complete_lifecycle() {
        let (db, _dir) = setup_db().await;

        let inserted = insert(&db, job("call-timeout", 1_000, None)).await.unwrap();
        assert!(!inserted.deduplicated);

        let claimed = claim_due(&db, "call-timeout", "w1", 1_000, 30_000)
            .await
            .unwrap()
            .job
            .expect("job is due");
        assert_eq!(claimed.id, inserted.id);
        assert_eq!(claimed.status, JobStatus::Processing);
        assert_eq!(claimed.attempts, 1);
        assert_eq!(claimed.locked_until, Some(31_000));

        // Held jobs are invisible to other claimers.
        assert!(
            claim_due(&db, "call-timeout", "w2", 2_000, 30_000)
                .await
                .unwrap()
                .job
                .is_none()
        );

        assert!(complete(&db, claimed.id, "w1").await.unwrap());
        assert!(get(&db, claimed.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delayed_job_is_not_due_early() {
        let (db, _dir) = setup_db().await;
        insert(&db, job("call-timeout", 30_000, None)).await.unwrap();

        assert!(
            claim_due(&db, "call-timeout", "w1", 29_999, 1_000)
                .await
                .unwrap()
                .job
                .is_none()
        );
        assert!(
            claim_due(&db, "call-timeout", "w1", 30_000, 1_000)
                .await
                .unwrap()
                .job
                .is_some()
        );
    }

    #[tokio::test]
    async fn due_jobs_claim_in_run_at_order() {
        let (db, _dir) = setup_db().await;
        let late = insert(&db, job("q", 500, None)).await.unwrap();
        let early = insert(&db, job("q", 100, None)).await.unwrap();

        let first = claim_due(&db, "q", "w", 1_000, 1_000).await.unwrap().job.unwrap();
        let second = claim_due(&db, "q", "w", 1_000, 1_000).await.unwrap().job.unwrap();
        assert_eq!(first.id, early.id);
        assert_eq!(second.id, late.id);
    }

    #[tokio::test]
    async fn dedupe_key_returns_existing_job() {
        let (db, _dir) = setup_db().await;
        let first = insert(&db, job("call-timeout", 0, Some("call-timeout:c1")))
            .await
            .unwrap();
        let second = insert(&db, job("call-timeout", 0, Some("call-timeout:c1")))
            .await
            .unwrap();
        assert!(second.deduplicated);
        assert_eq!(first.id, second.id);

        // Same key in another queue is independent.
        let other = insert(&db, job("bot-response", 0, Some("call-timeout:c1")))
            .await
            .unwrap();
        assert!(!other.deduplicated);
    }

    #[tokio::test]
    async fn fail_reschedules_then_buries() {
        let (db, _dir) = setup_db().await;
        let id = insert(&db, job("q", 0, None)).await.unwrap().id;

        for attempt in 1..=2u32 {
            let claimed = claim_due(&db, "q", "w", 10_000 * attempt as i64, 1_000)
                .await
                .unwrap()
                .job
                .unwrap();
            assert_eq!(claimed.attempts, attempt);
            let retry_at = 10_000 * attempt as i64 + 500;
            let outcome = fail(&db, id, "w", "storage down", retry_at).await.unwrap();
            assert_eq!(
                outcome,
                FailOutcome::Retrying {
                    attempts: attempt,
                    run_at: retry_at
                }
            );
        }

        let claimed = claim_due(&db, "q", "w", 100_000, 1_000).await.unwrap().job.unwrap();
        assert_eq!(claimed.attempts, 3);
        let outcome = fail(&db, id, "w", "still down", 0).await.unwrap();
        assert_eq!(outcome, FailOutcome::Dead { attempts: 3 });

        let dead = list_dead(&db, "q", 10).await.unwrap();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].last_error.as_deref(), Some("still down"));
        assert!(
            claim_due(&db, "q", "w", i64::MAX / 2, 1_000)
                .await
                .unwrap()
                .job
                .is_none()
        );
    }

    #[tokio::test]
    async fn expired_lease_is_reclaimed() {
        let (db, _dir) = setup_db().await;
        let id = insert(&db, job("q", 0, None)).await.unwrap().id;

        claim_due(&db, "q", "crashed", 0, 1_000).await.unwrap().job.unwrap();
        let reclaimed = claim_due(&db, "q", "survivor", 1_000, 1_000)
            .await
            .unwrap()
            .job
            .expect("lease expired");
        assert_eq!(reclaimed.id, id);
        assert_eq!(reclaimed.attempts, 2);
        assert_eq!(reclaimed.locked_by.as_deref(), Some("survivor"));

        // The original holder can no longer ack or fail it.
        assert!(!complete(&db, id, "crashed").await.unwrap());
        assert_eq!(
            fail(&db, id, "crashed", "late", 0).await.unwrap(),
            FailOutcome::Missing
        );
    }

    #[tokio::test]
    async fn lease_expiry_on_final_attempt_buries_job() {
        let (db, _dir) = setup_db().await;
        let mut new_job = job("q", 0, None);
        new_job.max_attempts = 1;
        let id = insert(&db, new_job).await.unwrap().id;

        claim_due(&db, "q", "crashed", 0, 1_000).await.unwrap().job.unwrap();
        let claim = claim_due(&db, "q", "w", 5_000, 1_000).await.unwrap();
        assert!(claim.job.is_none());
        assert_eq!(
            claim.expired,
            vec![ExpiredJob {
                id,
                attempts: 1,
                locked_by: Some("crashed".into()),
            }]
        );

        let stored = get(&db, id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Dead);
        assert_eq!(stored.last_error.as_deref(), Some(LEASE_EXPIRED));

        // Already buried, so a later pass reports nothing.
        let claim = claim_due(&db, "q", "w", 10_000, 1_000).await.unwrap();
        assert!(claim.expired.is_empty());
    }

    #[tokio::test]
    async fn extended_lease_is_not_reclaimed() {
        let (db, _dir) = setup_db().await;
        let id = insert(&db, job("q", 0, None)).await.unwrap().id;
        claim_due(&db, "q", "w1", 0, 1_000).await.unwrap().job.unwrap();

        assert!(extend_lease(&db, id, "w1", 5_000).await.unwrap());
        assert!(!extend_lease(&db, id, "w2", 9_000).await.unwrap());
        assert!(claim_due(&db, "q", "w2", 4_999, 1_000).await.unwrap().job.is_none());

        let reclaimed = claim_due(&db, "q", "w2", 5_000, 1_000).await.unwrap().job.unwrap();
        assert_eq!(reclaimed.locked_by.as_deref(), Some("w2"));
        assert!(!extend_lease(&db, id, "w1", 20_000).await.unwrap());
    }

    #[tokio::test]
    async fn cancel_only_touches_pending_jobs() {
        let (db, _dir) = setup_db().await;
        insert(&db, job("q", 50_000, Some("k1"))).await.unwrap();
        assert!(cancel_pending_by_key(&db, "q", "k1").await.unwrap());
        assert!(!cancel_pending_by_key(&db, "q", "k1").await.unwrap());

        insert(&db, job("q", 0, Some("k2"))).await.unwrap();
        claim_due(&db, "q", "w", 0, 1_000).await.unwrap().job.unwrap();
        assert!(!cancel_pending_by_key(&db, "q", "k2").await.unwrap());
    }

    #[tokio::test]
    async fn revive_resets_dead_job() {
        let (db, _dir) = setup_db().await;
        let mut new_job = job("q", 0, None);
        new_job.max_attempts = 1;
        let id = insert(&db, new_job).await.unwrap().id;
        claim_due(&db, "q", "w", 0, 1_000).await.unwrap().job.unwrap();
        assert!(bury(&db, id, "w", "bad payload").await.unwrap());

        assert!(revive(&db, id, 10).await.unwrap());
        let again = claim_due(&db, "q", "w", 10, 1_000).await.unwrap().job.unwrap();
        assert_eq!(again.attempts, 1);
    }

    #[tokio::test]
    async fn counts_group_by_queue_and_status() {
        let (db, _dir) = setup_db().await;
        insert(&db, job("a", 0, None)).await.unwrap();
        insert(&db, job("a", 0, None)).await.unwrap();
        insert(&db, job("b", 0, None)).await.unwrap();
        claim_due(&db, "a", "w", 0, 1_000).await.unwrap().job.unwrap();

        let counts = count_by_status(&db).await.unwrap();
        assert_eq!(
            counts,
            vec![
                JobCount {
                    queue_name: "a".into(),
                    status: JobStatus::Pending,
                    count: 1
                },
                JobCount {
                    queue_name: "a".into(),
                    status: JobStatus::Processing,
                    count: 1
                },
                JobCount {
                    queue_name: "b".into(),
                    status: JobStatus::Pending,
                    count: 1
                },
            ]
        );
    }

    #[tokio::test]
    async fn two_instances_never_claim_the_same_job() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shared.db");
        let first = Database::open(path.to_str().unwrap()).await.unwrap();
        let second = Database::open(path.to_str().unwrap()).await.unwrap();

        for _ in 0..20 {
            insert(&first, job("q", 0, None)).await.unwrap();
        }

        let mut handles = Vec::new();
        for (name, db) in [("a", first.clone()), ("b", second.clone())] {
            handles.push(tokio::spawn(async move {
                let mut ids = Vec::new();
                while let Some(job) = claim_due(&db, "q", name, 0, 60_000).await.unwrap().job {
                    ids.push(job.id);
                }
                ids
            }));
        }

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.await.unwrap());
        }
        all.sort_unstable();
        let before = all.len();
        all.dedup();
        assert_eq!(before, 20);
        assert_eq!(all.len(), 20);
    }
}
