// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `courier queue` subcommands.

use std::io::Write;

use courier_config::CourierConfig;
use courier_config::model::StorageConfig;
use courier_core::CourierError;
use courier_queue::JobQueue;
use courier_storage::Database;
use courier_storage::models::{JobCount, JobRecord};

async fn open_queue(config: &CourierConfig) -> Result<JobQueue, CourierError> {
    let db = Database::open_with(&StorageConfig {
        database_path: config.queue_database_path().to_string(),
        ..config.storage.clone()
    })
    .await?;
    Ok(JobQueue::new(db, &config.queue))
}

/// Print job counts per queue and status.
pub async fn run_stats(config: &CourierConfig) -> Result<(), CourierError> {
    let counts = open_queue(config).await?.stats().await?;
    write_stats(&mut std::io::stdout().lock(), &counts).map_err(io_err)
}

/// Print up to `limit` dead jobs from `queue`.
pub async fn run_dead(config: &CourierConfig, queue: &str, limit: i64) -> Result<(), CourierError> {
    let jobs = open_queue(config).await?.dead_jobs(queue, limit).await?;
    write_dead(&mut std::io::stdout().lock(), queue, &jobs).map_err(io_err)
}

/// Move dead job `id` back to pending.
pub async fn run_retry(config: &CourierConfig, id: i64) -> Result<(), CourierError> {
    if open_queue(config).await?.retry_dead(id).await? {
        println!("job {id} requeued");
        Ok(())
    } else {
        Err(CourierError::NotFound {
            kind: "dead job",
            id: id.to_string(),
        })
    }
}

fn write_stats(out: &mut impl Write, counts: &[JobCount]) -> std::io::Result<()> {
    if counts.is_empty() {
        return writeln!(out, "no jobs");
    }
    writeln!(out, "{:<20} {:<12} {:>8}", "QUEUE", "STATUS", "COUNT")?;
    for row in counts {
        writeln!(
            out,
            "{:<20} {:<12} {:>8}",
            row.queue_name,
            row.status.to_string(),
            row.count
        )?;
    }
    Ok(())
}

fn write_dead(out: &mut impl Write, queue: &str, jobs: &[JobRecord]) -> std::io::Result<()> {
    if jobs.is_empty() {
        return writeln!(out, "no dead jobs in {queue}");
    }
    for job in jobs {
        writeln!(
            out,
            "{:>6}  attempts={}/{}  {}",
            job.id,
            job.attempts,
            job.max_attempts,
            job.last_error.as_deref().unwrap_or("-")
        )?;
    }
    Ok(())
}

fn io_err(e: std::io::Error) -> CourierError {
    CourierError::Internal(format!("failed to write output: {e}"))
}
