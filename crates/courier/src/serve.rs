// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `courier serve`: wire storage, queue, workers, and presence, then run
//! until a shutdown signal.

use std::sync::Arc;
use std::time::Duration;

use courier_bot::{BOT_RESPONSE_QUEUE, BotDeliveryPipeline, BotResponseHandler};
use courier_calls::{CALL_TIMEOUT_QUEUE, CallManager, CallTimeoutHandler};
use courier_config::CourierConfig;
use courier_config::model::StorageConfig;
use courier_core::{CourierError, SignalTransport};
use courier_presence::{PresenceReconciler, PresenceService};
use courier_queue::{JobQueue, Worker, WorkerOptions};
use courier_signal::{LocalHub, SignalingRelay};
use courier_storage::{Database, SqliteLock, SqliteStorage};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::sender::RelayMessageSender;
use crate::shutdown;

const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(60);

/// Run the coordination service until SIGINT/SIGTERM.
pub async fn run_serve(config: CourierConfig) -> Result<(), CourierError> {
    init_tracing(&config.service.log_level);
    courier_queue::recording::register_metrics();

    let instance_id = config.service.instance_id.clone();
    info!(instance_id = %instance_id, "courier serve starting");

    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;
    let main_db = storage.database()?.clone();
    let queue_db = open_or_share(&config.storage, config.queue_database_path(), &main_db).await?;
    let lock_db = open_or_share(&config.storage, config.lock_database_path(), &main_db).await?;

    let hub = Arc::new(LocalHub::from_config(&config.signaling));
    let transport: Arc<dyn SignalTransport> = hub.clone();
    let relay = SignalingRelay::new(transport);
    let queue = JobQueue::new(queue_db, &config.queue);

    let cancel = shutdown::install_signal_handler();

    let manager = Arc::new(
        CallManager::new(storage.clone(), relay.clone(), config.calls.clone())
            .with_queue(queue.clone()),
    );
    let call_worker = Worker::new(
        queue.clone(),
        CALL_TIMEOUT_QUEUE,
        CallTimeoutHandler::new(manager),
        WorkerOptions::from_config(&instance_id, &config.workers.call_timeout, &config.queue),
    )
    .spawn(cancel.clone());

    let pipeline = Arc::new(BotDeliveryPipeline::new(
        relay.clone(),
        Arc::new(RelayMessageSender::new(relay.clone())),
        &config.bot,
    ));
    let bot_worker = Worker::new(
        queue.clone(),
        BOT_RESPONSE_QUEUE,
        BotResponseHandler::new(pipeline),
        WorkerOptions::from_config(&instance_id, &config.workers.bot_response, &config.queue),
    )
    .spawn(cancel.clone());

    let lock = SqliteLock::new(lock_db);
    let reconciler = Arc::new(PresenceReconciler::new(
        Arc::new(lock.clone()),
        storage.clone(),
        instance_id.as_str(),
        &config.presence,
    ));
    let presence = PresenceService::new(
        reconciler,
        hub.clone(),
        config.presence.channel.clone(),
        cancel.child_token(),
    );
    presence.start().await;

    let housekeeping = tokio::spawn(housekeeping(lock, hub, cancel.clone()));

    info!("courier serve ready");
    cancel.cancelled().await;

    let drain_timeout = config.queue.drain_timeout();
    info!(timeout_secs = drain_timeout.as_secs(), "draining workers");
    let (calls_drained, bot_drained) = tokio::join!(
        call_worker.drain(drain_timeout),
        bot_worker.drain(drain_timeout)
    );
    if !(calls_drained && bot_drained) {
        warn!("some in-flight jobs were abandoned; they will be reclaimed after their lease");
    }

    presence.shutdown().await;
    if let Err(e) = housekeeping.await {
        warn!(error = %e, "housekeeping task failed");
    }
    storage.close().await?;

    info!("courier serve shutdown complete");
    Ok(())
}

/// Reuse `shared` when `path` is the main database, otherwise open `path`
/// with the main storage settings.
async fn open_or_share(
    storage: &StorageConfig,
    path: &str,
    shared: &Database,
) -> Result<Database, CourierError> {
    if path == storage.database_path {
        return Ok(shared.clone());
    }
    Database::open_with(&StorageConfig {
        database_path: path.to_string(),
        ..storage.clone()
    })
    .await
}

/// Periodically drop expired lock rows and idle hub channels.
async fn housekeeping(lock: SqliteLock, hub: Arc<LocalHub>, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(HOUSEKEEPING_INTERVAL);
    // Skip the first immediate tick.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match lock.purge_expired().await {
                    Ok(purged) => debug!(purged, "expired locks purged"),
                    Err(e) => warn!(error = %e, "lock purge failed"),
                }
                let pruned = hub.prune();
                debug!(pruned, "idle signaling channels pruned");
            }
            _ = cancel.cancelled() => {
                debug!("housekeeping task shutting down");
                break;
            }
        }
    }
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("courier={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
