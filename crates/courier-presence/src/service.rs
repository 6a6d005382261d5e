// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide presence subscription with an explicit lifecycle.
//!
//! `start` subscribes to the presence channel exactly once per service, no
//! matter how often it is called. `shutdown` cancels the listener and waits
//! for it to exit.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use courier_signal::LocalHub;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::event::PresenceEvent;
use crate::reconciler::PresenceReconciler;

pub struct PresenceService {
    reconciler: Arc<PresenceReconciler>,
    hub: Arc<LocalHub>,
    channel: String,
    started: AtomicBool,
    shutdown: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PresenceService {
    pub fn new(
        reconciler: Arc<PresenceReconciler>,
        hub: Arc<LocalHub>,
        channel: impl Into<String>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            reconciler,
            hub,
            channel: channel.into(),
            started: AtomicBool::new(false),
            shutdown,
            task: Mutex::new(None),
        }
    }

    /// Subscribe and start handling presence events.
    ///
    /// Returns false if the service was already started; the existing
    /// subscription is kept.
    pub async fn start(&self) -> bool {
        if self
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(channel = %self.channel, "presence service already started");
            return false;
        }

        let receiver = self.hub.subscribe(&self.channel);
        let handle = tokio::spawn(listen(
            receiver,
            self.reconciler.clone(),
            self.shutdown.clone(),
            self.channel.clone(),
        ));
        *self.task.lock().await = Some(handle);
        info!(channel = %self.channel, "presence service started");
        true
    }

    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::SeqCst) && !self.shutdown.is_cancelled()
    }

    /// Stop listening and wait for the listener to exit.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        if let Some(handle) = self.task.lock().await.take()
            && let Err(e) = handle.await
        {
            warn!(error = %e, "presence listener task failed");
        }
        info!(channel = %self.channel, "presence service stopped");
    }
}

async fn listen(
    mut receiver: broadcast::Receiver<courier_core::SignalEnvelope>,
    reconciler: Arc<PresenceReconciler>,
    shutdown: CancellationToken,
    channel: String,
) {
    loop {
        let envelope = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            received = receiver.recv() => match received {
                Ok(envelope) => envelope,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(%channel, skipped, "presence listener lagged, events dropped");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        };

        let Some(event) = PresenceEvent::from_envelope(&envelope) else {
            debug!(%channel, event = %envelope.event, "ignoring non-presence event");
            continue;
        };
        if let Err(e) = reconciler.handle(&event).await {
            warn!(
                user_id = %event.user_id(),
                error = %e,
                "failed to apply presence event"
            );
        }
    }
    debug!(%channel, "presence listener exited");
}
