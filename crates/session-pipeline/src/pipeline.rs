// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Pipeline lifecycle: wires follower, hand-off queue and sink forwarder
//! together and drives the one-shot Running → Stopping → Stopped shutdown.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::RelayConfig;
use crate::errors::{PipelineError, SinkError};
use crate::follower::Follower;
use crate::forwarder::{EventSink, SinkForwarder};
use crate::record::SessionEvent;
use crate::transform;

/// Lifecycle states. Shutdown is one-shot; there is no way back to Running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStatus {
    Running,
    Stopping,
    Stopped,
}

pub struct Pipeline {
    follower: Follower,
    tx: mpsc::Sender<SessionEvent>,
    cancel: CancellationToken,
    forwarder: JoinHandle<Result<(), SinkError>>,
    status: PipelineStatus,
    status_tx: broadcast::Sender<PipelineStatus>,
}

impl Pipeline {
    /// Spawn the forwarder task and the follow helper. The hand-off queue is
    /// a bounded channel of `config.queue_capacity`; a full queue blocks the
    /// ingestion loop rather than dropping events.
    pub fn start(config: &RelayConfig, sink: Arc<dyn EventSink>) -> Result<Self, PipelineError> {
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(config.queue_capacity);

        let forwarder = SinkForwarder::new(rx, sink, cancel.clone());
        let forwarder = tokio::spawn(forwarder.run());

        let follower = Follower::spawn(&config.tail_helper, &config.source_file, cancel.clone())?;
        info!("Following {:?}", config.source_file);

        let (status_tx, _status_rx) = broadcast::channel(4);
        Ok(Pipeline {
            follower,
            tx,
            cancel,
            forwarder,
            status: PipelineStatus::Running,
            status_tx,
        })
    }

    /// Token observed by every component; cancelling it begins shutdown.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn status(&self) -> PipelineStatus {
        self.status
    }

    /// Receiver for shutdown state transitions; `Stopping` and `Stopped` are
    /// broadcast in order as [`Pipeline::shutdown`] runs.
    pub fn status_receiver(&self) -> broadcast::Receiver<PipelineStatus> {
        self.status_tx.subscribe()
    }

    /// Main ingestion loop: read a line, transform it, enqueue the event.
    /// Returns when shutdown begins, the follow helper closes its output, or
    /// a read error occurs (the error case is fatal and reported to the
    /// caller, which is expected to shut the pipeline down either way).
    pub async fn ingest(&mut self) -> Result<(), PipelineError> {
        loop {
            let line = match self.follower.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    if !self.cancel.is_cancelled() {
                        error!("Follow helper closed its output, stopping pipeline");
                        self.cancel.cancel();
                    }
                    return Ok(());
                }
                Err(e) => {
                    error!("Error reading line from file: {e}");
                    self.cancel.cancel();
                    return Err(e.into());
                }
            };

            let Some(event) = transform::session_event_from_line(&line) else {
                continue;
            };

            debug!("Enqueueing session event for object {}", event.object_id);
            tokio::select! {
                _ = self.cancel.cancelled() => return Ok(()),
                sent = self.tx.send(event) => {
                    if sent.is_err() {
                        // Forwarder is gone; its join result carries the cause.
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Ordered shutdown: stop the forwarder, wait for it to finish draining,
    /// then terminate the follow helper.
    pub async fn shutdown(mut self) -> Result<(), PipelineError> {
        self.status = PipelineStatus::Stopping;
        let _ = self.status_tx.send(PipelineStatus::Stopping);
        info!("Stopping pipeline");
        self.cancel.cancel();
        drop(self.tx);

        let forward_result = match self.forwarder.await {
            Ok(result) => result.map_err(PipelineError::from),
            Err(e) => Err(PipelineError::from(e)),
        };

        self.follower.shutdown().await;
        self.status = PipelineStatus::Stopped;
        let _ = self.status_tx.send(PipelineStatus::Stopped);
        info!("Pipeline stopped");
        forward_result
    }
}
