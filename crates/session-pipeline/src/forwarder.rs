// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Sink forwarder: drains the hand-off queue and pushes each event to the
//! store's streaming write handle, one call per event, in queue order.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::errors::SinkError;
use crate::record::SessionEvent;

/// Streaming write seam toward the event store. The store client implements
/// this; tests substitute a recording sink.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn append(&self, event: &SessionEvent) -> Result<(), SinkError>;
}

pub struct SinkForwarder {
    rx: mpsc::Receiver<SessionEvent>,
    sink: Arc<dyn EventSink>,
    cancel: CancellationToken,
}

impl SinkForwarder {
    pub fn new(
        rx: mpsc::Receiver<SessionEvent>,
        sink: Arc<dyn EventSink>,
        cancel: CancellationToken,
    ) -> Self {
        SinkForwarder { rx, sink, cancel }
    }

    /// Forward events until the channel closes or shutdown begins. The wait
    /// is a single select over "next event" and "stop requested"; once stop
    /// is requested, already-queued events are drained best-effort and no
    /// further events are taken. A sink failure cancels the shared token so
    /// the ingestion loop stops too, then surfaces the error.
    pub async fn run(mut self) -> Result<(), SinkError> {
        debug!("Sink forwarder started");
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    let result = self.drain().await;
                    debug!("Sink forwarder stopped");
                    return result;
                }
                maybe_event = self.rx.recv() => match maybe_event {
                    Some(event) => self.forward(event).await?,
                    None => {
                        debug!("Event channel closed, sink forwarder stopping");
                        return Ok(());
                    }
                },
            }
        }
    }

    async fn forward(&self, event: SessionEvent) -> Result<(), SinkError> {
        if let Err(e) = self.sink.append(&event).await {
            error!("Error forwarding event to store: {e}");
            self.cancel.cancel();
            return Err(e);
        }
        Ok(())
    }

    async fn drain(&mut self) -> Result<(), SinkError> {
        let mut drained = 0usize;
        loop {
            match self.rx.try_recv() {
                Ok(event) => {
                    self.forward(event).await?;
                    drained += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        if drained > 0 {
            debug!("Drained {drained} queued events during shutdown");
        }
        Ok(())
    }
}
