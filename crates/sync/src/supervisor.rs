//! Supervised push connection
//!
//! Keeps one push connection open for the lifetime of the synchronizer:
//! connect, resynchronize through a snapshot pull, forward pushed states to
//! the reducer, and on failure reconnect after the retry policy's delay.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::error::SyncError;
use crate::reducer::SyncInput;
use crate::retry::RetryPolicy;
use crate::source::{PushSource, PushStream};
use crate::synchronizer::SnapshotPuller;

/// Why a forwarding session ended
enum SessionEnd {
    Shutdown,
    Lost(String),
}

pub(crate) struct PushSupervisor {
    source: Arc<dyn PushSource>,
    puller: SnapshotPuller,
    inputs: mpsc::Sender<SyncInput>,
    retry: RetryPolicy,
    shutdown_rx: watch::Receiver<bool>,
}

impl PushSupervisor {
    pub(crate) fn new(
        source: Arc<dyn PushSource>,
        puller: SnapshotPuller,
        inputs: mpsc::Sender<SyncInput>,
        retry: RetryPolicy,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            source,
            puller,
            inputs,
            retry,
            shutdown_rx,
        }
    }

    pub(crate) async fn run(mut self) {
        let mut failures: u32 = 0;

        loop {
            if *self.shutdown_rx.borrow() {
                break;
            }

            let connected = tokio::select! {
                _ = self.shutdown_rx.changed() => break,
                result = self.source.connect() => result,
            };

            match connected {
                Ok(stream) => {
                    info!(reconnect = failures > 0, "Push connection established");
                    failures = 0;

                    if !self.resync().await {
                        break;
                    }
                    match self.forward(stream).await {
                        SessionEnd::Shutdown => break,
                        SessionEnd::Lost(reason) => {
                            warn!(reason = %reason, "Push connection lost");
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, attempt = failures + 1, "Push connection failed");
                }
            }

            failures += 1;
            if !self.retry.allows_attempt(failures + 1) {
                error!(
                    attempts = failures,
                    "Giving up on push connection; state updates now rely on snapshot pulls"
                );
                break;
            }

            let delay = self.retry.delay_for_retry(failures);
            debug!(delay_ms = delay.as_millis() as u64, "Reconnecting push connection");
            tokio::select! {
                _ = self.shutdown_rx.changed() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!("Push supervisor stopped");
    }

    /// Reseed the map from a fresh snapshot before forwarding pushed states.
    /// Returns false when the synchronizer is shutting down.
    async fn resync(&mut self) -> bool {
        tokio::select! {
            _ = self.shutdown_rx.changed() => false,
            result = self.puller.pull() => match result {
                Ok(states) => {
                    debug!(count = states.len(), "Resynchronized after connect");
                    true
                }
                Err(SyncError::Closed) => false,
                Err(e) => {
                    warn!(error = %e, "Snapshot resync failed after connect");
                    true
                }
            }
        }
    }

    async fn forward(&mut self, mut stream: PushStream) -> SessionEnd {
        loop {
            tokio::select! {
                _ = self.shutdown_rx.changed() => return SessionEnd::Shutdown,
                item = stream.next() => match item {
                    Some(Ok(state)) => {
                        if self.inputs.send(SyncInput::Push(state)).await.is_err() {
                            return SessionEnd::Shutdown;
                        }
                    }
                    Some(Err(e)) if e.is_decode() => {
                        warn!(error = %e, "Skipping malformed pushed state");
                    }
                    Some(Err(e)) => return SessionEnd::Lost(e.to_string()),
                    None => return SessionEnd::Lost("stream closed by server".to_string()),
                }
            }
        }
    }
}
