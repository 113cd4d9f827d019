// State Synchronizer
//
// Public handle over the shared workflow state map. Cloning the handle is
// cheap; every clone observes the same map, which is folded exactly once by
// the reducer task regardless of how many consumers are subscribed.

use std::sync::Arc;

use ballotflow_core::{StateKey, StateMap, WorkflowState, WorkflowStatus, WorkflowStep};
use futures::stream::{self, BoxStream};
use futures::{future, StreamExt};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, instrument, warn};

use crate::client::WorkflowApiClient;
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::reducer::{Reducer, SyncInput};
use crate::retry::RetryPolicy;
use crate::source::{PushSource, SnapshotSource};
use crate::supervisor::PushSupervisor;

/// Stream of status transitions for one key (or a union of keys)
pub type StateStream = BoxStream<'static, WorkflowState>;

type SnapshotSlot = Option<Arc<Vec<WorkflowState>>>;

/// Pulls snapshots with retry and feeds them to the reducer and the
/// local-refresh channel
#[derive(Clone)]
pub(crate) struct SnapshotPuller {
    source: Arc<dyn SnapshotSource>,
    retry: RetryPolicy,
    inputs: mpsc::Sender<SyncInput>,
    refresh_tx: Arc<watch::Sender<SnapshotSlot>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl SnapshotPuller {
    /// Fetch a fresh snapshot and wait until the reducer has folded it
    pub(crate) async fn pull(&self) -> Result<Vec<WorkflowState>> {
        let states = Arc::new(self.fetch_with_retry().await?);
        self.refresh_tx.send_replace(Some(Arc::clone(&states)));

        let (applied_tx, applied_rx) = oneshot::channel();
        self.inputs
            .send(SyncInput::Snapshot {
                states: Arc::clone(&states),
                applied: Some(applied_tx),
            })
            .await
            .map_err(|_| SyncError::Closed)?;
        applied_rx.await.map_err(|_| SyncError::Closed)?;

        Ok(states.as_ref().clone())
    }

    /// Fetch with retry until success, exhaustion or shutdown
    async fn fetch_with_retry(&self) -> Result<Vec<WorkflowState>> {
        let mut shutdown_rx = self.shutdown_rx.clone();
        let mut attempt: u32 = 1;
        loop {
            if *shutdown_rx.borrow_and_update() {
                return Err(SyncError::Closed);
            }

            let fetched = tokio::select! {
                _ = shutdown_rx.changed() => return Err(SyncError::Closed),
                result = self.source.fetch_snapshot() => result,
            };

            match fetched {
                Ok(states) => return Ok(states),
                Err(e) => {
                    if !self.retry.allows_attempt(attempt + 1) {
                        return Err(SyncError::SnapshotExhausted {
                            attempts: attempt,
                            source: Box::new(e),
                        });
                    }
                    let delay = self.retry.delay_for_retry(attempt);
                    warn!(
                        error = %e,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Snapshot pull failed, retrying"
                    );
                    tokio::select! {
                        _ = shutdown_rx.changed() => {
                            debug!(attempt, "Snapshot pull abandoned on shutdown");
                            return Err(SyncError::Closed);
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
            }
        }
    }
}

struct Inner {
    puller: SnapshotPuller,
    states_rx: watch::Receiver<Arc<StateMap>>,
    snapshots_rx: watch::Receiver<SnapshotSlot>,
    shutdown_tx: watch::Sender<bool>,
}

/// Live, de-duplicated view of the workflow state shared by every consumer
///
/// Three inputs are merged into one map: snapshot pulls, the local-refresh
/// channel fed by those pulls, and the server push connection. Dropping every
/// handle (or calling [`StateSynchronizer::shutdown`]) stops the background
/// tasks.
///
/// # Example
///
/// ```ignore
/// use ballotflow_sync::{StateSynchronizer, SyncConfig};
/// use ballotflow_core::WorkflowStep;
/// use futures::StreamExt;
///
/// let sync = StateSynchronizer::connect(&SyncConfig::from_env());
/// let mut compute = sync.get(&WorkflowStep::COMPUTE, None);
/// while let Some(state) = compute.next().await {
///     println!("COMPUTE is now {}", state.status);
/// }
/// ```
#[derive(Clone)]
pub struct StateSynchronizer {
    inner: Arc<Inner>,
}

impl StateSynchronizer {
    /// Start the reducer (and the push supervisor when a push source is given
    /// and push is enabled). Must be called from within a tokio runtime.
    pub fn spawn(
        config: &SyncConfig,
        snapshots: Arc<dyn SnapshotSource>,
        push: Option<Arc<dyn PushSource>>,
    ) -> Self {
        let (input_tx, input_rx) = mpsc::channel(config.input_buffer.max(1));
        let (states_tx, states_rx) = watch::channel(Arc::new(StateMap::new()));
        let (refresh_tx, snapshots_rx) = watch::channel(None);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(Reducer::new(input_rx, states_tx, shutdown_rx.clone()).run());

        let puller = SnapshotPuller {
            source: snapshots,
            retry: config.snapshot_retry.clone(),
            inputs: input_tx.clone(),
            refresh_tx: Arc::new(refresh_tx),
            shutdown_rx: shutdown_rx.clone(),
        };

        let push_started = match push {
            Some(source) if config.push_enabled => {
                let supervisor = PushSupervisor::new(
                    source,
                    puller.clone(),
                    input_tx,
                    config.push_retry.clone(),
                    shutdown_rx,
                );
                tokio::spawn(supervisor.run());
                true
            }
            Some(_) => {
                debug!("Push source configured but push is disabled");
                false
            }
            None => false,
        };

        info!(push = push_started, "State synchronizer started");

        Self {
            inner: Arc::new(Inner {
                puller,
                states_rx,
                snapshots_rx,
                shutdown_tx,
            }),
        }
    }

    /// Start a synchronizer against the HTTP backend described by `config`
    pub fn connect(config: &SyncConfig) -> Self {
        let client = Arc::new(WorkflowApiClient::from_config(config));
        let push = if config.push_enabled {
            Some(client.clone() as Arc<dyn PushSource>)
        } else {
            None
        };
        Self::spawn(config, client, push)
    }

    /// Status transitions of one step (optionally scoped to a context id)
    ///
    /// Emits the latest known state immediately if the key was already
    /// observed, then once per status change. Changes to timestamps or other
    /// fields alone are not re-emitted.
    pub fn get(&self, step: &WorkflowStep, context_id: Option<&str>) -> StateStream {
        let key = StateKey::new(step.clone(), context_id.map(str::to_owned));
        let mut last_status: Option<WorkflowStatus> = None;

        WatchStream::new(self.inner.states_rx.clone())
            .filter_map(move |map| future::ready(map.get(&key).cloned()))
            .filter(move |state| {
                let transition = last_status != Some(state.status);
                last_status = Some(state.status);
                future::ready(transition)
            })
            .boxed()
    }

    /// Union of [`get`](Self::get) over several steps sharing one context
    ///
    /// Used for mode-dependent workflows where only one of the steps is ever
    /// expected to leave `Idle`.
    pub fn get_all_merged(&self, steps: &[WorkflowStep], context_id: Option<&str>) -> StateStream {
        stream::select_all(steps.iter().map(|step| self.get(step, context_id))).boxed()
    }

    /// Force a fresh pull and return the raw state list
    ///
    /// The result is folded into the shared map before this returns, so every
    /// `get` stream observes it. Failed pulls are retried per the configured
    /// snapshot policy.
    #[instrument(skip(self))]
    pub async fn get_snapshot(&self) -> Result<Vec<WorkflowState>> {
        if self.is_shut_down() {
            return Err(SyncError::Closed);
        }
        self.inner.puller.pull().await
    }

    /// Latest folded map, without any I/O
    pub fn current(&self) -> Arc<StateMap> {
        Arc::clone(&self.inner.states_rx.borrow())
    }

    /// Receiver over the whole map; starts with the latest version
    pub fn subscribe(&self) -> watch::Receiver<Arc<StateMap>> {
        self.inner.states_rx.clone()
    }

    /// Most recent snapshot pulled by anyone, if any
    pub fn latest_snapshot(&self) -> Option<Arc<Vec<WorkflowState>>> {
        self.inner.snapshots_rx.borrow().clone()
    }

    /// Stop the reducer, the push supervisor and any in-flight snapshot pull
    pub fn shutdown(&self) {
        info!("Shutting down state synchronizer");
        self.inner.shutdown_tx.send_replace(true);
    }

    pub fn is_shut_down(&self) -> bool {
        *self.inner.shutdown_tx.borrow()
    }
}
