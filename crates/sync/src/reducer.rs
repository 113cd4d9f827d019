// State reducer task
//
// The only writer of the shared StateMap. Inputs from the snapshot and push
// sources arrive on one queue and are folded one at a time; each fold that
// changes the map publishes a new version through the watch channel.

use std::sync::Arc;

use ballotflow_core::{Applied, StateMap, WorkflowState};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, trace};

/// Input accepted by the reducer
pub(crate) enum SyncInput {
    /// Full state list from a snapshot pull; `applied` fires once folded
    Snapshot {
        states: Arc<Vec<WorkflowState>>,
        applied: Option<oneshot::Sender<()>>,
    },
    /// One state delivered by the push connection
    Push(WorkflowState),
}

pub(crate) struct Reducer {
    inputs: mpsc::Receiver<SyncInput>,
    states_tx: watch::Sender<Arc<StateMap>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Reducer {
    pub(crate) fn new(
        inputs: mpsc::Receiver<SyncInput>,
        states_tx: watch::Sender<Arc<StateMap>>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            inputs,
            states_tx,
            shutdown_rx,
        }
    }

    /// Fold inputs until shutdown or until every input sender is gone
    pub(crate) async fn run(mut self) {
        loop {
            tokio::select! {
                _ = self.shutdown_rx.changed() => {
                    info!("State reducer shutting down");
                    break;
                }
                input = self.inputs.recv() => match input {
                    Some(input) => self.handle(input),
                    None => {
                        debug!("All state inputs closed, stopping reducer");
                        break;
                    }
                }
            }
        }
    }

    fn handle(&self, input: SyncInput) {
        match input {
            SyncInput::Snapshot { states, applied } => {
                let changed = self.fold(states.iter().cloned());
                debug!(count = states.len(), changed, "Applied snapshot");
                if let Some(applied) = applied {
                    let _ = applied.send(());
                }
            }
            SyncInput::Push(state) => {
                self.fold(std::iter::once(state));
            }
        }
    }

    fn fold(&self, states: impl IntoIterator<Item = WorkflowState>) -> bool {
        self.states_tx.send_if_modified(|current| {
            let map = Arc::make_mut(current);
            let mut changed = false;
            for state in states {
                let key = state.key();
                let status = state.status;
                match map.apply(state) {
                    Applied::Stale => {
                        debug!(key = %key, status = %status, "Ignored stale workflow state")
                    }
                    outcome => {
                        trace!(key = %key, status = %status, ?outcome, "Folded workflow state");
                        changed |= outcome.changed();
                    }
                }
            }
            changed
        })
    }
}
