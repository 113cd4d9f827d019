// Input sources for the state synchronizer
//
// The synchronizer never talks HTTP directly; it pulls snapshots and opens
// push connections through these traits. WorkflowApiClient is the production
// implementation; tests provide in-memory ones.

use async_trait::async_trait;
use ballotflow_core::WorkflowState;
use futures::stream::BoxStream;

use crate::error::Result;

/// Stream of pushed states; an `Err` item other than a decode error ends the connection
pub type PushStream = BoxStream<'static, Result<WorkflowState>>;

/// On-demand pull of the full list of workflow states
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<Vec<WorkflowState>>;
}

/// Long-lived server push connection, one WorkflowState per message
#[async_trait]
pub trait PushSource: Send + Sync {
    async fn connect(&self) -> Result<PushStream>;
}
