// Workflow State Model
//
// Types shared by the state synchronizer, the routing registry and the
// navigation guard.
//
// Key design decisions:
// - WorkflowStep is an opaque identifier; ordering comes from the route tree, not from here
// - A WorkflowState is identified by its StateKey (step, optionally scoped by a context id)
// - StateMap keeps only the latest state per key; there is no client-side history
// - Records may carry a backend sequence number, in which case out-of-order writes are dropped

pub mod map;
pub mod state;
pub mod step;

// Re-exports for convenience
pub use map::{Applied, StateMap};
pub use state::{StateKey, WorkflowState, WorkflowStatus};
pub use step::WorkflowStep;
