// Keyed fold of workflow states

use std::collections::HashMap;
use tracing::trace;

use crate::state::{StateKey, WorkflowState};
use crate::step::WorkflowStep;

/// Outcome of folding one state into a [`StateMap`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// First time this key was observed
    Inserted,
    /// Replaced the previous state for this key
    Updated,
    /// Identical to the stored state
    Unchanged,
    /// Older than the stored state (by sequence number); discarded
    Stale,
}

impl Applied {
    pub fn changed(self) -> bool {
        matches!(self, Applied::Inserted | Applied::Updated)
    }
}

/// Latest known WorkflowState per key
///
/// Entries are never removed. An incoming state replaces the stored one unless
/// both carry a sequence number and the incoming one is lower.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateMap {
    entries: HashMap<StateKey, WorkflowState>,
}

impl StateMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one state into the map
    pub fn apply(&mut self, state: WorkflowState) -> Applied {
        let key = state.key();
        match self.entries.get_mut(&key) {
            None => {
                self.entries.insert(key, state);
                Applied::Inserted
            }
            Some(current) => {
                if let (Some(stored), Some(incoming)) = (current.sequence, state.sequence) {
                    if incoming < stored {
                        trace!(key = %key, stored, incoming, "Discarding out-of-order state");
                        return Applied::Stale;
                    }
                }
                if *current == state {
                    return Applied::Unchanged;
                }
                *current = state;
                Applied::Updated
            }
        }
    }

    /// Fold several states in order; returns whether anything changed
    pub fn apply_all(&mut self, states: impl IntoIterator<Item = WorkflowState>) -> bool {
        let mut changed = false;
        for state in states {
            changed |= self.apply(state).changed();
        }
        changed
    }

    pub fn get(&self, key: &StateKey) -> Option<&WorkflowState> {
        self.entries.get(key)
    }

    pub fn get_step(&self, step: &WorkflowStep, context_id: Option<&str>) -> Option<&WorkflowState> {
        self.entries
            .get(&StateKey::new(step.clone(), context_id.map(str::to_owned)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StateKey, &WorkflowState)> {
        self.entries.iter()
    }

    /// All known states, in no particular order
    pub fn states(&self) -> Vec<WorkflowState> {
        self.entries.values().cloned().collect()
    }
}

impl FromIterator<WorkflowState> for StateMap {
    fn from_iter<I: IntoIterator<Item = WorkflowState>>(iter: I) -> Self {
        let mut map = StateMap::new();
        map.apply_all(iter);
        map
    }
}
