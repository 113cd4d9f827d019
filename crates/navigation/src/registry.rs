// Routing Registry
//
// Step -> path lookup built once from the route tree. Routes do not need to
// know their own absolute path; the registry accumulates it while walking.

use std::collections::HashMap;

use ballotflow_core::WorkflowStep;
use tracing::{debug, warn};

use crate::path::RoutePath;
use crate::tree::{ResolvedRoute, RouteNode, RouteTree};

// ============================================================================
// Registry
// ============================================================================

/// Index of step-bearing routes in canonical workflow order
///
/// Canonical order is the order in which step-annotated nodes are first
/// encountered in a depth-first walk of the tree, i.e. declaration order. A
/// step-annotated node is a leaf for the walk: its descendants are reachable
/// by explicit path only.
///
/// # Example
///
/// ```ignore
/// use ballotflow_navigation::{RouteTree, RoutingRegistry};
/// use ballotflow_core::WorkflowStep;
///
/// let tree = RouteTree::load("config/route-tree.yaml")?;
/// let registry = RoutingRegistry::from_tree(&tree);
/// let compute = registry.link_to(&WorkflowStep::COMPUTE);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RoutingRegistry {
    entries: Vec<(WorkflowStep, RoutePath)>,
    positions: HashMap<WorkflowStep, usize>,
}

impl RoutingRegistry {
    pub fn from_tree(tree: &RouteTree) -> Self {
        let mut registry = Self::default();
        let mut prefix = Vec::new();
        registry.walk(tree.routes(), &mut prefix);
        debug!(steps = registry.entries.len(), "Built routing registry");
        registry
    }

    fn walk<'a>(&mut self, nodes: &'a [RouteNode], prefix: &mut Vec<&'a str>) {
        for node in nodes {
            let depth = prefix.len();
            prefix.extend(node.segments());

            match &node.data.workflow_step {
                Some(step) => self.record(step, RoutePath::from_segments(prefix.iter())),
                None => self.walk(&node.children, prefix),
            }

            prefix.truncate(depth);
        }
    }

    fn record(&mut self, step: &WorkflowStep, path: RoutePath) {
        if let Some(&position) = self.positions.get(step) {
            warn!(
                step = %step,
                path = %path,
                registered = %self.entries[position].1,
                "Step declared twice in route tree, keeping first route"
            );
            return;
        }
        self.positions.insert(step.clone(), self.entries.len());
        self.entries.push((step.clone(), path));
    }

    /// Path of the route carrying `step`
    ///
    /// Paths of context-scoped steps keep their `:param` placeholders; use
    /// [`RoutePath::fill`] to address one context.
    pub fn link_to(&self, step: &WorkflowStep) -> Option<&RoutePath> {
        self.position(step).map(|position| &self.entries[position].1)
    }

    /// Path of the step after the one active on `current`, or `None` at the end
    pub fn link_to_next_step(&self, current: &ResolvedRoute) -> Option<RoutePath> {
        let position = self.position(current.workflow_step()?)?;
        self.entries
            .get(position + 1)
            .map(|(_, path)| path.fill(&current.params))
    }

    /// Path of the step before the one active on `current`, or `None` at the start
    pub fn link_to_previous_step(&self, current: &ResolvedRoute) -> Option<RoutePath> {
        let position = self.position(current.workflow_step()?)?;
        let previous = position.checked_sub(1)?;
        self.entries
            .get(previous)
            .map(|(_, path)| path.fill(&current.params))
    }

    /// Ordinal of `step` in canonical order
    pub fn position(&self, step: &WorkflowStep) -> Option<usize> {
        self.positions.get(step).copied()
    }

    /// Registered steps in canonical order
    pub fn steps(&self) -> impl Iterator<Item = &WorkflowStep> {
        self.entries.iter().map(|(step, _)| step)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&WorkflowStep, &RoutePath)> {
        self.entries.iter().map(|(step, path)| (step, path))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
