// Navigation Guard
//
// Per-transition admission check. The guard only decides; opening a
// confirmation dialog, rewriting history or performing a redirect is up to
// the caller, which then re-navigates with a trusted transition.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use ballotflow_core::{StateKey, StateMap, WorkflowState, WorkflowStatus};
use ballotflow_sync::{StateSynchronizer, SyncError};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::path::RoutePath;
use crate::registry::RoutingRegistry;
use crate::tree::{NavigateAwayAction, ResolvedRoute, RouteTree};

// ============================================================================
// Decisions and transitions
// ============================================================================

/// Confirmation dialog the caller must show before leaving a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationKind {
    Cancel,
    Leave,
    Quit,
}

/// Outcome of a guard check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "target", rename_all = "snake_case")]
pub enum GuardDecision {
    Allow,
    /// Navigate somewhere else instead
    Redirect(RoutePath),
    /// Stay on the current page
    Deny,
    /// Stay on the current page and ask the user; the dialog navigates later
    RequireConfirmation(ConfirmationKind),
    /// Stay on the current page and re-push its history entry
    RestoreHistory,
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Out-of-band marker attached to programmatic navigations
///
/// Serialized as `{"info": {"trusted": true}}`, the shape the router passes
/// through its navigation state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationInfo {
    #[serde(default)]
    pub info: TrustInfo,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustInfo {
    #[serde(default)]
    pub trusted: bool,
}

impl NavigationInfo {
    /// Navigation raised by the application itself
    pub fn trusted() -> Self {
        Self {
            info: TrustInfo { trusted: true },
        }
    }

    pub fn is_trusted(&self) -> bool {
        self.info.trusted
    }
}

/// An attempted activation of `to`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub to: RoutePath,
    pub info: NavigationInfo,
}

impl Transition {
    pub fn to(path: impl Into<RoutePath>) -> Self {
        Self {
            to: path.into(),
            info: NavigationInfo::default(),
        }
    }

    pub fn trusted(mut self) -> Self {
        self.info = NavigationInfo::trusted();
        self
    }
}

/// An attempt to leave `from` for `to`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub from: RoutePath,
    pub to: RoutePath,
    pub info: NavigationInfo,
    /// A browser back event triggered this navigation
    pub back_pending: bool,
    /// A modal dialog is currently open
    pub dialog_open: bool,
}

impl Departure {
    pub fn new(from: impl Into<RoutePath>, to: impl Into<RoutePath>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            info: NavigationInfo::default(),
            back_pending: false,
            dialog_open: false,
        }
    }

    /// Mark the departure as caused by the browser back button
    pub fn back(mut self) -> Self {
        self.back_pending = true;
        self
    }

    pub fn with_dialog_open(mut self) -> Self {
        self.dialog_open = true;
        self
    }

    pub fn trusted(mut self) -> Self {
        self.info = NavigationInfo::trusted();
        self
    }
}

// ============================================================================
// State access
// ============================================================================

/// Where the guard reads workflow state from
#[async_trait]
pub trait StateProvider: Send + Sync {
    /// Fresh list of every known state
    async fn snapshot(&self) -> Result<Vec<WorkflowState>, SyncError>;

    /// Last known states, without I/O
    fn cached(&self) -> Vec<WorkflowState>;
}

#[async_trait]
impl StateProvider for StateSynchronizer {
    async fn snapshot(&self) -> Result<Vec<WorkflowState>, SyncError> {
        self.get_snapshot().await
    }

    fn cached(&self) -> Vec<WorkflowState> {
        self.current().states()
    }
}

// ============================================================================
// Guard
// ============================================================================

/// Fixed targets used by the guard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardConfig {
    /// Page where the legal terms are accepted
    pub terms_path: RoutePath,
    /// Page `redirectToAnchor` sends the user to
    pub anchor_path: RoutePath,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            terms_path: RoutePath::parse("legal-terms"),
            anchor_path: RoutePath::root(),
        }
    }
}

pub struct NavigationGuard {
    states: Arc<dyn StateProvider>,
    tree: Arc<RouteTree>,
    registry: Arc<RoutingRegistry>,
    config: GuardConfig,
    terms_accepted: AtomicBool,
}

impl NavigationGuard {
    pub fn new(states: Arc<dyn StateProvider>, tree: Arc<RouteTree>, config: GuardConfig) -> Self {
        let registry = Arc::new(RoutingRegistry::from_tree(&tree));
        Self {
            states,
            tree,
            registry,
            config,
            terms_accepted: AtomicBool::new(false),
        }
    }

    pub fn registry(&self) -> &RoutingRegistry {
        &self.registry
    }

    pub fn tree(&self) -> &RouteTree {
        &self.tree
    }

    /// Admission check before entering `transition.to`
    #[instrument(skip(self, transition), fields(to = %transition.to))]
    pub async fn can_activate(&self, transition: &Transition) -> GuardDecision {
        if transition.info.is_trusted() {
            return GuardDecision::Allow;
        }

        let route = self.tree.resolve(&transition.to);
        let step = route.as_ref().and_then(ResolvedRoute::workflow_step);
        let terminal = transition.to.is_terminal();

        if step.is_none() && !terminal {
            debug!("Destination is not gated by a workflow step");
            return GuardDecision::Allow;
        }

        let states: StateMap = self.load_states().await.into_iter().collect();

        if let Some(step) = step {
            let context_id = route.as_ref().and_then(ResolvedRoute::context_id);
            let key = StateKey::new(step.clone(), context_id.map(str::to_owned));
            if let Some(state) = states.get(&key) {
                if state.status.is_unlocked() {
                    return GuardDecision::Allow;
                }
            }
        }

        if terminal && all_required_complete(&states) {
            return GuardDecision::Allow;
        }

        match self.current_step_path(&states) {
            Some(path) => {
                debug!(redirect = %path, "Redirecting to current actionable step");
                GuardDecision::Redirect(path)
            }
            None => GuardDecision::Deny,
        }
    }

    /// Admission check for every page below a `termsRequired` node
    pub fn can_activate_child(&self, transition: &Transition) -> GuardDecision {
        if transition.info.is_trusted() || self.terms_accepted() {
            return GuardDecision::Allow;
        }

        match self.tree.resolve(&transition.to) {
            Some(route) if route.terms_required() => {
                GuardDecision::Redirect(self.config.terms_path.clone())
            }
            _ => GuardDecision::Allow,
        }
    }

    pub fn accept_terms(&self) {
        self.terms_accepted.store(true, Ordering::SeqCst);
    }

    pub fn terms_accepted(&self) -> bool {
        self.terms_accepted.load(Ordering::SeqCst)
    }

    /// Check before leaving `departure.from`
    pub fn can_deactivate(&self, departure: &Departure) -> GuardDecision {
        if departure.info.is_trusted() || !departure.back_pending {
            return GuardDecision::Allow;
        }
        if departure.dialog_open {
            return GuardDecision::RestoreHistory;
        }

        let Some(route) = self.tree.resolve(&departure.from) else {
            debug!(from = %departure.from, "Departure route unknown, allowing");
            return GuardDecision::Allow;
        };

        let reachable = route
            .chain
            .iter()
            .rev()
            .find(|data| !data.reachable_paths.is_empty())
            .map(|data| data.reachable_paths.as_slice())
            .unwrap_or_default();
        if reachable
            .iter()
            .any(|path| RoutePath::parse(path).fill(&route.params) == departure.to)
        {
            return GuardDecision::Allow;
        }

        let action = route
            .chain
            .iter()
            .rev()
            .find_map(|data| data.navigate_away_action);
        match action {
            Some(NavigateAwayAction::ShowCancelDialog) => {
                GuardDecision::RequireConfirmation(ConfirmationKind::Cancel)
            }
            Some(NavigateAwayAction::ShowLeaveDialog) => {
                GuardDecision::RequireConfirmation(ConfirmationKind::Leave)
            }
            Some(NavigateAwayAction::ShowQuitDialog) => {
                GuardDecision::RequireConfirmation(ConfirmationKind::Quit)
            }
            Some(NavigateAwayAction::RedirectToAnchor) => {
                GuardDecision::Redirect(self.config.anchor_path.clone())
            }
            None => GuardDecision::Deny,
        }
    }

    async fn load_states(&self) -> Vec<WorkflowState> {
        match self.states.snapshot().await {
            Ok(states) => states,
            Err(e) => {
                warn!(error = %e, "Snapshot unavailable, using last known states");
                self.states.cached()
            }
        }
    }

    /// Route of the first required global step that is neither idle nor complete
    ///
    /// Steps whose route is context-scoped are never candidates, even when the
    /// backend reports an unscoped state for them.
    fn current_step_path(&self, states: &StateMap) -> Option<RoutePath> {
        self.registry
            .iter()
            .filter(|(_, path)| !path.has_placeholders())
            .find(|(step, _)| {
                states
                    .get(&StateKey::global((*step).clone()))
                    .is_some_and(|state| !state.optional && state.status.is_actionable())
            })
            .map(|(_, path)| path.clone())
    }
}

/// Completion gate: every non-optional state is complete
fn all_required_complete(states: &StateMap) -> bool {
    states
        .iter()
        .filter(|(_, state)| !state.optional)
        .all(|(_, state)| state.status == WorkflowStatus::Complete)
}
