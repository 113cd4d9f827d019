// Integration tests for the navigation guard

use async_trait::async_trait;
use ballotflow_core::{WorkflowState, WorkflowStatus, WorkflowStep};
use ballotflow_navigation::{
    ConfirmationKind, Departure, GuardConfig, GuardDecision, NavigationGuard, RoutePath,
    RouteTree, StateProvider, Transition,
};
use ballotflow_sync::{RetryPolicy, SnapshotSource, StateSynchronizer, SyncConfig, SyncError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use WorkflowStatus::{Complete, Error, Idle, InProgress, Ready};

const ROUTES: &str = r#"
- path: ""
  data:
    noHeader: true
- path: legal-terms
- path: welcome
- path: setup
  data:
    termsRequired: true
  children:
    - path: pre-configure
      data:
        workflowStep: PRE_CONFIGURE
        navigateAwayAction: showQuitDialog
    - path: pre-compute
      data:
        workflowStep: PRE_COMPUTE
        navigateAwayAction: showCancelDialog
        reachablePaths: [setup/pre-configure]
    - path: compute
      data:
        workflowStep: COMPUTE
        navigateAwayAction: showLeaveDialog
    - path: generate
      data:
        workflowStep: GENERATE
        navigateAwayAction: redirectToAnchor
    - path: download
      data:
        workflowStep: DOWNLOAD
- path: tally
  data:
    termsRequired: true
  children:
    - path: mixing/:ballotBoxId
      data:
        workflowStep: MIX_BALLOT_BOX
        contextParam: ballotBoxId
        reachablePaths: [tally/mixing/:ballotBoxId/overview]
"#;

// =============================================================================
// Fakes
// =============================================================================

/// Serves whatever states the test sets; can be switched to failing
#[derive(Default)]
struct StaticStates {
    states: Mutex<Vec<WorkflowState>>,
    cached: Mutex<Vec<WorkflowState>>,
    failing: AtomicBool,
}

impl StaticStates {
    fn with(states: Vec<WorkflowState>) -> Arc<Self> {
        let provider = Arc::new(Self::default());
        provider.set(states);
        provider
    }

    fn set(&self, states: Vec<WorkflowState>) {
        *self.states.lock().unwrap() = states;
    }

    fn fail_with_cached(&self, cached: Vec<WorkflowState>) {
        *self.cached.lock().unwrap() = cached;
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl StateProvider for StaticStates {
    async fn snapshot(&self) -> Result<Vec<WorkflowState>, SyncError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SyncError::stream("backend unavailable"));
        }
        Ok(self.states.lock().unwrap().clone())
    }

    fn cached(&self) -> Vec<WorkflowState> {
        self.cached.lock().unwrap().clone()
    }
}

fn guard(states: Arc<dyn StateProvider>) -> NavigationGuard {
    let tree = RouteTree::from_yaml_str(ROUTES).unwrap();
    NavigationGuard::new(states, Arc::new(tree), GuardConfig::default())
}

fn state(step: WorkflowStep, status: WorkflowStatus) -> WorkflowState {
    WorkflowState::new(step, status)
}

fn redirect(path: &str) -> GuardDecision {
    GuardDecision::Redirect(RoutePath::parse(path))
}

// =============================================================================
// Activation
// =============================================================================

#[tokio::test]
async fn test_idle_step_is_blocked() {
    let guard = guard(StaticStates::with(vec![
        state(WorkflowStep::PRE_CONFIGURE, Complete),
        state(WorkflowStep::PRE_COMPUTE, Ready),
        state(WorkflowStep::COMPUTE, Idle),
    ]));

    let decision = guard.can_activate(&Transition::to("/setup/compute")).await;
    assert_eq!(decision, redirect("setup/pre-compute"));
}

#[tokio::test]
async fn test_idle_step_denied_when_nothing_is_actionable() {
    let guard = guard(StaticStates::with(vec![
        state(WorkflowStep::PRE_CONFIGURE, Complete),
        state(WorkflowStep::COMPUTE, Idle),
    ]));

    let decision = guard.can_activate(&Transition::to("/setup/compute")).await;
    assert_eq!(decision, GuardDecision::Deny);
}

#[tokio::test]
async fn test_unlocked_steps_are_allowed() {
    let guard = guard(StaticStates::with(vec![
        state(WorkflowStep::PRE_CONFIGURE, Complete),
        state(WorkflowStep::PRE_COMPUTE, Ready),
        state(WorkflowStep::COMPUTE, InProgress),
        state(WorkflowStep::GENERATE, Error).with_exception("GenerationFailed"),
    ]));

    for path in [
        "/setup/pre-configure",
        "/setup/pre-compute",
        "/setup/compute",
        "/setup/generate",
    ] {
        let decision = guard.can_activate(&Transition::to(path)).await;
        assert_eq!(decision, GuardDecision::Allow, "{} should be allowed", path);
    }
}

#[tokio::test]
async fn test_unknown_step_state_is_not_unlocked() {
    let guard = guard(StaticStates::with(vec![state(
        WorkflowStep::PRE_CONFIGURE,
        Ready,
    )]));

    let decision = guard.can_activate(&Transition::to("/setup/download")).await;
    assert_eq!(decision, redirect("setup/pre-configure"));
}

#[tokio::test]
async fn test_completion_gate_ignores_optional_steps() {
    let guard = guard(StaticStates::with(vec![
        state(WorkflowStep::PRE_CONFIGURE, Complete),
        state(WorkflowStep::COMPUTE, Complete),
        state(WorkflowStep::DOWNLOAD, Ready).optional(),
    ]));

    let decision = guard.can_activate(&Transition::to("/")).await;
    assert_eq!(decision, GuardDecision::Allow);
}

#[tokio::test]
async fn test_completion_gate_blocks_on_one_required_step() {
    let provider = StaticStates::with(vec![
        state(WorkflowStep::PRE_CONFIGURE, Complete),
        state(WorkflowStep::COMPUTE, InProgress),
        state(WorkflowStep::DOWNLOAD, Complete).optional(),
    ]);
    let guard = guard(provider.clone());

    let decision = guard.can_activate(&Transition::to("")).await;
    assert_eq!(decision, redirect("setup/compute"));

    provider.set(vec![
        state(WorkflowStep::PRE_CONFIGURE, Complete),
        state(WorkflowStep::COMPUTE, Idle),
    ]);
    let decision = guard.can_activate(&Transition::to("")).await;
    assert_eq!(decision, GuardDecision::Deny);
}

#[tokio::test]
async fn test_completion_gate_counts_context_scoped_steps() {
    let guard = guard(StaticStates::with(vec![
        state(WorkflowStep::PRE_CONFIGURE, Complete),
        state(WorkflowStep::MIX_BALLOT_BOX, Complete).with_context("box-1"),
        state(WorkflowStep::MIX_BALLOT_BOX, Ready).with_context("box-2"),
    ]));

    let decision = guard.can_activate(&Transition::to("/")).await;
    assert_eq!(decision, GuardDecision::Deny);
}

#[tokio::test]
async fn test_redirects_to_first_required_actionable_step() {
    let guard = guard(StaticStates::with(vec![
        state(WorkflowStep::PRE_CONFIGURE, Complete),
        state(WorkflowStep::PRE_COMPUTE, Ready).optional(),
        state(WorkflowStep::COMPUTE, Error),
        state(WorkflowStep::GENERATE, Ready),
        state(WorkflowStep::DOWNLOAD, Idle),
    ]));

    let decision = guard.can_activate(&Transition::to("/setup/download")).await;
    assert_eq!(decision, redirect("setup/compute"));
}

#[tokio::test]
async fn test_trusted_transition_bypasses_checks() {
    let guard = guard(StaticStates::with(vec![state(WorkflowStep::COMPUTE, Idle)]));

    let decision = guard
        .can_activate(&Transition::to("/setup/compute").trusted())
        .await;
    assert_eq!(decision, GuardDecision::Allow);
}

#[tokio::test]
async fn test_ungated_route_is_allowed() {
    let guard = guard(StaticStates::with(vec![state(WorkflowStep::COMPUTE, Idle)]));

    assert!(guard.can_activate(&Transition::to("/welcome")).await.is_allowed());
    assert!(guard.can_activate(&Transition::to("/no/such/page")).await.is_allowed());
}

#[tokio::test]
async fn test_failed_snapshot_falls_back_to_cached_states() {
    let provider = StaticStates::with(vec![]);
    provider.fail_with_cached(vec![
        state(WorkflowStep::PRE_CONFIGURE, Complete),
        state(WorkflowStep::COMPUTE, Ready),
    ]);
    let guard = guard(provider);

    let decision = guard.can_activate(&Transition::to("/setup/compute")).await;
    assert_eq!(decision, GuardDecision::Allow);
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_linear_progression_scenario() {
    let a = WorkflowStep::PRE_CONFIGURE;
    let b = WorkflowStep::PRE_COMPUTE;
    let c = WorkflowStep::COMPUTE;
    let provider = StaticStates::with(vec![
        state(a.clone(), Idle),
        state(b.clone(), Ready),
        state(c.clone(), Idle),
    ]);
    let guard = guard(provider.clone());

    // Jumping ahead lands on the actionable step
    let decision = guard.can_activate(&Transition::to("/setup/compute")).await;
    assert_eq!(decision, redirect("setup/pre-compute"));

    // B completes and unlocks C
    provider.set(vec![
        state(a.clone(), Idle),
        state(b.clone(), Complete),
        state(c.clone(), Ready),
    ]);
    let decision = guard.can_activate(&Transition::to("/setup/compute")).await;
    assert_eq!(decision, GuardDecision::Allow);

    // C completes but A never left Idle: no terminal page yet, nothing to redirect to
    provider.set(vec![
        state(a.clone(), Idle),
        state(b.clone(), Complete),
        state(c.clone(), Complete),
    ]);
    let decision = guard.can_activate(&Transition::to("/")).await;
    assert_eq!(decision, GuardDecision::Deny);

    provider.set(vec![
        state(a, Complete),
        state(b, Complete),
        state(c, Complete),
    ]);
    let decision = guard.can_activate(&Transition::to("/")).await;
    assert_eq!(decision, GuardDecision::Allow);
}

#[tokio::test]
async fn test_ballot_box_error_does_not_leak_to_other_boxes() {
    let guard = guard(StaticStates::with(vec![
        state(WorkflowStep::PRE_CONFIGURE, Complete),
        state(WorkflowStep::MIX_BALLOT_BOX, Error)
            .with_context("box-1")
            .with_exception("BallotBoxNotClosed"),
        state(WorkflowStep::MIX_BALLOT_BOX, Idle).with_context("box-2"),
    ]));

    // box-1 is in error, which still counts as unlocked
    let decision = guard.can_activate(&Transition::to("/tally/mixing/box-1")).await;
    assert_eq!(decision, GuardDecision::Allow);

    // box-2 is judged on its own state only
    let decision = guard.can_activate(&Transition::to("/tally/mixing/box-2")).await;
    assert_eq!(decision, GuardDecision::Deny);
}

#[tokio::test]
async fn test_context_scoped_steps_are_not_redirect_targets() {
    let guard = guard(StaticStates::with(vec![
        state(WorkflowStep::PRE_CONFIGURE, Complete),
        state(WorkflowStep::MIX_BALLOT_BOX, Ready).with_context("box-1"),
        state(WorkflowStep::COMPUTE, Idle),
    ]));

    let decision = guard.can_activate(&Transition::to("/setup/compute")).await;
    assert_eq!(decision, GuardDecision::Deny);
}

#[tokio::test]
async fn test_unscoped_state_of_scoped_step_is_not_a_redirect_target() {
    let guard = guard(StaticStates::with(vec![
        state(WorkflowStep::PRE_CONFIGURE, Complete),
        state(WorkflowStep::MIX_BALLOT_BOX, Ready),
        state(WorkflowStep::DOWNLOAD, Idle),
    ]));

    let decision = guard.can_activate(&Transition::to("/setup/download")).await;
    assert_eq!(decision, GuardDecision::Deny);
}

#[tokio::test]
async fn test_completion_gate_passes_on_empty_snapshot() {
    let guard = guard(StaticStates::with(vec![]));

    let decision = guard.can_activate(&Transition::to("/")).await;
    assert_eq!(decision, GuardDecision::Allow);
}

#[tokio::test]
async fn test_guard_over_state_synchronizer() {
    struct Backend(Mutex<Vec<WorkflowState>>);

    #[async_trait]
    impl SnapshotSource for Backend {
        async fn fetch_snapshot(&self) -> ballotflow_sync::Result<Vec<WorkflowState>> {
            Ok(self.0.lock().unwrap().clone())
        }
    }

    let backend = Arc::new(Backend(Mutex::new(vec![
        state(WorkflowStep::PRE_CONFIGURE, Ready),
        state(WorkflowStep::COMPUTE, Idle),
    ])));
    let config = SyncConfig::default()
        .with_push_enabled(false)
        .with_snapshot_retry(RetryPolicy::no_retry());
    let sync = StateSynchronizer::spawn(&config, backend.clone(), None);
    let guard = guard(Arc::new(sync.clone()));

    let decision = guard.can_activate(&Transition::to("/setup/compute")).await;
    assert_eq!(decision, redirect("setup/pre-configure"));

    *backend.0.lock().unwrap() = vec![
        state(WorkflowStep::PRE_CONFIGURE, Complete),
        state(WorkflowStep::COMPUTE, Ready),
    ];
    let decision = guard.can_activate(&Transition::to("/setup/compute")).await;
    assert_eq!(decision, GuardDecision::Allow);

    // The guard's pull is visible to every other consumer of the synchronizer
    let compute = sync.current();
    assert_eq!(
        compute.get_step(&WorkflowStep::COMPUTE, None).map(|s| s.status),
        Some(Ready)
    );

    sync.shutdown();
}

// =============================================================================
// Legal terms
// =============================================================================

#[tokio::test]
async fn test_terms_gate_redirects_until_accepted() {
    let guard = guard(StaticStates::with(vec![]));

    assert_eq!(
        guard.can_activate_child(&Transition::to("/setup/compute")),
        redirect("legal-terms")
    );
    assert_eq!(
        guard.can_activate_child(&Transition::to("/tally/mixing/box-1")),
        redirect("legal-terms")
    );
    assert!(guard.can_activate_child(&Transition::to("/welcome")).is_allowed());
    assert!(guard
        .can_activate_child(&Transition::to("/setup/compute").trusted())
        .is_allowed());

    guard.accept_terms();
    assert!(guard.terms_accepted());
    assert!(guard.can_activate_child(&Transition::to("/setup/compute")).is_allowed());
}

// =============================================================================
// Deactivation
// =============================================================================

#[test]
fn test_leaving_without_back_event_is_allowed() {
    let guard = guard(StaticStates::with(vec![]));
    let departure = Departure::new("/setup/compute", "/setup/generate");
    assert_eq!(guard.can_deactivate(&departure), GuardDecision::Allow);
}

#[test]
fn test_trusted_back_navigation_is_allowed() {
    let guard = guard(StaticStates::with(vec![]));
    let departure = Departure::new("/setup/compute", "/setup/pre-compute")
        .back()
        .trusted();
    assert_eq!(guard.can_deactivate(&departure), GuardDecision::Allow);
}

#[test]
fn test_back_with_open_dialog_restores_history() {
    let guard = guard(StaticStates::with(vec![]));
    let departure = Departure::new("/setup/compute", "/setup/pre-compute")
        .back()
        .with_dialog_open();
    assert_eq!(guard.can_deactivate(&departure), GuardDecision::RestoreHistory);
}

#[test]
fn test_back_to_reachable_predecessor_is_allowed() {
    let guard = guard(StaticStates::with(vec![]));

    let departure = Departure::new("/setup/pre-compute", "/setup/pre-configure").back();
    assert_eq!(guard.can_deactivate(&departure), GuardDecision::Allow);

    let departure = Departure::new("/tally/mixing/box-1", "/tally/mixing/box-1/overview").back();
    assert_eq!(guard.can_deactivate(&departure), GuardDecision::Allow);

    // Not declared as reachable: falls through to the navigate-away action
    let departure = Departure::new("/setup/pre-compute", "/welcome").back();
    assert_eq!(
        guard.can_deactivate(&departure),
        GuardDecision::RequireConfirmation(ConfirmationKind::Cancel)
    );
}

#[test]
fn test_navigate_away_actions() {
    let guard = guard(StaticStates::with(vec![]));

    let cases = [
        (
            "/setup/pre-configure",
            GuardDecision::RequireConfirmation(ConfirmationKind::Quit),
        ),
        (
            "/setup/compute",
            GuardDecision::RequireConfirmation(ConfirmationKind::Leave),
        ),
        ("/setup/generate", GuardDecision::Redirect(RoutePath::root())),
        ("/setup/download", GuardDecision::Deny),
    ];

    for (from, expected) in cases {
        let departure = Departure::new(from, "/welcome").back();
        assert_eq!(guard.can_deactivate(&departure), expected, "leaving {}", from);
    }
}

#[test]
fn test_back_from_unknown_route_is_allowed() {
    let guard = guard(StaticStates::with(vec![]));

    let departure = Departure::new("/no/such", "/welcome").back();
    assert_eq!(guard.can_deactivate(&departure), GuardDecision::Allow);
}
