// Checks against the route tree shipped in config/

use ballotflow_core::WorkflowStep;
use ballotflow_navigation::{RoutePath, RouteTree, RoutingRegistry};

fn shipped_tree() -> RouteTree {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/route-tree.yaml");
    RouteTree::load(path).expect("shipped route tree should load")
}

#[test]
fn test_shipped_tree_registers_every_step_once() {
    let registry = RoutingRegistry::from_tree(&shipped_tree());
    let steps: Vec<_> = registry.steps().cloned().collect();

    assert_eq!(steps.len(), 15);
    assert_eq!(steps.first(), Some(&WorkflowStep::PRE_CONFIGURE));
    assert_eq!(steps.last(), Some(&WorkflowStep::EXPORT_TALLY));
    assert!(
        registry.position(&WorkflowStep::COMPUTE) < registry.position(&WorkflowStep::GENERATE)
    );
}

#[test]
fn test_shipped_tree_ballot_box_pages() {
    let tree = shipped_tree();
    let registry = RoutingRegistry::from_tree(&tree);

    let mixing = tree
        .resolve(&RoutePath::parse("/tally/ballot-boxes/box-1/mixing"))
        .unwrap();
    assert_eq!(mixing.workflow_step(), Some(&WorkflowStep::MIX_BALLOT_BOX));
    assert_eq!(mixing.context_id(), Some("box-1"));
    assert!(mixing.terms_required());

    assert_eq!(
        registry.link_to_next_step(&mixing).map(|p| p.to_string()),
        Some("/tally/ballot-boxes/box-1/download".to_string())
    );
}

#[test]
fn test_shipped_tree_terminal_page() {
    let tree = shipped_tree();
    let terminal = tree.resolve(&RoutePath::root()).unwrap();
    assert!(terminal.workflow_step().is_none());
    assert!(!terminal.terms_required());
}
