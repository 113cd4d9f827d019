// Workflow Navigation
//
// Maps the workflow onto the application's pages and decides which page
// transitions are admissible given the live workflow state.
//
// Key design decisions:
// - The route tree is data (YAML or JSON) walked once into a step -> path index
// - Declaration order in the route tree is the canonical workflow order
// - Only one global step is actionable at a time; the guard redirects there
// - The guard returns a GuardDecision and never performs side effects itself
// - Trusted (application-raised) transitions bypass every check

pub mod error;
pub mod guard;
pub mod path;
pub mod registry;
pub mod tree;

// Re-exports for convenience
pub use error::{Result, RouteTreeError};
pub use guard::{
    ConfirmationKind, Departure, GuardConfig, GuardDecision, NavigationGuard, NavigationInfo,
    StateProvider, Transition, TrustInfo,
};
pub use path::RoutePath;
pub use registry::RoutingRegistry;
pub use tree::{NavigateAwayAction, ResolvedRoute, RouteData, RouteNode, RouteTree};
