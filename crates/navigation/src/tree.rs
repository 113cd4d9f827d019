// Declarative route tree
//
// The application's pages as a static tree of path segments with optional
// metadata per node. Loaded once from YAML or JSON; URL resolution walks it
// the way the router does (nested paths, `:param` placeholders, empty-path
// parents).

use ballotflow_core::WorkflowStep;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::error::{Result, RouteTreeError};
use crate::path::RoutePath;

/// What to do when the user navigates back from a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NavigateAwayAction {
    ShowCancelDialog,
    ShowLeaveDialog,
    ShowQuitDialog,
    /// Force navigation to the fixed anchor page
    RedirectToAnchor,
}

/// Metadata attached to a route node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteData {
    /// Step whose state gates activation of this page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_step: Option<WorkflowStep>,

    /// Paths the user may go back to from this page without confirmation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reachable_paths: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigate_away_action: Option<NavigateAwayAction>,

    #[serde(default)]
    pub header_only: bool,

    #[serde(default)]
    pub no_header: bool,

    /// Every page below this node requires the legal terms to be accepted
    #[serde(default)]
    pub terms_required: bool,

    /// Route parameter carrying the context id of a context-scoped step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_param: Option<String>,
}

/// One node of the route tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteNode {
    /// Path relative to the parent; may hold several segments and `:param` placeholders
    #[serde(default)]
    pub path: String,

    #[serde(default)]
    pub data: RouteData,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RouteNode>,
}

impl RouteNode {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn step(mut self, step: WorkflowStep) -> Self {
        self.data.workflow_step = Some(step);
        self
    }

    pub fn data(mut self, data: RouteData) -> Self {
        self.data = data;
        self
    }

    pub fn child(mut self, child: RouteNode) -> Self {
        self.children.push(child);
        self
    }

    pub(crate) fn segments(&self) -> Vec<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).collect()
    }
}

/// The application's route tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteTree {
    routes: Vec<RouteNode>,
}

/// A URL resolved against the route tree
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRoute {
    pub path: RoutePath,
    /// Data of every matched node, outermost first
    pub chain: Vec<RouteData>,
    pub params: HashMap<String, String>,
}

impl ResolvedRoute {
    /// Data of the innermost matched node
    pub fn data(&self) -> Option<&RouteData> {
        self.chain.last()
    }

    /// Step of the nearest step-bearing node, innermost first
    pub fn workflow_step(&self) -> Option<&WorkflowStep> {
        self.chain
            .iter()
            .rev()
            .find_map(|data| data.workflow_step.as_ref())
    }

    /// Context id taken from the parameter named by the nearest `contextParam`
    pub fn context_id(&self) -> Option<&str> {
        self.chain
            .iter()
            .rev()
            .find_map(|data| data.context_param.as_ref())
            .and_then(|param| self.params.get(param))
            .map(String::as_str)
    }

    pub fn terms_required(&self) -> bool {
        self.chain.iter().any(|data| data.terms_required)
    }
}

impl RouteTree {
    pub fn new(routes: Vec<RouteNode>) -> Self {
        Self { routes }
    }

    pub fn from_yaml_str(source: &str) -> Result<Self> {
        let tree: Self = serde_yaml::from_str(source)?;
        tree.validate()?;
        Ok(tree)
    }

    pub fn from_json_str(source: &str) -> Result<Self> {
        let tree: Self = serde_json::from_str(source)?;
        tree.validate()?;
        Ok(tree)
    }

    /// Load a tree from a `.yaml`, `.yml` or `.json` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| RouteTreeError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let tree = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&source)?,
            Some("json") => Self::from_json_str(&source)?,
            _ => return Err(RouteTreeError::UnsupportedFormat(path.to_path_buf())),
        };
        debug!(path = %path.display(), routes = tree.routes.len(), "Loaded route tree");
        Ok(tree)
    }

    pub fn routes(&self) -> &[RouteNode] {
        &self.routes
    }

    /// Resolve a URL to the chain of matched nodes
    pub fn resolve(&self, url: &RoutePath) -> Option<ResolvedRoute> {
        let mut chain = Vec::new();
        let mut params = Vec::new();
        if !match_nodes(&self.routes, url.segments(), &mut chain, &mut params) {
            return None;
        }

        Some(ResolvedRoute {
            path: url.clone(),
            chain: chain.into_iter().map(|node| node.data.clone()).collect(),
            params: params.into_iter().collect(),
        })
    }

    fn validate(&self) -> Result<()> {
        fn check(nodes: &[RouteNode], prefix: &str) -> Result<()> {
            for node in nodes {
                let full = format!("{}/{}", prefix, node.path.trim_matches('/'));
                if let Some(param) = &node.data.context_param {
                    if node.data.workflow_step.is_none() {
                        return Err(RouteTreeError::InvalidRoute {
                            path: full,
                            reason: format!("contextParam '{}' without a workflowStep", param),
                        });
                    }
                    let placeholder = format!(":{}", param);
                    if !full.split('/').any(|segment| segment == placeholder) {
                        return Err(RouteTreeError::InvalidRoute {
                            path: full,
                            reason: format!("contextParam '{}' is not a path parameter", param),
                        });
                    }
                }
                check(&node.children, &full)?;
            }
            Ok(())
        }
        check(&self.routes, "")
    }
}

/// Depth-first match; on success `chain` and `params` describe the match
fn match_nodes<'a>(
    nodes: &'a [RouteNode],
    remaining: &[String],
    chain: &mut Vec<&'a RouteNode>,
    params: &mut Vec<(String, String)>,
) -> bool {
    for node in nodes {
        let pattern = node.segments();
        if pattern.len() > remaining.len() {
            continue;
        }

        let params_before = params.len();
        let matched = pattern
            .iter()
            .zip(remaining)
            .all(|(expected, actual)| match expected.strip_prefix(':') {
                Some(name) => {
                    params.push((name.to_string(), actual.clone()));
                    true
                }
                None => expected == actual,
            });
        if !matched {
            params.truncate(params_before);
            continue;
        }

        let rest = &remaining[pattern.len()..];
        chain.push(node);

        if rest.is_empty() {
            // Prefer an empty-path child, as the router does; otherwise this node is the page
            match_nodes(&node.children, rest, chain, params);
            return true;
        }
        if match_nodes(&node.children, rest, chain, params) {
            return true;
        }

        chain.pop();
        params.truncate(params_before);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    const TREE: &str = r#"
- path: ""
  data:
    noHeader: true
- path: legal-terms
- path: setup
  data:
    termsRequired: true
  children:
    - path: pre-configure
      data:
        workflowStep: PRE_CONFIGURE
        navigateAwayAction: showQuitDialog
    - path: compute
      data:
        workflowStep: COMPUTE
        reachablePaths: [setup/pre-configure]
- path: tally
  children:
    - path: mixing/:ballotBoxId
      data:
        workflowStep: MIX_BALLOT_BOX
        contextParam: ballotBoxId
"#;

    #[test]
    fn test_load_yaml_tree() {
        let tree = RouteTree::from_yaml_str(TREE).unwrap();
        assert_eq!(tree.routes().len(), 4);

        let compute = &tree.routes()[2].children[1];
        assert_eq!(compute.data.workflow_step, Some(WorkflowStep::COMPUTE));
        assert_eq!(compute.data.reachable_paths, vec!["setup/pre-configure"]);
        assert_eq!(
            tree.routes()[2].children[0].data.navigate_away_action,
            Some(NavigateAwayAction::ShowQuitDialog)
        );
    }

    #[test]
    fn test_resolve_nested_step_page() {
        let tree = RouteTree::from_yaml_str(TREE).unwrap();
        let route = tree.resolve(&RoutePath::parse("/setup/compute")).unwrap();

        assert_eq!(route.chain.len(), 2);
        assert_eq!(route.workflow_step(), Some(&WorkflowStep::COMPUTE));
        assert!(route.terms_required());
        assert!(route.context_id().is_none());
    }

    #[test]
    fn test_resolve_context_scoped_page() {
        let tree = RouteTree::from_yaml_str(TREE).unwrap();
        let route = tree
            .resolve(&RoutePath::parse("/tally/mixing/box-1"))
            .unwrap();

        assert_eq!(route.workflow_step(), Some(&WorkflowStep::MIX_BALLOT_BOX));
        assert_eq!(route.context_id(), Some("box-1"));
        assert!(!route.terms_required());
    }

    #[test]
    fn test_resolve_terminal_and_unknown_paths() {
        let tree = RouteTree::from_yaml_str(TREE).unwrap();

        let terminal = tree.resolve(&RoutePath::root()).unwrap();
        assert!(terminal.data().unwrap().no_header);
        assert!(terminal.workflow_step().is_none());

        assert!(tree.resolve(&RoutePath::parse("/setup/unknown")).is_none());
        assert!(tree.resolve(&RoutePath::parse("/tally/mixing")).is_none());
    }

    #[test]
    fn test_json_tree_matches_yaml_tree() {
        let json = r#"[{"path": "setup", "children": [{"path": "compute", "data": {"workflowStep": "COMPUTE"}}]}]"#;
        let tree = RouteTree::from_json_str(json).unwrap();
        let route = tree.resolve(&RoutePath::parse("setup/compute")).unwrap();
        assert_eq!(route.workflow_step(), Some(&WorkflowStep::COMPUTE));
    }

    #[test]
    fn test_context_param_must_be_a_placeholder() {
        let yaml = r#"
- path: tally/mixing
  data:
    workflowStep: MIX_BALLOT_BOX
    contextParam: ballotBoxId
"#;
        let error = RouteTree::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(error, RouteTreeError::InvalidRoute { .. }));
    }

    #[test]
    fn test_load_dispatches_on_extension() {
        let dir = std::env::temp_dir().join(format!("ballotflow-routes-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let yaml = dir.join("routes.yaml");
        std::fs::write(&yaml, TREE).unwrap();
        assert_eq!(RouteTree::load(&yaml).unwrap().routes().len(), 4);

        let toml = dir.join("routes.toml");
        std::fs::write(&toml, "").unwrap();
        let error = RouteTree::load(&toml).unwrap_err();
        assert!(matches!(error, RouteTreeError::UnsupportedFormat(_)));

        let missing = RouteTree::load(dir.join("missing.json")).unwrap_err();
        assert!(matches!(missing, RouteTreeError::Io { .. }));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
