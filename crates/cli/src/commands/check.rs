// Route admission check command

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use ballotflow_navigation::{GuardConfig, GuardDecision, NavigationGuard, Transition};
use ballotflow_sync::{StateSynchronizer, SyncConfig};
use serde::Serialize;

use crate::commands::{load_routes, one_shot};
use crate::output::{print_field, OutputFormat};

#[derive(Debug, Serialize)]
struct CheckResult {
    url: String,
    step: Option<String>,
    terms: GuardDecision,
    activation: GuardDecision,
}

pub async fn run(
    config: &SyncConfig,
    routes: &Path,
    output: OutputFormat,
    url: &str,
    trusted: bool,
    terms_accepted: bool,
) -> Result<()> {
    let tree = Arc::new(load_routes(routes)?);
    let sync = StateSynchronizer::connect(&one_shot(config));
    let guard = NavigationGuard::new(Arc::new(sync.clone()), tree.clone(), GuardConfig::default());
    if terms_accepted {
        guard.accept_terms();
    }

    let mut transition = Transition::to(url);
    if trusted {
        transition = transition.trusted();
    }

    let terms = guard.can_activate_child(&transition);
    let activation = guard.can_activate(&transition).await;
    sync.shutdown();

    let result = CheckResult {
        url: transition.to.to_string(),
        step: tree
            .resolve(&transition.to)
            .and_then(|route| route.workflow_step().map(ToString::to_string)),
        terms,
        activation,
    };

    if !output.is_text() {
        return output.print_value(&result);
    }

    print_field("URL", &result.url);
    print_field("Step", result.step.as_deref().unwrap_or("-"));
    print_field("Terms", &describe(&result.terms));
    print_field("Activation", &describe(&result.activation));
    Ok(())
}

fn describe(decision: &GuardDecision) -> String {
    match decision {
        GuardDecision::Allow => "allow".to_string(),
        GuardDecision::Redirect(path) => format!("redirect to {}", path),
        GuardDecision::Deny => "deny".to_string(),
        GuardDecision::RequireConfirmation(kind) => format!("confirm ({:?})", kind).to_lowercase(),
        GuardDecision::RestoreHistory => "restore history".to_string(),
    }
}
