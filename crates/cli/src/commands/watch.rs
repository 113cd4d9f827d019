// Live status transitions command

use std::path::Path;

use anyhow::Result;
use ballotflow_core::WorkflowStep;
use ballotflow_navigation::RoutingRegistry;
use ballotflow_sync::{StateSynchronizer, SyncConfig};
use futures::StreamExt;

use crate::commands::{bounded_snapshots, load_routes};
use crate::output::{context_label, format_timestamp, OutputFormat};

pub async fn run(
    config: &SyncConfig,
    routes: &Path,
    output: OutputFormat,
    quiet: bool,
    steps: Vec<String>,
    context: Option<String>,
) -> Result<()> {
    let steps: Vec<WorkflowStep> = if steps.is_empty() {
        let tree = load_routes(routes)?;
        RoutingRegistry::from_tree(&tree).steps().cloned().collect()
    } else {
        steps.into_iter().map(WorkflowStep::from).collect()
    };

    let sync = StateSynchronizer::connect(&bounded_snapshots(config));
    let mut transitions = sync.get_all_merged(&steps, context.as_deref());

    if !quiet && output.is_text() {
        eprintln!(
            "Watching {} step(s) on {} (Ctrl+C to stop)",
            steps.len(),
            config.base_url()
        );
    }

    // Populate the map; pushed updates follow on their own
    let initial = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            sync.shutdown();
            return Ok(());
        }
        result = sync.get_snapshot() => result,
    };
    if let Err(e) = initial {
        tracing::warn!(error = %e, "Initial snapshot failed, waiting for pushed updates");
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            next = transitions.next() => {
                let Some(state) = next else { break };
                if output.is_text() {
                    println!(
                        "{}  {:<28} {:<12} {:<12} {}",
                        format_timestamp(&state),
                        state.step,
                        context_label(&state),
                        state.status,
                        state.exception_code.as_deref().unwrap_or(""),
                    );
                } else {
                    output.print_line(&state)?;
                }
            }
        }
    }

    sync.shutdown();
    Ok(())
}
