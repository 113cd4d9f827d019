// Workflow state listing command

use anyhow::{Context, Result};
use ballotflow_core::WorkflowState;
use ballotflow_sync::{StateSynchronizer, SyncConfig};
use serde::Serialize;

use crate::commands::one_shot;
use crate::output::{
    context_label, format_timestamp, print_table_header, print_table_row, OutputFormat,
};

#[derive(Debug, Serialize)]
struct StateList<'a> {
    data: &'a [WorkflowState],
    total: usize,
}

pub async fn run(config: &SyncConfig, output: OutputFormat, context: Option<&str>) -> Result<()> {
    let sync = StateSynchronizer::connect(&one_shot(config));
    let snapshot = sync.get_snapshot().await;
    sync.shutdown();

    let mut states = snapshot
        .with_context(|| format!("Failed to fetch workflow state from {}", config.base_url()))?;
    if let Some(context) = context {
        states.retain(|state| state.context_id.as_deref() == Some(context));
    }

    if !output.is_text() {
        return output.print_value(&StateList {
            data: &states,
            total: states.len(),
        });
    }

    if states.is_empty() {
        println!("No workflow states found");
        return Ok(());
    }

    print_table_header(&[
        ("STEP", 28),
        ("CONTEXT", 12),
        ("STATUS", 12),
        ("UPDATED", 19),
        ("EXCEPTION", 24),
    ]);
    for state in &states {
        let status = state.status.as_str();
        let updated = format_timestamp(state);
        let exception = state.exception_code.as_deref().unwrap_or("-");
        print_table_row(&[
            (state.step.as_str(), 28),
            (context_label(state), 12),
            (status, 12),
            (&updated, 19),
            (exception, 24),
        ]);
    }

    Ok(())
}
