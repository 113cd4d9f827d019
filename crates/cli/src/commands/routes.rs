// Route listing command

use std::path::Path;

use anyhow::{bail, Result};
use ballotflow_navigation::{RoutePath, RoutingRegistry};
use serde::Serialize;

use crate::commands::load_routes;
use crate::output::{print_field, print_table_header, print_table_row, OutputFormat};

#[derive(Debug, Serialize)]
struct StepRoute {
    position: usize,
    step: String,
    path: String,
}

#[derive(Debug, Serialize)]
struct Neighbours {
    current: Option<String>,
    previous: Option<String>,
    next: Option<String>,
}

pub fn run(routes: &Path, output: OutputFormat, from: Option<&str>) -> Result<()> {
    let tree = load_routes(routes)?;
    let registry = RoutingRegistry::from_tree(&tree);

    if let Some(url) = from {
        let path = RoutePath::parse(url);
        let Some(route) = tree.resolve(&path) else {
            bail!("No route matches {}", path);
        };
        let neighbours = Neighbours {
            current: route.workflow_step().map(ToString::to_string),
            previous: registry
                .link_to_previous_step(&route)
                .map(|p| p.to_string()),
            next: registry.link_to_next_step(&route).map(|p| p.to_string()),
        };

        if !output.is_text() {
            return output.print_value(&neighbours);
        }
        print_field("Step", neighbours.current.as_deref().unwrap_or("-"));
        print_field("Previous", neighbours.previous.as_deref().unwrap_or("-"));
        print_field("Next", neighbours.next.as_deref().unwrap_or("-"));
        return Ok(());
    }

    let entries: Vec<StepRoute> = registry
        .iter()
        .enumerate()
        .map(|(position, (step, path))| StepRoute {
            position,
            step: step.to_string(),
            path: path.to_string(),
        })
        .collect();

    if !output.is_text() {
        return output.print_value(&serde_json::json!({ "data": entries, "total": entries.len() }));
    }

    if entries.is_empty() {
        println!("No step routes found in {}", routes.display());
        return Ok(());
    }

    print_table_header(&[("#", 4), ("STEP", 28), ("PATH", 40)]);
    for entry in &entries {
        let position = entry.position.to_string();
        print_table_row(&[(&position, 4), (&entry.step, 28), (&entry.path, 40)]);
    }

    Ok(())
}
