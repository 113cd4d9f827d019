// Ballotflow CLI
//
// Design Decision: Use clap derive for ergonomic argument parsing.
// Design Decision: Support text/json/yaml output formats for scripting.
// Design Decision: Talk to the backend only through ballotflow-sync, the same path the UI uses.

mod commands;
mod output;

use std::path::PathBuf;

use ballotflow_sync::SyncConfig;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ballotflow")]
#[command(about = "Ballotflow CLI - Inspect workflow state and route admission")]
#[command(version)]
pub struct Cli {
    /// Workflow backend base URL
    #[arg(long, env = "BALLOTFLOW_API_URL")]
    pub api_url: Option<String>,

    /// Route tree file (YAML or JSON)
    #[arg(
        long,
        env = "BALLOTFLOW_ROUTES",
        default_value = "config/route-tree.yaml"
    )]
    pub routes: PathBuf,

    /// Output format
    #[arg(long, short, default_value = "text", value_parser = ["text", "json", "yaml"])]
    pub output: String,

    /// Suppress non-essential output
    #[arg(long, short)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the current state of every workflow step
    State {
        /// Only show states scoped to this context id
        #[arg(long, short)]
        context: Option<String>,
    },

    /// Follow status transitions as they happen
    Watch {
        /// Steps to follow (all steps of the route tree if omitted)
        steps: Vec<String>,

        /// Context id the steps are scoped to
        #[arg(long, short)]
        context: Option<String>,
    },

    /// List step routes in canonical workflow order
    Routes {
        /// Only show the neighbours of the step active on this URL
        #[arg(long)]
        from: Option<String>,
    },

    /// Ask the navigation guard whether a URL may be activated
    Check {
        /// Destination URL
        url: String,

        /// Treat the navigation as raised by the application
        #[arg(long)]
        trusted: bool,

        /// Assume the legal terms were accepted
        #[arg(long)]
        terms_accepted: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ballotflow=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!("Loaded .env from {:?}", path);
    }

    let cli = Cli::parse();
    let output_format = output::OutputFormat::from_str(&cli.output);

    let mut config = SyncConfig::from_env();
    if let Some(api_url) = &cli.api_url {
        config = config.with_api_url(api_url.clone());
    }

    match cli.command {
        Commands::State { context } => {
            commands::state::run(&config, output_format, context.as_deref()).await
        }
        Commands::Watch { steps, context } => {
            commands::watch::run(
                &config,
                &cli.routes,
                output_format,
                cli.quiet,
                steps,
                context,
            )
            .await
        }
        Commands::Routes { from } => {
            commands::routes::run(&cli.routes, output_format, from.as_deref())
        }
        Commands::Check {
            url,
            trusted,
            terms_accepted,
        } => {
            commands::check::run(
                &config,
                &cli.routes,
                output_format,
                &url,
                trusted,
                terms_accepted,
            )
            .await
        }
    }
}
