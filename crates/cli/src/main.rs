//! `qflow` CLI entry-point.
//!
//! Available sub-commands:
//! - `serve`    — start the API server.
//! - `run`      — execute a catalog workflow and print the report.
//! - `validate` — validate a workflow JSON file.
//! - `list`     — list catalog workflows.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "qflow",
    about = "Declarative query-workflow orchestration engine",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the REST API server.
    Serve {
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,
    },
    /// Execute a catalog workflow and print the execution report as JSON.
    Run {
        /// Name of a workflow from the static catalog.
        workflow: String,
        /// Query string substituted into the workflow's input templates.
        query: String,
    },
    /// Validate a workflow definition JSON file.
    Validate {
        /// Path to the workflow JSON file.
        path: std::path::PathBuf,
    },
    /// List the workflows available in the static catalog.
    List,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { bind } => {
            info!("Starting API server on {bind}");
            let registry = Arc::new(actions::builtin_registry());
            api::serve(&bind, registry).await.expect("server failed");
        }
        Command::Run { workflow, query } => {
            let Some(definition) = catalog::find(&workflow) else {
                eprintln!("unknown workflow '{workflow}'");
                std::process::exit(2);
            };

            let executor = engine::Executor::new(Arc::new(actions::builtin_registry()));
            let result = executor.run(&definition, &query).await;

            println!(
                "{}",
                serde_json::to_string_pretty(&result).expect("report serialises")
            );
            if !result.success {
                std::process::exit(1);
            }
        }
        Command::Validate { path } => {
            let content = std::fs::read_to_string(&path)
                .unwrap_or_else(|e| panic!("cannot read file {}: {e}", path.display()));

            let definition: engine::WorkflowDefinition = serde_json::from_str(&content)
                .unwrap_or_else(|e| panic!("invalid JSON: {e}"));

            match engine::sequence(&definition.nodes) {
                Ok(order) => {
                    println!("✅ Workflow is valid. Execution order: {order:?}");
                }
                Err(e) => {
                    eprintln!("❌ Validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Command::List => {
            for wf in catalog::all() {
                println!("{:<20} {}", wf.name, wf.description);
            }
        }
    }
}
