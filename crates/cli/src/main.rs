//! `flowcanvas` CLI entry-point.
//!
//! Available sub-commands:
//! - `validate` — parse a flow snapshot file and report its shape.
//! - `vars`     — list the variables available to a node.
//! - `run`      — execute a producer node and print the derived output.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use engine::{snapshot, Coordinator, GraphStore};
use providers::{GeminiGenerator, ReqwestSender};

#[derive(Parser)]
#[command(
    name = "flowcanvas",
    about = "Node-graph dataflow runner: text, LLM, and HTTP nodes with variable substitution",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a flow snapshot JSON file.
    Validate {
        /// Path to the snapshot file.
        path: PathBuf,
    },
    /// List the variables available to a node (local + global).
    Vars {
        /// Path to the snapshot file.
        path: PathBuf,
        /// Id of the node to inspect.
        node_id: String,
    },
    /// Run a producer node and print the derived node's text.
    Run {
        /// Path to the snapshot file.
        path: PathBuf,
        /// Id of the producer node to trigger.
        node_id: String,
        /// Write the mutated flow back out as a snapshot.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn load_store(path: &PathBuf) -> Result<Arc<GraphStore>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read file {}", path.display()))?;
    let store = Arc::new(GraphStore::new());
    snapshot::import_str(&store, &content).context("snapshot rejected")?;
    Ok(store)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Validate { path } => {
            let store = load_store(&path)?;
            println!(
                "✅ Snapshot is valid: {} nodes, {} edges.",
                store.node_count(),
                store.edge_count()
            );
        }

        Command::Vars { path, node_id } => {
            let store = load_store(&path)?;
            if store.get_node(&node_id).is_none() {
                bail!("node '{node_id}' not found in the snapshot");
            }
            let (nodes, edges) = store.graph();
            let ancestors = engine::find_ancestors(&node_id, &nodes, &edges);
            let available = engine::vars::available_variables(&ancestors, &store.globals());
            if available.is_empty() {
                println!("(no variables available)");
            }
            for name in available {
                println!("${name}");
            }
        }

        Command::Run { path, node_id, out } => {
            let store = load_store(&path)?;
            let coordinator = Coordinator::new(
                store.clone(),
                Arc::new(GeminiGenerator::from_env()),
                Arc::new(ReqwestSender::new()),
            );

            info!("running node '{node_id}'");
            let outcome = coordinator.run_node(&node_id).await?;

            if let Some(node) = store.get_node(&outcome.derived_node_id) {
                if let engine::NodeData::Text { text } = node.data {
                    println!("{text}");
                }
            }

            if let Some(out_path) = out {
                let json = snapshot::export_string(&store)?;
                std::fs::write(&out_path, json)
                    .with_context(|| format!("cannot write {}", out_path.display()))?;
                info!("wrote updated snapshot to {}", out_path.display());
            }

            if !outcome.status.is_success() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
