// SPDX-License-Identifier: MIT OR Apache-2.0
//! `nodeflow` - command-line runner for dataflow graphs
//!
//! Loads a persisted graph, runs it for a number of ticks or on the periodic
//! timer, and prints the global outputs (generated shader programs included).
//!
//! ```bash
//! nodeflow demo --save demo.ron
//! nodeflow run demo.ron --ticks 10
//! nodeflow run demo.ron --duration-ms 500 --interval-ms 16 --strict
//! ```

mod demo;
mod loader;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nodeflow_graph::{create_default_registry, ComposerLibrary, ErrorPolicy, Graph, NodeRegistry, Settings, Value};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "nodeflow")]
#[command(about = "Run dataflow graphs and generate shader programs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a graph and run it
    Run {
        /// Graph file (.json or .ron)
        graph: PathBuf,

        /// Settings file (.ron)
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Number of synchronous ticks
        #[arg(long, default_value_t = 1)]
        ticks: u32,

        /// Run on the periodic timer for this long instead of a fixed tick count
        #[arg(long)]
        duration_ms: Option<u64>,

        /// Timer interval; defaults to the settings value
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Fail on the first node error instead of stopping quietly
        #[arg(long)]
        strict: bool,

        /// Set a node property before running, as <node>.<property>=<value>
        #[arg(long = "set")]
        assignments: Vec<String>,

        /// Print the global outputs as JSON
        #[arg(long)]
        json: bool,

        /// Save the graph state after running
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// List the registered node types
    Types,

    /// Print the execution order of a graph
    Order {
        /// Graph file (.json or .ron)
        graph: PathBuf,
    },

    /// Build the sample shader graph and run one tick
    Demo {
        /// Save the sample graph to this file
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

/// Global outputs of a run
#[derive(Serialize)]
struct RunReport<'a> {
    graph: &'a str,
    iteration: u64,
    errors: bool,
    outputs: Vec<(&'a str, &'a Value)>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("nodeflow_graph=info".parse()?)
        .add_directive("nodeflow_app=info".parse()?);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let library = ComposerLibrary::builtin();
    let registry = create_default_registry(&library);

    match cli.command {
        Commands::Run {
            graph,
            settings,
            ticks,
            duration_ms,
            interval_ms,
            strict,
            assignments,
            json,
            save,
        } => {
            let mut settings = loader::load_settings(settings.as_deref())?;
            if strict {
                settings.error_policy = ErrorPolicy::Strict;
            }
            if let Some(interval_ms) = interval_ms {
                settings.default_interval_ms = interval_ms;
            }
            let mut graph = open_graph(&graph, &registry, settings)?;
            for assignment in &assignments {
                let (node, property, value) = loader::parse_assignment(assignment)?;
                graph.set_property(node, property, value)?;
            }

            run_graph(&mut graph, ticks, duration_ms.map(Duration::from_millis)).await?;
            print_outputs(&graph, json)?;
            if let Some(path) = save {
                loader::save_snapshot(&path, &graph.serialize())?;
                tracing::info!("Saved graph to {}", path.display());
            }
            Ok(())
        }
        Commands::Types => {
            list_types(&registry);
            Ok(())
        }
        Commands::Order { graph } => {
            let mut graph = open_graph(&graph, &registry, Settings::default())?;
            let order = graph.execution_order().to_vec();
            for (index, id) in order.into_iter().enumerate() {
                if let Some(node) = graph.node(id) {
                    println!("{index:>4}  #{id:<5} {:<20} {}", node.node_type, node.title);
                }
            }
            Ok(())
        }
        Commands::Demo { save } => {
            let mut graph = demo::build_demo_graph(&registry, Settings::default())?;
            if let Some(path) = save {
                loader::save_snapshot(&path, &graph.serialize())?;
                tracing::info!("Saved demo graph to {}", path.display());
            }
            run_graph(&mut graph, 1, None).await?;
            print_outputs(&graph, false)
        }
    }
}

fn open_graph(path: &Path, registry: &NodeRegistry, settings: Settings) -> Result<Graph> {
    let snapshot = loader::load_snapshot(path)?;
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("graph");
    let mut graph = Graph::with_settings(name, settings);
    if graph.configure(&snapshot, registry, false) {
        tracing::warn!("Some nodes of {} could not be restored", path.display());
    }
    tracing::info!(
        nodes = graph.node_count(),
        links = graph.link_count(),
        "Loaded graph {}",
        path.display()
    );
    Ok(graph)
}

async fn run_graph(graph: &mut Graph, ticks: u32, duration: Option<Duration>) -> Result<()> {
    let interval = graph.settings().default_interval();
    graph.start(interval).context("Graph failed to start")?;
    let result = match duration {
        Some(duration) => graph.run_for(duration).await,
        None => graph.run_step(ticks),
    };
    result.context("Graph execution failed")?;
    graph.stop();

    tracing::info!(
        iteration = graph.iteration(),
        fixed_time = graph.fixed_time(),
        last_execution_ms = graph.last_execution_time().as_millis() as u64,
        "Run finished"
    );
    if graph.errors_in_execution() {
        tracing::warn!("Errors occurred during execution");
    }
    Ok(())
}

fn print_outputs(graph: &Graph, json: bool) -> Result<()> {
    if json {
        let report = RunReport {
            graph: &graph.name,
            iteration: graph.iteration(),
            errors: graph.errors_in_execution(),
            outputs: graph.global_outputs().map(|(name, slot)| (name, &slot.value)).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for (name, slot) in graph.global_outputs() {
        match &slot.value {
            Value::String(text) => println!("// ---- {name} ----\n{text}"),
            other => println!("{name} = {other:?}"),
        }
    }
    Ok(())
}

fn list_types(registry: &NodeRegistry) {
    for node_type in registry.types() {
        println!(
            "{:<20} {:<10} {}",
            node_type.id,
            format!("{:?}", node_type.category),
            node_type.description
        );
    }
}
