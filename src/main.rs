mod data;
mod engine;
mod util;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{debug, info};

use data::Graph;
use engine::physics::{LayoutMode, LayoutParams, build_simulation};
use engine::query::{Dialect, parse_filter};
use engine::{
    FilterParams, adjacency_of, apply_filters, communities_of, components_of, merge_same_entity,
    search_nodes,
};
use util::gene_name;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Reduce a graph to its active subgraph
    Filter {
        input: PathBuf,
        /// Output path; stdout when omitted
        #[arg(long)]
        output: Option<PathBuf>,
        /// Link/attribute filter query
        #[arg(long, default_value = "")]
        links: String,
        /// Node/group filter query
        #[arg(long, default_value = "")]
        nodes: String,
        /// Minimum link weight, pairs below it are dropped
        #[arg(long, default_value = "0")]
        threshold: f64,
        #[arg(long, default_value = "0")]
        min_comp_size: usize,
        #[arg(long)]
        max_comp_size: Option<usize>,
        /// Minimum component average degree
        #[arg(long, default_value = "0")]
        density: f64,
        #[arg(long, default_value = "0")]
        min_neighborhood: usize,
        /// Restrict to these node ids (repeatable)
        #[arg(long)]
        keep_id: Vec<String>,
        /// Merge same-entity nodes before filtering
        #[arg(long)]
        merge: bool,
    },
    /// Collapse nodes that represent the same biological entity
    Merge {
        input: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run the force layout and emit node positions
    Layout {
        input: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, default_value = "300")]
        ticks: usize,
        #[arg(long, value_enum, default_value = "links")]
        mode: ModeArg,
        #[arg(long, default_value = "1280")]
        width: f32,
        #[arg(long, default_value = "920")]
        height: f32,
        #[arg(long, default_value = "0.02")]
        gravity: f32,
        #[arg(long, default_value = "28")]
        charge: f32,
        /// Also separate annotation groups around their centroids
        #[arg(long)]
        group_repulsion: bool,
    },
    /// Print graph statistics
    Stats {
        input: PathBuf,
        /// How many top-degree nodes to list
        #[arg(long, default_value = "10")]
        top: usize,
    },
    /// Fuzzy-search nodes by gene name or id
    Search {
        input: PathBuf,
        query: String,
        #[arg(long, default_value = "10")]
        limit: usize,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Links,
    Circular,
    Community,
}

impl From<ModeArg> for LayoutMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Links => Self::Links,
            ModeArg::Circular => Self::Circular,
            ModeArg::Community => Self::Community,
        }
    }
}

#[derive(Serialize)]
struct PositionRow<'a> {
    id: &'a str,
    x: f32,
    y: f32,
}

#[derive(Serialize)]
struct PositionsOut<'a> {
    positions: Vec<PositionRow<'a>>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match Cli::parse().command {
        Command::Filter {
            input,
            output,
            links,
            nodes,
            threshold,
            min_comp_size,
            max_comp_size,
            density,
            min_neighborhood,
            keep_id,
            merge,
        } => {
            let mut graph = data::load_graph(&input)?;
            info!(
                nodes = graph.node_count(),
                links = graph.link_count(),
                "graph loaded"
            );

            if merge {
                graph = merge_same_entity(graph)?;
                debug!(nodes = graph.node_count(), "same-entity nodes merged");
            }

            let params = FilterParams {
                links_query: parse_filter(&links, Dialect::Links)?,
                nodes_query: parse_filter(&nodes, Dialect::Nodes)?,
                keep_ids: if keep_id.is_empty() {
                    None
                } else {
                    Some(keep_id.into_iter().collect::<HashSet<_>>())
                },
                threshold,
                min_comp_size,
                max_comp_size,
                density,
                min_neighborhood,
            };

            let reduced = apply_filters(&graph, &params);
            info!(
                nodes = reduced.node_count(),
                links = reduced.link_count(),
                "active subgraph"
            );
            write_json(output.as_deref(), &reduced)
        }
        Command::Merge { input, output } => {
            let graph = data::load_graph(&input)?;
            let merged = merge_same_entity(graph)?;
            info!(nodes = merged.node_count(), "same-entity nodes merged");
            write_json(output.as_deref(), &merged)
        }
        Command::Layout {
            input,
            output,
            ticks,
            mode,
            width,
            height,
            gravity,
            charge,
            group_repulsion,
        } => {
            let graph = data::load_graph(&input)?;
            let params = LayoutParams {
                mode: mode.into(),
                width,
                height,
                gravity_strength: gravity,
                charge_strength: charge,
                group_repulsion,
                ..LayoutParams::default()
            };

            let mut simulation = build_simulation(&graph, &params);
            let ran = simulation.run(ticks);
            info!(ticks = ran, alpha = simulation.alpha(), "layout settled");

            let positions = PositionsOut {
                positions: simulation
                    .positions()
                    .map(|(id, position)| PositionRow {
                        id,
                        x: position.x,
                        y: position.y,
                    })
                    .collect(),
            };
            write_json(output.as_deref(), &positions)
        }
        Command::Stats { input, top } => {
            let graph = data::load_graph(&input)?;
            print_stats(&graph, top);
            Ok(())
        }
        Command::Search {
            input,
            query,
            limit,
        } => {
            let graph = data::load_graph(&input)?;
            for (id, score) in search_nodes(&graph, &query, limit) {
                println!("{score:>6}  {}  {id}", gene_name(&id));
            }
            Ok(())
        }
    }
}

fn write_json<T: Serialize>(output: Option<&Path>, value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    match output {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}

fn print_stats(graph: &Graph, top: usize) {
    let (components, sizes) = components_of(graph);
    let communities = communities_of(graph);
    let community_count = communities.values().collect::<HashSet<_>>().len();
    let largest = sizes.values().copied().max().unwrap_or(0);

    println!("nodes:       {}", graph.node_count());
    println!("links:       {}", graph.link_count());
    println!("components:  {} (largest {largest})", sizes.len());
    println!("communities: {community_count}");

    let adjacency = adjacency_of(graph);
    let mut ranked: Vec<(&String, usize)> = graph
        .nodes
        .iter()
        .map(|node| (&node.id, adjacency.get(&node.id).copied().unwrap_or(0)))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    println!("top degree:");
    for (id, degree) in ranked.into_iter().take(top) {
        let component_size = components
            .get(id)
            .and_then(|component| sizes.get(component))
            .copied()
            .unwrap_or(1);
        println!("  {degree:>4}  {:<12}  comp {component_size:>4}  {id}", gene_name(id));
    }
}
