use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};

use super::graph::{Graph, Link, Node};
use super::parse::{RawGraph, parse_graph_json};

pub fn load_graph(path: &Path) -> Result<Graph> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read graph file {}", path.display()))?;
    let parsed = parse_graph_json(&raw)
        .with_context(|| format!("failed to parse graph file {}", path.display()))?;
    build_graph(parsed)
}

fn build_graph(raw: RawGraph) -> Result<Graph> {
    let mut seen = HashSet::with_capacity(raw.nodes.len());
    let mut nodes = Vec::with_capacity(raw.nodes.len());

    for raw_node in raw.nodes {
        if raw_node.id.is_empty() {
            return Err(anyhow!("graph contains a node with an empty id"));
        }
        if !seen.insert(raw_node.id.clone()) {
            return Err(anyhow!("duplicate node id {}", raw_node.id));
        }

        let mut groups = Vec::with_capacity(raw_node.groups.len());
        for group in raw_node.groups {
            if !groups.contains(&group) {
                groups.push(group);
            }
        }

        nodes.push(Node {
            id: raw_node.id,
            groups,
        });
    }

    let mut links = Vec::with_capacity(raw.links.len());
    for (index, raw_link) in raw.links.into_iter().enumerate() {
        let source = raw_link.source.into_id();
        let target = raw_link.target.into_id();

        if !seen.contains(&source) || !seen.contains(&target) {
            return Err(anyhow!(
                "link {index} references unknown node ({source} -- {target})"
            ));
        }

        links.push(Link {
            source,
            target,
            weights: raw_link.weights,
            attribs: raw_link.attribs,
        });
    }

    Ok(Graph { nodes, links })
}
