use std::collections::HashMap;
use std::collections::hash_map::Entry;

use thiserror::Error;

use crate::data::{Graph, Link, Node};

use super::topology::UnionFind;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MergeError {
    #[error("cannot merge node id {id:?}: empty entry")]
    EmptyEntry { id: String },
}

/// Collapse nodes that represent the same biological entity: ids whose first
/// protein segment matches after isoform stripping (`P1-2` -> `P1`). The
/// input graph is consumed; on any synthesis failure the whole merge aborts
/// and no partially merged graph is produced.
pub fn merge_same_entity(graph: Graph) -> Result<Graph, MergeError> {
    let mut sets = UnionFind::new(graph.nodes.len());
    let mut seen: HashMap<String, usize> = HashMap::new();
    for (index, node) in graph.nodes.iter().enumerate() {
        let key = merge_key(&node.id);
        match seen.get(key) {
            Some(&first) => sets.union(first, index),
            None => {
                seen.insert(key.to_owned(), index);
            }
        }
    }

    // Member lists per merge group, ordered by first appearance.
    let mut members: Vec<Vec<usize>> = Vec::new();
    let mut group_of_root: HashMap<usize, usize> = HashMap::new();
    for index in 0..graph.nodes.len() {
        let root = sets.find(index);
        let group = *group_of_root.entry(root).or_insert_with(|| {
            members.push(Vec::new());
            members.len() - 1
        });
        members[group].push(index);
    }

    let mut nodes = Vec::with_capacity(members.len());
    let mut id_map: HashMap<String, String> = HashMap::with_capacity(graph.nodes.len());
    for group in &members {
        let merged = synthesize_node(group.iter().map(|&index| &graph.nodes[index]))?;
        for &index in group {
            id_map.insert(graph.nodes[index].id.clone(), merged.id.clone());
        }
        nodes.push(merged);
    }

    let links = combine_links(&graph.links, &id_map);
    Ok(Graph { nodes, links })
}

/// Grouping key: the first `_`-delimited segment of the id's first entry,
/// with any `-isoform` suffix stripped.
fn merge_key(id: &str) -> &str {
    let entry = id.split(';').next().unwrap_or(id);
    let protein = entry.split('_').next().unwrap_or(entry);
    protein.split('-').next().unwrap_or(protein)
}

struct EntryParts {
    protein: String,
    gene: Option<String>,
    sites: Vec<String>,
}

fn parse_entry(id: &str, entry: &str) -> Result<EntryParts, MergeError> {
    if entry.is_empty() {
        return Err(MergeError::EmptyEntry { id: id.to_owned() });
    }

    let mut segments = entry.splitn(3, '_');
    let protein = segments.next().unwrap_or(entry);
    let protein = protein.split('-').next().unwrap_or(protein).to_owned();
    let gene = segments.next().map(str::to_owned);
    let sites = segments
        .next()
        .map(|sites| {
            sites
                .split(',')
                .filter(|site| !site.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();

    Ok(EntryParts {
        protein,
        gene,
        sites,
    })
}

/// Union the biological entries and groups of all member nodes into one node.
/// Entries are keyed by `protein_gene`; phosphosite lists are deduplicated in
/// first-seen order and re-joined with commas.
fn synthesize_node<'a>(group: impl Iterator<Item = &'a Node>) -> Result<Node, MergeError> {
    let mut entry_order: Vec<(String, Option<String>)> = Vec::new();
    let mut entry_sites: HashMap<(String, Option<String>), Vec<String>> = HashMap::new();
    let mut groups: Vec<String> = Vec::new();

    for node in group {
        for entry in node.id.split(';') {
            let parts = parse_entry(&node.id, entry)?;
            let key = (parts.protein, parts.gene);
            let sites = match entry_sites.entry(key) {
                Entry::Occupied(occupied) => occupied.into_mut(),
                Entry::Vacant(vacant) => {
                    entry_order.push(vacant.key().clone());
                    vacant.insert(Vec::new())
                }
            };
            for site in parts.sites {
                if !sites.contains(&site) {
                    sites.push(site);
                }
            }
        }

        for group_name in &node.groups {
            if !groups.contains(group_name) {
                groups.push(group_name.clone());
            }
        }
    }

    let id = entry_order
        .iter()
        .map(|key| {
            let mut entry = key.0.clone();
            if let Some(gene) = &key.1 {
                entry.push('_');
                entry.push_str(gene);
            }
            let sites = &entry_sites[key];
            if !sites.is_empty() {
                entry.push('_');
                entry.push_str(&sites.join(","));
            }
            entry
        })
        .collect::<Vec<_>>()
        .join(";");

    Ok(Node { id, groups })
}

/// Rebuild links against merged ids: self-loops vanish, parallel links are
/// combined per attribute under a symmetric endpoint key, and an attribute
/// present on both sides keeps whichever weight has the larger magnitude.
fn combine_links(links: &[Link], id_map: &HashMap<String, String>) -> Vec<Link> {
    let mut combined: Vec<Link> = Vec::new();
    let mut index_by_key: HashMap<(String, String), usize> = HashMap::new();

    for link in links {
        let (Some(source), Some(target)) = (id_map.get(&link.source), id_map.get(&link.target))
        else {
            continue;
        };
        if source == target {
            continue;
        }

        let key = if source <= target {
            (source.clone(), target.clone())
        } else {
            (target.clone(), source.clone())
        };

        match index_by_key.get(&key) {
            None => {
                index_by_key.insert(key, combined.len());
                combined.push(Link {
                    source: source.clone(),
                    target: target.clone(),
                    weights: link.weights.clone(),
                    attribs: link.attribs.clone(),
                });
            }
            Some(&index) => {
                let existing = &mut combined[index];
                for (attrib, weight) in link.attribs.iter().zip(&link.weights) {
                    match existing.attribs.iter().position(|have| have == attrib) {
                        Some(slot) => {
                            if weight.abs() > existing.weights[slot].abs() {
                                existing.weights[slot] = *weight;
                            }
                        }
                        None => {
                            existing.attribs.push(attrib.clone());
                            existing.weights.push(*weight);
                        }
                    }
                }
            }
        }
    }

    combined
}
