use std::collections::{BTreeMap, HashMap};

use crate::data::Graph;

const MIN_MODULARITY_GAIN: f64 = 1e-9;

/// One level of the aggregated graph. Parallel input links are collapsed to a
/// single undirected edge whose weight is the largest weight found on any of
/// them; self-loops accumulate separately.
struct LevelGraph {
    neighbors: Vec<Vec<(usize, f64)>>,
    self_weight: Vec<f64>,
    total_weight: f64,
}

impl LevelGraph {
    fn from_graph(graph: &Graph) -> Self {
        let index_by_id = graph.index_by_id();
        let mut edges: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        let mut self_weight: Vec<f64> = vec![0.0; graph.nodes.len()];

        for link in &graph.links {
            let (Some(&source), Some(&target)) = (
                index_by_id.get(link.source.as_str()),
                index_by_id.get(link.target.as_str()),
            ) else {
                continue;
            };

            let weight = link
                .weights
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max);
            if !weight.is_finite() {
                continue;
            }

            if source == target {
                self_weight[source] = self_weight[source].max(weight);
                continue;
            }

            let key = (source.min(target), source.max(target));
            let entry = edges.entry(key).or_insert(f64::NEG_INFINITY);
            *entry = entry.max(weight);
        }

        let mut neighbors = vec![Vec::new(); graph.nodes.len()];
        let mut total_weight: f64 = self_weight.iter().sum();
        for (&(a, b), &weight) in &edges {
            neighbors[a].push((b, weight));
            neighbors[b].push((a, weight));
            total_weight += weight;
        }

        Self {
            neighbors,
            self_weight,
            total_weight,
        }
    }

    fn len(&self) -> usize {
        self.neighbors.len()
    }

    fn weighted_degree(&self, node: usize) -> f64 {
        let incident: f64 = self.neighbors[node]
            .iter()
            .map(|&(_, weight)| weight)
            .sum();
        incident + 2.0 * self.self_weight[node]
    }
}

/// Louvain local-moving phase. Nodes are scanned in index order and moved to
/// the neighboring community with the highest modularity gain; ties break
/// toward the lowest community id, which pins the result across runs.
fn one_level(graph: &LevelGraph) -> (Vec<usize>, bool) {
    let len = graph.len();
    let two_m = 2.0 * graph.total_weight;
    let mut community: Vec<usize> = (0..len).collect();
    let degrees: Vec<f64> = (0..len).map(|node| graph.weighted_degree(node)).collect();
    let mut sigma_tot: Vec<f64> = degrees.clone();
    let mut improved = false;

    loop {
        let mut moved = false;

        for node in 0..len {
            let own = community[node];
            let degree = degrees[node];

            // Edge weight from this node into each neighboring community;
            // BTreeMap keeps candidate iteration order deterministic.
            let mut links_to: BTreeMap<usize, f64> = BTreeMap::new();
            links_to.insert(own, 0.0);
            for &(neighbor, weight) in &graph.neighbors[node] {
                *links_to.entry(community[neighbor]).or_insert(0.0) += weight;
            }

            sigma_tot[own] -= degree;

            let mut best = own;
            let mut best_gain = links_to[&own] - sigma_tot[own] * degree / two_m;
            for (&candidate, &weight) in &links_to {
                if candidate == own {
                    continue;
                }
                let gain = weight - sigma_tot[candidate] * degree / two_m;
                if gain > best_gain + MIN_MODULARITY_GAIN
                    || (gain > best_gain - MIN_MODULARITY_GAIN && candidate < best)
                {
                    best = candidate;
                    best_gain = gain;
                }
            }

            sigma_tot[best] += degree;
            if best != own {
                community[node] = best;
                moved = true;
                improved = true;
            }
        }

        if !moved {
            break;
        }
    }

    (renumber(community), improved)
}

/// Remap community labels to 0..k, ordered by first appearance.
fn renumber(community: Vec<usize>) -> Vec<usize> {
    let mut remap: HashMap<usize, usize> = HashMap::new();
    community
        .into_iter()
        .map(|label| {
            let next = remap.len();
            *remap.entry(label).or_insert(next)
        })
        .collect()
}

fn aggregate(graph: &LevelGraph, community: &[usize]) -> LevelGraph {
    let count = community.iter().copied().max().map_or(0, |max| max + 1);
    let mut edges: BTreeMap<(usize, usize), f64> = BTreeMap::new();
    let mut self_weight = vec![0.0; count];

    for node in 0..graph.len() {
        let own = community[node];
        self_weight[own] += graph.self_weight[node];
        for &(neighbor, weight) in &graph.neighbors[node] {
            if neighbor < node {
                continue;
            }
            let other = community[neighbor];
            if own == other {
                self_weight[own] += weight;
            } else {
                let key = (own.min(other), own.max(other));
                *edges.entry(key).or_insert(0.0) += weight;
            }
        }
    }

    let mut neighbors = vec![Vec::new(); count];
    for (&(a, b), &weight) in &edges {
        neighbors[a].push((b, weight));
        neighbors[b].push((a, weight));
    }

    LevelGraph {
        neighbors,
        self_weight,
        total_weight: graph.total_weight,
    }
}

/// Louvain community assignment for the current graph snapshot. Deterministic:
/// no randomized node order, ties pinned toward lower community ids.
pub fn communities_of(graph: &Graph) -> HashMap<String, usize> {
    let mut level = LevelGraph::from_graph(graph);

    // With no weighted edges at all, every node stands alone.
    if level.total_weight <= 0.0 {
        return graph
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id.clone(), index))
            .collect();
    }

    let mut assignment: Vec<usize> = (0..graph.nodes.len()).collect();
    loop {
        let (community, improved) = one_level(&level);
        if !improved {
            break;
        }

        for slot in assignment.iter_mut() {
            *slot = community[*slot];
        }

        let next = aggregate(&level, &community);
        if next.len() == level.len() {
            break;
        }
        level = next;
    }

    let assignment = renumber(assignment);
    graph
        .nodes
        .iter()
        .zip(assignment)
        .map(|(node, community)| (node.id.clone(), community))
        .collect()
}
