use std::collections::{HashMap, HashSet};

use crate::data::{Graph, Link};

use super::query::FilterExpr;
use super::topology::{adjacency_of, components_of};

/// All filter parameters, owned by the caller. Queries arrive pre-parsed so
/// applying a filter set cannot fail.
#[derive(Clone, Debug, Default)]
pub struct FilterParams {
    pub links_query: FilterExpr,
    pub nodes_query: FilterExpr,
    pub keep_ids: Option<HashSet<String>>,
    pub threshold: f64,
    pub min_comp_size: usize,
    pub max_comp_size: Option<usize>,
    pub density: f64,
    pub min_neighborhood: usize,
}

/// Run the full pipeline in the order that keeps the node set consistent for
/// the topology-dependent stages: group/id filtering first, then link-level
/// passes, then degree/density/component-size reduction. Every node-removing
/// stage is followed by a links-exist pass before topology is recomputed.
pub fn apply_filters(graph: &Graph, params: &FilterParams) -> Graph {
    let mut current = filter_by_node_groups(graph, &params.nodes_query);
    if let Some(keep_ids) = &params.keep_ids {
        current = filter_by_node_ids(&current, keep_ids);
    }
    current = filter_nodes_exist(&current);

    current = filter_by_threshold(&current, params.threshold);
    current = filter_by_link_attribs(&current, &params.links_query);

    current = filter_min_neighborhood(&current, params.min_neighborhood);
    current = filter_nodes_exist(&current);

    current = filter_comp_density(&current, params.density);
    current = filter_nodes_exist(&current);

    current = filter_min_comp_size(&current, params.min_comp_size);
    current = filter_nodes_exist(&current);

    current = filter_max_comp_size(&current, params.max_comp_size);
    filter_nodes_exist(&current)
}

/// Keep links whose attribute list satisfies the expression.
pub fn filter_by_link_attribs(graph: &Graph, expr: &FilterExpr) -> Graph {
    if expr.is_always_true() {
        return graph.clone();
    }

    Graph {
        nodes: graph.nodes.clone(),
        links: graph
            .links
            .iter()
            .filter(|link| expr.matches(&link.attribs))
            .cloned()
            .collect(),
    }
}

/// Keep nodes whose group list satisfies the expression. Links are left
/// untouched; run `filter_nodes_exist` afterwards.
pub fn filter_by_node_groups(graph: &Graph, expr: &FilterExpr) -> Graph {
    if expr.is_always_true() {
        return graph.clone();
    }

    Graph {
        nodes: graph
            .nodes
            .iter()
            .filter(|node| expr.matches(&node.groups))
            .cloned()
            .collect(),
        links: graph.links.clone(),
    }
}

/// Keep only the listed node ids. Links are left untouched; run
/// `filter_nodes_exist` afterwards.
pub fn filter_by_node_ids(graph: &Graph, keep: &HashSet<String>) -> Graph {
    Graph {
        nodes: graph
            .nodes
            .iter()
            .filter(|node| keep.contains(&node.id))
            .cloned()
            .collect(),
        links: graph.links.clone(),
    }
}

/// Drop (attribute, weight) pairs below the threshold, and any link left with
/// no pairs. A zero threshold keeps everything.
pub fn filter_by_threshold(graph: &Graph, threshold: f64) -> Graph {
    if threshold == 0.0 {
        return graph.clone();
    }

    let links = graph
        .links
        .iter()
        .filter_map(|link| {
            let mut weights = Vec::with_capacity(link.weights.len());
            let mut attribs = Vec::with_capacity(link.attribs.len());
            for (weight, attrib) in link.weights.iter().zip(&link.attribs) {
                if *weight >= threshold {
                    weights.push(*weight);
                    attribs.push(attrib.clone());
                }
            }

            if attribs.is_empty() {
                None
            } else {
                Some(Link {
                    source: link.source.clone(),
                    target: link.target.clone(),
                    weights,
                    attribs,
                })
            }
        })
        .collect();

    Graph {
        nodes: graph.nodes.clone(),
        links,
    }
}

/// Keep nodes whose connected component holds at least `min` nodes.
pub fn filter_min_comp_size(graph: &Graph, min: usize) -> Graph {
    if min <= 1 {
        return graph.clone();
    }

    let (components, sizes) = components_of(graph);
    Graph {
        nodes: graph
            .nodes
            .iter()
            .filter(|node| sizes[&components[&node.id]] >= min)
            .cloned()
            .collect(),
        links: graph.links.clone(),
    }
}

/// Keep nodes whose connected component holds at most `max` nodes. `None` is
/// the unset sentinel and skips the pass.
pub fn filter_max_comp_size(graph: &Graph, max: Option<usize>) -> Graph {
    let Some(max) = max else {
        return graph.clone();
    };

    let (components, sizes) = components_of(graph);
    Graph {
        nodes: graph
            .nodes
            .iter()
            .filter(|node| sizes[&components[&node.id]] <= max)
            .cloned()
            .collect(),
        links: graph.links.clone(),
    }
}

/// Keep nodes whose component's average degree `2m / n` reaches the given
/// density, with `m` counting intra-component links only.
pub fn filter_comp_density(graph: &Graph, density: f64) -> Graph {
    if density <= 0.0 {
        return graph.clone();
    }

    let (components, sizes) = components_of(graph);

    let mut intra_edges: HashMap<usize, usize> = HashMap::new();
    for link in &graph.links {
        let (Some(source), Some(target)) = (
            components.get(&link.source),
            components.get(&link.target),
        ) else {
            continue;
        };
        // With components computed from these very links the endpoints always
        // agree; the check stays as a guard against inconsistent input.
        if source == target {
            *intra_edges.entry(*source).or_insert(0) += 1;
        }
    }

    Graph {
        nodes: graph
            .nodes
            .iter()
            .filter(|node| {
                let component = components[&node.id];
                let size = sizes[&component];
                let edges = intra_edges.get(&component).copied().unwrap_or(0);
                (2.0 * edges as f64) / (size as f64) >= density
            })
            .cloned()
            .collect(),
        links: graph.links.clone(),
    }
}

/// Keep nodes with degree at least `min`. Zero is a no-op.
pub fn filter_min_neighborhood(graph: &Graph, min: usize) -> Graph {
    if min == 0 {
        return graph.clone();
    }

    let adjacency = adjacency_of(graph);
    Graph {
        nodes: graph
            .nodes
            .iter()
            .filter(|node| adjacency[&node.id] >= min)
            .cloned()
            .collect(),
        links: graph.links.clone(),
    }
}

/// Drop links that reference removed nodes or that carry no attributes,
/// restoring the graph invariant after node-removing passes.
pub fn filter_nodes_exist(graph: &Graph) -> Graph {
    let ids = graph.id_set();
    Graph {
        nodes: graph.nodes.clone(),
        links: graph
            .links
            .iter()
            .filter(|link| {
                !link.attribs.is_empty()
                    && ids.contains(link.source.as_str())
                    && ids.contains(link.target.as_str())
            })
            .cloned()
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::super::query::{Dialect, parse_filter};
    use super::*;
    use crate::data::Node;

    fn node(id: &str, groups: &[&str]) -> Node {
        Node {
            id: id.to_owned(),
            groups: groups.iter().map(|group| (*group).to_owned()).collect(),
        }
    }

    fn link(source: &str, target: &str, pairs: &[(&str, f64)]) -> Link {
        Link {
            source: source.to_owned(),
            target: target.to_owned(),
            weights: pairs.iter().map(|(_, weight)| *weight).collect(),
            attribs: pairs.iter().map(|(attrib, _)| (*attrib).to_owned()).collect(),
        }
    }

    fn study_graph() -> Graph {
        Graph {
            nodes: vec![
                node("P1_G1", &["kinase"]),
                node("P2_G2", &["kinase", "membrane"]),
                node("P3_G3", &["membrane"]),
                node("P4_G4", &[]),
            ],
            links: vec![
                link("P1_G1", "P2_G2", &[("lean group", 0.4), ("obese group", 0.8)]),
                link("P2_G2", "P3_G3", &[("t2d group", 0.6)]),
            ],
        }
    }

    #[test]
    fn test_empty_filter_is_identity() {
        let graph = study_graph();
        let expr = parse_filter("", Dialect::Links).unwrap();
        assert_eq!(filter_by_link_attribs(&graph, &expr), graph);
        let expr = parse_filter("", Dialect::Nodes).unwrap();
        assert_eq!(filter_by_node_groups(&graph, &expr), graph);
    }

    #[test]
    fn test_link_attrib_filter_drops_whole_links() {
        let graph = study_graph();
        let expr = parse_filter("t2d", Dialect::Links).unwrap();
        let filtered = filter_by_link_attribs(&graph, &expr);
        assert_eq!(filtered.links.len(), 1);
        assert_eq!(filtered.links[0].source, "P2_G2");
        assert_eq!(filtered.nodes.len(), graph.nodes.len());
    }

    #[test]
    fn test_node_group_filter() {
        let graph = study_graph();
        let expr = parse_filter("kinase", Dialect::Nodes).unwrap();
        let filtered = filter_by_node_groups(&graph, &expr);
        let ids: Vec<&str> = filtered.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["P1_G1", "P2_G2"]);
    }

    #[test]
    fn test_threshold_drops_pairs_then_links() {
        let graph = study_graph();
        let filtered = filter_by_threshold(&graph, 0.5);
        assert_eq!(filtered.links.len(), 2);
        assert_eq!(filtered.links[0].attribs, vec!["obese group"]);
        assert_eq!(filtered.links[0].weights, vec![0.8]);

        let filtered = filter_by_threshold(&graph, 0.9);
        assert!(filtered.links.is_empty());
    }

    #[test]
    fn test_threshold_zero_is_identity() {
        let graph = study_graph();
        assert_eq!(filter_by_threshold(&graph, 0.0), graph);
    }

    #[test]
    fn test_threshold_monotonicity() {
        let graph = study_graph();
        let loose = filter_by_threshold(&graph, 0.3);
        let tight = filter_by_threshold(&graph, 0.7);

        let loose_keys: std::collections::HashSet<_> = loose
            .links
            .iter()
            .map(|l| (l.source.clone(), l.target.clone()))
            .collect();
        for survivor in &tight.links {
            assert!(loose_keys.contains(&(survivor.source.clone(), survivor.target.clone())));
        }
    }

    #[test]
    fn test_nodes_exist_drops_dangling_links_and_is_idempotent() {
        let mut graph = study_graph();
        graph.nodes.retain(|node| node.id != "P3_G3");

        let once = filter_nodes_exist(&graph);
        assert_eq!(once.links.len(), 1);
        let twice = filter_nodes_exist(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_min_comp_size_keeps_large_components() {
        let graph = Graph {
            nodes: vec![
                node("A", &[]),
                node("B", &[]),
                node("C", &[]),
                node("D", &[]),
            ],
            links: vec![
                link("A", "B", &[("a", 1.0)]),
                link("B", "C", &[("a", 1.0)]),
            ],
        };

        let filtered = filter_nodes_exist(&filter_min_comp_size(&graph, 3));
        let ids: Vec<&str> = filtered.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);

        // On the original labeling every surviving node sat in a component
        // of at least the requested size.
        let (components, sizes) = components_of(&graph);
        for survivor in &filtered.nodes {
            assert!(sizes[&components[&survivor.id]] >= 3);
        }
    }

    #[test]
    fn test_max_comp_size_none_is_skipped() {
        let graph = study_graph();
        assert_eq!(filter_max_comp_size(&graph, None), graph);

        let filtered = filter_max_comp_size(&graph, Some(1));
        let ids: Vec<&str> = filtered.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["P4_G4"]);
    }

    #[test]
    fn test_comp_density() {
        // Triangle (avg degree 2) plus a pendant pair (avg degree 1).
        let graph = Graph {
            nodes: vec![
                node("A", &[]),
                node("B", &[]),
                node("C", &[]),
                node("D", &[]),
                node("E", &[]),
            ],
            links: vec![
                link("A", "B", &[("a", 1.0)]),
                link("B", "C", &[("a", 1.0)]),
                link("C", "A", &[("a", 1.0)]),
                link("D", "E", &[("a", 1.0)]),
            ],
        };

        let filtered = filter_comp_density(&graph, 1.5);
        let ids: Vec<&str> = filtered.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_min_neighborhood() {
        let graph = study_graph();
        let filtered = filter_min_neighborhood(&graph, 2);
        let ids: Vec<&str> = filtered.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["P2_G2"]);

        assert_eq!(filter_min_neighborhood(&graph, 0), graph);
    }

    #[test]
    fn test_filter_stages_idempotent() {
        let graph = study_graph();
        let expr = parse_filter("obese", Dialect::Links).unwrap();

        let once = filter_by_link_attribs(&graph, &expr);
        assert_eq!(filter_by_link_attribs(&once, &expr), once);

        let once = filter_by_threshold(&graph, 0.5);
        assert_eq!(filter_by_threshold(&once, 0.5), once);

        let once = filter_min_comp_size(&graph, 2);
        assert_eq!(filter_min_comp_size(&once, 2), once);
    }

    #[test]
    fn test_apply_filters_pipeline() {
        let graph = study_graph();
        let params = FilterParams {
            nodes_query: parse_filter("kinase or membrane", Dialect::Nodes).unwrap(),
            threshold: 0.5,
            ..FilterParams::default()
        };

        let reduced = apply_filters(&graph, &params);
        let ids: Vec<&str> = reduced.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["P1_G1", "P2_G2", "P3_G3"]);
        assert_eq!(reduced.links.len(), 2);
        for link in &reduced.links {
            assert!(link.weights.iter().all(|weight| *weight >= 0.5));
        }
    }
}
