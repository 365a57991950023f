use std::collections::HashMap;

use crate::data::Graph;

/// Disjoint-set over dense indices, path compression plus union by rank.
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    pub fn find(&mut self, index: usize) -> usize {
        let mut root = index;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        let mut cursor = index;
        while self.parent[cursor] != root {
            let next = self.parent[cursor];
            self.parent[cursor] = root;
            cursor = next;
        }

        root
    }

    pub fn union(&mut self, a: usize, b: usize) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return;
        }

        match self.rank[root_a].cmp(&self.rank[root_b]) {
            std::cmp::Ordering::Less => self.parent[root_a] = root_b,
            std::cmp::Ordering::Greater => self.parent[root_b] = root_a,
            std::cmp::Ordering::Equal => {
                self.parent[root_b] = root_a;
                self.rank[root_a] += 1;
            }
        }
    }
}

/// Connected components via union-find over node indices. Returns the
/// node-id -> component-id assignment and the per-component node count.
/// Component ids are arbitrary integers, stable only within one call.
pub fn components_of(graph: &Graph) -> (HashMap<String, usize>, HashMap<usize, usize>) {
    let index_by_id = graph.index_by_id();
    let mut sets = UnionFind::new(graph.nodes.len());

    for link in &graph.links {
        if let (Some(&source), Some(&target)) = (
            index_by_id.get(link.source.as_str()),
            index_by_id.get(link.target.as_str()),
        ) {
            sets.union(source, target);
        }
    }

    let mut components = HashMap::with_capacity(graph.nodes.len());
    let mut sizes = HashMap::new();
    for (index, node) in graph.nodes.iter().enumerate() {
        let root = sets.find(index);
        components.insert(node.id.clone(), root);
        *sizes.entry(root).or_insert(0) += 1;
    }

    (components, sizes)
}

/// Degree per node id: the number of link endpoints touching it. A node that
/// is source of one link and target of another counts twice.
pub fn adjacency_of(graph: &Graph) -> HashMap<String, usize> {
    let mut adjacency: HashMap<String, usize> =
        graph.nodes.iter().map(|node| (node.id.clone(), 0)).collect();

    for link in &graph.links {
        if let Some(count) = adjacency.get_mut(link.source.as_str()) {
            *count += 1;
        }
        if let Some(count) = adjacency.get_mut(link.target.as_str()) {
            *count += 1;
        }
    }

    adjacency
}
