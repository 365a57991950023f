mod filter;
mod louvain;
mod merge;
pub mod physics;
pub mod query;
mod search;
mod topology;

pub use filter::{
    FilterParams, apply_filters, filter_by_link_attribs, filter_by_node_groups,
    filter_by_node_ids, filter_by_threshold, filter_comp_density, filter_max_comp_size,
    filter_min_comp_size, filter_min_neighborhood, filter_nodes_exist,
};
pub use louvain::communities_of;
pub use merge::{MergeError, merge_same_entity};
pub use search::search_nodes;
pub use topology::{UnionFind, adjacency_of, components_of};
