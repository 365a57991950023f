mod graph;
mod load;
mod parse;

pub use graph::{Graph, Link, Node};
pub use load::load_graph;
