use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// First biological entry of a node id (entries are `;`-separated).
pub fn first_entry(id: &str) -> &str {
    id.split(';').next().unwrap_or(id)
}

/// Gene segment of a node id's first entry, used as a display name.
pub fn gene_name(id: &str) -> &str {
    let entry = first_entry(id);
    entry.split('_').nth(1).unwrap_or(entry)
}

/// Deterministic jitter in [-1, 1] x [-1, 1], derived from the node id so
/// initial layouts are reproducible across runs.
pub fn stable_pair(id: &str) -> (f32, f32) {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    let hash = hasher.finish();

    let x = ((hash & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    let y = (((hash >> 32) & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    ((x * 2.0) - 1.0, (y * 2.0) - 1.0)
}
