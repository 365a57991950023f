use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum RawEndpoint {
    Id(String),
    // A renderer may have replaced the id with a resolved node object; accept
    // the object shape and take its id back out.
    Node { id: String },
}

impl RawEndpoint {
    pub(super) fn into_id(self) -> String {
        match self {
            Self::Id(id) => id,
            Self::Node { id } => id,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub(super) struct RawNode {
    pub(super) id: String,
    #[serde(default)]
    pub(super) groups: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub(super) struct RawLink {
    pub(super) source: RawEndpoint,
    pub(super) target: RawEndpoint,
    #[serde(default)]
    pub(super) weights: Vec<f64>,
    #[serde(default)]
    pub(super) attribs: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub(super) struct RawGraph {
    #[serde(default)]
    pub(super) nodes: Vec<RawNode>,
    #[serde(default)]
    pub(super) links: Vec<RawLink>,
}

pub(super) fn parse_graph_json(raw: &str) -> Result<RawGraph> {
    let parsed: RawGraph = serde_json::from_str(raw).context("invalid graph JSON")?;

    for (index, link) in parsed.links.iter().enumerate() {
        if link.attribs.is_empty() {
            return Err(anyhow!("link {index} has no attributes"));
        }
        if link.weights.len() != link.attribs.len() {
            return Err(anyhow!(
                "link {index} has {} weights for {} attributes",
                link.weights.len(),
                link.attribs.len()
            ));
        }
    }

    Ok(parsed)
}
