use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::data::Graph;
use crate::util::gene_name;

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

/// Fuzzy lookup of nodes by gene name or full id, best matches first; ties
/// break on node order so results are stable.
pub fn search_nodes(graph: &Graph, query: &str, limit: usize) -> Vec<(String, i64)> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }

    let matcher = SkimMatcherV2::default();
    let mut matches = graph
        .nodes
        .iter()
        .enumerate()
        .filter_map(|(index, node)| {
            let by_gene = fuzzy_match_score(&matcher, gene_name(&node.id), query);
            let by_id = fuzzy_match_score(&matcher, &node.id, query);
            let score = by_gene.max(by_id)?;
            Some((index, node.id.clone(), score))
        })
        .collect::<Vec<_>>();

    matches.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.0.cmp(&b.0)));
    matches.truncate(limit);
    matches
        .into_iter()
        .map(|(_, id, score)| (id, score))
        .collect()
}
