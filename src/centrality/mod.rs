//! Centrality engine: degree, PageRank and sampled betweenness

pub mod betweenness;
pub mod degree;
pub mod pagerank;

use crate::config::AnalysisConfig;
use crate::graph::{Direction, TransactionGraph};

pub use betweenness::{approximate_betweenness, exact_betweenness};
pub use degree::degree_centrality;
pub use pagerank::{pagerank, PageRank, PageRankConfig};

/// Per-node centrality scores, indexed by node index
#[derive(Debug, Clone, Default)]
pub struct CentralityScores {
    pub in_degree: Vec<f64>,
    pub out_degree: Vec<f64>,
    pub pagerank: Vec<f64>,
    pub betweenness: Vec<f64>,
}

impl CentralityScores {
    /// Node indices ordered by `scores` descending; ties go to the lower
    /// external id
    pub fn top_k(graph: &TransactionGraph, scores: &[f64], k: usize) -> Vec<u32> {
        let mut order: Vec<u32> = (0..scores.len() as u32).collect();
        order.sort_by(|&a, &b| {
            scores[b as usize]
                .total_cmp(&scores[a as usize])
                .then_with(|| graph.node_id(a).cmp(&graph.node_id(b)))
        });
        order.truncate(k);
        order
    }
}

impl From<&AnalysisConfig> for PageRankConfig {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            damping: config.pagerank_damping,
            tolerance: config.pagerank_tolerance,
            max_iterations: config.pagerank_max_iterations,
            weighted: config.pagerank_weighted,
        }
    }
}

/// Compute all centralities; PageRank and betweenness run concurrently
pub fn compute_centralities(graph: &TransactionGraph, config: &AnalysisConfig) -> CentralityScores {
    log::info!("Computing centralities for {} nodes", graph.node_count());

    let pagerank_config = PageRankConfig::from(config);
    let (pagerank, betweenness) = rayon::join(
        || pagerank::pagerank(graph, &pagerank_config),
        || approximate_betweenness(graph, config.betweenness_samples, config.seed),
    );

    if pagerank.converged {
        log::info!("PageRank converged after {} iterations", pagerank.iterations);
    }

    CentralityScores {
        in_degree: degree_centrality(graph, Direction::Incoming),
        out_degree: degree_centrality(graph, Direction::Outgoing),
        pagerank: pagerank.scores,
        betweenness,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;

    #[test]
    fn top_k_breaks_ties_by_lower_id() {
        let mut builder = GraphBuilder::default();
        builder.add_edge(30, 1, 1, 0).unwrap();
        builder.add_edge(20, 1, 1, 0).unwrap();
        builder.add_edge(10, 2, 1, 0).unwrap();
        builder.add_edge(10, 3, 1, 0).unwrap();
        let graph = builder.build();

        let out = degree_centrality(&graph, Direction::Outgoing);
        let top: Vec<u64> = CentralityScores::top_k(&graph, &out, 3)
            .into_iter()
            .map(|idx| graph.node_id(idx))
            .collect();
        assert_eq!(top, vec![10, 20, 30]);
    }

    #[test]
    fn scores_have_one_entry_per_node() {
        let mut builder = GraphBuilder::default();
        builder.add_edge(1, 2, 1, 0).unwrap();
        builder.add_edge(2, 3, 1, 0).unwrap();
        let graph = builder.build();

        let scores = compute_centralities(&graph, &AnalysisConfig::default());
        assert_eq!(scores.in_degree.len(), 3);
        assert_eq!(scores.out_degree.len(), 3);
        assert_eq!(scores.pagerank.len(), 3);
        assert_eq!(scores.betweenness.len(), 3);
    }
}
