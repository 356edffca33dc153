//! Community statistics and metrics

use std::collections::HashSet;

use rayon::prelude::*;

use crate::cluster::labels::dominant_tag;
use crate::cluster::{CommunityLabeler, CommunitySummary, Partition};
use crate::data::record::UNKNOWN_TAG;
use crate::graph::{Node, TransactionGraph, UndirectedGraph};

/// Members reported as central in each community summary
const CENTRAL_NODES: usize = 5;

/// Newman modularity of `partition` on the weighted undirected graph.
///
/// Q = sum over communities of L_c / m - (d_c / 2m)^2, where L_c is the
/// weight inside community c, d_c its total weighted degree and m the
/// total edge weight. A graph without edges has modularity 0.
pub fn modularity(graph: &UndirectedGraph, partition: &Partition) -> f64 {
    let m = graph.total_weight();
    if m <= 0.0 {
        return 0.0;
    }

    let count = partition.community_count();
    let mut inside = vec![0.0; count];
    let mut degree = vec![0.0; count];

    for u in 0..graph.node_count() as u32 {
        degree[partition.community_of(u) as usize] += graph.weighted_degree(u);
    }
    for (u, v, w) in graph.edges() {
        if partition.same_community(u, v) {
            inside[partition.community_of(u) as usize] += w;
        }
    }

    inside
        .iter()
        .zip(&degree)
        .map(|(&l, &d)| l / m - (d / (2.0 * m)).powi(2))
        .sum()
}

/// Size, internal density, central members and label of every community
pub fn community_summaries(
    graph: &TransactionGraph,
    partition: &Partition,
    labeler: &dyn CommunityLabeler,
) -> Vec<CommunitySummary> {
    partition
        .members()
        .par_iter()
        .enumerate()
        .map(|(id, members)| {
            let id = id as u32;
            let nodes: Vec<&Node> = members.iter().map(|&idx| graph.node(idx)).collect();
            let (dominant, dominance) = dominant_tag(&nodes)
                .map(|(tag, share)| (tag.to_string(), share))
                .unwrap_or_else(|| (UNKNOWN_TAG.to_string(), 0.0));

            CommunitySummary {
                id,
                size: members.len(),
                density: calculate_density(graph, members),
                central_nodes: central_nodes(graph, members)
                    .into_iter()
                    .map(|idx| graph.node_id(idx))
                    .collect(),
                dominant_tag: dominant,
                dominance,
                label: labeler.label(id, &nodes),
            }
        })
        .collect()
}

/// Directed density inside a member set: internal edges / (n (n - 1)).
/// Communities with fewer than two members have density 0.
pub fn calculate_density(graph: &TransactionGraph, members: &[u32]) -> f64 {
    let n = members.len();
    if n <= 1 {
        return 0.0;
    }

    let member_set: HashSet<u32> = members.iter().copied().collect();
    let internal = members
        .iter()
        .flat_map(|&src| graph.successors(src))
        .filter(|&&dst| member_set.contains(&dst))
        .count();

    internal as f64 / (n * (n - 1)) as f64
}

/// Members with the most internal edges (in + out), highest first; ties
/// go to the lower external id
pub fn central_nodes(graph: &TransactionGraph, members: &[u32]) -> Vec<u32> {
    let member_set: HashSet<u32> = members.iter().copied().collect();
    let internal_degree = |idx: u32| {
        graph.successors(idx).iter().filter(|&v| member_set.contains(v)).count()
            + graph.predecessors(idx).iter().filter(|&v| member_set.contains(v)).count()
    };

    let mut degrees: Vec<(u32, usize)> = members.iter().map(|&idx| (idx, internal_degree(idx))).collect();
    degrees.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| graph.node_id(a.0).cmp(&graph.node_id(b.0))));

    degrees.into_iter().take(CENTRAL_NODES).map(|(idx, _)| idx).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::DominantTagLabeler;
    use crate::data::Tags;
    use crate::graph::GraphBuilder;

    #[test]
    fn modularity_of_two_components() {
        // Two disjoint edges, each its own community: Q = 2 * (1/2 - 1/4)
        let graph = UndirectedGraph::from_edges(4, &[(0, 1, 1.0), (2, 3, 1.0)]);
        let partition = Partition::from_labels(&[0, 0, 1, 1]);
        assert!((modularity(&graph, &partition) - 0.5).abs() < 1e-12);

        let merged = Partition::from_labels(&[0, 0, 0, 0]);
        assert!(modularity(&graph, &merged).abs() < 1e-12);
    }

    #[test]
    fn modularity_without_edges_is_zero() {
        let graph = UndirectedGraph::from_edges(3, &[]);
        assert_eq!(modularity(&graph, &Partition::singletons(3)), 0.0);
    }

    #[test]
    fn summaries_report_density_and_tags() {
        let mut builder = GraphBuilder::default();
        let books = Tags::new("Books", "Novels");
        let games = Tags::new("Games", "Board");
        builder.add_or_get_node(1, &books);
        builder.add_or_get_node(2, &books);
        builder.add_or_get_node(3, &games);
        builder.add_or_get_node(4, &games);
        builder.add_edge(1, 2, 1, 5).unwrap();
        builder.add_edge(2, 1, 1, 4).unwrap();
        builder.add_edge(3, 4, 1, 3).unwrap();
        let graph = builder.build();

        let partition = Partition::from_labels(&[0, 0, 1, 1]);
        let summaries = community_summaries(&graph, &partition, &DominantTagLabeler);

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].size, 2);
        assert!((summaries[0].density - 1.0).abs() < 1e-12);
        assert!((summaries[1].density - 0.5).abs() < 1e-12);
        assert_eq!(summaries[0].label, "00 - BOOKS");
        assert_eq!(summaries[1].dominant_tag, "Games");
        assert_eq!(summaries[0].central_nodes, vec![1, 2]);
    }

    #[test]
    fn singleton_density_is_zero() {
        let mut builder = GraphBuilder::default();
        builder.add_edge(1, 2, 1, 0).unwrap();
        let graph = builder.build();
        assert_eq!(calculate_density(&graph, &[0]), 0.0);
    }
}
