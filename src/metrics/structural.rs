//! Whole-graph structural statistics

use rayon::prelude::*;

use crate::graph::{TransactionGraph, UndirectedGraph};
use crate::metrics::StructuralReport;

/// Nodes summed per parallel chunk of the averages
const NODES_PER_CHUNK: usize = 256;

/// Compute every structural statistic of the graph
pub fn analyze_structure(graph: &TransactionGraph, undirected: &UndirectedGraph) -> StructuralReport {
    log::info!("Computing structural metrics");

    let reciprocal_edges = count_reciprocal_edges(graph);
    let report = StructuralReport {
        nodes: graph.node_count(),
        edges: graph.edge_count(),
        undirected_edges: undirected.edge_count(),
        density: density(graph),
        reciprocity: ratio(reciprocal_edges, graph.edge_count()),
        reciprocal_edges,
        average_clustering: average_clustering(undirected),
        average_jaccard: average_jaccard(undirected),
        weakly_connected_components: undirected.connected_components(),
    };

    log::info!(
        "Reciprocity: {:.5}, clustering: {:.5}, Jaccard: {:.5}",
        report.reciprocity,
        report.average_clustering,
        report.average_jaccard
    );

    report
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Directed density m / (n (n - 1)); 0 for graphs with fewer than two nodes
pub fn density(graph: &TransactionGraph) -> f64 {
    let n = graph.node_count();
    if n <= 1 {
        return 0.0;
    }
    graph.edge_count() as f64 / (n * (n - 1)) as f64
}

/// Number of directed edges whose reverse edge also exists
pub fn count_reciprocal_edges(graph: &TransactionGraph) -> usize {
    (0..graph.node_count() as u32)
        .into_par_iter()
        .map(|src| {
            graph
                .successors(src)
                .iter()
                .filter(|&&dst| graph.has_edge(dst, src))
                .count()
        })
        .sum()
}

/// Fraction of edges that are reciprocated; 0 for an edgeless graph
pub fn reciprocity(graph: &TransactionGraph) -> f64 {
    ratio(count_reciprocal_edges(graph), graph.edge_count())
}

/// Size of the intersection of two sorted slices
pub(crate) fn sorted_intersection_count(a: &[u32], b: &[u32]) -> usize {
    let (mut i, mut j, mut count) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                count += 1;
                i += 1;
                j += 1;
            }
        }
    }
    count
}

/// Local clustering coefficient of `u` in the undirected projection
pub fn local_clustering(graph: &UndirectedGraph, u: u32) -> f64 {
    let neighbors = graph.neighbors(u);
    let degree = neighbors.len();
    if degree < 2 {
        return 0.0;
    }

    // Every triangle through u is seen once from each of its two other corners
    let twice_triangles: usize = neighbors
        .iter()
        .map(|&v| sorted_intersection_count(neighbors, graph.neighbors(v)))
        .sum();

    twice_triangles as f64 / (degree * (degree - 1)) as f64
}

/// Mean local clustering over all nodes; nodes of degree < 2 count as 0
pub fn average_clustering(graph: &UndirectedGraph) -> f64 {
    let n = graph.node_count();
    if n == 0 {
        return 0.0;
    }
    ordered_node_sum(n, |u| local_clustering(graph, u)) / n as f64
}

/// Jaccard overlap of the neighborhoods of `u` and `v`
pub fn jaccard(graph: &UndirectedGraph, u: u32, v: u32) -> f64 {
    let a = graph.neighbors(u);
    let b = graph.neighbors(v);
    let intersection = sorted_intersection_count(a, b);
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Mean Jaccard similarity over existing undirected edges only
pub fn average_jaccard(graph: &UndirectedGraph) -> f64 {
    let edges = graph.edge_count();
    if edges == 0 {
        return 0.0;
    }
    let total = ordered_node_sum(graph.node_count(), |u| {
        graph
            .neighbors(u)
            .iter()
            .filter(|&&v| u < v)
            .map(|&v| jaccard(graph, u, v))
            .sum::<f64>()
    });
    total / edges as f64
}

/// Sum `value` over nodes `0..n`. Chunks are summed in parallel and the
/// partial sums reduced in chunk order, so the result is the same for
/// any thread count.
fn ordered_node_sum<F>(n: usize, value: F) -> f64
where
    F: Fn(u32) -> f64 + Sync,
{
    let nodes: Vec<u32> = (0..n as u32).collect();
    let partials: Vec<f64> = nodes
        .par_chunks(NODES_PER_CHUNK)
        .map(|chunk| chunk.iter().map(|&u| value(u)).sum::<f64>())
        .collect();
    partials.iter().sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;

    fn graph_from(edges: &[(u64, u64)]) -> TransactionGraph {
        let mut builder = GraphBuilder::default();
        for &(a, b) in edges {
            builder.add_edge(a, b, 1, 0).unwrap();
        }
        builder.build()
    }

    #[test]
    fn empty_graph_degrades_to_zero() {
        let graph = GraphBuilder::default().build();
        let undirected = UndirectedGraph::from_directed(&graph);
        let report = analyze_structure(&graph, &undirected);
        assert_eq!(report.nodes, 0);
        assert_eq!(report.density, 0.0);
        assert_eq!(report.reciprocity, 0.0);
        assert_eq!(report.average_clustering, 0.0);
        assert_eq!(report.average_jaccard, 0.0);
    }

    #[test]
    fn reciprocity_counts_both_directions() {
        let graph = graph_from(&[(1, 2), (2, 1), (2, 3), (3, 4)]);
        assert_eq!(count_reciprocal_edges(&graph), 2);
        assert!((reciprocity(&graph) - 0.5).abs() < 1e-12);
        assert!((density(&graph) - 4.0 / 12.0).abs() < 1e-12);
    }

    #[test]
    fn triangle_with_pendant() {
        // Triangle 1-2-3 plus pendant 3-4
        let graph = graph_from(&[(1, 2), (2, 3), (3, 1), (3, 4)]);
        let undirected = UndirectedGraph::from_directed(&graph);
        let idx = |id| graph.index_of(id).unwrap();

        assert!((local_clustering(&undirected, idx(1)) - 1.0).abs() < 1e-12);
        assert!((local_clustering(&undirected, idx(3)) - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(local_clustering(&undirected, idx(4)), 0.0);
        let expected = (1.0 + 1.0 + 1.0 / 3.0 + 0.0) / 4.0;
        assert!((average_clustering(&undirected) - expected).abs() < 1e-12);

        // N(1)={2,3}, N(2)={1,3}: overlap {3} out of {1,2,3}
        assert!((jaccard(&undirected, idx(1), idx(2)) - 1.0 / 3.0).abs() < 1e-12);
        // N(3)={1,2,4}, N(4)={3}: disjoint
        assert_eq!(jaccard(&undirected, idx(3), idx(4)), 0.0);
        // edges: (1,2)=1/3, (1,3)=1/4, (2,3)=1/4, (3,4)=0
        let expected_jaccard = (1.0 / 3.0 + 0.25 + 0.25 + 0.0) / 4.0;
        assert!((average_jaccard(&undirected) - expected_jaccard).abs() < 1e-12);
    }

    #[test]
    fn averages_do_not_depend_on_thread_count() {
        let edges: Vec<(u64, u64)> = (0..900u64)
            .flat_map(|i| [(i, (i * 7 + 1) % 900), (i, (i * 13 + 5) % 900), (i, (i + 2) % 900)])
            .filter(|(a, b)| a != b)
            .collect();
        let graph = graph_from(&edges);
        let undirected = UndirectedGraph::from_directed(&graph);

        let run = |threads: usize| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .unwrap()
                .install(|| {
                    (
                        average_clustering(&undirected).to_bits(),
                        average_jaccard(&undirected).to_bits(),
                    )
                })
        };

        let single = run(1);
        assert_eq!(single, run(3));
        assert_eq!(single, run(8));
    }

    #[test]
    fn reciprocity_stays_in_unit_interval() {
        let graph = graph_from(&[(1, 2), (2, 1), (1, 3), (3, 1)]);
        let r = reciprocity(&graph);
        assert!((0.0..=1.0).contains(&r));
        assert_eq!(r, 1.0);
    }
}
