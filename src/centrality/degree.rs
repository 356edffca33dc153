//! Normalized degree centrality

use crate::graph::{Direction, TransactionGraph};

/// Degree in `direction` divided by n - 1.
///
/// A single-node graph scores 1.0 so the column never holds NaN.
pub fn degree_centrality(graph: &TransactionGraph, direction: Direction) -> Vec<f64> {
    let n = graph.node_count();
    if n == 1 {
        return vec![1.0];
    }
    let scale = if n > 1 { 1.0 / (n - 1) as f64 } else { 0.0 };

    (0..n as u32)
        .map(|idx| graph.degree(idx, direction) as f64 * scale)
        .collect()
}
