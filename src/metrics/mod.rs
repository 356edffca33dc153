//! Structural metrics module

pub mod structural;

use serde::{Deserialize, Serialize};

pub use structural::analyze_structure;

/// Scalar summary of the graph's structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuralReport {
    pub nodes: usize,

    /// Directed edge count
    pub edges: usize,

    /// Edge count of the undirected projection
    pub undirected_edges: usize,

    /// Directed density: edges / (n (n - 1))
    pub density: f64,

    /// Fraction of directed edges whose reverse also exists
    pub reciprocity: f64,

    pub reciprocal_edges: usize,

    /// Mean local clustering coefficient of the undirected projection
    pub average_clustering: f64,

    /// Mean neighborhood Jaccard similarity over existing undirected edges
    pub average_jaccard: f64,

    pub weakly_connected_components: usize,
}
