//! Community detection module

pub mod labels;
pub mod louvain;
pub mod metrics;

use serde::{Deserialize, Serialize};

use crate::graph::UndirectedGraph;

pub use labels::{CommunityLabeler, DominantTagLabeler};
pub use louvain::Louvain;
pub use metrics::{community_summaries, modularity};

/// Assignment of every node to exactly one community.
///
/// Community ids are contiguous from 0 and numbered in order of first
/// appearance when scanning nodes by index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    assignment: Vec<u32>,
    community_count: usize,
}

impl Partition {
    /// Normalize arbitrary labels into contiguous community ids
    pub fn from_labels(labels: &[u32]) -> Self {
        let mut remap: std::collections::HashMap<u32, u32> = std::collections::HashMap::new();
        let assignment = labels
            .iter()
            .map(|label| {
                let next = remap.len() as u32;
                *remap.entry(*label).or_insert(next)
            })
            .collect();

        Self {
            assignment,
            community_count: remap.len(),
        }
    }

    /// Every node in its own community
    pub fn singletons(node_count: usize) -> Self {
        Self {
            assignment: (0..node_count as u32).collect(),
            community_count: node_count,
        }
    }

    pub fn node_count(&self) -> usize {
        self.assignment.len()
    }

    pub fn community_count(&self) -> usize {
        self.community_count
    }

    pub fn community_of(&self, node: u32) -> u32 {
        self.assignment[node as usize]
    }

    pub fn assignment(&self) -> &[u32] {
        &self.assignment
    }

    /// Node indices of each community, indexed by community id
    pub fn members(&self) -> Vec<Vec<u32>> {
        let mut members = vec![Vec::new(); self.community_count];
        for (node, &community) in self.assignment.iter().enumerate() {
            members[community as usize].push(node as u32);
        }
        members
    }

    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.community_count];
        for &community in &self.assignment {
            sizes[community as usize] += 1;
        }
        sizes
    }

    pub fn same_community(&self, a: u32, b: u32) -> bool {
        self.community_of(a) == self.community_of(b)
    }
}

/// A modularity-optimizing community detector.
///
/// Implementations must cover every node, be deterministic for a fixed
/// `seed`, and return the modularity the partition achieves on `graph`.
pub trait Partitioner {
    fn partition(&self, graph: &UndirectedGraph, seed: u64) -> (Partition, f64);
}

/// Represents a detected community with its summary statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunitySummary {
    /// Community id from the partition
    pub id: u32,

    /// Number of members
    pub size: usize,

    /// Directed density of edges between members
    pub density: f64,

    /// Members with the most edges inside the community (external ids)
    pub central_nodes: Vec<u64>,

    /// Most frequent primary tag among members
    pub dominant_tag: String,

    /// Share of members carrying the dominant tag
    pub dominance: f64,

    /// Human-readable label from the configured labeler
    pub label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_renumbered_by_first_appearance() {
        let partition = Partition::from_labels(&[7, 7, 3, 9, 3]);
        assert_eq!(partition.assignment(), &[0, 0, 1, 2, 1]);
        assert_eq!(partition.community_count(), 3);
        assert_eq!(partition.sizes(), vec![2, 2, 1]);
        assert_eq!(partition.members()[1], vec![2, 4]);
        assert!(partition.same_community(2, 4));
        assert!(!partition.same_community(0, 3));
    }

    #[test]
    fn singletons_cover_every_node() {
        let partition = Partition::singletons(3);
        assert_eq!(partition.community_count(), 3);
        assert_eq!(partition.sizes(), vec![1, 1, 1]);
    }
}
