//! Louvain modularity optimization
//!
//! Each level repeatedly moves single nodes to the neighboring community
//! with the largest modularity gain (visiting nodes in a seeded random
//! order), then collapses every community into a super-node and starts
//! again on the smaller graph. The process stops once a level no longer
//! raises modularity by at least `min_gain`.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::cluster::{modularity, Partition, Partitioner};
use crate::graph::UndirectedGraph;

/// Louvain community detection
#[derive(Debug, Clone, Copy)]
pub struct Louvain {
    /// Smallest modularity improvement that keeps the search going
    pub min_gain: f64,
    /// Safety cap on local-moving passes per level
    pub max_passes: usize,
}

impl Default for Louvain {
    fn default() -> Self {
        Self {
            min_gain: 1e-7,
            max_passes: 1_000,
        }
    }
}

impl Partitioner for Louvain {
    fn partition(&self, graph: &UndirectedGraph, seed: u64) -> (Partition, f64) {
        let n = graph.node_count();
        let total = graph.total_weight();
        if n == 0 || total <= 0.0 {
            log::info!("No edges to cluster; every node is its own community");
            return (Partition::singletons(n), 0.0);
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut level = Level::from_graph(graph);
        let mut node_community: Vec<u32> = (0..n as u32).collect();
        let mut current = level.modularity(&node_community);
        let mut depth = 0;

        loop {
            let moved = self.local_moving(&level, &mut rng);
            let (labels, count) = renumber(&moved);
            let candidate = level.modularity(&labels);

            if count == level.node_count() {
                break;
            }
            if depth > 0 && candidate - current < self.min_gain {
                break;
            }

            for community in node_community.iter_mut() {
                *community = labels[*community as usize];
            }
            log::debug!(
                "Louvain level {}: {} communities, modularity {:.6}",
                depth,
                count,
                candidate
            );

            current = candidate;
            level = level.aggregate(&labels, count);
            depth += 1;
        }

        let partition = Partition::from_labels(&node_community);
        let q = modularity(graph, &partition);
        log::info!(
            "Louvain found {} communities (modularity {:.4})",
            partition.community_count(),
            q
        );
        (partition, q)
    }
}

impl Louvain {
    /// One level of local moving; returns the community of each node
    fn local_moving(&self, level: &Level, rng: &mut StdRng) -> Vec<u32> {
        let n = level.node_count();
        let two_m = 2.0 * level.total;

        let mut community: Vec<u32> = (0..n as u32).collect();
        let mut community_degree = level.degree.clone();
        let mut order: Vec<u32> = (0..n as u32).collect();

        let mut link_weight = vec![0.0; n];
        let mut touched: Vec<u32> = Vec::new();
        let mut current = level.modularity(&community);

        for _ in 0..self.max_passes {
            order.shuffle(rng);
            let mut moves = 0usize;

            for &u in &order {
                let ui = u as usize;
                let k = level.degree[ui];
                let own = community[ui];

                for &(v, w) in &level.adjacency[ui] {
                    let c = community[v as usize];
                    if link_weight[c as usize] == 0.0 {
                        touched.push(c);
                    }
                    link_weight[c as usize] += w;
                }

                community_degree[own as usize] -= k;
                let gain = |c: u32, deg: &[f64], links: &[f64]| links[c as usize] - deg[c as usize] * k / two_m;

                let mut best = own;
                let mut best_gain = gain(own, &community_degree, &link_weight);
                for &c in &touched {
                    let g = gain(c, &community_degree, &link_weight);
                    if g > best_gain {
                        best = c;
                        best_gain = g;
                    }
                }

                community_degree[best as usize] += k;
                if best != own {
                    community[ui] = best;
                    moves += 1;
                }

                for &c in &touched {
                    link_weight[c as usize] = 0.0;
                }
                touched.clear();
            }

            let next = level.modularity(&community);
            if moves == 0 || next - current < self.min_gain {
                break;
            }
            current = next;
        }

        community
    }
}

/// Contiguous ids by first appearance, plus the number of communities
fn renumber(labels: &[u32]) -> (Vec<u32>, usize) {
    let partition = Partition::from_labels(labels);
    let count = partition.community_count();
    (partition.assignment().to_vec(), count)
}

/// Weighted graph of one Louvain level; nodes may carry self-loops
/// holding the weight already inside them
struct Level {
    adjacency: Vec<Vec<(u32, f64)>>,
    self_loops: Vec<f64>,
    /// Weighted degree, self-loops counted twice
    degree: Vec<f64>,
    /// Total edge weight, self-loops counted once
    total: f64,
}

impl Level {
    fn from_graph(graph: &UndirectedGraph) -> Self {
        let n = graph.node_count();
        let adjacency = (0..n as u32)
            .map(|u| {
                graph
                    .neighbors(u)
                    .iter()
                    .copied()
                    .zip(graph.weights(u).iter().copied())
                    .collect()
            })
            .collect();

        Self {
            adjacency,
            self_loops: vec![0.0; n],
            degree: (0..n as u32).map(|u| graph.weighted_degree(u)).collect(),
            total: graph.total_weight(),
        }
    }

    fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    fn modularity(&self, community: &[u32]) -> f64 {
        let count = community.iter().map(|&c| c as usize + 1).max().unwrap_or(0);
        let mut inside = vec![0.0; count];
        let mut degree = vec![0.0; count];

        for (u, neighbors) in self.adjacency.iter().enumerate() {
            let cu = community[u] as usize;
            degree[cu] += self.degree[u];
            inside[cu] += self.self_loops[u];
            for &(v, w) in neighbors {
                if community[v as usize] as usize == cu {
                    // Seen once from each endpoint
                    inside[cu] += w / 2.0;
                }
            }
        }

        let m = self.total;
        inside
            .iter()
            .zip(&degree)
            .map(|(&l, &d)| l / m - (d / (2.0 * m)).powi(2))
            .sum()
    }

    /// Collapse each community into a single node
    fn aggregate(&self, community: &[u32], count: usize) -> Self {
        let mut links: Vec<BTreeMap<u32, f64>> = vec![BTreeMap::new(); count];
        let mut self_loops = vec![0.0; count];
        let mut degree = vec![0.0; count];

        for (u, neighbors) in self.adjacency.iter().enumerate() {
            let cu = community[u];
            degree[cu as usize] += self.degree[u];
            self_loops[cu as usize] += self.self_loops[u];
            for &(v, w) in neighbors {
                let cv = community[v as usize];
                if cu == cv {
                    self_loops[cu as usize] += w / 2.0;
                } else {
                    *links[cu as usize].entry(cv).or_insert(0.0) += w;
                }
            }
        }

        Self {
            adjacency: links.into_iter().map(|m| m.into_iter().collect()).collect(),
            self_loops,
            degree,
            total: self.total,
        }
    }
}
