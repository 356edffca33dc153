//! Undirected projection of the transaction graph

use crate::graph::TransactionGraph;

/// Weighted undirected graph in compressed form.
///
/// `u` and `v` are adjacent when either directed edge exists between
/// them; the weight is the sum of both directions' transaction counts.
/// Every undirected edge is stored in both endpoint lists, sorted by
/// neighbor index.
#[derive(Debug, Clone)]
pub struct UndirectedGraph {
    offsets: Vec<u32>,
    neighbors: Vec<u32>,
    weights: Vec<f64>,
}

impl UndirectedGraph {
    /// Project a directed graph, leaving the original untouched
    pub fn from_directed(graph: &TransactionGraph) -> Self {
        let node_count = graph.node_count();
        let mut offsets = Vec::with_capacity(node_count + 1);
        let mut neighbors = Vec::with_capacity(graph.edge_count() * 2);
        let mut weights = Vec::with_capacity(graph.edge_count() * 2);
        offsets.push(0);

        for u in 0..node_count as u32 {
            // Merge the two sorted adjacency lists
            let out = graph.successors(u);
            let out_ids = graph.out_edge_ids(u);
            let inc = graph.predecessors(u);
            let inc_ids = graph.in_edge_ids(u);
            let (mut i, mut j) = (0, 0);

            while i < out.len() || j < inc.len() {
                let take_out = j >= inc.len() || (i < out.len() && out[i] <= inc[j]);
                let take_in = i >= out.len() || (j < inc.len() && inc[j] <= out[i]);

                let mut weight = 0.0;
                let v = if take_out { out[i] } else { inc[j] };
                if take_out {
                    weight += graph.edge_attrs(out_ids.start + i).weight as f64;
                    i += 1;
                }
                if take_in {
                    weight += graph.edge_attrs(inc_ids[j] as usize).weight as f64;
                    j += 1;
                }

                neighbors.push(v);
                weights.push(weight);
            }
            offsets.push(neighbors.len() as u32);
        }

        Self {
            offsets,
            neighbors,
            weights,
        }
    }

    /// Build from an explicit undirected edge list; duplicate pairs
    /// accumulate their weights and self-loops are ignored
    pub fn from_edges(node_count: usize, edges: &[(u32, u32, f64)]) -> Self {
        let mut lists: Vec<Vec<(u32, f64)>> = vec![Vec::new(); node_count];
        for &(u, v, w) in edges {
            if u == v {
                continue;
            }
            lists[u as usize].push((v, w));
            lists[v as usize].push((u, w));
        }

        let mut offsets = Vec::with_capacity(node_count + 1);
        let mut neighbors = Vec::new();
        let mut weights: Vec<f64> = Vec::new();
        offsets.push(0);

        for mut list in lists {
            list.sort_unstable_by_key(|&(v, _)| v);
            for (v, w) in list {
                if neighbors.len() > *offsets.last().unwrap_or(&0) as usize
                    && neighbors.last() == Some(&v)
                {
                    if let Some(last) = weights.last_mut() {
                        *last += w;
                    }
                    continue;
                }
                neighbors.push(v);
                weights.push(w);
            }
            offsets.push(neighbors.len() as u32);
        }

        Self {
            offsets,
            neighbors,
            weights,
        }
    }

    pub fn node_count(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Number of undirected edges
    pub fn edge_count(&self) -> usize {
        self.neighbors.len() / 2
    }

    /// Sorted neighbor indices of `u`
    pub fn neighbors(&self, u: u32) -> &[u32] {
        let start = self.offsets[u as usize] as usize;
        let end = self.offsets[u as usize + 1] as usize;
        &self.neighbors[start..end]
    }

    /// Edge weights parallel to `neighbors(u)`
    pub fn weights(&self, u: u32) -> &[f64] {
        let start = self.offsets[u as usize] as usize;
        let end = self.offsets[u as usize + 1] as usize;
        &self.weights[start..end]
    }

    pub fn degree(&self, u: u32) -> usize {
        (self.offsets[u as usize + 1] - self.offsets[u as usize]) as usize
    }

    pub fn weighted_degree(&self, u: u32) -> f64 {
        self.weights(u).iter().sum()
    }

    /// Sum of all undirected edge weights
    pub fn total_weight(&self) -> f64 {
        self.weights.iter().sum::<f64>() / 2.0
    }

    /// Each undirected edge once, as (u, v, weight) with u < v
    pub fn edges(&self) -> impl Iterator<Item = (u32, u32, f64)> + '_ {
        (0..self.node_count() as u32).flat_map(move |u| {
            self.neighbors(u)
                .iter()
                .zip(self.weights(u))
                .filter(move |(&v, _)| u < v)
                .map(move |(&v, &w)| (u, v, w))
        })
    }

    /// Number of connected components
    pub fn connected_components(&self) -> usize {
        let n = self.node_count();
        let mut seen = vec![false; n];
        let mut stack = Vec::new();
        let mut components = 0;

        for start in 0..n {
            if seen[start] {
                continue;
            }
            components += 1;
            seen[start] = true;
            stack.push(start as u32);
            while let Some(u) = stack.pop() {
                for &v in self.neighbors(u) {
                    if !seen[v as usize] {
                        seen[v as usize] = true;
                        stack.push(v);
                    }
                }
            }
        }

        components
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;

    #[test]
    fn reciprocal_pairs_collapse_into_one_edge() {
        let mut builder = GraphBuilder::default();
        builder.add_edge(1, 2, 3, 0).unwrap();
        builder.add_edge(2, 1, 2, 0).unwrap();
        builder.add_edge(2, 3, 1, 0).unwrap();
        let graph = builder.build();

        let undirected = UndirectedGraph::from_directed(&graph);
        assert_eq!(undirected.node_count(), 3);
        assert_eq!(undirected.edge_count(), 2);
        assert_eq!(undirected.neighbors(1), &[0, 2]);
        assert_eq!(undirected.weights(1), &[5.0, 1.0]);
        assert!((undirected.total_weight() - 6.0).abs() < 1e-12);
        assert_eq!(undirected.connected_components(), 1);

        // The directed graph still has three edges
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn from_edges_merges_duplicates() {
        let g = UndirectedGraph::from_edges(4, &[(0, 1, 1.0), (1, 0, 2.0), (2, 2, 1.0)]);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.weights(0), &[3.0]);
        assert_eq!(g.degree(2), 0);
        assert_eq!(g.connected_components(), 3);
        assert_eq!(g.edges().collect::<Vec<_>>(), vec![(0, 1, 3.0)]);
    }
}
