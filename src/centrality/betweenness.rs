//! Betweenness centrality estimated from sampled sources (Brandes)

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::graph::TransactionGraph;

/// Sources accumulated by one worker before its partial sums are merged
const SOURCES_PER_CHUNK: usize = 32;

/// Approximate betweenness centrality from `samples` source nodes.
///
/// Sources are drawn without replacement from a `StdRng` seeded with
/// `seed`. Dependencies accumulated from those sources are scaled by
/// n / k and normalized by the (n - 1)(n - 2) ordered pairs. With
/// `samples >= n` every node is a source and the result is exact.
pub fn approximate_betweenness(graph: &TransactionGraph, samples: usize, seed: u64) -> Vec<f64> {
    let n = graph.node_count();
    if n == 0 {
        return Vec::new();
    }

    let k = samples.clamp(1, n);
    let sources: Vec<u32> = if k == n {
        (0..n as u32).collect()
    } else {
        let mut rng = StdRng::seed_from_u64(seed);
        rand::seq::index::sample(&mut rng, n, k)
            .into_iter()
            .map(|i| i as u32)
            .collect()
    };

    log::info!("Computing betweenness centrality from {} of {} sources", k, n);

    // Partial sums are reduced in chunk order so the result does not
    // depend on thread scheduling
    let partials: Vec<Vec<f64>> = sources
        .par_chunks(SOURCES_PER_CHUNK)
        .map(|chunk| {
            let mut scratch = BrandesScratch::new(n);
            let mut acc = vec![0.0; n];
            for &source in chunk {
                scratch.accumulate(graph, source, &mut acc);
            }
            acc
        })
        .collect();

    let mut centrality = vec![0.0; n];
    for partial in partials {
        for (total, value) in centrality.iter_mut().zip(partial) {
            *total += value;
        }
    }

    if n > 2 {
        let scale = (n as f64 / k as f64) / ((n - 1) * (n - 2)) as f64;
        for value in &mut centrality {
            *value *= scale;
        }
    }

    centrality
}

/// Exact betweenness centrality (every node used as a source)
pub fn exact_betweenness(graph: &TransactionGraph) -> Vec<f64> {
    approximate_betweenness(graph, graph.node_count(), 0)
}

/// Reusable buffers for single-source shortest path accumulation
struct BrandesScratch {
    stack: Vec<u32>,
    queue: VecDeque<u32>,
    predecessors: Vec<Vec<u32>>,
    sigma: Vec<f64>,
    distance: Vec<i64>,
    delta: Vec<f64>,
}

impl BrandesScratch {
    fn new(n: usize) -> Self {
        Self {
            stack: Vec::with_capacity(n),
            queue: VecDeque::with_capacity(n),
            predecessors: vec![Vec::new(); n],
            sigma: vec![0.0; n],
            distance: vec![-1; n],
            delta: vec![0.0; n],
        }
    }

    /// Add the dependencies of `source` on every other node into `acc`
    fn accumulate(&mut self, graph: &TransactionGraph, source: u32, acc: &mut [f64]) {
        // Only nodes reached by the previous BFS need resetting
        for &v in &self.stack {
            let v = v as usize;
            self.predecessors[v].clear();
            self.sigma[v] = 0.0;
            self.distance[v] = -1;
            self.delta[v] = 0.0;
        }
        self.stack.clear();

        let s = source as usize;
        self.sigma[s] = 1.0;
        self.distance[s] = 0;
        self.queue.push_back(source);

        while let Some(v) = self.queue.pop_front() {
            self.stack.push(v);
            let dv = self.distance[v as usize];
            for &w in graph.successors(v) {
                let wi = w as usize;
                if self.distance[wi] < 0 {
                    self.distance[wi] = dv + 1;
                    self.queue.push_back(w);
                }
                if self.distance[wi] == dv + 1 {
                    self.sigma[wi] += self.sigma[v as usize];
                    self.predecessors[wi].push(v);
                }
            }
        }

        for &w in self.stack.iter().rev() {
            let wi = w as usize;
            let coeff = (1.0 + self.delta[wi]) / self.sigma[wi];
            for &v in &self.predecessors[wi] {
                self.delta[v as usize] += self.sigma[v as usize] * coeff;
            }
            if w != source {
                acc[wi] += self.delta[wi];
            }
        }
    }
}
