//! Monte Carlo simulation of the Independent Cascade model
//!
//! Every trial fixes one Bernoulli(p) draw per directed edge. Draws are
//! derived from a per-trial key and the edge id, and the trial keys are
//! generated once from the configured seed, so every seed set is
//! evaluated against the same sampled worlds.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_xoshiro::SplitMix64;
use rayon::prelude::*;
use statrs::distribution::{ContinuousCDF, Normal};
use statrs::statistics::Statistics;

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::graph::TransactionGraph;
use crate::influence::{CancellationToken, SpreadEstimate};

/// Independent Cascade parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParams {
    /// Activation probability of every edge
    pub probability: f64,
    /// Monte Carlo trials per estimate
    pub trials: usize,
    pub seed: u64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            probability: 0.1,
            trials: 50,
            seed: 42,
        }
    }
}

impl From<&AnalysisConfig> for SimulationParams {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            probability: config.ic_probability,
            trials: config.mc_trials,
            seed: config.seed,
        }
    }
}

/// Spread estimator bound to one graph and one set of sampled worlds
pub struct DiffusionSimulator<'g> {
    graph: &'g TransactionGraph,
    params: SimulationParams,
    trial_keys: Vec<u64>,
    /// Two-sided 95% quantile of the standard normal
    z95: f64,
}

impl<'g> DiffusionSimulator<'g> {
    pub fn new(graph: &'g TransactionGraph, params: SimulationParams) -> Result<Self> {
        if !(0.0..=1.0).contains(&params.probability) {
            return Err(AnalysisError::InvalidConfig(format!(
                "activation probability must be in [0, 1], got {}",
                params.probability
            )));
        }
        if params.trials == 0 {
            return Err(AnalysisError::InvalidConfig(
                "at least one Monte Carlo trial is required".to_string(),
            ));
        }

        let z95 = Normal::new(0.0, 1.0)
            .map_err(|e| AnalysisError::InvalidConfig(e.to_string()))?
            .inverse_cdf(0.975);

        let mut rng = StdRng::seed_from_u64(params.seed);
        let trial_keys = (0..params.trials).map(|_| rng.gen::<u64>()).collect();

        Ok(Self {
            graph,
            params,
            trial_keys,
            z95,
        })
    }

    pub fn graph(&self) -> &'g TransactionGraph {
        self.graph
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// Mean number of nodes activated by `seeds` (node indices)
    pub fn spread(&self, seeds: &[u32]) -> f64 {
        self.estimate(seeds).mean
    }

    pub fn estimate(&self, seeds: &[u32]) -> SpreadEstimate {
        // A fresh token is never cancelled
        self.estimate_cancellable(seeds, &CancellationToken::new())
            .unwrap_or_else(|_| SpreadEstimate::zero(self.params.trials))
    }

    /// Estimate the spread of `seeds`, checking `token` before each trial
    pub fn estimate_cancellable(&self, seeds: &[u32], token: &CancellationToken) -> Result<SpreadEstimate> {
        let n = self.graph.node_count();
        let mut seeds: Vec<u32> = seeds.iter().copied().filter(|&s| (s as usize) < n).collect();
        seeds.sort_unstable();
        seeds.dedup();

        if seeds.is_empty() {
            return Ok(SpreadEstimate::zero(self.params.trials));
        }
        if token.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }

        let sizes: Option<Vec<usize>> = self
            .trial_keys
            .par_iter()
            .map_init(
                || TrialScratch::new(n),
                |scratch, &key| {
                    if token.is_cancelled() {
                        None
                    } else {
                        Some(self.run_trial(&seeds, key, scratch))
                    }
                },
            )
            .collect();
        let sizes = sizes.ok_or(AnalysisError::Cancelled)?;

        let total: usize = sizes.iter().sum();
        let trials = sizes.len();
        let mean = total as f64 / trials as f64;
        let std_dev = if trials > 1 {
            sizes.iter().map(|&s| s as f64).std_dev()
        } else {
            0.0
        };

        Ok(SpreadEstimate {
            mean,
            std_dev,
            trials,
            ci95_half_width: self.z95 * std_dev / (trials as f64).sqrt(),
        })
    }

    /// One cascade in the world fixed by `key`; returns the number of
    /// activated nodes including the seeds
    fn run_trial(&self, seeds: &[u32], key: u64, scratch: &mut TrialScratch) -> usize {
        let p = self.params.probability;
        scratch.reset();

        for &s in seeds {
            scratch.activate(s);
        }
        let mut activated = seeds.len();
        scratch.frontier.extend_from_slice(seeds);

        while !scratch.frontier.is_empty() {
            for i in 0..scratch.frontier.len() {
                let u = scratch.frontier[i];
                for edge in self.graph.out_edge_ids(u) {
                    let v = self.graph.edge_target(edge);
                    if !scratch.is_active(v) && edge_draw(key, edge) < p {
                        scratch.activate(v);
                        scratch.next.push(v);
                        activated += 1;
                    }
                }
            }
            std::mem::swap(&mut scratch.frontier, &mut scratch.next);
            scratch.next.clear();
        }

        activated
    }
}

/// Per-thread buffers; `active` is stamped with the trial epoch so it
/// never needs clearing between trials
struct TrialScratch {
    active: Vec<u32>,
    epoch: u32,
    frontier: Vec<u32>,
    next: Vec<u32>,
}

impl TrialScratch {
    fn new(n: usize) -> Self {
        Self {
            active: vec![0; n],
            epoch: 0,
            frontier: Vec::new(),
            next: Vec::new(),
        }
    }

    fn reset(&mut self) {
        self.frontier.clear();
        self.next.clear();
        self.epoch = self.epoch.wrapping_add(1);
        if self.epoch == 0 {
            self.active.fill(0);
            self.epoch = 1;
        }
    }

    fn activate(&mut self, node: u32) {
        self.active[node as usize] = self.epoch;
    }

    fn is_active(&self, node: u32) -> bool {
        self.active[node as usize] == self.epoch
    }
}

/// Uniform draw in [0, 1) for `edge` in the world of `trial_key`
fn edge_draw(trial_key: u64, edge: usize) -> f64 {
    SplitMix64::seed_from_u64(trial_key ^ (edge as u64).wrapping_mul(EDGE_STRIDE)).gen::<f64>()
}

/// Odd multiplier that spreads consecutive edge ids across the key space
const EDGE_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;

    fn build(edges: &[(u64, u64)]) -> TransactionGraph {
        let mut builder = GraphBuilder::default();
        for &(a, b) in edges {
            builder.add_edge(a, b, 1, 0).unwrap();
        }
        builder.build()
    }

    fn params(probability: f64, trials: usize) -> SimulationParams {
        SimulationParams {
            probability,
            trials,
            seed: 42,
        }
    }

    #[test]
    fn rejects_invalid_params() {
        let graph = build(&[(1, 2)]);
        assert!(matches!(
            DiffusionSimulator::new(&graph, params(1.5, 10)),
            Err(AnalysisError::InvalidConfig(_))
        ));
        assert!(matches!(
            DiffusionSimulator::new(&graph, params(0.5, 0)),
            Err(AnalysisError::InvalidConfig(_))
        ));
    }

    #[test]
    fn certain_activation_reaches_descendants() {
        // 1 -> 2 -> 3, 4 -> 1; starting at 1 never reaches 4
        let graph = build(&[(1, 2), (2, 3), (4, 1)]);
        let sim = DiffusionSimulator::new(&graph, params(1.0, 5)).unwrap();
        let seed = graph.index_of(1).unwrap();

        let estimate = sim.estimate(&[seed]);
        assert_eq!(estimate.mean, 3.0);
        assert_eq!(estimate.std_dev, 0.0);
        assert_eq!(estimate.ci95_half_width, 0.0);
    }

    #[test]
    fn zero_probability_activates_only_seeds() {
        let graph = build(&[(1, 2), (2, 3), (3, 1)]);
        let sim = DiffusionSimulator::new(&graph, params(0.0, 20)).unwrap();
        assert_eq!(sim.spread(&[0, 1]), 2.0);
    }

    #[test]
    fn duplicate_seeds_count_once() {
        let graph = build(&[(1, 2)]);
        let sim = DiffusionSimulator::new(&graph, params(0.0, 3)).unwrap();
        assert_eq!(sim.spread(&[0, 0, 0]), 1.0);
        assert_eq!(sim.spread(&[]), 0.0);
    }

    #[test]
    fn same_seed_same_estimate() {
        let edges: Vec<(u64, u64)> = (0..50).map(|i| (i, (i * 7 + 1) % 50)).filter(|(a, b)| a != b).collect();
        let graph = build(&edges);
        let a = DiffusionSimulator::new(&graph, params(0.4, 100)).unwrap();
        let b = DiffusionSimulator::new(&graph, params(0.4, 100)).unwrap();
        assert_eq!(a.estimate(&[0, 3]), b.estimate(&[0, 3]));
    }

    #[test]
    fn supersets_never_spread_less() {
        let edges: Vec<(u64, u64)> = (0..40)
            .flat_map(|i| [(i, (i + 1) % 40), (i, (i * 11 + 3) % 40)])
            .filter(|(a, b)| a != b)
            .collect();
        let graph = build(&edges);
        let sim = DiffusionSimulator::new(&graph, params(0.3, 64)).unwrap();
        assert!(sim.spread(&[0, 5]) >= sim.spread(&[0]));
        assert!(sim.spread(&[0, 5, 17]) >= sim.spread(&[0, 5]));
    }

    #[test]
    fn cancelled_token_aborts() {
        let graph = build(&[(1, 2)]);
        let sim = DiffusionSimulator::new(&graph, params(0.5, 10)).unwrap();
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(
            sim.estimate_cancellable(&[0], &token),
            Err(AnalysisError::Cancelled)
        ));
    }

    #[test]
    fn draws_are_uniform_in_unit_interval() {
        for edge in 0..1_000 {
            let draw = edge_draw(12345, edge);
            assert!((0.0..1.0).contains(&draw));
        }
    }

    #[test]
    fn draws_are_keyed_by_trial_and_edge() {
        assert_eq!(edge_draw(7, 3), edge_draw(7, 3));
        assert_ne!(edge_draw(7, 3), edge_draw(7, 4));
        assert_ne!(edge_draw(7, 3), edge_draw(8, 3));

        let mean = (0..10_000).map(|edge| edge_draw(99, edge)).sum::<f64>() / 10_000.0;
        assert!((mean - 0.5).abs() < 0.02, "mean {}", mean);
    }
}
