//! Configuration management for the influence analyzer

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// How a repeated (buyer, seller) pair updates the existing edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// The most recent row replaces weight and rating
    #[default]
    LastWriteWins,
    /// Weights accumulate; the most recent known rating is kept
    SumWeights,
}

/// Tunable parameters for a full analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Seed shared by betweenness sampling, Louvain and Monte Carlo draws
    pub seed: u64,

    /// Number of sampled sources for approximate betweenness
    pub betweenness_samples: usize,

    /// Independent Cascade activation probability
    pub ic_probability: f64,

    /// Monte Carlo trials per spread estimate
    pub mc_trials: usize,

    /// Number of seeds selected by CELF and the baselines
    pub celf_seeds: usize,

    /// PageRank damping factor
    pub pagerank_damping: f64,

    /// PageRank convergence tolerance
    pub pagerank_tolerance: f64,

    /// PageRank iteration cap
    pub pagerank_max_iterations: usize,

    /// Whether PageRank transitions follow transaction weights
    pub pagerank_weighted: bool,

    /// Duplicate edge handling during graph construction
    pub merge_policy: MergePolicy,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            betweenness_samples: 1000,
            ic_probability: 0.1,
            mc_trials: 50,
            celf_seeds: 5,
            pagerank_damping: 0.85,
            pagerank_tolerance: 1e-6,
            pagerank_max_iterations: 100,
            pagerank_weighted: true,
            merge_policy: MergePolicy::LastWriteWins,
        }
    }
}

impl AnalysisConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_betweenness_samples(mut self, samples: usize) -> Self {
        self.betweenness_samples = samples;
        self
    }

    pub fn with_ic_probability(mut self, probability: f64) -> Self {
        self.ic_probability = probability;
        self
    }

    pub fn with_mc_trials(mut self, trials: usize) -> Self {
        self.mc_trials = trials;
        self
    }

    pub fn with_celf_seeds(mut self, k: usize) -> Self {
        self.celf_seeds = k;
        self
    }

    pub fn with_merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    pub fn with_pagerank_weighted(mut self, weighted: bool) -> Self {
        self.pagerank_weighted = weighted;
        self
    }

    pub fn with_pagerank_damping(mut self, damping: f64) -> Self {
        self.pagerank_damping = damping;
        self
    }

    pub fn with_pagerank_tolerance(mut self, tolerance: f64) -> Self {
        self.pagerank_tolerance = tolerance;
        self
    }

    pub fn with_pagerank_max_iterations(mut self, iterations: usize) -> Self {
        self.pagerank_max_iterations = iterations;
        self
    }

    /// Reject values that would make the estimators meaningless
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.ic_probability) {
            return Err(AnalysisError::InvalidConfig(format!(
                "ic_probability must be in [0, 1], got {}",
                self.ic_probability
            )));
        }
        if self.mc_trials == 0 {
            return Err(AnalysisError::InvalidConfig(
                "mc_trials must be at least 1".to_string(),
            ));
        }
        if !(self.pagerank_damping > 0.0 && self.pagerank_damping < 1.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "pagerank_damping must be in (0, 1), got {}",
                self.pagerank_damping
            )));
        }
        if !(self.pagerank_tolerance > 0.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "pagerank_tolerance must be positive, got {}",
                self.pagerank_tolerance
            )));
        }
        if self.pagerank_max_iterations == 0 {
            return Err(AnalysisError::InvalidConfig(
                "pagerank_max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Size the global rayon pool and return the thread count in use.
///
/// `threads == 0` uses every available core. The global pool can only be
/// built once per process; later calls fail with `ThreadPool`.
pub fn configure_thread_pool(threads: usize) -> Result<usize> {
    let num_threads = if threads > 0 { threads } else { num_cpus::get() };

    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()?;

    log::info!("Using {} worker threads", num_threads);
    Ok(num_threads)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_run() {
        let config = AnalysisConfig::default();
        assert_eq!(config.seed, 42);
        assert_eq!(config.betweenness_samples, 1000);
        assert_eq!(config.mc_trials, 50);
        assert_eq!(config.celf_seeds, 5);
        assert!((config.ic_probability - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.merge_policy, MergePolicy::LastWriteWins);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(AnalysisConfig::new().with_ic_probability(1.5).validate().is_err());
        assert!(AnalysisConfig::new().with_ic_probability(-0.1).validate().is_err());
        assert!(AnalysisConfig::new().with_mc_trials(0).validate().is_err());

    }

    #[test]
    fn damping_must_be_strictly_inside_unit_interval() {
        assert!(AnalysisConfig::new().with_pagerank_damping(0.0).validate().is_err());
        assert!(AnalysisConfig::new().with_pagerank_damping(1.0).validate().is_err());
        assert!(AnalysisConfig::new().with_pagerank_damping(f64::NAN).validate().is_err());
        assert!(AnalysisConfig::new().with_pagerank_damping(0.5).validate().is_ok());
    }

    #[test]
    fn tolerance_must_be_positive() {
        assert!(AnalysisConfig::new().with_pagerank_tolerance(0.0).validate().is_err());
        assert!(AnalysisConfig::new().with_pagerank_tolerance(-1e-6).validate().is_err());
        assert!(AnalysisConfig::new().with_pagerank_tolerance(f64::NAN).validate().is_err());
        assert!(AnalysisConfig::new().with_pagerank_tolerance(1e-9).validate().is_ok());
    }

    #[test]
    fn pagerank_needs_at_least_one_iteration() {
        assert!(AnalysisConfig::new().with_pagerank_max_iterations(0).validate().is_err());
        assert!(AnalysisConfig::new().with_pagerank_max_iterations(1).validate().is_ok());
    }

    #[test]
    fn merge_policy_parses_from_cli_names() {
        assert_eq!(
            MergePolicy::from_str("sum-weights", true).unwrap(),
            MergePolicy::SumWeights
        );
        assert_eq!(
            MergePolicy::from_str("last-write-wins", true).unwrap(),
            MergePolicy::LastWriteWins
        );
        assert!(MergePolicy::from_str("average", true).is_err());
    }

    #[test]
    fn probability_bounds_are_inclusive() {
        assert!(AnalysisConfig::new().with_ic_probability(0.0).validate().is_ok());
        assert!(AnalysisConfig::new().with_ic_probability(1.0).validate().is_ok());
    }
}
