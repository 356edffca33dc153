//! Lazy-greedy (CELF) seed selection

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::influence::{CancellationToken, DiffusionSimulator, SpreadEstimate};

/// Seeds chosen by CELF with their marginal gains
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CelfResult {
    /// Node indices in selection order
    pub seeds: Vec<u32>,
    /// Gain of each seed at the time it was accepted
    pub marginal_gains: Vec<f64>,
    /// Final estimate for the whole seed set
    pub spread: SpreadEstimate,
    /// Number of spread estimates performed
    pub evaluations: usize,
}

/// Heap entry ordered by gain, then by lower external id
struct Candidate {
    node: u32,
    id: u64,
    gain: f64,
    /// Seed-set size the gain was computed against
    round: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.gain
            .total_cmp(&other.gain)
            .then_with(|| Reverse(self.id).cmp(&Reverse(other.id)))
    }
}

/// Select up to `k` seeds maximizing expected spread.
///
/// Candidates are the nodes with at least one outgoing edge. A stale
/// candidate whose recomputed gain is at least the next best upper bound
/// is accepted without further evaluations. When the two are equal the
/// lower node id wins, so a fresh gain is pushed back behind a stale
/// lower-id entry with the same bound.
pub fn celf(simulator: &DiffusionSimulator<'_>, k: usize, token: &CancellationToken) -> Result<CelfResult> {
    let graph = simulator.graph();
    let candidates: Vec<u32> = (0..graph.node_count() as u32)
        .filter(|&u| graph.out_degree(u) > 0)
        .collect();
    let k = k.min(candidates.len());
    let trials = simulator.params().trials;

    if k == 0 {
        return Ok(CelfResult {
            spread: SpreadEstimate::zero(trials),
            ..Default::default()
        });
    }

    log::info!("Running CELF for {} seeds over {} candidates", k, candidates.len());

    let singletons: Vec<Result<f64>> = candidates
        .par_iter()
        .map(|&u| simulator.estimate_cancellable(&[u], token).map(|e| e.mean))
        .collect();

    let mut heap = BinaryHeap::with_capacity(candidates.len());
    for (&node, gain) in candidates.iter().zip(singletons) {
        heap.push(Candidate {
            node,
            id: graph.node_id(node),
            gain: gain?,
            round: 0,
        });
    }
    let mut evaluations = candidates.len();

    let mut seeds = Vec::with_capacity(k);
    let mut marginal_gains = Vec::with_capacity(k);
    let mut current = 0.0;

    while seeds.len() < k {
        let Some(mut top) = heap.pop() else {
            break;
        };

        if top.round != seeds.len() {
            if token.is_cancelled() {
                return Err(AnalysisError::Cancelled);
            }
            seeds.push(top.node);
            let with_top = simulator.estimate_cancellable(&seeds, token)?.mean;
            seeds.pop();
            evaluations += 1;

            top.gain = with_top - current;
            top.round = seeds.len();

            // Same (gain, lower id) order as the heap
            let beats_next = heap.peek().map_or(true, |next| &top > next);
            if !beats_next {
                heap.push(top);
                continue;
            }
        }

        log::debug!(
            "CELF seed {}: user {} (gain {:.3})",
            seeds.len() + 1,
            top.id,
            top.gain
        );
        current += top.gain;
        seeds.push(top.node);
        marginal_gains.push(top.gain);
    }

    let spread = simulator.estimate_cancellable(&seeds, token)?;
    evaluations += 1;
    log::info!(
        "CELF selected {} seeds, expected spread {:.2} after {} evaluations",
        seeds.len(),
        spread.mean,
        evaluations
    );

    Ok(CelfResult {
        seeds,
        marginal_gains,
        spread,
        evaluations,
    })
}
