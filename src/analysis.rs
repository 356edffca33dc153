//! End-to-end analysis pipeline

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::centrality::{compute_centralities, CentralityScores};
use crate::cluster::{community_summaries, CommunityLabeler, CommunitySummary, DominantTagLabeler, Louvain, Partition, Partitioner};
use crate::config::AnalysisConfig;
use crate::data::incongruence::{find_incongruences, IncongruenceReport, DEFAULT_MIN_GAP};
use crate::data::RawTransaction;
use crate::error::Result;
use crate::graph::{GraphBuilder, IngestStats, TransactionGraph, UndirectedGraph};
use crate::influence::{celf, compare_strategies, CancellationToken, CelfResult, DiffusionSimulator, SimulationParams, StrategyResult};
use crate::metrics::{analyze_structure, StructuralReport};

/// Per-node metrics row; one per node regardless of graph size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeReport {
    pub node_id: u64,
    pub main_tag: String,
    pub detailed_tag: String,
    pub in_degree: f64,
    pub out_degree: f64,
    pub pagerank: f64,
    pub betweenness: f64,
    pub community: u32,
    pub community_label: Option<String>,
}

/// Wall-clock duration of one pipeline stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: String,
    pub seconds: f64,
}

/// Everything produced by a run
#[derive(Debug, Clone)]
pub struct AnalysisResults {
    pub config: AnalysisConfig,
    pub graph: TransactionGraph,
    pub ingest: IngestStats,
    pub structure: StructuralReport,
    pub centrality: CentralityScores,
    pub partition: Partition,
    pub modularity: f64,
    pub communities: Vec<CommunitySummary>,
    pub nodes: Vec<NodeReport>,
    pub celf: CelfResult,
    pub strategies: Vec<StrategyResult>,
    pub incongruences: IncongruenceReport,
    pub timings: Vec<StageTiming>,
}

#[derive(Default)]
struct Stopwatch {
    timings: Vec<StageTiming>,
}

impl Stopwatch {
    fn time<T>(&mut self, stage: &str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let value = f();
        let seconds = start.elapsed().as_secs_f64();
        log::info!("Stage {} finished in {:.2}s", stage, seconds);
        self.timings.push(StageTiming {
            stage: stage.to_string(),
            seconds,
        });
        value
    }
}

/// Run the full pipeline with the default community labeler
pub fn run_analysis(
    rows: &[RawTransaction],
    config: &AnalysisConfig,
    token: &CancellationToken,
) -> Result<AnalysisResults> {
    run_analysis_with_labeler(rows, config, &DominantTagLabeler, token)
}

/// Run the full pipeline: build the graph, compute structure and
/// centralities, detect communities, select seeds and compare strategies
pub fn run_analysis_with_labeler(
    rows: &[RawTransaction],
    config: &AnalysisConfig,
    labeler: &dyn CommunityLabeler,
    token: &CancellationToken,
) -> Result<AnalysisResults> {
    config.validate()?;
    let mut watch = Stopwatch::default();

    let (graph, records, ingest) = watch.time("build_graph", || {
        let mut builder = GraphBuilder::with_capacity(config.merge_policy, rows.len());
        let records = builder.ingest_all(rows);
        let ingest = builder.stats().clone();
        (builder.build(), records, ingest)
    });
    log::info!(
        "Graph has {} nodes and {} edges (~{} KiB)",
        graph.node_count(),
        graph.edge_count(),
        graph.memory_usage() / 1024
    );

    let undirected = UndirectedGraph::from_directed(&graph);
    let structure = watch.time("structure", || analyze_structure(&graph, &undirected));

    let (centrality, (partition, modularity)) = watch.time("centrality_and_communities", || {
        rayon::join(
            || compute_centralities(&graph, config),
            || Louvain::default().partition(&undirected, config.seed),
        )
    });

    let communities = community_summaries(&graph, &partition, labeler);
    let nodes = node_reports(&graph, &centrality, &partition, &communities);

    let simulator = DiffusionSimulator::new(&graph, SimulationParams::from(config))?;
    let best = watch.time("celf", || celf(&simulator, config.celf_seeds, token))?;
    let strategies = watch.time("baselines", || compare_strategies(&simulator, &best, &centrality, token))?;

    let incongruences = find_incongruences(&records, DEFAULT_MIN_GAP);
    log::info!(
        "{} of {} rated transactions have incongruent ratings",
        incongruences.incongruences.len(),
        incongruences.rated_pairs
    );

    Ok(AnalysisResults {
        config: config.clone(),
        ingest,
        structure,
        centrality,
        partition,
        modularity,
        communities,
        nodes,
        celf: best,
        strategies,
        incongruences,
        timings: watch.timings,
        graph,
    })
}

/// Join node attributes, centralities and community assignment
pub fn node_reports(
    graph: &TransactionGraph,
    centrality: &CentralityScores,
    partition: &Partition,
    communities: &[CommunitySummary],
) -> Vec<NodeReport> {
    graph
        .nodes()
        .iter()
        .enumerate()
        .map(|(idx, node)| {
            let community = partition.community_of(idx as u32);
            NodeReport {
                node_id: node.id,
                main_tag: node.main_tag.clone(),
                detailed_tag: node.detailed_tag.clone(),
                in_degree: centrality.in_degree[idx],
                out_degree: centrality.out_degree[idx],
                pagerank: centrality.pagerank[idx],
                betweenness: centrality.betweenness[idx],
                community,
                community_label: communities.get(community as usize).map(|c| c.label.clone()),
            }
        })
        .collect()
}
