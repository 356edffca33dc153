//! Core library functions for the marketplace influence analyzer

pub mod analysis;
pub mod centrality;
pub mod cluster;
pub mod config;
pub mod data;
pub mod error;
pub mod graph;
pub mod influence;
pub mod metrics;
pub mod storage;
pub mod viz;

pub use analysis::{run_analysis, run_analysis_with_labeler, AnalysisResults, NodeReport};
pub use config::{configure_thread_pool, AnalysisConfig, MergePolicy};
pub use error::{AnalysisError, Result, RowError};
pub use graph::{GraphBuilder, TransactionGraph, UndirectedGraph};
pub use influence::{CancellationToken, DiffusionSimulator, SimulationParams, SpreadEstimate};
