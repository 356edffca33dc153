//! Results persistence module

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use itertools::Itertools;
use serde::Serialize;
use serde_json::json;

use crate::analysis::AnalysisResults;
use crate::error::Result;

/// Save analysis results to the specified directory
pub fn save_results(results: &AnalysisResults, output_dir: impl AsRef<Path>) -> Result<()> {
    let output_dir = output_dir.as_ref();
    log::info!("Saving results to {}", output_dir.display());

    // Ensure output directory exists
    fs::create_dir_all(output_dir)?;

    write_json(output_dir.join("structural_report.json"), &results.structure)?;
    save_node_report(results, output_dir)?;
    save_communities(results, output_dir)?;
    save_influence(results, output_dir)?;
    save_incongruences(results, output_dir)?;
    save_summary(results, output_dir)?;

    log::info!("Results saved successfully");
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

fn save_node_report(results: &AnalysisResults, output_dir: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_dir.join("node_report.csv"))?;
    for node in &results.nodes {
        writer.serialize(node)?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct CommunityRow {
    node_id: u64,
    community: u32,
}

/// Node assignment table plus per-community statistics
fn save_communities(results: &AnalysisResults, output_dir: &Path) -> Result<()> {
    log::info!("Saving {} communities", results.partition.community_count());

    let mut writer = csv::Writer::from_path(output_dir.join("communities.csv"))?;
    for (idx, &community) in results.partition.assignment().iter().enumerate() {
        writer.serialize(CommunityRow {
            node_id: results.graph.node_id(idx as u32),
            community,
        })?;
    }
    writer.flush()?;

    let summary = json!({
        "modularity": results.modularity,
        "community_count": results.partition.community_count(),
        "communities": results.communities,
    });
    write_json(output_dir.join("community_summary.json"), &summary)
}

#[derive(Serialize)]
struct StrategyRow<'a> {
    strategy: &'a str,
    seeds: String,
    spread: f64,
    std_dev: f64,
    ci95_low: f64,
    ci95_high: f64,
    trials: usize,
}

fn save_influence(results: &AnalysisResults, output_dir: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_dir.join("influence_comparison.csv"))?;
    for row in &results.strategies {
        let (ci95_low, ci95_high) = row.spread.ci95();
        writer.serialize(StrategyRow {
            strategy: &row.strategy,
            seeds: row.seeds.iter().join(";"),
            spread: row.spread.mean,
            std_dev: row.spread.std_dev,
            ci95_low,
            ci95_high,
            trials: row.spread.trials,
        })?;
    }
    writer.flush()?;

    let comparison = json!({
        "probability": results.config.ic_probability,
        "trials": results.config.mc_trials,
        "strategies": results.strategies,
        "celf": {
            "marginal_gains": results.celf.marginal_gains,
            "evaluations": results.celf.evaluations,
        },
    });
    write_json(output_dir.join("influence_comparison.json"), &comparison)
}

fn save_incongruences(results: &AnalysisResults, output_dir: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_dir.join("rating_incongruences.csv"))?;
    for row in &results.incongruences.incongruences {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Run parameters, ingest counters, stage timings and headline numbers
fn save_summary(results: &AnalysisResults, output_dir: &Path) -> Result<()> {
    let celf_seeds: Vec<u64> = results
        .celf
        .seeds
        .iter()
        .map(|&idx| results.graph.node_id(idx))
        .collect();

    let summary = json!({
        "config": results.config,
        "ingest": results.ingest,
        "timings": results.timings,
        "graph_stats": {
            "node_count": results.graph.node_count(),
            "edge_count": results.graph.edge_count(),
            "reciprocity": results.structure.reciprocity,
            "weakly_connected_components": results.structure.weakly_connected_components,
        },
        "community_stats": {
            "community_count": results.partition.community_count(),
            "modularity": results.modularity,
            "largest_community_size": results.partition.sizes().into_iter().max().unwrap_or(0),
        },
        "influence": {
            "celf_seeds": celf_seeds,
            "celf_spread": results.celf.spread.mean,
        },
        "rating_incongruences": results.incongruences.incongruences.len(),
    });

    write_json(output_dir.join("summary.json"), &summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::run_analysis;
    use crate::config::AnalysisConfig;
    use crate::data::RawTransaction;
    use crate::influence::CancellationToken;

    fn raw(buyer: u64, seller: u64, seller_rating: &str) -> RawTransaction {
        RawTransaction {
            buyer_id: Some(buyer.to_string()),
            seller_id: Some(seller.to_string()),
            buyer_rating: Some("5".to_string()),
            seller_rating: Some(seller_rating.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn writes_every_artifact() {
        let rows = vec![raw(1, 2, "5"), raw(2, 3, "1"), raw(3, 4, "0")];
        let config = AnalysisConfig::default().with_mc_trials(5).with_celf_seeds(2);
        let results = run_analysis(&rows, &config, &CancellationToken::new()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        save_results(&results, dir.path()).unwrap();

        for name in [
            "structural_report.json",
            "node_report.csv",
            "communities.csv",
            "community_summary.json",
            "influence_comparison.csv",
            "influence_comparison.json",
            "rating_incongruences.csv",
            "summary.json",
        ] {
            assert!(dir.path().join(name).exists(), "missing {}", name);
        }

        let nodes = fs::read_to_string(dir.path().join("node_report.csv")).unwrap();
        assert!(nodes.starts_with("node_id,main_tag,detailed_tag,in_degree"));
        assert_eq!(nodes.lines().count(), 1 + results.graph.node_count());

        let summary: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("summary.json")).unwrap()).unwrap();
        assert_eq!(summary["graph_stats"]["node_count"], 4);
        assert_eq!(summary["config"]["seed"], 42);
    }
}
