//! Annotated graph export for external visualization tools

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use petgraph::dot::{Config, Dot};
use petgraph::visit::EdgeRef;
use serde::Serialize;

use crate::analysis::{AnalysisResults, NodeReport};
use crate::error::Result;

/// Write GraphML, DOT and JSON snapshots under `<output_dir>/graph`
pub fn export_annotated_graph(results: &AnalysisResults, output_dir: impl AsRef<Path>) -> Result<()> {
    let graph_dir = output_dir.as_ref().join("graph");
    fs::create_dir_all(&graph_dir)?;

    log::info!(
        "Exporting annotated graph ({} nodes, {} edges) to {}",
        results.graph.node_count(),
        results.graph.edge_count(),
        graph_dir.display()
    );

    write_graphml(results, &graph_dir.join("annotated_graph.graphml"))?;
    write_dot(results, &graph_dir.join("annotated_graph.dot"))?;
    write_json_snapshot(results, &graph_dir.join("annotated_graph.json"))?;

    Ok(())
}

/// Node and edge attributes as GraphML `<data>` keys
fn write_graphml(results: &AnalysisResults, path: &Path) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);

    writeln!(file, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
    writeln!(file, "<graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\">")?;
    for (key, ty) in [
        ("main_tag", "string"),
        ("detailed_tag", "string"),
        ("in_degree", "double"),
        ("out_degree", "double"),
        ("pagerank", "double"),
        ("betweenness", "double"),
        ("community", "int"),
        ("community_label", "string"),
    ] {
        writeln!(
            file,
            "  <key id=\"{0}\" for=\"node\" attr.name=\"{0}\" attr.type=\"{1}\"/>",
            key, ty
        )?;
    }
    writeln!(file, "  <key id=\"weight\" for=\"edge\" attr.name=\"weight\" attr.type=\"int\"/>")?;
    writeln!(file, "  <key id=\"rating\" for=\"edge\" attr.name=\"rating\" attr.type=\"int\"/>")?;
    writeln!(file, "  <graph id=\"G\" edgedefault=\"directed\">")?;

    for node in &results.nodes {
        writeln!(file, "    <node id=\"n{}\">", node.node_id)?;
        writeln!(file, "      <data key=\"main_tag\">{}</data>", escape_xml(&node.main_tag))?;
        writeln!(file, "      <data key=\"detailed_tag\">{}</data>", escape_xml(&node.detailed_tag))?;
        writeln!(file, "      <data key=\"in_degree\">{}</data>", node.in_degree)?;
        writeln!(file, "      <data key=\"out_degree\">{}</data>", node.out_degree)?;
        writeln!(file, "      <data key=\"pagerank\">{}</data>", node.pagerank)?;
        writeln!(file, "      <data key=\"betweenness\">{}</data>", node.betweenness)?;
        writeln!(file, "      <data key=\"community\">{}</data>", node.community)?;
        if let Some(label) = &node.community_label {
            writeln!(file, "      <data key=\"community_label\">{}</data>", escape_xml(label))?;
        }
        writeln!(file, "    </node>")?;
    }

    let graph = &results.graph;
    for (edge_id, (src, dst, attrs)) in graph.edges().enumerate() {
        writeln!(
            file,
            "    <edge id=\"e{}\" source=\"n{}\" target=\"n{}\">",
            edge_id,
            graph.node_id(src),
            graph.node_id(dst)
        )?;
        writeln!(file, "      <data key=\"weight\">{}</data>", attrs.weight)?;
        writeln!(file, "      <data key=\"rating\">{}</data>", attrs.rating)?;
        writeln!(file, "    </edge>")?;
    }

    writeln!(file, "  </graph>")?;
    writeln!(file, "</graphml>")?;
    file.flush()?;
    Ok(())
}

/// Graphviz export; edges are labeled with transaction counts and
/// nodes carry their community
fn write_dot(results: &AnalysisResults, path: &Path) -> Result<()> {
    let graph = results.graph.to_petgraph().map(|_, &id| id, |_, attrs| attrs.weight);
    let nodes = &results.nodes;

    let edge_attrs = |_, edge: petgraph::graph::EdgeReference<'_, u32>| {
        format!("label=\"{}\" weight={}", edge.weight(), edge.weight())
    };
    let node_attrs = |_, (idx, id): (petgraph::graph::NodeIndex, &u64)| {
        let report = &nodes[idx.index()];
        format!(
            "label=\"{}\" community={} pagerank={:.6}",
            id, report.community, report.pagerank
        )
    };
    let dot = Dot::with_attr_getters(
        &graph,
        &[Config::NodeNoLabel, Config::EdgeNoLabel],
        &edge_attrs,
        &node_attrs,
    );

    let mut file = BufWriter::new(File::create(path)?);
    write!(file, "{}", dot)?;
    file.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct EdgeSnapshot {
    source: u64,
    target: u64,
    weight: u32,
    rating: u8,
}

#[derive(Serialize)]
struct GraphSnapshot<'a> {
    nodes: &'a [NodeReport],
    edges: Vec<EdgeSnapshot>,
    modularity: f64,
}

fn write_json_snapshot(results: &AnalysisResults, path: &Path) -> Result<()> {
    let graph = &results.graph;
    let snapshot = GraphSnapshot {
        nodes: &results.nodes,
        edges: graph
            .edges()
            .map(|(src, dst, attrs)| EdgeSnapshot {
                source: graph.node_id(src),
                target: graph.node_id(dst),
                weight: attrs.weight,
                rating: attrs.rating,
            })
            .collect(),
        modularity: results.modularity,
    };

    let mut file = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut file, &snapshot)?;
    file.flush()?;
    Ok(())
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
