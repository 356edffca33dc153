//! Immutable compressed representation of the transaction graph

use std::collections::HashMap;
use std::mem;

use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::data::Tags;

/// A marketplace user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// External user id
    pub id: u64,
    pub main_tag: String,
    pub detailed_tag: String,
}

impl Node {
    pub fn new(id: u64, tags: &Tags) -> Self {
        Self {
            id,
            main_tag: tags.main_tag.clone(),
            detailed_tag: tags.detailed_tag.clone(),
        }
    }
}

/// Attributes of a directed buyer -> seller edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeAttrs {
    /// Transaction count, at least 1
    pub weight: u32,
    /// Rating on the 1..=5 scale, 0 when unknown
    pub rating: u8,
}

/// Which adjacency to consult for neighborhood queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

/// Compressed sparse representation of the directed transaction graph.
///
/// Node indices are dense `u32` positions assigned in first-seen order.
/// Edge ids are positions in the outgoing edge array, so per-edge data
/// (`EdgeAttrs`, random draws in the simulator) is addressed by edge id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionGraph {
    pub(crate) nodes: Vec<Node>,

    pub(crate) id_to_index: HashMap<u64, u32>,

    /// out_offsets[i]..out_offsets[i+1] is the outgoing edge range of node i
    pub(crate) out_offsets: Vec<u32>,

    /// Targets of outgoing edges, sorted within each node
    pub(crate) out_targets: Vec<u32>,

    /// Attributes parallel to `out_targets`
    pub(crate) out_attrs: Vec<EdgeAttrs>,

    pub(crate) in_offsets: Vec<u32>,

    /// Sources of incoming edges, sorted within each node
    pub(crate) in_sources: Vec<u32>,

    /// Edge id of each incoming edge, parallel to `in_sources`
    pub(crate) in_edge_ids: Vec<u32>,
}

impl TransactionGraph {
    /// Assemble a graph from sorted per-node outgoing lists.
    ///
    /// Panics if the adjacency is inconsistent; that is a construction
    /// defect, never an input error.
    pub(crate) fn from_sorted_adjacency(
        nodes: Vec<Node>,
        id_to_index: HashMap<u64, u32>,
        adjacency: Vec<Vec<(u32, EdgeAttrs)>>,
    ) -> Self {
        let node_count = nodes.len();
        assert_eq!(adjacency.len(), node_count, "adjacency must cover every node");
        assert_eq!(id_to_index.len(), node_count, "id index must cover every node");

        let edge_count: usize = adjacency.iter().map(|list| list.len()).sum();

        let mut out_offsets = Vec::with_capacity(node_count + 1);
        let mut out_targets = Vec::with_capacity(edge_count);
        let mut out_attrs = Vec::with_capacity(edge_count);
        let mut in_counts = vec![0u32; node_count];

        out_offsets.push(0);
        for (src, list) in adjacency.into_iter().enumerate() {
            debug_assert!(list.windows(2).all(|w| w[0].0 < w[1].0), "unsorted adjacency");
            for (dst, attrs) in list {
                assert!((dst as usize) < node_count, "edge target out of range");
                assert_ne!(dst as usize, src, "self-loop reached the graph");
                out_targets.push(dst);
                out_attrs.push(attrs);
                in_counts[dst as usize] += 1;
            }
            out_offsets.push(out_targets.len() as u32);
        }

        let mut in_offsets = Vec::with_capacity(node_count + 1);
        in_offsets.push(0);
        let mut offset = 0;
        for &count in &in_counts {
            offset += count;
            in_offsets.push(offset);
        }

        // Sources are visited in increasing order, so each incoming list
        // comes out sorted without an extra pass
        let mut in_sources = vec![0u32; edge_count];
        let mut in_edge_ids = vec![0u32; edge_count];
        let mut cursor: Vec<u32> = in_offsets[..node_count].to_vec();
        for src in 0..node_count {
            let start = out_offsets[src] as usize;
            let end = out_offsets[src + 1] as usize;
            for edge in start..end {
                let dst = out_targets[edge] as usize;
                let pos = cursor[dst] as usize;
                in_sources[pos] = src as u32;
                in_edge_ids[pos] = edge as u32;
                cursor[dst] += 1;
            }
        }

        Self {
            nodes,
            id_to_index,
            out_offsets,
            out_targets,
            out_attrs,
            in_offsets,
            in_sources,
            in_edge_ids,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.out_targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, idx: u32) -> &Node {
        &self.nodes[idx as usize]
    }

    /// External id of a node index
    pub fn node_id(&self, idx: u32) -> u64 {
        self.nodes[idx as usize].id
    }

    /// Dense index of an external id
    pub fn index_of(&self, id: u64) -> Option<u32> {
        self.id_to_index.get(&id).copied()
    }

    /// Targets of the outgoing edges of `idx`, sorted
    pub fn successors(&self, idx: u32) -> &[u32] {
        let start = self.out_offsets[idx as usize] as usize;
        let end = self.out_offsets[idx as usize + 1] as usize;
        &self.out_targets[start..end]
    }

    /// Sources of the incoming edges of `idx`, sorted
    pub fn predecessors(&self, idx: u32) -> &[u32] {
        let start = self.in_offsets[idx as usize] as usize;
        let end = self.in_offsets[idx as usize + 1] as usize;
        &self.in_sources[start..end]
    }

    /// Edge ids of the outgoing edges of `idx`
    pub fn out_edge_ids(&self, idx: u32) -> std::ops::Range<usize> {
        self.out_offsets[idx as usize] as usize..self.out_offsets[idx as usize + 1] as usize
    }

    /// Edge ids parallel to `predecessors(idx)`
    pub fn in_edge_ids(&self, idx: u32) -> &[u32] {
        let start = self.in_offsets[idx as usize] as usize;
        let end = self.in_offsets[idx as usize + 1] as usize;
        &self.in_edge_ids[start..end]
    }

    pub fn edge_target(&self, edge_id: usize) -> u32 {
        self.out_targets[edge_id]
    }

    pub fn edge_attrs(&self, edge_id: usize) -> &EdgeAttrs {
        &self.out_attrs[edge_id]
    }

    pub fn out_degree(&self, idx: u32) -> usize {
        (self.out_offsets[idx as usize + 1] - self.out_offsets[idx as usize]) as usize
    }

    pub fn in_degree(&self, idx: u32) -> usize {
        (self.in_offsets[idx as usize + 1] - self.in_offsets[idx as usize]) as usize
    }

    /// Degree in the requested direction; `Both` counts a reciprocal
    /// pair twice, as a directed graph does
    pub fn degree(&self, idx: u32, direction: Direction) -> usize {
        match direction {
            Direction::Outgoing => self.out_degree(idx),
            Direction::Incoming => self.in_degree(idx),
            Direction::Both => self.out_degree(idx) + self.in_degree(idx),
        }
    }

    /// Check if there's an edge from src to dst
    pub fn has_edge(&self, src: u32, dst: u32) -> bool {
        self.successors(src).binary_search(&dst).is_ok()
    }

    /// Attributes of the edge src -> dst, if present
    pub fn edge(&self, src: u32, dst: u32) -> Option<&EdgeAttrs> {
        let start = self.out_offsets[src as usize] as usize;
        self.successors(src)
            .binary_search(&dst)
            .ok()
            .map(|pos| &self.out_attrs[start + pos])
    }

    /// All edges as (source, target, attributes), grouped by source
    pub fn edges(&self) -> impl Iterator<Item = (u32, u32, &EdgeAttrs)> + '_ {
        (0..self.node_count() as u32).flat_map(move |src| {
            self.out_edge_ids(src)
                .map(move |e| (src, self.out_targets[e], &self.out_attrs[e]))
        })
    }

    /// Neighbor ids of a user by external id
    pub fn neighbors_by_id(&self, id: u64, direction: Direction) -> Option<Vec<u64>> {
        let idx = self.index_of(id)?;
        let ids = |slice: &[u32]| slice.iter().map(|&n| self.node_id(n)).collect::<Vec<_>>();
        Some(match direction {
            Direction::Outgoing => ids(self.successors(idx)),
            Direction::Incoming => ids(self.predecessors(idx)),
            Direction::Both => {
                let mut all = ids(self.successors(idx));
                all.extend(ids(self.predecessors(idx)));
                all.sort_unstable();
                all.dedup();
                all
            }
        })
    }

    /// petgraph copy keyed by external ids, for graph-exchange export
    pub fn to_petgraph(&self) -> DiGraph<u64, EdgeAttrs> {
        let mut graph = DiGraph::with_capacity(self.node_count(), self.edge_count());
        for node in &self.nodes {
            graph.add_node(node.id);
        }
        for (src, dst, attrs) in self.edges() {
            graph.add_edge(NodeIndex::new(src as usize), NodeIndex::new(dst as usize), *attrs);
        }
        graph
    }

    /// Estimate memory usage in bytes
    pub fn memory_usage(&self) -> usize {
        let base = mem::size_of::<Self>();
        let offsets = (self.out_offsets.capacity() + self.in_offsets.capacity()) * mem::size_of::<u32>();
        let edges = (self.out_targets.capacity() + self.in_sources.capacity() + self.in_edge_ids.capacity())
            * mem::size_of::<u32>()
            + self.out_attrs.capacity() * mem::size_of::<EdgeAttrs>();
        let nodes = self
            .nodes
            .iter()
            .map(|n| mem::size_of::<Node>() + n.main_tag.capacity() + n.detailed_tag.capacity())
            .sum::<usize>();
        let index = self.id_to_index.capacity() * (mem::size_of::<u64>() + mem::size_of::<u32>());

        base + offsets + edges + nodes + index
    }
}
