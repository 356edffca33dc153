//! Graph construction from transaction rows

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::MergePolicy;
use crate::data::{RawTransaction, Tags, TransactionRecord};
use crate::error::RowError;
use crate::graph::compressed::{EdgeAttrs, Node, TransactionGraph};

/// Individual row warnings logged before switching to debug level
const MAX_ROW_WARNINGS: usize = 20;

/// Counters collected while ingesting rows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    pub rows_seen: usize,
    pub rows_accepted: usize,
    pub missing_field: usize,
    pub invalid_id: usize,
    pub self_loops: usize,
    /// Seller -> buyer edges created from a positive counter-rating
    pub reciprocal_edges: usize,
    /// Edge insertions that hit an existing (from, to) pair
    pub merged_duplicates: usize,
}

impl IngestStats {
    pub fn rows_dropped(&self) -> usize {
        self.missing_field + self.invalid_id + self.self_loops
    }

    fn record_rejection(&mut self, err: &RowError) {
        match err {
            RowError::MissingField(_) => self.missing_field += 1,
            RowError::InvalidId { .. } => self.invalid_id += 1,
            RowError::SelfLoop(_) => self.self_loops += 1,
        }
    }
}

/// Builder for incrementally constructing a TransactionGraph.
///
/// Edge semantics on a repeated (from, to) pair follow the configured
/// [`MergePolicy`]: `LastWriteWins` replaces weight and rating with the
/// newest row, `SumWeights` adds the weights and keeps the newest known
/// rating.
pub struct GraphBuilder {
    merge_policy: MergePolicy,

    /// Mapping from external ids to node indices
    id_to_index: HashMap<u64, u32>,

    nodes: Vec<Node>,

    /// Outgoing edges keyed by target, one map per node
    adjacency: Vec<HashMap<u32, EdgeAttrs>>,

    stats: IngestStats,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new(MergePolicy::default())
    }
}

impl GraphBuilder {
    pub fn new(merge_policy: MergePolicy) -> Self {
        Self::with_capacity(merge_policy, 0)
    }

    /// Create a new graph builder with the given node capacity
    pub fn with_capacity(merge_policy: MergePolicy, capacity: usize) -> Self {
        Self {
            merge_policy,
            id_to_index: HashMap::with_capacity(capacity),
            nodes: Vec::with_capacity(capacity),
            adjacency: Vec::with_capacity(capacity),
            stats: IngestStats::default(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    /// Get or create the node for `id`.
    ///
    /// Tags are only applied when the node is created; later calls never
    /// overwrite them.
    pub fn add_or_get_node(&mut self, id: u64, tags: &Tags) -> u32 {
        if let Some(&idx) = self.id_to_index.get(&id) {
            return idx;
        }

        let idx = self.nodes.len() as u32;
        self.id_to_index.insert(id, idx);
        self.nodes.push(Node::new(id, tags));
        self.adjacency.push(HashMap::new());
        idx
    }

    /// Add or update the directed edge `from -> to`.
    ///
    /// Endpoints that do not exist yet are created with unknown tags.
    pub fn add_edge(&mut self, from: u64, to: u64, weight: u32, rating: u8) -> Result<(), RowError> {
        if from == to {
            return Err(RowError::SelfLoop(from));
        }
        let src = self.add_or_get_node(from, &Tags::default());
        let dst = self.add_or_get_node(to, &Tags::default());
        self.insert_edge(src, dst, EdgeAttrs { weight: weight.max(1), rating });
        Ok(())
    }

    fn insert_edge(&mut self, src: u32, dst: u32, attrs: EdgeAttrs) {
        let policy = self.merge_policy;
        let edges = &mut self.adjacency[src as usize];
        match edges.get_mut(&dst) {
            Some(existing) => {
                self.stats.merged_duplicates += 1;
                match policy {
                    MergePolicy::LastWriteWins => *existing = attrs,
                    MergePolicy::SumWeights => {
                        existing.weight = existing.weight.saturating_add(attrs.weight);
                        if attrs.rating > 0 {
                            existing.rating = attrs.rating;
                        }
                    }
                }
            }
            None => {
                edges.insert(dst, attrs);
            }
        }
    }

    /// Add a validated record: both endpoints, the buyer -> seller edge
    /// and, when the seller's counter-rating is positive, the reverse edge.
    ///
    /// Both edges are weighted by the transaction count. The counter-rating
    /// only sets the reverse edge's `rating`, never its weight, so influence
    /// and PageRank follow trade volume in both directions.
    pub fn add_record(&mut self, record: &TransactionRecord) {
        let buyer = self.add_or_get_node(record.buyer_id, &record.buyer_tags);
        let seller = self.add_or_get_node(record.seller_id, &record.seller_tags);

        self.insert_edge(
            buyer,
            seller,
            EdgeAttrs {
                weight: record.transactions.max(1),
                rating: record.buyer_rating,
            },
        );

        if let Some(counter_rating) = record.seller_rating.filter(|&r| r > 0) {
            self.insert_edge(
                seller,
                buyer,
                EdgeAttrs {
                    weight: record.transactions.max(1),
                    rating: counter_rating,
                },
            );
            self.stats.reciprocal_edges += 1;
        }
    }

    /// Validate and add one raw row, returning the parsed record
    pub fn ingest(&mut self, raw: &RawTransaction) -> Result<TransactionRecord, RowError> {
        self.stats.rows_seen += 1;
        match TransactionRecord::try_from(raw) {
            Ok(record) => {
                self.add_record(&record);
                self.stats.rows_accepted += 1;
                Ok(record)
            }
            Err(err) => {
                self.stats.record_rejection(&err);
                Err(err)
            }
        }
    }

    /// Ingest a batch of rows. Malformed rows are logged and dropped;
    /// the accepted records are returned for row-level analyses.
    pub fn ingest_all<'a, I>(&mut self, rows: I) -> Vec<TransactionRecord>
    where
        I: IntoIterator<Item = &'a RawTransaction>,
    {
        let mut accepted = Vec::new();
        let mut warned = 0usize;

        for (row_number, raw) in rows.into_iter().enumerate() {
            match self.ingest(raw) {
                Ok(record) => accepted.push(record),
                Err(err) => {
                    if warned < MAX_ROW_WARNINGS {
                        log::warn!("Dropping row {}: {}", row_number + 1, err);
                        warned += 1;
                        if warned == MAX_ROW_WARNINGS {
                            log::warn!("Further dropped rows are only logged at debug level");
                        }
                    } else {
                        log::debug!("Dropping row {}: {}", row_number + 1, err);
                    }
                }
            }
        }

        log::info!(
            "Ingested {} of {} rows ({} dropped: {} missing field, {} invalid id, {} self-loop)",
            self.stats.rows_accepted,
            self.stats.rows_seen,
            self.stats.rows_dropped(),
            self.stats.missing_field,
            self.stats.invalid_id,
            self.stats.self_loops
        );

        accepted
    }

    /// Build the compressed graph
    pub fn build(self) -> TransactionGraph {
        let adjacency: Vec<Vec<(u32, EdgeAttrs)>> = self
            .adjacency
            .into_iter()
            .map(|edges| {
                let mut list: Vec<(u32, EdgeAttrs)> = edges.into_iter().collect();
                // Sort for binary search efficiency
                list.sort_unstable_by_key(|&(dst, _)| dst);
                list
            })
            .collect();

        let graph = TransactionGraph::from_sorted_adjacency(self.nodes, self.id_to_index, adjacency);

        log::info!(
            "Built graph with {} nodes and {} edges (~{} KiB)",
            graph.node_count(),
            graph.edge_count(),
            graph.memory_usage() / 1024
        );

        graph
    }
}
