//! Write batches.
//!
//! One [`WriteBatch`] holds every upsert derived from a single source
//! resource — its node, stub targets, placeholders and edges — and is
//! applied atomically by the backend. A crash mid-resource therefore never
//! leaves a node without its edges or vice versa.
//!
//! Ordering invariant: any node or placeholder an edge points at must
//! appear in the batch before that edge (the writer emits batches this
//! way); backends may rely on it to `MATCH` instead of `MERGE` edge
//! endpoints.

use fhirgraph_core::{GraphNode, NodeKey, PlaceholderKey};

/// Endpoint of an edge op inside a batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EdgeTarget {
    Node(NodeKey),
    Placeholder(PlaceholderKey),
}

/// One idempotent store mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Merge the node by (label, key) and set its properties,
    /// last-write-wins per property.
    UpsertNode(GraphNode),
    /// Merge a minimal stub by (label, key) so edges to not-yet-transformed
    /// resources never fail on ordering. A later transform of that resource
    /// fills the stub in.
    EnsureNode(NodeKey),
    /// Merge a placeholder by (label, system, value). A second unresolved
    /// reference to the same identifier reuses the node.
    EnsurePlaceholder(PlaceholderKey),
    /// Merge an edge by (source, type, target).
    UpsertEdge {
        source: NodeKey,
        rel_type: String,
        target: EdgeTarget,
    },
}

/// All mutations for one source resource.
#[derive(Debug, Default, Clone)]
pub struct WriteBatch {
    pub ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: WriteOp) {
        self.ops.push(op);
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of edge ops that point at a placeholder.
    pub fn deferred_edges(&self) -> u64 {
        self.ops
            .iter()
            .filter(|op| {
                matches!(
                    op,
                    WriteOp::UpsertEdge {
                        target: EdgeTarget::Placeholder(_),
                        ..
                    }
                )
            })
            .count() as u64
    }
}

/// Counters for one applied batch.
#[derive(Debug, Default, Clone, Copy)]
pub struct WriteSummary {
    pub nodes: u64,
    pub edges: u64,
    /// Edges written against a placeholder.
    pub deferred: u64,
}
