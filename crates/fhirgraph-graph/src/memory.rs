//! In-memory graph backend.
//!
//! Implements the full [`GraphStore`] contract over process-local maps.
//! The engine's writer and resolver tests run against this backend, and it
//! doubles as executable documentation of the upsert semantics the Neo4j
//! backend implements in Cypher.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use fhirgraph_core::{GraphNode, NodeKey, PlaceholderKey, PropertyMap, identifier_entry};

use crate::batch::{EdgeTarget, WriteBatch, WriteOp, WriteSummary};
use crate::error::StoreError;
use crate::traits::{DeleteSummary, GraphStore};

#[derive(Debug, Default, Clone)]
struct StoredNode {
    sublabels: Vec<String>,
    properties: PropertyMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StoredEdge {
    source: NodeKey,
    rel_type: String,
    target: EdgeTarget,
}

#[derive(Debug, Default)]
struct State {
    nodes: HashMap<NodeKey, StoredNode>,
    placeholders: HashSet<PlaceholderKey>,
    edges: HashSet<StoredEdge>,
    constraints: HashSet<String>,
}

/// Process-local [`GraphStore`] implementation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.state.lock().unwrap().nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.state.lock().unwrap().edges.len()
    }

    pub fn placeholder_count(&self) -> usize {
        self.state.lock().unwrap().placeholders.len()
    }

    pub fn has_node(&self, key: &NodeKey) -> bool {
        self.state.lock().unwrap().nodes.contains_key(key)
    }

    pub fn node_properties(&self, key: &NodeKey) -> Option<PropertyMap> {
        self.state
            .lock()
            .unwrap()
            .nodes
            .get(key)
            .map(|node| node.properties.clone())
    }

    pub fn has_edge(&self, source: &NodeKey, rel_type: &str, target: &EdgeTarget) -> bool {
        self.state.lock().unwrap().edges.contains(&StoredEdge {
            source: source.clone(),
            rel_type: rel_type.to_string(),
            target: target.clone(),
        })
    }

    pub fn edges_into_placeholder(&self, placeholder: &PlaceholderKey) -> usize {
        let target = EdgeTarget::Placeholder(placeholder.clone());
        self.state
            .lock()
            .unwrap()
            .edges
            .iter()
            .filter(|edge| edge.target == target)
            .count()
    }
}

#[async_trait]
impl GraphStore for MemoryStore {
    async fn ensure_constraints(&self, labels: &[String]) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        for label in labels {
            state.constraints.insert(label.clone());
        }
        Ok(())
    }

    async fn apply(&self, batch: &WriteBatch) -> Result<WriteSummary, StoreError> {
        let mut state = self.state.lock().unwrap();
        let mut summary = WriteSummary::default();
        for op in &batch.ops {
            match op {
                WriteOp::UpsertNode(node) => {
                    upsert_node(&mut state, node);
                    summary.nodes += 1;
                }
                WriteOp::EnsureNode(key) => {
                    state.nodes.entry(key.clone()).or_default();
                }
                WriteOp::EnsurePlaceholder(key) => {
                    state.placeholders.insert(key.clone());
                }
                WriteOp::UpsertEdge {
                    source,
                    rel_type,
                    target,
                } => {
                    state.edges.insert(StoredEdge {
                        source: source.clone(),
                        rel_type: rel_type.clone(),
                        target: target.clone(),
                    });
                    summary.edges += 1;
                }
            }
        }
        summary.deferred = batch.deferred_edges();
        Ok(summary)
    }

    async fn delete_all(&self) -> Result<DeleteSummary, StoreError> {
        let mut state = self.state.lock().unwrap();
        let summary = DeleteSummary {
            nodes: (state.nodes.len() + state.placeholders.len()) as u64,
            relationships: state.edges.len() as u64,
            constraints: state.constraints.len() as u64,
        };
        *state = State::default();
        Ok(summary)
    }

    async fn find_by_identifier(
        &self,
        resource_type: &str,
        system: &str,
        value: &str,
    ) -> Result<Vec<NodeKey>, StoreError> {
        let entry = identifier_entry(system, value);
        let state = self.state.lock().unwrap();
        let mut keys: Vec<NodeKey> = state
            .nodes
            .iter()
            .filter(|(key, node)| {
                key.resource_type == resource_type && identifiers_contain(node, &entry)
            })
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(keys)
    }

    async fn list_placeholders(&self) -> Result<Vec<PlaceholderKey>, StoreError> {
        let state = self.state.lock().unwrap();
        let mut placeholders: Vec<PlaceholderKey> = state.placeholders.iter().cloned().collect();
        placeholders.sort_by(|a, b| {
            (&a.resource_type, &a.system, &a.value).cmp(&(&b.resource_type, &b.system, &b.value))
        });
        Ok(placeholders)
    }

    async fn rewire_edges(
        &self,
        placeholder: &PlaceholderKey,
        target: &NodeKey,
    ) -> Result<u64, StoreError> {
        let mut state = self.state.lock().unwrap();
        let from = EdgeTarget::Placeholder(placeholder.clone());
        let moved: Vec<StoredEdge> = state
            .edges
            .iter()
            .filter(|edge| edge.target == from)
            .cloned()
            .collect();
        for edge in &moved {
            state.edges.remove(edge);
            state.edges.insert(StoredEdge {
                source: edge.source.clone(),
                rel_type: edge.rel_type.clone(),
                target: EdgeTarget::Node(target.clone()),
            });
        }
        Ok(moved.len() as u64)
    }

    async fn delete_placeholder(&self, placeholder: &PlaceholderKey) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.placeholders.remove(placeholder);
        let target = EdgeTarget::Placeholder(placeholder.clone());
        state.edges.retain(|edge| edge.target != target);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

fn upsert_node(state: &mut State, node: &GraphNode) {
    let stored = state.nodes.entry(node.key.clone()).or_default();
    for label in &node.sublabels {
        if !stored.sublabels.contains(label) {
            stored.sublabels.push(label.clone());
        }
    }
    // Last-write-wins per property.
    for (key, value) in &node.properties {
        stored.properties.insert(key.clone(), value.clone());
    }
}

fn identifiers_contain(node: &StoredNode, entry: &str) -> bool {
    use fhirgraph_core::PropertyValue;
    matches!(
        node.properties.get(fhirgraph_core::node::IDENTIFIERS_PROPERTY),
        Some(PropertyValue::TextList(entries)) if entries.iter().any(|e| e == entry)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use fhirgraph_core::PropertyValue;

    fn patient_node(id: &str) -> GraphNode {
        let mut node = GraphNode::new(NodeKey::new("Patient", id));
        node.set("gender", "female");
        node
    }

    fn edge_to_node(source: &NodeKey, rel: &str, target: &NodeKey) -> WriteOp {
        WriteOp::UpsertEdge {
            source: source.clone(),
            rel_type: rel.to_string(),
            target: EdgeTarget::Node(target.clone()),
        }
    }

    #[tokio::test]
    async fn node_upsert_is_idempotent() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.push(WriteOp::UpsertNode(patient_node("p1")));

        store.apply(&batch).await.unwrap();
        store.apply(&batch).await.unwrap();

        assert_eq!(store.node_count(), 1);
    }

    #[tokio::test]
    async fn edge_upsert_is_idempotent() {
        let store = MemoryStore::new();
        let p1 = NodeKey::new("Patient", "p1");
        let org = NodeKey::new("Organization", "o1");
        let mut batch = WriteBatch::new();
        batch.push(WriteOp::UpsertNode(patient_node("p1")));
        batch.push(WriteOp::EnsureNode(org.clone()));
        batch.push(edge_to_node(&p1, "MANAGED_BY", &org));

        store.apply(&batch).await.unwrap();
        store.apply(&batch).await.unwrap();

        assert_eq!(store.edge_count(), 1);
        assert!(store.has_edge(&p1, "MANAGED_BY", &EdgeTarget::Node(org)));
    }

    #[tokio::test]
    async fn upsert_merges_properties_last_write_wins() {
        let store = MemoryStore::new();
        let mut first = WriteBatch::new();
        first.push(WriteOp::UpsertNode(patient_node("p1")));
        store.apply(&first).await.unwrap();

        let mut node = GraphNode::new(NodeKey::new("Patient", "p1"));
        node.set("gender", "male");
        node.set("birthdate", "1980-01-01");
        let mut second = WriteBatch::new();
        second.push(WriteOp::UpsertNode(node));
        store.apply(&second).await.unwrap();

        let properties = store
            .node_properties(&NodeKey::new("Patient", "p1"))
            .unwrap();
        assert_eq!(
            properties.get("gender"),
            Some(&PropertyValue::Text("male".to_string()))
        );
        assert_eq!(
            properties.get("birthdate"),
            Some(&PropertyValue::Text("1980-01-01".to_string()))
        );
    }

    #[tokio::test]
    async fn placeholders_dedupe_on_identifier() {
        let store = MemoryStore::new();
        let placeholder = PlaceholderKey::new("Organization", "urn:x", "42");

        for source_id in ["p1", "p2"] {
            let source = NodeKey::new("Patient", source_id);
            let mut batch = WriteBatch::new();
            batch.push(WriteOp::UpsertNode(patient_node(source_id)));
            batch.push(WriteOp::EnsurePlaceholder(placeholder.clone()));
            batch.push(WriteOp::UpsertEdge {
                source,
                rel_type: "MANAGED_BY".to_string(),
                target: EdgeTarget::Placeholder(placeholder.clone()),
            });
            store.apply(&batch).await.unwrap();
        }

        assert_eq!(store.placeholder_count(), 1);
        assert_eq!(store.edges_into_placeholder(&placeholder), 2);
    }

    #[tokio::test]
    async fn rewire_moves_every_edge_and_preserves_type() {
        let store = MemoryStore::new();
        let placeholder = PlaceholderKey::new("Organization", "urn:x", "42");
        let real = NodeKey::new("Organization", "o1");

        let mut batch = WriteBatch::new();
        batch.push(WriteOp::UpsertNode(patient_node("p1")));
        batch.push(WriteOp::UpsertNode(patient_node("p2")));
        batch.push(WriteOp::EnsureNode(real.clone()));
        batch.push(WriteOp::EnsurePlaceholder(placeholder.clone()));
        for source_id in ["p1", "p2"] {
            batch.push(WriteOp::UpsertEdge {
                source: NodeKey::new("Patient", source_id),
                rel_type: "MANAGED_BY".to_string(),
                target: EdgeTarget::Placeholder(placeholder.clone()),
            });
        }
        store.apply(&batch).await.unwrap();

        let moved = store.rewire_edges(&placeholder, &real).await.unwrap();
        assert_eq!(moved, 2);
        assert_eq!(store.edges_into_placeholder(&placeholder), 0);
        for source_id in ["p1", "p2"] {
            assert!(store.has_edge(
                &NodeKey::new("Patient", source_id),
                "MANAGED_BY",
                &EdgeTarget::Node(real.clone())
            ));
        }
    }

    #[tokio::test]
    async fn find_by_identifier_skips_other_types() {
        let store = MemoryStore::new();
        let mut org = GraphNode::new(NodeKey::new("Organization", "o1"));
        org.add_identifier("urn:x", "42");
        let mut pat = GraphNode::new(NodeKey::new("Patient", "p1"));
        pat.add_identifier("urn:x", "42");

        let mut batch = WriteBatch::new();
        batch.push(WriteOp::UpsertNode(org));
        batch.push(WriteOp::UpsertNode(pat));
        store.apply(&batch).await.unwrap();

        let found = store
            .find_by_identifier("Organization", "urn:x", "42")
            .await
            .unwrap();
        assert_eq!(found, vec![NodeKey::new("Organization", "o1")]);
    }

    #[tokio::test]
    async fn delete_placeholder_drops_remaining_edges() {
        let store = MemoryStore::new();
        let placeholder = PlaceholderKey::new("Organization", "urn:x", "42");
        let mut batch = WriteBatch::new();
        batch.push(WriteOp::UpsertNode(patient_node("p1")));
        batch.push(WriteOp::EnsurePlaceholder(placeholder.clone()));
        batch.push(WriteOp::UpsertEdge {
            source: NodeKey::new("Patient", "p1"),
            rel_type: "MANAGED_BY".to_string(),
            target: EdgeTarget::Placeholder(placeholder.clone()),
        });
        store.apply(&batch).await.unwrap();

        store.delete_placeholder(&placeholder).await.unwrap();
        assert_eq!(store.placeholder_count(), 0);
        assert_eq!(store.edge_count(), 0);
    }

    #[tokio::test]
    async fn delete_all_wipes_state() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.push(WriteOp::UpsertNode(patient_node("p1")));
        batch.push(WriteOp::EnsurePlaceholder(PlaceholderKey::new(
            "Organization",
            "urn:x",
            "42",
        )));
        store.apply(&batch).await.unwrap();
        store
            .ensure_constraints(&["Patient".to_string()])
            .await
            .unwrap();

        let summary = store.delete_all().await.unwrap();
        assert_eq!(summary.nodes, 2);
        assert_eq!(summary.constraints, 1);
        assert_eq!(store.node_count(), 0);
        assert_eq!(store.placeholder_count(), 0);
    }
}
