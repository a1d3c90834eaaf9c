//! The graph writer.
//!
//! Turns one mapped resource into a single atomic write batch. Literal edge
//! targets get a stub node so edge creation never fails on transform order.
//! Logical targets are matched against already-written nodes by identifier;
//! without exactly one match the edge goes to a placeholder and waits for
//! the resolve pass.

use tracing::debug;

use fhirgraph_core::{PlaceholderKey, ReferenceTarget};
use fhirgraph_graph::{EdgeTarget, GraphStore, StoreError, WriteBatch, WriteOp, WriteSummary};
use fhirgraph_model::MappedResource;

/// Writes one mapped resource's node and edges as one atomic unit.
pub async fn write_resource(
    store: &dyn GraphStore,
    mapped: &MappedResource,
) -> Result<WriteSummary, StoreError> {
    let mut batch = WriteBatch::new();
    batch.push(WriteOp::UpsertNode(mapped.node.clone()));

    for edge in &mapped.edges {
        match &edge.target {
            ReferenceTarget::Literal(target) => {
                batch.push(WriteOp::EnsureNode(target.clone()));
                batch.push(WriteOp::UpsertEdge {
                    source: edge.source.clone(),
                    rel_type: edge.rel_type.clone(),
                    target: EdgeTarget::Node(target.clone()),
                });
            }
            ReferenceTarget::Logical {
                resource_type,
                system,
                value,
            } => {
                let matches = store
                    .find_by_identifier(resource_type, system, value)
                    .await?;
                match matches.as_slice() {
                    [target] => {
                        batch.push(WriteOp::EnsureNode(target.clone()));
                        batch.push(WriteOp::UpsertEdge {
                            source: edge.source.clone(),
                            rel_type: edge.rel_type.clone(),
                            target: EdgeTarget::Node(target.clone()),
                        });
                    }
                    others => {
                        if !others.is_empty() {
                            // Several nodes carry the identifier; deciding
                            // between them is the resolve pass's job.
                            debug!(
                                %system, %value,
                                candidates = others.len(),
                                "ambiguous identifier at write time, deferring"
                            );
                        }
                        let placeholder =
                            PlaceholderKey::new(resource_type.clone(), system.clone(), value.clone());
                        batch.push(WriteOp::EnsurePlaceholder(placeholder.clone()));
                        batch.push(WriteOp::UpsertEdge {
                            source: edge.source.clone(),
                            rel_type: edge.rel_type.clone(),
                            target: EdgeTarget::Placeholder(placeholder),
                        });
                    }
                }
            }
        }
    }

    store.apply(&batch).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use fhirgraph_core::{GraphNode, NodeKey};
    use fhirgraph_graph::MemoryStore;

    fn patient_with_org_reference(id: &str, target: ReferenceTarget) -> MappedResource {
        let mut out = MappedResource::new(GraphNode::new(NodeKey::new("Patient", id)));
        out.edge("MANAGED_BY", target);
        out
    }

    #[tokio::test]
    async fn literal_target_gets_a_stub_node() {
        let store = MemoryStore::new();
        let mapped = patient_with_org_reference(
            "p1",
            ReferenceTarget::Literal(NodeKey::new("Organization", "o1")),
        );

        let summary = write_resource(&store, &mapped).await.unwrap();
        assert_eq!(summary.nodes, 1);
        assert_eq!(summary.edges, 1);
        assert_eq!(summary.deferred, 0);
        assert!(store.has_node(&NodeKey::new("Organization", "o1")));
    }

    #[tokio::test]
    async fn logical_target_matches_existing_node_by_identifier() {
        let store = MemoryStore::new();
        let mut org = MappedResource::new(GraphNode::new(NodeKey::new("Organization", "o1")));
        org.node.add_identifier("urn:x", "42");
        write_resource(&store, &org).await.unwrap();

        let mapped = patient_with_org_reference(
            "p1",
            ReferenceTarget::Logical {
                resource_type: "Organization".to_string(),
                system: "urn:x".to_string(),
                value: "42".to_string(),
            },
        );
        let summary = write_resource(&store, &mapped).await.unwrap();

        assert_eq!(summary.deferred, 0);
        assert_eq!(store.placeholder_count(), 0);
        assert!(store.has_edge(
            &NodeKey::new("Patient", "p1"),
            "MANAGED_BY",
            &EdgeTarget::Node(NodeKey::new("Organization", "o1"))
        ));
    }

    #[tokio::test]
    async fn unmatched_logical_target_defers_to_a_placeholder() {
        let store = MemoryStore::new();
        let mapped = patient_with_org_reference(
            "p1",
            ReferenceTarget::Logical {
                resource_type: "Organization".to_string(),
                system: "urn:x".to_string(),
                value: "42".to_string(),
            },
        );

        let summary = write_resource(&store, &mapped).await.unwrap();
        assert_eq!(summary.deferred, 1);
        assert_eq!(store.placeholder_count(), 1);
        assert_eq!(
            store.edges_into_placeholder(&PlaceholderKey::new("Organization", "urn:x", "42")),
            1
        );
    }

    #[tokio::test]
    async fn two_sources_share_one_placeholder() {
        let store = MemoryStore::new();
        for id in ["p1", "p2"] {
            let mapped = patient_with_org_reference(
                id,
                ReferenceTarget::Logical {
                    resource_type: "Organization".to_string(),
                    system: "urn:x".to_string(),
                    value: "42".to_string(),
                },
            );
            write_resource(&store, &mapped).await.unwrap();
        }

        assert_eq!(store.placeholder_count(), 1);
        assert_eq!(
            store.edges_into_placeholder(&PlaceholderKey::new("Organization", "urn:x", "42")),
            2
        );
    }

    #[tokio::test]
    async fn ambiguous_identifier_at_write_time_also_defers() {
        let store = MemoryStore::new();
        for id in ["o1", "o2"] {
            let mut org = MappedResource::new(GraphNode::new(NodeKey::new("Organization", id)));
            org.node.add_identifier("urn:x", "42");
            write_resource(&store, &org).await.unwrap();
        }

        let mapped = patient_with_org_reference(
            "p1",
            ReferenceTarget::Logical {
                resource_type: "Organization".to_string(),
                system: "urn:x".to_string(),
                value: "42".to_string(),
            },
        );
        let summary = write_resource(&store, &mapped).await.unwrap();
        assert_eq!(summary.deferred, 1);
        assert_eq!(store.placeholder_count(), 1);
    }

    #[tokio::test]
    async fn writing_the_same_resource_twice_is_idempotent() {
        let store = MemoryStore::new();
        let mapped = patient_with_org_reference(
            "p1",
            ReferenceTarget::Literal(NodeKey::new("Organization", "o1")),
        );
        write_resource(&store, &mapped).await.unwrap();
        let nodes_before = store.node_count();
        let edges_before = store.edge_count();

        write_resource(&store, &mapped).await.unwrap();
        assert_eq!(store.node_count(), nodes_before);
        assert_eq!(store.edge_count(), edges_before);
    }
}
