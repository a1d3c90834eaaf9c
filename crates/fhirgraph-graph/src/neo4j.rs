//! Neo4j graph backend.
//!
//! Every upsert is a parameterized Cypher `MERGE` keyed by a uniqueness
//! constraint, so racing writers converge instead of duplicating nodes.
//! Labels and relationship types cannot be query parameters, so they are
//! backtick-escaped and interpolated.

use std::collections::HashMap;
use std::time::Duration;

use neo4rs::{BoltType, Graph, query};
use tracing::{debug, info, warn};

use fhirgraph_core::{
    GraphNode, NodeKey, PlaceholderKey, PropertyValue, UNRESOLVED_LABEL, identifier_entry,
};

use crate::batch::{EdgeTarget, WriteBatch, WriteOp, WriteSummary};
use crate::error::StoreError;
use crate::traits::{DeleteSummary, GraphStore};

use async_trait::async_trait;

/// Attempts per batch when the store reports a transient failure
/// (deadlocks under concurrent MERGE are expected and retryable).
const WRITE_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// [`GraphStore`] backed by a Neo4j database.
pub struct Neo4jStore {
    graph: Graph,
}

impl Neo4jStore {
    /// Connects to the database and verifies the session with a probe
    /// query, so connection problems surface before any transform starts.
    pub async fn connect(
        uri: &str,
        user: &str,
        password: &str,
        database: &str,
    ) -> Result<Self, StoreError> {
        let config = neo4rs::ConfigBuilder::default()
            .uri(uri)
            .user(user)
            .password(password)
            .db(database)
            .build()
            .map_err(|e| StoreError::connection(e.to_string()))?;
        let graph = Graph::connect(config)
            .await
            .map_err(|e| StoreError::connection(e.to_string()))?;
        graph
            .run(query("RETURN 1"))
            .await
            .map_err(|e| StoreError::connection(e.to_string()))?;
        info!(uri, database, "connected to Neo4j");
        Ok(Self { graph })
    }

    async fn try_apply(&self, batch: &WriteBatch) -> Result<WriteSummary, StoreError> {
        let mut txn = self.graph.start_txn().await.map_err(store_error)?;
        let mut summary = WriteSummary::default();

        for op in &batch.ops {
            let result = match op {
                WriteOp::UpsertNode(node) => {
                    summary.nodes += 1;
                    txn.run(upsert_node_query(node)).await
                }
                WriteOp::EnsureNode(key) => txn.run(ensure_node_query(key)).await,
                WriteOp::EnsurePlaceholder(key) => txn.run(ensure_placeholder_query(key)).await,
                WriteOp::UpsertEdge {
                    source,
                    rel_type,
                    target,
                } => {
                    summary.edges += 1;
                    txn.run(upsert_edge_query(source, rel_type, target)).await
                }
            };
            if let Err(e) = result {
                // A failed op poisons the transaction; roll the whole
                // resource back so the atomicity guarantee holds.
                let _ = txn.rollback().await;
                return Err(store_error(e));
            }
        }

        txn.commit().await.map_err(store_error)?;
        summary.deferred = batch.deferred_edges();
        Ok(summary)
    }
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn ensure_constraints(&self, labels: &[String]) -> Result<(), StoreError> {
        for label in labels {
            let escaped = escape(label);
            // Key constraint for real nodes; doubles as the lookup index.
            let key_constraint = format!(
                "CREATE CONSTRAINT `{}` IF NOT EXISTS \
                 FOR (n:`{escaped}`) REQUIRE n.fhir_id IS UNIQUE",
                escape(&format!("{label}_fhir_id"))
            );
            // Placeholder identity constraint; nodes lacking the identifier
            // properties (all real nodes) are not covered by it.
            let placeholder_constraint = format!(
                "CREATE CONSTRAINT `{}` IF NOT EXISTS \
                 FOR (n:`{escaped}`) \
                 REQUIRE (n.identifier_system, n.identifier_value) IS UNIQUE",
                escape(&format!("{label}_unresolved_identifier"))
            );
            // Index on the preserved identifier list for the resolve pass.
            let identifier_index = format!(
                "CREATE INDEX `{}` IF NOT EXISTS \
                 FOR (n:`{escaped}`) ON (n.identifiers)",
                escape(&format!("{label}_identifiers"))
            );
            for statement in [key_constraint, placeholder_constraint, identifier_index] {
                self.graph
                    .run(query(&statement))
                    .await
                    .map_err(store_error)?;
            }
        }
        debug!(count = labels.len(), "constraints ensured");
        Ok(())
    }

    async fn apply(&self, batch: &WriteBatch) -> Result<WriteSummary, StoreError> {
        let mut attempt = 0;
        loop {
            match self.try_apply(batch).await {
                Ok(summary) => return Ok(summary),
                Err(e) if e.is_transient() && attempt + 1 < WRITE_ATTEMPTS => {
                    attempt += 1;
                    warn!(attempt, "transient Neo4j failure, retrying batch: {e}");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn delete_all(&self) -> Result<DeleteSummary, StoreError> {
        let nodes = self.count_rows("MATCH (n) RETURN count(n) AS count").await?;
        let relationships = self
            .count_rows("MATCH ()-[r]->() RETURN count(r) AS count")
            .await?;

        self.graph
            .run(query("MATCH (n) DETACH DELETE n"))
            .await
            .map_err(store_error)?;

        let mut names = Vec::new();
        let mut rows = self
            .graph
            .execute(query("SHOW ALL CONSTRAINTS"))
            .await
            .map_err(store_error)?;
        while let Some(row) = rows.next().await.map_err(store_error)? {
            if let Ok(name) = row.get::<String>("name") {
                names.push(name);
            }
        }
        for name in &names {
            self.graph
                .run(query(&format!("DROP CONSTRAINT `{}`", escape(name))))
                .await
                .map_err(store_error)?;
        }

        Ok(DeleteSummary {
            nodes,
            relationships,
            constraints: names.len() as u64,
        })
    }

    async fn find_by_identifier(
        &self,
        resource_type: &str,
        system: &str,
        value: &str,
    ) -> Result<Vec<NodeKey>, StoreError> {
        let statement = format!(
            "MATCH (n:`{}`) WHERE NOT n:`{}` AND $entry IN n.identifiers \
             RETURN n.fhir_id AS id",
            escape(resource_type),
            escape(UNRESOLVED_LABEL)
        );
        let mut rows = self
            .graph
            .execute(query(&statement).param("entry", identifier_entry(system, value)))
            .await
            .map_err(store_error)?;
        let mut keys = Vec::new();
        while let Some(row) = rows.next().await.map_err(store_error)? {
            let id: String = row.get("id").map_err(|e| StoreError::query(e.to_string()))?;
            keys.push(NodeKey::new(resource_type, id));
        }
        Ok(keys)
    }

    async fn list_placeholders(&self) -> Result<Vec<PlaceholderKey>, StoreError> {
        let statement = format!(
            "MATCH (p:`{unresolved}`) \
             RETURN [l IN labels(p) WHERE l <> '{unresolved}'][0] AS resource_type, \
                    p.identifier_system AS system, p.identifier_value AS value",
            unresolved = escape(UNRESOLVED_LABEL)
        );
        let mut rows = self
            .graph
            .execute(query(&statement))
            .await
            .map_err(store_error)?;
        let mut placeholders = Vec::new();
        while let Some(row) = rows.next().await.map_err(store_error)? {
            let resource_type: String = row
                .get("resource_type")
                .map_err(|e| StoreError::query(e.to_string()))?;
            let system: String = row
                .get("system")
                .map_err(|e| StoreError::query(e.to_string()))?;
            let value: String = row
                .get("value")
                .map_err(|e| StoreError::query(e.to_string()))?;
            placeholders.push(PlaceholderKey::new(resource_type, system, value));
        }
        Ok(placeholders)
    }

    async fn rewire_edges(
        &self,
        placeholder: &PlaceholderKey,
        target: &NodeKey,
    ) -> Result<u64, StoreError> {
        // Relationship types cannot be created dynamically without APOC, so
        // read the inbound edges first and re-merge each with its type
        // interpolated.
        let statement = format!(
            "MATCH (src)-[r]->(p:`{label}`:`{unresolved}` \
                 {{identifier_system: $system, identifier_value: $value}}) \
             RETURN [l IN labels(src) WHERE l <> '{unresolved}'][0] AS source_label, \
                    src.fhir_id AS source_id, type(r) AS rel_type",
            label = escape(&placeholder.resource_type),
            unresolved = escape(UNRESOLVED_LABEL)
        );
        let mut rows = self
            .graph
            .execute(
                query(&statement)
                    .param("system", placeholder.system.clone())
                    .param("value", placeholder.value.clone()),
            )
            .await
            .map_err(store_error)?;

        let mut inbound = Vec::new();
        while let Some(row) = rows.next().await.map_err(store_error)? {
            let source_label: String = row
                .get("source_label")
                .map_err(|e| StoreError::query(e.to_string()))?;
            let source_id: String = row
                .get("source_id")
                .map_err(|e| StoreError::query(e.to_string()))?;
            let rel_type: String = row
                .get("rel_type")
                .map_err(|e| StoreError::query(e.to_string()))?;
            inbound.push((source_label, source_id, rel_type));
        }

        for (source_label, source_id, rel_type) in &inbound {
            let statement = format!(
                "MATCH (src:`{}` {{fhir_id: $source_id}}) \
                 MATCH (t:`{}` {{fhir_id: $target_id}}) \
                 MERGE (src)-[:`{}`]->(t)",
                escape(source_label),
                escape(&target.resource_type),
                escape(rel_type)
            );
            self.graph
                .run(
                    query(&statement)
                        .param("source_id", source_id.clone())
                        .param("target_id", target.id.clone()),
                )
                .await
                .map_err(store_error)?;
        }

        Ok(inbound.len() as u64)
    }

    async fn delete_placeholder(&self, placeholder: &PlaceholderKey) -> Result<(), StoreError> {
        let statement = format!(
            "MATCH (p:`{}`:`{}` {{identifier_system: $system, identifier_value: $value}}) \
             DETACH DELETE p",
            escape(&placeholder.resource_type),
            escape(UNRESOLVED_LABEL)
        );
        self.graph
            .run(
                query(&statement)
                    .param("system", placeholder.system.clone())
                    .param("value", placeholder.value.clone()),
            )
            .await
            .map_err(store_error)
    }

    fn backend_name(&self) -> &'static str {
        "neo4j"
    }
}

impl Neo4jStore {
    async fn count_rows(&self, statement: &str) -> Result<u64, StoreError> {
        let mut rows = self
            .graph
            .execute(query(statement))
            .await
            .map_err(store_error)?;
        match rows.next().await.map_err(store_error)? {
            Some(row) => {
                let count: i64 = row
                    .get("count")
                    .map_err(|e| StoreError::query(e.to_string()))?;
                Ok(count.max(0) as u64)
            }
            None => Ok(0),
        }
    }
}

fn store_error(e: neo4rs::Error) -> StoreError {
    let message = e.to_string();
    if message.contains("Transient") || message.contains("Deadlock") {
        StoreError::transient(message)
    } else {
        StoreError::query(message)
    }
}

/// Escapes a label, relationship type or constraint name for backtick
/// quoting. Cypher parameters cannot be used in those positions.
fn escape(identifier: &str) -> String {
    identifier.replace('`', "``")
}

fn bolt_value(value: &PropertyValue) -> BoltType {
    match value {
        PropertyValue::Text(s) => s.clone().into(),
        PropertyValue::Integer(i) => (*i).into(),
        PropertyValue::Float(f) => (*f).into(),
        PropertyValue::Boolean(b) => (*b).into(),
        PropertyValue::TextList(list) => list.clone().into(),
    }
}

fn upsert_node_query(node: &GraphNode) -> neo4rs::Query {
    let mut statement = format!(
        "MERGE (n:`{}` {{fhir_id: $id}}) SET n += $props",
        escape(&node.key.resource_type)
    );
    for sublabel in &node.sublabels {
        statement.push_str(&format!(" SET n:`{}`", escape(sublabel)));
    }
    let props: HashMap<String, BoltType> = node
        .properties
        .iter()
        .map(|(key, value)| (key.clone(), bolt_value(value)))
        .collect();
    query(&statement)
        .param("id", node.key.id.clone())
        .param("props", props)
}

fn ensure_node_query(key: &NodeKey) -> neo4rs::Query {
    let statement = format!(
        "MERGE (n:`{}` {{fhir_id: $id}})",
        escape(&key.resource_type)
    );
    query(&statement).param("id", key.id.clone())
}

fn ensure_placeholder_query(key: &PlaceholderKey) -> neo4rs::Query {
    let statement = format!(
        "MERGE (p:`{}`:`{}` {{identifier_system: $system, identifier_value: $value}})",
        escape(&key.resource_type),
        escape(UNRESOLVED_LABEL)
    );
    query(&statement)
        .param("system", key.system.clone())
        .param("value", key.value.clone())
}

fn upsert_edge_query(source: &NodeKey, rel_type: &str, target: &EdgeTarget) -> neo4rs::Query {
    match target {
        EdgeTarget::Node(node) => {
            let statement = format!(
                "MATCH (a:`{}` {{fhir_id: $source_id}}) \
                 MATCH (b:`{}` {{fhir_id: $target_id}}) \
                 MERGE (a)-[:`{}`]->(b)",
                escape(&source.resource_type),
                escape(&node.resource_type),
                escape(rel_type)
            );
            query(&statement)
                .param("source_id", source.id.clone())
                .param("target_id", node.id.clone())
        }
        EdgeTarget::Placeholder(placeholder) => {
            let statement = format!(
                "MATCH (a:`{}` {{fhir_id: $source_id}}) \
                 MATCH (b:`{}`:`{}` {{identifier_system: $system, identifier_value: $value}}) \
                 MERGE (a)-[:`{}`]->(b)",
                escape(&source.resource_type),
                escape(&placeholder.resource_type),
                escape(UNRESOLVED_LABEL),
                escape(rel_type)
            );
            query(&statement)
                .param("source_id", source.id.clone())
                .param("system", placeholder.system.clone())
                .param("value", placeholder.value.clone())
        }
    }
}
