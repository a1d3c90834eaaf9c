//! The store contract.

use async_trait::async_trait;

use fhirgraph_core::{NodeKey, PlaceholderKey};

use crate::batch::{WriteBatch, WriteSummary};
use crate::error::StoreError;

/// Result of a destructive wipe.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeleteSummary {
    pub nodes: u64,
    pub relationships: u64,
    pub constraints: u64,
}

/// Contract every graph backend implements. Implementations must be
/// thread-safe; the orchestrator shares one store across transform workers.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Declares the uniqueness constraints (and with them the lookup
    /// indexes) for the given node labels. Constraints are what make
    /// concurrent MERGE safe: without one there is nothing to lock on and
    /// racing writers can create duplicate nodes.
    async fn ensure_constraints(&self, labels: &[String]) -> Result<(), StoreError>;

    /// Applies one resource's write batch atomically.
    async fn apply(&self, batch: &WriteBatch) -> Result<WriteSummary, StoreError>;

    /// Destructive: removes every node, relationship and constraint.
    async fn delete_all(&self) -> Result<DeleteSummary, StoreError>;

    /// Keys of non-placeholder nodes of the given type whose preserved
    /// identifier list contains (system, value).
    async fn find_by_identifier(
        &self,
        resource_type: &str,
        system: &str,
        value: &str,
    ) -> Result<Vec<NodeKey>, StoreError>;

    /// Every placeholder currently in the store.
    async fn list_placeholders(&self) -> Result<Vec<PlaceholderKey>, StoreError>;

    /// Repoints every edge into the placeholder at the target node,
    /// preserving relationship types. Returns the number of edges moved.
    async fn rewire_edges(
        &self,
        placeholder: &PlaceholderKey,
        target: &NodeKey,
    ) -> Result<u64, StoreError>;

    /// Removes a placeholder and any remaining edges into it.
    async fn delete_placeholder(&self, placeholder: &PlaceholderKey) -> Result<(), StoreError>;

    /// Backend name for logging.
    fn backend_name(&self) -> &'static str;
}
