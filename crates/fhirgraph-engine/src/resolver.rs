//! The resolve pass.
//!
//! Scans every placeholder and tries to match it to exactly one real node
//! carrying the same (system, value) identifier. On a match all inbound
//! edges are rewired and the placeholder is deleted. With no match the
//! placeholder stays for a later pass; with several matches the identifier
//! is ambiguous — a data-quality condition that is reported and skipped,
//! never resolved arbitrarily.
//!
//! The pass is idempotent: rerunning it can only shrink the set of
//! unresolved placeholders.

use tracing::{info, warn};

use fhirgraph_graph::{GraphStore, StoreError};

/// Counters from one resolve pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOutcome {
    pub scanned: u64,
    pub resolved: u64,
    pub unresolved: u64,
    pub ambiguous: u64,
    pub edges_rewired: u64,
}

/// Runs one resolve pass over all placeholders in the store.
pub async fn resolve_references(store: &dyn GraphStore) -> Result<ResolveOutcome, StoreError> {
    let placeholders = store.list_placeholders().await?;
    let mut outcome = ResolveOutcome {
        scanned: placeholders.len() as u64,
        ..ResolveOutcome::default()
    };

    if placeholders.is_empty() {
        info!("no unresolved references found");
        return Ok(outcome);
    }
    info!(count = placeholders.len(), "trying to resolve references");

    for placeholder in &placeholders {
        let matches = store
            .find_by_identifier(&placeholder.resource_type, &placeholder.system, &placeholder.value)
            .await?;
        match matches.as_slice() {
            [] => {
                outcome.unresolved += 1;
                warn!(%placeholder, "no matching node yet, leaving unresolved");
            }
            [target] => {
                let moved = store.rewire_edges(placeholder, target).await?;
                store.delete_placeholder(placeholder).await?;
                outcome.resolved += 1;
                outcome.edges_rewired += moved;
                info!(%placeholder, %target, edges = moved, "reference resolved");
            }
            many => {
                outcome.ambiguous += 1;
                warn!(
                    %placeholder,
                    candidates = many.len(),
                    "identifier matches several nodes, skipping (duplicate identifiers in source data)"
                );
            }
        }
    }

    Ok(outcome)
}
