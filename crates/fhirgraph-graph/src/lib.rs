//! # fhirgraph-graph
//!
//! The graph store boundary. [`GraphStore`] is the contract the writer,
//! resolver and orchestrator program against; backends implement it for
//! Neo4j ([`Neo4jStore`]) and for an in-process map ([`MemoryStore`], used
//! by the engine's tests).
//!
//! All mutation goes through idempotent upserts keyed by uniqueness
//! constraints, so concurrent writers racing on the same node or
//! placeholder converge to the same final state.

mod batch;
mod error;
mod memory;
mod neo4j;
mod traits;

pub use batch::{EdgeTarget, WriteBatch, WriteOp, WriteSummary};
pub use error::StoreError;
pub use memory::MemoryStore;
pub use neo4j::Neo4jStore;
pub use traits::{DeleteSummary, GraphStore};
