//! # fhirgraph-core
//!
//! Shared vocabulary for the fhirgraph pipeline: graph node and edge
//! descriptors, FHIR reference parsing and classification, and the run
//! report that every stage contributes counters to.
//!
//! This crate is deliberately free of I/O. Everything here is a pure data
//! type or a pure function so it can be exercised by the mapper, writer and
//! resolver crates without a server or database in sight.

pub mod edge;
pub mod error;
pub mod node;
pub mod reference;
pub mod report;
pub mod resource;

pub use edge::{EdgeDescriptor, ReferenceTarget};
pub use error::ReferenceError;
pub use node::{
    GraphNode, NodeKey, PlaceholderKey, PropertyMap, PropertyValue, UNRESOLVED_LABEL,
    identifier_entry,
};
pub use reference::{ParsedReference, ReferenceClass, Unresolvable, classify, parse_reference};
pub use report::RunReport;
pub use resource::RawResource;
