//! # fhirgraph-client
//!
//! The FHIR server boundary: a thin REST client that probes the server's
//! capability statement, asks for resource counts and pages through search
//! bundles one server round-trip at a time.

mod client;
mod error;
mod paging;

pub use client::{FhirClient, ServerInfo};
pub use error::ClientError;
pub use paging::{FetchOptions, Page, ResourcePages};
