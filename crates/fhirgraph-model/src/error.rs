use thiserror::Error;

use fhirgraph_core::ReferenceError;

/// Errors raised while mapping one raw resource to its node and edges.
#[derive(Debug, Clone, Error)]
pub enum MappingError {
    #[error("{resource_type} resource is missing required field {field}")]
    MissingField {
        resource_type: &'static str,
        field: &'static str,
    },

    #[error("invalid {element} reference: {source}")]
    Reference {
        /// The FHIR element the reference sits in, e.g. `managingOrganization`.
        element: String,
        source: ReferenceError,
    },

    #[error("no mapper registered for resource type {0}")]
    UnknownResourceType(String),
}
