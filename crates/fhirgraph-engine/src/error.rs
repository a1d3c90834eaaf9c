use thiserror::Error;

use fhirgraph_client::ClientError;
use fhirgraph_graph::StoreError;

/// Errors that end a transform unit or the whole run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no mapper registered for resource type {0}")]
    UnknownResourceType(String),

    #[error("resource types requested but no FHIR server configured")]
    MissingServer,

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("strict mode: aborting {resource_type} transform: {message}")]
    Strict {
        resource_type: String,
        message: String,
    },
}
