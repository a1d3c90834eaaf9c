use thiserror::Error;

/// Errors from the FHIR server boundary.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to FHIR server failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("FHIR server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response is not a searchset Bundle: {0}")]
    InvalidBundle(String),

    #[error("capability statement could not be read: {0}")]
    Capability(String),
}

impl ClientError {
    pub fn invalid_bundle(message: impl Into<String>) -> Self {
        Self::InvalidBundle(message.into())
    }
}
