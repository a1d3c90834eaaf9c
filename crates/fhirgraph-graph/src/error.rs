use thiserror::Error;

/// Errors from a graph store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or authenticated against.
    #[error("graph store connection failed: {message}")]
    Connection { message: String },

    /// A transient failure (deadlock, leader switch) that may succeed on
    /// retry. Backends retry these a bounded number of times before
    /// surfacing them.
    #[error("transient graph store failure: {message}")]
    Transient { message: String },

    /// A query was rejected or failed permanently.
    #[error("graph store query failed: {message}")]
    Query { message: String },
}

impl StoreError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}
