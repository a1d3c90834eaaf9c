use thiserror::Error;

/// Errors produced while classifying a FHIR reference element.
///
/// These are structural errors: the reference JSON itself is malformed or
/// incomplete. References that are well-formed but point outside the graph
/// (contained resources, URNs, other servers) are not errors — see
/// [`crate::reference::Unresolvable`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("reference carries neither a reference string nor an identifier")]
    Empty,

    #[error("reference identifier is missing its {missing} field")]
    IncompleteIdentifier { missing: &'static str },

    #[error("cannot determine the referenced resource type: {reference}")]
    UnknownTargetType { reference: String },

    #[error("referenced resource type {found:?} is not allowed for this element")]
    TypeNotAllowed { found: String },

    #[error("invalid reference: {0}")]
    Invalid(String),
}

impl ReferenceError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}
