//! FHIR reference parsing and classification.
//!
//! A FHIR `Reference` element can carry:
//! - a `reference` string — relative (`Patient/123`), versioned
//!   (`Patient/123/_history/2`), absolute URL, contained (`#id`) or URN;
//! - an `identifier` object — a logical reference by (system, value);
//! - a `display` string — free text handled by the mappers, not here.
//!
//! Classification is a pure structural decision on the element shape. No
//! network or database access happens in this module.

use std::fmt;

use serde_json::Value;

use crate::error::ReferenceError;
use crate::node::NodeKey;

/// A reference string successfully parsed into its components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReference {
    pub resource_type: String,
    pub id: String,
    /// Version id from a `/_history/{v}` suffix, if present.
    pub version: Option<String>,
}

impl ParsedReference {
    pub fn key(&self) -> NodeKey {
        NodeKey::new(self.resource_type.clone(), self.id.clone())
    }
}

/// A reference string that is well-formed but cannot name a node in this
/// graph. These are skipped with a warning rather than treated as mapping
/// errors: the data is valid FHIR, it just lives outside our store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unresolvable {
    /// `#id` — refers into the containing resource.
    Contained(String),
    /// `urn:uuid:...` / `urn:oid:...`.
    Urn(String),
    /// Absolute URL on a different server.
    External(String),
}

impl fmt::Display for Unresolvable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contained(id) => write!(f, "contained reference #{id}"),
            Self::Urn(urn) => write!(f, "URN reference {urn}"),
            Self::External(url) => write!(f, "external reference {url}"),
        }
    }
}

/// Outcome of parsing a reference string.
type ParseResult = Result<Result<ParsedReference, Unresolvable>, ReferenceError>;

/// Parses a reference string into (type, id, version).
///
/// Absolute URLs are local only when they start with `base_url`; with no
/// base URL configured every absolute URL counts as external. The resource
/// type must start with an uppercase ASCII letter and the id must be
/// non-empty, otherwise the string is malformed.
pub fn parse_reference(reference: &str, base_url: Option<&str>) -> ParseResult {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(ReferenceError::invalid("empty reference string"));
    }

    if let Some(contained) = reference.strip_prefix('#') {
        return Ok(Err(Unresolvable::Contained(contained.to_string())));
    }
    if reference.starts_with("urn:") {
        return Ok(Err(Unresolvable::Urn(reference.to_string())));
    }

    let path = if reference.contains("://") {
        match base_url {
            Some(base) => {
                let base = base.trim_end_matches('/');
                match reference.strip_prefix(base) {
                    Some(suffix) => suffix.trim_start_matches('/'),
                    None => return Ok(Err(Unresolvable::External(reference.to_string()))),
                }
            }
            None => return Ok(Err(Unresolvable::External(reference.to_string()))),
        }
    } else {
        reference
    };

    let parts: Vec<&str> = path.split('/').collect();
    if parts.len() < 2 {
        return Err(ReferenceError::invalid(format!(
            "reference must contain at least Type/id: {reference}"
        )));
    }

    let resource_type = parts[0];
    let id = parts[1];

    if !resource_type
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_uppercase())
    {
        return Err(ReferenceError::invalid(format!(
            "resource type must start with an uppercase letter: {resource_type}"
        )));
    }
    if id.is_empty() {
        return Err(ReferenceError::invalid(format!(
            "resource id is empty: {reference}"
        )));
    }

    let version = (parts.len() >= 4 && parts[2] == "_history").then(|| parts[3].to_string());

    Ok(Ok(ParsedReference {
        resource_type: resource_type.to_string(),
        id: id.to_string(),
        version,
    }))
}

/// Result of classifying a reference element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceClass {
    /// Target identity is known.
    Literal(NodeKey),
    /// Target must be looked up by identifier.
    Logical {
        resource_type: String,
        system: String,
        value: String,
    },
    /// Valid shape, but the target lives outside this graph.
    Skipped(Unresolvable),
}

/// Classifies a FHIR `Reference` element.
///
/// `allowed_types` is the mapper's list of legal target resource types for
/// the element, used both to validate literal targets and to type logical
/// targets when the element has no explicit `type`. `base_url` is the FHIR
/// server base, for recognising same-server absolute URLs.
///
/// # Errors
///
/// An element with neither a `reference` string nor an `identifier` object
/// is malformed ([`ReferenceError::Empty`]); so is an identifier missing its
/// system or value, a literal target outside `allowed_types`, or a logical
/// reference whose target type cannot be determined.
pub fn classify(
    reference: &Value,
    allowed_types: Option<&[&str]>,
    base_url: Option<&str>,
) -> Result<ReferenceClass, ReferenceError> {
    let reference_str = reference.get("reference").and_then(Value::as_str);
    let identifier = reference.get("identifier").filter(|v| v.is_object());
    let declared_type = reference.get("type").and_then(Value::as_str);

    if let Some(text) = reference_str {
        let parsed = match parse_reference(text, base_url)? {
            Ok(parsed) => parsed,
            Err(unresolvable) => return Ok(ReferenceClass::Skipped(unresolvable)),
        };
        check_allowed(&parsed.resource_type, allowed_types)?;
        return Ok(ReferenceClass::Literal(parsed.key()));
    }

    if let Some(identifier) = identifier {
        let system = identifier
            .get("system")
            .and_then(Value::as_str)
            .ok_or(ReferenceError::IncompleteIdentifier { missing: "system" })?;
        let value = identifier
            .get("value")
            .and_then(Value::as_str)
            .ok_or(ReferenceError::IncompleteIdentifier { missing: "value" })?;

        let resource_type = match declared_type {
            Some(declared) => {
                check_allowed(declared, allowed_types)?;
                declared
            }
            // Without an explicit type the target label is only knowable
            // when the element admits exactly one resource type.
            None => match allowed_types {
                Some([single]) => single,
                _ => {
                    return Err(ReferenceError::UnknownTargetType {
                        reference: format!("identifier {system}|{value}"),
                    });
                }
            },
        };

        return Ok(ReferenceClass::Logical {
            resource_type: resource_type.to_string(),
            system: system.to_string(),
            value: value.to_string(),
        });
    }

    Err(ReferenceError::Empty)
}

fn check_allowed(resource_type: &str, allowed: Option<&[&str]>) -> Result<(), ReferenceError> {
    match allowed {
        Some(types) if !types.contains(&resource_type) => Err(ReferenceError::TypeNotAllowed {
            found: resource_type.to_string(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_relative_reference() {
        let parsed = parse_reference("Patient/123", None).unwrap().unwrap();
        assert_eq!(parsed.resource_type, "Patient");
        assert_eq!(parsed.id, "123");
        assert_eq!(parsed.version, None);
    }

    #[test]
    fn parses_versioned_reference() {
        let parsed = parse_reference("Patient/123/_history/2", None)
            .unwrap()
            .unwrap();
        assert_eq!(parsed.version, Some("2".to_string()));
    }

    #[test]
    fn absolute_url_with_matching_base_is_local() {
        let parsed = parse_reference(
            "http://fhir.example.org/base/Patient/123",
            Some("http://fhir.example.org/base/"),
        )
        .unwrap()
        .unwrap();
        assert_eq!(parsed.key(), NodeKey::new("Patient", "123"));
    }

    #[test]
    fn absolute_url_without_base_is_external() {
        let result = parse_reference("http://elsewhere.org/fhir/Patient/123", None).unwrap();
        assert!(matches!(result, Err(Unresolvable::External(_))));
    }

    #[test]
    fn contained_and_urn_are_unresolvable() {
        assert!(matches!(
            parse_reference("#med1", None).unwrap(),
            Err(Unresolvable::Contained(id)) if id == "med1"
        ));
        assert!(matches!(
            parse_reference("urn:uuid:550e8400-e29b-41d4-a716-446655440000", None).unwrap(),
            Err(Unresolvable::Urn(_))
        ));
    }

    #[test]
    fn rejects_malformed_strings() {
        assert!(parse_reference("", None).is_err());
        assert!(parse_reference("patient/123", None).is_err());
        assert!(parse_reference("Patient/", None).is_err());
        assert!(parse_reference("Patient123", None).is_err());
    }

    #[test]
    fn classifies_literal() {
        let class = classify(&json!({"reference": "Patient/123"}), None, None).unwrap();
        assert_eq!(
            class,
            ReferenceClass::Literal(NodeKey::new("Patient", "123"))
        );
    }

    #[test]
    fn classifies_logical_from_single_allowed_type() {
        let class = classify(
            &json!({"identifier": {"system": "urn:x", "value": "abc"}}),
            Some(&["Organization"]),
            None,
        )
        .unwrap();
        assert_eq!(
            class,
            ReferenceClass::Logical {
                resource_type: "Organization".to_string(),
                system: "urn:x".to_string(),
                value: "abc".to_string(),
            }
        );
    }

    #[test]
    fn classifies_logical_from_declared_type() {
        let class = classify(
            &json!({
                "type": "Practitioner",
                "identifier": {"system": "urn:npi", "value": "999"}
            }),
            Some(&["Organization", "Practitioner"]),
            None,
        )
        .unwrap();
        assert!(matches!(
            class,
            ReferenceClass::Logical { resource_type, .. } if resource_type == "Practitioner"
        ));
    }

    #[test]
    fn empty_element_is_an_error() {
        let err = classify(&json!({"display": "Dr. Example"}), None, None).unwrap_err();
        assert_eq!(err, ReferenceError::Empty);
    }

    #[test]
    fn identifier_missing_system_is_an_error() {
        let err = classify(
            &json!({"identifier": {"value": "abc"}}),
            Some(&["Organization"]),
            None,
        )
        .unwrap_err();
        assert_eq!(err, ReferenceError::IncompleteIdentifier { missing: "system" });
    }

    #[test]
    fn logical_without_type_hint_is_an_error() {
        let err = classify(
            &json!({"identifier": {"system": "urn:x", "value": "abc"}}),
            Some(&["Organization", "Practitioner"]),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ReferenceError::UnknownTargetType { .. }));
    }

    #[test]
    fn literal_outside_allowed_types_is_an_error() {
        let err = classify(
            &json!({"reference": "Device/7"}),
            Some(&["Patient", "Group"]),
            None,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ReferenceError::TypeNotAllowed {
                found: "Device".to_string()
            }
        );
    }

    #[test]
    fn contained_reference_is_skipped_not_an_error() {
        let class = classify(&json!({"reference": "#inner"}), None, None).unwrap();
        assert!(matches!(
            class,
            ReferenceClass::Skipped(Unresolvable::Contained(_))
        ));
    }
}
