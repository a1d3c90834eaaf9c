//! Shared flattening helpers for FHIR datatypes.
//!
//! FHIR elements with cardinality 0..* may arrive as a single object or an
//! array; [`elements`] normalizes both. Repeated elements keep the bare
//! property key for the first item and number the rest (`name`, `name2`,
//! `name3`, ...), so sparsely populated resources produce compact nodes.

use serde_json::Value;
use tracing::warn;

use fhirgraph_core::reference::{ReferenceClass, classify};
use fhirgraph_core::{GraphNode, PropertyValue, ReferenceError, ReferenceTarget};

use crate::{MappedResource, MappingError};

/// Normalizes an optional single-or-array element into a list.
pub(crate) fn elements(value: Option<&Value>) -> Vec<&Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single) => vec![single],
    }
}

/// First item keeps the key, later items get a numeric suffix.
pub(crate) fn numbered(key: &str, index: usize) -> String {
    if index == 0 {
        key.to_string()
    } else {
        format!("{key}{}", index + 1)
    }
}

fn scalar(value: &Value) -> Option<PropertyValue> {
    match value {
        Value::String(s) => Some(s.as_str().into()),
        Value::Bool(b) => Some((*b).into()),
        Value::Number(n) => n
            .as_i64()
            .map(PropertyValue::from)
            .or_else(|| n.as_f64().map(PropertyValue::from)),
        _ => None,
    }
}

/// Stores a scalar element, or a list of scalars under numbered keys.
pub(crate) fn put_values(node: &mut GraphNode, key: &str, value: Option<&Value>) {
    for (n, item) in elements(value).into_iter().enumerate() {
        if let Some(scalar) = scalar(item) {
            node.set(numbered(key, n), scalar);
        }
    }
}

/// Period → `{key}_start` / `{key}_end`.
pub(crate) fn put_period(node: &mut GraphNode, key: &str, value: Option<&Value>) {
    let Some(period) = value else { return };
    put_values(node, &format!("{key}_start"), period.get("start"));
    put_values(node, &format!("{key}_end"), period.get("end"));
}

/// Quantity → `{key}` (value), `_comparator`, `_unit`, `_system`, `_code`.
pub(crate) fn put_quantity(node: &mut GraphNode, key: &str, value: Option<&Value>) {
    let Some(quantity) = value else { return };
    put_values(node, key, quantity.get("value"));
    put_values(node, &format!("{key}_comparator"), quantity.get("comparator"));
    put_values(node, &format!("{key}_unit"), quantity.get("unit"));
    put_values(node, &format!("{key}_system"), quantity.get("system"));
    put_values(node, &format!("{key}_code"), quantity.get("code"));
}

/// Range → low/high quantities.
pub(crate) fn put_range(node: &mut GraphNode, key: &str, value: Option<&Value>) {
    let Some(range) = value else { return };
    put_quantity(node, &format!("{key}_low"), range.get("low"));
    put_quantity(node, &format!("{key}_high"), range.get("high"));
}

/// Ratio → numerator/denominator quantities.
pub(crate) fn put_ratio(node: &mut GraphNode, key: &str, value: Option<&Value>) {
    let Some(ratio) = value else { return };
    put_quantity(node, &format!("{key}_numerator"), ratio.get("numerator"));
    put_quantity(node, &format!("{key}_denominator"), ratio.get("denominator"));
}

/// HumanName(s) → `{key}` (text), `_use`, `_family`, `_given`, `_prefix`,
/// `_suffix`, `_period_*`.
pub(crate) fn put_human_names(node: &mut GraphNode, value: Option<&Value>, key: &str) {
    for (n, name) in elements(value).into_iter().enumerate() {
        let base = numbered(key, n);
        put_values(node, &format!("{base}_use"), name.get("use"));
        put_values(node, &base, name.get("text"));
        put_values(node, &format!("{base}_family"), name.get("family"));
        put_values(node, &format!("{base}_given"), name.get("given"));
        put_values(node, &format!("{base}_prefix"), name.get("prefix"));
        put_values(node, &format!("{base}_suffix"), name.get("suffix"));
        put_period(node, &format!("{base}_period"), name.get("period"));
    }
}

/// Address(es) → `{key}` (text), `_use`, `_type`, `_line`, `_city`,
/// `_district`, `_state`, `_postalcode`, `_country`, `_period_*`.
pub(crate) fn put_addresses(node: &mut GraphNode, value: Option<&Value>, key: &str) {
    for (n, address) in elements(value).into_iter().enumerate() {
        let base = numbered(key, n);
        put_values(node, &format!("{base}_use"), address.get("use"));
        put_values(node, &format!("{base}_type"), address.get("type"));
        put_values(node, &base, address.get("text"));
        put_values(node, &format!("{base}_line"), address.get("line"));
        put_values(node, &format!("{base}_city"), address.get("city"));
        put_values(node, &format!("{base}_district"), address.get("district"));
        put_values(node, &format!("{base}_state"), address.get("state"));
        put_values(node, &format!("{base}_postalcode"), address.get("postalCode"));
        put_values(node, &format!("{base}_country"), address.get("country"));
        put_period(node, &format!("{base}_period"), address.get("period"));
    }
}

/// ContactPoint(s) → `{key}` (value), `_system`, `_use`, `_rank`, `_period_*`.
pub(crate) fn put_contact_points(node: &mut GraphNode, value: Option<&Value>, key: &str) {
    for (n, cp) in elements(value).into_iter().enumerate() {
        let base = numbered(key, n);
        put_values(node, &format!("{base}_system"), cp.get("system"));
        put_values(node, &base, cp.get("value"));
        put_values(node, &format!("{base}_use"), cp.get("use"));
        put_values(node, &format!("{base}_rank"), cp.get("rank"));
        put_period(node, &format!("{base}_period"), cp.get("period"));
    }
}

/// Coding → `{key}_code`, `{key}_code_system`, `{key}_code_display`,
/// numbered per coding.
pub(crate) fn put_codings(node: &mut GraphNode, value: Option<&Value>, key: &str) {
    for (n, coding) in elements(value).into_iter().enumerate() {
        let base = numbered(&format!("{key}_code"), n);
        put_values(node, &base, coding.get("code"));
        put_values(node, &format!("{base}_system"), coding.get("system"));
        put_values(node, &format!("{base}_display"), coding.get("display"));
    }
}

/// CodeableConcept(s) → text under `{key}`, codings under `{key}_code*`.
pub(crate) fn put_codeable_concepts(node: &mut GraphNode, value: Option<&Value>, key: &str) {
    let mut coding_index = 0;
    for (n, concept) in elements(value).into_iter().enumerate() {
        put_values(node, &numbered(key, n), concept.get("text"));
        for coding in elements(concept.get("coding")) {
            let base = numbered(&format!("{key}_code"), coding_index);
            coding_index += 1;
            put_values(node, &base, coding.get("code"));
            put_values(node, &format!("{base}_system"), coding.get("system"));
            put_values(node, &format!("{base}_display"), coding.get("display"));
        }
    }
}

/// Preserves every declared identifier on the node: the `identifiers` list
/// (the resolve pass joins on it) plus readable numbered properties.
/// An identifier without a value cannot identify anything and is skipped.
pub(crate) fn put_identifiers(node: &mut GraphNode, value: Option<&Value>) {
    for (n, identifier) in elements(value).into_iter().enumerate() {
        let Some(id_value) = identifier.get("value").and_then(Value::as_str) else {
            warn!("skipping identifier without a value");
            continue;
        };
        let system = identifier
            .get("system")
            .and_then(Value::as_str)
            .unwrap_or("");
        node.add_identifier(system, id_value);
        let base = numbered("identifier", n);
        node.set(base.clone(), id_value);
        if !system.is_empty() {
            node.set(format!("{base}_system"), system);
        }
        put_values(node, &format!("{base}_use"), identifier.get("use"));
    }
}

/// Processes Reference element(s): `display` becomes a property on the
/// source node, and the reference itself becomes an edge descriptor —
/// literal or logical per classification. Well-formed references that point
/// outside the graph (contained, URN, foreign server) are skipped with a
/// warning. Malformed ones are recorded as issues, never silently dropped.
pub(crate) fn put_references(
    out: &mut MappedResource,
    value: Option<&Value>,
    allowed: Option<&[&str]>,
    key: &str,
    rel_type: &str,
) {
    for (n, reference) in elements(value).into_iter().enumerate() {
        if let Some(display) = reference.get("display").and_then(Value::as_str) {
            out.node.set(numbered(key, n), display);
        }
        match classify(reference, allowed, None) {
            Ok(ReferenceClass::Literal(target)) => {
                out.edge(rel_type, ReferenceTarget::Literal(target));
            }
            Ok(ReferenceClass::Logical {
                resource_type,
                system,
                value,
            }) => {
                out.edge(
                    rel_type,
                    ReferenceTarget::Logical {
                        resource_type,
                        system,
                        value,
                    },
                );
            }
            Ok(ReferenceClass::Skipped(unresolvable)) => {
                warn!(element = key, "skipping {unresolvable}");
            }
            // Display-only references are legal: the text was kept above.
            Err(ReferenceError::Empty) if reference.get("display").is_some() => {}
            Err(source) => {
                out.issues.push(MappingError::Reference {
                    element: key.to_string(),
                    source,
                });
            }
        }
    }
}
