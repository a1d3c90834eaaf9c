//! Raw FHIR resources as fetched from the server.

use serde_json::Value;

/// One raw resource record: the type tag, the server-assigned id and the
/// untouched JSON body. Transient — fetched, mapped, then dropped.
#[derive(Debug, Clone)]
pub struct RawResource {
    pub resource_type: String,
    pub id: String,
    pub body: Value,
}

impl RawResource {
    /// Builds a `RawResource` from a bundle entry body, requiring the
    /// structural minimum: a `resourceType` string and an `id` string.
    pub fn from_value(body: Value) -> Result<Self, String> {
        let resource_type = body
            .get("resourceType")
            .and_then(Value::as_str)
            .ok_or("resource is missing resourceType")?
            .to_string();
        let id = body
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| format!("{resource_type} resource is missing id"))?
            .to_string();
        Ok(Self {
            resource_type,
            id,
            body,
        })
    }
}
