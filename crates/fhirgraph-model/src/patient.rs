//! Graph mapping for the FHIR `Patient` resource.
//!
//! Field coverage follows the HL7 R4 profile: <https://hl7.org/fhir/patient.html>

use serde_json::Value;

use fhirgraph_core::{GraphNode, NodeKey, RawResource};

use crate::common::{
    elements, numbered, put_addresses, put_codeable_concepts, put_contact_points, put_human_names,
    put_identifiers, put_references, put_values,
};
use crate::{MappedResource, MappingError, ResourceMapper};

pub struct PatientMapper;

impl ResourceMapper for PatientMapper {
    fn resource_type(&self) -> &'static str {
        "Patient"
    }

    fn labels(&self) -> Vec<&'static str> {
        vec![
            "Patient",
            "Organization",
            "Practitioner",
            "PractitionerRole",
            "RelatedPerson",
        ]
    }

    fn map(&self, raw: &RawResource) -> Result<MappedResource, MappingError> {
        let body = &raw.body;
        let mut out = MappedResource::new(GraphNode::new(NodeKey::new("Patient", raw.id.clone())));

        put_identifiers(&mut out.node, body.get("identifier"));
        put_values(&mut out.node, "active", body.get("active"));
        put_human_names(&mut out.node, body.get("name"), "name");
        put_contact_points(&mut out.node, body.get("telecom"), "telecom");
        put_values(&mut out.node, "gender", body.get("gender"));
        put_values(&mut out.node, "birthdate", body.get("birthDate"));
        // deceased[x]: only one variant is populated
        put_values(&mut out.node, "deceased", body.get("deceasedBoolean"));
        put_values(&mut out.node, "deceased", body.get("deceasedDateTime"));
        put_addresses(&mut out.node, body.get("address"), "address");
        put_codeable_concepts(&mut out.node, body.get("maritalStatus"), "marital_status");
        put_values(&mut out.node, "multiple_birth", body.get("multipleBirthBoolean"));
        put_values(
            &mut out.node,
            "multiple_birth_order",
            body.get("multipleBirthInteger"),
        );

        for (n, communication) in elements(body.get("communication")).into_iter().enumerate() {
            put_codeable_concepts(
                &mut out.node,
                communication.get("language"),
                &numbered("language", n),
            );
        }

        for (n, contact) in elements(body.get("contact")).into_iter().enumerate() {
            let base = numbered("contact", n);
            put_codeable_concepts(
                &mut out.node,
                contact.get("relationship"),
                &format!("{base}_relationship"),
            );
            put_human_names(&mut out.node, contact.get("name"), &format!("{base}_name"));
            put_contact_points(
                &mut out.node,
                contact.get("telecom"),
                &format!("{base}_telecom"),
            );
            put_addresses(
                &mut out.node,
                contact.get("address"),
                &format!("{base}_address"),
            );
            put_values(&mut out.node, &format!("{base}_gender"), contact.get("gender"));
            put_references(
                &mut out,
                contact.get("organization"),
                Some(&["Organization"]),
                "associated_organization",
                "ASSOCIATED_WITH",
            );
        }

        put_references(
            &mut out,
            body.get("generalPractitioner"),
            Some(&["Organization", "Practitioner", "PractitionerRole"]),
            "general_practitioner",
            "HAS_PRACTITIONER",
        );
        put_references(
            &mut out,
            body.get("managingOrganization"),
            Some(&["Organization"]),
            "managed_by",
            "MANAGED_BY",
        );

        for (n, link) in elements(body.get("link")).into_iter().enumerate() {
            let Some(link_type) = link.get("type").and_then(Value::as_str) else {
                continue;
            };
            // e.g. "replaced-by" → REPLACED_BY
            let rel_type = link_type.to_uppercase().replace('-', "_");
            put_references(
                &mut out,
                link.get("other"),
                Some(&["Patient", "RelatedPerson"]),
                &numbered(&format!("link_{link_type}"), n),
                &rel_type,
            );
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fhirgraph_core::{PropertyValue, ReferenceTarget};
    use serde_json::json;

    fn map(body: serde_json::Value) -> MappedResource {
        PatientMapper
            .map(&RawResource::from_value(body).unwrap())
            .unwrap()
    }

    #[test]
    fn sparse_patient_maps_without_error() {
        let out = map(json!({"resourceType": "Patient", "id": "p1"}));
        assert_eq!(out.node.key, NodeKey::new("Patient", "p1"));
        assert!(out.edges.is_empty());
        assert!(out.issues.is_empty());
    }

    #[test]
    fn literal_managing_organization_becomes_an_edge() {
        let out = map(json!({
            "resourceType": "Patient",
            "id": "p1",
            "managingOrganization": {"reference": "Organization/o1"}
        }));
        assert_eq!(out.edges.len(), 1);
        assert_eq!(out.edges[0].rel_type, "MANAGED_BY");
        assert_eq!(
            out.edges[0].target,
            ReferenceTarget::Literal(NodeKey::new("Organization", "o1"))
        );
    }

    #[test]
    fn logical_managing_organization_becomes_a_logical_edge() {
        let out = map(json!({
            "resourceType": "Patient",
            "id": "p1",
            "managingOrganization": {
                "identifier": {"system": "urn:org", "value": "abc"}
            }
        }));
        assert_eq!(
            out.edges[0].target,
            ReferenceTarget::Logical {
                resource_type: "Organization".to_string(),
                system: "urn:org".to_string(),
                value: "abc".to_string(),
            }
        );
    }

    #[test]
    fn identifiers_and_demographics_land_on_the_node() {
        let out = map(json!({
            "resourceType": "Patient",
            "id": "p1",
            "identifier": [{"system": "urn:mrn", "value": "42"}],
            "gender": "female",
            "birthDate": "1815-12-10",
            "name": [{"family": "Lovelace", "given": ["Ada"]}]
        }));
        assert_eq!(out.node.identifiers(), ["urn:mrn|42"]);
        assert_eq!(
            out.node.properties.get("gender"),
            Some(&PropertyValue::Text("female".to_string()))
        );
        assert_eq!(
            out.node.properties.get("name_family"),
            Some(&PropertyValue::Text("Lovelace".to_string()))
        );
    }

    #[test]
    fn patient_link_uses_the_link_type_as_relationship() {
        let out = map(json!({
            "resourceType": "Patient",
            "id": "p1",
            "link": [{"type": "replaced-by", "other": {"reference": "Patient/p2"}}]
        }));
        assert_eq!(out.edges[0].rel_type, "REPLACED_BY");
    }

    #[test]
    fn malformed_reference_is_reported_not_dropped() {
        let out = map(json!({
            "resourceType": "Patient",
            "id": "p1",
            "managingOrganization": {"identifier": {"value": "no-system"}}
        }));
        assert!(out.edges.is_empty());
        assert_eq!(out.issues.len(), 1);
    }
}
