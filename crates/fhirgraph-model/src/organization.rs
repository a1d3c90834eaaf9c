//! Graph mapping for the FHIR `Organization` resource.
//!
//! Field coverage follows the HL7 R4 profile: <https://hl7.org/fhir/organization.html>

use fhirgraph_core::{GraphNode, NodeKey, RawResource};

use crate::common::{
    elements, numbered, put_addresses, put_codeable_concepts, put_contact_points, put_human_names,
    put_identifiers, put_references, put_values,
};
use crate::{MappedResource, MappingError, ResourceMapper};

pub struct OrganizationMapper;

impl ResourceMapper for OrganizationMapper {
    fn resource_type(&self) -> &'static str {
        "Organization"
    }

    fn labels(&self) -> Vec<&'static str> {
        vec!["Organization", "Endpoint"]
    }

    fn map(&self, raw: &RawResource) -> Result<MappedResource, MappingError> {
        let body = &raw.body;
        let mut out =
            MappedResource::new(GraphNode::new(NodeKey::new("Organization", raw.id.clone())));

        put_identifiers(&mut out.node, body.get("identifier"));
        put_values(&mut out.node, "active", body.get("active"));
        put_codeable_concepts(&mut out.node, body.get("type"), "type");
        put_values(&mut out.node, "name", body.get("name"));
        put_values(&mut out.node, "alias", body.get("alias"));
        put_contact_points(&mut out.node, body.get("telecom"), "telecom");
        put_addresses(&mut out.node, body.get("address"), "address");

        put_references(
            &mut out,
            body.get("partOf"),
            Some(&["Organization"]),
            "part_of",
            "PART_OF",
        );

        for (n, contact) in elements(body.get("contact")).into_iter().enumerate() {
            let base = numbered("contact", n);
            put_codeable_concepts(
                &mut out.node,
                contact.get("purpose"),
                &format!("{base}_purpose"),
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
        }

        put_references(
            &mut out,
            body.get("endpoint"),
            Some(&["Endpoint"]),
            "endpoint",
            "HAS_ENDPOINT",
        );

        Ok(out)
    }
}
