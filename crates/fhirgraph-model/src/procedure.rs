//! Graph mapping for the FHIR `Procedure` resource.
//!
//! Field coverage follows the HL7 R4 profile: <https://hl7.org/fhir/procedure.html>

use fhirgraph_core::{GraphNode, NodeKey, RawResource};

use crate::common::{
    elements, numbered, put_codeable_concepts, put_identifiers, put_period, put_quantity,
    put_range, put_references, put_values,
};
use crate::{MappedResource, MappingError, ResourceMapper};

pub struct ProcedureMapper;

impl ResourceMapper for ProcedureMapper {
    fn resource_type(&self) -> &'static str {
        "Procedure"
    }

    fn labels(&self) -> Vec<&'static str> {
        vec![
            "Procedure",
            "CarePlan",
            "Composition",
            "Condition",
            "Device",
            "DiagnosticReport",
            "DocumentReference",
            "Encounter",
            "Group",
            "Location",
            "Medication",
            "MedicationAdministration",
            "Observation",
            "Organization",
            "Patient",
            "Practitioner",
            "PractitionerRole",
            "RelatedPerson",
            "ServiceRequest",
            "Substance",
        ]
    }

    fn map(&self, raw: &RawResource) -> Result<MappedResource, MappingError> {
        let body = &raw.body;
        let mut out =
            MappedResource::new(GraphNode::new(NodeKey::new("Procedure", raw.id.clone())));

        put_identifiers(&mut out.node, body.get("identifier"));
        put_values(
            &mut out.node,
            "instantiates_canonical",
            body.get("instantiatesCanonical"),
        );
        put_values(&mut out.node, "instantiates_uri", body.get("instantiatesUri"));
        put_references(
            &mut out,
            body.get("basedOn"),
            Some(&["CarePlan", "ServiceRequest"]),
            "based_on",
            "BASED_ON",
        );
        put_references(
            &mut out,
            body.get("partOf"),
            Some(&["Procedure", "Observation", "MedicationAdministration"]),
            "part_of",
            "PART_OF",
        );
        put_values(&mut out.node, "status", body.get("status"));
        put_codeable_concepts(&mut out.node, body.get("statusReason"), "status_reason");
        put_codeable_concepts(&mut out.node, body.get("category"), "category");
        put_codeable_concepts(&mut out.node, body.get("code"), "code");

        put_references(
            &mut out,
            body.get("subject"),
            Some(&["Patient", "Group"]),
            "subject",
            "HAS_SUBJECT",
        );
        put_references(
            &mut out,
            body.get("encounter"),
            Some(&["Encounter"]),
            "encounter",
            "ASSOCIATED_WITH",
        );

        // performed[x]
        put_values(&mut out.node, "performed", body.get("performedDateTime"));
        put_period(&mut out.node, "performed", body.get("performedPeriod"));
        put_values(&mut out.node, "performed", body.get("performedString"));
        put_quantity(&mut out.node, "performed", body.get("performedAge"));
        put_range(&mut out.node, "performed", body.get("performedRange"));

        put_references(
            &mut out,
            body.get("recorder"),
            Some(&["Patient", "RelatedPerson", "Practitioner", "PractitionerRole"]),
            "recorder",
            "RECORDED_BY",
        );
        put_references(
            &mut out,
            body.get("asserter"),
            Some(&["Patient", "RelatedPerson", "Practitioner", "PractitionerRole"]),
            "asserter",
            "ASSERTED_BY",
        );

        for (n, performer) in elements(body.get("performer")).into_iter().enumerate() {
            let base = numbered("performer", n);
            put_codeable_concepts(
                &mut out.node,
                performer.get("function"),
                &format!("{base}_function"),
            );
            put_references(
                &mut out,
                performer.get("actor"),
                Some(&[
                    "Practitioner",
                    "PractitionerRole",
                    "Organization",
                    "Patient",
                    "RelatedPerson",
                    "Device",
                ]),
                &format!("{base}_actor"),
                "PERFORMED_BY",
            );
            put_references(
                &mut out,
                performer.get("onBehalfOf"),
                Some(&["Organization"]),
                &format!("{base}_on_behalf_of"),
                "ON_BEHALF_OF",
            );
        }

        put_references(
            &mut out,
            body.get("location"),
            Some(&["Location"]),
            "location",
            "HAS_LOCATION",
        );
        put_codeable_concepts(&mut out.node, body.get("reasonCode"), "reason_code");
        put_references(
            &mut out,
            body.get("reasonReference"),
            Some(&[
                "Condition",
                "Observation",
                "Procedure",
                "DiagnosticReport",
                "DocumentReference",
            ]),
            "reason_reference",
            "HAS_REASON_REFERENCE",
        );
        put_codeable_concepts(&mut out.node, body.get("bodySite"), "body_site");
        put_codeable_concepts(&mut out.node, body.get("outcome"), "outcome");
        put_references(
            &mut out,
            body.get("report"),
            Some(&["DiagnosticReport", "DocumentReference", "Composition"]),
            "report",
            "RESULTS_IN",
        );
        put_codeable_concepts(&mut out.node, body.get("complication"), "complication");
        put_references(
            &mut out,
            body.get("complicationDetail"),
            Some(&["Condition"]),
            "complication_detail",
            "RESULTS_IN",
        );
        put_codeable_concepts(&mut out.node, body.get("followUp"), "follow_up");
        put_references(
            &mut out,
            body.get("usedReference"),
            Some(&["Device", "Medication", "Substance"]),
            "used_reference",
            "USED",
        );
        put_codeable_concepts(&mut out.node, body.get("usedCode"), "used_code");

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fhirgraph_core::PropertyValue;
    use serde_json::json;

    #[test]
    fn procedure_maps_code_performer_and_report() {
        let raw = RawResource::from_value(json!({
            "resourceType": "Procedure",
            "id": "proc1",
            "status": "completed",
            "code": {"coding": [{"system": "http://snomed.info/sct", "code": "80146002"}]},
            "subject": {"reference": "Patient/p1"},
            "performedDateTime": "2023-04-12",
            "performer": [{"actor": {"reference": "Practitioner/dr1"}}],
            "report": [{"reference": "DiagnosticReport/dr9"}]
        }))
        .unwrap();

        let out = ProcedureMapper.map(&raw).unwrap();
        assert_eq!(
            out.node.properties.get("performed"),
            Some(&PropertyValue::Text("2023-04-12".to_string()))
        );
        assert!(out.edges.iter().any(|e| e.rel_type == "PERFORMED_BY"));
        assert!(out.edges.iter().any(|e| e.rel_type == "RESULTS_IN"));
        assert!(out.issues.is_empty());
    }
}
