//! Graph mapping for the FHIR `Condition` resource.
//!
//! Field coverage follows the HL7 R4 profile: <https://hl7.org/fhir/condition.html>

use fhirgraph_core::{GraphNode, NodeKey, RawResource};

use crate::common::{
    elements, numbered, put_codeable_concepts, put_identifiers, put_period, put_quantity,
    put_range, put_references, put_values,
};
use crate::{MappedResource, MappingError, ResourceMapper};

pub struct ConditionMapper;

impl ResourceMapper for ConditionMapper {
    fn resource_type(&self) -> &'static str {
        "Condition"
    }

    fn labels(&self) -> Vec<&'static str> {
        vec![
            "Condition",
            "ClinicalImpression",
            "DiagnosticReport",
            "Encounter",
            "Group",
            "Observation",
            "Patient",
            "Practitioner",
            "PractitionerRole",
            "RelatedPerson",
        ]
    }

    fn map(&self, raw: &RawResource) -> Result<MappedResource, MappingError> {
        let body = &raw.body;
        let mut out =
            MappedResource::new(GraphNode::new(NodeKey::new("Condition", raw.id.clone())));

        put_identifiers(&mut out.node, body.get("identifier"));
        put_codeable_concepts(&mut out.node, body.get("clinicalStatus"), "clinical_status");
        put_codeable_concepts(
            &mut out.node,
            body.get("verificationStatus"),
            "verification_status",
        );
        put_codeable_concepts(&mut out.node, body.get("category"), "category");
        put_codeable_concepts(&mut out.node, body.get("severity"), "severity");
        put_codeable_concepts(&mut out.node, body.get("code"), "code");
        put_codeable_concepts(&mut out.node, body.get("bodySite"), "body_site");

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

        // onset[x]
        put_values(&mut out.node, "onset", body.get("onsetDateTime"));
        put_quantity(&mut out.node, "onset", body.get("onsetAge"));
        put_period(&mut out.node, "onset", body.get("onsetPeriod"));
        put_range(&mut out.node, "onset", body.get("onsetRange"));
        put_values(&mut out.node, "onset", body.get("onsetString"));

        // abatement[x]
        put_values(&mut out.node, "abatement", body.get("abatementDateTime"));
        put_quantity(&mut out.node, "abatement", body.get("abatementAge"));
        put_period(&mut out.node, "abatement", body.get("abatementPeriod"));
        put_range(&mut out.node, "abatement", body.get("abatementRange"));
        put_values(&mut out.node, "abatement", body.get("abatementString"));

        put_values(&mut out.node, "recorded_date", body.get("recordedDate"));
        put_references(
            &mut out,
            body.get("recorder"),
            Some(&["Practitioner", "PractitionerRole", "Patient", "RelatedPerson"]),
            "recorder",
            "RECORDED_BY",
        );
        put_references(
            &mut out,
            body.get("asserter"),
            Some(&["Practitioner", "PractitionerRole", "Patient", "RelatedPerson"]),
            "asserter",
            "ASSERTED_BY",
        );

        for (n, stage) in elements(body.get("stage")).into_iter().enumerate() {
            let base = numbered("stage", n);
            put_codeable_concepts(&mut out.node, stage.get("summary"), &format!("{base}_summary"));
            put_codeable_concepts(&mut out.node, stage.get("type"), &format!("{base}_type"));
            put_references(
                &mut out,
                stage.get("assessment"),
                Some(&["ClinicalImpression", "DiagnosticReport", "Observation"]),
                &format!("{base}_assessment"),
                "HAS_ASSESSMENT",
            );
        }

        for (n, evidence) in elements(body.get("evidence")).into_iter().enumerate() {
            let base = numbered("evidence", n);
            put_codeable_concepts(&mut out.node, evidence.get("code"), &format!("{base}_code"));
            put_references(
                &mut out,
                evidence.get("detail"),
                None,
                &format!("{base}_detail"),
                "DETAILS_FOUND_IN",
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

    #[test]
    fn condition_maps_code_subject_and_onset() {
        let raw = RawResource::from_value(json!({
            "resourceType": "Condition",
            "id": "c1",
            "clinicalStatus": {"coding": [{"code": "active"}]},
            "code": {
                "text": "Essential hypertension",
                "coding": [{"system": "http://snomed.info/sct", "code": "59621000"}]
            },
            "subject": {"reference": "Patient/p1"},
            "encounter": {"reference": "Encounter/e1"},
            "onsetDateTime": "2020-03-01"
        }))
        .unwrap();

        let out = ConditionMapper.map(&raw).unwrap();
        assert_eq!(
            out.node.properties.get("code"),
            Some(&PropertyValue::Text("Essential hypertension".to_string()))
        );
        assert_eq!(
            out.node.properties.get("clinical_status_code"),
            Some(&PropertyValue::Text("active".to_string()))
        );
        assert_eq!(
            out.node.properties.get("onset"),
            Some(&PropertyValue::Text("2020-03-01".to_string()))
        );
        assert_eq!(out.edges.len(), 2);
        assert_eq!(
            out.edges[1].target,
            ReferenceTarget::Literal(NodeKey::new("Encounter", "e1"))
        );
    }

    #[test]
    fn stage_assessment_becomes_an_edge() {
        let raw = RawResource::from_value(json!({
            "resourceType": "Condition",
            "id": "c2",
            "stage": [{"assessment": [{"reference": "Observation/obs1"}]}]
        }))
        .unwrap();

        let out = ConditionMapper.map(&raw).unwrap();
        assert_eq!(out.edges[0].rel_type, "HAS_ASSESSMENT");
    }
}
