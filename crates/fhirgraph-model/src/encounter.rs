//! Graph mapping for the FHIR `Encounter` resource.
//!
//! Field coverage follows the HL7 R4 profile: <https://hl7.org/fhir/encounter.html>

use fhirgraph_core::{GraphNode, NodeKey, RawResource};

use crate::common::{
    elements, numbered, put_codeable_concepts, put_codings, put_identifiers, put_period,
    put_quantity, put_references, put_values,
};
use crate::{MappedResource, MappingError, ResourceMapper};

pub struct EncounterMapper;

impl ResourceMapper for EncounterMapper {
    fn resource_type(&self) -> &'static str {
        "Encounter"
    }

    fn labels(&self) -> Vec<&'static str> {
        vec![
            "Encounter",
            "Account",
            "Appointment",
            "Condition",
            "EpisodeOfCare",
            "Group",
            "ImmunizationRecommendation",
            "Location",
            "Observation",
            "Organization",
            "Patient",
            "Practitioner",
            "PractitionerRole",
            "Procedure",
            "RelatedPerson",
            "ServiceRequest",
        ]
    }

    fn map(&self, raw: &RawResource) -> Result<MappedResource, MappingError> {
        let body = &raw.body;
        let mut out =
            MappedResource::new(GraphNode::new(NodeKey::new("Encounter", raw.id.clone())));

        put_identifiers(&mut out.node, body.get("identifier"));
        put_values(&mut out.node, "status", body.get("status"));
        put_codings(&mut out.node, body.get("class"), "class");
        put_codeable_concepts(&mut out.node, body.get("type"), "type");
        put_codeable_concepts(&mut out.node, body.get("serviceType"), "service_type");
        put_codeable_concepts(&mut out.node, body.get("priority"), "priority");

        put_references(
            &mut out,
            body.get("subject"),
            Some(&["Patient", "Group"]),
            "subject",
            "HAS_SUBJECT",
        );
        put_references(
            &mut out,
            body.get("episodeOfCare"),
            Some(&["EpisodeOfCare"]),
            "episode_of_care",
            "PART_OF",
        );
        put_references(
            &mut out,
            body.get("basedOn"),
            Some(&["ServiceRequest"]),
            "based_on",
            "BASED_ON",
        );

        for (n, participant) in elements(body.get("participant")).into_iter().enumerate() {
            let base = numbered("participant", n);
            put_codeable_concepts(
                &mut out.node,
                participant.get("type"),
                &format!("{base}_type"),
            );
            put_period(&mut out.node, &format!("{base}_period"), participant.get("period"));
            put_references(
                &mut out,
                participant.get("individual"),
                Some(&["Practitioner", "PractitionerRole", "RelatedPerson"]),
                &format!("{base}_individual"),
                "HAS_PARTICIPANT",
            );
        }

        put_references(
            &mut out,
            body.get("appointment"),
            Some(&["Appointment"]),
            "appointment",
            "SCHEDULED_BY",
        );
        put_period(&mut out.node, "period", body.get("period"));
        put_quantity(&mut out.node, "length", body.get("length"));
        put_codeable_concepts(&mut out.node, body.get("reasonCode"), "reason");
        put_references(
            &mut out,
            body.get("reasonReference"),
            Some(&["Condition", "Procedure", "Observation", "ImmunizationRecommendation"]),
            "reason_reference",
            "HAS_REASON_REFERENCE",
        );

        for (n, diagnosis) in elements(body.get("diagnosis")).into_iter().enumerate() {
            let base = numbered("diagnosis", n);
            put_codeable_concepts(&mut out.node, diagnosis.get("use"), &format!("{base}_use"));
            put_values(&mut out.node, &format!("{base}_rank"), diagnosis.get("rank"));
            put_references(
                &mut out,
                diagnosis.get("condition"),
                Some(&["Condition", "Procedure"]),
                &format!("{base}_condition"),
                "HAS_DIAGNOSIS",
            );
        }

        put_references(
            &mut out,
            body.get("account"),
            Some(&["Account"]),
            "account",
            "HAS_ACCOUNT",
        );

        if let Some(hospitalization) = body.get("hospitalization") {
            put_references(
                &mut out,
                hospitalization.get("origin"),
                Some(&["Location", "Organization"]),
                "hospitalization_origin",
                "ADMITTED_FROM",
            );
            put_codeable_concepts(
                &mut out.node,
                hospitalization.get("admitSource"),
                "hospitalization_admit_source",
            );
            put_codeable_concepts(
                &mut out.node,
                hospitalization.get("dietPreference"),
                "hospitalization_diet_preference",
            );
            put_references(
                &mut out,
                hospitalization.get("destination"),
                Some(&["Location", "Organization"]),
                "hospitalization_destination",
                "DISCHARGED_TO",
            );
            put_codeable_concepts(
                &mut out.node,
                hospitalization.get("dischargeDisposition"),
                "hospitalization_discharge_disposition",
            );
        }

        for (n, location) in elements(body.get("location")).into_iter().enumerate() {
            let base = numbered("location", n);
            put_values(&mut out.node, &format!("{base}_status"), location.get("status"));
            put_references(
                &mut out,
                location.get("location"),
                Some(&["Location"]),
                &base,
                "HAS_LOCATION",
            );
        }

        put_references(
            &mut out,
            body.get("serviceProvider"),
            Some(&["Organization"]),
            "service_provider",
            "HAS_SERVICE_PROVIDER",
        );
        put_references(
            &mut out,
            body.get("partOf"),
            Some(&["Encounter"]),
            "part_of",
            "PART_OF",
        );

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fhirgraph_core::{PropertyValue, ReferenceTarget};
    use serde_json::json;

    #[test]
    fn encounter_maps_subject_class_and_period() {
        let raw = RawResource::from_value(json!({
            "resourceType": "Encounter",
            "id": "e1",
            "status": "finished",
            "class": {"system": "urn:hl7:ActCode", "code": "AMB"},
            "subject": {"reference": "Patient/p1"},
            "period": {"start": "2023-05-01T08:00:00Z", "end": "2023-05-01T09:00:00Z"},
            "serviceProvider": {"reference": "Organization/o1"}
        }))
        .unwrap();

        let out = EncounterMapper.map(&raw).unwrap();
        assert_eq!(
            out.node.properties.get("status"),
            Some(&PropertyValue::Text("finished".to_string()))
        );
        assert_eq!(
            out.node.properties.get("class_code"),
            Some(&PropertyValue::Text("AMB".to_string()))
        );
        assert!(out.node.properties.contains_key("period_start"));

        let subject = out
            .edges
            .iter()
            .find(|edge| edge.rel_type == "HAS_SUBJECT")
            .unwrap();
        assert_eq!(
            subject.target,
            ReferenceTarget::Literal(NodeKey::new("Patient", "p1"))
        );
        assert!(
            out.edges
                .iter()
                .any(|edge| edge.rel_type == "HAS_SERVICE_PROVIDER")
        );
    }

    #[test]
    fn diagnosis_backbone_produces_edges_and_rank() {
        let raw = RawResource::from_value(json!({
            "resourceType": "Encounter",
            "id": "e1",
            "diagnosis": [
                {"condition": {"reference": "Condition/c1"}, "rank": 1},
                {"condition": {"reference": "Condition/c2"}, "rank": 2}
            ]
        }))
        .unwrap();

        let out = EncounterMapper.map(&raw).unwrap();
        let diagnoses: Vec<_> = out
            .edges
            .iter()
            .filter(|edge| edge.rel_type == "HAS_DIAGNOSIS")
            .collect();
        assert_eq!(diagnoses.len(), 2);
        assert_eq!(
            out.node.properties.get("diagnosis_rank"),
            Some(&PropertyValue::Integer(1))
        );
        assert_eq!(
            out.node.properties.get("diagnosis2_rank"),
            Some(&PropertyValue::Integer(2))
        );
    }
}
