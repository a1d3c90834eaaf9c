//! Graph mapping for the FHIR `Observation` resource.
//!
//! Field coverage follows the HL7 R4 profile: <https://hl7.org/fhir/observation.html>

use fhirgraph_core::{GraphNode, NodeKey, RawResource};

use crate::common::{
    elements, numbered, put_codeable_concepts, put_identifiers, put_period, put_quantity,
    put_range, put_ratio, put_references, put_values,
};
use crate::{MappedResource, MappingError, ResourceMapper};

pub struct ObservationMapper;

/// Flattens the `value[x]` choice element under `key`; exactly one variant
/// is populated on a given resource.
fn put_value_choice(out: &mut MappedResource, body: &serde_json::Value, key: &str) {
    let node = &mut out.node;
    put_quantity(node, key, body.get("valueQuantity"));
    put_codeable_concepts(node, body.get("valueCodeableConcept"), key);
    put_values(node, key, body.get("valueString"));
    put_values(node, key, body.get("valueBoolean"));
    put_values(node, key, body.get("valueInteger"));
    put_range(node, key, body.get("valueRange"));
    put_ratio(node, key, body.get("valueRatio"));
    put_values(node, key, body.get("valueTime"));
    put_values(node, key, body.get("valueDateTime"));
    put_period(node, key, body.get("valuePeriod"));
}

impl ResourceMapper for ObservationMapper {
    fn resource_type(&self) -> &'static str {
        "Observation"
    }

    fn labels(&self) -> Vec<&'static str> {
        vec![
            "Observation",
            "CarePlan",
            "CareTeam",
            "Device",
            "DeviceMetric",
            "DeviceRequest",
            "Encounter",
            "Group",
            "ImagingStudy",
            "Immunization",
            "ImmunizationRecommendation",
            "Location",
            "Medication",
            "MedicationAdministration",
            "MedicationDispense",
            "MedicationRequest",
            "MedicationStatement",
            "MolecularSequence",
            "NutritionOrder",
            "Organization",
            "Patient",
            "Practitioner",
            "PractitionerRole",
            "Procedure",
            "QuestionnaireResponse",
            "RelatedPerson",
            "ServiceRequest",
            "Specimen",
            "Substance",
        ]
    }

    fn map(&self, raw: &RawResource) -> Result<MappedResource, MappingError> {
        let body = &raw.body;
        let mut out =
            MappedResource::new(GraphNode::new(NodeKey::new("Observation", raw.id.clone())));

        put_identifiers(&mut out.node, body.get("identifier"));
        put_references(
            &mut out,
            body.get("basedOn"),
            Some(&[
                "CarePlan",
                "DeviceRequest",
                "ImmunizationRecommendation",
                "MedicationRequest",
                "NutritionOrder",
                "ServiceRequest",
            ]),
            "based_on",
            "BASED_ON",
        );
        put_references(
            &mut out,
            body.get("partOf"),
            Some(&[
                "MedicationAdministration",
                "MedicationDispense",
                "MedicationStatement",
                "Procedure",
                "Immunization",
                "ImagingStudy",
            ]),
            "part_of",
            "PART_OF",
        );
        put_values(&mut out.node, "status", body.get("status"));
        put_codeable_concepts(&mut out.node, body.get("category"), "category");
        put_codeable_concepts(&mut out.node, body.get("code"), "code");

        put_references(
            &mut out,
            body.get("subject"),
            Some(&[
                "Patient",
                "Group",
                "Device",
                "Location",
                "Organization",
                "Procedure",
                "Practitioner",
                "Medication",
                "Substance",
            ]),
            "subject",
            "HAS_SUBJECT",
        );
        // focus admits any resource type, so no allowed-type check here
        put_references(&mut out, body.get("focus"), None, "focus", "HAS_FOCUS");
        put_references(
            &mut out,
            body.get("encounter"),
            Some(&["Encounter"]),
            "encounter",
            "ASSOCIATED_WITH",
        );

        // effective[x]
        put_values(&mut out.node, "effective", body.get("effectiveDateTime"));
        put_period(&mut out.node, "effective", body.get("effectivePeriod"));
        put_values(&mut out.node, "effective", body.get("effectiveInstant"));
        put_values(&mut out.node, "issued", body.get("issued"));

        put_references(
            &mut out,
            body.get("performer"),
            Some(&[
                "Practitioner",
                "PractitionerRole",
                "Organization",
                "CareTeam",
                "Patient",
                "RelatedPerson",
            ]),
            "performer",
            "PERFORMED_BY",
        );

        put_value_choice(&mut out, body, "value");
        put_codeable_concepts(
            &mut out.node,
            body.get("dataAbsentReason"),
            "data_absent_reason",
        );
        put_codeable_concepts(&mut out.node, body.get("interpretation"), "interpretation");
        put_codeable_concepts(&mut out.node, body.get("bodySite"), "body_site");
        put_codeable_concepts(&mut out.node, body.get("method"), "method");

        put_references(
            &mut out,
            body.get("specimen"),
            Some(&["Specimen"]),
            "specimen",
            "USED",
        );
        put_references(
            &mut out,
            body.get("device"),
            Some(&["Device", "DeviceMetric"]),
            "device",
            "USED",
        );

        for (n, range) in elements(body.get("referenceRange")).into_iter().enumerate() {
            let base = numbered("reference_range", n);
            put_quantity(&mut out.node, &format!("{base}_low"), range.get("low"));
            put_quantity(&mut out.node, &format!("{base}_high"), range.get("high"));
            put_values(&mut out.node, &format!("{base}_text"), range.get("text"));
        }

        put_references(
            &mut out,
            body.get("hasMember"),
            Some(&["Observation", "QuestionnaireResponse", "MolecularSequence"]),
            "has_member",
            "HAS_MEMBER",
        );
        put_references(
            &mut out,
            body.get("derivedFrom"),
            Some(&[
                "DocumentReference",
                "ImagingStudy",
                "Media",
                "QuestionnaireResponse",
                "Observation",
                "MolecularSequence",
            ]),
            "derived_from",
            "DERIVED_FROM",
        );

        for (n, component) in elements(body.get("component")).into_iter().enumerate() {
            let base = numbered("component", n);
            put_codeable_concepts(
                &mut out.node,
                component.get("code"),
                &format!("{base}_code"),
            );
            let value_key = format!("{base}_value");
            let node = &mut out.node;
            put_quantity(node, &value_key, component.get("valueQuantity"));
            put_codeable_concepts(node, component.get("valueCodeableConcept"), &value_key);
            put_values(node, &value_key, component.get("valueString"));
            put_values(node, &value_key, component.get("valueBoolean"));
            put_values(node, &value_key, component.get("valueInteger"));
        }

        Ok(out)
    }
}
