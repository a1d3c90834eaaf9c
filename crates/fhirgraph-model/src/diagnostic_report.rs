//! Graph mapping for the FHIR `DiagnosticReport` resource.
//!
//! Field coverage follows the HL7 R4 profile: <https://hl7.org/fhir/diagnosticreport.html>

use fhirgraph_core::{GraphNode, NodeKey, RawResource};

use crate::common::{
    elements, numbered, put_codeable_concepts, put_identifiers, put_period, put_references,
    put_values,
};
use crate::{MappedResource, MappingError, ResourceMapper};

pub struct DiagnosticReportMapper;

impl ResourceMapper for DiagnosticReportMapper {
    fn resource_type(&self) -> &'static str {
        "DiagnosticReport"
    }

    fn labels(&self) -> Vec<&'static str> {
        vec![
            "DiagnosticReport",
            "CarePlan",
            "CareTeam",
            "Device",
            "Encounter",
            "Group",
            "ImagingStudy",
            "ImmunizationRecommendation",
            "Location",
            "Media",
            "Medication",
            "MedicationRequest",
            "NutritionOrder",
            "Observation",
            "Organization",
            "Patient",
            "Practitioner",
            "PractitionerRole",
            "Procedure",
            "ServiceRequest",
            "Specimen",
            "Substance",
        ]
    }

    fn map(&self, raw: &RawResource) -> Result<MappedResource, MappingError> {
        let body = &raw.body;
        let mut out = MappedResource::new(GraphNode::new(NodeKey::new(
            "DiagnosticReport",
            raw.id.clone(),
        )));

        put_identifiers(&mut out.node, body.get("identifier"));
        put_references(
            &mut out,
            body.get("basedOn"),
            Some(&[
                "CarePlan",
                "ImmunizationRecommendation",
                "MedicationRequest",
                "NutritionOrder",
                "ServiceRequest",
            ]),
            "based_on",
            "BASED_ON",
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
        put_values(&mut out.node, "issued", body.get("issued"));

        put_references(
            &mut out,
            body.get("performer"),
            Some(&["Practitioner", "PractitionerRole", "Organization", "CareTeam"]),
            "performer",
            "PERFORMED_BY",
        );
        put_references(
            &mut out,
            body.get("resultsInterpreter"),
            Some(&["Practitioner", "PractitionerRole", "Organization", "CareTeam"]),
            "results_interpreter",
            "INTERPRETED_BY",
        );
        put_references(
            &mut out,
            body.get("specimen"),
            Some(&["Specimen"]),
            "specimen",
            "BASED_ON",
        );
        put_references(
            &mut out,
            body.get("result"),
            Some(&["Observation"]),
            "result",
            "HAS_RESULT",
        );
        put_references(
            &mut out,
            body.get("imagingStudy"),
            Some(&["ImagingStudy"]),
            "imaging_study",
            "HAS_IMAGING_STUDY",
        );

        for (n, media) in elements(body.get("media")).into_iter().enumerate() {
            let base = numbered("media", n);
            put_values(&mut out.node, &format!("{base}_comment"), media.get("comment"));
            put_references(
                &mut out,
                media.get("link"),
                Some(&["Media"]),
                &base,
                "HAS_MEDIA_LINK",
            );
        }

        put_values(&mut out.node, "conclusion", body.get("conclusion"));
        put_codeable_concepts(&mut out.node, body.get("conclusionCode"), "conclusion_code");

        Ok(out)
    }
}
