//! # fhirgraph-model
//!
//! Resource mappers: pure functions from one raw FHIR resource to exactly
//! one graph node plus its outgoing edge descriptors. A [`MapperRegistry`]
//! dispatches on the resource type tag, so new resource types plug in
//! without touching the engine.
//!
//! Mappers tolerate sparsely populated resources: absent optional fields
//! simply produce no property or edge. Identifier objects are always
//! preserved on the node — they are the join key the resolve pass uses.

mod common;
mod condition;
mod diagnostic_report;
mod encounter;
mod error;
mod observation;
mod organization;
mod patient;
mod procedure;

use std::collections::HashMap;

use fhirgraph_core::{EdgeDescriptor, GraphNode, RawResource, ReferenceTarget};

pub use condition::ConditionMapper;
pub use diagnostic_report::DiagnosticReportMapper;
pub use encounter::EncounterMapper;
pub use error::MappingError;
pub use observation::ObservationMapper;
pub use organization::OrganizationMapper;
pub use patient::PatientMapper;
pub use procedure::ProcedureMapper;

/// Output of one mapper invocation.
#[derive(Debug)]
pub struct MappedResource {
    pub node: GraphNode,
    pub edges: Vec<EdgeDescriptor>,
    /// Per-element problems that did not prevent mapping the rest of the
    /// resource (e.g. one malformed reference among several). Reported, not
    /// silently dropped; strict mode escalates them.
    pub issues: Vec<MappingError>,
}

impl MappedResource {
    pub fn new(node: GraphNode) -> Self {
        Self {
            node,
            edges: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn edge(&mut self, rel_type: &str, target: ReferenceTarget) {
        self.edges.push(EdgeDescriptor::new(
            self.node.key.clone(),
            rel_type,
            target,
        ));
    }
}

/// One resource type's mapping rules.
pub trait ResourceMapper: Send + Sync {
    /// The FHIR resource type this mapper accepts.
    fn resource_type(&self) -> &'static str;

    /// Every node label this mapper's output can touch: its own plus all
    /// resource types it can reference. The orchestrator declares
    /// uniqueness constraints for these before the first write.
    fn labels(&self) -> Vec<&'static str>;

    fn map(&self, raw: &RawResource) -> Result<MappedResource, MappingError>;
}

/// Registry dispatching resource type tags to mappers.
#[derive(Default)]
pub struct MapperRegistry {
    mappers: HashMap<&'static str, Box<dyn ResourceMapper>>,
}

impl MapperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in mappers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ConditionMapper));
        registry.register(Box::new(DiagnosticReportMapper));
        registry.register(Box::new(EncounterMapper));
        registry.register(Box::new(ObservationMapper));
        registry.register(Box::new(OrganizationMapper));
        registry.register(Box::new(PatientMapper));
        registry.register(Box::new(ProcedureMapper));
        registry
    }

    pub fn register(&mut self, mapper: Box<dyn ResourceMapper>) {
        self.mappers.insert(mapper.resource_type(), mapper);
    }

    pub fn get(&self, resource_type: &str) -> Option<&dyn ResourceMapper> {
        self.mappers.get(resource_type).map(|mapper| mapper.as_ref())
    }

    /// Maps a raw resource with the mapper registered for its type.
    pub fn map(&self, raw: &RawResource) -> Result<MappedResource, MappingError> {
        self.get(&raw.resource_type)
            .ok_or_else(|| MappingError::UnknownResourceType(raw.resource_type.clone()))?
            .map(raw)
    }

    /// Registered resource types, sorted.
    pub fn supported(&self) -> Vec<&'static str> {
        let mut types: Vec<&'static str> = self.mappers.keys().copied().collect();
        types.sort_unstable();
        types
    }
}
