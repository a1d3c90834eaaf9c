//! The run report.
//!
//! Every pipeline stage contributes counters to a [`RunReport`]. Workers
//! fill in their own partial report and the orchestrator merges them, so no
//! stage ever needs shared mutable state.

use std::fmt;

/// Aggregated counters and per-resource failure notes for one run.
#[derive(Debug, Default, Clone)]
pub struct RunReport {
    /// Resources received from the FHIR server.
    pub fetched: u64,
    /// Total resources the server reported for the requested types.
    pub total: u64,
    /// Resources successfully mapped to a node + edges.
    pub mapped: u64,
    /// Resources whose node and edges were committed to the store.
    pub written: u64,
    /// Resources that failed validation, mapping or writing.
    pub failed: u64,
    /// Edges written against a placeholder instead of a real node.
    pub deferred_references: u64,
    /// Placeholder nodes present in the store after the transform phase.
    pub placeholders: u64,
    /// Placeholders matched to a real node by the resolve pass.
    pub resolved: u64,
    /// Placeholders still unmatched after the resolve pass.
    pub unresolved: u64,
    /// Placeholders skipped because several real nodes carry the identifier.
    pub ambiguous: u64,
    /// Human-readable notes for per-resource failures, in arrival order.
    pub failures: Vec<String>,
    /// Non-fatal mapping issues (e.g. one malformed reference on a resource
    /// that was otherwise written). Collected in tolerant mode.
    pub issues: Vec<String>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a worker's partial report into this one.
    pub fn merge(&mut self, other: RunReport) {
        self.fetched += other.fetched;
        self.total += other.total;
        self.mapped += other.mapped;
        self.written += other.written;
        self.failed += other.failed;
        self.deferred_references += other.deferred_references;
        self.placeholders += other.placeholders;
        self.resolved += other.resolved;
        self.unresolved += other.unresolved;
        self.ambiguous += other.ambiguous;
        self.failures.extend(other.failures);
        self.issues.extend(other.issues);
    }

    pub fn record_failure(&mut self, note: impl Into<String>) {
        self.failed += 1;
        self.failures.push(note.into());
    }

    pub fn record_issue(&mut self, note: impl Into<String>) {
        self.issues.push(note.into());
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fetched {}/{} resources, mapped {}, written {}, failed {}, \
             placeholders {} (resolved {}, unresolved {}, ambiguous {})",
            self.fetched,
            self.total,
            self.mapped,
            self.written,
            self.failed,
            self.placeholders,
            self.resolved,
            self.unresolved,
            self.ambiguous
        )
    }
}
