//! Run sequencing: optional delete → transforms (sequential or parallel) →
//! optional resolve pass.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{info, warn};

use fhirgraph_client::FhirClient;
use fhirgraph_core::RunReport;
use fhirgraph_graph::GraphStore;
use fhirgraph_model::MapperRegistry;

use crate::config::RunConfig;
use crate::error::EngineError;
use crate::resolver::resolve_references;
use crate::transform::transform_type;

/// Executes one run. `client` may be `None` when only `--delete` and/or
/// `--resolve` were requested.
///
/// A failing transform unit never aborts the other units: its error is
/// recorded in the report and the run continues — except in strict mode,
/// where the first validation or mapping failure ends the run.
pub async fn run(
    client: Option<FhirClient>,
    store: Arc<dyn GraphStore>,
    registry: Arc<MapperRegistry>,
    config: &RunConfig,
) -> Result<RunReport, EngineError> {
    let mut report = RunReport::new();

    if config.delete_first {
        let summary = store.delete_all().await?;
        info!(
            nodes = summary.nodes,
            relationships = summary.relationships,
            constraints = summary.constraints,
            "database content deleted"
        );
    }

    if !config.resource_types.is_empty() {
        let client = client.ok_or(EngineError::MissingServer)?;

        if config.parallel {
            let mut units = JoinSet::new();
            for resource_type in &config.resource_types {
                units.spawn(transform_type(
                    client.clone(),
                    store.clone(),
                    registry.clone(),
                    resource_type.clone(),
                    config.clone(),
                ));
            }
            while let Some(joined) = units.join_next().await {
                match joined {
                    Ok(Ok(partial)) => report.merge(partial),
                    Ok(Err(e @ EngineError::Strict { .. })) => {
                        units.abort_all();
                        return Err(e);
                    }
                    Ok(Err(e)) => {
                        warn!("transform unit failed: {e}");
                        report.record_failure(e.to_string());
                    }
                    Err(join_error) => {
                        warn!("transform unit panicked: {join_error}");
                        report.record_failure(format!("transform unit panicked: {join_error}"));
                    }
                }
            }
        } else {
            for resource_type in &config.resource_types {
                let result = transform_type(
                    client.clone(),
                    store.clone(),
                    registry.clone(),
                    resource_type.clone(),
                    config.clone(),
                )
                .await;
                match result {
                    Ok(partial) => report.merge(partial),
                    Err(e @ EngineError::Strict { .. }) => return Err(e),
                    Err(e) => {
                        warn!(%resource_type, "transform unit failed: {e}");
                        report.record_failure(format!("{resource_type}: {e}"));
                    }
                }
            }
        }
    }

    report.placeholders = store.list_placeholders().await?.len() as u64;

    if config.resolve {
        let outcome = resolve_references(store.as_ref()).await?;
        report.resolved = outcome.resolved;
        report.unresolved = outcome.unresolved;
        report.ambiguous = outcome.ambiguous;
    }

    Ok(report)
}
