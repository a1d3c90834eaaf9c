//! One resource type's transform unit: fetch pages → map → write.

use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream;
use tracing::{info, warn};

use fhirgraph_client::FhirClient;
use fhirgraph_core::RunReport;
use fhirgraph_graph::GraphStore;
use fhirgraph_model::{MappedResource, MapperRegistry};

use crate::config::RunConfig;
use crate::error::EngineError;
use crate::writer::write_resource;

/// Transforms all resources of one type. Returns the unit's partial run
/// report; the orchestrator merges it into the run total.
pub(crate) async fn transform_type(
    client: FhirClient,
    store: Arc<dyn GraphStore>,
    registry: Arc<MapperRegistry>,
    resource_type: String,
    config: RunConfig,
) -> Result<RunReport, EngineError> {
    let mut report = RunReport::new();

    let mapper = registry
        .get(&resource_type)
        .ok_or_else(|| EngineError::UnknownResourceType(resource_type.clone()))?;

    let labels: Vec<String> = mapper.labels().iter().map(|l| l.to_string()).collect();
    store.ensure_constraints(&labels).await?;

    let total = client.count(&resource_type).await?;
    report.total = total;
    if total == 0 {
        warn!(%resource_type, "no resources of this type on the server");
        return Ok(report);
    }
    info!(%resource_type, total, "fetching resources");

    let mut pages = client.pages(
        &resource_type,
        config.fetch_options(),
        config.server_base.clone(),
    );

    while let Some(page) = pages.next_page().await? {
        report.fetched += page.resources.len() as u64;

        for reason in &page.invalid {
            if config.strict {
                return Err(EngineError::Strict {
                    resource_type,
                    message: reason.clone(),
                });
            }
            report.record_failure(format!("{resource_type}: {reason}"));
        }

        let mut mapped_page: Vec<MappedResource> = Vec::with_capacity(page.resources.len());
        for raw in &page.resources {
            match registry.map(raw) {
                Ok(mapped) => {
                    for issue in &mapped.issues {
                        if config.strict {
                            return Err(EngineError::Strict {
                                resource_type,
                                message: format!("{}/{}: {issue}", raw.resource_type, raw.id),
                            });
                        }
                        report.record_issue(format!("{}/{}: {issue}", raw.resource_type, raw.id));
                    }
                    report.mapped += 1;
                    mapped_page.push(mapped);
                }
                Err(e) => {
                    if config.strict {
                        return Err(EngineError::Strict {
                            resource_type,
                            message: format!("{}/{}: {e}", raw.resource_type, raw.id),
                        });
                    }
                    report.record_failure(format!("{}/{}: {e}", raw.resource_type, raw.id));
                }
            }
        }

        // Write errors are fatal for the resource, never for the unit: the
        // store has already retried transient failures.
        if config.parallel {
            let mut write_futures = Vec::with_capacity(mapped_page.len());
            for mapped in &mapped_page {
                let store = store.clone();
                write_futures.push(async move {
                    let key = mapped.node.key.clone();
                    (key, write_resource(store.as_ref(), mapped).await)
                });
            }
            let results: Vec<_> = stream::iter(write_futures)
                .buffer_unordered(config.write_concurrency.max(1))
                .collect()
                .await;
            for (key, result) in results {
                match result {
                    Ok(summary) => {
                        report.written += 1;
                        report.deferred_references += summary.deferred;
                    }
                    Err(e) => report.record_failure(format!("{key}: write failed: {e}")),
                }
            }
        } else {
            for mapped in &mapped_page {
                match write_resource(store.as_ref(), mapped).await {
                    Ok(summary) => {
                        report.written += 1;
                        report.deferred_references += summary.deferred;
                    }
                    Err(e) => {
                        report.record_failure(format!("{}: write failed: {e}", mapped.node.key))
                    }
                }
            }
        }
    }

    info!(
        %resource_type,
        fetched = report.fetched,
        written = report.written,
        "transform finished"
    );
    Ok(report)
}
