//! Page-by-page resource fetching.
//!
//! FHIR servers return search results as a series of `searchset` bundles
//! linked by `link[relation=next]`. [`ResourcePages`] walks those links one
//! server round-trip at a time, restartable per resource type.

use serde_json::Value;
use tracing::{debug, warn};

use fhirgraph_core::RawResource;

use crate::client::FhirClient;
use crate::error::ClientError;

/// Knobs for one resource type's fetch.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// `_count` value asked of the server per page.
    pub page_size: u32,
    /// Stop after this many resources, across pages.
    pub limit: Option<u64>,
    /// When true, malformed bundle entries are reported as validation
    /// failures; when false they are silently skipped.
    pub validate: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            page_size: 250,
            limit: None,
            validate: true,
        }
    }
}

/// One fetched page.
#[derive(Debug, Default)]
pub struct Page {
    pub resources: Vec<RawResource>,
    /// Validation failure notes for entries that could not be accepted.
    pub invalid: Vec<String>,
}

/// Lazy pager over all resources of one type.
pub struct ResourcePages<'a> {
    client: &'a FhirClient,
    resource_type: String,
    options: FetchOptions,
    /// Next path to request; `None` once the last page has been consumed.
    next: Option<String>,
    received: u64,
    /// Server-reported base URL, used to relativize `next` links. Some
    /// servers advertise links under a hostname that is not reachable from
    /// the client, so only the path past the base is kept.
    server_base: Option<String>,
}

impl FhirClient {
    /// Starts paging through all resources of `resource_type`.
    pub fn pages<'a>(
        &'a self,
        resource_type: &str,
        options: FetchOptions,
        server_base: Option<String>,
    ) -> ResourcePages<'a> {
        let first = format!("{resource_type}?_count={}", options.page_size);
        ResourcePages {
            client: self,
            resource_type: resource_type.to_string(),
            options,
            next: Some(first),
            received: 0,
            server_base,
        }
    }
}

impl ResourcePages<'_> {
    /// Fetches the next page, or `None` when the sequence is exhausted
    /// (no further `next` link, or the fetch limit has been reached).
    pub async fn next_page(&mut self) -> Result<Option<Page>, ClientError> {
        let Some(path) = self.next.take() else {
            return Ok(None);
        };

        let bundle = self.client.get_json(&path).await?;
        if bundle.get("resourceType").and_then(Value::as_str) != Some("Bundle") {
            return Err(ClientError::invalid_bundle(format!(
                "expected Bundle while paging {}",
                self.resource_type
            )));
        }

        let mut page = Page::default();
        if let Some(entries) = bundle.get("entry").and_then(Value::as_array) {
            for entry in entries {
                if self
                    .options
                    .limit
                    .is_some_and(|limit| self.received >= limit)
                {
                    debug!(
                        resource_type = %self.resource_type,
                        limit = self.options.limit,
                        "fetch limit reached"
                    );
                    self.next = None;
                    return Ok(Some(page));
                }
                let Some(resource) = entry.get("resource") else {
                    continue;
                };
                // Search bundles may interleave OperationOutcome entries;
                // only the requested kind counts.
                let entry_type = resource.get("resourceType").and_then(Value::as_str);
                if entry_type != Some(self.resource_type.as_str()) {
                    continue;
                }
                match RawResource::from_value(resource.clone()) {
                    Ok(raw) => {
                        self.received += 1;
                        page.resources.push(raw);
                    }
                    Err(reason) => {
                        if self.options.validate {
                            page.invalid.push(reason);
                        } else {
                            warn!(resource_type = %self.resource_type, %reason, "skipping entry");
                        }
                    }
                }
            }
        }

        self.next = next_link(&bundle, self.server_base.as_deref());
        Ok(Some(page))
    }

    /// Resources accepted so far across all pages.
    pub fn received(&self) -> u64 {
        self.received
    }
}

fn next_link(bundle: &Value, server_base: Option<&str>) -> Option<String> {
    let links = bundle.get("link")?.as_array()?;
    let url = links.iter().find_map(|link| {
        (link.get("relation").and_then(Value::as_str) == Some("next"))
            .then(|| link.get("url").and_then(Value::as_str))
            .flatten()
    })?;
    // Strip the advertised base so the request goes to the configured one.
    let relative = match server_base {
        Some(base) => url
            .split(base)
            .last()
            .unwrap_or(url)
            .trim_start_matches('/'),
        None => url,
    };
    Some(relative.to_string())
}
