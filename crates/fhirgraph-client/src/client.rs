use serde_json::Value;

use crate::error::ClientError;

/// Summary of the remote server taken from its capability statement.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub software: Option<String>,
    pub software_version: Option<String>,
    pub fhir_version: Option<String>,
    /// Base URL the server reports for itself; used to relativize paging
    /// links and to recognize same-server absolute references.
    pub implementation_url: Option<String>,
}

/// HTTP client for one FHIR server.
#[derive(Debug, Clone)]
pub struct FhirClient {
    http: reqwest::Client,
    base_url: String,
}

impl FhirClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches the server's CapabilityStatement from `{base}/metadata`.
    ///
    /// # Errors
    ///
    /// Fails when the server is unreachable or the response is not a
    /// CapabilityStatement — the orchestrator treats that as fatal before
    /// any transform starts.
    pub async fn capability(&self) -> Result<ServerInfo, ClientError> {
        let body = self.get_json("metadata").await?;
        if body.get("resourceType").and_then(Value::as_str) != Some("CapabilityStatement") {
            return Err(ClientError::Capability(
                "metadata endpoint did not return a CapabilityStatement".to_string(),
            ));
        }
        let software = body.pointer("/software/name").and_then(Value::as_str);
        let software_version = body.pointer("/software/version").and_then(Value::as_str);
        let fhir_version = body.get("fhirVersion").and_then(Value::as_str);
        let implementation_url = body.pointer("/implementation/url").and_then(Value::as_str);
        Ok(ServerInfo {
            software: software.map(str::to_string),
            software_version: software_version.map(str::to_string),
            fhir_version: fhir_version.map(str::to_string),
            implementation_url: implementation_url.map(str::to_string),
        })
    }

    /// Total number of resources of the given type on the server, via
    /// `?_summary=count`.
    pub async fn count(&self, resource_type: &str) -> Result<u64, ClientError> {
        let body = self
            .get_json(&format!("{resource_type}?_summary=count"))
            .await?;
        body.get("total")
            .and_then(Value::as_u64)
            .ok_or_else(|| ClientError::invalid_bundle("count bundle has no total"))
    }

    /// Performs a GET against the server. `path` may be a path relative to
    /// the base URL or a full URL (as found in bundle paging links).
    pub(crate) async fn get_json(&self, path: &str) -> Result<Value, ClientError> {
        let url = if path.contains("://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path)
        };
        let response = self
            .http
            .get(&url)
            .header("Accept", "application/fhir+json")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}
