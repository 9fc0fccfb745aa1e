//! SIOP provider: the federal planning and budget system's public SPARQL endpoint.
//!
//! Each provider call becomes one aggregate SPARQL SELECT, POSTed as a form
//! and answered in the SPARQL JSON results format.

use async_trait::async_trait;
use pacmon_core::error::ProviderError;
use pacmon_core::provider::{ExpenditureProvider, ExpenditureQuery};
use pacmon_core::ExpenditureRecord;
use std::time::Duration;
use tracing::{debug, warn};

use crate::sparql::{self, SparqlResults, SPARQL_RESULTS_JSON};

/// Default public endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://www1.siop.planejamento.gov.br/sparql/";

/// A provider backed by a SIOP-style SPARQL endpoint.
pub struct SiopProvider {
    name: String,
    endpoint: String,
    client: reqwest::Client,
}

impl SiopProvider {
    /// Create a provider for `endpoint`.
    ///
    /// `accept_invalid_certs` relaxes TLS verification for every request this
    /// provider makes; the public endpoint has served broken chains before.
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Duration,
        accept_invalid_certs: bool,
    ) -> Result<Self, ProviderError> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(ProviderError::NotConfigured("endpoint is empty".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        if accept_invalid_certs {
            debug!(endpoint = %endpoint, "TLS certificate verification disabled");
        }

        Ok(Self {
            name: "siop".into(),
            endpoint,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST one SPARQL query and decode the JSON results.
    async fn execute(&self, sparql: &str) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Accept", SPARQL_RESULTS_JSON)
            .form(&[("query", sparql)])
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %error_body, "SPARQL endpoint returned error");
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message: error_body,
            });
        }

        Ok(response)
    }
}

fn map_transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

#[async_trait]
impl ExpenditureProvider for SiopProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(
        &self,
        query: &ExpenditureQuery,
    ) -> std::result::Result<Vec<ExpenditureRecord>, ProviderError> {
        let sparql = sparql::build_query(query);

        debug!(
            provider = %self.name,
            year = %query.year,
            program = %query.program,
            detail = %query.detail,
            "Sending SPARQL query"
        );

        let response = self.execute(&sparql).await?;
        let body = response.text().await.map_err(map_transport_error)?;
        let results: SparqlResults = serde_json::from_str(&body)
            .map_err(|e| ProviderError::MalformedResponse(format!("Failed to parse results: {e}")))?;

        let records = sparql::parse_records(results, query)?;
        debug!(program = %query.program, rows = records.len(), "SPARQL query answered");
        Ok(records)
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let response = self.execute("ASK { ?s ?p ?o }").await?;
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
        Ok(body.get("boolean").and_then(|b| b.as_bool()).unwrap_or(false))
    }
}
