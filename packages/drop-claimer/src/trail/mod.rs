//! Herd Trail API client.
//!
//! Four request/response operations against one pinned trail version. No
//! caching and no retries: evaluation may be stateful server-side, so a failed
//! call is reported once and left to the caller.

mod types;

pub use types::*;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::Ordering;
use tracing::{debug, warn};

use crate::config::Config;
use crate::metrics::METRICS;

const APP_ID_HEADER: &str = "Herd-Trail-App-Id";

/// Typed client for one trail/version pair.
pub struct TrailClient {
    http: reqwest::Client,
    base: String,
}

impl TrailClient {
    pub fn new(config: &Config) -> Result<Self, crate::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            APP_ID_HEADER,
            HeaderValue::from_str(&config.trail_app_id)
                .map_err(|e| crate::Error::Config(format!("invalid trail app id: {e}")))?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| crate::Error::Config(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            http,
            base: format!(
                "{}/trails/{}/versions/{}",
                config.trail_api_base.trim_end_matches('/'),
                config.trail_id,
                config.version_id
            ),
        })
    }

    /// Versioned base URL all operations hang off.
    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// Evaluate `step` into calldata for `request.wallet_address`.
    pub async fn evaluate_step(
        &self,
        step: u32,
        request: &EvaluationRequest,
    ) -> Result<EvaluationResult, crate::Error> {
        let url = format!("{}/steps/{step}/evaluations", self.base);
        debug!(step, wallet = %request.wallet_address, "Evaluating trail step");
        let result: EvaluationResult = self.post(&url, request, crate::Error::Evaluation).await?;
        debug!(step, contract = %result.contract_address, payable = %result.payable_amount, "Step evaluated");
        Ok(result)
    }

    /// Attach a broadcast transaction hash to the execution ledger.
    pub async fn submit_execution(&self, record: &ExecutionRecord) -> Result<Value, crate::Error> {
        let url = format!("{}/executions", self.base);
        debug!(node_id = %record.node_id, tx_hash = %record.transaction_hash, "Submitting execution");
        self.post(&url, record, crate::Error::ExecutionSubmit).await
    }

    /// Read a node's outputs. `execution_id` pins a manual run, otherwise latest.
    pub async fn read_node(
        &self,
        node_id: &str,
        wallet_address: &str,
        user_inputs: UserInputs,
        execution_id: Option<&str>,
    ) -> Result<ReadNodeResponse, crate::Error> {
        let url = format!("{}/nodes/{node_id}/read", self.base);
        let request = ReadNodeRequest {
            wallet_address: wallet_address.to_string(),
            user_inputs,
            execution: match execution_id {
                Some(id) => ExecutionSelector::Manual {
                    execution_id: id.to_string(),
                },
                None => ExecutionSelector::Latest,
            },
        };
        debug!(node_id, wallet = wallet_address, "Reading node");
        self.post(&url, &request, crate::Error::Read).await
    }

    /// Aggregate execution history. An empty list requests the global feed.
    pub async fn query_execution_history(
        &self,
        wallet_addresses: &[String],
    ) -> Result<ExecutionHistory, crate::Error> {
        let url = format!("{}/executions/query", self.base);
        let query = HistoryQuery {
            wallet_addresses: wallet_addresses.to_vec(),
        };
        self.post(&url, &query, crate::Error::History).await
    }

    async fn post<B, T>(
        &self,
        url: &str,
        body: &B,
        err: fn(String) -> crate::Error,
    ) -> Result<T, crate::Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.http.post(url).json(body).send().await.map_err(|e| {
            METRICS.trail_errors.fetch_add(1, Ordering::Relaxed);
            warn!(url, error = %e, "Trail API request failed");
            err(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            METRICS.trail_errors.fetch_add(1, Ordering::Relaxed);
            let body_text = response.text().await.unwrap_or_default();
            warn!(url, status = %status, body = %body_text, "Trail API returned error");
            let detail = if body_text.is_empty() {
                format!("HTTP {status}")
            } else {
                body_text
            };
            return Err(err(detail));
        }

        response.json().await.map_err(|e| {
            METRICS.trail_errors.fetch_add(1, Ordering::Relaxed);
            err(format!("invalid response body: {e}"))
        })
    }
}
