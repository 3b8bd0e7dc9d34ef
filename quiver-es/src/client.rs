//! HTTP client for the Elasticsearch `_search` API

use crate::error::EsError;
use crate::render::render_search;
use crate::response::parse_search_response;
use crate::Result;
use async_trait::async_trait;
use quiver::config::EngineConfig;
use quiver::query::QueryPlan;
use quiver::{RawSearchResponse, SearchEngine};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Elasticsearch engine handle
#[derive(Debug, Clone)]
pub struct EsClient {
    client: Client,
    url: String,
    username: Option<String>,
    password: Option<String>,
    timeout: Duration,
}

impl EsClient {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let url = config.url.trim_end_matches('/').to_string();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(EsError::InvalidUrl(config.url.clone()));
        }
        let timeout = config.request_timeout();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EsError::InvalidUrl(format!("{}: {}", config.url, e)))?;

        Ok(Self {
            client,
            url,
            username: config.username.clone(),
            password: config.password.clone(),
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST a raw body to `/{index}/_search` and return the response JSON.
    pub async fn search_raw(&self, index: &str, body: &Value) -> Result<Value> {
        let mut request = self
            .client
            .post(format!("{}/{}/_search", self.url, index))
            .json(body);
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_deref());
        }

        let response = request.send().await.map_err(|e| self.transport_error(index, e))?;

        let status = response.status();
        if !status.is_success() {
            let body: Option<Value> = response.json().await.ok();
            let (error_type, reason) = body
                .as_ref()
                .and_then(|b| b.get("error"))
                .map(|e| {
                    (
                        e.get("type").and_then(Value::as_str).unwrap_or("unknown").to_string(),
                        e.get("reason").and_then(Value::as_str).unwrap_or("").to_string(),
                    )
                })
                .unwrap_or_else(|| ("unknown".to_string(), status.to_string()));
            return Err(EsError::Status {
                index: index.to_string(),
                status: status.as_u16(),
                error_type,
                reason,
                body,
            });
        }

        response.json().await.map_err(|e| self.transport_error(index, e))
    }

    fn transport_error(&self, index: &str, err: reqwest::Error) -> EsError {
        if err.is_timeout() {
            EsError::Timeout {
                index: index.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            EsError::Transport {
                index: index.to_string(),
                source: err,
            }
        }
    }
}

#[async_trait]
impl SearchEngine for EsClient {
    async fn execute(&self, plan: &QueryPlan) -> quiver::Result<RawSearchResponse> {
        let body = serde_json::to_value(render_search(plan))?;
        debug!(index = %plan.index, body = %body, "Sending search request");
        let response = self.search_raw(&plan.index, &body).await?;
        Ok(parse_search_response(plan, response)?)
    }
}
