use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::Value;

use super::error::BackendError;
use super::provider::AudienceBackend;
use crate::domain::filters::{CatalogEntry, EstimateRequest, SavedFilter};

/// Members of an estimate response object that may carry the count
const ESTIMATE_FIELDS: &[&str] = &["estimatedAudience", "count", "total"];

#[derive(Debug)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(
        base_url: &str,
        token: Option<&str>,
        timeout_secs: u64,
    ) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                    .map_err(|e| BackendError::Config(format!("invalid token: {}", e)))?,
            );
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| BackendError::Config(format!("failed to build HTTP client: {}", e)))?;

        let base_url = base_url.trim_end_matches('/').to_string();
        tracing::debug!(base_url = %base_url, timeout_secs, "HTTP backend initialized");
        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn read_json(resp: reqwest::Response, what: &str) -> Result<Value, BackendError> {
        let status = resp.status();
        if !status.is_success() {
            return Err(BackendError::backend(
                "http",
                format!("{} returned {}", what, status),
            ));
        }
        let text = resp.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| BackendError::Decode(format!("{}: {}", what, e)))
    }
}

#[async_trait]
impl AudienceBackend for HttpBackend {
    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, BackendError> {
        let url = self.url("criteria-blocks");
        let resp = self.client.get(&url).send().await?;
        let mut body = Self::read_json(resp, &format!("GET {}", url)).await?;

        // { "data": [ ... ] }
        let data = body
            .get_mut("data")
            .map(Value::take)
            .ok_or_else(|| BackendError::Decode("catalog response has no data".into()))?;
        serde_json::from_value(data).map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn create_field(&self, entry: &CatalogEntry) -> Result<(), BackendError> {
        let url = self.url("criteria-blocks");
        let resp = self.client.post(&url).json(entry).send().await?;
        Self::read_json(resp, &format!("POST {}", url)).await?;
        Ok(())
    }

    async fn estimate(&self, request: &EstimateRequest) -> Result<u64, BackendError> {
        let url = self.url("filters/estimate");
        let resp = self.client.post(&url).json(request).send().await?;
        let body = Self::read_json(resp, &format!("POST {}", url)).await?;
        Ok(coerce_estimate(&body))
    }

    async fn create_filter(&self, filter: &SavedFilter) -> Result<String, BackendError> {
        let url = self.url("filters");
        let resp = self.client.post(&url).json(filter).send().await?;
        let body = Self::read_json(resp, &format!("POST {}", url)).await?;
        extract_id(&body).ok_or_else(|| BackendError::Decode("created filter has no id".into()))
    }

    async fn update_filter(&self, id: &str, filter: &SavedFilter) -> Result<(), BackendError> {
        let url = self.url(&format!("filters/{}", id));
        let resp = self.client.put(&url).json(filter).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(id.to_string()));
        }
        Self::read_json(resp, &format!("PUT {}", url)).await?;
        Ok(())
    }

    async fn get_filter(&self, id: &str) -> Result<SavedFilter, BackendError> {
        let url = self.url(&format!("filters/{}", id));
        let resp = self.client.get(&url).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(id.to_string()));
        }
        let mut body = Self::read_json(resp, &format!("GET {}", url)).await?;

        // Accept both a bare record and { "data": record }
        let record = if body.get("data").is_some_and(Value::is_object) {
            body["data"].take()
        } else {
            body
        };
        let mut filter: SavedFilter =
            serde_json::from_value(record).map_err(|e| BackendError::Decode(e.to_string()))?;
        filter.id.get_or_insert_with(|| id.to_string());
        Ok(filter)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Read an audience count from an estimate response
///
/// Accepts a bare number or an object with a numeric `estimatedAudience`,
/// `count` or `total` member. Anything else counts as zero.
pub fn coerce_estimate(body: &Value) -> u64 {
    let number = match body {
        Value::Number(_) => Some(body),
        Value::Object(map) => ESTIMATE_FIELDS
            .iter()
            .filter_map(|k| map.get(*k))
            .find(|v| v.is_number()),
        _ => None,
    };
    number
        .and_then(|n| n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)))
        .unwrap_or(0)
}

/// Filter id from a create response: `_id` or `id`, top-level or under `data`
fn extract_id(body: &Value) -> Option<String> {
    let lookup = |v: &Value| {
        ["_id", "id"].iter().find_map(|k| match v.get(*k) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    };
    lookup(body).or_else(|| body.get("data").and_then(lookup))
}
