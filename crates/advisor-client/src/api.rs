use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use advisor_common::api::{PriceRange, SearchFilters};

use crate::error::ClientError;

/// A suggestion as the client sees it. The server may omit the optional fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSuggestion {
    pub name: String,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<PriceRange>,
}

/// Request body sent by the client. `language` may be absent; the server rejects it then.
#[derive(Debug, Clone, Serialize)]
pub struct ClientSearchRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub filters: SearchFilters,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSearchResponse {
    pub suggestions: Vec<ProductSuggestion>,
    #[serde(default)]
    pub total_results: Option<usize>,
    #[serde(default)]
    pub search_time: Option<u64>,
}

/// The search endpoint as seen from the client.
#[async_trait]
pub trait SearchApi: Send + Sync {
    async fn search(
        &self,
        request: &ClientSearchRequest,
    ) -> Result<ClientSearchResponse, ClientError>;
}

/// `POST {base_url}/api/search` over HTTP.
#[derive(Clone)]
pub struct HttpSearchApi {
    url: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl HttpSearchApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent("advisor-client")
            .build()?;
        Ok(Self {
            url: format!("{}/api/search", base_url.trim_end_matches('/')),
            timeout,
            http,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    status_message: Option<String>,
}

#[async_trait]
impl SearchApi for HttpSearchApi {
    async fn search(
        &self,
        request: &ClientSearchRequest,
    ) -> Result<ClientSearchResponse, ClientError> {
        let resp = self
            .http
            .post(&self.url)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&bytes)
                .ok()
                .and_then(|b| b.status_message)
                .unwrap_or_else(|| String::from_utf8_lossy(&bytes).to_string());
            return Err(ClientError::Status { status, message });
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}
