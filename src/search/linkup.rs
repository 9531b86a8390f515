//! Linkup search provider

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::KeyRotator;
use crate::core::{AgentError, AgentResult};

use super::{search_http_client, RawSearch, SearchBackend, SearchResult};

const LINKUP_API_URL: &str = "https://api.linkup.so/v1/search";

#[derive(Debug, Serialize)]
struct LinkupRequest<'a> {
    q: &'a str,
    depth: &'a str,
    #[serde(rename = "outputType")]
    output_type: &'a str,
    #[serde(rename = "maxResults")]
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct LinkupResponse {
    #[serde(default)]
    results: Vec<LinkupResult>,
}

#[derive(Debug, Deserialize)]
struct LinkupResult {
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct LinkupError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    error: String,
}

/// Linkup search client with key rotation
pub struct LinkupProvider {
    http: reqwest::Client,
    keys: Arc<KeyRotator>,
}

impl LinkupProvider {
    pub fn new(keys: Arc<KeyRotator>) -> AgentResult<Self> {
        Ok(Self {
            http: search_http_client()?,
            keys,
        })
    }
}

#[async_trait]
impl SearchBackend for LinkupProvider {
    fn provider_name(&self) -> &'static str {
        "linkup"
    }

    fn rotator(&self) -> &KeyRotator {
        &self.keys
    }

    async fn attempt(&self, query: &str, api_key: &str) -> AgentResult<RawSearch> {
        let request = LinkupRequest {
            q: query,
            depth: "standard",
            output_type: "searchResults",
            max_results: 5,
        };

        let response = self
            .http
            .post(LINKUP_API_URL)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<LinkupError>(&body)
                .ok()
                .map(|e| if e.message.is_empty() { e.error } else { e.message })
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("status code {}", status.as_u16()));
            return Err(AgentError::api(
                status.as_u16(),
                format!("Linkup API error: {}", message),
            ));
        }

        let parsed: LinkupResponse = response.json().await?;

        Ok(RawSearch {
            results: parsed
                .results
                .into_iter()
                .map(|r| SearchResult {
                    title: r.name,
                    url: r.url,
                    content: r.content,
                    score: 0.0,
                })
                .collect(),
            answer: None,
        })
    }
}
