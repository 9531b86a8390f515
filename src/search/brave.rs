//! Brave Search provider

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::KeyRotator;
use crate::core::{AgentError, AgentResult};

use super::{search_http_client, RawSearch, SearchBackend, SearchResult};

const BRAVE_API_URL: &str = "https://api.search.brave.com/res/v1/web/search";

#[derive(Debug, Deserialize)]
struct BraveResponse {
    #[serde(default)]
    web: BraveWebResults,
}

#[derive(Debug, Default, Deserialize)]
struct BraveWebResults {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Debug, Deserialize)]
struct BraveResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    description: String,
}

/// Brave Search client with key rotation
pub struct BraveProvider {
    http: reqwest::Client,
    keys: Arc<KeyRotator>,
}

impl BraveProvider {
    pub fn new(keys: Arc<KeyRotator>) -> AgentResult<Self> {
        Ok(Self {
            http: search_http_client()?,
            keys,
        })
    }
}

#[async_trait]
impl SearchBackend for BraveProvider {
    fn provider_name(&self) -> &'static str {
        "brave"
    }

    fn rotator(&self) -> &KeyRotator {
        &self.keys
    }

    async fn attempt(&self, query: &str, api_key: &str) -> AgentResult<RawSearch> {
        let response = self
            .http
            .get(BRAVE_API_URL)
            .query(&[("q", query), ("count", "5")])
            .header("Accept", "application/json")
            .header("X-Subscription-Token", api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::api(
                status.as_u16(),
                format!("Brave API error: status code {}", status.as_u16()),
            ));
        }

        let parsed: BraveResponse = response.json().await?;

        Ok(RawSearch {
            results: parsed
                .web
                .results
                .into_iter()
                .map(|r| SearchResult {
                    title: r.title,
                    url: r.url,
                    content: r.description,
                    score: 0.0,
                })
                .collect(),
            answer: None,
        })
    }
}
