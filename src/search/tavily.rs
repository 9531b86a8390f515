//! Tavily search provider

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::KeyRotator;
use crate::core::{AgentError, AgentResult};

use super::{search_http_client, RawSearch, SearchBackend, SearchResult};

const TAVILY_API_URL: &str = "https://api.tavily.com/search";

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
    #[serde(default)]
    answer: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    score: f64,
}

#[derive(Debug, Deserialize)]
struct TavilyError {
    #[serde(default)]
    detail: String,
}

/// Tavily search client with key rotation
pub struct TavilyProvider {
    http: reqwest::Client,
    keys: Arc<KeyRotator>,
}

impl TavilyProvider {
    pub fn new(keys: Arc<KeyRotator>) -> AgentResult<Self> {
        Ok(Self {
            http: search_http_client()?,
            keys,
        })
    }
}

#[async_trait]
impl SearchBackend for TavilyProvider {
    fn provider_name(&self) -> &'static str {
        "tavily"
    }

    fn rotator(&self) -> &KeyRotator {
        &self.keys
    }

    async fn attempt(&self, query: &str, api_key: &str) -> AgentResult<RawSearch> {
        let request = TavilyRequest {
            api_key,
            query,
            search_depth: "basic",
            max_results: 5,
        };

        let response = self.http.post(TAVILY_API_URL).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<TavilyError>(&body)
                .ok()
                .filter(|e| !e.detail.is_empty())
                .map(|e| e.detail)
                .unwrap_or_else(|| format!("status code {}", status.as_u16()));
            return Err(AgentError::api(
                status.as_u16(),
                format!("Tavily API error: {}", message),
            ));
        }

        let parsed: TavilyResponse = response.json().await?;

        Ok(RawSearch {
            results: parsed
                .results
                .into_iter()
                .map(|r| SearchResult {
                    title: r.title,
                    url: r.url,
                    content: r.content,
                    score: r.score,
                })
                .collect(),
            answer: parsed.answer.filter(|a| !a.is_empty()),
        })
    }
}
