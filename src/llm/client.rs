//! HTTP client for the chat-completions endpoint

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use crate::config::Config;
use crate::core::{AgentError, AgentResult};

use super::tools::ToolDefinition;
use super::types::{ApiErrorResponse, ChatMessage, ChatRequest, ChatResponse};

/// Overall request budget for a single model call
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Abstraction over the model transport.
///
/// The orchestrator only needs one blocking round-trip; tests drive the
/// loop with a scripted implementation.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send the full conversation plus tool schema and wait for a reply
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> AgentResult<ChatResponse>;
}

/// Chat-completions client for an OpenAI-compatible endpoint
pub struct ChatClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

impl ChatClient {
    /// Create a client from validated configuration
    pub fn new(config: &Config) -> AgentResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            url: config.chat_url(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    /// Current model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Switch the model used for subsequent requests
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    async fn post(&self, request: &ChatRequest) -> AgentResult<reqwest::Response> {
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("status code {}", status.as_u16()));
            return Err(AgentError::api(status.as_u16(), message));
        }

        Ok(response)
    }

    /// Stream a plain (no-tool) completion, forwarding content deltas to
    /// `on_chunk`. Returns the final frame carrying usage, when present.
    pub async fn complete_stream(
        &self,
        messages: &[ChatMessage],
        mut on_chunk: impl FnMut(&str),
    ) -> AgentResult<Option<ChatResponse>> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
            tools: None,
            stream: Some(true),
        };

        tracing::debug!("Streaming chat request with {} messages", messages.len());

        let response = self.post(&request).await?;
        let mut body = response.bytes_stream();

        let mut buffer = String::new();
        let mut final_frame: Option<ChatResponse> = None;

        'outer: while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            // SSE frames are newline-delimited `data:` lines
            while let Some(newline) = buffer.find('\n') {
                let line = buffer[..newline].trim().to_string();
                buffer.drain(..=newline);

                let Some(data) = line.strip_prefix("data: ") else {
                    continue;
                };
                if data == "[DONE]" {
                    break 'outer;
                }

                let frame: ChatResponse = match serde_json::from_str(data) {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::warn!("Failed to parse streaming chunk: {} ({})", e, data);
                        continue;
                    }
                };

                if let Some(content) = frame
                    .choices
                    .first()
                    .and_then(|c| c.delta.content.as_deref())
                {
                    if !content.is_empty() {
                        on_chunk(content);
                    }
                }

                if frame.usage.is_some_and(|u| u.total_tokens > 0) {
                    final_frame = Some(frame);
                }
            }
        }

        Ok(final_frame)
    }
}

#[async_trait]
impl ChatProvider for ChatClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> AgentResult<ChatResponse> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
            tools: (!tools.is_empty()).then(|| tools.to_vec()),
            stream: None,
        };

        tracing::debug!(
            "Chat request: model={} messages={} tools={}",
            self.model,
            messages.len(),
            tools.len()
        );

        let response = self.post(&request).await?;
        let parsed = response.json::<ChatResponse>().await?;

        tracing::debug!(
            "Chat response: id={} tool_calls={}",
            parsed.id,
            parsed.tool_calls().len()
        );

        Ok(parsed)
    }
}
