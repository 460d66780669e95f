//! HTTP transport for chat completions.
//!
//! The [`ChatApi`] trait is the seam between the conversation
//! orchestrator and the network: production code talks to an
//! OpenAI-compatible endpoint through [`HttpChatApi`], tests substitute
//! a scripted stub.

use async_trait::async_trait;

use crate::api::{ApiError, ChatRequest, ChatResponse};
use crate::utils::url::construct_api_url;

#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Perform exactly one completion request and return the assistant
    /// reply text from the first choice.
    async fn complete(&self, api_key: &str, request: &ChatRequest) -> Result<String, ApiError>;
}

/// Client for any endpoint implementing `/v1/chat/completions`.
///
/// Cheap to clone: `reqwest::Client` is an `Arc` internally. The bearer
/// credential is supplied per call so a key saved mid-session takes
/// effect on the next send.
#[derive(Clone)]
pub struct HttpChatApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpChatApi {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn complete(&self, api_key: &str, request: &ChatRequest) -> Result<String, ApiError> {
        let url = construct_api_url(&self.base_url, "chat/completions");
        tracing::debug!(model = %request.model, messages = request.messages.len(), "sending chat request");

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = error_summary(&body);
            tracing::error!(%status, %detail, "chat request rejected");
            return Err(ApiError::Status { status, detail });
        }

        let parsed = response.json::<ChatResponse>().await?;
        extract_reply(parsed)
    }
}

/// Pull the assistant text out of a parsed response body.
fn extract_reply(response: ChatResponse) -> Result<String, ApiError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::MalformedResponse("response contained no choices".to_string()))?;
    choice
        .message
        .content
        .ok_or_else(|| ApiError::MalformedResponse("first choice had no content".to_string()))
}

/// Condense an error response body to a single log-friendly line.
///
/// Providers disagree on error envelopes; this checks the common
/// `error.message` shapes before falling back to the raw body.
fn error_summary(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        let summary = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .map(str::to_owned)
            .or_else(|| {
                value.get("error").and_then(|v| match v {
                    serde_json::Value::String(s) => Some(s.to_string()),
                    _ => None,
                })
            })
            .or_else(|| {
                value
                    .get("message")
                    .and_then(|v| v.as_str().map(str::to_owned))
            });
        if let Some(summary) = summary {
            return summary.split_whitespace().collect::<Vec<_>>().join(" ");
        }
    }

    trimmed.chars().take(200).collect()
}
