use std::error::Error;
use std::fmt;

use serde::{Deserialize, Serialize};

pub mod chat;

pub use chat::{ChatApi, HttpChatApi};

#[derive(Serialize, Clone, Debug)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Outbound chat-completion payload.
///
/// One blocking request per user turn: no `stream` field, no tool
/// definitions. The sampling parameters ride along on every request.
#[derive(Serialize, Debug)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Deserialize)]
pub struct ChatResponseMessage {
    pub content: Option<String>,
}

#[derive(Deserialize)]
pub struct ChatResponseChoice {
    pub message: ChatResponseMessage,
}

#[derive(Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatResponseChoice>,
}

/// Failures talking to the chat-completion endpoint.
///
/// The interface treats every variant as the same generic request
/// failure; the distinctions exist for logging.
#[derive(Debug)]
pub enum ApiError {
    /// Connection, TLS, or timeout failure before a response arrived.
    Transport(reqwest::Error),
    /// The endpoint answered with a non-2xx status.
    Status {
        status: reqwest::StatusCode,
        detail: String,
    },
    /// A 2xx response that did not contain a usable reply.
    MalformedResponse(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Transport(err) => write!(f, "request failed: {err}"),
            ApiError::Status { status, detail } => {
                if detail.is_empty() {
                    write!(f, "API request failed with status {status}")
                } else {
                    write!(f, "API request failed with status {status}: {detail}")
                }
            }
            ApiError::MalformedResponse(detail) => {
                write!(f, "unexpected response from API: {detail}")
            }
        }
    }
}

impl Error for ApiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ApiError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_expected_fields() {
        let request = ChatRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![ChatMessage {
                role: "system".to_string(),
                content: "You are a helpful AI assistant.".to_string(),
            }],
            max_tokens: 1000,
            temperature: 0.7,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "gpt-4o-mini");
        assert_eq!(value["max_tokens"], 1000);
        assert_eq!(value["messages"][0]["role"], "system");
        assert!(value.get("stream").is_none());
    }

    #[test]
    fn response_parses_first_choice_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Hello"}}]}"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            response.choices[0].message.content.as_deref(),
            Some("Hello")
        );
    }
}
