//! LLM provider abstractions for newsfacet-runtime.
//!
//! Every supported provider speaks the same chat-completions protocol with
//! function calling. Providers differ only in base endpoint and credential,
//! so this module splits the concern in two:
//!
//! - [`ProviderAdapter`] knows where to send a request and how to shape it
//! - [`ChatTransport`] performs the round-trip
//!
//! ## Security
//!
//! Credentials are held as [`ApiCredential`] and only exposed when the
//! `Authorization` header is written. See the [`secrets`] module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

#[cfg(feature = "http")]
mod http;
pub mod secrets;
mod variant;

#[cfg(feature = "http")]
pub use http::HttpTransport;
pub use secrets::{ApiCredential, AuthHeader, CredentialSource};
pub use variant::{ChatCompletionsAdapter, ProviderAdapter, ProviderVariant};

/// Errors from a single provider round-trip.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Malformed provider response: {0}")]
    ParseError(String),

    #[error("Authentication failed (HTTP {status})")]
    AuthError { status: u16 },

    #[error("Timeout after {0:?}")]
    Timeout(Duration),
}

impl ProviderError {
    /// Whether a bounded retry may help.
    ///
    /// Authentication, API, and parse errors repeat deterministically.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::HttpError(_)
                | ProviderError::RateLimited { .. }
                | ProviderError::Timeout(_)
        )
    }
}

/// Where to send requests for one provider.
#[derive(Debug)]
pub struct Endpoint {
    /// Base URL without trailing `/chat/completions`
    pub base_url: String,

    /// Authentication header for every request
    pub auth: AuthHeader,
}

impl Endpoint {
    /// Full chat-completions URL.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// A chat message for LLM completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "system", "user", or "assistant"
    pub role: String,

    /// Message content
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Function declaration offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: JsonValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    #[serde(rename = "type")]
    pub type_: String,
    pub function: FunctionDeclaration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionName {
    pub name: String,
}

/// Forces the model to call one named function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolChoice {
    #[serde(rename = "type")]
    pub type_: String,
    pub function: FunctionName,
}

impl ToolChoice {
    pub fn function(name: impl Into<String>) -> Self {
        Self {
            type_: "function".to_string(),
            function: FunctionName { name: name.into() },
        }
    }
}

/// Chat-completions request body shared by all providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_completion_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    pub tools: Vec<ToolDeclaration>,
    pub tool_choice: ToolChoice,

    /// Additional generation parameters, forwarded verbatim
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

/// Function invocation returned by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,

    /// JSON-encoded arguments, as a string
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub id: Option<String>,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: AssistantMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Token usage block as reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: Option<u32>,
}

/// Chat-completions response body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ChatCompletionResponse {
    /// Response carrying a single function call.
    pub fn with_tool_call(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            choices: vec![Choice {
                message: AssistantMessage {
                    content: None,
                    tool_calls: Some(vec![ToolCall {
                        id: Some("call_0".to_string()),
                        function: FunctionCall {
                            name: name.into(),
                            arguments: arguments.into(),
                        },
                    }]),
                },
                finish_reason: Some("tool_calls".to_string()),
            }],
            ..Default::default()
        }
    }

    /// Response carrying only free-form text.
    pub fn with_text(content: impl Into<String>) -> Self {
        Self {
            choices: vec![Choice {
                message: AssistantMessage {
                    content: Some(content.into()),
                    tool_calls: None,
                },
                finish_reason: Some("stop".to_string()),
            }],
            ..Default::default()
        }
    }

    /// Attach a usage block.
    pub fn with_usage(mut self, prompt_tokens: u32, completion_tokens: u32) -> Self {
        self.usage = Some(Usage {
            prompt_tokens,
            completion_tokens,
            total_tokens: Some(prompt_tokens + completion_tokens),
        });
        self
    }

    /// Usage in the outcome's terms.
    pub fn token_usage(&self) -> Option<newsfacet_core::TokenUsage> {
        self.usage.map(|u| newsfacet_core::TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u
                .total_tokens
                .unwrap_or(u.prompt_tokens + u.completion_tokens),
        })
    }
}

/// Performs one chat-completions round-trip.
///
/// This is the ONLY place where provider calls are made. Implementations
/// must not retry; retry policy belongs to the runner.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(
        &self,
        endpoint: &Endpoint,
        request: &ChatCompletionRequest,
        timeout: Duration,
    ) -> Result<ChatCompletionResponse, ProviderError>;

    /// Transport name for logs.
    fn name(&self) -> &str;
}
