//! `reqwest`-backed chat-completions transport.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{ChatCompletionRequest, ChatCompletionResponse, ChatTransport, Endpoint, ProviderError};
use crate::config::ConfigurationError;

/// Sends chat-completions requests over HTTPS.
///
/// One client is built per run and reused for every task.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

/// Error envelope shared by the OpenAI-compatible endpoints.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl HttpTransport {
    pub fn new() -> Result<Self, ConfigurationError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("newsfacet/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigurationError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.chars().take(500).collect())
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(
        &self,
        endpoint: &Endpoint,
        request: &ChatCompletionRequest,
        timeout: Duration,
    ) -> Result<ChatCompletionResponse, ProviderError> {
        // The credential is exposed only here, at the point of use
        let response = self
            .client
            .post(endpoint.completions_url())
            .header(endpoint.auth.name, endpoint.auth.expose())
            .header("content-type", "application/json")
            .timeout(timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(timeout)
                } else {
                    ProviderError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ProviderError::AuthError {
                status: status.as_u16(),
            });
        }

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(ProviderError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        response.json::<ChatCompletionResponse>().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(timeout)
            } else {
                ProviderError::ParseError(e.to_string())
            }
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_from_envelope() {
        let body = r#"{"error":{"message":"model not found","type":"invalid_request_error"}}"#;
        assert_eq!(error_message(body), "model not found");
    }

    #[test]
    fn test_error_message_raw_body() {
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_transport_builds() {
        let transport = HttpTransport::new().unwrap();
        assert_eq!(transport.name(), "http");
    }
}
