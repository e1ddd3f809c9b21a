//! The closed set of supported providers.
//!
//! Adding a provider means adding a variant here and extending
//! [`ProviderVariant::from_name`]; nothing is registered at runtime.

use serde::{Deserialize, Serialize};
use std::fmt;

use newsfacet_core::Task;

use super::{AuthHeader, ChatCompletionRequest, Endpoint};
use crate::config::{ConfigurationError, ProviderProfile};
use crate::prompts::Prompts;
use crate::protocol;

/// A provider reachable through the shared chat-completions protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderVariant {
    /// OpenAI (default endpoint)
    OpenAi,

    /// Anthropic via its OpenAI-compatible endpoint
    Anthropic,

    /// Google Gemini via its OpenAI-compatible endpoint
    Gemini,
}

impl ProviderVariant {
    pub const ALL: [ProviderVariant; 3] = [
        ProviderVariant::OpenAi,
        ProviderVariant::Anthropic,
        ProviderVariant::Gemini,
    ];

    /// Map a configured provider name to a variant.
    ///
    /// Case-insensitive; surrounding whitespace is ignored.
    pub fn from_name(name: &str) -> Result<Self, ConfigurationError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderVariant::OpenAi),
            "anthropic" | "claude" => Ok(ProviderVariant::Anthropic),
            "gemini" | "google" | "googleai" | "google-genai" => Ok(ProviderVariant::Gemini),
            _ => Err(ConfigurationError::UnknownProvider(name.to_string())),
        }
    }

    /// Canonical provider name.
    pub fn name(&self) -> &'static str {
        match self {
            ProviderVariant::OpenAi => "openai",
            ProviderVariant::Anthropic => "anthropic",
            ProviderVariant::Gemini => "gemini",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderVariant::OpenAi => "https://api.openai.com/v1",
            ProviderVariant::Anthropic => "https://api.anthropic.com/v1",
            ProviderVariant::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
        }
    }

    /// Environment variable holding the API key.
    pub fn credential_env(&self) -> &'static str {
        match self {
            ProviderVariant::OpenAi => "OPENAI_API_KEY",
            ProviderVariant::Anthropic => "ANTHROPIC_API_KEY",
            ProviderVariant::Gemini => "GEMINI_API_KEY",
        }
    }

    /// Human-readable credential name for errors and logs.
    pub fn credential_name(&self) -> &'static str {
        match self {
            ProviderVariant::OpenAi => "OpenAI API key",
            ProviderVariant::Anthropic => "Anthropic API key",
            ProviderVariant::Gemini => "Gemini API key",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderVariant::OpenAi => "gpt-5-mini-2025-08-07",
            ProviderVariant::Anthropic => "claude-3-5-haiku-latest",
            ProviderVariant::Gemini => "gemini-2.5-flash",
        }
    }
}

impl fmt::Display for ProviderVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Addressing and request shaping for one provider.
pub trait ProviderAdapter: Send + Sync {
    fn variant(&self) -> ProviderVariant;

    /// Base URL and authentication header.
    fn describe_endpoint(&self) -> Endpoint;

    /// Vendor request for one task.
    fn format_request(
        &self,
        task: &Task,
        profile: &ProviderProfile,
        prompts: &Prompts,
    ) -> ChatCompletionRequest;
}

/// Adapter for providers speaking the chat-completions protocol.
///
/// All three variants use this implementation; they differ only in the
/// endpoint and credential carried by the profile.
#[derive(Debug)]
pub struct ChatCompletionsAdapter {
    variant: ProviderVariant,
    base_url: String,
    auth: AuthHeader,
}

impl ChatCompletionsAdapter {
    /// Select the adapter for a resolved profile.
    pub fn for_profile(profile: &ProviderProfile) -> Self {
        Self {
            variant: profile.variant,
            base_url: profile.base_endpoint.clone(),
            auth: AuthHeader::bearer(&profile.credential),
        }
    }
}

impl ProviderAdapter for ChatCompletionsAdapter {
    fn variant(&self) -> ProviderVariant {
        self.variant
    }

    fn describe_endpoint(&self) -> Endpoint {
        Endpoint {
            base_url: self.base_url.clone(),
            auth: self.auth.clone(),
        }
    }

    fn format_request(
        &self,
        task: &Task,
        profile: &ProviderProfile,
        prompts: &Prompts,
    ) -> ChatCompletionRequest {
        protocol::build_request(task, profile, prompts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_aliases() {
        assert_eq!(ProviderVariant::from_name("openai").unwrap(), ProviderVariant::OpenAi);
        assert_eq!(ProviderVariant::from_name(" Claude ").unwrap(), ProviderVariant::Anthropic);
        assert_eq!(ProviderVariant::from_name("ANTHROPIC").unwrap(), ProviderVariant::Anthropic);
        for alias in ["gemini", "google", "googleai", "google-genai"] {
            assert_eq!(ProviderVariant::from_name(alias).unwrap(), ProviderVariant::Gemini);
        }
    }

    #[test]
    fn test_unknown_provider() {
        let err = ProviderVariant::from_name("D").unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownProvider(ref n) if n == "D"));
        assert!(err.to_string().contains("openai"));
    }

    #[test]
    fn test_variants_have_distinct_endpoints_and_credentials() {
        let urls: std::collections::HashSet<_> =
            ProviderVariant::ALL.iter().map(|v| v.default_base_url()).collect();
        let envs: std::collections::HashSet<_> =
            ProviderVariant::ALL.iter().map(|v| v.credential_env()).collect();
        assert_eq!(urls.len(), 3);
        assert_eq!(envs.len(), 3);
    }

    #[test]
    fn test_name_round_trips() {
        for variant in ProviderVariant::ALL {
            assert_eq!(ProviderVariant::from_name(variant.name()).unwrap(), variant);
        }
    }
}
