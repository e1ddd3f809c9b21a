//! Provider configuration, resolved once at startup.
//!
//! [`LlmSettings`] is the raw `llm:` section of the configuration file.
//! [`ProviderProfile::resolve`] turns it into the immutable profile the
//! runner uses for the whole run: provider selected, credential read, base
//! URL checked. Every error here is fatal and surfaces before any task is
//! sent.

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::providers::{ApiCredential, ProviderVariant};

/// Errors that abort a run before processing starts.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Unknown provider '{0}'. Supported: openai, anthropic, gemini")]
    UnknownProvider(String),

    #[error("Missing credential for provider '{provider}': set {env_var} or llm.api_key")]
    MissingCredential {
        provider: String,
        env_var: &'static str,
    },

    #[error("Invalid base_url '{0}': must start with http:// or https://")]
    InvalidBaseUrl(String),

    #[error("Failed to read prompt file {path}: {source}")]
    PromptFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP client setup failed: {0}")]
    Transport(String),
}

/// The `llm:` configuration section.
#[derive(Debug, Deserialize)]
pub struct LlmSettings {
    /// Provider name; see [`ProviderVariant::from_name`] for accepted aliases
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model identifier; the variant's default when absent
    #[serde(default)]
    pub model: Option<String>,

    /// Base URL override
    #[serde(default)]
    pub base_url: Option<String>,

    /// Fallback credential, used only when the environment variable is unset
    #[serde(default, deserialize_with = "secret_opt::deserialize")]
    pub api_key: Option<SecretString>,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Omitted from the request when unset
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Per-request timeout, e.g. `60s` or `2m`
    #[serde(default = "default_timeout", with = "duration_human")]
    pub timeout: Duration,

    /// Attempts per task for retryable transport errors
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Additional generation parameters, forwarded verbatim
    #[serde(default)]
    pub extra: BTreeMap<String, JsonValue>,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_max_output_tokens() -> u32 {
    1200
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_max_attempts() -> usize {
    1
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            base_url: None,
            api_key: None,
            max_output_tokens: default_max_output_tokens(),
            temperature: None,
            timeout: default_timeout(),
            max_attempts: default_max_attempts(),
            extra: BTreeMap::new(),
        }
    }
}

mod duration_human {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
    }
}

mod secret_opt {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map(SecretString::from))
    }
}

/// Generation parameters sent with every request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParameters {
    pub max_completion_tokens: u32,
    pub temperature: Option<f32>,
    pub timeout: Duration,
    pub extra: BTreeMap<String, JsonValue>,
}

/// The active provider for a run. Never mutated after resolution.
#[derive(Debug)]
pub struct ProviderProfile {
    /// Canonical provider name
    pub name: String,
    pub variant: ProviderVariant,
    /// Base URL without `/chat/completions`
    pub base_endpoint: String,
    pub credential: ApiCredential,
    pub model_identifier: String,
    pub generation: GenerationParameters,
}

impl ProviderProfile {
    /// Resolve against the process environment.
    pub fn resolve(settings: &LlmSettings) -> Result<Self, ConfigurationError> {
        Self::resolve_with(settings, |var| std::env::var(var).ok())
    }

    /// Resolve with an explicit environment lookup.
    pub fn resolve_with(
        settings: &LlmSettings,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigurationError> {
        let variant = ProviderVariant::from_name(&settings.provider)?;

        let base_endpoint = match settings.base_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(ConfigurationError::InvalidBaseUrl(url.to_string()));
                }
                url.trim_end_matches('/').to_string()
            }
            _ => variant.default_base_url().to_string(),
        };

        let credential = ApiCredential::resolve(
            lookup,
            variant.credential_env(),
            settings.api_key.as_ref(),
            variant.credential_name(),
        )
        .ok_or_else(|| ConfigurationError::MissingCredential {
            provider: variant.name().to_string(),
            env_var: variant.credential_env(),
        })?;

        let model_identifier = settings
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| variant.default_model())
            .to_string();

        tracing::debug!(
            provider = variant.name(),
            model = %model_identifier,
            base_url = %base_endpoint,
            credential = %credential,
            "Resolved provider profile"
        );

        Ok(Self {
            name: variant.name().to_string(),
            variant,
            base_endpoint,
            credential,
            model_identifier,
            generation: GenerationParameters {
                max_completion_tokens: settings.max_output_tokens,
                temperature: settings.temperature,
                timeout: settings.timeout,
                extra: settings.extra.clone(),
            },
        })
    }
}
