//! Secure credential handling for LLM providers.
//!
//! Credentials are resolved once, when the provider profile is built, and
//! never re-read during a run. Using this module ensures:
//!
//! - **No accidental logging**: credentials print as `[REDACTED]`
//! - **Memory hygiene**: values are zeroed on drop via `secrecy`
//! - **Explicit exposure**: the raw value is only reachable via `.expose()`
//!
//! ## Usage
//!
//! ```ignore
//! let cred = ApiCredential::resolve(
//!     |var| std::env::var(var).ok(),
//!     "OPENAI_API_KEY",
//!     settings.api_key.as_ref(),
//!     "OpenAI API key",
//! )?;
//!
//! let auth = AuthHeader::bearer(&cred);
//! request.header(auth.name, auth.expose());
//! ```

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// Where a credential was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Loaded from configuration file
    Config,
    /// Loaded from environment variable
    Environment,
    /// Provided programmatically
    Programmatic,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Config => write!(f, "config"),
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::Programmatic => write!(f, "programmatic"),
        }
    }
}

/// A securely-stored API credential.
///
/// # Example
///
/// ```ignore
/// let cred = ApiCredential::new("sk-secret-key", CredentialSource::Environment, "OpenAI API key");
///
/// // Safe to log/debug - shows [REDACTED]
/// tracing::info!(credential = %cred, "provider ready");
/// ```
pub struct ApiCredential {
    value: SecretString,
    source: CredentialSource,
    name: &'static str,
}

impl ApiCredential {
    /// Create a new credential from a string value.
    pub fn new(value: impl Into<String>, source: CredentialSource, name: &'static str) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source,
            name,
        }
    }

    /// Resolve a credential: environment variable first, then config value.
    ///
    /// `lookup` reads an environment variable; production code passes
    /// `|var| std::env::var(var).ok()`. Empty values count as unset.
    /// Returns `None` when neither source has a value.
    pub fn resolve(
        lookup: impl Fn(&str) -> Option<String>,
        env_var: &str,
        config_value: Option<&SecretString>,
        name: &'static str,
    ) -> Option<Self> {
        if let Some(value) = lookup(env_var).filter(|v| !v.trim().is_empty()) {
            return Some(Self::new(value, CredentialSource::Environment, name));
        }

        config_value
            .map(|v| v.expose_secret())
            .filter(|v| !v.trim().is_empty())
            .map(|v| Self::new(v, CredentialSource::Config, name))
    }

    /// Expose the credential value.
    ///
    /// Only call this where the value is written to the wire.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.value.expose_secret().is_empty()
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {} [REDACTED]", self.name, self.source)
    }
}

/// An HTTP authentication header carrying a secret value.
pub struct AuthHeader {
    pub name: &'static str,
    value: SecretString,
}

impl AuthHeader {
    /// `Authorization: Bearer <credential>`.
    pub fn bearer(credential: &ApiCredential) -> Self {
        Self {
            name: "authorization",
            value: SecretString::from(format!("Bearer {}", credential.expose())),
        }
    }

    /// Header value, for writing into the request.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }
}

impl Clone for AuthHeader {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            value: SecretString::from(self.expose().to_string()),
        }
    }
}

impl fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthHeader")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}
