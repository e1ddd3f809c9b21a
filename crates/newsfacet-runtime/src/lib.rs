//! # newsfacet-runtime
//!
//! Provider-agnostic structured-evaluation runner.
//!
//! Given tasks (source text plus a candidate 5W1H summary), this crate asks
//! the configured LLM provider to judge each summary through a forced
//! `save_evaluation` function call, recovers from models that do not
//! comply, and validates the result with `newsfacet-core` before it is
//! trusted downstream.
//!
//! ## Guarantees
//!
//! - One [`EvaluationOutcome`](newsfacet_core::EvaluationOutcome) per task,
//!   in input order
//! - Per-task failures are outcomes, never errors; only configuration
//!   problems abort a run, and they do so before any request is sent
//! - Credentials are resolved once and never logged
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use newsfacet_runtime::{EvaluationRunner, HttpTransport, LlmSettings, Prompts, RunnerOptions};
//!
//! let settings = LlmSettings::default();
//! let runner = EvaluationRunner::from_settings(
//!     &settings,
//!     Arc::new(HttpTransport::new()?),
//!     Prompts::default(),
//!     RunnerOptions::default(),
//! )?;
//!
//! let outcomes = runner.run(&tasks).await;
//! ```

pub mod config;
pub mod prompts;
pub mod protocol;
pub mod providers;
pub mod runner;

pub use config::{ConfigurationError, GenerationParameters, LlmSettings, ProviderProfile};
pub use prompts::Prompts;
pub use protocol::{ProtocolFailure, RawModelResponse, Recovery, RecoveryPath};
#[cfg(feature = "http")]
pub use providers::HttpTransport;
pub use providers::{
    ApiCredential, ChatCompletionRequest, ChatCompletionResponse, ChatTransport, Endpoint,
    ProviderAdapter, ProviderError, ProviderVariant,
};
pub use runner::{EvaluationRunner, RunSummary, RunnerOptions, RuntimeError};
