//! Evaluation runner.
//!
//! The runner turns a sequence of tasks into exactly one outcome per task,
//! in input order. Tasks are processed strictly one after another; a failed
//! task is recorded and the run moves on.

use backon::{ExponentialBuilder, Retryable};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use newsfacet_core::{ErrorKind, EvaluationOutcome, Task};

use crate::config::{ConfigurationError, LlmSettings, ProviderProfile};
use crate::prompts::Prompts;
use crate::protocol::{self, RawModelResponse, RecoveryPath, EXCERPT_CHARS};
use crate::providers::{
    ChatCompletionRequest, ChatCompletionResponse, ChatCompletionsAdapter, ChatTransport,
    ProviderAdapter, ProviderError,
};

/// Errors that prevent a run from starting.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

/// Runner behavior for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerOptions {
    /// Log per-task progress and raw excerpts on fallback or failure
    pub verbose: bool,

    /// Process at most this many tasks
    pub limit: Option<usize>,

    /// Attempts per task for retryable transport errors
    pub max_attempts: usize,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            limit: None,
            max_attempts: 1,
        }
    }
}

/// Sequential evaluation runner bound to one provider profile.
pub struct EvaluationRunner {
    profile: ProviderProfile,
    adapter: Box<dyn ProviderAdapter>,
    transport: Arc<dyn ChatTransport>,
    prompts: Prompts,
    options: RunnerOptions,
}

impl std::fmt::Debug for EvaluationRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationRunner")
            .field("provider", &self.profile.name)
            .field("model", &self.profile.model_identifier)
            .field("transport", &self.transport.name())
            .field("options", &self.options)
            .finish()
    }
}

impl EvaluationRunner {
    /// Create a runner for an already-resolved profile.
    pub fn new(
        profile: ProviderProfile,
        transport: Arc<dyn ChatTransport>,
        prompts: Prompts,
        options: RunnerOptions,
    ) -> Self {
        let adapter = Box::new(ChatCompletionsAdapter::for_profile(&profile));
        Self {
            profile,
            adapter,
            transport,
            prompts,
            options,
        }
    }

    /// Resolve the profile from settings and the process environment.
    ///
    /// Fails before any task is sent if the provider is unknown or its
    /// credential is missing.
    pub fn from_settings(
        settings: &LlmSettings,
        transport: Arc<dyn ChatTransport>,
        prompts: Prompts,
        options: RunnerOptions,
    ) -> Result<Self, RuntimeError> {
        Self::from_settings_with(settings, |var| std::env::var(var).ok(), transport, prompts, options)
    }

    /// Like [`from_settings`](Self::from_settings) with an explicit
    /// environment lookup.
    pub fn from_settings_with(
        settings: &LlmSettings,
        lookup: impl Fn(&str) -> Option<String>,
        transport: Arc<dyn ChatTransport>,
        prompts: Prompts,
        options: RunnerOptions,
    ) -> Result<Self, RuntimeError> {
        let profile = ProviderProfile::resolve_with(settings, lookup)?;
        Ok(Self::new(profile, transport, prompts, options))
    }

    pub fn profile(&self) -> &ProviderProfile {
        &self.profile
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    /// Evaluate tasks in order, one outcome per task after `limit`.
    pub async fn run(&self, tasks: &[Task]) -> Vec<EvaluationOutcome> {
        let tasks = match self.options.limit {
            Some(limit) => &tasks[..limit.min(tasks.len())],
            None => tasks,
        };

        tracing::info!(
            provider = %self.profile.name,
            model = %self.profile.model_identifier,
            tasks = tasks.len(),
            "Evaluation started"
        );

        let mut outcomes = Vec::with_capacity(tasks.len());
        for (index, task) in tasks.iter().enumerate() {
            if self.options.verbose {
                tracing::info!(
                    "[{}/{}] Evaluating doc_id={} extraction_from={}",
                    index + 1,
                    tasks.len(),
                    task.doc_id,
                    task.model_name
                );
            }
            outcomes.push(self.evaluate_task(task).await);
        }

        let summary = RunSummary::from_outcomes(&outcomes);
        tracing::info!(
            total = summary.total,
            succeeded = summary.succeeded,
            transport_errors = summary.transport_errors,
            non_compliant = summary.non_compliant,
            schema_errors = summary.schema_errors,
            total_tokens = summary.total_tokens,
            "Evaluation finished"
        );

        outcomes
    }

    /// Evaluate a single task. Never fails: errors become failure outcomes.
    pub async fn evaluate_task(&self, task: &Task) -> EvaluationOutcome {
        let request = self.adapter.format_request(task, &self.profile, &self.prompts);

        let response = match self.send(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    doc_id = %task.doc_id,
                    model = %task.model_name,
                    kind = %ErrorKind::TransportError,
                    error = %e,
                    "Provider call failed"
                );
                return EvaluationOutcome::failure(task, ErrorKind::TransportError, e.to_string());
            }
        };

        let usage = response.token_usage();
        let raw = RawModelResponse::from_response(&response);

        match protocol::recover(&raw) {
            Ok(recovery) => {
                if recovery.path == RecoveryPath::TextFallback && self.options.verbose {
                    tracing::info!(
                        doc_id = %task.doc_id,
                        model = %task.model_name,
                        raw = %protocol::excerpt(raw.raw(), EXCERPT_CHARS),
                        "No save_evaluation call; recovered from text"
                    );
                }
                if self.options.verbose {
                    if let Some(u) = usage {
                        tracing::info!(
                            prompt_tokens = u.prompt_tokens,
                            completion_tokens = u.completion_tokens,
                            total_tokens = u.total_tokens,
                            "Received evaluation"
                        );
                    }
                }
                EvaluationOutcome::success(task, recovery.result).with_usage(usage)
            }
            Err(failure) => {
                if self.options.verbose {
                    tracing::warn!(
                        doc_id = %task.doc_id,
                        model = %task.model_name,
                        kind = %failure.kind(),
                        raw = %failure.excerpt(),
                        "{}",
                        failure
                    );
                } else {
                    tracing::warn!(
                        doc_id = %task.doc_id,
                        model = %task.model_name,
                        kind = %failure.kind(),
                        "Unusable model response"
                    );
                }
                EvaluationOutcome::failure(task, failure.kind(), failure.detail()).with_usage(usage)
            }
        }
    }

    async fn send(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ProviderError> {
        let endpoint = &self.adapter.describe_endpoint();
        let transport = &self.transport;
        let timeout = self.profile.generation.timeout;
        let retries = self.options.max_attempts.max(1) - 1;

        (|| async move { transport.send(endpoint, request, timeout).await })
            .retry(ExponentialBuilder::default().with_max_times(retries))
            .sleep(tokio::time::sleep)
            .when(ProviderError::is_retryable)
            .adjust(retry_delay)
            .notify(|err: &ProviderError, delay| {
                tracing::warn!(error = %err, ?delay, "Retrying provider call");
            })
            .await
    }
}

/// Backoff delay for a retryable error.
///
/// A rate limit that names its own wait replaces the exponential delay.
/// `None` means the retry budget is spent and stays `None`.
fn retry_delay(err: &ProviderError, delay: Option<Duration>) -> Option<Duration> {
    match err {
        ProviderError::RateLimited {
            retry_after: Some(wait),
        } => delay.map(|_| *wait),
        _ => delay,
    }
}

/// Counts for one finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub transport_errors: usize,
    pub non_compliant: usize,
    pub schema_errors: usize,
    pub total_tokens: u64,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: &[EvaluationOutcome]) -> Self {
        let mut summary = RunSummary {
            total: outcomes.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome.error_kind() {
                None => summary.succeeded += 1,
                Some(ErrorKind::TransportError) => summary.transport_errors += 1,
                Some(ErrorKind::ProviderNonCompliance) => summary.non_compliant += 1,
                Some(ErrorKind::SchemaError) => summary.schema_errors += 1,
            }
            if let Some(usage) = outcome.token_usage {
                summary.total_tokens += u64::from(usage.total_tokens);
            }
        }
        summary
    }

    pub fn failed(&self) -> usize {
        self.total - self.succeeded
    }
}
