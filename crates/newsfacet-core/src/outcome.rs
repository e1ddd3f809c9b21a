//! Per-task outcomes, the unit persisted downstream.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{EvaluationResult, Task};

/// Category of a per-task failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Network, timeout, or authentication failure during the call
    TransportError,

    /// No structured call, and the text body was not a usable evaluation
    ProviderNonCompliance,

    /// Structured call arguments violated the evaluation schema
    SchemaError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::TransportError => "transport_error",
            ErrorKind::ProviderNonCompliance => "provider_non_compliance",
            ErrorKind::SchemaError => "schema_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token usage reported by the provider for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Build from prompt/completion counts, deriving the total.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Success or typed failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success {
        evaluation: EvaluationResult,
    },
    Failure {
        kind: ErrorKind,
        detail: String,
    },
}

/// Result of evaluating one task, keyed by `doc_id` + `model_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationOutcome {
    pub doc_id: String,
    pub model_name: String,
    #[serde(flatten)]
    pub status: OutcomeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
}

impl EvaluationOutcome {
    /// Successful outcome for a task.
    pub fn success(task: &Task, evaluation: EvaluationResult) -> Self {
        Self {
            doc_id: task.doc_id.clone(),
            model_name: task.model_name.clone(),
            status: OutcomeStatus::Success { evaluation },
            token_usage: None,
        }
    }

    /// Failed outcome for a task.
    pub fn failure(task: &Task, kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            doc_id: task.doc_id.clone(),
            model_name: task.model_name.clone(),
            status: OutcomeStatus::Failure {
                kind,
                detail: detail.into(),
            },
            token_usage: None,
        }
    }

    /// Attach token usage.
    pub fn with_usage(mut self, usage: Option<TokenUsage>) -> Self {
        self.token_usage = usage;
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Success { .. })
    }

    /// The validated result, if the task succeeded.
    pub fn result(&self) -> Option<&EvaluationResult> {
        match &self.status {
            OutcomeStatus::Success { evaluation } => Some(evaluation),
            OutcomeStatus::Failure { .. } => None,
        }
    }

    /// The failure kind, if the task failed.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match &self.status {
            OutcomeStatus::Success { .. } => None,
            OutcomeStatus::Failure { kind, .. } => Some(*kind),
        }
    }

    pub fn key(&self) -> (&str, &str) {
        (&self.doc_id, &self.model_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FacetJudgment, Verdict};

    fn correct() -> EvaluationResult {
        let j = || FacetJudgment::new(Verdict::Correct, "");
        EvaluationResult {
            who: j(),
            what: j(),
            when: j(),
            where_: j(),
            why: j(),
            how: j(),
        }
    }

    #[test]
    fn test_success_record_shape() {
        let task = Task::new("d1", "text", "summary", "m1");
        let outcome = EvaluationOutcome::success(&task, correct())
            .with_usage(Some(TokenUsage::new(100, 20)));

        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["doc_id"], "d1");
        assert_eq!(value["evaluation"]["how"]["verdict"], "correct");
        assert_eq!(value["token_usage"]["total_tokens"], 120);

        let back: EvaluationOutcome = serde_json::from_value(value).unwrap();
        assert_eq!(back, outcome);
    }

    #[test]
    fn test_failure_record_shape() {
        let task = Task::new("d2", "text", "summary", "m2");
        let outcome = EvaluationOutcome::failure(&task, ErrorKind::TransportError, "timed out");

        assert!(!outcome.is_success());
        assert_eq!(outcome.error_kind(), Some(ErrorKind::TransportError));
        assert_eq!(outcome.key(), ("d2", "m2"));

        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "failure");
        assert_eq!(value["kind"], "transport_error");
        assert!(value.get("token_usage").is_none());
    }
}
