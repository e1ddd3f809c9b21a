//! Structured-call protocol: request construction and two-tier recovery.
//!
//! Every request forces the model to call `save_evaluation`. Responses are
//! recovered in a fixed order:
//!
//! 1. the `save_evaluation` arguments, parsed as JSON and validated
//! 2. the message text, parsed as a JSON document and validated
//!
//! If neither yields a valid [`EvaluationResult`], the task fails with
//! [`ProtocolFailure`] and is not retried.

use serde_json::Value as JsonValue;
use thiserror::Error;

use newsfacet_core::{
    save_evaluation_parameters, validate, ErrorKind, EvaluationResult, SchemaError, Task,
    SAVE_EVALUATION, SAVE_EVALUATION_DESCRIPTION,
};

use crate::config::ProviderProfile;
use crate::prompts::Prompts;
use crate::providers::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, FunctionDeclaration, ToolChoice,
    ToolDeclaration,
};

/// Maximum characters of raw output kept in failure details.
pub const EXCERPT_CHARS: usize = 500;

/// Build the forced-function-call request for one task.
pub fn build_request(
    task: &Task,
    profile: &ProviderProfile,
    prompts: &Prompts,
) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: profile.model_identifier.clone(),
        messages: vec![
            ChatMessage::system(prompts.system.clone()),
            ChatMessage::user(prompts.render_user(task)),
        ],
        max_completion_tokens: profile.generation.max_completion_tokens,
        temperature: profile.generation.temperature,
        tools: vec![ToolDeclaration {
            type_: "function".to_string(),
            function: FunctionDeclaration {
                name: SAVE_EVALUATION.to_string(),
                description: SAVE_EVALUATION_DESCRIPTION.to_string(),
                parameters: save_evaluation_parameters(),
            },
        }],
        tool_choice: ToolChoice::function(SAVE_EVALUATION),
        extra: profile.generation.extra.clone(),
    }
}

/// What the model sent back, reduced to the two shapes the protocol handles.
#[derive(Debug, Clone, PartialEq)]
pub enum RawModelResponse {
    /// The model invoked `save_evaluation`
    StructuredCall {
        arguments: String,
        /// Message text sent alongside the call, if any
        text: Option<String>,
    },

    /// No `save_evaluation` call; free-form text only
    Text(String),
}

impl RawModelResponse {
    /// Extract from the first choice.
    ///
    /// Calls to any other function are treated as if no call was made.
    pub fn from_response(response: &ChatCompletionResponse) -> Self {
        let Some(choice) = response.choices.first() else {
            return RawModelResponse::Text(String::new());
        };
        let message = &choice.message;
        let text = message.content.clone().filter(|c| !c.trim().is_empty());

        let call = message
            .tool_calls
            .iter()
            .flatten()
            .find(|call| call.function.name == SAVE_EVALUATION);

        match call {
            Some(call) => RawModelResponse::StructuredCall {
                arguments: call.function.arguments.clone(),
                text,
            },
            None => RawModelResponse::Text(text.unwrap_or_default()),
        }
    }

    /// Free-form text, if the model sent any.
    pub fn text(&self) -> Option<&str> {
        match self {
            RawModelResponse::StructuredCall { text, .. } => text.as_deref(),
            RawModelResponse::Text(text) if !text.trim().is_empty() => Some(text.as_str()),
            RawModelResponse::Text(_) => None,
        }
    }

    /// The most informative raw output, for diagnostics.
    pub fn raw(&self) -> &str {
        match self {
            RawModelResponse::StructuredCall { arguments, text } => match text {
                Some(t) => t,
                None => arguments,
            },
            RawModelResponse::Text(text) => text,
        }
    }
}

/// Which tier produced the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryPath {
    StructuredCall,
    TextFallback,
}

/// A validated result and the tier that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Recovery {
    pub result: EvaluationResult,
    pub path: RecoveryPath,
}

/// Both recovery tiers failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolFailure {
    #[error("provider did not comply: {reason}")]
    NonCompliance { reason: String, excerpt: String },

    #[error("schema violation: {error}")]
    Schema { error: SchemaError, excerpt: String },
}

impl ProtocolFailure {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProtocolFailure::NonCompliance { .. } => ErrorKind::ProviderNonCompliance,
            ProtocolFailure::Schema { .. } => ErrorKind::SchemaError,
        }
    }

    pub fn excerpt(&self) -> &str {
        match self {
            ProtocolFailure::NonCompliance { excerpt, .. } | ProtocolFailure::Schema { excerpt, .. } => {
                excerpt
            }
        }
    }

    /// Outcome detail: the failure and the raw excerpt.
    pub fn detail(&self) -> String {
        if self.excerpt().is_empty() {
            self.to_string()
        } else {
            format!("{}; raw output: {}", self, self.excerpt())
        }
    }
}

/// First `max_chars` characters of `text`.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

enum Attempt {
    Invalid(SchemaError),
    Unparseable(String),
    Absent,
}

fn attempt(raw: Option<&str>) -> Result<EvaluationResult, Attempt> {
    let raw = raw.ok_or(Attempt::Absent)?;
    let candidate: JsonValue =
        serde_json::from_str(raw.trim()).map_err(|e| Attempt::Unparseable(e.to_string()))?;
    validate(&candidate).map_err(Attempt::Invalid)
}

/// Recover a validated result from a model response.
///
/// A structured call whose arguments are valid JSON but violate the schema
/// reports [`ProtocolFailure::Schema`] unless the text fallback succeeds.
/// Every other double miss is [`ProtocolFailure::NonCompliance`].
pub fn recover(raw: &RawModelResponse) -> Result<Recovery, ProtocolFailure> {
    let structured = match raw {
        RawModelResponse::StructuredCall { arguments, .. } => attempt(Some(arguments.as_str())),
        RawModelResponse::Text(_) => Err(Attempt::Absent),
    };

    let structured_miss = match structured {
        Ok(result) => {
            return Ok(Recovery {
                result,
                path: RecoveryPath::StructuredCall,
            })
        }
        Err(miss) => miss,
    };

    let fallback_miss = match attempt(raw.text()) {
        Ok(result) => {
            return Ok(Recovery {
                result,
                path: RecoveryPath::TextFallback,
            })
        }
        Err(miss) => miss,
    };

    let excerpt = excerpt(raw.raw(), EXCERPT_CHARS);

    let structured_reason = match structured_miss {
        Attempt::Invalid(error) => return Err(ProtocolFailure::Schema { error, excerpt }),
        Attempt::Unparseable(e) => format!("{} arguments are not valid JSON ({})", SAVE_EVALUATION, e),
        Attempt::Absent => format!("model did not call {}", SAVE_EVALUATION),
    };
    let fallback_reason = match fallback_miss {
        Attempt::Absent => "no text to fall back on".to_string(),
        Attempt::Unparseable(e) => format!("text is not valid JSON ({})", e),
        Attempt::Invalid(e) => format!("text JSON rejected at '{}': {}", e.field(), e),
    };

    Err(ProtocolFailure::NonCompliance {
        reason: format!("{}; {}", structured_reason, fallback_reason),
        excerpt,
    })
}
