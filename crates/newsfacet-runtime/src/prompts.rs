//! Prompts for the 5W1H judge.
//!
//! The system prompt frames the model as a strict grader of an existing
//! extraction, never as an extractor. The user template carries the source
//! document and the extraction under review.

use std::fs;
use std::path::Path;

use newsfacet_core::Task;

use crate::config::ConfigurationError;

/// Built-in system prompt.
pub const SYSTEM_PROMPT: &str = r#"
You are an expert annotator evaluating 5W1H extractions from news articles.

You receive an original document and an extraction that claims to answer
six questions about it: WHO, WHAT, WHEN, WHERE, WHY and HOW.

For each of the six facets, decide whether the extraction is supported by
the document:
- "correct": the answer is fully supported by the document
- "partial": the answer is incomplete, imprecise, or mixes supported and
  unsupported content
- "incorrect": the answer is missing, contradicted by the document, or
  invented

## Rules
1. Judge ONLY against the original document - do not use outside knowledge
2. A facet the document does not mention is "correct" only if the
   extraction also leaves it unspecified
3. Every "partial" or "incorrect" verdict needs a short justification that
   points to the document
4. A "correct" verdict may have an empty justification

Record your judgment by calling the `save_evaluation` function exactly once.
Do not reply in free text.
"#;

/// Built-in user prompt template.
pub const USER_PROMPT_TEMPLATE: &str = r#"
## Original document
{original_document}

## Extraction to evaluate
{extraction_to_evaluate}

Evaluate the extraction facet by facet and call `save_evaluation`.
"#;

const DOCUMENT_PLACEHOLDER: &str = "{original_document}";
const EXTRACTION_PLACEHOLDER: &str = "{extraction_to_evaluate}";

/// The prompt pair used for every task in a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompts {
    pub system: String,
    pub user_template: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            system: SYSTEM_PROMPT.trim().to_string(),
            user_template: USER_PROMPT_TEMPLATE.trim().to_string(),
        }
    }
}

impl Prompts {
    /// Load overrides from files; a `None` path keeps the built-in prompt.
    pub fn from_files(
        system_path: Option<&Path>,
        user_path: Option<&Path>,
    ) -> Result<Self, ConfigurationError> {
        let mut prompts = Self::default();
        if let Some(path) = system_path {
            prompts.system = read_prompt(path)?;
        }
        if let Some(path) = user_path {
            prompts.user_template = read_prompt(path)?;
        }
        Ok(prompts)
    }

    /// Fill the user template for one task.
    ///
    /// Substitution is single-pass: placeholder text appearing inside the
    /// document or extraction is left untouched.
    pub fn render_user(&self, task: &Task) -> String {
        let mut out = String::with_capacity(
            self.user_template.len() + task.original_text.len() + task.summary_to_evaluate.len(),
        );
        let mut rest = self.user_template.as_str();

        loop {
            let doc = rest.find(DOCUMENT_PLACEHOLDER);
            let ext = rest.find(EXTRACTION_PLACEHOLDER);
            let (pos, placeholder, value) = match (doc, ext) {
                (Some(d), Some(e)) if e < d => (e, EXTRACTION_PLACEHOLDER, &task.summary_to_evaluate),
                (Some(d), _) => (d, DOCUMENT_PLACEHOLDER, &task.original_text),
                (None, Some(e)) => (e, EXTRACTION_PLACEHOLDER, &task.summary_to_evaluate),
                (None, None) => break,
            };
            out.push_str(&rest[..pos]);
            out.push_str(value);
            rest = &rest[pos + placeholder.len()..];
        }

        out.push_str(rest);
        out
    }
}

fn read_prompt(path: &Path) -> Result<String, ConfigurationError> {
    fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|source| ConfigurationError::PromptFile {
            path: path.to_path_buf(),
            source,
        })
}
