//! Tasks, facets, and the validated evaluation result.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One (document, candidate summary, model) triple submitted for judgment.
///
/// `doc_id` is not unique on its own: the same document recurs once per
/// model whose summary is being judged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Source document identifier
    pub doc_id: String,

    /// Full source text
    pub original_text: String,

    /// The 5W1H summary under evaluation
    pub summary_to_evaluate: String,

    /// Name of the model that produced the summary
    pub model_name: String,
}

impl Task {
    /// Create a new task.
    pub fn new(
        doc_id: impl Into<String>,
        original_text: impl Into<String>,
        summary_to_evaluate: impl Into<String>,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            doc_id: doc_id.into(),
            original_text: original_text.into(),
            summary_to_evaluate: summary_to_evaluate.into(),
            model_name: model_name.into(),
        }
    }

    /// Key identifying this task's outcome: `(doc_id, model_name)`.
    pub fn key(&self) -> (&str, &str) {
        (&self.doc_id, &self.model_name)
    }
}

/// One of the six judged dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    Who,
    What,
    When,
    Where,
    Why,
    How,
}

impl Facet {
    /// All facets in canonical order.
    pub const ALL: [Facet; 6] = [
        Facet::Who,
        Facet::What,
        Facet::When,
        Facet::Where,
        Facet::Why,
        Facet::How,
    ];

    /// Key used for this facet in the wire mapping.
    pub fn key(&self) -> &'static str {
        match self {
            Facet::Who => "who",
            Facet::What => "what",
            Facet::When => "when",
            Facet::Where => "where",
            Facet::Why => "why",
            Facet::How => "how",
        }
    }

    /// The question this facet answers.
    pub fn question(&self) -> &'static str {
        match self {
            Facet::Who => "Who is involved?",
            Facet::What => "What happened?",
            Facet::When => "When did it happen?",
            Facet::Where => "Where did it happen?",
            Facet::Why => "Why did it happen?",
            Facet::How => "How did it happen?",
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Judgment on a single facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Correct,
    Partial,
    Incorrect,
}

impl Verdict {
    /// All accepted verdicts.
    pub const ALL: [Verdict; 3] = [Verdict::Correct, Verdict::Partial, Verdict::Incorrect];

    /// Wire value for this verdict.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Correct => "correct",
            Verdict::Partial => "partial",
            Verdict::Incorrect => "incorrect",
        }
    }

    /// Parse a wire value. Matching is exact.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == value)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict plus the judge's justification for one facet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetJudgment {
    pub verdict: Verdict,
    pub justification: String,
}

impl FacetJudgment {
    pub fn new(verdict: Verdict, justification: impl Into<String>) -> Self {
        Self {
            verdict,
            justification: justification.into(),
        }
    }
}

/// A fully validated evaluation.
///
/// Untrusted input reaches this type only through
/// [`crate::schema::validate`]; deserializing it runs the same checks. Every
/// instance read from JSON has all six facets, a known verdict on each, and
/// a non-empty justification wherever the verdict is not `correct`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub struct EvaluationResult {
    pub who: FacetJudgment,
    pub what: FacetJudgment,
    pub when: FacetJudgment,
    #[serde(rename = "where")]
    pub where_: FacetJudgment,
    pub why: FacetJudgment,
    pub how: FacetJudgment,
}

impl EvaluationResult {
    /// Judgment for a facet.
    pub fn get(&self, facet: Facet) -> &FacetJudgment {
        match facet {
            Facet::Who => &self.who,
            Facet::What => &self.what,
            Facet::When => &self.when,
            Facet::Where => &self.where_,
            Facet::Why => &self.why,
            Facet::How => &self.how,
        }
    }

    /// Iterate facets in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Facet, &FacetJudgment)> {
        Facet::ALL.into_iter().map(move |f| (f, self.get(f)))
    }

    /// True when every facet was judged correct.
    pub fn all_correct(&self) -> bool {
        self.iter().all(|(_, j)| j.verdict == Verdict::Correct)
    }
}
