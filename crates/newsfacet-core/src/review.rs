//! Expert review tasks built from successful evaluations.
//!
//! Each review item pairs the source text and the judged summary with the
//! model's verdict per facet and blank slots for the human expert.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use crate::model::{EvaluationResult, Facet, Task};
use crate::outcome::EvaluationOutcome;

/// Blank feedback slots filled in by the reviewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpertFeedback {
    pub verdict_is_valid: String,
    pub justification_quality: String,
    pub optional_notes: String,
}

impl Default for ExpertFeedback {
    fn default() -> Self {
        Self {
            verdict_is_valid: " ".to_string(),
            justification_quality: " ".to_string(),
            optional_notes: " ".to_string(),
        }
    }
}

/// The model's judgment on one facet, awaiting review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgmentToReview {
    pub ai_verdict: String,
    pub ai_justification: String,
    pub expert_feedback: ExpertFeedback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub doc_id: String,
    pub full_source_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionInfo {
    pub model_evaluated: String,
    pub extraction_to_evaluate: String,
}

/// One review item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewTask {
    pub review_id: String,
    pub document_info: DocumentInfo,
    pub extraction_info: ExtractionInfo,
    pub judgments_to_review: BTreeMap<Facet, JudgmentToReview>,
}

/// Run-level metadata for a batch of review items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewBatchInfo {
    pub dataset: String,
    pub environment: String,
    pub provider: String,
    pub model: String,
    /// Outcomes left out because they failed or had no matching task
    pub skipped: usize,
}

/// A batch of review items, written as one JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewBatch {
    pub review_batch_info: ReviewBatchInfo,
    pub review_items: Vec<ReviewTask>,
}

/// Build the review item for one evaluated task.
pub fn build_review_task(task: &Task, evaluation: &EvaluationResult) -> ReviewTask {
    let judgments_to_review = evaluation
        .iter()
        .map(|(facet, judgment)| {
            (
                facet,
                JudgmentToReview {
                    ai_verdict: judgment.verdict.to_string(),
                    ai_justification: judgment.justification.clone(),
                    expert_feedback: ExpertFeedback::default(),
                },
            )
        })
        .collect();

    ReviewTask {
        review_id: format!("{}_{}", task.doc_id, task.model_name),
        document_info: DocumentInfo {
            doc_id: task.doc_id.clone(),
            full_source_text: task.original_text.clone(),
        },
        extraction_info: ExtractionInfo {
            model_evaluated: task.model_name.clone(),
            extraction_to_evaluate: task.summary_to_evaluate.clone(),
        },
        judgments_to_review,
    }
}

/// Build a review batch, joining outcomes to tasks by `(doc_id, model_name)`.
///
/// A key may repeat; the n-th outcome with a key is paired with the n-th
/// task with that key. Items follow outcome order. `info.skipped` is
/// overwritten with the number of outcomes that produced no item.
pub fn build_review_batch<'a>(
    mut info: ReviewBatchInfo,
    tasks: &'a [Task],
    outcomes: &'a [EvaluationOutcome],
) -> ReviewBatch {
    let mut by_key: BTreeMap<(&str, &str), VecDeque<&Task>> = BTreeMap::new();
    for task in tasks {
        by_key.entry(task.key()).or_default().push_back(task);
    }

    let review_items: Vec<ReviewTask> = outcomes
        .iter()
        .filter_map(|outcome| {
            let task = by_key.get_mut(&outcome.key())?.pop_front()?;
            let evaluation = outcome.result()?;
            Some(build_review_task(task, evaluation))
        })
        .collect();

    info.skipped = outcomes.len() - review_items.len();
    ReviewBatch {
        review_batch_info: info,
        review_items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FacetJudgment, Verdict};
    use crate::outcome::ErrorKind;

    fn evaluation() -> EvaluationResult {
        EvaluationResult {
            who: FacetJudgment::new(Verdict::Correct, ""),
            what: FacetJudgment::new(Verdict::Partial, "misses the second event"),
            when: FacetJudgment::new(Verdict::Correct, ""),
            where_: FacetJudgment::new(Verdict::Incorrect, "wrong city"),
            why: FacetJudgment::new(Verdict::Correct, ""),
            how: FacetJudgment::new(Verdict::Correct, ""),
        }
    }

    #[test]
    fn test_build_review_task() {
        let task = Task::new("42", "Source text.", "Who: someone", "gpt4o");
        let review = build_review_task(&task, &evaluation());

        assert_eq!(review.review_id, "42_gpt4o");
        assert_eq!(review.document_info.full_source_text, "Source text.");
        assert_eq!(review.judgments_to_review.len(), 6);

        let where_ = &review.judgments_to_review[&Facet::Where];
        assert_eq!(where_.ai_verdict, "incorrect");
        assert_eq!(where_.ai_justification, "wrong city");
        assert_eq!(where_.expert_feedback.optional_notes, " ");

        let value = serde_json::to_value(&review).unwrap();
        assert!(value["judgments_to_review"]["where"].is_object());
    }

    #[test]
    fn test_batch_skips_failures() {
        let t1 = Task::new("1", "a", "s", "m1");
        let t2 = Task::new("1", "a", "s", "m2");
        let outcomes = vec![
            EvaluationOutcome::success(&t1, evaluation()),
            EvaluationOutcome::failure(&t2, ErrorKind::ProviderNonCompliance, "not json"),
        ];

        let batch = build_review_batch(ReviewBatchInfo::default(), &[t1, t2], &outcomes);
        assert_eq!(batch.review_items.len(), 1);
        assert_eq!(batch.review_items[0].review_id, "1_m1");
        assert_eq!(batch.review_batch_info.skipped, 1);
    }

    #[test]
    fn test_batch_pairs_repeated_keys_in_order() {
        let train = Task::new("7", "TRAIN TEXT", "s1", "flares_ground_truth");
        let trial = Task::new("7", "TRIAL TEXT", "s2", "flares_ground_truth");
        let outcomes = vec![
            EvaluationOutcome::success(&train, evaluation()),
            EvaluationOutcome::success(&trial, evaluation()),
        ];

        let batch = build_review_batch(ReviewBatchInfo::default(), &[train, trial], &outcomes);
        let texts: Vec<_> = batch
            .review_items
            .iter()
            .map(|item| item.document_info.full_source_text.as_str())
            .collect();
        assert_eq!(texts, vec!["TRAIN TEXT", "TRIAL TEXT"]);
        assert_eq!(batch.review_batch_info.skipped, 0);
    }

    #[test]
    fn test_failed_outcome_consumes_its_task() {
        let first = Task::new("7", "FIRST", "s1", "m");
        let second = Task::new("7", "SECOND", "s2", "m");
        let outcomes = vec![
            EvaluationOutcome::failure(&first, ErrorKind::TransportError, "timeout"),
            EvaluationOutcome::success(&second, evaluation()),
        ];

        let batch = build_review_batch(ReviewBatchInfo::default(), &[first, second], &outcomes);
        assert_eq!(batch.review_items.len(), 1);
        assert_eq!(batch.review_items[0].document_info.full_source_text, "SECOND");
        assert_eq!(batch.review_batch_info.skipped, 1);
    }
}
