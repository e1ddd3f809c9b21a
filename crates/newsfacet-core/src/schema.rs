//! Structural contract for evaluation results.
//!
//! Model output is untrusted. A candidate mapping only becomes an
//! [`EvaluationResult`] by passing [`validate`]; there is no partial or
//! best-effort construction.
//!
//! Checks run in a fixed order and stop at the first violation:
//! 1. all six facet keys are present
//! 2. each facet is an object with `verdict` and `justification`
//! 3. each verdict is one of the enumerated values
//! 4. justifications are non-empty wherever the verdict is not `correct`

use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::{EvaluationResult, Facet, FacetJudgment, Verdict};

/// Name of the structured function the model is forced to call.
pub const SAVE_EVALUATION: &str = "save_evaluation";

/// Description sent alongside the function declaration.
pub const SAVE_EVALUATION_DESCRIPTION: &str =
    "Saves the structured evaluation result of a 5W1H extraction.";

const VERDICT_FIELD: &str = "verdict";
const JUSTIFICATION_FIELD: &str = "justification";

/// First violation found in a candidate mapping.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("evaluation must be a JSON object")]
    NotAnObject,

    #[error("missing facet '{0}'")]
    MissingFacet(Facet),

    #[error("facet '{0}' must be a JSON object")]
    FacetNotAnObject(Facet),

    #[error("facet '{facet}' is missing string field '{field}'")]
    MissingField { facet: Facet, field: &'static str },

    #[error("facet '{facet}' has invalid verdict {value} (expected one of: correct, partial, incorrect)")]
    InvalidVerdict { facet: Facet, value: String },

    #[error("facet '{0}' needs a justification when the verdict is not 'correct'")]
    EmptyJustification(Facet),
}

impl SchemaError {
    /// Dotted path of the offending field, e.g. `when.verdict`.
    pub fn field(&self) -> String {
        match self {
            SchemaError::NotAnObject => "$".to_string(),
            SchemaError::MissingFacet(f) | SchemaError::FacetNotAnObject(f) => f.key().to_string(),
            SchemaError::MissingField { facet, field } => format!("{}.{}", facet, field),
            SchemaError::InvalidVerdict { facet, .. } => format!("{}.{}", facet, VERDICT_FIELD),
            SchemaError::EmptyJustification(f) => format!("{}.{}", f, JUSTIFICATION_FIELD),
        }
    }

    /// The facet the violation belongs to, if any.
    pub fn facet(&self) -> Option<Facet> {
        match self {
            SchemaError::NotAnObject => None,
            SchemaError::MissingFacet(f)
            | SchemaError::FacetNotAnObject(f)
            | SchemaError::EmptyJustification(f) => Some(*f),
            SchemaError::MissingField { facet, .. } | SchemaError::InvalidVerdict { facet, .. } => {
                Some(*facet)
            }
        }
    }
}

/// Validate an untyped candidate and build the typed result.
///
/// Pure: no I/O, no logging. Keys outside the six facets are ignored.
pub fn validate(candidate: &Value) -> Result<EvaluationResult, SchemaError> {
    let root = candidate.as_object().ok_or(SchemaError::NotAnObject)?;

    // (1) presence
    for facet in Facet::ALL {
        if !root.contains_key(facet.key()) {
            return Err(SchemaError::MissingFacet(facet));
        }
    }

    // (2) shape
    let mut facets: Vec<(Facet, &Map<String, Value>)> = Vec::with_capacity(Facet::ALL.len());
    for facet in Facet::ALL {
        let obj = root[facet.key()]
            .as_object()
            .ok_or(SchemaError::FacetNotAnObject(facet))?;
        if !obj.contains_key(VERDICT_FIELD) {
            return Err(SchemaError::MissingField {
                facet,
                field: VERDICT_FIELD,
            });
        }
        if !obj.get(JUSTIFICATION_FIELD).is_some_and(Value::is_string) {
            return Err(SchemaError::MissingField {
                facet,
                field: JUSTIFICATION_FIELD,
            });
        }
        facets.push((facet, obj));
    }

    // (3) verdict enum
    let mut verdicts = [Verdict::Correct; Facet::ALL.len()];
    for (slot, (facet, obj)) in verdicts.iter_mut().zip(&facets) {
        let raw = &obj[VERDICT_FIELD];
        *slot = raw
            .as_str()
            .and_then(Verdict::parse)
            .ok_or_else(|| SchemaError::InvalidVerdict {
                facet: *facet,
                value: raw.to_string(),
            })?;
    }

    // (4) justification
    let mut justifications = [""; Facet::ALL.len()];
    for ((slot, (facet, obj)), verdict) in justifications.iter_mut().zip(&facets).zip(verdicts) {
        let justification = obj[JUSTIFICATION_FIELD].as_str().unwrap_or_default();
        if verdict != Verdict::Correct && justification.trim().is_empty() {
            return Err(SchemaError::EmptyJustification(*facet));
        }
        *slot = justification;
    }

    let [who, what, when, where_, why, how] =
        std::array::from_fn(|i| FacetJudgment::new(verdicts[i], justifications[i]));
    Ok(EvaluationResult {
        who,
        what,
        when,
        where_,
        why,
        how,
    })
}

impl TryFrom<Value> for EvaluationResult {
    type Error = SchemaError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        validate(&value)
    }
}

/// JSON Schema for the `save_evaluation` function parameters.
///
/// Mirrors [`validate`]: six required object properties, each requiring a
/// `verdict` from the enumerated set and a `justification` string.
pub fn save_evaluation_parameters() -> Value {
    let verdicts: Vec<&str> = Verdict::ALL.iter().map(|v| v.as_str()).collect();

    let mut properties = Map::new();
    for facet in Facet::ALL {
        properties.insert(
            facet.key().to_string(),
            serde_json::json!({
                "type": "object",
                "description": format!(
                    "Judgment of the summary's answer to: {}",
                    facet.question()
                ),
                "properties": {
                    "verdict": {
                        "type": "string",
                        "enum": verdicts,
                        "description": "Whether the summary extracts this fact correctly from the source."
                    },
                    "justification": {
                        "type": "string",
                        "description": "Brief justification. Required to be non-empty unless the verdict is 'correct'."
                    }
                },
                "required": [VERDICT_FIELD, JUSTIFICATION_FIELD]
            }),
        );
    }

    let required: Vec<&str> = Facet::ALL.iter().map(|f| f.key()).collect();
    serde_json::json!({
        "type": "object",
        "properties": Value::Object(properties),
        "required": required
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn facet_json(verdict: &str, justification: &str) -> Value {
        json!({ "verdict": verdict, "justification": justification })
    }

    fn all_correct() -> Value {
        let mut map = Map::new();
        for facet in Facet::ALL {
            map.insert(facet.key().to_string(), facet_json("correct", ""));
        }
        Value::Object(map)
    }

    #[test]
    fn test_all_correct_passes() {
        let result = validate(&all_correct()).unwrap();
        assert!(result.all_correct());
    }

    #[test]
    fn test_not_an_object() {
        assert_eq!(validate(&json!([1, 2])), Err(SchemaError::NotAnObject));
        assert_eq!(validate(&json!("text")), Err(SchemaError::NotAnObject));
    }

    #[test]
    fn test_each_missing_facet_is_named() {
        for facet in Facet::ALL {
            let mut candidate = all_correct();
            candidate.as_object_mut().unwrap().remove(facet.key());
            let err = validate(&candidate).unwrap_err();
            assert_eq!(err, SchemaError::MissingFacet(facet));
            assert_eq!(err.field(), facet.key());
        }
    }

    #[test]
    fn test_presence_checked_before_shape() {
        // "who" is malformed, but "how" is missing: presence wins.
        let mut candidate = all_correct();
        let map = candidate.as_object_mut().unwrap();
        map.insert("who".into(), json!("oops"));
        map.remove("how");
        assert_eq!(validate(&candidate), Err(SchemaError::MissingFacet(Facet::How)));
    }

    #[test]
    fn test_facet_not_object() {
        let mut candidate = all_correct();
        candidate["what"] = json!(["correct"]);
        assert_eq!(
            validate(&candidate),
            Err(SchemaError::FacetNotAnObject(Facet::What))
        );
    }

    #[test]
    fn test_missing_verdict_and_justification() {
        let mut candidate = all_correct();
        candidate["when"] = json!({ "justification": "x" });
        let err = validate(&candidate).unwrap_err();
        assert_eq!(err.field(), "when.verdict");

        let mut candidate = all_correct();
        candidate["why"] = json!({ "verdict": "correct" });
        let err = validate(&candidate).unwrap_err();
        assert_eq!(err.field(), "why.justification");

        let mut candidate = all_correct();
        candidate["why"] = json!({ "verdict": "correct", "justification": 3 });
        assert!(matches!(
            validate(&candidate),
            Err(SchemaError::MissingField { facet: Facet::Why, field: "justification" })
        ));
    }

    #[test]
    fn test_invalid_verdict() {
        let mut candidate = all_correct();
        candidate["where"] = facet_json("mostly", "close enough");
        let err = validate(&candidate).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidVerdict { facet: Facet::Where, .. }));
        assert!(err.to_string().contains("\"mostly\""));
    }

    #[test]
    fn test_empty_justification_rejected_unless_correct() {
        let mut candidate = all_correct();
        candidate["how"] = facet_json("partial", "   ");
        assert_eq!(
            validate(&candidate),
            Err(SchemaError::EmptyJustification(Facet::How))
        );

        candidate["how"] = facet_json("partial", "method omitted");
        assert!(validate(&candidate).is_ok());
    }

    #[test]
    fn test_extra_keys_ignored() {
        let mut candidate = all_correct();
        candidate["confidence"] = json!(4);
        candidate["who"]["note"] = json!("extra");
        assert!(validate(&candidate).is_ok());
    }

    #[test]
    fn test_parameters_schema_is_valid_json_schema() {
        let schema = save_evaluation_parameters();
        let validator = jsonschema::options().build(&schema).unwrap();

        assert!(validator.is_valid(&all_correct()));

        let mut missing = all_correct();
        missing.as_object_mut().unwrap().remove("when");
        assert!(!validator.is_valid(&missing));

        let mut bad_verdict = all_correct();
        bad_verdict["who"] = facet_json("unsure", "x");
        assert!(!validator.is_valid(&bad_verdict));
    }

    fn verdict_strategy() -> impl Strategy<Value = Verdict> {
        prop_oneof![
            Just(Verdict::Correct),
            Just(Verdict::Partial),
            Just(Verdict::Incorrect),
        ]
    }

    proptest! {
        #[test]
        fn prop_valid_payload_round_trips(
            verdicts in proptest::collection::vec(verdict_strategy(), 6),
            texts in proptest::collection::vec("[a-z]{1,12}( [a-z]{1,12}){0,4}", 6),
        ) {
            let mut map = Map::new();
            for ((facet, verdict), text) in Facet::ALL.iter().zip(&verdicts).zip(&texts) {
                map.insert(facet.key().to_string(), facet_json(verdict.as_str(), text));
            }
            let candidate = Value::Object(map);

            let result = validate(&candidate).unwrap();
            prop_assert_eq!(serde_json::to_value(&result).unwrap(), candidate);
        }
    }
}
