//! # newsfacet-core
//!
//! Data model and schema validation for judging 5W1H extractions.
//!
//! This crate answers one question for the rest of the workspace: is a
//! piece of model output a well-formed evaluation? It never performs I/O.
//!
//! ## Key Guarantees
//!
//! 1. **Validated or rejected**: an [`EvaluationResult`] built from model
//!    output has passed [`schema::validate`]
//! 2. **Fail-fast**: a rejected candidate reports the first offending field
//! 3. **One wire contract**: the `save_evaluation` parameter schema sent to
//!    providers is derived from the same facet and verdict definitions
//!
//! ## Example
//!
//! ```rust,ignore
//! use newsfacet_core::{schema, SchemaError};
//!
//! let candidate: serde_json::Value = serde_json::from_str(arguments)?;
//! match schema::validate(&candidate) {
//!     Ok(result) => println!("all correct: {}", result.all_correct()),
//!     Err(e) => println!("rejected at {}: {}", e.field(), e),
//! }
//! ```

pub mod model;
pub mod outcome;
pub mod review;
pub mod schema;

pub use model::{EvaluationResult, Facet, FacetJudgment, Task, Verdict};
pub use outcome::{ErrorKind, EvaluationOutcome, OutcomeStatus, TokenUsage};
pub use review::{build_review_batch, build_review_task, ReviewBatch, ReviewBatchInfo, ReviewTask};
pub use schema::{
    save_evaluation_parameters, validate, SchemaError, SAVE_EVALUATION,
    SAVE_EVALUATION_DESCRIPTION,
};
