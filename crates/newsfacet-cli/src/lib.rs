//! # newsfacet-cli
//!
//! The `newsfacet` pipeline: read a news dataset, expand it into
//! evaluation tasks, have an LLM judge each 5W1H summary, and export the
//! successful judgments as expert review items.
//!
//! Step output lands in `paths.results_dir`:
//!
//! | Step | File |
//! |------|------|
//! | preprocess | `<DATASET>_documents.json` |
//! | prepare | `<DATASET>_tasks.json` |
//! | evaluate | `<timestamp>_<env>_<DATASET>_<provider>_<model>.json` |
//! | validate | `<results stem>_review.json` |

pub mod config;
pub mod datasets;
pub mod pipeline;
pub mod storage;

pub use config::{AppConfig, PathsConfig, PromptsConfig, RunConfig, ValidationConfig};
pub use datasets::{dataset_for, DatasetAdapter, Document};
pub use pipeline::{Pipeline, PipelineReport, ResultsDocument, Step};
