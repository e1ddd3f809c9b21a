//! Dataset adapters: raw files to documents, documents to tasks.
//!
//! Documents are kept as JSON objects so that each dataset controls its own
//! shape and the preprocess output can be persisted and re-read verbatim.

use anyhow::{bail, Result};
use serde_json::{Map, Value};

use newsfacet_core::Task;

use crate::config::PathsConfig;

mod basse;
mod flares;

pub use basse::BasseDataset;
pub use flares::FlaresDataset;

/// One preprocessed source document.
pub type Document = Map<String, Value>;

/// Names accepted by [`dataset_for`].
pub const DATASETS: [&str; 2] = ["BASSE", "FLARES"];

/// Turns one dataset's raw files into tasks.
pub trait DatasetAdapter: Send + Sync {
    /// Canonical upper-case name.
    fn name(&self) -> &'static str;

    /// Read raw files into documents.
    fn preprocess(&self, paths: &PathsConfig) -> Result<Vec<Document>>;

    /// Expand one document into tasks.
    fn prepare(&self, document: &Document) -> Result<Vec<Task>>;
}

/// Look up a dataset by name, case-insensitively.
pub fn dataset_for(name: &str) -> Result<Box<dyn DatasetAdapter>> {
    match name.trim().to_uppercase().as_str() {
        "BASSE" => Ok(Box::new(BasseDataset)),
        "FLARES" => Ok(Box::new(FlaresDataset)),
        _ => bail!(
            "Unknown dataset '{}'. Available: {}",
            name,
            DATASETS.join(", ")
        ),
    }
}

/// Parse JSON Lines, skipping blank lines and logging undecodable ones.
pub(crate) fn parse_jsonl(text: &str, source: &str) -> Vec<Value> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(index, line)| match serde_json::from_str::<Value>(line.trim()) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(
                    source,
                    line = index + 1,
                    error = %e,
                    "Skipped line due to JSON decoding error"
                );
                None
            }
        })
        .collect()
}

/// A document identifier as text; numeric ids are rendered without quotes.
pub(crate) fn id_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_lookup() {
        assert_eq!(dataset_for("basse").unwrap().name(), "BASSE");
        assert_eq!(dataset_for(" Flares ").unwrap().name(), "FLARES");

        let err = dataset_for("squad").err().unwrap();
        assert!(err.to_string().contains("BASSE, FLARES"));
    }

    #[test]
    fn test_parse_jsonl_skips_bad_lines() {
        let values = parse_jsonl("{\"a\":1}\n\nnot json\n{\"a\":2}\n", "test");
        assert_eq!(values.len(), 2);
        assert_eq!(values[1]["a"], 2);
    }

    #[test]
    fn test_id_string() {
        assert_eq!(id_string(Some(&serde_json::json!(7))).as_deref(), Some("7"));
        assert_eq!(id_string(Some(&serde_json::json!("x1"))).as_deref(), Some("x1"));
        assert_eq!(id_string(Some(&Value::Null)), None);
        assert_eq!(id_string(None), None);
    }
}
