//! BASSE: one JSON object per line with summaries from several models.
//!
//! ```json
//! {"idx": 3, "round": 1, "original_document": "...",
//!  "model_extractions": {"gpt4o-5w1h": {"summ": "..."}, ...}}
//! ```

use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::fs;

use newsfacet_core::Task;

use super::{id_string, parse_jsonl, DatasetAdapter, Document};
use crate::config::PathsConfig;

const SUMMARY_SUFFIX: &str = "_summ";
const MODEL_SUFFIX: &str = "-5w1h";

#[derive(Debug, Clone, Copy, Default)]
pub struct BasseDataset;

/// Flatten one raw line into `{idx, round, original_document, <model>_summ...}`.
fn flatten(raw: &Value) -> Option<Document> {
    let object = raw.as_object()?;

    let mut document = Document::new();
    for key in ["idx", "round", "original_document"] {
        document.insert(key.to_string(), object.get(key).cloned().unwrap_or(Value::Null));
    }

    if let Some(extractions) = object.get("model_extractions").and_then(Value::as_object) {
        for (model, extraction) in extractions {
            let summary = extraction.get("summ").cloned().unwrap_or(Value::Null);
            document.insert(format!("{}{}", model, SUMMARY_SUFFIX), summary);
        }
    }

    Some(document)
}

fn model_name(key: &str) -> Option<&str> {
    let model = key.strip_suffix(SUMMARY_SUFFIX)?;
    Some(model.strip_suffix(MODEL_SUFFIX).unwrap_or(model))
}

impl DatasetAdapter for BasseDataset {
    fn name(&self) -> &'static str {
        "BASSE"
    }

    fn preprocess(&self, paths: &PathsConfig) -> Result<Vec<Document>> {
        let path = paths
            .basse_jsonl
            .as_ref()
            .ok_or_else(|| anyhow!("Missing 'paths.basse_jsonl' in config for BASSE dataset"))?;
        let text = fs::read_to_string(path)
            .with_context(|| format!("BASSE dataset file not found at {}", path.display()))?;

        let documents: Vec<Document> = parse_jsonl(&text, "BASSE")
            .iter()
            .filter_map(|raw| {
                let document = flatten(raw);
                if document.is_none() {
                    tracing::warn!("Skipped BASSE line that is not a JSON object");
                }
                document
            })
            .collect();

        tracing::info!(documents = documents.len(), "Preprocessed BASSE");
        Ok(documents)
    }

    fn prepare(&self, document: &Document) -> Result<Vec<Task>> {
        let doc_id = id_string(document.get("idx"))
            .ok_or_else(|| anyhow!("BASSE document without 'idx'"))?;
        let original_text = document
            .get("original_document")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("BASSE document {} without 'original_document'", doc_id))?;

        let tasks = document
            .iter()
            .filter_map(|(key, value)| {
                let model = model_name(key)?;
                let summary = match value {
                    Value::Null => return None,
                    Value::String(s) if s.trim().is_empty() => return None,
                    Value::String(s) => s.clone(),
                    other => serde_json::to_string_pretty(other).ok()?,
                };
                Some(Task::new(doc_id.clone(), original_text, summary, model))
            })
            .collect();

        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_line() -> Value {
        json!({
            "idx": 12,
            "round": 2,
            "original_document": "El ayuntamiento aprobó el presupuesto.",
            "model_extractions": {
                "gpt4o-5w1h": { "summ": "WHO: el ayuntamiento" },
                "claude-5w1h": { "summ": "WHAT: aprobó el presupuesto" },
                "reka-5w1h": { "summ": null },
                "llama3-5w1h": {}
            }
        })
    }

    #[test]
    fn test_flatten() {
        let document = flatten(&raw_line()).unwrap();
        assert_eq!(document["idx"], 12);
        assert_eq!(document["gpt4o-5w1h_summ"], "WHO: el ayuntamiento");
        assert_eq!(document["llama3-5w1h_summ"], Value::Null);
        assert!(flatten(&json!([1, 2])).is_none());
    }

    #[test]
    fn test_prepare_one_task_per_summary() {
        let document = flatten(&raw_line()).unwrap();
        let tasks = BasseDataset.prepare(&document).unwrap();

        let mut models: Vec<&str> = tasks.iter().map(|t| t.model_name.as_str()).collect();
        models.sort_unstable();
        assert_eq!(models, vec!["claude", "gpt4o"]);
        assert!(tasks.iter().all(|t| t.doc_id == "12"));

        let gpt4o = tasks.iter().find(|t| t.model_name == "gpt4o").unwrap();
        assert_eq!(gpt4o.summary_to_evaluate, "WHO: el ayuntamiento");
    }

    #[test]
    fn test_preprocess_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BASSE.jsonl");
        fs::write(&path, format!("{}\n{{broken\n{}\n", raw_line(), raw_line())).unwrap();

        let paths = PathsConfig {
            basse_jsonl: Some(path),
            ..Default::default()
        };
        assert_eq!(BasseDataset.preprocess(&paths).unwrap().len(), 2);
    }

    #[test]
    fn test_preprocess_requires_path() {
        let err = BasseDataset.preprocess(&PathsConfig::default()).unwrap_err();
        assert!(err.to_string().contains("paths.basse_jsonl"));
    }

    #[test]
    fn test_model_name() {
        assert_eq!(model_name("gpt4o-5w1h_summ"), Some("gpt4o"));
        assert_eq!(model_name("custom_summ"), Some("custom"));
        assert_eq!(model_name("original_document"), None);
    }
}
