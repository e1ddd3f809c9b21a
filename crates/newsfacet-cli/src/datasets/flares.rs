//! FLARES: annotated 5W1H spans over Spanish news.
//!
//! Each line holds `{Id, Text, Tags[]}`. A document is kept only when it
//! has a reliable (`confiable`) tag for each of WHO, WHAT, WHEN and WHERE;
//! the earliest such tag by `Tag_Start` becomes the reference answer. The
//! annotations themselves are then judged as the extraction under review.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::fs;

use newsfacet_core::Task;

use super::{id_string, parse_jsonl, DatasetAdapter, Document};
use crate::config::PathsConfig;

/// Model name given to FLARES tasks.
pub const GROUND_TRUTH_MODEL: &str = "flares_ground_truth";

const RELIABLE: &str = "confiable";
const REQUIRED_LABELS: [&str; 4] = ["WHO", "WHAT", "WHEN", "WHERE"];
const NOT_SPECIFIED: &str = "No especificado";

/// Summary lines, in the order they are rendered.
const SUMMARY_FIELDS: [(&str, &str); 6] = [
    ("Qué", "What"),
    ("Quién", "Who"),
    ("Cuándo", "When"),
    ("Dónde", "Where"),
    ("Por qué", "Why"),
    ("Cómo", "How"),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct FlaresDataset;

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(rename = "Id")]
    id: Value,
    #[serde(rename = "Text", default)]
    text: Option<String>,
    #[serde(rename = "Tags", default)]
    tags: Vec<RawTag>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawTag {
    #[serde(rename = "5W1H_Label", default)]
    label: Option<String>,
    #[serde(rename = "Reliability_Label", default)]
    reliability: Option<String>,
    #[serde(rename = "Tag_Text", default)]
    text: Option<String>,
    #[serde(rename = "Tag_Start", default)]
    start: Option<i64>,
}

/// Title-case a label: `WHERE` becomes `Where`.
fn title_case(label: &str) -> String {
    let lower = label.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Select the earliest reliable tag per required label and flatten.
///
/// Returns `None` when any required label lacks a reliable tag.
fn select_and_flatten(entry: &RawEntry) -> Option<Document> {
    let mut document = Document::new();
    document.insert("Id".to_string(), entry.id.clone());
    document.insert(
        "Text".to_string(),
        entry.text.clone().map(Value::String).unwrap_or(Value::Null),
    );

    for label in REQUIRED_LABELS {
        let best = entry
            .tags
            .iter()
            .filter(|tag| tag.label.as_deref() == Some(label))
            .filter(|tag| tag.reliability.as_deref() == Some(RELIABLE))
            .min_by_key(|tag| tag.start.unwrap_or(i64::MAX))?;

        document.insert(
            title_case(label),
            best.text.clone().map(Value::String).unwrap_or(Value::Null),
        );
    }

    Some(document)
}

fn summary(document: &Document) -> String {
    SUMMARY_FIELDS
        .iter()
        .map(|(heading, key)| {
            let value = document
                .get(*key)
                .and_then(Value::as_str)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(NOT_SPECIFIED);
            format!("{}: {}", heading, value)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

impl DatasetAdapter for FlaresDataset {
    fn name(&self) -> &'static str {
        "FLARES"
    }

    fn preprocess(&self, paths: &PathsConfig) -> Result<Vec<Document>> {
        let files: Vec<_> = [&paths.flares_train, &paths.flares_trial]
            .into_iter()
            .flatten()
            .collect();
        if files.is_empty() {
            bail!(
                "Missing FLARES file paths in config ('paths.flares_train' and/or 'paths.flares_trial')"
            );
        }

        let mut entries = Vec::new();
        for path in files {
            let text = fs::read_to_string(path)
                .with_context(|| format!("FLARES dataset file not found at {}", path.display()))?;
            for raw in parse_jsonl(&text, "FLARES") {
                match serde_json::from_value::<RawEntry>(raw) {
                    Ok(entry) => entries.push(entry),
                    Err(e) => tracing::warn!(error = %e, "Skipped malformed FLARES entry"),
                }
            }
        }

        let total = entries.len();
        let documents: Vec<Document> = entries.iter().filter_map(select_and_flatten).collect();

        tracing::info!(
            entries = total,
            documents = documents.len(),
            "Preprocessed FLARES"
        );
        Ok(documents)
    }

    fn prepare(&self, document: &Document) -> Result<Vec<Task>> {
        let doc_id =
            id_string(document.get("Id")).ok_or_else(|| anyhow!("FLARES document without 'Id'"))?;
        let original_text = document
            .get("Text")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("FLARES document {} without 'Text'", doc_id))?;

        Ok(vec![Task::new(
            doc_id,
            original_text,
            summary(document),
            GROUND_TRUTH_MODEL,
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tag(label: &str, reliability: &str, text: &str, start: i64) -> Value {
        json!({
            "5W1H_Label": label,
            "Reliability_Label": reliability,
            "Tag_Text": text,
            "Tag_Start": start
        })
    }

    fn entry(tags: Vec<Value>) -> RawEntry {
        serde_json::from_value(json!({ "Id": 101, "Text": "Texto de la noticia.", "Tags": tags }))
            .unwrap()
    }

    fn complete_tags() -> Vec<Value> {
        vec![
            tag("WHO", "confiable", "el alcalde", 40),
            tag("WHO", "confiable", "el gobierno", 5),
            tag("WHO", "no confiable", "nadie", 0),
            tag("WHAT", "confiable", "inauguró el puente", 12),
            tag("WHEN", "confiable", "el lunes", 30),
            tag("WHERE", "confiable", "en Sevilla", 50),
        ]
    }

    #[test]
    fn test_selects_earliest_reliable_tag() {
        let document = select_and_flatten(&entry(complete_tags())).unwrap();

        assert_eq!(document["Who"], "el gobierno");
        assert_eq!(document["Where"], "en Sevilla");
        assert_eq!(document["Id"], 101);
        assert!(document.get("Why").is_none());
    }

    #[test]
    fn test_drops_documents_without_reliable_label() {
        let mut tags = complete_tags();
        tags.retain(|t| t["5W1H_Label"] != "WHEN");
        tags.push(tag("WHEN", "no confiable", "ayer", 3));

        assert!(select_and_flatten(&entry(tags)).is_none());
    }

    #[test]
    fn test_prepare_spanish_summary() {
        let document = select_and_flatten(&entry(complete_tags())).unwrap();
        let tasks = FlaresDataset.prepare(&document).unwrap();

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].doc_id, "101");
        assert_eq!(tasks[0].model_name, GROUND_TRUTH_MODEL);
        assert_eq!(
            tasks[0].summary_to_evaluate,
            "Qué: inauguró el puente\nQuién: el gobierno\nCuándo: el lunes\nDónde: en Sevilla\nPor qué: No especificado\nCómo: No especificado"
        );
    }

    #[test]
    fn test_preprocess_merges_train_and_trial() {
        let dir = tempfile::tempdir().unwrap();
        let line = json!({ "Id": "a", "Text": "t", "Tags": complete_tags() }).to_string();
        let sparse = json!({ "Id": "b", "Text": "t", "Tags": [] }).to_string();
        let train = dir.path().join("train.json");
        let trial = dir.path().join("trial.json");
        fs::write(&train, format!("{}\n{}\n", line, sparse)).unwrap();
        fs::write(&trial, format!("{}\n", line.replace("\"a\"", "\"c\""))).unwrap();

        let paths = PathsConfig {
            flares_train: Some(train),
            flares_trial: Some(trial),
            ..Default::default()
        };
        let documents = FlaresDataset.preprocess(&paths).unwrap();
        let ids: Vec<_> = documents.iter().map(|d| d["Id"].clone()).collect();
        assert_eq!(ids, vec![json!("a"), json!("c")]);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("WHERE"), "Where");
        assert_eq!(title_case(""), "");
    }
}
