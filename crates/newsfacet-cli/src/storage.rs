//! Persisted step output: file naming and JSON I/O.

use anyhow::{Context, Result};
use chrono::Local;
use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Timestamp prefix of results files.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

const REVIEW_SUFFIX: &str = "_review";

lazy_static! {
    /// Characters replaced by `_` in file name components
    static ref UNSAFE_NAME_CHARS: Regex = Regex::new(r"[/: ]").unwrap();

    /// `<timestamp>_<rest>.json`
    static ref RESULTS_FILE: Regex =
        Regex::new(r"^\d{4}-\d{2}-\d{2}_\d{2}-\d{2}-\d{2}_(?P<rest>.+)\.json$").unwrap();
}

pub fn timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Make a value safe to embed in a file name.
pub fn normalize_name(value: &str) -> String {
    UNSAFE_NAME_CHARS.replace_all(value, "_").into_owned()
}

/// `<DATASET>_documents.json`, written by preprocess.
pub fn documents_path(results_dir: &Path, dataset: &str) -> PathBuf {
    results_dir.join(format!("{}_documents.json", dataset.to_uppercase()))
}

/// `<DATASET>_tasks.json`, written by prepare.
pub fn tasks_path(results_dir: &Path, dataset: &str) -> PathBuf {
    results_dir.join(format!("{}_tasks.json", dataset.to_uppercase()))
}

/// `<timestamp>_<env>_<DATASET>_<provider>_<model>.json` for the current time.
pub fn result_filename(
    results_dir: &Path,
    environment: &str,
    dataset: &str,
    provider: &str,
    model: &str,
) -> PathBuf {
    result_filename_at(results_dir, &timestamp(), environment, dataset, provider, model)
}

/// Results file name for a given timestamp.
pub fn result_filename_at(
    results_dir: &Path,
    timestamp: &str,
    environment: &str,
    dataset: &str,
    provider: &str,
    model: &str,
) -> PathBuf {
    results_dir.join(format!(
        "{}_{}_{}_{}_{}.json",
        timestamp,
        normalize_name(environment),
        dataset.to_uppercase(),
        normalize_name(provider),
        normalize_name(model)
    ))
}

/// `<results stem>_review.json` next to the results file.
pub fn review_filename(results_file: &Path) -> PathBuf {
    let stem = results_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    results_file.with_file_name(format!("{}{}.json", stem, REVIEW_SUFFIX))
}

/// Newest results file for `dataset` in `results_dir`, by timestamp prefix.
pub fn latest_results_file(results_dir: &Path, dataset: &str) -> Result<Option<PathBuf>> {
    if !results_dir.exists() {
        return Ok(None);
    }

    let marker = format!("_{}_", dataset.to_uppercase());
    let entries = fs::read_dir(results_dir)
        .with_context(|| format!("Failed to list {}", results_dir.display()))?;

    let mut newest: Option<String> = None;
    for entry in entries {
        let name = entry?.file_name().to_string_lossy().into_owned();
        let Some(captures) = RESULTS_FILE.captures(&name) else {
            continue;
        };
        let rest = &captures["rest"];
        if rest.ends_with(REVIEW_SUFFIX) || !format!("_{}", rest).contains(&marker) {
            continue;
        }
        if newest.as_ref().map_or(true, |n| name > *n) {
            newest = Some(name);
        }
    }

    Ok(newest.map(|name| results_dir.join(name)))
}

/// Write pretty-printed JSON, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_filename_normalizes() {
        let path = result_filename_at(
            Path::new("results"),
            "2025-01-02_03-04-05",
            "dev",
            "basse",
            "openai",
            "org/model:v1 beta",
        );
        assert_eq!(
            path,
            Path::new("results/2025-01-02_03-04-05_dev_BASSE_openai_org_model_v1_beta.json")
        );
    }

    #[test]
    fn test_timestamp_shape() {
        let ts = timestamp();
        assert_eq!(ts.len(), "2025-01-02_03-04-05".len());
        assert!(RESULTS_FILE.is_match(&format!("{}_x.json", ts)));
    }

    #[test]
    fn test_review_filename() {
        let review = review_filename(Path::new("out/2025-01-02_03-04-05_dev_BASSE_openai_m.json"));
        assert_eq!(
            review,
            Path::new("out/2025-01-02_03-04-05_dev_BASSE_openai_m_review.json")
        );
    }

    #[test]
    fn test_latest_results_file() {
        let dir = tempfile::tempdir().unwrap();
        let names = [
            "2025-01-01_00-00-00_dev_BASSE_openai_m.json",
            "2025-03-01_00-00-00_dev_BASSE_openai_m.json",
            "2025-03-01_00-00-00_dev_BASSE_openai_m_review.json",
            "2025-06-01_00-00-00_dev_FLARES_openai_m.json",
            "BASSE_tasks.json",
        ];
        for name in names {
            fs::write(dir.path().join(name), "{}").unwrap();
        }

        let latest = latest_results_file(dir.path(), "basse").unwrap().unwrap();
        assert!(latest.ends_with("2025-03-01_00-00-00_dev_BASSE_openai_m.json"));

        assert!(latest_results_file(&dir.path().join("missing"), "BASSE")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_json_round_trip_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.json");
        write_json(&path, &vec!["a", "b"]).unwrap();

        let back: Vec<String> = read_json(&path).unwrap();
        assert_eq!(back, vec!["a", "b"]);
    }
}
