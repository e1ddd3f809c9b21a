//! YAML configuration for the pipeline.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use newsfacet_runtime::LlmSettings;

/// Files tried, in order, when no `--config` is given.
pub const DEFAULT_CONFIG_FILES: [&str; 2] = ["config.yaml", "config.example.yaml"];

/// Top-level configuration file.
#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub run: RunConfig,

    #[serde(default)]
    pub llm: LlmSettings,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub prompts: PromptsConfig,

    #[serde(default)]
    pub validation: ValidationConfig,
}

/// The `run:` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_dataset")]
    pub dataset: String,

    #[serde(default = "default_step")]
    pub step: String,

    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default = "default_verbose")]
    pub verbose: bool,

    /// Caps documents at preprocess and tasks at prepare; 0 means no limit
    #[serde(default)]
    pub limit: Option<usize>,
}

fn default_dataset() -> String {
    "BASSE".to_string()
}

fn default_step() -> String {
    "all".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_verbose() -> bool {
    true
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            dataset: default_dataset(),
            step: default_step(),
            environment: default_environment(),
            verbose: default_verbose(),
            limit: None,
        }
    }
}

impl RunConfig {
    /// The effective limit, with zero treated as unset.
    pub fn effective_limit(&self) -> Option<usize> {
        self.limit.filter(|&n| n > 0)
    }
}

/// The `paths:` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,

    #[serde(default)]
    pub basse_jsonl: Option<PathBuf>,

    #[serde(default)]
    pub flares_train: Option<PathBuf>,

    #[serde(default)]
    pub flares_trial: Option<PathBuf>,
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            results_dir: default_results_dir(),
            basse_jsonl: None,
            flares_train: None,
            flares_trial: None,
        }
    }
}

/// The `prompts:` section. Built-in prompts are used for unset paths.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromptsConfig {
    #[serde(default)]
    pub system_prompt_path: Option<PathBuf>,

    #[serde(default)]
    pub user_prompt_path: Option<PathBuf>,
}

/// The `validation:` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationConfig {
    /// Write the expert review file after every evaluate, standalone or chained
    #[serde(default = "default_generate_review_task")]
    pub generate_review_task: bool,
}

fn default_generate_review_task() -> bool {
    true
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            generate_review_task: default_generate_review_task(),
        }
    }
}

impl AppConfig {
    /// Parse configuration from YAML text. An empty document yields defaults.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).context("Invalid configuration YAML")
    }

    /// Load an explicit file, or the first default file found in `dir`.
    ///
    /// Returns the configuration and the file it came from.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<(Self, PathBuf)> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file not found: {}", path.display());
                }
                path.to_path_buf()
            }
            None => match DEFAULT_CONFIG_FILES
                .iter()
                .map(|name| dir.join(name))
                .find(|p| p.exists())
            {
                Some(path) => path,
                None => bail!(
                    "No configuration file found. Create {} or copy {}",
                    DEFAULT_CONFIG_FILES[0],
                    DEFAULT_CONFIG_FILES[1]
                ),
            },
        };

        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_yaml_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok((config, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_full_config() {
        let yaml = r#"
run:
  dataset: flares
  step: evaluate
  environment: production
  verbose: false
  limit: 5
llm:
  provider: gemini
  model: gemini-2.5-flash
  timeout: 90s
  max_attempts: 3
paths:
  results_dir: out
  flares_train: data/flares/train.json
validation:
  generate_review_task: false
"#;
        let config = AppConfig::from_yaml_str(yaml).unwrap();

        assert_eq!(config.run.dataset, "flares");
        assert_eq!(config.run.effective_limit(), Some(5));
        assert!(!config.run.verbose);
        assert_eq!(config.llm.provider, "gemini");
        assert_eq!(config.llm.timeout, Duration::from_secs(90));
        assert_eq!(config.llm.max_attempts, 3);
        assert_eq!(config.paths.results_dir, PathBuf::from("out"));
        assert!(config.paths.basse_jsonl.is_none());
        assert!(!config.validation.generate_review_task);
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_yaml_str("").unwrap();
        assert_eq!(config.run.dataset, "BASSE");
        assert_eq!(config.run.step, "all");
        assert!(config.run.verbose);
        assert_eq!(config.llm.provider, "openai");
        assert!(config.validation.generate_review_task);

        let partial = AppConfig::from_yaml_str("run:\n  limit: 0\n").unwrap();
        assert_eq!(partial.run.effective_limit(), None);
    }

    #[test]
    fn test_load_falls_back_to_example() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.example.yaml"), "run:\n  dataset: FLARES\n").unwrap();

        let (config, path) = AppConfig::load(None, dir.path()).unwrap();
        assert_eq!(config.run.dataset, "FLARES");
        assert!(path.ends_with("config.example.yaml"));

        fs::write(dir.path().join("config.yaml"), "run:\n  dataset: BASSE\n").unwrap();
        let (config, _) = AppConfig::load(None, dir.path()).unwrap();
        assert_eq!(config.run.dataset, "BASSE");
    }

    #[test]
    fn test_load_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::load(None, dir.path()).is_err());
        assert!(AppConfig::load(Some(&dir.path().join("nope.yaml")), dir.path()).is_err());
    }
}
