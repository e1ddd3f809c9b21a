//! The preprocess, prepare, evaluate, validate chain.
//!
//! Each step can run on its own, reading the previous step's file from the
//! results directory, or chained with `all`, handing data forward in memory.
//! A failing step returns an error; files written by earlier steps remain.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use newsfacet_core::{build_review_batch, EvaluationOutcome, ReviewBatchInfo, Task};
use newsfacet_runtime::{
    ChatTransport, EvaluationRunner, Prompts, ProviderVariant, RunSummary, RunnerOptions,
};

use crate::config::AppConfig;
use crate::datasets::{dataset_for, DatasetAdapter, Document};
use crate::storage;

/// A pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Preprocess,
    Prepare,
    Evaluate,
    Validate,
    /// Every step in order
    All,
}

impl FromStr for Step {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "preprocess" => Ok(Step::Preprocess),
            "prepare" => Ok(Step::Prepare),
            "evaluate" => Ok(Step::Evaluate),
            "validate" => Ok(Step::Validate),
            "all" => Ok(Step::All),
            _ => bail!(
                "Unsupported step '{}'. Expected preprocess, prepare, evaluate, validate or all",
                s
            ),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Preprocess => "preprocess",
            Step::Prepare => "prepare",
            Step::Evaluate => "evaluate",
            Step::Validate => "validate",
            Step::All => "all",
        };
        f.write_str(name)
    }
}

/// Contents of a results file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsDocument {
    pub total_tokens: u64,
    pub results: Vec<EvaluationOutcome>,
}

impl ResultsDocument {
    pub fn new(results: Vec<EvaluationOutcome>) -> Self {
        let total_tokens = RunSummary::from_outcomes(&results).total_tokens;
        Self {
            total_tokens,
            results,
        }
    }
}

/// Files written by a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub documents: Option<PathBuf>,
    pub tasks: Option<PathBuf>,
    pub results: Option<PathBuf>,
    pub review: Option<PathBuf>,
}

/// Runs steps for one dataset and configuration.
pub struct Pipeline {
    config: AppConfig,
    dataset: Box<dyn DatasetAdapter>,
    transport: Arc<dyn ChatTransport>,
}

impl Pipeline {
    /// Fails if the configured dataset is unknown.
    pub fn new(config: AppConfig, transport: Arc<dyn ChatTransport>) -> Result<Self> {
        let dataset = dataset_for(&config.run.dataset)?;
        Ok(Self {
            config,
            dataset,
            transport,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn results_dir(&self) -> &Path {
        &self.config.paths.results_dir
    }

    fn limit(&self) -> Option<usize> {
        self.config.run.effective_limit()
    }

    /// Run `step`; `results` overrides the file a standalone validate reads.
    pub async fn run(&self, step: Step, results: Option<&Path>) -> Result<PipelineReport> {
        tracing::info!(dataset = self.dataset.name(), %step, "Pipeline started");
        let mut report = PipelineReport::default();

        match step {
            Step::Preprocess => {
                self.preprocess(&mut report)?;
            }
            Step::Prepare => {
                self.prepare(None, &mut report)?;
            }
            Step::Evaluate => {
                let results_path = self.evaluate(None, &mut report).await?;
                if self.config.validation.generate_review_task {
                    self.validate(Some(&results_path), None, &mut report)?;
                }
            }
            Step::Validate => {
                self.validate(results, None, &mut report)?;
            }
            Step::All => {
                let documents = self.preprocess(&mut report)?;
                let tasks = self.prepare(Some(documents), &mut report)?;
                let results_path = self.evaluate(Some(&tasks), &mut report).await?;
                if self.config.validation.generate_review_task {
                    self.validate(Some(&results_path), Some(&tasks), &mut report)?;
                }
            }
        }

        Ok(report)
    }

    /// Read raw dataset files and write the documents file.
    pub fn preprocess(&self, report: &mut PipelineReport) -> Result<Vec<Document>> {
        let mut documents = self
            .dataset
            .preprocess(&self.config.paths)
            .with_context(|| format!("Preprocess failed for {}", self.dataset.name()))?;
        if let Some(limit) = self.limit() {
            documents.truncate(limit);
        }

        let path = storage::documents_path(self.results_dir(), self.dataset.name());
        storage::write_json(&path, &documents)?;
        tracing::info!(
            documents = documents.len(),
            path = %path.display(),
            "Preprocess finished"
        );

        report.documents = Some(path);
        Ok(documents)
    }

    /// Expand documents into tasks and write the tasks file.
    ///
    /// Without `documents`, reads the file written by preprocess.
    pub fn prepare(
        &self,
        documents: Option<Vec<Document>>,
        report: &mut PipelineReport,
    ) -> Result<Vec<Task>> {
        let documents = match documents {
            Some(documents) => documents,
            None => {
                let path = storage::documents_path(self.results_dir(), self.dataset.name());
                storage::read_json(&path)
                    .context("No documents to prepare; run the preprocess step first")?
            }
        };

        let mut tasks = Vec::new();
        for document in &documents {
            tasks.extend(self.dataset.prepare(document)?);
            if self.limit().is_some_and(|limit| tasks.len() >= limit) {
                break;
            }
        }
        if let Some(limit) = self.limit() {
            tasks.truncate(limit);
        }

        let path = storage::tasks_path(self.results_dir(), self.dataset.name());
        storage::write_json(&path, &tasks)?;
        tracing::info!(tasks = tasks.len(), path = %path.display(), "Prepare finished");

        report.tasks = Some(path);
        Ok(tasks)
    }

    /// Judge every task and write the results file.
    ///
    /// Without `tasks`, reads the file written by prepare. Provider
    /// configuration is resolved before any task is sent.
    pub async fn evaluate(
        &self,
        tasks: Option<&[Task]>,
        report: &mut PipelineReport,
    ) -> Result<PathBuf> {
        let loaded;
        let tasks = match tasks {
            Some(tasks) => tasks,
            None => {
                let path = storage::tasks_path(self.results_dir(), self.dataset.name());
                loaded = storage::read_json::<Vec<Task>>(&path)
                    .context("No tasks to evaluate; run the prepare step first")?;
                &loaded[..]
            }
        };

        let prompts = Prompts::from_files(
            self.config.prompts.system_prompt_path.as_deref(),
            self.config.prompts.user_prompt_path.as_deref(),
        )?;
        let options = RunnerOptions {
            verbose: self.config.run.verbose,
            limit: self.limit(),
            max_attempts: self.config.llm.max_attempts,
        };
        let runner = EvaluationRunner::from_settings(
            &self.config.llm,
            self.transport.clone(),
            prompts,
            options,
        )?;

        let outcomes = runner.run(tasks).await;
        let summary = RunSummary::from_outcomes(&outcomes);
        let document = ResultsDocument::new(outcomes);

        let profile = runner.profile();
        let path = storage::result_filename(
            self.results_dir(),
            &self.config.run.environment,
            self.dataset.name(),
            &profile.name,
            &profile.model_identifier,
        );
        storage::write_json(&path, &document)?;
        tracing::info!(
            succeeded = summary.succeeded,
            failed = summary.failed(),
            total_tokens = document.total_tokens,
            path = %path.display(),
            "Evaluate finished"
        );

        report.results = Some(path.clone());
        Ok(path)
    }

    /// Build expert review items from a results file.
    ///
    /// Without `results`, uses the newest results file for the dataset.
    /// Without `tasks`, reads the file written by prepare.
    pub fn validate(
        &self,
        results: Option<&Path>,
        tasks: Option<&[Task]>,
        report: &mut PipelineReport,
    ) -> Result<PathBuf> {
        let results_path = match results {
            Some(path) => path.to_path_buf(),
            None => storage::latest_results_file(self.results_dir(), self.dataset.name())?
                .with_context(|| {
                    format!(
                        "No results file for {} in {}; run the evaluate step first",
                        self.dataset.name(),
                        self.results_dir().display()
                    )
                })?,
        };
        let document: ResultsDocument = storage::read_json(&results_path)?;

        let loaded;
        let tasks = match tasks {
            Some(tasks) => tasks,
            None => {
                let path = storage::tasks_path(self.results_dir(), self.dataset.name());
                loaded = storage::read_json::<Vec<Task>>(&path)
                    .context("Review items need the prepared tasks; run the prepare step first")?;
                &loaded[..]
            }
        };

        let llm = &self.config.llm;
        let variant = ProviderVariant::from_name(&llm.provider).ok();
        let info = ReviewBatchInfo {
            dataset: self.dataset.name().to_string(),
            environment: self.config.run.environment.clone(),
            provider: variant.map_or_else(|| llm.provider.clone(), |v| v.name().to_string()),
            model: llm
                .model
                .clone()
                .or_else(|| variant.map(|v| v.default_model().to_string()))
                .unwrap_or_default(),
            skipped: 0,
        };
        let batch = build_review_batch(info, tasks, &document.results);

        let path = storage::review_filename(&results_path);
        storage::write_json(&path, &batch)?;
        tracing::info!(
            items = batch.review_items.len(),
            skipped = batch.review_batch_info.skipped,
            path = %path.display(),
            "Validate finished"
        );

        report.review = Some(path.clone());
        Ok(path)
    }
}
