//! Workload file loading.
//!
//! A workload file describes one task set, its task-level dependencies and
//! the analysis settings:
//! ```yaml
//! time_base_us: 1
//! horizon: 40              # fixed horizon; omit for one hyperperiod
//! horizon_cap: 1000000     # alternative: hyperperiod, capped
//! hyperperiod_limit: 3600000000
//! job_limit: 10000000
//! overlap_rule: data_at_release
//! parent_rule: earliest_release
//! tasks:
//!   - { name: A, wcet: 5, period: 20, deadline: 15, offset: 0, priority: 1 }
//!   - { name: B, wcet: 3, period: 10 }
//! dependencies:
//!   - { producer: A, consumer: B }
//! ```

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::analysis::AnalysisConfig;
use crate::dependency::{DependencyDecl, OverlapRule};
use crate::error::ConfigError;
use crate::graph::ParentRule;
use crate::job::Horizon;
use crate::task::{Task, TaskSet};
use crate::timing::{DEFAULT_HYPERPERIOD_LIMIT, DEFAULT_JOB_LIMIT, DEFAULT_TIME_BASE_US};

// ── Private YAML deserialization types ────────────────────────────────────────

/// Maps directly onto the YAML file layout.  Callers use [`WorkloadConfig`].
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WorkloadFile {
    #[serde(default = "default_time_base_us")]
    time_base_us: u64,
    horizon: Option<u64>,
    horizon_cap: Option<u64>,
    #[serde(default = "default_hyperperiod_limit")]
    hyperperiod_limit: u64,
    #[serde(default = "default_job_limit")]
    job_limit: u64,
    #[serde(default)]
    overlap_rule: OverlapRule,
    #[serde(default)]
    parent_rule: ParentRule,
    #[serde(default)]
    tasks: Vec<TaskEntry>,
    #[serde(default)]
    dependencies: Vec<DependencyDecl>,
}

/// Per-task fields as they appear in the YAML file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TaskEntry {
    name: String,
    wcet: u64,
    period: u64,
    /// Defaults to `period` (implicit deadline).
    deadline: Option<u64>,
    #[serde(default)]
    offset: u64,
    #[serde(default)]
    priority: i32,
}

fn default_time_base_us() -> u64 {
    DEFAULT_TIME_BASE_US
}

fn default_hyperperiod_limit() -> u64 {
    DEFAULT_HYPERPERIOD_LIMIT
}

fn default_job_limit() -> u64 {
    DEFAULT_JOB_LIMIT
}

impl From<TaskEntry> for Task {
    fn from(entry: TaskEntry) -> Self {
        let deadline = entry.deadline.unwrap_or(entry.period);
        Task::new(entry.name, entry.wcet, entry.period, deadline)
            .with_offset(entry.offset)
            .with_priority(entry.priority)
    }
}

// ── WorkloadConfig ────────────────────────────────────────────────────────────

/// A parsed workload: tasks, dependency declarations and analysis settings.
///
/// Parsing only checks the file layout.  Semantic checks (duplicate names,
/// zero periods, unknown dependency endpoints) happen in
/// [`task_set`](Self::task_set) and the analysis pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadConfig {
    tasks: Vec<Task>,
    dependencies: Vec<DependencyDecl>,
    analysis: AnalysisConfig,
}

impl WorkloadConfig {
    /// Read and parse the workload file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, if the YAML is
    /// structurally invalid, or if the analysis settings are inconsistent.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading workload from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open workload file: {}", path.display()))?;

        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse workload file: {}", path.display()))
    }

    /// Parse a workload from YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: WorkloadFile =
            serde_yaml::from_str(content).context("Invalid workload YAML")?;

        if file.time_base_us == 0 {
            bail!("time_base_us must be positive");
        }
        let horizon = match (file.horizon, file.horizon_cap) {
            (Some(_), Some(_)) => bail!("horizon and horizon_cap are mutually exclusive"),
            (Some(ticks), None) => Horizon::Fixed(ticks),
            (None, Some(cap)) => Horizon::HyperperiodCapped(cap),
            (None, None) => Horizon::Hyperperiod,
        };

        let tasks: Vec<Task> = file.tasks.into_iter().map(Task::from).collect();
        for task in &tasks {
            debug!("  {task}");
        }
        for decl in &file.dependencies {
            debug!("  dependency: {decl}");
        }

        info!(
            task_count = tasks.len(),
            dependency_count = file.dependencies.len(),
            horizon = ?horizon,
            "Workload loaded"
        );

        Ok(Self {
            tasks,
            dependencies: file.dependencies,
            analysis: AnalysisConfig {
                horizon,
                hyperperiod_limit: file.hyperperiod_limit,
                job_limit: file.job_limit,
                overlap_rule: file.overlap_rule,
                parent_rule: file.parent_rule,
                time_base_us: file.time_base_us,
            },
        })
    }

    /// Tasks in file order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Build a validated [`TaskSet`] from the declared tasks.
    pub fn task_set(&self) -> Result<TaskSet, ConfigError> {
        TaskSet::new(self.tasks.clone())
    }

    pub fn declarations(&self) -> &[DependencyDecl] {
        &self.dependencies
    }

    pub fn analysis_config(&self) -> &AnalysisConfig {
        &self.analysis
    }

    /// Mutable settings, for command-line overrides.
    pub fn analysis_config_mut(&mut self) -> &mut AnalysisConfig {
        &mut self.analysis
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
