/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error and warning types.
//!
//! Four layers:
//!
//! * [`ConfigError`] – invalid task set or dependency declaration; detected
//!   at build time, nothing is computed on invalid input.
//! * [`GraphError`] – tree materialisation failed (ambiguous parent or
//!   cycle).  The edge index itself stays valid.
//! * [`AnalysisError`] – top-level failure of
//!   [`run_analysis()`](crate::analysis::run_analysis).
//! * [`TimingWarning`] – non-fatal timing problems reported alongside a
//!   (possibly degraded) result.
//!
//! Every variant carries the task or job identifiers involved so that the
//! caller can log it as a structured `tracing` event without re-parsing the
//! message.

use std::fmt;

use thiserror::Error;

use crate::job::JobKey;
use crate::timing::HyperperiodError;

// ── Configuration errors ──────────────────────────────────────────────────────

/// Side of a dependency declaration that referenced an unknown task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyRole {
    Producer,
    Consumer,
}

impl fmt::Display for DependencyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyRole::Producer => write!(f, "producer"),
            DependencyRole::Consumer => write!(f, "consumer"),
        }
    }
}

/// Invalid task set or dependency declaration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The task set contains no task.
    #[error("task set is empty")]
    EmptyTaskSet,

    /// A task was declared without a name.
    #[error("task name must not be empty")]
    EmptyTaskName,

    /// Two tasks share the same name.
    #[error("duplicate task name '{name}'")]
    DuplicateTask { name: String },

    /// A task declares `period == 0`.
    #[error("task '{task}' has a non-positive period")]
    ZeroPeriod { task: String },

    /// A task declares `deadline == 0`.
    #[error("task '{task}' has a non-positive deadline")]
    ZeroDeadline { task: String },

    /// Release, deadline or data-interval end of a job does not fit in
    /// `u64`.
    #[error("timing of job {job} of task '{task}' overflows u64")]
    TimeOverflow { task: String, job: u64 },

    /// Job ids start at 1.
    #[error("task '{task}' has no job 0; job ids start at 1")]
    ZeroJobId { task: String },

    /// The horizon expands to more jobs than the configured limit.
    #[error("horizon {horizon} yields more than {limit} jobs")]
    TooManyJobs { horizon: u64, limit: u64 },

    /// A dependency declaration names a task that is not in the task set.
    #[error("dependency {producer} -> {consumer} references unknown {role} task '{name}'")]
    UnknownTask {
        name: String,
        role: DependencyRole,
        producer: String,
        consumer: String,
    },
}

// ── Graph errors ──────────────────────────────────────────────────────────────

fn display_path(path: &[JobKey]) -> String {
    path.iter()
        .map(JobKey::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Failure to materialise a tree view over the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A job has several predecessors and the strict parent rule was
    /// requested.
    #[error("{job} has several predecessors ({}); a parent rule is required", display_path(.predecessors))]
    Ambiguous {
        job: JobKey,
        predecessors: Vec<JobKey>,
    },

    /// The graph contains a cycle.  `path` starts and ends with the same job.
    #[error("cyclic dependency: {}", display_path(.path))]
    Cycle { path: Vec<JobKey> },
}

// ── Top-level analysis errors ─────────────────────────────────────────────────

/// Error returned by [`run_analysis()`](crate::analysis::run_analysis).
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("hyperperiod: {0}")]
    Hyperperiod(#[from] HyperperiodError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

// ── Warnings ──────────────────────────────────────────────────────────────────

/// Non-fatal timing problem.  Analysis proceeds; the affected part of the
/// result may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimingWarning {
    /// The task's execution time exceeds its relative deadline, so its read
    /// interval is empty.
    WcetExceedsDeadline { task: String, wcet: u64, deadline: u64 },

    /// The task's offset is at or beyond the horizon; it has no job.
    NoJobsInHorizon { task: String, offset: u64, horizon: u64 },

    /// No producer job delivers data inside the consumer job's read window.
    NoProducerData { producer: String, consumer: JobKey },

    /// A declared dependency produced no job-level edge at all.
    DependencyWithoutEdges { producer: String, consumer: String },

    /// The hyperperiod was replaced by the configured cap.
    HorizonCapped { hyperperiod: Option<u64>, cap: u64 },
}

impl fmt::Display for TimingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimingWarning::WcetExceedsDeadline {
                task,
                wcet,
                deadline,
            } => write!(
                f,
                "task '{task}' wcet {wcet} exceeds its deadline {deadline}"
            ),
            TimingWarning::NoJobsInHorizon {
                task,
                offset,
                horizon,
            } => write!(
                f,
                "task '{task}' offset {offset} is not before horizon {horizon}; no jobs generated"
            ),
            TimingWarning::NoProducerData { producer, consumer } => write!(
                f,
                "no job of '{producer}' provides data in the read interval of {consumer}"
            ),
            TimingWarning::DependencyWithoutEdges { producer, consumer } => write!(
                f,
                "dependency {producer} -> {consumer} yields no job-level dependency"
            ),
            TimingWarning::HorizonCapped { hyperperiod, cap } => match hyperperiod {
                Some(h) => write!(f, "hyperperiod {h} capped to {cap}"),
                None => write!(f, "hyperperiod overflows; horizon capped to {cap}"),
            },
        }
    }
}
