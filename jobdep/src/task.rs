/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Periodic task definitions and the task registry.
//!
//! ```text
//! config / caller ──► Task ──► TaskSet ──(job generator)──► JobSet
//!                     ↑ value          ↑ registry, Arc<Task> shared with jobs
//! ```
//!
//! # Ownership model
//! A [`Task`] is an immutable value: created once at configuration time and
//! never mutated.  Equality and hashing cover every field, so two tasks with
//! identical parameters are interchangeable.  The [`TaskSet`] wraps each task
//! in an `Arc` so that generated jobs can refer back to their task without
//! copying it; tasks never refer to their jobs, so no reference cycle exists.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{ConfigError, TimingWarning};
use crate::timing::{self, HyperperiodError};

// ── Task ──────────────────────────────────────────────────────────────────────

/// A periodic real-time task.  All times are in ticks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Task {
    /// Unique task name within a [`TaskSet`].
    pub name: String,

    /// Worst-case execution time.
    pub wcet: u64,

    /// Release period.  Must be positive.
    pub period: u64,

    /// Relative deadline.  Must be positive; may exceed `period`.
    pub deadline: u64,

    /// Release time of the first job.
    pub offset: u64,

    /// Ordering key for downstream schedulers.  Ties are broken by name.
    pub priority: i32,
}

impl Task {
    /// Create a task with zero offset and zero priority.
    pub fn new(name: impl Into<String>, wcet: u64, period: u64, deadline: u64) -> Self {
        Self {
            name: name.into(),
            wcet,
            period,
            deadline,
            offset: 0,
            priority: 0,
        }
    }

    /// Sets the release time of the first job.
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Check the hard invariants: non-empty name, positive period, positive
    /// deadline, and first-job times that fit in `u64`.
    ///
    /// `wcet > deadline` is **not** an error here; see
    /// [`Task::timing_warning`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::EmptyTaskName);
        }
        if self.period == 0 {
            return Err(ConfigError::ZeroPeriod {
                task: self.name.clone(),
            });
        }
        if self.deadline == 0 {
            return Err(ConfigError::ZeroDeadline {
                task: self.name.clone(),
            });
        }
        // End of the first job's data interval, the latest instant it defines
        let first_data_end = self
            .offset
            .checked_add(self.deadline.max(self.wcet))
            .and_then(|t| t.checked_add(self.period));
        if first_data_end.is_none() {
            return Err(ConfigError::TimeOverflow {
                task: self.name.clone(),
                job: 1,
            });
        }
        Ok(())
    }

    /// Returns a warning when the task can never meet its deadline in
    /// isolation (`wcet > deadline`).
    pub fn timing_warning(&self) -> Option<TimingWarning> {
        (self.wcet > self.deadline).then(|| TimingWarning::WcetExceedsDeadline {
            task: self.name.clone(),
            wcet: self.wcet,
            deadline: self.deadline,
        })
    }

    /// Priority order: ascending `priority`, then name.
    pub fn priority_cmp(&self, other: &Task) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Task({}, period={}, wcet={}, deadline={}, offset={}, priority={})",
            self.name, self.period, self.wcet, self.deadline, self.offset, self.priority
        )
    }
}

// ── TaskSet ───────────────────────────────────────────────────────────────────

/// Immutable registry of the tasks taking part in one analysis.
///
/// Guarantees: at least one task, unique names, every task valid.
/// Iteration follows declaration order.
#[derive(Debug, Clone)]
pub struct TaskSet {
    tasks: Vec<Arc<Task>>,
    index: HashMap<String, usize>,
}

impl TaskSet {
    /// Validate `tasks` and build the registry.
    ///
    /// # Errors
    /// * [`ConfigError::EmptyTaskSet`] – `tasks` is empty.
    /// * [`ConfigError::DuplicateTask`] – two tasks share a name.
    /// * any error from [`Task::validate`].
    pub fn new(tasks: Vec<Task>) -> Result<Self, ConfigError> {
        if tasks.is_empty() {
            return Err(ConfigError::EmptyTaskSet);
        }

        let mut index = HashMap::with_capacity(tasks.len());
        let mut stored = Vec::with_capacity(tasks.len());

        for task in tasks {
            task.validate()?;
            if index.contains_key(&task.name) {
                return Err(ConfigError::DuplicateTask { name: task.name });
            }
            if let Some(w) = task.timing_warning() {
                warn!(task = %task.name, "{w}");
            }
            debug!("Task registered: {task}");
            index.insert(task.name.clone(), stored.len());
            stored.push(Arc::new(task));
        }

        Ok(Self {
            tasks: stored,
            index,
        })
    }

    /// Look up a task by name.
    pub fn get(&self, name: &str) -> Option<&Arc<Task>> {
        self.index.get(name).map(|&i| &self.tasks[i])
    }

    /// Returns `true` if a task called `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Tasks in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().map(|t| t.as_ref())
    }

    /// Shared handles in declaration order.
    pub fn shared(&self) -> &[Arc<Task>] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Always `false` for a successfully constructed set.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks sorted by [`Task::priority_cmp`].
    pub fn by_priority(&self) -> Vec<&Task> {
        let mut v: Vec<&Task> = self.iter().collect();
        v.sort_by(|a, b| a.priority_cmp(b));
        v
    }

    /// LCM of all periods.
    pub fn hyperperiod(&self) -> Result<u64, HyperperiodError> {
        timing::hyperperiod(self.iter())
    }

    /// One [`TimingWarning::WcetExceedsDeadline`] per violating task.
    pub fn timing_warnings(&self) -> Vec<TimingWarning> {
        self.iter().filter_map(Task::timing_warning).collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
