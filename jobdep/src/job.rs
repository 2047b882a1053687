/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Job instances and the job generator.
//!
//! A [`Job`] is one release of a periodic [`Task`].  For job `k` (1-based):
//!
//! ```text
//! release        = (k − 1) × period + offset
//! deadline       = release + task.deadline
//! read interval  = [release,        deadline − wcet]    input may be consumed
//! data interval  = [release + wcet, deadline + period]  output is available
//! ```
//!
//! A task with `wcet > deadline` has no read interval at all: there is no
//! instant at which its jobs can consume input and still finish in time.
//!
//! [`generate_jobs`] expands every task of a [`TaskSet`] into all jobs
//! released strictly before the horizon.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{ConfigError, TimingWarning};
use crate::task::{Task, TaskSet};
use crate::timing::{
    self, calculate_hyperperiod, HyperperiodError, DEFAULT_JOB_LIMIT, DEFAULT_TIME_BASE_US,
};

// ── JobKey ────────────────────────────────────────────────────────────────────

/// Identity of a job: task name plus 1-based sequence id.
///
/// Task names are unique within a [`TaskSet`], so the key identifies the job
/// within one analysis run.  Ordering is by task name, then id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobKey {
    task: Arc<str>,
    id: u64,
}

impl JobKey {
    pub fn new(task: impl Into<Arc<str>>, id: u64) -> Self {
        Self {
            task: task.into(),
            id,
        }
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Job({}, {})", self.task, self.id)
    }
}

// ── Interval ──────────────────────────────────────────────────────────────────

/// Closed tick interval `[start, end]`.  Empty when `end < start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: u64,
    pub end: u64,
}

impl Interval {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    pub fn contains(&self, t: u64) -> bool {
        self.start <= t && t <= self.end
    }

    /// `true` if both intervals are non-empty and share at least one tick.
    pub fn intersects(&self, other: &Interval) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.start <= other.end
            && other.start <= self.end
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

// ── Job ───────────────────────────────────────────────────────────────────────

/// One concrete release of a task.
///
/// Immutable after construction.  Holds a shared handle to its task; the
/// dependency relations of a job live in
/// [`DependencyGraph`](crate::graph::DependencyGraph), not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    key: JobKey,
    task: Arc<Task>,
    release: u64,
    deadline: u64,
    read_interval: Option<Interval>,
    data_interval: Interval,
}

impl Job {
    /// Build job `id` (≥ 1) of `task`.
    ///
    /// # Errors
    /// [`ConfigError::ZeroJobId`] for `id == 0`, [`ConfigError::TimeOverflow`]
    /// when one of the job's instants does not fit in `u64`.
    pub fn new(task: Arc<Task>, id: u64) -> Result<Self, ConfigError> {
        let name: Arc<str> = Arc::from(task.name.as_str());
        Self::with_name(task, name, id)
    }

    fn with_name(task: Arc<Task>, name: Arc<str>, id: u64) -> Result<Self, ConfigError> {
        let Some(index) = id.checked_sub(1) else {
            return Err(ConfigError::ZeroJobId {
                task: task.name.clone(),
            });
        };
        let overflow = || ConfigError::TimeOverflow {
            task: task.name.clone(),
            job: id,
        };

        let release = index
            .checked_mul(task.period)
            .and_then(|t| t.checked_add(task.offset))
            .ok_or_else(overflow)?;
        let deadline = release.checked_add(task.deadline).ok_or_else(overflow)?;
        let data_start = release.checked_add(task.wcet).ok_or_else(overflow)?;
        let data_end = deadline.checked_add(task.period).ok_or_else(overflow)?;

        let read_interval =
            (task.wcet <= task.deadline).then(|| Interval::new(release, deadline - task.wcet));

        Ok(Self {
            key: JobKey { task: name, id },
            task,
            release,
            deadline,
            read_interval,
            data_interval: Interval::new(data_start, data_end),
        })
    }

    pub fn key(&self) -> &JobKey {
        &self.key
    }

    pub fn id(&self) -> u64 {
        self.key.id
    }

    pub fn task(&self) -> &Arc<Task> {
        &self.task
    }

    pub fn release(&self) -> u64 {
        self.release
    }

    /// Absolute deadline.
    pub fn deadline(&self) -> u64 {
        self.deadline
    }

    /// `None` when the task's wcet exceeds its relative deadline.
    pub fn read_interval(&self) -> Option<Interval> {
        self.read_interval
    }

    pub fn data_interval(&self) -> Interval {
        self.data_interval
    }

    /// Display this job with times rendered in the given time base.
    pub fn display_with(&self, time_base_us: u64) -> JobDisplay<'_> {
        JobDisplay {
            job: self,
            time_base_us,
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.display_with(DEFAULT_TIME_BASE_US), f)
    }
}

/// Returned by [`Job::display_with`].
pub struct JobDisplay<'a> {
    job: &'a Job,
    time_base_us: u64,
}

impl fmt::Display for JobDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: r = {}, d = {}",
            self.job.key,
            timing::format_time(self.job.release, self.time_base_us),
            timing::format_time(self.job.deadline, self.time_base_us),
        )
    }
}

// ── Horizon ───────────────────────────────────────────────────────────────────

/// How far job generation extends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Horizon {
    /// One hyperperiod; fails if it exceeds the configured limit.
    #[default]
    Hyperperiod,

    /// A fixed number of ticks.
    Fixed(u64),

    /// One hyperperiod, or the cap if the hyperperiod is larger or does not
    /// fit in `u64`.
    HyperperiodCapped(u64),
}

/// Outcome of [`resolve_horizon`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHorizon {
    /// Horizon in ticks.
    pub ticks: u64,

    /// Hyperperiod, when it could be computed within the limit.
    pub hyperperiod: Option<u64>,

    /// Set when the hyperperiod was replaced by a cap.
    pub warning: Option<TimingWarning>,
}

/// Turn a [`Horizon`] into a tick count no larger than `limit`.
///
/// # Errors
/// * [`Horizon::Hyperperiod`]: any [`HyperperiodError`], including
///   `TooLarge` against `limit`.
/// * [`Horizon::Fixed`]: `HorizonTooLarge` above `limit`.
/// * [`Horizon::HyperperiodCapped`]: `HorizonTooLarge` when the capped value
///   is above `limit`; a hyperperiod overflow is absorbed by the cap.
pub fn resolve_horizon(
    tasks: &TaskSet,
    horizon: Horizon,
    limit: u64,
) -> Result<ResolvedHorizon, HyperperiodError> {
    let resolved = match horizon {
        Horizon::Hyperperiod => {
            let info = calculate_hyperperiod(tasks.iter(), limit)?;
            ResolvedHorizon {
                ticks: info.hyperperiod,
                hyperperiod: Some(info.hyperperiod),
                warning: None,
            }
        }
        Horizon::Fixed(ticks) => ResolvedHorizon {
            ticks,
            hyperperiod: calculate_hyperperiod(tasks.iter(), u64::MAX)
                .ok()
                .map(|i| i.hyperperiod),
            warning: None,
        },
        Horizon::HyperperiodCapped(cap) => {
            let (hyperperiod, capped) = match calculate_hyperperiod(tasks.iter(), u64::MAX) {
                Ok(info) => (Some(info.hyperperiod), info.hyperperiod > cap),
                Err(HyperperiodError::Overflow { a, b }) => {
                    debug!(a, b, "hyperperiod overflows u64");
                    (None, true)
                }
                Err(e) => return Err(e),
            };
            if capped {
                let warning = TimingWarning::HorizonCapped { hyperperiod, cap };
                warn!(cap, "{warning}");
                ResolvedHorizon {
                    ticks: cap,
                    hyperperiod,
                    warning: Some(warning),
                }
            } else {
                ResolvedHorizon {
                    ticks: hyperperiod.unwrap_or(cap),
                    hyperperiod,
                    warning: None,
                }
            }
        }
    };

    if resolved.ticks > limit {
        warn!(horizon = resolved.ticks, limit, "Horizon exceeds configured limit");
        return Err(HyperperiodError::HorizonTooLarge {
            horizon: resolved.ticks,
            limit,
        });
    }
    Ok(resolved)
}

// ── JobSet ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct TaskJobs {
    task: Arc<Task>,
    jobs: Vec<Job>,
}

/// Every job of a task set over one horizon, grouped per task in
/// declaration order.
#[derive(Debug, Clone)]
pub struct JobSet {
    horizon: u64,
    per_task: Vec<TaskJobs>,
    index: HashMap<String, usize>,
}

impl JobSet {
    /// Horizon the jobs were generated for, in ticks.
    pub fn horizon(&self) -> u64 {
        self.horizon
    }

    /// Look up a job by key.
    pub fn job(&self, key: &JobKey) -> Option<&Job> {
        let i = *self.index.get(key.task())?;
        let pos = usize::try_from(key.id().checked_sub(1)?).ok()?;
        self.per_task[i].jobs.get(pos)
    }

    /// Jobs of one task in release order.  Empty for unknown tasks.
    pub fn jobs_of(&self, task: &str) -> &[Job] {
        self.index
            .get(task)
            .map(|&i| self.per_task[i].jobs.as_slice())
            .unwrap_or(&[])
    }

    /// All jobs: tasks in declaration order, then by id.
    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.per_task.iter().flat_map(|t| t.jobs.iter())
    }

    pub fn len(&self) -> usize {
        self.per_task.iter().map(|t| t.jobs.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of tasks whose offset puts their first release at or after the
    /// horizon.
    pub fn tasks_without_jobs(&self) -> Vec<&str> {
        self.per_task
            .iter()
            .filter(|t| t.jobs.is_empty())
            .map(|t| t.task.name.as_str())
            .collect()
    }

    /// One [`TimingWarning::NoJobsInHorizon`] per task without jobs.
    pub fn warnings(&self) -> Vec<TimingWarning> {
        self.per_task
            .iter()
            .filter(|t| t.jobs.is_empty())
            .map(|t| TimingWarning::NoJobsInHorizon {
                task: t.task.name.clone(),
                offset: t.task.offset,
                horizon: self.horizon,
            })
            .collect()
    }
}

/// Number of jobs of `task` released strictly before `horizon`.
pub fn job_count(task: &Task, horizon: u64) -> u64 {
    if task.offset >= horizon || task.period == 0 {
        0
    } else {
        (horizon - task.offset).div_ceil(task.period)
    }
}

/// Expand every task of `tasks` into its jobs over `[0, horizon)`, with at
/// most [`DEFAULT_JOB_LIMIT`] jobs in total.
///
/// Pure and deterministic in `(tasks, horizon)`.
pub fn generate_jobs(tasks: &TaskSet, horizon: u64) -> Result<JobSet, ConfigError> {
    generate_jobs_within(tasks, horizon, DEFAULT_JOB_LIMIT)
}

/// [`generate_jobs`] with an explicit job budget.
///
/// # Errors
/// * [`ConfigError::TooManyJobs`] – the horizon yields more than `max_jobs`
///   jobs.  Checked before anything is allocated.
/// * [`ConfigError::TimeOverflow`] – a job's times do not fit in `u64`.
pub fn generate_jobs_within(
    tasks: &TaskSet,
    horizon: u64,
    max_jobs: u64,
) -> Result<JobSet, ConfigError> {
    let total = tasks
        .iter()
        .try_fold(0u64, |acc, task| acc.checked_add(job_count(task, horizon)));
    match total {
        Some(n) if n <= max_jobs => debug!(horizon, job_count = n, "job budget ok"),
        _ => {
            warn!(horizon, limit = max_jobs, "too many jobs for the horizon");
            return Err(ConfigError::TooManyJobs {
                horizon,
                limit: max_jobs,
            });
        }
    }

    let mut per_task = Vec::with_capacity(tasks.len());
    let mut index = HashMap::with_capacity(tasks.len());

    for task in tasks.shared() {
        let count = job_count(task, horizon);
        if count == 0 {
            warn!(
                task = %task.name,
                offset = task.offset,
                horizon,
                "first release is not before the horizon; task has no jobs"
            );
        }

        let name: Arc<str> = Arc::from(task.name.as_str());
        let jobs = (1..=count)
            .map(|id| Job::with_name(Arc::clone(task), Arc::clone(&name), id))
            .collect::<Result<Vec<Job>, _>>()?;
        for job in &jobs {
            debug!("Job created: {job}");
        }

        index.insert(task.name.clone(), per_task.len());
        per_task.push(TaskJobs {
            task: Arc::clone(task),
            jobs,
        });
    }

    let set = JobSet {
        horizon,
        per_task,
        index,
    };
    info!(horizon, job_count = set.len(), task_count = tasks.len(), "Generated jobs");
    Ok(set)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
