/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Job-level dependency (JLD) derivation.
//!
//! A task-level declaration `P → C` says that task `C` consumes data
//! produced by task `P`.  [`build_jlds`] turns each declaration into edges
//! between concrete jobs:
//!
//! ```text
//! for every job c of C:
//!     candidates = { p ∈ jobs(P) | p ≠ c, rule.admits(p, c) }
//!     if candidates ≠ ∅:  emit JLD(P#p, C#c) for the p with the latest release
//! ```
//!
//! Picking the latest release means the consumer reads the most recent
//! valid output.  Candidates of one task have distinct releases, so the
//! choice is unique.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, DependencyRole, TimingWarning};
use crate::job::{Job, JobKey, JobSet};
use crate::task::TaskSet;

// ── JLD ───────────────────────────────────────────────────────────────────────

/// Job-level dependency: job `pred` must supply data to job `succ`.
///
/// Value type: two JLDs with the same four fields are the same edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Jld {
    pred: JobKey,
    succ: JobKey,
}

impl Jld {
    pub fn new(
        pred_task: &str,
        pred_job_id: u64,
        succ_task: &str,
        succ_job_id: u64,
    ) -> Self {
        Self {
            pred: JobKey::new(pred_task, pred_job_id),
            succ: JobKey::new(succ_task, succ_job_id),
        }
    }

    pub fn between(pred: JobKey, succ: JobKey) -> Self {
        Self { pred, succ }
    }

    pub fn pred(&self) -> &JobKey {
        &self.pred
    }

    pub fn succ(&self) -> &JobKey {
        &self.succ
    }

    pub fn pred_task(&self) -> &str {
        self.pred.task()
    }

    pub fn pred_job_id(&self) -> u64 {
        self.pred.id()
    }

    pub fn succ_task(&self) -> &str {
        self.succ.task()
    }

    pub fn succ_job_id(&self) -> u64 {
        self.succ.id()
    }
}

impl fmt::Display for Jld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "JLD: {}#{} -> {}#{}",
            self.pred_task(),
            self.pred_job_id(),
            self.succ_task(),
            self.succ_job_id()
        )
    }
}

// ── Declarations ──────────────────────────────────────────────────────────────

/// Task-level dependency declaration: `producer → consumer`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct DependencyDecl {
    pub producer: String,
    pub consumer: String,
}

impl DependencyDecl {
    pub fn new(producer: impl Into<String>, consumer: impl Into<String>) -> Self {
        Self {
            producer: producer.into(),
            consumer: consumer.into(),
        }
    }
}

impl fmt::Display for DependencyDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.producer, self.consumer)
    }
}

// ── Overlap rule ──────────────────────────────────────────────────────────────

/// When may producer job `p` feed consumer job `c`?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapRule {
    /// `p`'s data interval contains `c`'s release, and `c` has a read
    /// interval: the data already exists when `c` is released and stays
    /// valid until `c` reads it.
    #[default]
    DataAtRelease,

    /// `p`'s data interval intersects `c`'s read interval anywhere.
    AnyOverlap,
}

impl OverlapRule {
    pub fn admits(self, producer: &Job, consumer: &Job) -> bool {
        let Some(read) = consumer.read_interval() else {
            return false;
        };
        let data = producer.data_interval();
        match self {
            OverlapRule::DataAtRelease => {
                data.contains(consumer.release()) && data.start <= read.end
            }
            OverlapRule::AnyOverlap => data.intersects(&read),
        }
    }
}

impl FromStr for OverlapRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "data_at_release" => Ok(OverlapRule::DataAtRelease),
            "any_overlap" => Ok(OverlapRule::AnyOverlap),
            other => Err(format!(
                "unknown overlap rule '{other}' (valid: data_at_release, any_overlap)"
            )),
        }
    }
}

// ── Builder ───────────────────────────────────────────────────────────────────

/// Result of [`build_jlds`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyReport {
    /// Derived edges, ordered by (pred, succ).
    pub jlds: BTreeSet<Jld>,

    /// Consumer jobs without data and declarations without edges.
    pub warnings: Vec<TimingWarning>,
}

/// Check that every declaration names registered tasks.
pub fn validate_declarations(
    tasks: &TaskSet,
    decls: &[DependencyDecl],
) -> Result<(), ConfigError> {
    for decl in decls {
        for (name, role) in [
            (&decl.producer, DependencyRole::Producer),
            (&decl.consumer, DependencyRole::Consumer),
        ] {
            if !tasks.contains(name) {
                return Err(ConfigError::UnknownTask {
                    name: name.clone(),
                    role,
                    producer: decl.producer.clone(),
                    consumer: decl.consumer.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Derive the JLDs for `decls` over the jobs in `jobs`.
///
/// Pure: the same inputs always yield the same report.  Declarations that
/// appear more than once are processed once.
///
/// # Errors
/// [`ConfigError::UnknownTask`] if a declaration names a task that is not in
/// `tasks`.  Nothing is computed in that case.
pub fn build_jlds(
    tasks: &TaskSet,
    jobs: &JobSet,
    decls: &[DependencyDecl],
    rule: OverlapRule,
) -> Result<DependencyReport, ConfigError> {
    validate_declarations(tasks, decls)?;

    let mut report = DependencyReport::default();
    let mut seen = HashSet::new();

    for decl in decls {
        if !seen.insert(decl) {
            debug!(dependency = %decl, "duplicate declaration ignored");
            continue;
        }

        let producers = jobs.jobs_of(&decl.producer);
        let before = report.jlds.len();

        for consumer in jobs.jobs_of(&decl.consumer) {
            // Producer jobs are in release order: the last admitted one wins
            let chosen = producers
                .iter()
                .rev()
                .find(|p| p.key() != consumer.key() && rule.admits(p, consumer));

            match chosen {
                Some(producer) => {
                    let jld = Jld::between(producer.key().clone(), consumer.key().clone());
                    debug!("{jld}");
                    report.jlds.insert(jld);
                }
                None => {
                    let w = TimingWarning::NoProducerData {
                        producer: decl.producer.clone(),
                        consumer: consumer.key().clone(),
                    };
                    warn!(dependency = %decl, "{w}");
                    report.warnings.push(w);
                }
            }
        }

        let added = report.jlds.len() - before;
        if added == 0 {
            let w = TimingWarning::DependencyWithoutEdges {
                producer: decl.producer.clone(),
                consumer: decl.consumer.clone(),
            };
            warn!(dependency = %decl, "{w}");
            report.warnings.push(w);
        } else {
            debug!(dependency = %decl, jld_count = added, "dependency expanded");
        }
    }

    info!(
        declarations = seen.len(),
        jld_count = report.jlds.len(),
        warning_count = report.warnings.len(),
        rule = ?rule,
        "Built job-level dependencies"
    );

    Ok(report)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
