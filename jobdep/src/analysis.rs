/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! End-to-end analysis pipeline.
//!
//! [`run_analysis`] chains the individual stages:
//!
//! ```text
//! TaskSet ──► horizon ──► JobSet ──► JLDs ──► DependencyGraph
//!                                                   │
//!                            AnalysisSnapshot::tree ▼
//!                                               JobForest
//! ```
//!
//! The function is stateless: all per-run state is local and dropped at the
//! end of the call.  The returned [`AnalysisSnapshot`] is read-only and
//! `Send + Sync`, so it can be shared between threads without locking.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::dependency::{build_jlds, validate_declarations, DependencyDecl, Jld, OverlapRule};
use crate::error::{AnalysisError, TimingWarning};
use crate::graph::{DependencyGraph, JobForest, ParentRule};
use crate::job::{generate_jobs_within, resolve_horizon, Horizon, JobSet};
use crate::task::TaskSet;
use crate::timing::{
    format_time, DEFAULT_HYPERPERIOD_LIMIT, DEFAULT_JOB_LIMIT, DEFAULT_TIME_BASE_US,
};

// ── AnalysisConfig ────────────────────────────────────────────────────────────

/// Knobs of one analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    pub horizon: Horizon,

    /// Upper bound for the resolved horizon, whatever its [`Horizon`] mode.
    pub hyperperiod_limit: u64,

    /// Upper bound for the total number of generated jobs.
    pub job_limit: u64,

    pub overlap_rule: OverlapRule,
    pub parent_rule: ParentRule,

    /// Length of one tick in µs.  Only affects diagnostic output.
    pub time_base_us: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            horizon: Horizon::default(),
            hyperperiod_limit: DEFAULT_HYPERPERIOD_LIMIT,
            job_limit: DEFAULT_JOB_LIMIT,
            overlap_rule: OverlapRule::default(),
            parent_rule: ParentRule::default(),
            time_base_us: DEFAULT_TIME_BASE_US,
        }
    }
}

// ── AnalysisSnapshot ──────────────────────────────────────────────────────────

/// Result of [`run_analysis`].
#[derive(Debug, Clone)]
pub struct AnalysisSnapshot {
    hyperperiod: Option<u64>,
    horizon: u64,
    jobs: JobSet,
    jlds: BTreeSet<Jld>,
    graph: DependencyGraph,
    warnings: Vec<TimingWarning>,
    parent_rule: ParentRule,
    time_base_us: u64,
}

impl AnalysisSnapshot {
    /// Hyperperiod of the task set, if it fits in `u64`.
    pub fn hyperperiod(&self) -> Option<u64> {
        self.hyperperiod
    }

    /// Horizon the jobs were generated for.
    pub fn horizon(&self) -> u64 {
        self.horizon
    }

    pub fn jobs(&self) -> &JobSet {
        &self.jobs
    }

    pub fn jlds(&self) -> &BTreeSet<Jld> {
        &self.jlds
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Every non-fatal issue found during the run, in pipeline order.
    pub fn warnings(&self) -> &[TimingWarning] {
        &self.warnings
    }

    pub fn time_base_us(&self) -> u64 {
        self.time_base_us
    }

    /// Forest view of the graph, using the configured parent rule.
    ///
    /// # Errors
    /// [`AnalysisError::Graph`] on a cycle, or on ambiguity under
    /// [`ParentRule::Strict`].
    pub fn tree(&self) -> Result<JobForest, AnalysisError> {
        Ok(self.graph.to_tree(self.parent_rule)?)
    }
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// Run the full pipeline over `tasks` and `decls`.
///
/// # Errors
/// * [`AnalysisError::Config`] – a declaration names an unknown task, or the
///   horizon yields more than `config.job_limit` jobs.
/// * [`AnalysisError::Hyperperiod`] – the horizon could not be resolved or
///   exceeds `config.hyperperiod_limit`.
pub fn run_analysis(
    tasks: &TaskSet,
    decls: &[DependencyDecl],
    config: &AnalysisConfig,
) -> Result<AnalysisSnapshot, AnalysisError> {
    info!(
        task_count = tasks.len(),
        dependency_count = decls.len(),
        horizon = ?config.horizon,
        overlap_rule = ?config.overlap_rule,
        parent_rule = ?config.parent_rule,
        "=== run_analysis() ==="
    );

    // ── Preconditions ─────────────────────────────────────────────────────────
    validate_declarations(tasks, decls)?;

    let mut warnings = tasks.timing_warnings();

    // ── Horizon ───────────────────────────────────────────────────────────────
    let resolved = resolve_horizon(tasks, config.horizon, config.hyperperiod_limit)?;
    warnings.extend(resolved.warning);
    info!(
        horizon = resolved.ticks,
        hyperperiod = ?resolved.hyperperiod,
        "Horizon: {}",
        format_time(resolved.ticks, config.time_base_us)
    );

    // ── Jobs ──────────────────────────────────────────────────────────────────
    let jobs = generate_jobs_within(tasks, resolved.ticks, config.job_limit)?;
    warnings.extend(jobs.warnings());

    // ── Job-level dependencies ────────────────────────────────────────────────
    let report = build_jlds(tasks, &jobs, decls, config.overlap_rule)?;
    warnings.extend(report.warnings);

    // ── Graph ─────────────────────────────────────────────────────────────────
    let graph = DependencyGraph::from_parts(&jobs, report.jlds.iter().cloned());
    if let Some(path) = graph.find_cycle() {
        warn!(
            length = path.len().saturating_sub(1),
            "dependency graph contains a cycle; no tree view can be built"
        );
    }

    info!(
        job_count = jobs.len(),
        jld_count = report.jlds.len(),
        root_count = graph.roots().len(),
        warning_count = warnings.len(),
        "=== run_analysis() complete ==="
    );
    for w in &warnings {
        debug!("  warning: {w}");
    }

    Ok(AnalysisSnapshot {
        hyperperiod: resolved.hyperperiod,
        horizon: resolved.ticks,
        jobs,
        jlds: report.jlds,
        graph,
        warnings,
        parent_rule: config.parent_rule,
        time_base_us: config.time_base_us,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, GraphError};
    use crate::job::JobKey;
    use crate::task::Task;
    use crate::timing::HyperperiodError;

    fn scenario_tasks() -> TaskSet {
        TaskSet::new(vec![
            Task::new("A", 5, 20, 15),
            Task::new("B", 3, 10, 10),
        ])
        .unwrap()
    }

    // ── End-to-end ────────────────────────────────────────────────────────────

    #[test]
    fn producer_consumer_scenario() {
        let snapshot = run_analysis(
            &scenario_tasks(),
            &[DependencyDecl::new("A", "B")],
            &AnalysisConfig::default(),
        )
        .unwrap();

        assert_eq!(snapshot.hyperperiod(), Some(20));
        assert_eq!(snapshot.horizon(), 20);
        assert_eq!(snapshot.jobs().len(), 3);

        let jlds: Vec<String> = snapshot.jlds().iter().map(Jld::to_string).collect();
        assert_eq!(jlds, vec!["JLD: A#1 -> B#2"]);

        assert_eq!(
            snapshot.warnings(),
            &[TimingWarning::NoProducerData {
                producer: "A".into(),
                consumer: JobKey::new("B", 1),
            }]
        );

        let forest = snapshot.tree().unwrap();
        assert_eq!(
            forest.to_string(),
            "Job(A, 1)\n   |--- Job(B, 2)\nJob(B, 1)\n"
        );
    }

    #[test]
    fn overlap_rule_is_configurable() {
        let config = AnalysisConfig {
            overlap_rule: OverlapRule::AnyOverlap,
            ..AnalysisConfig::default()
        };
        let snapshot = run_analysis(
            &scenario_tasks(),
            &[DependencyDecl::new("A", "B")],
            &config,
        )
        .unwrap();
        assert_eq!(snapshot.jlds().len(), 2);
        assert!(snapshot.jlds().contains(&Jld::new("A", 1, "B", 1)));
        assert!(snapshot.warnings().is_empty());
    }

    #[test]
    fn fixed_horizon_overrides_hyperperiod() {
        let config = AnalysisConfig {
            horizon: Horizon::Fixed(40),
            ..AnalysisConfig::default()
        };
        let snapshot = run_analysis(&scenario_tasks(), &[], &config).unwrap();
        assert_eq!(snapshot.horizon(), 40);
        assert_eq!(snapshot.hyperperiod(), Some(20));
        assert_eq!(snapshot.jobs().len(), 6);
        assert_eq!(snapshot.graph().edge_count(), 0);
        assert_eq!(snapshot.graph().node_count(), 6);
    }

    // ── Errors ────────────────────────────────────────────────────────────────

    #[test]
    fn unknown_task_fails_before_any_work() {
        let err = run_analysis(
            &scenario_tasks(),
            &[DependencyDecl::new("A", "ghost")],
            &AnalysisConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Config(ConfigError::UnknownTask { ref name, .. }) if name == "ghost"
        ));
    }

    #[test]
    fn hyperperiod_above_limit_is_rejected() {
        let config = AnalysisConfig {
            hyperperiod_limit: 10,
            ..AnalysisConfig::default()
        };
        let err = run_analysis(&scenario_tasks(), &[], &config).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Hyperperiod(HyperperiodError::TooLarge {
                value: 20,
                limit: 10
            })
        ));
    }

    #[test]
    fn fixed_horizon_above_limit_is_rejected() {
        let tasks = TaskSet::new(vec![Task::new("A", 1, 1, 1)]).unwrap();
        let config = AnalysisConfig {
            horizon: Horizon::Fixed(u64::MAX),
            hyperperiod_limit: 1_000,
            ..AnalysisConfig::default()
        };
        let err = run_analysis(&tasks, &[], &config).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Hyperperiod(HyperperiodError::HorizonTooLarge {
                horizon: u64::MAX,
                limit: 1_000
            })
        ));
    }

    #[test]
    fn job_budget_bounds_generation() {
        let tasks = TaskSet::new(vec![Task::new("A", 1, 1, 1)]).unwrap();
        let config = AnalysisConfig {
            horizon: Horizon::Fixed(1_000),
            job_limit: 999,
            ..AnalysisConfig::default()
        };
        let err = run_analysis(&tasks, &[], &config).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Config(ConfigError::TooManyJobs {
                horizon: 1_000,
                limit: 999
            })
        ));

        let config = AnalysisConfig {
            job_limit: 1_000,
            ..config
        };
        assert_eq!(run_analysis(&tasks, &[], &config).unwrap().jobs().len(), 1_000);
    }

    #[test]
    fn capped_horizon_reports_warning() {
        let config = AnalysisConfig {
            horizon: Horizon::HyperperiodCapped(10),
            ..AnalysisConfig::default()
        };
        let snapshot = run_analysis(&scenario_tasks(), &[], &config).unwrap();
        assert_eq!(snapshot.horizon(), 10);
        assert!(snapshot.warnings().contains(&TimingWarning::HorizonCapped {
            hyperperiod: Some(20),
            cap: 10,
        }));
    }

    #[test]
    fn mutual_zero_wcet_dependency_is_a_cycle() {
        let tasks = TaskSet::new(vec![
            Task::new("A", 0, 10, 10),
            Task::new("B", 0, 10, 10),
        ])
        .unwrap();
        let snapshot = run_analysis(
            &tasks,
            &[DependencyDecl::new("A", "B"), DependencyDecl::new("B", "A")],
            &AnalysisConfig::default(),
        )
        .unwrap();

        assert_eq!(snapshot.jlds().len(), 2);
        let err = snapshot.tree().unwrap_err();
        assert!(matches!(err, AnalysisError::Graph(GraphError::Cycle { .. })));
        // The index survives the failed tree build
        assert_eq!(snapshot.graph().edge_count(), 2);
    }

    #[test]
    fn strict_parent_rule_flows_through_snapshot() {
        let tasks = TaskSet::new(vec![
            Task::new("A", 1, 10, 10),
            Task::new("B", 1, 10, 10),
            Task::new("C", 1, 10, 10).with_offset(5),
        ])
        .unwrap();
        let config = AnalysisConfig {
            parent_rule: ParentRule::Strict,
            ..AnalysisConfig::default()
        };
        let snapshot = run_analysis(
            &tasks,
            &[DependencyDecl::new("A", "C"), DependencyDecl::new("B", "C")],
            &config,
        )
        .unwrap();
        assert!(matches!(
            snapshot.tree(),
            Err(AnalysisError::Graph(GraphError::Ambiguous { .. }))
        ));
    }

    #[test]
    fn wcet_above_deadline_is_reported() {
        let tasks = TaskSet::new(vec![
            Task::new("A", 1, 10, 10),
            Task::new("B", 12, 20, 10),
        ])
        .unwrap();
        let snapshot =
            run_analysis(&tasks, &[DependencyDecl::new("A", "B")], &AnalysisConfig::default())
                .unwrap();
        assert!(snapshot.jlds().is_empty());
        assert!(matches!(
            snapshot.warnings().first(),
            Some(TimingWarning::WcetExceedsDeadline { task, .. }) if task == "B"
        ));
        assert!(snapshot
            .warnings()
            .iter()
            .any(|w| matches!(w, TimingWarning::DependencyWithoutEdges { .. })));
    }

    #[test]
    fn snapshot_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AnalysisSnapshot>();
    }
}
