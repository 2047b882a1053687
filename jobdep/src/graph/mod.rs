/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Dependency graph over jobs.
//!
//! The [`DependencyGraph`] indexes JLDs twice:
//!
//! ```text
//! successors   : pred job ──► { JLD, … }     "who consumes my output?"
//! predecessors : succ job ──► { JLD, … }     "whose output do I consume?"
//! ```
//!
//! The index is the single source of truth.  A job may legitimately have
//! several predecessors (a DAG), so the tree returned by
//! [`DependencyGraph::to_tree`] is a derived, lossy view that needs a
//! [`ParentRule`].
//!
//! Every structural change bumps [`DependencyGraph::revision`].  A
//! [`JobForest`] remembers the revision it was built from; once the graph
//! moves on, [`DependencyGraph::is_current`] turns `false` and the forest has
//! to be rebuilt explicitly.
//!
//! All maps are `BTreeMap`/`BTreeSet` so every query and traversal is
//! deterministic.

pub mod tree;

pub use tree::{JobForest, ParentRule, TreeNode};

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use petgraph::algo::kosaraju_scc;
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction::Incoming;
use tracing::debug;

use crate::dependency::Jld;
use crate::error::GraphError;
use crate::job::{Job, JobKey, JobSet};

type JldIter<'a> = std::iter::Flatten<std::option::IntoIter<&'a BTreeSet<Jld>>>;

/// Job-level dependency index.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Every known job with its release time, when known.
    nodes: BTreeMap<JobKey, Option<u64>>,
    successors: BTreeMap<JobKey, BTreeSet<Jld>>,
    predecessors: BTreeMap<JobKey, BTreeSet<Jld>>,
    revision: u64,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every job of `jobs`, then insert `jlds`.
    pub fn from_parts<I>(jobs: &JobSet, jlds: I) -> Self
    where
        I: IntoIterator<Item = Jld>,
    {
        let mut graph = Self::new();
        for job in jobs.iter() {
            graph.add_job(job);
        }
        for jld in jlds {
            graph.add_edge(jld);
        }
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "dependency graph built"
        );
        graph
    }

    // ── Mutation ──────────────────────────────────────────────────────────────

    /// Register `job` as a node.  Its release orders it among siblings and
    /// candidate parents.  Returns `true` if anything changed.
    pub fn add_job(&mut self, job: &Job) -> bool {
        let release = Some(job.release());
        match self.nodes.insert(job.key().clone(), release) {
            Some(previous) if previous == release => false,
            _ => {
                self.revision += 1;
                true
            }
        }
    }

    /// Insert `jld` into both indexes.
    ///
    /// Idempotent: returns `false` and changes nothing if the edge is already
    /// present.  Endpoints that were never registered with
    /// [`add_job`](Self::add_job) become nodes without a release time.
    pub fn add_edge(&mut self, jld: Jld) -> bool {
        if self.contains_edge(&jld) {
            return false;
        }

        self.nodes.entry(jld.pred().clone()).or_insert(None);
        self.nodes.entry(jld.succ().clone()).or_insert(None);
        self.predecessors
            .entry(jld.succ().clone())
            .or_default()
            .insert(jld.clone());
        self.successors
            .entry(jld.pred().clone())
            .or_default()
            .insert(jld);
        self.revision += 1;
        true
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn contains_edge(&self, jld: &Jld) -> bool {
        self.successors
            .get(jld.pred())
            .is_some_and(|s| s.contains(jld))
    }

    pub fn contains_job(&self, job: &JobKey) -> bool {
        self.nodes.contains_key(job)
    }

    /// Jobs whose output `job` consumes.  Empty if none.
    pub fn predecessors_of(&self, job: &JobKey) -> BTreeSet<JobKey> {
        self.predecessor_jlds(job).map(|j| j.pred().clone()).collect()
    }

    /// Jobs consuming the output of `job`.  Empty if none.
    pub fn successors_of(&self, job: &JobKey) -> BTreeSet<JobKey> {
        self.successor_jlds(job).map(|j| j.succ().clone()).collect()
    }

    /// JLDs ending at `job`.
    pub fn predecessor_jlds(&self, job: &JobKey) -> impl Iterator<Item = &Jld> {
        Self::jlds(&self.predecessors, job)
    }

    /// JLDs starting at `job`.
    pub fn successor_jlds(&self, job: &JobKey) -> impl Iterator<Item = &Jld> {
        Self::jlds(&self.successors, job)
    }

    fn jlds<'a>(index: &'a BTreeMap<JobKey, BTreeSet<Jld>>, job: &JobKey) -> JldIter<'a> {
        index.get(job).into_iter().flatten()
    }

    /// Every edge, ordered by (pred, succ).
    pub fn edges(&self) -> impl Iterator<Item = &Jld> {
        self.successors.values().flatten()
    }

    pub fn edge_count(&self) -> usize {
        self.successors.values().map(BTreeSet::len).sum()
    }

    /// Every node, ordered by key.
    pub fn jobs(&self) -> impl Iterator<Item = &JobKey> {
        self.nodes.keys()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Release time recorded by [`add_job`](Self::add_job).
    pub fn release_of(&self, job: &JobKey) -> Option<u64> {
        self.nodes.get(job).copied().flatten()
    }

    /// Sort key: release (unknown releases last), then job key.
    fn order_key<'a>(&self, job: &'a JobKey) -> (u64, &'a JobKey) {
        (self.release_of(job).unwrap_or(u64::MAX), job)
    }

    /// Jobs without predecessors, earliest release first.
    pub fn roots(&self) -> Vec<JobKey> {
        let mut roots: Vec<&JobKey> = self
            .nodes
            .keys()
            .filter(|k| !self.predecessors.contains_key(*k))
            .collect();
        roots.sort_by_key(|k| self.order_key(*k));
        roots.into_iter().cloned().collect()
    }

    /// Structural revision; bumped by every change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// `true` if `forest` was built from the current revision.
    pub fn is_current(&self, forest: &JobForest) -> bool {
        forest.revision() == self.revision
    }

    // ── Traversals ────────────────────────────────────────────────────────────

    /// Directed petgraph view over the index.  Nodes and edges are added in
    /// key order, so neighbour iteration is sorted as well.
    fn view(&self) -> DiGraphMap<&JobKey, ()> {
        let mut view = DiGraphMap::with_capacity(self.nodes.len(), self.edge_count());
        for job in self.nodes.keys() {
            view.add_node(job);
        }
        for jld in self.edges() {
            view.add_edge(jld.pred(), jld.succ(), ());
        }
        view
    }

    /// Every job after all of its predecessors.  Among jobs that are ready
    /// at the same time, earlier releases come first.
    ///
    /// # Errors
    /// [`GraphError::Cycle`] if the graph is not a DAG.
    pub fn topological_order(&self) -> Result<Vec<JobKey>, GraphError> {
        let view = self.view();
        let mut pending: HashMap<&JobKey, usize> = view
            .nodes()
            .map(|job| (job, view.neighbors_directed(job, Incoming).count()))
            .filter(|&(_, count)| count > 0)
            .collect();

        let mut ready: BTreeSet<(u64, &JobKey)> = view
            .nodes()
            .filter(|job| !pending.contains_key(job))
            .map(|job| self.order_key(job))
            .collect();

        let mut order = Vec::with_capacity(view.node_count());
        while let Some((_, job)) = ready.pop_first() {
            order.push(job.clone());
            for succ in view.neighbors(job) {
                if let Some(count) = pending.get_mut(succ) {
                    *count -= 1;
                    if *count == 0 {
                        pending.remove(succ);
                        ready.insert(self.order_key(succ));
                    }
                }
            }
        }

        if order.len() < view.node_count() {
            let path = self.find_cycle().unwrap_or_default();
            return Err(GraphError::Cycle { path });
        }
        Ok(order)
    }

    /// Returns one cycle as a path that starts and ends with the same job, or
    /// `None` for a DAG.
    ///
    /// The cycle lies in the strongly connected component holding the
    /// smallest job key; it is the shortest one through that job.
    pub fn find_cycle(&self) -> Option<Vec<JobKey>> {
        let view = self.view();
        let component = kosaraju_scc(&view)
            .into_iter()
            .filter(|scc| match scc.as_slice() {
                [] => false,
                [only] => view.contains_edge(*only, *only),
                _ => true,
            })
            .min_by_key(|scc| scc.iter().min().copied())?;

        let members: BTreeSet<&JobKey> = component.into_iter().collect();
        let start = *members.first()?;

        let mut came_from: HashMap<&JobKey, &JobKey> = HashMap::new();
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            for next in view.neighbors(node) {
                if next == start {
                    let mut path = vec![start, node];
                    let mut cur = node;
                    while cur != start {
                        cur = *came_from.get(cur)?;
                        path.push(cur);
                    }
                    // Collected backwards from the closing edge.
                    path.reverse();
                    return Some(path.into_iter().cloned().collect());
                }
                if members.contains(next) && !came_from.contains_key(next) {
                    came_from.insert(next, node);
                    queue.push_back(next);
                }
            }
        }
        None
    }

    /// Materialise a forest view using `rule` to pick one parent per job.
    ///
    /// The edge index is not modified, whatever the outcome.
    ///
    /// # Errors
    /// * [`GraphError::Cycle`] – the graph contains a cycle.
    /// * [`GraphError::Ambiguous`] – `rule` is [`ParentRule::Strict`] and a
    ///   job has several predecessors.
    pub fn to_tree(&self, rule: ParentRule) -> Result<JobForest, GraphError> {
        tree::build_forest(self, rule)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::generate_jobs;
    use crate::task::{Task, TaskSet};

    fn key(task: &str, id: u64) -> JobKey {
        JobKey::new(task, id)
    }

    fn keys(list: &[(&str, u64)]) -> BTreeSet<JobKey> {
        list.iter().map(|&(t, i)| key(t, i)).collect()
    }

    // ── add_edge / queries ────────────────────────────────────────────────────

    #[test]
    fn add_edge_indexes_both_directions() {
        let mut g = DependencyGraph::new();
        assert!(g.add_edge(Jld::new("A", 1, "B", 2)));
        assert!(g.add_edge(Jld::new("A", 1, "C", 1)));

        assert_eq!(g.successors_of(&key("A", 1)), keys(&[("B", 2), ("C", 1)]));
        assert_eq!(g.predecessors_of(&key("B", 2)), keys(&[("A", 1)]));
        assert!(g.predecessors_of(&key("A", 1)).is_empty());
        assert!(g.successors_of(&key("Z", 9)).is_empty());
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.node_count(), 3);
    }

    #[test]
    fn add_edge_is_idempotent() {
        let mut g = DependencyGraph::new();
        assert!(g.add_edge(Jld::new("A", 1, "B", 2)));
        let revision = g.revision();
        let succ = g.successors_of(&key("A", 1));
        let pred = g.predecessors_of(&key("B", 2));

        assert!(!g.add_edge(Jld::new("A", 1, "B", 2)));
        assert_eq!(g.revision(), revision);
        assert_eq!(g.successors_of(&key("A", 1)), succ);
        assert_eq!(g.predecessors_of(&key("B", 2)), pred);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn from_parts_registers_isolated_jobs() {
        let tasks = TaskSet::new(vec![Task::new("A", 5, 20, 15), Task::new("B", 3, 10, 10)]).unwrap();
        let jobs = generate_jobs(&tasks, 20).unwrap();
        let g = DependencyGraph::from_parts(&jobs, [Jld::new("A", 1, "B", 2)]);
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.release_of(&key("B", 2)), Some(10));
        assert!(g.contains_job(&key("B", 1)));
        // B#1 has no edge and is a root on its own
        assert_eq!(g.roots(), vec![key("A", 1), key("B", 1)]);
    }

    // ── topological_order ─────────────────────────────────────────────────────

    #[test]
    fn topological_order_respects_edges() {
        let mut g = DependencyGraph::new();
        g.add_edge(Jld::new("A", 1, "B", 1));
        g.add_edge(Jld::new("B", 1, "C", 1));
        g.add_edge(Jld::new("A", 1, "C", 1));
        g.add_edge(Jld::new("D", 1, "C", 1));

        let order = g.topological_order().unwrap();
        let pos = |k: &JobKey| order.iter().position(|x| x == k).unwrap();
        for jld in g.edges() {
            assert!(pos(jld.pred()) < pos(jld.succ()), "{jld} out of order");
        }
        assert_eq!(order.len(), 4);
    }

    #[test]
    fn topological_order_rejects_cycles() {
        let mut g = DependencyGraph::new();
        g.add_edge(Jld::new("A", 1, "B", 1));
        g.add_edge(Jld::new("B", 1, "A", 1));
        assert!(matches!(
            g.topological_order(),
            Err(GraphError::Cycle { .. })
        ));
    }

    // ── find_cycle ────────────────────────────────────────────────────────────

    #[test]
    fn find_cycle_returns_closed_path() {
        let mut g = DependencyGraph::new();
        g.add_edge(Jld::new("A", 1, "B", 1));
        g.add_edge(Jld::new("B", 1, "C", 1));
        g.add_edge(Jld::new("C", 1, "B", 1));

        let path = g.find_cycle().unwrap();
        assert_eq!(path.first(), path.last());
        assert_eq!(path, vec![key("B", 1), key("C", 1), key("B", 1)]);
    }

    #[test]
    fn find_cycle_picks_component_with_smallest_job() {
        let mut g = DependencyGraph::new();
        g.add_edge(Jld::new("X", 1, "Y", 1));
        g.add_edge(Jld::new("Y", 1, "X", 1));
        g.add_edge(Jld::new("B", 1, "D", 1));
        g.add_edge(Jld::new("D", 1, "C", 1));
        g.add_edge(Jld::new("C", 1, "B", 1));

        assert_eq!(
            g.find_cycle().unwrap(),
            vec![key("B", 1), key("D", 1), key("C", 1), key("B", 1)]
        );
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let mut g = DependencyGraph::new();
        g.add_edge(Jld::new("A", 1, "B", 1));
        g.add_edge(Jld::new("B", 1, "B", 1));

        assert_eq!(g.find_cycle().unwrap(), vec![key("B", 1), key("B", 1)]);
        assert!(matches!(
            g.topological_order(),
            Err(GraphError::Cycle { path }) if path.len() == 2
        ));
    }

    #[test]
    fn dag_has_no_cycle() {
        let mut g = DependencyGraph::new();
        g.add_edge(Jld::new("A", 1, "B", 1));
        g.add_edge(Jld::new("A", 1, "C", 1));
        g.add_edge(Jld::new("B", 1, "C", 1));
        assert_eq!(g.find_cycle(), None);
    }

    #[test]
    fn long_chain_does_not_overflow() {
        let mut g = DependencyGraph::new();
        for i in 1..50_000 {
            g.add_edge(Jld::new("A", i, "A", i + 1));
        }
        assert_eq!(g.find_cycle(), None);
        assert_eq!(g.topological_order().unwrap().len(), 50_000);
    }

    // ── revision ──────────────────────────────────────────────────────────────

    #[test]
    fn forest_goes_stale_after_new_edge() {
        let mut g = DependencyGraph::new();
        g.add_edge(Jld::new("A", 1, "B", 1));
        let forest = g.to_tree(ParentRule::default()).unwrap();
        assert!(g.is_current(&forest));

        g.add_edge(Jld::new("A", 1, "B", 1));
        assert!(g.is_current(&forest), "duplicate edge changes nothing");

        g.add_edge(Jld::new("B", 1, "C", 1));
        assert!(!g.is_current(&forest));
        let rebuilt = g.to_tree(ParentRule::default()).unwrap();
        assert!(g.is_current(&rebuilt));
    }
}
