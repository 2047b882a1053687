/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Forest view over a [`DependencyGraph`], used to visualise dependency
//! chains.
//!
//! Nodes own their children.  The upward link (child → parent) is an index
//! table inside [`JobForest`] keyed by [`JobKey`], not a pointer stored in
//! the node.
//!
//! ```text
//! Job(A, 1)
//!    |--- Job(B, 2)
//!       |--- Job(C, 1)
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use tracing::debug;

use super::DependencyGraph;
use crate::error::GraphError;
use crate::job::JobKey;

// ── ParentRule ────────────────────────────────────────────────────────────────

/// How to pick the single tree parent of a job with several predecessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentRule {
    /// Predecessor with the earliest release; ties go to the smaller key.
    #[default]
    EarliestRelease,

    /// Predecessor with the latest release; ties go to the larger key.
    LatestRelease,

    /// Fail with [`GraphError::Ambiguous`].
    Strict,
}

impl FromStr for ParentRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "earliest_release" => Ok(ParentRule::EarliestRelease),
            "latest_release" => Ok(ParentRule::LatestRelease),
            "strict" => Ok(ParentRule::Strict),
            other => Err(format!(
                "unknown parent rule '{other}' (valid: earliest_release, latest_release, strict)"
            )),
        }
    }
}

// ── TreeNode ──────────────────────────────────────────────────────────────────

/// One job in the forest, with the children it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    job: JobKey,
    children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn new(job: JobKey) -> Self {
        Self {
            job,
            children: Vec::new(),
        }
    }

    pub fn add_child(&mut self, child: TreeNode) {
        self.children.push(child);
    }

    pub fn job(&self) -> &JobKey {
        &self.job
    }

    pub fn children(&self) -> &[TreeNode] {
        &self.children
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn len(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    /// Always `false`: a subtree contains at least its root.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Depth-first search for `job` in this subtree.
    pub fn find(&self, job: &JobKey) -> Option<&TreeNode> {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if &node.job == job {
                return Some(node);
            }
            stack.extend(node.children.iter());
        }
        None
    }
}

impl fmt::Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stack = vec![(self, 0usize)];
        while let Some((node, level)) = stack.pop() {
            if level > 0 {
                write!(f, "{}|--- ", "   ".repeat(level))?;
            }
            writeln!(f, "{}", node.job)?;
            for child in node.children.iter().rev() {
                stack.push((child, level + 1));
            }
        }
        Ok(())
    }
}

// ── JobForest ─────────────────────────────────────────────────────────────────

/// Immutable forest snapshot of a [`DependencyGraph`] at one revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobForest {
    roots: Vec<TreeNode>,
    parents: BTreeMap<JobKey, JobKey>,
    rule: ParentRule,
    revision: u64,
}

impl JobForest {
    /// One tree per root job, earliest release first.
    pub fn roots(&self) -> &[TreeNode] {
        &self.roots
    }

    /// Tree parent of `job`; `None` for roots and unknown jobs.
    pub fn parent_of(&self, job: &JobKey) -> Option<&JobKey> {
        self.parents.get(job)
    }

    /// Children of `job` in the tree.  Empty for leaves and unknown jobs.
    pub fn children_of(&self, job: &JobKey) -> &[TreeNode] {
        self.find(job).map(TreeNode::children).unwrap_or(&[])
    }

    pub fn find(&self, job: &JobKey) -> Option<&TreeNode> {
        self.roots.iter().find_map(|root| root.find(job))
    }

    /// Total number of nodes.
    pub fn len(&self) -> usize {
        self.roots.len() + self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn rule(&self) -> ParentRule {
        self.rule
    }

    /// Graph revision this forest was built from.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

impl fmt::Display for JobForest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for root in &self.roots {
            write!(f, "{root}")?;
        }
        Ok(())
    }
}

// ── Construction ──────────────────────────────────────────────────────────────

pub(super) fn build_forest(
    graph: &DependencyGraph,
    rule: ParentRule,
) -> Result<JobForest, GraphError> {
    if let Some(path) = graph.find_cycle() {
        return Err(GraphError::Cycle { path });
    }

    // Pick one parent per job
    let mut parents: BTreeMap<JobKey, JobKey> = BTreeMap::new();
    for job in graph.jobs() {
        let mut preds: Vec<&JobKey> = graph.predecessor_jlds(job).map(|j| j.pred()).collect();
        if preds.is_empty() {
            continue;
        }
        preds.sort_by_key(|k| graph.order_key(*k));

        let parent = match rule {
            ParentRule::EarliestRelease => preds[0],
            ParentRule::LatestRelease => preds[preds.len() - 1],
            ParentRule::Strict if preds.len() > 1 => {
                return Err(GraphError::Ambiguous {
                    job: job.clone(),
                    predecessors: preds.into_iter().cloned().collect(),
                });
            }
            ParentRule::Strict => preds[0],
        };
        if preds.len() > 1 {
            debug!(job = %job, parent = %parent, rule = ?rule, "primary parent selected");
        }
        parents.insert(job.clone(), parent.clone());
    }

    let roots: Vec<TreeNode> = {
        let mut children: HashMap<&JobKey, Vec<&JobKey>> = HashMap::new();
        for (child, parent) in &parents {
            children.entry(parent).or_default().push(child);
        }
        for list in children.values_mut() {
            list.sort_by_key(|k| graph.order_key(*k));
        }
        graph
            .roots()
            .iter()
            .map(|root| build_subtree(root, &children))
            .collect()
    };

    Ok(JobForest {
        roots,
        parents,
        rule,
        revision: graph.revision(),
    })
}

/// Post-order construction with an explicit stack.
fn build_subtree(root: &JobKey, children: &HashMap<&JobKey, Vec<&JobKey>>) -> TreeNode {
    let mut built: HashMap<&JobKey, TreeNode> = HashMap::new();
    let mut stack: Vec<(&JobKey, bool)> = vec![(root, false)];

    while let Some((job, expanded)) = stack.pop() {
        let kids = children.get(job).map(Vec::as_slice).unwrap_or(&[]);
        if expanded {
            let mut node = TreeNode::new(job.clone());
            for kid in kids {
                if let Some(child) = built.remove(kid) {
                    node.add_child(child);
                }
            }
            built.insert(job, node);
        } else {
            stack.push((job, true));
            stack.extend(kids.iter().rev().map(|k| (*k, false)));
        }
    }

    built
        .remove(root)
        .unwrap_or_else(|| TreeNode::new(root.clone()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::Jld;
    use crate::job::generate_jobs;
    use crate::task::{Task, TaskSet};

    fn key(task: &str, id: u64) -> JobKey {
        JobKey::new(task, id)
    }

    /// A#1 (r=0) and D#1 (r=5) both feed C#1; A#1 also feeds B#1.
    fn diamond() -> DependencyGraph {
        let tasks = TaskSet::new(vec![
            Task::new("A", 1, 20, 20),
            Task::new("B", 1, 20, 20).with_offset(2),
            Task::new("C", 1, 20, 20).with_offset(8),
            Task::new("D", 1, 20, 20).with_offset(5),
        ])
        .unwrap();
        let jobs = generate_jobs(&tasks, 20).unwrap();
        DependencyGraph::from_parts(
            &jobs,
            [
                Jld::new("A", 1, "B", 1),
                Jld::new("A", 1, "C", 1),
                Jld::new("D", 1, "C", 1),
            ],
        )
    }

    #[test]
    fn parent_rule_parses_from_str() {
        assert_eq!("strict".parse::<ParentRule>(), Ok(ParentRule::Strict));
        assert_eq!(
            "latest_release".parse::<ParentRule>(),
            Ok(ParentRule::LatestRelease)
        );
        assert!("first".parse::<ParentRule>().is_err());
    }

    #[test]
    fn earliest_release_parent_by_default() {
        let forest = diamond().to_tree(ParentRule::default()).unwrap();
        assert_eq!(forest.parent_of(&key("C", 1)), Some(&key("A", 1)));
        assert_eq!(forest.parent_of(&key("A", 1)), None);

        let roots: Vec<&JobKey> = forest.roots().iter().map(TreeNode::job).collect();
        assert_eq!(roots, vec![&key("A", 1), &key("D", 1)]);
        // D#1 lost its edge to C#1 in the view, not in the graph
        assert!(forest.children_of(&key("D", 1)).is_empty());
        assert_eq!(forest.len(), 4);
    }

    #[test]
    fn latest_release_parent() {
        let forest = diamond().to_tree(ParentRule::LatestRelease).unwrap();
        assert_eq!(forest.parent_of(&key("C", 1)), Some(&key("D", 1)));
        let a_children: Vec<&JobKey> = forest
            .children_of(&key("A", 1))
            .iter()
            .map(TreeNode::job)
            .collect();
        assert_eq!(a_children, vec![&key("B", 1)]);
    }

    #[test]
    fn strict_rule_surfaces_ambiguity() {
        let err = diamond().to_tree(ParentRule::Strict).unwrap_err();
        assert_eq!(
            err,
            GraphError::Ambiguous {
                job: key("C", 1),
                predecessors: vec![key("A", 1), key("D", 1)],
            }
        );
    }

    #[test]
    fn strict_rule_accepts_a_true_tree() {
        let mut g = DependencyGraph::new();
        g.add_edge(Jld::new("A", 1, "B", 1));
        g.add_edge(Jld::new("A", 1, "C", 1));
        let forest = g.to_tree(ParentRule::Strict).unwrap();
        assert_eq!(forest.roots().len(), 1);
        assert_eq!(forest.roots()[0].len(), 3);
    }

    #[test]
    fn cycle_aborts_tree_and_keeps_index() {
        let mut g = DependencyGraph::new();
        g.add_edge(Jld::new("A", 1, "B", 1));
        g.add_edge(Jld::new("B", 1, "C", 1));
        g.add_edge(Jld::new("C", 1, "A", 1));
        let edges_before: Vec<Jld> = g.edges().cloned().collect();
        let revision = g.revision();

        let err = g.to_tree(ParentRule::default()).unwrap_err();
        assert!(matches!(err, GraphError::Cycle { .. }));

        let edges_after: Vec<Jld> = g.edges().cloned().collect();
        assert_eq!(edges_before, edges_after);
        assert_eq!(g.revision(), revision);
        assert_eq!(
            g.successors_of(&key("C", 1)).into_iter().collect::<Vec<_>>(),
            vec![key("A", 1)]
        );
    }

    #[test]
    fn display_matches_indented_layout() {
        let mut g = DependencyGraph::new();
        g.add_edge(Jld::new("A", 1, "A", 2));
        g.add_edge(Jld::new("A", 1, "B", 1));
        g.add_edge(Jld::new("A", 2, "B", 2));
        g.add_edge(Jld::new("B", 1, "D", 1));
        let forest = g.to_tree(ParentRule::default()).unwrap();
        assert_eq!(
            forest.to_string(),
            "Job(A, 1)\n\
             \x20  |--- Job(A, 2)\n\
             \x20     |--- Job(B, 2)\n\
             \x20  |--- Job(B, 1)\n\
             \x20     |--- Job(D, 1)\n"
        );
    }

    #[test]
    fn every_job_appears_exactly_once() {
        let forest = diamond().to_tree(ParentRule::EarliestRelease).unwrap();
        for k in [key("A", 1), key("B", 1), key("C", 1), key("D", 1)] {
            let hits = forest.roots().iter().filter(|r| r.find(&k).is_some()).count();
            assert_eq!(hits, 1, "{k} should be in exactly one tree");
        }
    }
}
