/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! jobdep – job-level dependency model for periodic real-time task sets
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── timing/       – GCD / LCM, hyperperiod, tick formatting
//! ├── task.rs       – Task and validated TaskSet
//! ├── job.rs        – Job instances, horizon, job generator
//! ├── dependency.rs – task-level declarations → job-level dependencies (JLDs)
//! ├── graph/        – JLD index, traversals, forest view
//! ├── analysis.rs   – end-to-end pipeline
//! ├── config/       – YAML workload files
//! └── error.rs      – error and warning types
//! ```

pub mod analysis;
pub mod config;
pub mod dependency;
pub mod error;
pub mod graph;
pub mod job;
pub mod task;
pub mod timing;
