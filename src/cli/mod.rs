//! CLI-specific functionality for tasktree
//!
//! This module contains all CLI-related code including argument parsing,
//! configuration discovery, plan files and the tick drivers.

pub mod args;
pub mod config;
pub mod plan;
pub mod runner;

pub use args::{Args, ExecutionMode, RunOptions};
pub use config::{ConfigDiscovery, RunnerConfig};
pub use plan::{Attach, Plan, PlanAction, PlanError, PlanNode};
pub use runner::{RunReport, run_offline, run_realtime};
