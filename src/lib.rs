//! # tasktree
//!
//! A cooperative, tick-driven hierarchical task scheduler. Work is arranged as
//! a tree: each node has a local completion predicate, an ordered list of
//! sequential children (run one at a time, FIFO) and a list of parallel
//! children (all advanced every tick). A single driver call,
//! [`TaskTree::update`], advances the whole tree by a delta time.
//!
//! ## Architecture Overview
//!
//! - **[`task`]**: the node type, the tree arena, the update engine, lifecycle
//!   notifications and the [`Behavior`] trait
//! - **[`actions`]**: reusable leaf behaviors (waits, predicates, tweens,
//!   locks, futures)
//! - **[`mix`]**: easing curves used by tweens
//! - **[`inspect`]**: text outlines and serializable snapshots
//! - **[`cli`]**: TOML plans, runner configuration and the tick drivers behind
//!   the `tasktree` binary
//!
//! ## Quick Start
//!
//! ```rust
//! use tasktree::{Task, TaskTree};
//! use tasktree::actions::BlockForSeconds;
//!
//! let mut tree = TaskTree::default();
//! let root = tree.root();
//! tree.then(root, Task::instant("load")).unwrap();
//! tree.then(root, Task::from_behavior(BlockForSeconds::new(1.0))).unwrap();
//! tree.also(root, Task::new("spin", |ctx, _dt| Ok(ctx.elapsed() >= 0.5))).unwrap();
//!
//! while !tree.update(0.25).unwrap() {}
//! assert!(tree.is_finished());
//! ```

/// Hierarchical task tree and its update engine.
///
/// Provides the task node, attachment operations, per-tick traversal with
/// sequential cascades and parallel branches, cancellation, suspension and
/// lifecycle notifications.
pub mod task;

/// Reusable leaf behaviors.
pub mod actions;

/// Easing curves.
pub mod mix;

/// Outlines and snapshots of a tree.
pub mod inspect;

/// Environment constants and path utilities.
///
/// Centralizes file and directory names used by configuration discovery.
pub mod env;

// CLI module for command-line interface
pub mod cli;

// Re-export main task types
pub use task::{
    Behavior, Signal, Task, TaskContext, TaskError, TaskEvents, TaskId, TaskPhase, TaskTree,
};

pub use inspect::{TaskSnapshot, TreeSnapshot};
