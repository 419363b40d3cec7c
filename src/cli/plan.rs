//! TOML plan files.
//!
//! A plan describes a tree declaratively:
//!
//! ```toml
//! [root]
//! name = "level"
//! action = "infinite"
//!
//! [[root.children]]
//! name = "intro"
//! action = "wait_seconds"
//! seconds = 1.5
//!
//! [[root.children]]
//! name = "music"
//! attach = "also"
//! action = "wait_frames"
//! frames = 30
//! ```

use crate::actions::{BlockForFrames, BlockForSeconds};
use crate::task::{Task, TaskError, TaskId, TaskTree};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("failed to read plan {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse plan: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("task [{task}] uses action {action} but has no `{field}`")]
    MissingParameter {
        task: String,
        action: PlanAction,
        field: &'static str,
    },

    #[error("task [{task}] has an invalid {field}: {value}")]
    InvalidValue {
        task: String,
        field: &'static str,
        value: f64,
    },

    #[error("a task in the plan has an empty name")]
    EmptyName,

    #[error(transparent)]
    Tree(#[from] TaskError),
}

/// How a node is attached to its parent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attach {
    #[default]
    Then,
    ThenAlso,
    Also,
}

/// The local action of a plan node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    #[default]
    Instant,
    Infinite,
    WaitSeconds,
    WaitFrames,
}

impl std::fmt::Display for PlanAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PlanAction::Instant => "instant",
            PlanAction::Infinite => "infinite",
            PlanAction::WaitSeconds => "wait_seconds",
            PlanAction::WaitFrames => "wait_frames",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanNode {
    pub name: String,
    #[serde(default)]
    pub attach: Attach,
    #[serde(default)]
    pub action: PlanAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frames: Option<u64>,
    #[serde(default)]
    pub interval: f64,
    #[serde(default)]
    pub local_interval: f64,
    #[serde(default)]
    pub always_run_children: bool,
    #[serde(default = "default_true")]
    pub block_parent_completion: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<PlanNode>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub root: PlanNode,
}

impl Plan {
    pub fn from_toml_str(content: &str) -> Result<Self, PlanError> {
        let plan: Plan = toml::from_str(content)?;
        plan.root.validate()?;
        Ok(plan)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PlanError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| PlanError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let plan = Self::from_toml_str(&content)?;
        info!(path = %path.display(), tasks = plan.root.count(), "loaded plan");
        Ok(plan)
    }

    /// Build a fresh tree from the plan
    pub fn build(&self) -> Result<TaskTree, PlanError> {
        let mut tree = TaskTree::new(self.root.to_task()?);
        let root = tree.root();
        for child in &self.root.children {
            child.attach_to(&mut tree, root)?;
        }
        Ok(tree)
    }
}

impl PlanNode {
    /// Number of nodes in this subtree
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(PlanNode::count).sum::<usize>()
    }

    fn validate(&self) -> Result<(), PlanError> {
        if self.name.trim().is_empty() {
            return Err(PlanError::EmptyName);
        }
        for (field, value) in [("interval", self.interval), ("local_interval", self.local_interval)] {
            if !value.is_finite() || value < 0.0 {
                return Err(PlanError::InvalidValue {
                    task: self.name.clone(),
                    field,
                    value,
                });
            }
        }
        match self.action {
            PlanAction::WaitSeconds => match self.seconds {
                None => return Err(self.missing("seconds")),
                Some(value) if !value.is_finite() || value < 0.0 => {
                    return Err(PlanError::InvalidValue {
                        task: self.name.clone(),
                        field: "seconds",
                        value,
                    });
                }
                Some(_) => {}
            },
            PlanAction::WaitFrames if self.frames.is_none() => {
                return Err(self.missing("frames"));
            }
            _ => {}
        }
        self.children.iter().try_for_each(PlanNode::validate)
    }

    fn missing(&self, field: &'static str) -> PlanError {
        PlanError::MissingParameter {
            task: self.name.clone(),
            action: self.action,
            field,
        }
    }

    fn to_task(&self) -> Result<Task, PlanError> {
        let task = match self.action {
            PlanAction::Instant => Task::instant(&self.name),
            PlanAction::Infinite => Task::infinite(&self.name),
            PlanAction::WaitSeconds => {
                let seconds = self.seconds.ok_or_else(|| self.missing("seconds"))?;
                Task::with_behavior(&self.name, BlockForSeconds::new(seconds))
            }
            PlanAction::WaitFrames => {
                let frames = self.frames.ok_or_else(|| self.missing("frames"))?;
                Task::with_behavior(&self.name, BlockForFrames::new(frames))
            }
        };

        let mut task = task
            .interval(self.interval)
            .local_interval(self.local_interval)
            .block_parent_completion(self.block_parent_completion)
            .on_start(|ctx| {
                debug!(task = %ctx.name(), "plan task started");
                Ok(())
            })
            .on_finish_all(|ctx| {
                info!(task = %ctx.name(), elapsed = ctx.elapsed(), "plan task finished");
                Ok(())
            });
        if self.always_run_children {
            task = task.always_run_children(true);
        }
        Ok(task)
    }

    fn attach_to(&self, tree: &mut TaskTree, parent: TaskId) -> Result<TaskId, PlanError> {
        let task = self.to_task()?;
        let id = match self.attach {
            Attach::Then => tree.then(parent, task)?,
            Attach::ThenAlso => tree.then_also(parent, task)?,
            Attach::Also => tree.also(parent, task)?,
        };
        for child in &self.children {
            child.attach_to(tree, id)?;
        }
        Ok(id)
    }
}
