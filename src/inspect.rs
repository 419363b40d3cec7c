//! Read-only views of a task tree: an indented text rendering and
//! serializable snapshots.

use crate::task::{Task, TaskError, TaskId, TaskTree};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const INDENT: usize = 3;

/// Point-in-time copy of one task and its children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub name: String,
    pub elapsed: f64,
    pub local_elapsed: f64,
    pub started: bool,
    pub complete: bool,
    pub cancelled: bool,
    pub suspended: bool,
    pub blocking: bool,
    pub block_parent_completion: bool,
    pub always_run_children: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sequential: Vec<TaskSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parallel: Vec<TaskSnapshot>,
}

impl TaskSnapshot {
    fn capture(tree: &TaskTree, task: &Task) -> Self {
        let children = |ids: &[TaskId]| {
            ids.iter()
                .filter_map(|id| tree.task(*id).ok())
                .map(|child| TaskSnapshot::capture(tree, child))
                .collect()
        };
        Self {
            id: task.id(),
            name: task.name().to_string(),
            elapsed: task.elapsed(),
            local_elapsed: task.local_elapsed(),
            started: task.is_started(),
            complete: task.is_complete(),
            cancelled: task.is_cancelled(),
            suspended: task.is_suspended(),
            blocking: task.is_blocking(),
            block_parent_completion: task.blocks_parent_completion(),
            always_run_children: task.runs_children_always(),
            sequential: children(task.sequential()),
            parallel: children(task.parallel()),
        }
    }

    /// Number of tasks in this snapshot, itself included
    pub fn count(&self) -> usize {
        1 + self
            .sequential
            .iter()
            .chain(self.parallel.iter())
            .map(TaskSnapshot::count)
            .sum::<usize>()
    }
}

/// Snapshot of a whole tree with the time it was taken
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeSnapshot {
    pub taken_at: DateTime<Utc>,
    pub tick: u64,
    pub finished: bool,
    pub root: TaskSnapshot,
}

impl TaskTree {
    pub fn snapshot(&self, id: TaskId) -> Result<TaskSnapshot, TaskError> {
        let task = self.task(id)?;
        Ok(TaskSnapshot::capture(self, task))
    }

    pub fn tree_snapshot(&self, tick: u64) -> TreeSnapshot {
        let root = TaskSnapshot::capture(self, self.node(self.root()));
        TreeSnapshot {
            taken_at: Utc::now(),
            tick,
            finished: self.is_finished(),
            root,
        }
    }

    /// Indented outline of the subtree below `id`.
    ///
    /// Only the head of the sequential collection is listed, since later
    /// entries have not run yet; every parallel child is listed.
    pub fn render(&self, id: TaskId) -> Result<String, TaskError> {
        let task = self.task(id)?;
        Ok(Outline { tree: self, task }.to_string())
    }
}

struct Outline<'a> {
    tree: &'a TaskTree,
    task: &'a Task,
}

impl Outline<'_> {
    fn write(&self, f: &mut fmt::Formatter<'_>, task: &Task, depth: usize) -> fmt::Result {
        let pad = " ".repeat(depth * INDENT);
        writeln!(f, "{pad}|{}", task.name())?;

        if let Some(head) = task.sequential().first().and_then(|id| self.tree.task(*id).ok()) {
            writeln!(f, "{pad}|->Sequential:")?;
            self.write(f, head, depth + 1)?;
        }
        if !task.parallel().is_empty() {
            writeln!(f, "{pad}|->Parallel:")?;
            for child in task.parallel().iter().filter_map(|id| self.tree.task(*id).ok()) {
                self.write(f, child, depth + 1)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Outline<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, self.task, 0)
    }
}

impl fmt::Display for TaskTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outline = Outline {
            tree: self,
            task: self.node(self.root()),
        };
        fmt::Display::fmt(&outline, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TaskTree {
        let mut tree = TaskTree::default();
        let root = tree.root();
        let first = tree.then(root, Task::new("first", |_, _| Ok(false))).unwrap();
        tree.then(first, Task::instant("nested")).unwrap();
        tree.then(root, Task::instant("second")).unwrap();
        tree.also(root, Task::instant("side-a")).unwrap();
        tree.also(root, Task::instant("side-b")).unwrap();
        tree
    }

    #[test]
    fn test_render_lists_head_and_parallel() {
        let tree = sample();
        let expected = "\
|root
|->Sequential:
   |first
   |->Sequential:
      |nested
|->Parallel:
   |side-a
   |side-b
";
        assert_eq!(tree.render(tree.root()).unwrap(), expected);
        assert_eq!(tree.to_string(), expected);
    }

    #[test]
    fn test_snapshot_captures_whole_subtree() {
        let mut tree = sample();
        tree.update(0.25).unwrap();

        let snapshot = tree.snapshot(tree.root()).unwrap();
        assert!(snapshot.started && snapshot.complete);
        assert_eq!(snapshot.sequential[0].name, "first");
        assert_eq!(snapshot.sequential[0].elapsed, 0.25);
        // Both parallel instants finished and were removed.
        assert!(snapshot.parallel.is_empty());
        assert_eq!(snapshot.count(), 4);

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: TaskSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_tree_snapshot_reports_finish() {
        let mut tree = TaskTree::default();
        tree.update(0.1).unwrap();

        let snapshot = tree.tree_snapshot(1);
        assert!(snapshot.finished);
        assert_eq!(snapshot.tick, 1);
        assert_eq!(snapshot.root.name, "root");
    }
}
