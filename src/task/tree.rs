use crate::task::types::*;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Arena owning every task of one tree.
///
/// Parents own their children through the ids stored in their sequential and
/// parallel collections; the `parent` id on a child is only a back-reference.
/// Children removed from a parent (finished, force-finished or cancelled) are
/// detached and dropped from the arena once the outermost call on the tree
/// returns, so ids seen by a callback stay valid until that callback is done.
pub struct TaskTree {
    pub(crate) nodes: HashMap<TaskId, Task>,
    root: TaskId,
    detached: Vec<TaskId>,
    depth: u32,
}

/// Where an attached task lands in its parent
#[derive(Debug, Clone, Copy)]
enum Placement {
    Back,
    Parallel,
    At(usize),
}

impl TaskTree {
    /// Create a tree around `root`
    pub fn new(root: Task) -> Self {
        let id = root.id;
        let mut nodes = HashMap::new();
        nodes.insert(id, root);
        Self {
            nodes,
            root: id,
            detached: Vec::new(),
            depth: 0,
        }
    }

    /// A tree whose root completes on its first step, so the tree finishes
    /// once its children do
    pub fn with_root_name(name: impl Into<String>) -> Self {
        Self::new(Task::instant(name))
    }

    pub fn root(&self) -> TaskId {
        self.root
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of tasks currently owned by the tree
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get a task by ID
    pub fn task(&self, id: TaskId) -> Result<&Task, TaskError> {
        self.nodes.get(&id).ok_or(TaskError::UnknownTask(id))
    }

    /// Get a mutable reference to a task by ID
    pub fn task_mut(&mut self, id: TaskId) -> Result<&mut Task, TaskError> {
        self.nodes.get_mut(&id).ok_or(TaskError::UnknownTask(id))
    }

    pub fn parent_of(&self, id: TaskId) -> Result<Option<TaskId>, TaskError> {
        Ok(self.task(id)?.parent)
    }

    /// Walk back-references up to the ancestor without a parent
    pub fn root_of(&self, id: TaskId) -> Result<TaskId, TaskError> {
        let mut current = self.task(id)?;
        while let Some(parent) = current.parent {
            match self.nodes.get(&parent) {
                Some(task) => current = task,
                None => break,
            }
        }
        Ok(current.id)
    }

    pub(crate) fn node(&self, id: TaskId) -> &Task {
        &self.nodes[&id]
    }

    pub(crate) fn name_of(&self, id: TaskId) -> String {
        self.nodes
            .get(&id)
            .map(|task| task.name.clone())
            .unwrap_or_default()
    }

    /// Append to the sequential collection; blocks later siblings
    pub fn then(&mut self, parent: TaskId, task: Task) -> Result<TaskId, TaskError> {
        self.insert(parent, task, Placement::Back)
    }

    /// Append to the sequential collection without blocking; the task is
    /// promoted to the parallel collection at the next traversal
    pub fn then_also(&mut self, parent: TaskId, task: Task) -> Result<TaskId, TaskError> {
        self.insert(parent, task.blocking(false), Placement::Back)
    }

    /// Append to the parallel collection
    pub fn also(&mut self, parent: TaskId, task: Task) -> Result<TaskId, TaskError> {
        self.insert(parent, task.blocking(false), Placement::Parallel)
    }

    /// Insert at the front of the sequential collection, suspending the current head
    pub fn now(&mut self, parent: TaskId, task: Task) -> Result<TaskId, TaskError> {
        self.guarded(|tree| {
            let head = tree.task(parent)?.sequential.first().copied();
            if let Some(head) = head {
                tree.suspend(head)?;
            }
            tree.insert(parent, task, Placement::At(0))
        })
    }

    /// Insert before the named sequential sibling
    pub fn before(&mut self, parent: TaskId, reference: &str, task: Task) -> Result<TaskId, TaskError> {
        self.guarded(|tree| {
            let index = tree.sequence_index(parent, reference)?;
            if index == 0 {
                let head = tree.node(parent).sequential[0];
                tree.suspend(head)?;
            }
            tree.insert(parent, task, Placement::At(index))
        })
    }

    /// Insert after the named sequential sibling
    pub fn after(&mut self, parent: TaskId, reference: &str, task: Task) -> Result<TaskId, TaskError> {
        let index = self.sequence_index(parent, reference)?;
        self.insert(parent, task, Placement::At(index + 1))
    }

    fn insert(&mut self, parent: TaskId, mut task: Task, placement: Placement) -> Result<TaskId, TaskError> {
        let owner = self.task_mut(parent)?;
        if owner.state.cancelled {
            warn!(
                parent = %owner.name,
                task = %task.name,
                "attaching to a cancelled task, it will never run"
            );
        }

        let id = task.id;
        task.parent = Some(parent);
        match placement {
            Placement::Back => owner.sequential.push(id),
            Placement::Parallel => owner.parallel.push(id),
            Placement::At(index) => {
                let index = index.min(owner.sequential.len());
                owner.sequential.insert(index, id);
            }
        }
        owner.state.finish_fired = false;
        owner.state.finish_all_fired = false;

        debug!(parent = %owner.name, task = %task.name, ?placement, "attached task");
        self.nodes.insert(id, task);
        Ok(id)
    }

    fn sequence_index(&self, parent: TaskId, reference: &str) -> Result<usize, TaskError> {
        let owner = self.task(parent)?;
        owner
            .sequential
            .iter()
            .position(|child| self.nodes.get(child).is_some_and(|task| task.name == reference))
            .ok_or_else(|| TaskError::NotFound {
                name: reference.to_string(),
                parent: owner.name.clone(),
            })
    }

    /// Whether a sequential child with this name exists; a safe check before
    /// [`TaskTree::before`] or [`TaskTree::after`]
    pub fn sequence_contains(&self, parent: TaskId, name: &str) -> bool {
        self.sequence_index(parent, name).is_ok()
    }

    /// Shallow lookup by name, sequential children first
    pub fn find(&self, parent: TaskId, name: &str) -> Option<TaskId> {
        let owner = self.nodes.get(&parent)?;
        owner
            .sequential
            .iter()
            .chain(owner.parallel.iter())
            .copied()
            .find(|child| self.nodes.get(child).is_some_and(|task| task.name == name))
    }

    /// Shallow lookup by name that fails with [`TaskError::NotFound`]
    pub fn get(&self, parent: TaskId, name: &str) -> Result<TaskId, TaskError> {
        let owner = self.task(parent)?;
        self.find(parent, name).ok_or_else(|| TaskError::NotFound {
            name: name.to_string(),
            parent: owner.name.clone(),
        })
    }

    /// Depth-first lookup through the whole subtree below `parent`
    pub fn find_deep(&self, parent: TaskId, name: &str) -> Option<TaskId> {
        if let Some(found) = self.find(parent, name) {
            return Some(found);
        }
        let owner = self.nodes.get(&parent)?;
        owner
            .sequential
            .iter()
            .chain(owner.parallel.iter())
            .find_map(|child| self.find_deep(*child, name))
    }

    pub fn get_deep(&self, parent: TaskId, name: &str) -> Result<TaskId, TaskError> {
        let owner = self.task(parent)?;
        self.find_deep(parent, name).ok_or_else(|| TaskError::NotFound {
            name: name.to_string(),
            parent: owner.name.clone(),
        })
    }

    /// Run `op` with detached tasks kept alive until the outermost call returns
    pub(crate) fn guarded<T>(&mut self, op: impl FnOnce(&mut Self) -> T) -> T {
        self.depth += 1;
        let output = op(self);
        self.depth -= 1;
        if self.depth == 0 {
            self.purge_detached();
        }
        output
    }

    pub(crate) fn detach(&mut self, id: TaskId) {
        self.detached.push(id);
    }

    fn purge_detached(&mut self) {
        let mut pending = std::mem::take(&mut self.detached);
        let mut dropped = 0usize;
        while let Some(id) = pending.pop() {
            if id == self.root {
                continue;
            }
            if let Some(task) = self.nodes.remove(&id) {
                dropped += 1;
                pending.extend(task.sequential);
                pending.extend(task.parallel);
            }
        }
        if dropped > 0 {
            debug!(dropped, remaining = self.nodes.len(), "purged detached tasks");
        }
    }
}

impl Default for TaskTree {
    fn default() -> Self {
        Self::with_root_name("root")
    }
}

impl std::fmt::Debug for TaskTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskTree")
            .field("root", &self.root)
            .field("tasks", &self.nodes.len())
            .field("detached", &self.detached.len())
            .finish()
    }
}
