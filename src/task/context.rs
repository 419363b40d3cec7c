use crate::task::tree::TaskTree;
use crate::task::types::{Task, TaskError, TaskId};

/// Handle passed to predicates, observers and behaviors.
///
/// Gives read access to the task being run and mutable access to the whole
/// tree, so callbacks may attach follow-up children or cancel branches while a
/// tick is in flight.
pub struct TaskContext<'a> {
    tree: &'a mut TaskTree,
    id: TaskId,
}

impl<'a> TaskContext<'a> {
    pub(crate) fn new(tree: &'a mut TaskTree, id: TaskId) -> Self {
        Self { tree, id }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// The task this callback runs for
    pub fn task(&self) -> &Task {
        self.tree.node(self.id)
    }

    pub fn name(&self) -> &str {
        self.task().name()
    }

    pub fn elapsed(&self) -> f64 {
        self.task().elapsed()
    }

    pub fn local_elapsed(&self) -> f64 {
        self.task().local_elapsed()
    }

    pub fn tree(&mut self) -> &mut TaskTree {
        &mut *self.tree
    }

    pub fn parent(&self) -> Option<TaskId> {
        self.task().parent()
    }

    pub fn then(&mut self, task: Task) -> Result<TaskId, TaskError> {
        self.tree.then(self.id, task)
    }

    pub fn then_also(&mut self, task: Task) -> Result<TaskId, TaskError> {
        self.tree.then_also(self.id, task)
    }

    pub fn also(&mut self, task: Task) -> Result<TaskId, TaskError> {
        self.tree.also(self.id, task)
    }

    pub fn now(&mut self, task: Task) -> Result<TaskId, TaskError> {
        self.tree.now(self.id, task)
    }

    /// Cancel this task and its whole subtree
    pub fn cancel(&mut self) -> Result<(), TaskError> {
        self.tree.cancel(self.id)
    }
}
