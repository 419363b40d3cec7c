//! The per-tick update engine.
//!
//! A call to [`TaskTree::update`] walks the tree depth-first: each task steps
//! its local predicate, then its parallel children, then (once locally
//! complete, or always when `always_run_children` is set) the head of its
//! sequential children. Sequential children that finish immediately cascade
//! within the same tick with a zero delta.

use crate::task::context::TaskContext;
use crate::task::tree::TaskTree;
use crate::task::types::*;
use tracing::{debug, trace, warn};

impl TaskTree {
    /// Advance the root by `dt`. Returns whether the whole tree is finished.
    pub fn update(&mut self, dt: f64) -> Result<bool, TaskError> {
        let root = self.root();
        self.update_task(root, dt)
    }

    /// Advance a single task (and its subtree) by `dt`
    pub fn update_task(&mut self, id: TaskId, dt: f64) -> Result<bool, TaskError> {
        self.task(id)?;
        self.guarded(|tree| tree.advance(id, dt))
    }

    pub fn is_finished(&self) -> bool {
        self.finished(self.root())
    }

    pub fn is_task_finished(&self, id: TaskId) -> Result<bool, TaskError> {
        self.task(id)?;
        Ok(self.finished(id))
    }

    /// Cancel a task and its whole subtree, children first
    pub fn cancel(&mut self, id: TaskId) -> Result<(), TaskError> {
        self.task(id)?;
        self.guarded(|tree| tree.cancel_task(id))
    }

    /// Cancel and detach every child of `id`, leaving the task itself untouched
    pub fn cancel_children(&mut self, id: TaskId) -> Result<(), TaskError> {
        self.task(id)?;
        self.guarded(|tree| tree.cancel_child_tasks(id))
    }

    /// Cancelled, or locally complete with no child left that blocks completion.
    /// Tasks no longer in the tree count as finished.
    pub(crate) fn finished(&self, id: TaskId) -> bool {
        match self.nodes.get(&id) {
            Some(task) => {
                task.state.cancelled
                    || (task.state.complete && !self.children_block_completion(task))
            }
            None => true,
        }
    }

    fn children_block_completion(&self, task: &Task) -> bool {
        task.sequential
            .iter()
            .chain(task.parallel.iter())
            .any(|child| {
                self.nodes
                    .get(child)
                    .is_some_and(|child| child.block_parent_completion)
            })
    }

    fn is_cancelled(&self, id: TaskId) -> bool {
        self.nodes.get(&id).is_none_or(|task| task.state.cancelled)
    }

    pub(crate) fn advance(&mut self, id: TaskId, dt: f64) -> Result<bool, TaskError> {
        if self.finished(id) {
            return Ok(true);
        }
        self.unsuspend(id)?;

        let Some(task) = self.nodes.get_mut(&id) else {
            return Ok(true);
        };
        task.clock.total_time += dt;
        if task.interval > 0.0 {
            self.step_intervals(id)?;
        } else {
            task.clock.last_interval = task.clock.total_time;
            self.step(id, dt)?;
        }
        Ok(self.finished(id))
    }

    fn step_intervals(&mut self, id: TaskId) -> Result<(), TaskError> {
        if self.node(id).clock.current_step == 0 && self.can_step(id) {
            if let Some(task) = self.nodes.get_mut(&id) {
                task.clock.current_step += 1;
            }
            self.step(id, 0.0)?;
        }

        let Some(task) = self.nodes.get(&id) else {
            return Ok(());
        };
        let interval = task.interval;
        let steps = whole_steps(task.clock.total_time - task.clock.last_interval, interval);
        for _ in 0..steps {
            if !self.can_step(id) {
                break;
            }
            if let Some(task) = self.nodes.get_mut(&id) {
                task.clock.current_step += 1;
                task.clock.last_interval += interval;
            }
            self.step(id, interval)?;
        }
        Ok(())
    }

    fn can_step(&self, id: TaskId) -> bool {
        self.nodes.get(&id).is_some_and(|task| !task.state.suspended) && !self.finished(id)
    }

    /// One quantum: start, local predicate, parallel children, sequential children
    fn step(&mut self, id: TaskId, dt: f64) -> Result<(), TaskError> {
        let result = self.step_inner(id, dt);
        self.trap(id, result)
    }

    fn step_inner(&mut self, id: TaskId, dt: f64) -> Result<(), TaskError> {
        if self.is_cancelled(id) {
            return Ok(());
        }
        trace!(task = %self.node(id).name, dt, "step");

        self.start_if_needed(id)?;
        self.update_local(id, dt)?;
        if self.is_cancelled(id) {
            return Ok(());
        }

        self.update_parallel(id, dt)?;
        if self.is_cancelled(id) {
            return Ok(());
        }

        let runs_children = {
            let task = self.node(id);
            task.state.complete || task.always_run_children
        };
        if runs_children
            && self.update_children(id, dt)?
            && !self.is_cancelled(id)
        {
            self.fire_finish_all(id)?;
        }
        Ok(())
    }

    fn start_if_needed(&mut self, id: TaskId) -> Result<(), TaskError> {
        let task = self.nodes.get_mut(&id).ok_or(TaskError::UnknownTask(id))?;
        if task.state.started {
            return Ok(());
        }
        task.state.started = true;
        debug!(task = %task.name, "task started");
        self.fire(id, TaskPhase::Start)
    }

    fn update_local(&mut self, id: TaskId, dt: f64) -> Result<(), TaskError> {
        let Some(task) = self.nodes.get_mut(&id) else {
            return Ok(());
        };
        if task.state.complete {
            return Ok(());
        }

        task.clock.total_local_time += dt;
        if task.local_interval > 0.0 {
            self.local_step_intervals(id)
        } else {
            task.clock.last_local_interval = task.clock.total_local_time;
            self.local_step(id, dt)
        }
    }

    fn local_step_intervals(&mut self, id: TaskId) -> Result<(), TaskError> {
        if self.node(id).clock.current_local_step == 0 && self.can_step(id) {
            if let Some(task) = self.nodes.get_mut(&id) {
                task.clock.current_local_step += 1;
            }
            self.local_step(id, 0.0)?;
        }

        let Some(task) = self.nodes.get(&id) else {
            return Ok(());
        };
        let interval = task.local_interval;
        let steps = whole_steps(
            task.clock.total_local_time - task.clock.last_local_interval,
            interval,
        );
        for _ in 0..steps {
            let Some(task) = self.nodes.get_mut(&id) else {
                break;
            };
            if task.state.suspended || task.state.cancelled || task.state.complete {
                break;
            }
            task.clock.current_local_step += 1;
            task.clock.last_local_interval += interval;
            self.local_step(id, interval)?;
        }
        Ok(())
    }

    fn local_step(&mut self, id: TaskId, dt: f64) -> Result<(), TaskError> {
        if !self.try_complete(id, dt)? {
            return Ok(());
        }
        if let Some(task) = self.nodes.get_mut(&id) {
            task.state.complete = true;
            debug!(task = %task.name, elapsed = task.clock.last_interval, "task complete");
        }
        self.fire_finish(id)
    }

    /// Run the local predicate. A failure routed to exception observers counts
    /// as completion so the task never stays half-updated.
    fn try_complete(&mut self, id: TaskId, dt: f64) -> Result<bool, TaskError> {
        let action = match self.nodes.get(&id) {
            Some(task) => std::rc::Rc::clone(&task.action),
            None => return Ok(false),
        };
        let outcome = {
            let Ok(mut predicate) = action.try_borrow_mut() else {
                warn!(task = %self.node(id).name, "predicate re-entered, skipping");
                return Ok(false);
            };
            let mut ctx = TaskContext::new(self, id);
            (&mut *predicate)(&mut ctx, dt)
        };

        match outcome {
            Ok(done) => Ok(done && !self.is_cancelled(id)),
            Err(source) => {
                let error = TaskError::callback(self.name_of(id), TaskPhase::Update, source);
                self.trap(id, Err(error))?;
                Ok(true)
            }
        }
    }

    fn fire_finish(&mut self, id: TaskId) -> Result<(), TaskError> {
        let Some(task) = self.nodes.get_mut(&id) else {
            return Ok(());
        };
        if task.state.finish_fired {
            return Ok(());
        }
        task.state.finish_fired = true;
        self.fire(id, TaskPhase::Finish)
    }

    fn fire_finish_all(&mut self, id: TaskId) -> Result<(), TaskError> {
        let Some(task) = self.nodes.get_mut(&id) else {
            return Ok(());
        };
        if task.state.finish_all_fired {
            return Ok(());
        }
        task.state.finish_all_fired = true;
        debug!(task = %task.name, "subtree finished");
        self.fire(id, TaskPhase::FinishAll)
    }

    /// Advance a snapshot of the parallel children, then drop the finished ones
    fn update_parallel(&mut self, id: TaskId, dt: f64) -> Result<(), TaskError> {
        let snapshot = self.node(id).parallel.clone();
        for child in snapshot {
            self.advance(child, dt)?;
        }

        let Some(task) = self.nodes.get(&id) else {
            return Ok(());
        };
        let done: Vec<TaskId> = task
            .parallel
            .iter()
            .copied()
            .filter(|child| self.finished(*child))
            .collect();
        if done.is_empty() {
            return Ok(());
        }
        if let Some(task) = self.nodes.get_mut(&id) {
            task.parallel.retain(|child| !done.contains(child));
        }
        for child in done {
            self.detach(child);
        }
        Ok(())
    }

    /// Returns true once no remaining child blocks completion
    fn update_children(&mut self, id: TaskId, dt: f64) -> Result<bool, TaskError> {
        self.update_sequential(id, dt)?;

        let Some(task) = self.nodes.get(&id) else {
            return Ok(false);
        };
        if task.state.cancelled || self.children_block_completion(task) {
            return Ok(false);
        }
        if task.state.complete {
            self.finish_child_tasks(id)?;
        }
        Ok(true)
    }

    fn update_sequential(&mut self, id: TaskId, dt: f64) -> Result<(), TaskError> {
        let mut dt = dt;
        loop {
            if self.is_cancelled(id) {
                return Ok(());
            }
            self.promote_non_blocking(id);

            let Some(head) = self.node(id).sequential.first().copied() else {
                return Ok(());
            };
            if !self.advance(head, dt)? {
                return Ok(());
            }

            if let Some(task) = self.nodes.get_mut(&id) {
                if let Some(index) = task.sequential.iter().position(|child| *child == head) {
                    task.sequential.remove(index);
                }
            }
            self.detach(head);
            // Chain of already-satisfied tasks completes without waiting for another tick.
            dt = 0.0;
        }
    }

    /// Move the leading run of non-blocking sequential children to the parallel collection
    fn promote_non_blocking(&mut self, id: TaskId) {
        let Some(task) = self.nodes.get(&id) else {
            return;
        };
        let first_blocking = task
            .sequential
            .iter()
            .position(|child| self.nodes.get(child).is_none_or(|child| child.blocking))
            .unwrap_or(task.sequential.len());
        if first_blocking == 0 {
            return;
        }

        if let Some(task) = self.nodes.get_mut(&id) {
            let promoted: Vec<TaskId> = task.sequential.drain(..first_blocking).collect();
            trace!(task = %task.name, promoted = promoted.len(), "promoted non-blocking tasks");
            task.parallel.extend(promoted);
        }
    }

    /// Complete every remaining child of a finished subtree. Only reached when
    /// none of them blocks parent completion. A child leaves its collection
    /// once it has been finished, so a failure keeps the rest attached.
    fn finish_child_tasks(&mut self, id: TaskId) -> Result<(), TaskError> {
        for kind in [ChildList::Parallel, ChildList::Sequential] {
            while let Some(child) = self.child_at(id, kind, End::Front) {
                self.force_finish(child)?;
                self.release_child(id, kind, child);
            }
        }
        Ok(())
    }

    fn force_finish(&mut self, id: TaskId) -> Result<(), TaskError> {
        let already_finished = self.finished(id);
        let Some(task) = self.nodes.get_mut(&id) else {
            return Ok(());
        };

        if !task.state.complete {
            if !task.state.started {
                return self.cancel_task(id);
            }
            task.state.complete = true;
            debug!(task = %task.name, "task force-finished");
            self.fire_finish(id)?;
        }
        self.finish_child_tasks(id)?;
        if !already_finished {
            self.fire_finish_all(id)?;
        }
        Ok(())
    }

    pub(crate) fn cancel_task(&mut self, id: TaskId) -> Result<(), TaskError> {
        self.cancel_child_tasks(id)?;

        let Some(task) = self.nodes.get_mut(&id) else {
            return Ok(());
        };
        if task.state.cancelled {
            return Ok(());
        }
        task.state.cancelled = true;
        let mid_update = task.state.started && !task.state.complete;
        debug!(task = %task.name, mid_update, "task cancelled");

        if mid_update {
            task.state.complete = true;
            self.fire(id, TaskPhase::CancelUpdate)?;
        }
        self.fire(id, TaskPhase::Cancel)
    }

    /// Sequential children last-attached first, then parallel children the same
    /// way. A child leaves its collection once it has been cancelled, so a
    /// failure keeps the rest attached for the next call.
    fn cancel_child_tasks(&mut self, id: TaskId) -> Result<(), TaskError> {
        for kind in [ChildList::Sequential, ChildList::Parallel] {
            while let Some(child) = self.child_at(id, kind, End::Back) {
                self.cancel_task(child)?;
                self.release_child(id, kind, child);
            }
        }
        Ok(())
    }

    fn child_at(&self, id: TaskId, kind: ChildList, end: End) -> Option<TaskId> {
        let task = self.nodes.get(&id)?;
        let children = match kind {
            ChildList::Sequential => &task.sequential,
            ChildList::Parallel => &task.parallel,
        };
        match end {
            End::Front => children.first().copied(),
            End::Back => children.last().copied(),
        }
    }

    fn release_child(&mut self, id: TaskId, kind: ChildList, child: TaskId) {
        if let Some(task) = self.nodes.get_mut(&id) {
            let children = match kind {
                ChildList::Sequential => &mut task.sequential,
                ChildList::Parallel => &mut task.parallel,
            };
            children.retain(|entry| *entry != child);
        }
        self.detach(child);
    }

    pub(crate) fn suspend(&mut self, id: TaskId) -> Result<(), TaskError> {
        let Some(task) = self.nodes.get_mut(&id) else {
            return Ok(());
        };
        if task.state.suspended || !task.state.started {
            return Ok(());
        }
        task.state.suspended = true;
        debug!(task = %task.name, "task suspended");
        self.fire(id, TaskPhase::Suspend)
    }

    fn unsuspend(&mut self, id: TaskId) -> Result<(), TaskError> {
        let Some(task) = self.nodes.get_mut(&id) else {
            return Ok(());
        };
        if !task.state.suspended {
            return Ok(());
        }
        task.state.suspended = false;
        debug!(task = %task.name, "task resumed");
        self.fire(id, TaskPhase::Resume)
    }
}

#[derive(Clone, Copy)]
enum ChildList {
    Sequential,
    Parallel,
}

#[derive(Clone, Copy)]
enum End {
    Front,
    Back,
}

/// Whole intervals contained in `span`
fn whole_steps(span: f64, interval: f64) -> u64 {
    if interval <= 0.0 || span <= 0.0 {
        return 0;
    }
    // Absorb accumulated rounding so 0.03 + 0.04 + 0.03 still counts as one 0.1 step.
    ((span / interval) + 1e-9).floor() as u64
}
