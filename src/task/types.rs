use crate::task::behavior::{self, Behavior, SharedBehavior};
use crate::task::context::TaskContext;
use crate::task::events::TaskEvents;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for tasks
pub type TaskId = Uuid;

/// Local completion predicate: returns `Ok(true)` once the task's own work is done.
pub type TaskAction = dyn FnMut(&mut TaskContext<'_>, f64) -> anyhow::Result<bool>;

/// Which part of a task was executing when a callback failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskPhase {
    Update,
    Start,
    Finish,
    FinishAll,
    Suspend,
    Resume,
    Cancel,
    CancelUpdate,
}

impl fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TaskPhase::Update => "update",
            TaskPhase::Start => "start",
            TaskPhase::Finish => "finish",
            TaskPhase::FinishAll => "finish-all",
            TaskPhase::Suspend => "suspend",
            TaskPhase::Resume => "resume",
            TaskPhase::Cancel => "cancel",
            TaskPhase::CancelUpdate => "cancel-update",
        };
        f.write_str(label)
    }
}

/// Errors raised by tree operations and task callbacks
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("failed to find [{name}] in task [{parent}]")]
    NotFound { name: String, parent: String },

    #[error("task {0} is not part of this tree")]
    UnknownTask(TaskId),

    #[error("task [{task}] failed during {phase}: {source}")]
    Callback {
        task: String,
        phase: TaskPhase,
        #[source]
        source: anyhow::Error,
    },
}

impl TaskError {
    pub(crate) fn callback(task: impl Into<String>, phase: TaskPhase, source: anyhow::Error) -> Self {
        TaskError::Callback {
            task: task.into(),
            phase,
            source,
        }
    }

    /// Phase of the failing callback, if this error came from one
    pub fn phase(&self) -> Option<TaskPhase> {
        match self {
            TaskError::Callback { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

/// Timers, stepped continuously or in fixed quanta
#[derive(Debug, Clone, Default)]
pub(crate) struct TaskClock {
    pub total_time: f64,
    pub last_interval: f64,
    pub current_step: u64,
    pub total_local_time: f64,
    pub last_local_interval: f64,
    pub current_local_step: u64,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct TaskState {
    pub started: bool,
    pub complete: bool,
    pub cancelled: bool,
    pub suspended: bool,
    pub finish_fired: bool,
    pub finish_all_fired: bool,
}

/// A node of the task tree.
///
/// A `Task` is built detached (see [`Task::new`] and friends), configured with the
/// consuming setters, then handed to one of the [`TaskTree`](crate::task::TaskTree)
/// attachment operations which assigns its parent and takes ownership of it.
pub struct Task {
    pub(crate) id: TaskId,
    pub(crate) name: String,
    pub(crate) parent: Option<TaskId>,
    pub(crate) action: Rc<RefCell<TaskAction>>,
    pub(crate) behavior: Option<SharedBehavior>,
    pub(crate) sequential: Vec<TaskId>,
    pub(crate) parallel: Vec<TaskId>,
    pub(crate) blocking: bool,
    pub(crate) block_parent_completion: bool,
    pub(crate) always_run_children: bool,
    pub(crate) interval: f64,
    pub(crate) local_interval: f64,
    pub(crate) clock: TaskClock,
    pub(crate) state: TaskState,
    pub(crate) events: TaskEvents,
}

impl Task {
    /// Create a task driven by a caller-supplied completion predicate
    pub fn new<F>(name: impl Into<String>, action: F) -> Self
    where
        F: FnMut(&mut TaskContext<'_>, f64) -> anyhow::Result<bool> + 'static,
    {
        let action: Rc<RefCell<TaskAction>> = Rc::new(RefCell::new(action));
        Self::with_action(name.into(), action)
    }

    /// A control construct that completes on its first step
    pub fn instant(name: impl Into<String>) -> Self {
        Self::new(name, |_, _| Ok(true))
    }

    /// A task that never completes locally and always runs its children.
    ///
    /// Useful as a long-lived root or as a background branch that only ends
    /// when cancelled or force-finished by its parent.
    pub fn infinite(name: impl Into<String>) -> Self {
        Self::new(name, |_, _| Ok(false)).always_run_children(true)
    }

    /// Bind a behavior, naming the task after [`Behavior::default_name`]
    pub fn from_behavior<B: Behavior + 'static>(behavior: B) -> Self {
        let name = behavior.default_name();
        Self::with_behavior(name, behavior)
    }

    /// Bind a behavior under an explicit name
    pub fn with_behavior<B: Behavior + 'static>(name: impl Into<String>, behavior: B) -> Self {
        Self::from_shared_behavior(name, Rc::new(RefCell::new(behavior)))
    }

    /// Bind a behavior the caller keeps a typed handle to
    pub fn from_shared_behavior<B: Behavior + 'static>(
        name: impl Into<String>,
        behavior: Rc<RefCell<B>>,
    ) -> Self {
        let shared: SharedBehavior = behavior;
        let mut task = Self::instant(name);
        behavior::bind(&mut task, shared);
        task
    }

    fn with_action(name: String, action: Rc<RefCell<TaskAction>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            parent: None,
            action,
            behavior: None,
            sequential: Vec::new(),
            parallel: Vec::new(),
            blocking: true,
            block_parent_completion: true,
            always_run_children: false,
            interval: 0.0,
            local_interval: 0.0,
            clock: TaskClock::default(),
            state: TaskState::default(),
            events: TaskEvents::default(),
        }
    }

    pub fn blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    pub fn block_parent_completion(mut self, block: bool) -> Self {
        self.block_parent_completion = block;
        self
    }

    pub fn always_run_children(mut self, always: bool) -> Self {
        self.always_run_children = always;
        self
    }

    /// Quantize subtree stepping to a fixed interval (0 disables)
    pub fn interval(mut self, interval: f64) -> Self {
        self.interval = interval.max(0.0);
        self
    }

    /// Quantize local predicate stepping to a fixed interval (0 disables)
    pub fn local_interval(mut self, interval: f64) -> Self {
        self.local_interval = interval.max(0.0);
        self
    }

    pub fn on_start<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&mut TaskContext<'_>) -> anyhow::Result<()> + 'static,
    {
        self.events.on_start.push(callback);
        self
    }

    pub fn on_finish<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&mut TaskContext<'_>) -> anyhow::Result<()> + 'static,
    {
        self.events.on_finish.push(callback);
        self
    }

    pub fn on_finish_all<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&mut TaskContext<'_>) -> anyhow::Result<()> + 'static,
    {
        self.events.on_finish_all.push(callback);
        self
    }

    pub fn on_suspend<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&mut TaskContext<'_>) -> anyhow::Result<()> + 'static,
    {
        self.events.on_suspend.push(callback);
        self
    }

    pub fn on_resume<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&mut TaskContext<'_>) -> anyhow::Result<()> + 'static,
    {
        self.events.on_resume.push(callback);
        self
    }

    pub fn on_cancel<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&mut TaskContext<'_>) -> anyhow::Result<()> + 'static,
    {
        self.events.on_cancel.push(callback);
        self
    }

    pub fn on_cancel_update<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&mut TaskContext<'_>) -> anyhow::Result<()> + 'static,
    {
        self.events.on_cancel_update.push(callback);
        self
    }

    /// Trap errors raised while this task runs instead of propagating them
    pub fn on_exception<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&mut TaskContext<'_>, &TaskError) + 'static,
    {
        self.events.on_exception.push(callback);
        self
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<TaskId> {
        self.parent
    }

    /// Subtree time, quantized to the interval boundary when one is set
    pub fn elapsed(&self) -> f64 {
        self.clock.last_interval
    }

    /// Local predicate time, quantized to the local interval when one is set
    pub fn local_elapsed(&self) -> f64 {
        self.clock.last_local_interval
    }

    pub fn is_started(&self) -> bool {
        self.state.started
    }

    /// The local predicate has completed (or the task was cancelled mid-update)
    pub fn is_complete(&self) -> bool {
        self.state.complete
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled
    }

    pub fn is_suspended(&self) -> bool {
        self.state.suspended
    }

    pub fn is_blocking(&self) -> bool {
        self.blocking
    }

    pub fn blocks_parent_completion(&self) -> bool {
        self.block_parent_completion
    }

    pub fn runs_children_always(&self) -> bool {
        self.always_run_children
    }

    pub fn tick_interval(&self) -> f64 {
        self.interval
    }

    pub fn local_tick_interval(&self) -> f64 {
        self.local_interval
    }

    pub fn set_always_run_children(&mut self, always: bool) -> &mut Self {
        self.always_run_children = always;
        self
    }

    pub fn set_interval(&mut self, interval: f64) -> &mut Self {
        self.interval = interval.max(0.0);
        self
    }

    pub fn set_local_interval(&mut self, interval: f64) -> &mut Self {
        self.local_interval = interval.max(0.0);
        self
    }

    pub fn sequential(&self) -> &[TaskId] {
        &self.sequential
    }

    pub fn parallel(&self) -> &[TaskId] {
        &self.parallel
    }

    pub fn is_empty(&self) -> bool {
        self.sequential.is_empty() && self.parallel.is_empty()
    }

    pub fn behavior(&self) -> Option<&SharedBehavior> {
        self.behavior.as_ref()
    }

    pub fn events(&self) -> &TaskEvents {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut TaskEvents {
        &mut self.events
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("sequential", &self.sequential)
            .field("parallel", &self.parallel)
            .field("blocking", &self.blocking)
            .field("block_parent_completion", &self.block_parent_completion)
            .field("always_run_children", &self.always_run_children)
            .field("clock", &self.clock)
            .field("state", &self.state)
            .field("behavior", &self.behavior.is_some())
            .finish()
    }
}
