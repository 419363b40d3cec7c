//! Lifecycle notifications.
//!
//! Every task carries one [`Signal`] per notification kind. A signal is an
//! ordered, keyed registry of observers; the engine fires it synchronously and
//! routes failures through the task's exception observers (see
//! [`TaskTree::trap`]).

use crate::task::context::TaskContext;
use crate::task::tree::TaskTree;
use crate::task::types::{TaskError, TaskId, TaskPhase};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace};

/// Observer for start/finish/finish-all/suspend/resume/cancel/cancel-update
pub type TaskCallback = dyn FnMut(&mut TaskContext<'_>) -> anyhow::Result<()>;

/// Observer for errors raised while a task runs
pub type ExceptionCallback = dyn FnMut(&mut TaskContext<'_>, &TaskError);

struct Slot<F: ?Sized> {
    key: String,
    callback: Rc<RefCell<F>>,
}

/// Ordered registry of observers for one notification kind
pub struct Signal<F: ?Sized> {
    slots: Vec<Slot<F>>,
    blocked: u32,
    anonymous: u64,
}

impl<F: ?Sized> Default for Signal<F> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            blocked: 0,
            anonymous: 0,
        }
    }
}

impl<F: ?Sized> Signal<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shared observer; an existing observer with the same key is replaced in place
    pub fn connect_shared(&mut self, key: impl Into<String>, callback: Rc<RefCell<F>>) -> &mut Self {
        let key = key.into();
        match self.slots.iter_mut().find(|slot| slot.key == key) {
            Some(slot) => slot.callback = callback,
            None => self.slots.push(Slot { key, callback }),
        }
        self
    }

    /// Remove the observer registered under `key`. Unknown keys are ignored.
    pub fn disconnect(&mut self, key: &str) -> bool {
        let before = self.slots.len();
        self.slots.retain(|slot| slot.key != key);
        before != self.slots.len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.slots.iter().any(|slot| slot.key == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|slot| slot.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Silence the signal; nested calls must be balanced by [`Signal::unblock`]
    pub fn block(&mut self) {
        self.blocked += 1;
    }

    pub fn unblock(&mut self) {
        self.blocked = self.blocked.saturating_sub(1);
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked > 0
    }

    /// Has observers and is not blocked
    pub fn is_active(&self) -> bool {
        !self.is_blocked() && !self.is_empty()
    }

    pub(crate) fn snapshot(&self) -> Vec<Rc<RefCell<F>>> {
        if self.is_blocked() {
            return Vec::new();
        }
        self.slots.iter().map(|slot| Rc::clone(&slot.callback)).collect()
    }

    fn next_key(&mut self) -> String {
        self.anonymous += 1;
        format!("#{}", self.anonymous)
    }
}

impl Signal<TaskCallback> {
    pub fn connect<F>(&mut self, key: impl Into<String>, callback: F) -> &mut Self
    where
        F: FnMut(&mut TaskContext<'_>) -> anyhow::Result<()> + 'static,
    {
        let callback: Rc<RefCell<TaskCallback>> = Rc::new(RefCell::new(callback));
        self.connect_shared(key, callback)
    }

    /// Register under a generated key, returned for later [`Signal::disconnect`]
    pub fn push<F>(&mut self, callback: F) -> String
    where
        F: FnMut(&mut TaskContext<'_>) -> anyhow::Result<()> + 'static,
    {
        let key = self.next_key();
        self.connect(key.clone(), callback);
        key
    }
}

impl Signal<ExceptionCallback> {
    pub fn connect<F>(&mut self, key: impl Into<String>, callback: F) -> &mut Self
    where
        F: FnMut(&mut TaskContext<'_>, &TaskError) + 'static,
    {
        let callback: Rc<RefCell<ExceptionCallback>> = Rc::new(RefCell::new(callback));
        self.connect_shared(key, callback)
    }

    pub fn push<F>(&mut self, callback: F) -> String
    where
        F: FnMut(&mut TaskContext<'_>, &TaskError) + 'static,
    {
        let key = self.next_key();
        self.connect(key.clone(), callback);
        key
    }
}

impl<F: ?Sized> fmt::Debug for Signal<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("keys", &self.keys().collect::<Vec<_>>())
            .field("blocked", &self.blocked)
            .finish()
    }
}

/// The per-task set of lifecycle signals
#[derive(Default, Debug)]
pub struct TaskEvents {
    pub on_start: Signal<TaskCallback>,
    pub on_finish: Signal<TaskCallback>,
    pub on_finish_all: Signal<TaskCallback>,
    pub on_suspend: Signal<TaskCallback>,
    pub on_resume: Signal<TaskCallback>,
    pub on_cancel: Signal<TaskCallback>,
    pub on_cancel_update: Signal<TaskCallback>,
    pub on_exception: Signal<ExceptionCallback>,
}

impl TaskEvents {
    pub fn signal(&self, phase: TaskPhase) -> Option<&Signal<TaskCallback>> {
        match phase {
            TaskPhase::Update => None,
            TaskPhase::Start => Some(&self.on_start),
            TaskPhase::Finish => Some(&self.on_finish),
            TaskPhase::FinishAll => Some(&self.on_finish_all),
            TaskPhase::Suspend => Some(&self.on_suspend),
            TaskPhase::Resume => Some(&self.on_resume),
            TaskPhase::Cancel => Some(&self.on_cancel),
            TaskPhase::CancelUpdate => Some(&self.on_cancel_update),
        }
    }

    pub fn signal_mut(&mut self, phase: TaskPhase) -> Option<&mut Signal<TaskCallback>> {
        match phase {
            TaskPhase::Update => None,
            TaskPhase::Start => Some(&mut self.on_start),
            TaskPhase::Finish => Some(&mut self.on_finish),
            TaskPhase::FinishAll => Some(&mut self.on_finish_all),
            TaskPhase::Suspend => Some(&mut self.on_suspend),
            TaskPhase::Resume => Some(&mut self.on_resume),
            TaskPhase::Cancel => Some(&mut self.on_cancel),
            TaskPhase::CancelUpdate => Some(&mut self.on_cancel_update),
        }
    }

    /// Whether errors raised by this task are trapped rather than propagated
    pub fn handles_exceptions(&self) -> bool {
        self.on_exception.is_active()
    }
}

impl TaskTree {
    /// Fire every observer of `phase` on `id`, in registration order.
    ///
    /// The first failing observer stops the notification; its error goes
    /// through [`TaskTree::trap`].
    pub(crate) fn fire(&mut self, id: TaskId, phase: TaskPhase) -> Result<(), TaskError> {
        let observers = match self.nodes.get(&id).and_then(|task| task.events.signal(phase)) {
            Some(signal) => signal.snapshot(),
            None => return Ok(()),
        };

        for observer in observers {
            let Ok(mut callback) = observer.try_borrow_mut() else {
                trace!(task = %id, %phase, "observer already running, skipped");
                continue;
            };
            let outcome = {
                let mut ctx = TaskContext::new(self, id);
                (&mut *callback)(&mut ctx)
            };
            if let Err(source) = outcome {
                let error = TaskError::callback(self.name_of(id), phase, source);
                return self.trap(id, Err(error));
            }
        }
        Ok(())
    }

    /// Route a failed step to the task's exception observers, or hand it back
    /// to the caller when there are none.
    pub(crate) fn trap(&mut self, id: TaskId, result: Result<(), TaskError>) -> Result<(), TaskError> {
        match result {
            Ok(()) => Ok(()),
            Err(error) if self.handles_exceptions(id) => {
                debug!(task = %id, %error, "error trapped by exception observers");
                self.notify_exception(id, &error);
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    pub(crate) fn handles_exceptions(&self, id: TaskId) -> bool {
        self.nodes
            .get(&id)
            .is_some_and(|task| task.events.handles_exceptions())
    }

    pub(crate) fn notify_exception(&mut self, id: TaskId, error: &TaskError) {
        let observers = match self.nodes.get(&id) {
            Some(task) => task.events.on_exception.snapshot(),
            None => return,
        };
        for observer in observers {
            let Ok(mut callback) = observer.try_borrow_mut() else {
                continue;
            };
            let mut ctx = TaskContext::new(self, id);
            (&mut *callback)(&mut ctx, error);
        }
    }
}
