//! Reference-counted named locks held for the lifetime of a task.

use crate::task::{Behavior, TaskContext, TaskError};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, error, warn};

/// Lock transition reported to [`SharedLockTable::observe`] observers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Locked,
    Unlocked,
}

type LockObserver = dyn FnMut(&str, LockState);

/// Holder counts per key
#[derive(Default)]
pub struct LockTable {
    holders: HashMap<String, usize>,
    observers: Vec<Rc<RefCell<LockObserver>>>,
}

impl LockTable {
    pub fn holders(&self, key: &str) -> usize {
        self.holders.get(key).copied().unwrap_or(0)
    }

    pub fn is_locked(&self, key: &str) -> bool {
        self.holders(key) > 0
    }

    /// Returns true when the key went from free to held
    fn acquire(&mut self, key: &str) -> bool {
        let count = self.holders.entry(key.to_string()).or_insert(0);
        *count += 1;
        *count == 1
    }

    /// Returns true when the last holder released the key
    fn release(&mut self, key: &str) -> bool {
        match self.holders.get_mut(key) {
            Some(count) if *count > 0 => {
                *count -= 1;
                if *count == 0 {
                    self.holders.remove(key);
                    return true;
                }
                false
            }
            _ => {
                warn!(key, "released a lock that is not held");
                false
            }
        }
    }
}

impl fmt::Debug for LockTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockTable")
            .field("holders", &self.holders)
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// Cloneable handle to a [`LockTable`] shared by many wrappers
#[derive(Debug, Clone, Default)]
pub struct SharedLockTable {
    inner: Rc<RefCell<LockTable>>,
}

impl SharedLockTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_locked(&self, key: &str) -> bool {
        self.inner.borrow().is_locked(key)
    }

    pub fn holders(&self, key: &str) -> usize {
        self.inner.borrow().holders(key)
    }

    /// Observe first-lock and last-unlock transitions
    pub fn observe(&self, observer: impl FnMut(&str, LockState) + 'static) {
        let observer: Rc<RefCell<LockObserver>> = Rc::new(RefCell::new(observer));
        self.inner.borrow_mut().observers.push(observer);
    }

    /// Take one hold on `key`. Prefer a [`LockWrapper`] task, which pairs
    /// every hold with a release.
    pub fn lock(&self, key: &str) {
        let first = self.inner.borrow_mut().acquire(key);
        if first {
            debug!(key, "locked");
            self.notify(key, LockState::Locked);
        }
    }

    pub fn unlock(&self, key: &str) {
        let last = self.inner.borrow_mut().release(key);
        if last {
            debug!(key, "unlocked");
            self.notify(key, LockState::Unlocked);
        }
    }

    fn notify(&self, key: &str, state: LockState) {
        let observers = self.inner.borrow().observers.clone();
        for observer in observers {
            if let Ok(mut callback) = observer.try_borrow_mut() {
                (&mut *callback)(key, state);
            }
        }
    }
}

/// Holds a set of keys while its task runs.
///
/// Keys are taken on start and resume and given back on suspend, cancel,
/// finish-all and on any error raised in the task.
#[derive(Debug)]
pub struct LockWrapper {
    table: SharedLockTable,
    keys: Vec<String>,
    held: bool,
}

impl LockWrapper {
    pub fn new(table: &SharedLockTable, key: impl Into<String>) -> Self {
        Self::with_keys(table, [key.into()])
    }

    pub fn with_keys<I, K>(table: &SharedLockTable, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            table: table.clone(),
            keys: keys.into_iter().map(Into::into).collect(),
            held: false,
        }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn hold(&mut self) {
        if self.held {
            return;
        }
        self.held = true;
        for key in &self.keys {
            self.table.lock(key);
        }
    }

    pub fn release(&mut self) {
        if !self.held {
            return;
        }
        self.held = false;
        for key in &self.keys {
            self.table.unlock(key);
        }
    }
}

impl Behavior for LockWrapper {
    fn default_name(&self) -> String {
        format!("LockWrapper({})", self.keys.join(","))
    }

    fn on_start(&mut self, _ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        self.hold();
        Ok(())
    }

    fn on_resume(&mut self, _ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        self.hold();
        Ok(())
    }

    fn on_suspend(&mut self, _ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        self.release();
        Ok(())
    }

    fn on_cancel(&mut self, _ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        self.release();
        Ok(())
    }

    fn on_finish_all(&mut self, _ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        self.release();
        Ok(())
    }

    fn on_exception(&mut self, ctx: &mut TaskContext<'_>, err: &TaskError) {
        error!(task = %ctx.name(), error = %err, "error caught in lock wrapper");
        self.release();
    }

    fn handles_exceptions(&self) -> bool {
        true
    }
}

impl Drop for LockWrapper {
    fn drop(&mut self) {
        self.release();
    }
}
