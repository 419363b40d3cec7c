use crate::task::{Behavior, TaskContext};
use std::fmt;

type Predicate = Box<dyn FnMut() -> bool>;

/// Holds its task while the predicate stays true
pub struct BlockWhile {
    predicate: Predicate,
}

impl BlockWhile {
    pub fn new(predicate: impl FnMut() -> bool + 'static) -> Self {
        Self {
            predicate: Box::new(predicate),
        }
    }
}

impl Behavior for BlockWhile {
    fn default_name(&self) -> String {
        "BlockWhile".to_string()
    }

    fn update(&mut self, _ctx: &mut TaskContext<'_>, _dt: f64) -> anyhow::Result<bool> {
        Ok(!(self.predicate)())
    }
}

impl fmt::Debug for BlockWhile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockWhile").finish_non_exhaustive()
    }
}

/// Holds its task until the predicate turns true
pub struct BlockUntil {
    predicate: Predicate,
}

impl BlockUntil {
    pub fn new(predicate: impl FnMut() -> bool + 'static) -> Self {
        Self {
            predicate: Box::new(predicate),
        }
    }
}

impl Behavior for BlockUntil {
    fn default_name(&self) -> String {
        "BlockUntil".to_string()
    }

    fn update(&mut self, _ctx: &mut TaskContext<'_>, _dt: f64) -> anyhow::Result<bool> {
        Ok((self.predicate)())
    }
}

impl fmt::Debug for BlockUntil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockUntil").finish_non_exhaustive()
    }
}
