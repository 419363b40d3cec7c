//! Reusable leaf behaviors.
//!
//! Each type here implements [`Behavior`](crate::task::Behavior) and is meant
//! to be bound to a task with [`Task::from_behavior`](crate::task::Task::from_behavior)
//! or one of its siblings.

pub mod future;
pub mod lock;
pub mod predicate;
pub mod timing;
pub mod tween;

pub use future::FutureAdapter;
pub use lock::{LockTable, LockWrapper, SharedLockTable};
pub use predicate::{BlockUntil, BlockWhile};
pub use timing::{BlockForFrames, BlockForSeconds};
pub use tween::{Tween, TweenEndpoint};
