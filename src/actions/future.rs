use crate::task::{Behavior, TaskContext};
use futures::future::{FutureExt, LocalBoxFuture};
use futures::task::noop_waker_ref;
use std::fmt;
use std::future::Future;
use std::task::{Context, Poll};
use tracing::trace;

/// Drives a future from the tick loop.
///
/// The future is polled once per local step with a no-op waker, so anything
/// it awaits must make progress without being woken (timers driven by task
/// time, flags set by other tasks, channels fed elsewhere in the same tick).
/// Suspending the task pauses polling; cancelling it drops the future.
pub struct FutureAdapter {
    future: Option<LocalBoxFuture<'static, anyhow::Result<()>>>,
    armed: bool,
    done: bool,
    polls: u64,
}

impl FutureAdapter {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = ()> + 'static,
    {
        Self::fallible(future.map(|()| Ok(())))
    }

    /// A future whose error is reported as a failure of the task's update
    pub fn fallible<F>(future: F) -> Self
    where
        F: Future<Output = anyhow::Result<()>> + 'static,
    {
        Self {
            future: Some(future.boxed_local()),
            armed: false,
            done: false,
            polls: 0,
        }
    }

    pub fn polls(&self) -> u64 {
        self.polls
    }

    pub fn is_done(&self) -> bool {
        self.done
    }
}

impl Behavior for FutureAdapter {
    fn default_name(&self) -> String {
        "FutureAdapter".to_string()
    }

    fn update(&mut self, _ctx: &mut TaskContext<'_>, _dt: f64) -> anyhow::Result<bool> {
        if self.done {
            return Ok(true);
        }
        if !self.armed {
            return Ok(false);
        }
        let Some(future) = self.future.as_mut() else {
            return Ok(false);
        };

        self.polls += 1;
        let mut cx = Context::from_waker(noop_waker_ref());
        match future.poll_unpin(&mut cx) {
            Poll::Ready(result) => {
                trace!(polls = self.polls, "future completed");
                self.future = None;
                self.done = true;
                result.map(|()| true)
            }
            Poll::Pending => Ok(false),
        }
    }

    fn on_start(&mut self, _ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        self.armed = true;
        Ok(())
    }

    fn on_resume(&mut self, _ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        self.armed = true;
        Ok(())
    }

    fn on_suspend(&mut self, _ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        self.armed = false;
        Ok(())
    }

    fn on_cancel(&mut self, _ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        self.armed = false;
        self.future = None;
        Ok(())
    }
}

impl fmt::Debug for FutureAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FutureAdapter")
            .field("pending", &self.future.is_some())
            .field("armed", &self.armed)
            .field("done", &self.done)
            .field("polls", &self.polls)
            .finish()
    }
}
