//! Reusable task behaviors.
//!
//! A [`Behavior`] supplies a task's completion predicate and may react to any
//! of its lifecycle notifications. Binding one to a task wires every hook into
//! the task's signals under [`BEHAVIOR_KEY`], so the engine never needs to know
//! the concrete behavior type.

use crate::task::context::TaskContext;
use crate::task::types::{Task, TaskError};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::warn;

/// Signal key every behavior hook is registered under
pub const BEHAVIOR_KEY: &str = "behavior";

/// Type-erased behavior shared between a task and its hooks
pub type SharedBehavior = Rc<RefCell<dyn Behavior>>;

type Hook = fn(&mut (dyn Behavior + 'static), &mut TaskContext<'_>) -> anyhow::Result<()>;

pub trait Behavior {
    /// Name used when a task is created from this behavior without one
    fn default_name(&self) -> String {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Return `Ok(true)` once the behavior's work is done
    fn update(&mut self, _ctx: &mut TaskContext<'_>, _dt: f64) -> anyhow::Result<bool> {
        Ok(true)
    }

    fn on_start(&mut self, _ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_finish(&mut self, _ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_finish_all(&mut self, _ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_suspend(&mut self, _ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_resume(&mut self, _ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_cancel(&mut self, _ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_cancel_update(&mut self, _ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Only called when [`Behavior::handles_exceptions`] returns true
    fn on_exception(&mut self, _ctx: &mut TaskContext<'_>, _error: &TaskError) {}

    /// Registering an exception observer traps errors for the whole task,
    /// so behaviors opt in explicitly.
    fn handles_exceptions(&self) -> bool {
        false
    }
}

pub(crate) fn bind(task: &mut Task, behavior: SharedBehavior) {
    let events = &mut task.events;
    events
        .on_start
        .connect(BEHAVIOR_KEY, hook(&behavior, |b, ctx| b.on_start(ctx)));
    events
        .on_finish
        .connect(BEHAVIOR_KEY, hook(&behavior, |b, ctx| b.on_finish(ctx)));
    events
        .on_finish_all
        .connect(BEHAVIOR_KEY, hook(&behavior, |b, ctx| b.on_finish_all(ctx)));
    events
        .on_suspend
        .connect(BEHAVIOR_KEY, hook(&behavior, |b, ctx| b.on_suspend(ctx)));
    events
        .on_resume
        .connect(BEHAVIOR_KEY, hook(&behavior, |b, ctx| b.on_resume(ctx)));
    events
        .on_cancel
        .connect(BEHAVIOR_KEY, hook(&behavior, |b, ctx| b.on_cancel(ctx)));
    events.on_cancel_update.connect(
        BEHAVIOR_KEY,
        hook(&behavior, |b, ctx| b.on_cancel_update(ctx)),
    );

    if behavior.borrow().handles_exceptions() {
        let handler = Rc::clone(&behavior);
        events.on_exception.connect(
            BEHAVIOR_KEY,
            move |ctx: &mut TaskContext<'_>, error: &TaskError| {
                if let Ok(mut inner) = handler.try_borrow_mut() {
                    inner.on_exception(ctx, error);
                }
            },
        );
    }

    let updater = Rc::clone(&behavior);
    task.action = Rc::new(RefCell::new(
        move |ctx: &mut TaskContext<'_>, dt: f64| match updater.try_borrow_mut() {
            Ok(mut inner) => inner.update(ctx, dt),
            Err(_) => Ok(false),
        },
    ));
    task.behavior = Some(behavior);
}

fn hook(
    behavior: &SharedBehavior,
    call: Hook,
) -> impl FnMut(&mut TaskContext<'_>) -> anyhow::Result<()> + 'static {
    let behavior = Rc::clone(behavior);
    move |ctx: &mut TaskContext<'_>| match behavior.try_borrow_mut() {
        Ok(mut inner) => call(&mut *inner, ctx),
        Err(_) => {
            warn!(task = %ctx.name(), "behavior is already running, hook skipped");
            Ok(())
        }
    }
}

fn short_type_name(full: &str) -> String {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe;
    impl Behavior for Probe {}

    #[test]
    fn test_default_name_is_short_type_name() {
        assert_eq!(Probe.default_name(), "Probe");
        assert_eq!(short_type_name("a::b::Wait<f64>"), "Wait");
    }

    #[test]
    fn test_bind_registers_hooks_without_exception_handler() {
        let task = Task::from_behavior(Probe);
        let events = task.events();

        assert_eq!(task.name(), "Probe");
        assert!(events.on_start.contains(BEHAVIOR_KEY));
        assert!(events.on_cancel_update.contains(BEHAVIOR_KEY));
        assert!(!events.handles_exceptions());
        assert!(task.behavior().is_some());
    }
}
