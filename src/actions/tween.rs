use crate::mix::mix;
use crate::task::{Behavior, TaskContext};
use std::fmt;

/// A tween endpoint: a fixed value, or one read when the task starts or resumes
pub enum TweenEndpoint {
    Fixed(f64),
    Captured(Box<dyn FnMut() -> f64>),
}

impl TweenEndpoint {
    pub fn captured(read: impl FnMut() -> f64 + 'static) -> Self {
        TweenEndpoint::Captured(Box::new(read))
    }

    fn resolve(&mut self) -> f64 {
        match self {
            TweenEndpoint::Fixed(value) => *value,
            TweenEndpoint::Captured(read) => read(),
        }
    }
}

impl From<f64> for TweenEndpoint {
    fn from(value: f64) -> Self {
        TweenEndpoint::Fixed(value)
    }
}

impl fmt::Debug for TweenEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TweenEndpoint::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
            TweenEndpoint::Captured(_) => f.write_str("Captured"),
        }
    }
}

/// Eases a value from `start` to `end` over `duration` seconds of task time,
/// handing every intermediate value to a setter.
pub struct Tween {
    from: TweenEndpoint,
    to: TweenEndpoint,
    start: f64,
    end: f64,
    duration: f64,
    strength: f64,
    setter: Box<dyn FnMut(f64)>,
}

impl Tween {
    pub fn new(
        from: impl Into<TweenEndpoint>,
        to: impl Into<TweenEndpoint>,
        duration: f64,
        setter: impl FnMut(f64) + 'static,
    ) -> Self {
        let from = from.into();
        let to = to.into();
        let start = match from {
            TweenEndpoint::Fixed(value) => value,
            TweenEndpoint::Captured(_) => 0.0,
        };
        let end = match to {
            TweenEndpoint::Fixed(value) => value,
            TweenEndpoint::Captured(_) => 0.0,
        };
        Self {
            from,
            to,
            start,
            end,
            duration,
            strength: 1.0,
            setter: Box::new(setter),
        }
    }

    /// Easing strength passed to [`mix`]: 1 linear, 2 quad, 3 cubic
    pub fn strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }

    fn capture(&mut self) {
        self.start = self.from.resolve();
        self.end = self.to.resolve();
    }

    fn progress(&self, elapsed: f64) -> f64 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        (elapsed / self.duration).clamp(0.0, 1.0)
    }
}

impl Behavior for Tween {
    fn default_name(&self) -> String {
        format!("Tween({:.2})", self.duration)
    }

    fn update(&mut self, ctx: &mut TaskContext<'_>, _dt: f64) -> anyhow::Result<bool> {
        let elapsed = ctx.elapsed();
        let value = mix(self.start, self.end, self.progress(elapsed), self.strength);
        (self.setter)(value);
        Ok(elapsed >= self.duration)
    }

    fn on_start(&mut self, _ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        self.capture();
        Ok(())
    }

    fn on_resume(&mut self, _ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        self.capture();
        Ok(())
    }
}

impl fmt::Debug for Tween {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tween")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("start", &self.start)
            .field("end", &self.end)
            .field("duration", &self.duration)
            .field("strength", &self.strength)
            .finish_non_exhaustive()
    }
}
