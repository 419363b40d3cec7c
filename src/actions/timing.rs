use crate::task::{Behavior, TaskContext};

/// Holds its task until the local timer reaches a duration
#[derive(Debug, Clone, Copy)]
pub struct BlockForSeconds {
    seconds: f64,
}

impl BlockForSeconds {
    pub fn new(seconds: f64) -> Self {
        Self { seconds }
    }

    pub fn seconds(&self) -> f64 {
        self.seconds
    }
}

impl Behavior for BlockForSeconds {
    fn default_name(&self) -> String {
        format!("BlockForSeconds({:.2})", self.seconds)
    }

    fn update(&mut self, ctx: &mut TaskContext<'_>, _dt: f64) -> anyhow::Result<bool> {
        Ok(ctx.local_elapsed() >= self.seconds)
    }
}

/// Holds its task for a number of local steps, finishing on the step after
#[derive(Debug, Clone, Copy)]
pub struct BlockForFrames {
    frames: u64,
    seen: u64,
}

impl BlockForFrames {
    pub fn new(frames: u64) -> Self {
        Self { frames, seen: 0 }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Default for BlockForFrames {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Behavior for BlockForFrames {
    fn default_name(&self) -> String {
        format!("BlockForFrames({})", self.frames)
    }

    fn update(&mut self, _ctx: &mut TaskContext<'_>, _dt: f64) -> anyhow::Result<bool> {
        let done = self.seen >= self.frames;
        self.seen += 1;
        Ok(done)
    }
}
