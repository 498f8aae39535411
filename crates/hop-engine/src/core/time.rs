/// Fixed timestep accumulator.
/// Physics and gameplay always advance in `dt` slices regardless of frame time.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    dt: f32,
    accumulator: f32,
    max_steps: u32,
}

impl FixedTimestep {
    pub fn new(dt: f32) -> Self {
        Self {
            dt,
            accumulator: 0.0,
            max_steps: 10,
        }
    }

    /// Add frame time to the accumulator. Returns the number of fixed steps to run.
    pub fn accumulate(&mut self, frame_dt: f32) -> u32 {
        self.accumulator += frame_dt.max(0.0);
        // Cap to prevent spiral of death
        self.accumulator = self.accumulator.min(self.dt * self.max_steps as f32);
        let steps = (self.accumulator / self.dt) as u32;
        self.accumulator -= steps as f32 * self.dt;
        steps
    }

    /// Interpolation alpha for rendering between steps (0.0 to 1.0).
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.dt
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

/// Millisecond game clock. Animations sample it instead of reading wall time,
/// so every timed behaviour is reproducible in tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GameClock {
    now_ms: u64,
}

impl GameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(now_ms: u64) -> Self {
        Self { now_ms }
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Advance by `dt` seconds, rounded to the nearest millisecond.
    pub fn advance(&mut self, dt: f32) {
        self.now_ms += (dt.max(0.0) * 1000.0).round() as u64;
    }

    pub fn advance_ms(&mut self, ms: u64) {
        self.now_ms += ms;
    }
}
