/// Simulation speed multipliers offered to the player.
pub const TIME_SCALE_FACTORS: [f32; 6] = [0.0, 0.25, 0.5, 1.0, 2.0, 4.0];

const DEFAULT_INDEX: usize = 3;

/// Selected entry of [`TIME_SCALE_FACTORS`]. Scales the frame delta fed to
/// the fixed-step clock, so zero pauses the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeScale {
    index: usize,
}

impl Default for TimeScale {
    fn default() -> Self {
        Self {
            index: DEFAULT_INDEX,
        }
    }
}

impl TimeScale {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Out-of-range indices clamp to the fastest entry.
    pub fn select(&mut self, index: usize) {
        self.index = index.min(TIME_SCALE_FACTORS.len() - 1);
    }

    pub fn factor(&self) -> f32 {
        TIME_SCALE_FACTORS[self.index]
    }

    pub fn scale(&self, dt: f32) -> f32 {
        dt * self.factor()
    }

    pub fn is_paused(&self) -> bool {
        self.factor() == 0.0
    }
}
