use std::time::Instant;
use towerdef_common::math::smoothstep;

/// Whole fixed steps granted by one frame's worth of elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepBudget {
    /// Steps the caller must run now.
    pub steps: u32,
    /// Steps dropped by the per-frame cap. Always zero when uncapped.
    pub skipped: u32,
}

/// Converts variable frame deltas into fixed simulation steps.
///
/// Uncapped by default: a long stall is paid back with as many steps as it
/// takes. A cap trades that for dropped time, reported as `skipped`.
#[derive(Debug, Clone)]
pub struct FixedStepClock {
    step: f32,
    accumulator: f32,
    max_steps_per_frame: Option<u32>,
}

impl FixedStepClock {
    pub fn new(step: f32) -> Self {
        assert!(step > 0.0 && step.is_finite(), "fixed step must be positive");
        Self {
            step,
            accumulator: 0.0,
            max_steps_per_frame: None,
        }
    }

    pub fn with_max_steps(mut self, max_steps_per_frame: Option<u32>) -> Self {
        self.max_steps_per_frame = max_steps_per_frame;
        self
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    /// Time not yet consumed by a fixed step.
    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    /// Add `dt` seconds and take out every whole step it completes.
    ///
    /// Negative or non-finite deltas count as zero. The whole-step count is
    /// computed in one division, so a huge `dt` costs no more than a small
    /// one; counts beyond `u32::MAX` saturate.
    pub fn accumulate(&mut self, dt: f32) -> StepBudget {
        if dt.is_finite() && dt > 0.0 {
            self.accumulator += dt;
        }
        if !self.accumulator.is_finite() {
            self.accumulator = 0.0;
        }

        let remainder = self.accumulator.rem_euclid(self.step);
        let whole = ((self.accumulator - remainder) / self.step).round() as u32;
        self.accumulator = remainder;

        let steps = match self.max_steps_per_frame {
            Some(cap) => whole.min(cap),
            None => whole,
        };
        StepBudget {
            steps,
            skipped: whole - steps,
        }
    }

    /// Eased progress from the previous step towards the next one, in `[0, 1]`.
    pub fn interpolation_factor(&self) -> f32 {
        smoothstep(0.0, self.step, self.accumulator)
    }
}

/// Real elapsed time between frames.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
        }
    }

    /// Seconds since the previous tick (or since construction).
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let dt = (now - self.last).as_secs_f32();
        self.last = now;
        dt
    }
}
