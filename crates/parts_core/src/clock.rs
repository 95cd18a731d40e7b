//! Fixed-step clock

use serde::{Deserialize, Serialize};

/// Splits variable frame time into fixed steps for physics-coupled updates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedTimestep {
    /// Length of one fixed step in seconds
    pub step: f32,
    /// Maximum steps per frame; the surplus is dropped
    pub max_steps: u32,
    #[serde(skip)]
    accumulator: f32,
}

impl FixedTimestep {
    /// Create a clock with the given step
    pub fn new(step: f32) -> Self {
        Self {
            step,
            max_steps: 4,
            accumulator: 0.0,
        }
    }

    /// Set maximum steps per frame
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Feed frame time and return the number of fixed steps to run
    pub fn advance(&mut self, dt: f32) -> u32 {
        if self.step <= 0.0 {
            return 0;
        }

        self.accumulator += dt.max(0.0);
        let mut steps = 0;
        while self.accumulator >= self.step && steps < self.max_steps {
            self.accumulator -= self.step;
            steps += 1;
        }

        if steps == self.max_steps && self.accumulator >= self.step {
            log::debug!(
                "fixed step falling behind, dropping {:.3}s",
                self.accumulator
            );
            self.accumulator %= self.step;
        }

        steps
    }

    /// Fraction of a step left in the accumulator
    pub fn alpha(&self) -> f32 {
        if self.step > 0.0 {
            self.accumulator / self.step
        } else {
            0.0
        }
    }
}

impl Default for FixedTimestep {
    fn default() -> Self {
        Self::new(1.0 / 50.0)
    }
}
