//! Speed profiles
//!
//! Deployments use one of two resolutions for the commanded speed: the full
//! controller range in steps of 100, or a percentage-like range in steps of 5.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::units::clamp;

/// Step size and bounds for the commanded speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeedProfile {
    /// Change applied by one increment/decrement
    pub step: i32,
    /// Lowest commandable speed (full reverse)
    pub min: i32,
    /// Highest commandable speed (full forward)
    pub max: i32,
}

impl SpeedProfile {
    /// ±100 over [-2048, 2048]
    pub const FINE: SpeedProfile = SpeedProfile {
        step: 100,
        min: -2048,
        max: 2048,
    };

    /// ±5 over [-100, 100]
    pub const COARSE: SpeedProfile = SpeedProfile {
        step: 5,
        min: -100,
        max: 100,
    };

    /// Clamp a speed into this profile's bounds
    pub fn clamp(&self, speed: i32) -> i32 {
        clamp(self.min, self.max, speed)
    }

    /// Speed after `steps` increments (negative for decrements), clamped
    pub fn adjust(&self, speed: i32, steps: i32) -> i32 {
        self.clamp(speed.saturating_add(self.step.saturating_mul(steps)))
    }

    /// Check the profile can hold a stopped motor and actually moves it
    pub fn validate(&self) -> Result<(), String> {
        if self.step <= 0 {
            return Err(format!("speed step must be positive, got {}", self.step));
        }
        if self.min > 0 || self.max < 0 {
            return Err(format!(
                "speed bounds [{}, {}] must include 0",
                self.min, self.max
            ));
        }
        Ok(())
    }
}

impl Default for SpeedProfile {
    fn default() -> Self {
        Self::FINE
    }
}

impl fmt::Display for SpeedProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "±{} over [{}, {}]", self.step, self.min, self.max)
    }
}
