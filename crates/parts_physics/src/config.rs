//! Physics configuration

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Physics world configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Gravity vector (default: -9.81 in Y)
    pub gravity: Vec3,
    /// Fixed timestep for physics simulation
    pub timestep: f32,
    /// Linear damping applied to dynamic bodies each step (0 = none)
    pub linear_damping: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            timestep: 1.0 / 50.0,
            linear_damping: 0.0,
        }
    }
}

impl PhysicsConfig {
    /// Zero-gravity configuration
    pub fn zero_gravity() -> Self {
        Self {
            gravity: Vec3::ZERO,
            ..Default::default()
        }
    }

    /// Set gravity
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    /// Set linear damping
    pub fn with_damping(mut self, damping: f32) -> Self {
        self.linear_damping = damping.max(0.0);
        self
    }
}
