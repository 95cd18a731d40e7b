//! Rigid body state

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// How a force vector is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ForceMode {
    /// Continuous force, scaled by mass and step length
    #[default]
    Force,
    /// Continuous acceleration, ignores mass
    Acceleration,
    /// Instant kick, scaled by mass
    Impulse,
    /// Instant velocity change, ignores mass
    VelocityChange,
}

impl ForceMode {
    /// Whether the force is applied over a step rather than instantly
    pub fn is_continuous(self) -> bool {
        matches!(self, Self::Force | Self::Acceleration)
    }
}

/// Rigid body attached to a collider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigidBody {
    /// Mass in kilograms
    pub mass: f32,
    /// Linear velocity
    pub velocity: Vec3,
    /// Kinematic bodies are moved by code and ignore forces
    pub kinematic: bool,
    /// Whether world gravity applies
    pub use_gravity: bool,
    /// Acceleration gathered from continuous forces this step
    #[serde(skip)]
    acceleration: Vec3,
    /// Velocity change gathered from instant forces this step
    #[serde(skip)]
    delta_velocity: Vec3,
}

impl RigidBody {
    /// Dynamic body with the given mass
    pub fn dynamic(mass: f32) -> Self {
        Self {
            mass: mass.max(f32::EPSILON),
            velocity: Vec3::ZERO,
            kinematic: false,
            use_gravity: true,
            acceleration: Vec3::ZERO,
            delta_velocity: Vec3::ZERO,
        }
    }

    /// Kinematic body
    pub fn kinematic() -> Self {
        Self {
            kinematic: true,
            use_gravity: false,
            ..Self::dynamic(1.0)
        }
    }

    /// Disable gravity
    pub fn without_gravity(mut self) -> Self {
        self.use_gravity = false;
        self
    }

    /// Set initial velocity
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Queue a force for the next integration step
    pub fn add_force(&mut self, force: Vec3, mode: ForceMode) {
        if self.kinematic {
            return;
        }
        match mode {
            ForceMode::Force => self.acceleration += force / self.mass,
            ForceMode::Acceleration => self.acceleration += force,
            ForceMode::Impulse => self.delta_velocity += force / self.mass,
            ForceMode::VelocityChange => self.delta_velocity += force,
        }
    }

    /// Integrate queued forces and gravity, returning the displacement
    pub fn integrate(&mut self, gravity: Vec3, damping: f32, dt: f32) -> Vec3 {
        if self.kinematic {
            return self.velocity * dt;
        }

        let mut accel = self.acceleration;
        if self.use_gravity {
            accel += gravity;
        }
        self.velocity += self.delta_velocity + accel * dt;
        if damping > 0.0 {
            self.velocity *= 1.0 / (1.0 + damping * dt);
        }

        self.acceleration = Vec3::ZERO;
        self.delta_velocity = Vec3::ZERO;
        self.velocity * dt
    }
}

impl Default for RigidBody {
    fn default() -> Self {
        Self::dynamic(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_force_modes() {
        let mut body = RigidBody::dynamic(2.0).without_gravity();
        body.add_force(Vec3::X * 4.0, ForceMode::Impulse);
        body.integrate(Vec3::ZERO, 0.0, 0.1);
        assert_relative_eq!(body.velocity.x, 2.0, epsilon = 1e-5);

        body.add_force(Vec3::X * 10.0, ForceMode::Force);
        body.integrate(Vec3::ZERO, 0.0, 0.1);
        assert_relative_eq!(body.velocity.x, 2.5, epsilon = 1e-5);

        body.add_force(Vec3::X, ForceMode::VelocityChange);
        body.integrate(Vec3::ZERO, 0.0, 0.1);
        assert_relative_eq!(body.velocity.x, 3.5, epsilon = 1e-5);
    }

    #[test]
    fn test_kinematic_ignores_forces() {
        let mut body = RigidBody::kinematic();
        body.add_force(Vec3::Y * 100.0, ForceMode::Impulse);
        let moved = body.integrate(Vec3::new(0.0, -9.81, 0.0), 0.0, 0.1);
        assert_eq!(moved, Vec3::ZERO);
    }
}
