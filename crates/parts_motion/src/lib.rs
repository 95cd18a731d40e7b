//! # parts_motion - Character Motion
//!
//! Moves characters and props through a scene described by the
//! `parts_physics` query contract.
//!
//! # Features
//!
//! - `CharacterMotor` with three modes: kinematic (view-relative, turns toward
//!   travel), rotation (tank controls) and physics (forces on a rigid body)
//! - Ground probe, asymmetric gravity and edge-triggered jumps
//! - Pushing dynamic bodies out of the way
//! - Small movers: rotator, wave, move-towards, face-target, points follower
//!
//! # Example
//!
//! ```ignore
//! use parts_motion::prelude::*;
//!
//! let mut motor = CharacterMotor::new(player, MoveMode::Kinematic, MotionConfig::default())
//!     .with_position(Vec3::new(0.0, 1.0, 0.0));
//!
//! let mut input = MoveInput::new(Vec2::new(0.0, 1.0));
//! input.jump = true;
//! motor.update(1.0 / 60.0, &mut input, camera_rotation, &mut world);
//! ```

pub mod controller;
pub mod movers;

pub mod prelude {
    pub use crate::controller::{CharacterMotor, MotionConfig, MotionEvent, MotionState, MoveInput, MoveMode};
    pub use crate::movers::{
        FaceMode, FaceTarget, FollowMode, FollowerEvent, MoveTowards, PointsFollower, Pose, Rotator, Wave,
    };
}

pub use prelude::*;
