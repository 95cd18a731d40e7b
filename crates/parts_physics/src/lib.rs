//! Parts Physics - Scene Queries
//!
//! Gameplay code never talks to a physics engine directly. It asks questions
//! ("what does this ray hit", "who is inside this sphere") through
//! [`PhysicsQuery`] and pushes bodies around through [`PhysicsBodies`].
//!
//! # Features
//!
//! - Raycast, sphere cast and overlap-sphere queries with layer/tag filtering
//! - Forces and impulses on dynamic bodies
//! - Parent links so an actor's own hierarchy can be excluded from hits
//! - `PhysicsWorld`, a small analytic world (spheres and boxes) used by tests
//!   and the sandbox
//!
//! # Example
//!
//! ```ignore
//! use parts_physics::prelude::*;
//!
//! let mut world = PhysicsWorld::new(PhysicsConfig::default());
//! world.insert(ground, ColliderDesc::cuboid(Vec3::new(50.0, 0.5, 50.0))
//!     .with_position(Vec3::new(0.0, -0.5, 0.0))
//!     .with_layer(Layer::ENVIRONMENT))?;
//!
//! let hit = world.raycast(Vec3::Y, Vec3::NEG_Y, 10.0, &QueryFilter::default());
//! ```

pub mod body;
pub mod config;
pub mod error;
pub mod query;
pub mod shape;
pub mod world;

pub mod prelude {
    pub use crate::body::{ForceMode, RigidBody};
    pub use crate::config::PhysicsConfig;
    pub use crate::error::{PhysicsError, Result};
    pub use crate::query::{PhysicsBodies, PhysicsQuery, QueryFilter, RaycastHit};
    pub use crate::shape::ColliderShape;
    pub use crate::world::{ColliderDesc, PhysicsWorld};
}

pub use prelude::*;
