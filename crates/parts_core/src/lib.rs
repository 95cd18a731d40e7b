//! # parts_core - NotEnoughParts Core
//!
//! Small primitives shared by every gameplay crate. Nothing here knows about
//! health, weapons or scenes; it only provides the plumbing they run on.
//!
//! # Features
//!
//! - Opaque entity ids and a monotonic generator
//! - Timer scheduler keyed by owner + purpose with cancel-and-replace
//! - Fixed-step clock for the physics-coupled tick phase
//! - Layer masks and tag filters for scene queries
//! - Orientation helpers (forward is +Z, up is +Y)
//!
//! # Example
//!
//! ```ignore
//! use parts_core::prelude::*;
//!
//! let ids = IdGenerator::new();
//! let weapon = ids.next();
//!
//! let mut scheduler = Scheduler::new();
//! scheduler.start_once(TimerKey::new(weapon, "cooldown"), 0.5);
//!
//! for key in scheduler.tick(0.6) {
//!     assert_eq!(key.purpose, "cooldown");
//! }
//! ```

pub mod clock;
pub mod id;
pub mod layer;
pub mod math;
pub mod timer;

pub mod prelude {
    pub use crate::clock::FixedTimestep;
    pub use crate::id::{EntityId, IdGenerator};
    pub use crate::layer::{Layer, LayerMask, Tag, TagFilter};
    pub use crate::math::{look_rotation, move_towards, yaw_rotation, FORWARD, UP};
    pub use crate::timer::{Scheduler, TimerKey};
}

pub use prelude::*;
