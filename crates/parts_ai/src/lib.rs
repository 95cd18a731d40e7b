//! Parts AI - Sensing and Navigation
//!
//! Building blocks for simple agents: sensors that poll the scene on a fixed
//! interval and a waypoint graph to patrol.
//!
//! # Features
//!
//! - Overlap-sphere, raycast-fan and spherecast-fan sensors
//! - Fixed-capacity result buffers that are overwritten on every poll
//! - Waypoint graphs with random branching
//!
//! # Example
//!
//! ```ignore
//! use parts_ai::prelude::*;
//!
//! let mut sensor = Sensor::new(
//!     ids.next(),
//!     SensorShape::Raycast { distance: 20.0, angle: 60.0, ray_count: 5 },
//!     SensorConfig::default().with_tag("Player"),
//! );
//! sensor.enable(&mut scheduler);
//! ```

pub mod sensor;
pub mod waypoint;

pub mod prelude {
    pub use crate::sensor::{fan_directions, Sensor, SensorConfig, SensorShape, SENSE};
    pub use crate::waypoint::{Waypoint, WaypointFollower, WaypointGraph};
}

pub use prelude::*;
