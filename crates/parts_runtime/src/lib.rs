//! Parts Runtime - Headless Sandbox
//!
//! Wires the gameplay crates into one fixed-tick simulation so they can be
//! exercised together without an engine.
//!
//! # Features
//!
//! - TOML configuration with environment overrides
//! - Actors that award score and publish their deaths on the event bus
//! - Sensor-driven turret, spawner-fed enemies and a patrolling sentry
//! - Player pilot: engages, refills at pickups, retreats to heal
//! - Level flow through the game manager and scene loader
//! - Cue playback on a headless emitter pool
//!
//! # Example
//!
//! ```ignore
//! use parts_runtime::prelude::*;
//!
//! let config = SandboxConfig::from_toml("[sandbox]\nduration = 10.0")?;
//! let mut sandbox = Sandbox::new(config)?;
//! let summary = sandbox.run();
//! summary.log();
//! ```

pub mod actor;
pub mod config;
pub mod sandbox;

pub mod prelude {
    pub use crate::actor::{Actor, ActorDied, Turret};
    pub use crate::config::{ConfigError, SandboxConfig, CONFIG_ENV};
    pub use crate::sandbox::{Sandbox, SandboxError, SandboxSummary, ENEMY_TAG, MAIN_MENU, PLAYER_TAG};
}

pub use prelude::*;
