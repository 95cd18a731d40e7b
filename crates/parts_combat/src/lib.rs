//! Parts Combat - Health, Weapons, Ammo and Damage Zones
//!
//! # Features
//!
//! - Health pool with damage, heal and death notifications (death fires
//!   once per zero-crossing)
//! - `Damageable` contract so ammo and zones can hurt anything
//! - Weapon firing state machine: single, auto, burst and stream modes with
//!   cooldowns and auto-fire loops driven by the shared scheduler
//! - Ammo variants: physics projectile, instant hitscan, melee overlap
//! - Damage and heal zones with one damage-over-time loop per (zone, target)
//! - Impact-speed collision damage
//!
//! # Example
//!
//! ```ignore
//! use parts_combat::prelude::*;
//!
//! let mut health = Health::new(100.0);
//! health.take_damage(30.0);
//! assert_eq!(health.health_percent(), 0.7);
//!
//! for event in health.drain_events() {
//!     if let HealthEvent::Died { .. } = event {
//!         // award points, schedule respawn, ...
//!     }
//! }
//! ```

pub mod ammo;
pub mod health;
pub mod weapon;
pub mod zone;

pub mod prelude {
    pub use crate::ammo::{Ammo, AmmoData, AmmoEvent, AmmoKind};
    pub use crate::health::{resolve_target, DamageTargets, Damageable, Health, HealthEvent};
    pub use crate::weapon::{Muzzle, Shot, UsageType, Weapon, WeaponData, WeaponEvent};
    pub use crate::zone::{collision_damage, CollisionDamage, Zone, ZoneEffect, ZoneEvent};
}

pub use prelude::*;
