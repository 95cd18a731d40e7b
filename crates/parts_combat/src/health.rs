//! Health component and the damageable contract

use parts_core::EntityId;
use parts_physics::PhysicsQuery;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Events emitted by a health pool, in the order they happened
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HealthEvent {
    /// Damage was taken
    DamageTaken {
        amount: f32,
        /// Health fraction after the damage
        percent: f32,
    },
    /// Health was restored
    Healed {
        amount: f32,
        percent: f32,
    },
    /// Health changed for any reason
    Changed {
        percent: f32,
    },
    /// Health reached zero
    Died {
        /// Whether the owner asked to be removed on death
        destroy: bool,
    },
}

/// Anything that can receive damage and healing
pub trait Damageable {
    /// Current health
    fn current_health(&self) -> f32;

    /// Maximum health
    fn max_health(&self) -> f32;

    /// Reduce health. Ignored when dead or when `amount <= 0`.
    fn take_damage(&mut self, amount: f32);

    /// Restore health. Ignored when dead or when `amount <= 0`.
    fn heal(&mut self, amount: f32);

    /// Health as a 0..1 fraction
    fn health_percent(&self) -> f32 {
        let max = self.max_health();
        if max > 0.0 {
            self.current_health() / max
        } else {
            0.0
        }
    }

    /// True while health is above zero
    fn is_alive(&self) -> bool {
        self.current_health() > 0.0
    }
}

/// Lookup from a hit entity to the thing that takes its damage
pub trait DamageTargets {
    /// Get the damageable for an entity, if it has one
    fn damageable_mut(&mut self, entity: EntityId) -> Option<&mut dyn Damageable>;
}

impl<D: Damageable> DamageTargets for HashMap<EntityId, D> {
    fn damageable_mut(&mut self, entity: EntityId) -> Option<&mut dyn Damageable> {
        self.get_mut(&entity).map(|d| d as &mut dyn Damageable)
    }
}

/// Find the damageable for a hit: the entity itself, then the root of its
/// hierarchy
pub fn resolve_target<Q, T>(entity: EntityId, query: &Q, targets: &mut T) -> Option<EntityId>
where
    Q: PhysicsQuery + ?Sized,
    T: DamageTargets + ?Sized,
{
    if targets.damageable_mut(entity).is_some() {
        return Some(entity);
    }
    let root = query.root_of(entity);
    (root != entity && targets.damageable_mut(root).is_some()).then_some(root)
}

/// Health pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Current health
    current: f32,
    /// Maximum health
    max: f32,
    /// Ask the owner to remove the entity when it dies
    pub destroy_on_death: bool,
    /// Set once death has been reported, cleared when health rises again
    #[serde(skip)]
    death_notified: bool,
    /// Pending events
    #[serde(skip)]
    events: Vec<HealthEvent>,
}

impl Health {
    /// Create a full health pool
    pub fn new(max_health: f32) -> Self {
        let max = max_health.max(0.0);
        Self {
            current: max,
            max,
            destroy_on_death: false,
            death_notified: false,
            events: Vec::new(),
        }
    }

    /// Remove the owner on death
    pub fn with_destroy_on_death(mut self) -> Self {
        self.destroy_on_death = true;
        self
    }

    /// Check if health is full
    pub fn is_at_max_health(&self) -> bool {
        self.current >= self.max
    }

    /// Set health directly, clamped to `0..=max`. Reaching zero this way
    /// still reports death, but only once per zero-crossing. NaN is ignored.
    pub fn set_health(&mut self, amount: f32) {
        if amount.is_nan() {
            return;
        }
        self.current = amount.clamp(0.0, self.max);
        self.events.push(HealthEvent::Changed {
            percent: self.health_percent(),
        });
        self.check_death();
    }

    /// Back to full health and ready to die again
    pub fn reset(&mut self) {
        self.death_notified = false;
        self.set_health(self.max);
    }

    /// Queue the current fraction so listeners can initialise
    pub fn announce(&mut self) {
        self.events.push(HealthEvent::Changed {
            percent: self.health_percent(),
        });
    }

    /// Take the pending events
    pub fn drain_events(&mut self) -> Vec<HealthEvent> {
        std::mem::take(&mut self.events)
    }

    /// Peek at pending events
    pub fn pending_events(&self) -> &[HealthEvent] {
        &self.events
    }

    fn check_death(&mut self) {
        if self.current > 0.0 {
            self.death_notified = false;
        } else if !self.death_notified {
            self.death_notified = true;
            self.events.push(HealthEvent::Died {
                destroy: self.destroy_on_death,
            });
        }
    }
}

impl Damageable for Health {
    fn current_health(&self) -> f32 {
        self.current
    }

    fn max_health(&self) -> f32 {
        self.max
    }

    fn take_damage(&mut self, amount: f32) {
        if !self.is_alive() || !(amount > 0.0) {
            return;
        }

        self.current = (self.current - amount).max(0.0);
        let percent = self.health_percent();
        self.events.push(HealthEvent::DamageTaken { amount, percent });
        self.events.push(HealthEvent::Changed { percent });
        log::trace!("health {:.1}/{:.1}", self.current, self.max);
        self.check_death();
    }

    fn heal(&mut self, amount: f32) {
        if !self.is_alive() || !(amount > 0.0) {
            return;
        }

        let before = self.current;
        self.current = (self.current + amount).min(self.max);
        let percent = self.health_percent();
        self.events.push(HealthEvent::Healed {
            amount: self.current - before,
            percent,
        });
        self.events.push(HealthEvent::Changed { percent });
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100.0)
    }
}
