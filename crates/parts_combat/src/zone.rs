//! Damage and heal zones, and impact damage
//!
//! A zone is a sphere polled against the scene every tick. Entering and
//! leaving are found by diffing the overlap set with the previous poll.
//! Repeating effects run as scheduler timers keyed by (zone, "dot", target),
//! so a target gets at most one loop per zone however often it re-enters.

use crate::health::{resolve_target, DamageTargets, Damageable};
use glam::Vec3;
use parts_core::{EntityId, LayerMask, Scheduler, TagFilter, TimerKey};
use parts_physics::{PhysicsQuery, QueryFilter};
use serde::{Deserialize, Serialize};

/// Timer purpose for repeating zone effects
pub const ZONE_TICK: &str = "dot";

/// What a zone does to the things inside it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ZoneEffect {
    /// Hurt targets. With an interval, keep hurting while they stay inside.
    Damage { amount: f32, interval: Option<f32> },
    /// Heal targets until they leave, die or are full
    Heal { amount: f32, interval: Option<f32> },
}

impl ZoneEffect {
    /// Damage 10 every half second
    pub fn damage() -> Self {
        Self::Damage {
            amount: 10.0,
            interval: Some(0.5),
        }
    }

    /// Heal 25 every half second
    pub fn heal() -> Self {
        Self::Heal {
            amount: 25.0,
            interval: Some(0.5),
        }
    }

    fn interval(&self) -> Option<f32> {
        match *self {
            Self::Damage { interval, .. } | Self::Heal { interval, .. } => interval,
        }
    }

    /// Whether the effect still has something to do to a target
    fn applies_to(&self, target: &dyn Damageable) -> bool {
        match self {
            Self::Damage { .. } => target.is_alive(),
            Self::Heal { .. } => target.is_alive() && target.current_health() < target.max_health(),
        }
    }
}

/// Events emitted by a zone
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoneEvent {
    Entered(EntityId),
    Exited(EntityId),
    Damaged { target: EntityId, amount: f32 },
    Healed { target: EntityId, amount: f32 },
}

/// Spherical trigger volume
#[derive(Debug, Clone)]
pub struct Zone {
    id: EntityId,
    /// Center of the volume
    pub center: Vec3,
    pub radius: f32,
    /// Only targets with this tag are affected
    pub filter: TagFilter,
    /// Layers that are polled
    pub mask: LayerMask,
    pub effect: ZoneEffect,
    inside: Vec<EntityId>,
    scratch: Vec<EntityId>,
    events: Vec<ZoneEvent>,
}

impl Zone {
    /// Create a zone that affects entities tagged "Player"
    pub fn new(id: EntityId, center: Vec3, radius: f32, effect: ZoneEffect) -> Self {
        Self {
            id,
            center,
            radius,
            filter: TagFilter::tag("Player"),
            mask: LayerMask::ALL,
            effect,
            inside: Vec::new(),
            scratch: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Replace the tag filter
    pub fn with_filter(mut self, filter: TagFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_mask(mut self, mask: LayerMask) -> Self {
        self.mask = mask;
        self
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Entities inside after the last poll
    pub fn inside(&self) -> &[EntityId] {
        &self.inside
    }

    fn key(&self, target: EntityId) -> TimerKey {
        TimerKey::new(self.id, ZONE_TICK).with_target(target)
    }

    /// Diff the overlap set and react to entries and exits
    pub fn poll<Q, T>(&mut self, query: &Q, scheduler: &mut Scheduler, targets: &mut T)
    where
        Q: PhysicsQuery + ?Sized,
        T: DamageTargets + ?Sized,
    {
        let filter = QueryFilter::mask(self.mask).excluding(self.id);
        let mut current = std::mem::take(&mut self.scratch);
        query.overlap_sphere(self.center, self.radius, &filter, &mut current);
        current.retain(|e| self.filter.passes(query.tag_of(*e)));

        for &entity in &self.inside {
            if !current.contains(&entity) {
                self.events.push(ZoneEvent::Exited(entity));
                let target = resolve_target(entity, query, targets).unwrap_or(entity);
                scheduler.cancel(self.key(target));
            }
        }

        for &entity in &current {
            if self.inside.contains(&entity) {
                continue;
            }
            self.events.push(ZoneEvent::Entered(entity));
            let Some(target) = resolve_target(entity, query, targets) else {
                continue;
            };

            match self.effect.interval() {
                Some(interval) => {
                    let key = self.key(target);
                    if !scheduler.is_pending(key) && self.apply(target, targets) {
                        scheduler.start_repeating(key, interval, interval);
                    }
                }
                None => {
                    self.apply(target, targets);
                }
            }
        }

        self.scratch = std::mem::replace(&mut self.inside, current);
    }

    /// React to a fired timer. Returns true if the key belonged to this zone.
    pub fn handle_timer<T>(&mut self, key: &TimerKey, scheduler: &mut Scheduler, targets: &mut T) -> bool
    where
        T: DamageTargets + ?Sized,
    {
        if !key.is(self.id, ZONE_TICK) {
            return false;
        }
        let Some(target) = key.target else {
            return true;
        };

        if !self.apply(target, targets) {
            scheduler.cancel(*key);
        }
        true
    }

    /// Apply the effect once. Returns false when the target is gone, dead,
    /// or (for healing) already full, so the loop can stop.
    fn apply<T: DamageTargets + ?Sized>(&mut self, target: EntityId, targets: &mut T) -> bool {
        let Some(damageable) = targets.damageable_mut(target) else {
            return false;
        };
        if !self.effect.applies_to(damageable) {
            return false;
        }

        match self.effect {
            ZoneEffect::Damage { amount, .. } => {
                damageable.take_damage(amount);
                self.events.push(ZoneEvent::Damaged { target, amount });
            }
            ZoneEffect::Heal { amount, .. } => {
                damageable.heal(amount);
                self.events.push(ZoneEvent::Healed { target, amount });
            }
        }
        self.effect.applies_to(damageable)
    }

    /// Stop every loop this zone runs
    pub fn clear(&mut self, scheduler: &mut Scheduler) {
        scheduler.cancel_owner(self.id);
        self.inside.clear();
    }

    /// Take the pending events
    pub fn drain_events(&mut self) -> Vec<ZoneEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Damage dealt by physical impacts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollisionDamage {
    /// Scale damage by the impact speed
    pub velocity_scaling: bool,
    /// Damage per unit of relative speed
    pub multiplier: f32,
    /// Damage when not scaling by speed
    pub flat_damage: f32,
    /// Slower impacts deal no scaled damage
    pub minimum_velocity: f32,
}

impl Default for CollisionDamage {
    fn default() -> Self {
        Self {
            velocity_scaling: true,
            multiplier: 1.0,
            flat_damage: 10.0,
            minimum_velocity: 1.0,
        }
    }
}

impl CollisionDamage {
    /// Flat damage on every impact
    pub fn flat(damage: f32) -> Self {
        Self {
            velocity_scaling: false,
            flat_damage: damage,
            ..Default::default()
        }
    }

    /// Damage an impact target. Returns the damage dealt.
    pub fn apply(&self, relative_speed: f32, target: &mut dyn Damageable) -> f32 {
        let damage = collision_damage(relative_speed, self);
        if !target.is_alive() || damage <= 0.0 {
            return 0.0;
        }
        target.take_damage(damage);
        damage
    }
}

/// Damage for an impact at `relative_speed`
pub fn collision_damage(relative_speed: f32, config: &CollisionDamage) -> f32 {
    if !config.velocity_scaling {
        return config.flat_damage;
    }
    let speed = relative_speed.abs();
    if speed < config.minimum_velocity {
        return 0.0;
    }
    speed * config.multiplier
}
