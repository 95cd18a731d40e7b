//! Ammunition: projectiles, hitscan rays and melee swings
//!
//! A weapon produces a [`Shot`]; the owner of the scene turns it into an
//! [`Ammo`] and calls [`Ammo::update`] every tick until it reports
//! [`Ammo::is_finished`]. Hitscan and melee rounds resolve on their first
//! update. Projectiles move through the scene and resolve on impact or
//! when their lifetime runs out.

use crate::health::{resolve_target, DamageTargets};
use crate::weapon::Shot;
use glam::{Quat, Vec3};
use parts_core::{look_rotation, EntityId, LayerMask, TagFilter, FORWARD, UP};
use parts_physics::{ForceMode, PhysicsQuery, QueryFilter, RigidBody};
use serde::{Deserialize, Serialize};

/// Offset applied after a bounce so the next sweep starts outside the surface
const SKIN: f32 = 1e-3;

/// Fundamental behaviour of a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AmmoKind {
    /// Physics body following a trajectory
    Projectile,
    /// Instant ray
    Hitscan,
    /// Overlap sphere in front of the muzzle
    Melee,
}

impl Default for AmmoKind {
    fn default() -> Self {
        Self::Projectile
    }
}

/// Ammunition configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmmoData {
    pub kind: AmmoKind,
    /// Seconds before the round expires (0 = infinite)
    pub lifetime: f32,
    /// Layers the round reacts to
    pub hit_mask: LayerMask,
    /// Optional tag the target must carry
    pub hit_tag: TagFilter,
    /// Damage per hit
    pub damage: f32,
    /// Damage is applied while in contact rather than on impact
    pub damage_over_time: bool,
    /// Damage ticks per second while in contact
    pub damage_rate: f32,
    pub destroy_on_impact: bool,
    /// Spawn the impact effect when the lifetime expires
    pub impact_on_expired: bool,
    /// Effect spawned at the impact point
    pub impact_effect: Option<String>,
    /// Launch force along the muzzle forward
    pub force: f32,
    pub force_mode: ForceMode,
    pub has_gravity: bool,
    /// Reflect off surfaces instead of resolving the impact
    pub bounce: bool,
    /// Face along the velocity while flying
    pub rotate_to_velocity: bool,
    /// Hitscan range
    pub distance: f32,
    /// Melee sphere radius
    pub melee_radius: f32,
    /// Melee sphere offset in muzzle space
    pub melee_offset: Vec3,
}

impl Default for AmmoData {
    fn default() -> Self {
        Self {
            kind: AmmoKind::Projectile,
            lifetime: 0.0,
            hit_mask: LayerMask::ALL,
            hit_tag: TagFilter::any(),
            damage: 10.0,
            damage_over_time: false,
            damage_rate: 5.0,
            destroy_on_impact: true,
            impact_on_expired: false,
            impact_effect: None,
            force: 10.0,
            force_mode: ForceMode::Impulse,
            has_gravity: false,
            bounce: false,
            rotate_to_velocity: true,
            distance: 100.0,
            melee_radius: 0.5,
            melee_offset: FORWARD,
        }
    }
}

impl AmmoData {
    /// Physics projectile
    pub fn projectile(force: f32) -> Self {
        Self {
            kind: AmmoKind::Projectile,
            force,
            ..Default::default()
        }
    }

    /// Instant ray over `distance`
    pub fn hitscan(distance: f32) -> Self {
        Self {
            kind: AmmoKind::Hitscan,
            distance,
            ..Default::default()
        }
    }

    /// Overlap sphere in front of the muzzle
    pub fn melee(radius: f32) -> Self {
        Self {
            kind: AmmoKind::Melee,
            melee_radius: radius,
            ..Default::default()
        }
    }

    pub fn with_damage(mut self, damage: f32) -> Self {
        self.damage = damage;
        self
    }

    pub fn with_mask(mut self, mask: LayerMask) -> Self {
        self.hit_mask = mask;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.hit_tag = TagFilter::tag(tag);
        self
    }

    pub fn with_lifetime(mut self, lifetime: f32) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn with_gravity(mut self) -> Self {
        self.has_gravity = true;
        self
    }

    pub fn with_bounce(mut self) -> Self {
        self.bounce = true;
        self
    }

    /// Deal damage `rate` times per second while touching, instead of on impact
    pub fn with_damage_over_time(mut self, rate: f32) -> Self {
        self.damage_over_time = true;
        self.damage_rate = rate;
        self
    }

    pub fn with_impact_effect(mut self, effect: impl Into<String>) -> Self {
        self.impact_effect = Some(effect.into());
        self
    }

    /// Keep the round alive after it hits
    pub fn persistent(mut self) -> Self {
        self.destroy_on_impact = false;
        self
    }
}

/// Events emitted by a round
#[derive(Debug, Clone, PartialEq)]
pub enum AmmoEvent {
    /// The round hit something (or expired with an impact effect)
    Impact {
        point: Vec3,
        normal: Vec3,
        effect: Option<String>,
        target: Option<EntityId>,
    },
    /// Damage was dealt
    Damaged { target: EntityId, amount: f32 },
    /// Lifetime ran out
    Expired,
}

/// A live round
#[derive(Debug, Clone)]
pub struct Ammo {
    id: EntityId,
    owner: EntityId,
    data: AmmoData,
    position: Vec3,
    rotation: Quat,
    body: RigidBody,
    gravity: Vec3,
    age: f32,
    contact: Option<EntityId>,
    dot_timer: f32,
    finished: bool,
    events: Vec<AmmoEvent>,
}

impl Ammo {
    /// Spawn a round from a shot
    pub fn spawn(id: EntityId, shot: &Shot) -> Self {
        let data = shot.ammo.clone();
        let mut body = RigidBody::dynamic(1.0);
        body.use_gravity = data.has_gravity;
        if data.kind == AmmoKind::Projectile && data.force > 0.0 {
            body.add_force(shot.forward() * data.force, data.force_mode);
        }

        Self {
            id,
            owner: shot.owner,
            data,
            position: shot.origin,
            rotation: shot.rotation,
            body,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            age: 0.0,
            contact: None,
            dot_timer: 0.0,
            finished: false,
            events: Vec::new(),
        }
    }

    /// Override world gravity
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn owner(&self) -> EntityId {
        self.owner
    }

    pub fn data(&self) -> &AmmoData {
        &self.data
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn velocity(&self) -> Vec3 {
        self.body.velocity
    }

    /// Entity the round is stuck to, if any
    pub fn contact(&self) -> Option<EntityId> {
        self.contact
    }

    /// The round is done and should be removed
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Take the pending events
    pub fn drain_events(&mut self) -> Vec<AmmoEvent> {
        std::mem::take(&mut self.events)
    }

    /// Advance the round by `dt`
    pub fn update<Q, T>(&mut self, dt: f32, query: &Q, targets: &mut T)
    where
        Q: PhysicsQuery + ?Sized,
        T: DamageTargets + ?Sized,
    {
        if self.finished {
            return;
        }

        match self.data.kind {
            AmmoKind::Hitscan => {
                self.fire_ray(query, targets);
                self.finished = true;
            }
            AmmoKind::Melee => {
                self.swing(query, targets);
                self.finished = true;
            }
            AmmoKind::Projectile => {
                self.fly(dt, query, targets);
                self.damage_contact(dt, query, targets);
                self.age += dt;
                if self.data.lifetime > 0.0 && self.age >= self.data.lifetime && !self.finished {
                    self.expire();
                }
            }
        }
    }

    fn filter(&self) -> QueryFilter {
        QueryFilter::default().excluding(self.owner).excluding(self.id)
    }

    fn qualifies<Q: PhysicsQuery + ?Sized>(&self, query: &Q, entity: EntityId) -> bool {
        let layer = query.layer_of(entity).unwrap_or_default();
        self.data.hit_mask.contains(layer) && self.data.hit_tag.passes(query.tag_of(entity))
    }

    fn fire_ray<Q, T>(&mut self, query: &Q, targets: &mut T)
    where
        Q: PhysicsQuery + ?Sized,
        T: DamageTargets + ?Sized,
    {
        let mut filter = self.filter();
        filter.mask = self.data.hit_mask;
        let dir = self.rotation * FORWARD;

        let Some(hit) = query.raycast(self.position, dir, self.data.distance, &filter) else {
            return;
        };
        if !self.data.hit_tag.passes(query.tag_of(hit.entity)) {
            return;
        }

        let target = self.apply_damage(hit.entity, query, targets);
        self.spawn_impact(hit.point, hit.normal, target.or(Some(hit.entity)));
    }

    fn swing<Q, T>(&mut self, query: &Q, targets: &mut T)
    where
        Q: PhysicsQuery + ?Sized,
        T: DamageTargets + ?Sized,
    {
        let center = self.position + self.rotation * self.data.melee_offset;
        let mut filter = self.filter();
        filter.mask = self.data.hit_mask;

        let mut hits = Vec::new();
        query.overlap_sphere(center, self.data.melee_radius, &filter, &mut hits);

        let mut damaged: Vec<EntityId> = Vec::new();
        for entity in hits {
            if !self.data.hit_tag.passes(query.tag_of(entity)) {
                continue;
            }
            let resolved = resolve_target(entity, query, targets);
            if let Some(target) = resolved {
                if !damaged.contains(&target) {
                    damaged.push(target);
                    self.deal(target, targets);
                }
            }
            let point = query.position_of(entity).unwrap_or(center);
            self.spawn_impact(point, UP, resolved.or(Some(entity)));
        }
    }

    fn fly<Q, T>(&mut self, dt: f32, query: &Q, targets: &mut T)
    where
        Q: PhysicsQuery + ?Sized,
        T: DamageTargets + ?Sized,
    {
        if self.contact.is_some() {
            return;
        }

        let displacement = self.body.integrate(self.gravity, 0.0, dt);
        let length = displacement.length();
        if length > f32::EPSILON {
            let filter = self.filter();
            match query.raycast(self.position, displacement, length, &filter) {
                Some(hit) => {
                    if self.data.bounce || !self.qualifies(query, hit.entity) {
                        let v = self.body.velocity;
                        self.body.velocity = v - 2.0 * v.dot(hit.normal) * hit.normal;
                        self.position = hit.point + hit.normal * SKIN;
                    } else {
                        self.position = hit.point;
                        self.impact(hit.entity, hit.point, hit.normal, query, targets);
                    }
                }
                None => self.position += displacement,
            }
        }

        let velocity = self.body.velocity;
        if self.data.rotate_to_velocity && velocity != Vec3::ZERO {
            self.rotation = look_rotation(velocity, UP);
        }
    }

    fn impact<Q, T>(&mut self, entity: EntityId, point: Vec3, normal: Vec3, query: &Q, targets: &mut T)
    where
        Q: PhysicsQuery + ?Sized,
        T: DamageTargets + ?Sized,
    {
        let target = if self.data.damage_over_time {
            resolve_target(entity, query, targets)
        } else {
            self.apply_damage(entity, query, targets)
        };
        self.spawn_impact(point, normal, target.or(Some(entity)));

        if self.data.destroy_on_impact {
            self.finished = true;
        } else {
            // Stick to whatever was hit
            self.body.velocity = Vec3::ZERO;
            self.contact = Some(target.unwrap_or(entity));
            self.dot_timer = 0.0;
        }
    }

    fn damage_contact<Q, T>(&mut self, dt: f32, query: &Q, targets: &mut T)
    where
        Q: PhysicsQuery + ?Sized,
        T: DamageTargets + ?Sized,
    {
        let Some(contact) = self.contact else {
            return;
        };
        if query.position_of(contact).is_none() {
            self.contact = None;
            return;
        }
        if !self.data.damage_over_time || self.data.damage_rate <= 0.0 {
            return;
        }

        let interval = 1.0 / self.data.damage_rate;
        self.dot_timer += dt;
        while self.dot_timer >= interval {
            self.dot_timer -= interval;
            self.deal(contact, targets);
        }
    }

    fn expire(&mut self) {
        if self.data.impact_on_expired {
            let up = self.rotation * UP;
            self.spawn_impact(self.position, up, None);
        }
        self.events.push(AmmoEvent::Expired);
        self.finished = true;
    }

    fn apply_damage<Q, T>(&mut self, entity: EntityId, query: &Q, targets: &mut T) -> Option<EntityId>
    where
        Q: PhysicsQuery + ?Sized,
        T: DamageTargets + ?Sized,
    {
        let target = resolve_target(entity, query, targets)?;
        self.deal(target, targets);
        Some(target)
    }

    fn deal<T: DamageTargets + ?Sized>(&mut self, target: EntityId, targets: &mut T) {
        let amount = self.data.damage;
        if let Some(damageable) = targets.damageable_mut(target) {
            if damageable.is_alive() && amount > 0.0 {
                damageable.take_damage(amount);
                self.events.push(AmmoEvent::Damaged { target, amount });
            }
        }
    }

    fn spawn_impact(&mut self, point: Vec3, normal: Vec3, target: Option<EntityId>) {
        self.events.push(AmmoEvent::Impact {
            point,
            normal,
            effect: self.data.impact_effect.clone(),
            target,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{Damageable, Health};
    use approx::assert_abs_diff_eq;
    use parts_core::Layer;
    use parts_physics::{ColliderDesc, PhysicsConfig, PhysicsWorld};
    use std::collections::HashMap;

    fn id(n: u64) -> EntityId {
        EntityId::from_raw(n)
    }

    fn shot(ammo: AmmoData, owner: EntityId) -> Shot {
        Shot {
            weapon: id(100),
            owner,
            origin: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            ammo,
        }
    }

    fn world() -> PhysicsWorld {
        PhysicsWorld::new(PhysicsConfig::default())
    }

    fn damaged(events: &[AmmoEvent]) -> Vec<EntityId> {
        events
            .iter()
            .filter_map(|e| match e {
                AmmoEvent::Damaged { target, .. } => Some(*target),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_hitscan_hits_first_target() {
        let mut world = world();
        world
            .insert(id(1), ColliderDesc::sphere(0.5).with_position(Vec3::new(0.0, 0.0, 10.0)))
            .unwrap();
        world
            .insert(id(2), ColliderDesc::sphere(0.5).with_position(Vec3::new(0.0, 0.0, 20.0)))
            .unwrap();
        let mut targets: HashMap<EntityId, Health> = HashMap::new();
        targets.insert(id(1), Health::new(100.0));
        targets.insert(id(2), Health::new(100.0));

        let mut ammo = Ammo::spawn(id(50), &shot(AmmoData::hitscan(100.0).with_damage(25.0), EntityId::NULL));
        ammo.update(0.02, &world, &mut targets);

        assert!(ammo.is_finished());
        assert_eq!(targets[&id(1)].current_health(), 75.0);
        assert_eq!(targets[&id(2)].current_health(), 100.0);
        let events = ammo.drain_events();
        assert!(events.iter().any(|e| matches!(e,
            AmmoEvent::Impact { point, .. } if (point.z - 9.5).abs() < 1e-4)));
    }

    #[test]
    fn test_hitscan_out_of_range() {
        let mut world = world();
        world
            .insert(id(1), ColliderDesc::sphere(0.5).with_position(Vec3::new(0.0, 0.0, 10.0)))
            .unwrap();
        let mut targets: HashMap<EntityId, Health> = HashMap::new();
        targets.insert(id(1), Health::new(100.0));

        let mut ammo = Ammo::spawn(id(50), &shot(AmmoData::hitscan(5.0), EntityId::NULL));
        ammo.update(0.02, &world, &mut targets);
        assert!(ammo.is_finished());
        assert!(ammo.drain_events().is_empty());
    }

    #[test]
    fn test_melee_skips_owner_hierarchy() {
        let mut world = world();
        let owner = id(1);
        let hand = id(2);
        let enemy = id(3);
        world.insert(owner, ColliderDesc::sphere(0.5)).unwrap();
        world
            .insert(hand, ColliderDesc::sphere(0.2).with_position(Vec3::new(0.0, 0.0, 0.8)).with_parent(owner))
            .unwrap();
        world
            .insert(enemy, ColliderDesc::sphere(0.5).with_position(Vec3::new(0.0, 0.0, 1.2)))
            .unwrap();

        let mut targets: HashMap<EntityId, Health> = HashMap::new();
        targets.insert(owner, Health::new(100.0));
        targets.insert(enemy, Health::new(100.0));

        let mut ammo = Ammo::spawn(id(50), &shot(AmmoData::melee(0.6), owner));
        ammo.update(0.02, &world, &mut targets);

        assert!(ammo.is_finished());
        assert_eq!(damaged(&ammo.drain_events()), vec![enemy]);
        assert_eq!(targets[&owner].current_health(), 100.0);
        assert_eq!(targets[&enemy].current_health(), 90.0);
    }

    #[test]
    fn test_projectile_hits_child_damages_root() {
        let mut world = world();
        let body = id(1);
        let head = id(2);
        world
            .insert(body, ColliderDesc::sphere(0.5).with_position(Vec3::new(5.0, 0.0, 0.0)))
            .unwrap();
        world
            .insert(head, ColliderDesc::sphere(0.5).with_position(Vec3::new(0.0, 0.0, 5.0)).with_parent(body))
            .unwrap();
        let mut targets: HashMap<EntityId, Health> = HashMap::new();
        targets.insert(body, Health::new(100.0));

        let mut ammo = Ammo::spawn(id(50), &shot(AmmoData::projectile(20.0), EntityId::NULL));
        for _ in 0..50 {
            ammo.update(0.02, &world, &mut targets);
        }

        assert!(ammo.is_finished());
        assert_eq!(targets[&body].current_health(), 90.0);
        assert_abs_diff_eq!(ammo.position().z, 4.5, epsilon = 1e-3);
    }

    #[test]
    fn test_projectile_speed_from_impulse() {
        let world = world();
        let mut targets: HashMap<EntityId, Health> = HashMap::new();
        let mut ammo = Ammo::spawn(id(50), &shot(AmmoData::projectile(10.0), EntityId::NULL));
        ammo.update(0.1, &world, &mut targets);
        assert_abs_diff_eq!(ammo.velocity().z, 10.0, epsilon = 1e-5);
        assert_abs_diff_eq!(ammo.position().z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_gravity_arc_rotates_to_velocity() {
        let world = world();
        let mut targets: HashMap<EntityId, Health> = HashMap::new();
        let mut ammo = Ammo::spawn(id(50), &shot(AmmoData::projectile(10.0).with_gravity(), EntityId::NULL));
        for _ in 0..10 {
            ammo.update(0.05, &world, &mut targets);
        }
        assert!(ammo.velocity().y < 0.0);
        let facing = ammo.rotation() * FORWARD;
        assert!(facing.dot(ammo.velocity().normalize()) > 0.999);
    }

    #[test]
    fn test_lifetime_expiry_with_effect() {
        let world = world();
        let mut targets: HashMap<EntityId, Health> = HashMap::new();
        let mut data = AmmoData::projectile(1.0).with_lifetime(0.5).with_impact_effect("Puff");
        data.impact_on_expired = true;
        let mut ammo = Ammo::spawn(id(50), &shot(data, EntityId::NULL));

        for _ in 0..4 {
            ammo.update(0.1, &world, &mut targets);
        }
        assert!(!ammo.is_finished());
        ammo.update(0.1, &world, &mut targets);
        assert!(ammo.is_finished());

        let events = ammo.drain_events();
        assert!(matches!(&events[0], AmmoEvent::Impact { effect: Some(e), target: None, .. } if e == "Puff"));
        assert_eq!(events[1], AmmoEvent::Expired);
    }

    #[test]
    fn test_bounce_reflects() {
        let mut world = world();
        world
            .insert(
                id(1),
                ColliderDesc::cuboid(Vec3::new(5.0, 5.0, 0.5)).with_position(Vec3::new(0.0, 0.0, 3.0)),
            )
            .unwrap();
        let mut targets: HashMap<EntityId, Health> = HashMap::new();
        let mut ammo = Ammo::spawn(id(50), &shot(AmmoData::projectile(10.0).with_bounce(), EntityId::NULL));

        for _ in 0..5 {
            ammo.update(0.1, &world, &mut targets);
        }
        assert!(!ammo.is_finished());
        assert!(ammo.velocity().z < 0.0);
        assert!(ammo.position().z < 2.5);
    }

    #[test]
    fn test_mask_miss_reflects_off_wall() {
        let mut world = world();
        world
            .insert(
                id(1),
                ColliderDesc::cuboid(Vec3::new(5.0, 5.0, 0.5))
                    .with_position(Vec3::new(0.0, 0.0, 3.0))
                    .with_layer(Layer::ENVIRONMENT),
            )
            .unwrap();
        let mut targets: HashMap<EntityId, Health> = HashMap::new();
        let data = AmmoData::projectile(10.0).with_mask(Layer::ENEMIES.mask());
        let mut ammo = Ammo::spawn(id(50), &shot(data, EntityId::NULL));
        for _ in 0..5 {
            ammo.update(0.1, &world, &mut targets);
        }
        assert!(!ammo.is_finished());
        assert!(ammo.velocity().z < 0.0);
    }

    #[test]
    fn test_damage_over_time_while_stuck() {
        let mut world = world();
        let target = id(1);
        world
            .insert(target, ColliderDesc::sphere(0.5).with_position(Vec3::new(0.0, 0.0, 1.3)))
            .unwrap();
        let mut targets: HashMap<EntityId, Health> = HashMap::new();
        targets.insert(target, Health::new(100.0));

        let data = AmmoData::projectile(10.0).with_damage_over_time(4.0).persistent();
        let mut ammo = Ammo::spawn(id(50), &shot(data, EntityId::NULL));

        // Hit on the first update, no damage on contact
        ammo.update(0.1, &world, &mut targets);
        assert_eq!(ammo.contact(), Some(target));
        assert_eq!(targets[&target].current_health(), 100.0);

        // Four ticks per second for one second
        for _ in 0..10 {
            ammo.update(0.1, &world, &mut targets);
        }
        assert_eq!(targets[&target].current_health(), 60.0);
        assert!(!ammo.is_finished());
    }
}
