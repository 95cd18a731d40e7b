//! Headless reference world
//!
//! Spheres and axis-aligned boxes, optional rigid bodies, and just enough
//! resolution to keep bodies resting on static geometry. It answers the same
//! queries a full engine would, which is what the gameplay crates need.

use crate::body::{ForceMode, RigidBody};
use crate::config::PhysicsConfig;
use crate::error::{PhysicsError, Result};
use crate::query::{PhysicsBodies, PhysicsQuery, QueryFilter, RaycastHit};
use crate::shape::ColliderShape;
use glam::Vec3;
use parts_core::{EntityId, Layer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything the world knows about one entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColliderDesc {
    /// Shape
    pub shape: ColliderShape,
    /// World position of the shape center
    pub position: Vec3,
    /// Collision layer
    pub layer: Layer,
    /// Optional tag
    pub tag: Option<String>,
    /// Triggers are skipped by queries unless asked for
    pub is_trigger: bool,
    /// Parent entity
    pub parent: Option<EntityId>,
    /// Optional rigid body
    pub body: Option<RigidBody>,
    /// Disabled colliders are invisible to queries
    pub enabled: bool,
}

impl ColliderDesc {
    /// Sphere collider at the origin
    pub fn sphere(radius: f32) -> Self {
        Self::new(ColliderShape::Sphere { radius })
    }

    /// Box collider at the origin
    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::new(ColliderShape::Cuboid { half_extents })
    }

    fn new(shape: ColliderShape) -> Self {
        Self {
            shape,
            position: Vec3::ZERO,
            layer: Layer::DEFAULT,
            tag: None,
            is_trigger: false,
            parent: None,
            body: None,
            enabled: true,
        }
    }

    /// Set position
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Set layer
    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layer = layer;
        self
    }

    /// Set tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Make this a trigger
    pub fn as_trigger(mut self) -> Self {
        self.is_trigger = true;
        self
    }

    /// Attach to a parent entity
    pub fn with_parent(mut self, parent: EntityId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Attach a rigid body
    pub fn with_body(mut self, body: RigidBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Distance from the center to the bottom of the shape
    fn bottom_extent(&self) -> f32 {
        match self.shape {
            ColliderShape::Sphere { radius } => radius,
            ColliderShape::Cuboid { half_extents } => half_extents.y,
        }
    }

    fn is_static(&self) -> bool {
        self.body.as_ref().map_or(true, |b| b.kinematic)
    }
}

/// Headless physics world
#[derive(Debug, Default)]
pub struct PhysicsWorld {
    config: PhysicsConfig,
    colliders: BTreeMap<EntityId, ColliderDesc>,
}

impl PhysicsWorld {
    /// Create an empty world
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            config,
            colliders: BTreeMap::new(),
        }
    }

    /// World configuration
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Register an entity's collider
    pub fn insert(&mut self, entity: EntityId, desc: ColliderDesc) -> Result<()> {
        if !desc.shape.is_valid() {
            return Err(PhysicsError::InvalidShape(format!("{:?}", desc.shape)));
        }
        if self.colliders.contains_key(&entity) {
            return Err(PhysicsError::DuplicateEntity(entity));
        }
        log::trace!("collider {} added on layer {:?}", entity, desc.layer);
        self.colliders.insert(entity, desc);
        Ok(())
    }

    /// Remove an entity. Children keep their colliders but lose the parent link.
    pub fn remove(&mut self, entity: EntityId) -> Option<ColliderDesc> {
        let removed = self.colliders.remove(&entity);
        if removed.is_some() {
            log::trace!("collider {} removed", entity);
            for desc in self.colliders.values_mut() {
                if desc.parent == Some(entity) {
                    desc.parent = None;
                }
            }
        }
        removed
    }

    /// Check if an entity is registered
    pub fn contains(&self, entity: EntityId) -> bool {
        self.colliders.contains_key(&entity)
    }

    /// Number of registered colliders
    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    /// Check if the world is empty
    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    /// Get a collider
    pub fn collider(&self, entity: EntityId) -> Option<&ColliderDesc> {
        self.colliders.get(&entity)
    }

    /// Get a collider mutably
    pub fn collider_mut(&mut self, entity: EntityId) -> Option<&mut ColliderDesc> {
        self.colliders.get_mut(&entity)
    }

    /// Teleport an entity
    pub fn set_position(&mut self, entity: EntityId, position: Vec3) -> Result<()> {
        let desc = self
            .colliders
            .get_mut(&entity)
            .ok_or(PhysicsError::EntityNotFound(entity))?;
        desc.position = position;
        Ok(())
    }

    /// Enable or disable an entity's collider
    pub fn set_enabled(&mut self, entity: EntityId, enabled: bool) -> Result<()> {
        let desc = self
            .colliders
            .get_mut(&entity)
            .ok_or(PhysicsError::EntityNotFound(entity))?;
        desc.enabled = enabled;
        Ok(())
    }

    /// Get a rigid body
    pub fn body(&self, entity: EntityId) -> Result<&RigidBody> {
        self.colliders
            .get(&entity)
            .ok_or(PhysicsError::EntityNotFound(entity))?
            .body
            .as_ref()
            .ok_or(PhysicsError::NoBody(entity))
    }

    /// Integrate all dynamic bodies by one step
    pub fn step(&mut self, dt: f32) {
        let gravity = self.config.gravity;
        let damping = self.config.linear_damping;

        let moving: Vec<EntityId> = self
            .colliders
            .iter()
            .filter(|(_, d)| d.enabled && d.body.is_some())
            .map(|(id, _)| *id)
            .collect();

        for entity in moving {
            let Some(desc) = self.colliders.get_mut(&entity) else {
                continue;
            };
            let Some(body) = desc.body.as_mut() else {
                continue;
            };
            let displacement = body.integrate(gravity, damping, dt);
            desc.position += displacement;
            let kinematic = body.kinematic;

            if !kinematic {
                self.rest_on_ground(entity);
            }
        }
    }

    /// Stop a dynamic body from sinking into static geometry below it
    fn rest_on_ground(&mut self, entity: EntityId) {
        let Some(desc) = self.colliders.get(&entity) else {
            return;
        };
        let extent = desc.bottom_extent();
        let position = desc.position;
        let falling = desc.body.as_ref().map_or(false, |b| b.velocity.y <= 0.0);
        if !falling {
            return;
        }

        // Probe from just above the center so a body that sank a little still finds the floor
        let probe_origin = position + Vec3::Y * extent;
        let ground = self
            .colliders
            .iter()
            .filter(|(id, d)| **id != entity && d.enabled && !d.is_trigger && d.is_static())
            .filter_map(|(_, d)| d.shape.raycast(d.position, probe_origin, Vec3::NEG_Y, extent * 2.0))
            .map(|(t, _)| t)
            .fold(None, |best: Option<f32>, t| Some(best.map_or(t, |b| b.min(t))));

        if let Some(t) = ground {
            let floor_y = probe_origin.y - t;
            if position.y - extent < floor_y {
                if let Some(desc) = self.colliders.get_mut(&entity) {
                    desc.position.y = floor_y + extent;
                    if let Some(body) = desc.body.as_mut() {
                        body.velocity.y = 0.0;
                    }
                }
            }
        }
    }

    fn candidates<'a>(
        &'a self,
        filter: &'a QueryFilter,
    ) -> impl Iterator<Item = (EntityId, &'a ColliderDesc)> + 'a {
        self.colliders.iter().filter_map(move |(id, d)| {
            if !d.enabled || (d.is_trigger && !filter.include_triggers) {
                return None;
            }
            if !filter.mask.contains(d.layer) {
                return None;
            }
            if filter.exclude.iter().any(|ex| self.is_in_hierarchy(*id, *ex)) {
                return None;
            }
            Some((*id, d))
        })
    }
}

impl PhysicsQuery for PhysicsWorld {
    fn raycast(&self, origin: Vec3, dir: Vec3, max_distance: f32, filter: &QueryFilter) -> Option<RaycastHit> {
        let dir = dir.normalize_or_zero();
        if dir == Vec3::ZERO {
            return None;
        }

        self.candidates(filter)
            .filter_map(|(id, d)| {
                d.shape
                    .raycast(d.position, origin, dir, max_distance)
                    .map(|(t, normal)| RaycastHit {
                        entity: id,
                        point: origin + dir * t,
                        normal,
                        distance: t,
                    })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    fn sphere_cast(
        &self,
        origin: Vec3,
        radius: f32,
        dir: Vec3,
        max_distance: f32,
        filter: &QueryFilter,
    ) -> Option<RaycastHit> {
        let dir = dir.normalize_or_zero();
        if dir == Vec3::ZERO {
            return None;
        }

        self.candidates(filter)
            .filter_map(|(id, d)| {
                d.shape
                    .sphere_cast(d.position, origin, radius, dir, max_distance)
                    .map(|(t, normal, point)| RaycastHit {
                        entity: id,
                        point,
                        normal,
                        distance: t,
                    })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    fn overlap_sphere(&self, center: Vec3, radius: f32, filter: &QueryFilter, out: &mut Vec<EntityId>) -> usize {
        out.clear();
        let mut found: Vec<(f32, EntityId)> = self
            .candidates(filter)
            .filter(|(_, d)| d.shape.overlaps_sphere(d.position, center, radius))
            .map(|(id, d)| ((d.position - center).length_squared(), id))
            .collect();
        // Nearest first so capacity-limited callers keep the closest results
        found.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        out.extend(found.into_iter().map(|(_, id)| id));
        out.len()
    }

    fn tag_of(&self, entity: EntityId) -> Option<&str> {
        self.colliders.get(&entity)?.tag.as_deref()
    }

    fn layer_of(&self, entity: EntityId) -> Option<Layer> {
        self.colliders.get(&entity).map(|d| d.layer)
    }

    fn position_of(&self, entity: EntityId) -> Option<Vec3> {
        self.colliders.get(&entity).map(|d| d.position)
    }

    fn parent_of(&self, entity: EntityId) -> Option<EntityId> {
        self.colliders.get(&entity)?.parent
    }
}

impl PhysicsBodies for PhysicsWorld {
    fn is_dynamic(&self, entity: EntityId) -> bool {
        self.colliders
            .get(&entity)
            .and_then(|d| d.body.as_ref())
            .map_or(false, |b| !b.kinematic)
    }

    fn add_force(&mut self, entity: EntityId, force: Vec3, mode: ForceMode) -> bool {
        match self.colliders.get_mut(&entity).and_then(|d| d.body.as_mut()) {
            Some(body) => {
                body.add_force(force, mode);
                true
            }
            None => false,
        }
    }

    fn velocity(&self, entity: EntityId) -> Option<Vec3> {
        self.colliders
            .get(&entity)
            .and_then(|d| d.body.as_ref())
            .map(|b| b.velocity)
    }

    fn set_velocity(&mut self, entity: EntityId, velocity: Vec3) -> bool {
        match self.colliders.get_mut(&entity).and_then(|d| d.body.as_mut()) {
            Some(body) => {
                body.velocity = velocity;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use parts_core::LayerMask;

    fn id(n: u64) -> EntityId {
        EntityId::from_raw(n)
    }

    fn world_with_ground() -> PhysicsWorld {
        let mut world = PhysicsWorld::new(PhysicsConfig::default());
        world
            .insert(
                id(1),
                ColliderDesc::cuboid(Vec3::new(50.0, 0.5, 50.0))
                    .with_position(Vec3::new(0.0, -0.5, 0.0))
                    .with_layer(Layer::ENVIRONMENT),
            )
            .expect("ground");
        world
    }

    #[test]
    fn test_raycast_nearest() {
        let mut world = world_with_ground();
        world
            .insert(id(2), ColliderDesc::sphere(0.5).with_position(Vec3::new(0.0, 0.0, 5.0)))
            .expect("near");
        world
            .insert(id(3), ColliderDesc::sphere(0.5).with_position(Vec3::new(0.0, 0.0, 9.0)))
            .expect("far");

        let hit = world
            .raycast(Vec3::new(0.0, 0.0, 0.0), Vec3::Z, 100.0, &QueryFilter::default())
            .expect("hit");
        assert_eq!(hit.entity, id(2));
        assert_abs_diff_eq!(hit.distance, 4.5, epsilon = 1e-4);

        let hit = world
            .raycast(Vec3::ZERO, Vec3::Z, 100.0, &QueryFilter::default().excluding(id(2)))
            .expect("hit");
        assert_eq!(hit.entity, id(3));
    }

    #[test]
    fn test_layer_mask_and_triggers() {
        let mut world = world_with_ground();
        world
            .insert(
                id(2),
                ColliderDesc::sphere(1.0)
                    .with_position(Vec3::new(0.0, 1.0, 0.0))
                    .as_trigger(),
            )
            .expect("trigger");

        let down = |f: &QueryFilter| world.raycast(Vec3::new(0.0, 5.0, 0.0), Vec3::NEG_Y, 10.0, f);
        assert_eq!(down(&QueryFilter::default()).map(|h| h.entity), Some(id(1)));
        assert_eq!(down(&QueryFilter::default().with_triggers()).map(|h| h.entity), Some(id(2)));
        assert!(down(&QueryFilter::mask(LayerMask::NONE)).is_none());
    }

    #[test]
    fn test_overlap_sorted_and_hierarchy_excluded() {
        let mut world = PhysicsWorld::new(PhysicsConfig::zero_gravity());
        world.insert(id(10), ColliderDesc::sphere(0.5)).expect("owner");
        world
            .insert(
                id(11),
                ColliderDesc::sphere(0.2)
                    .with_position(Vec3::new(0.3, 0.0, 0.0))
                    .with_parent(id(10)),
            )
            .expect("child");
        world
            .insert(id(12), ColliderDesc::sphere(0.5).with_position(Vec3::new(2.0, 0.0, 0.0)))
            .expect("b");
        world
            .insert(id(13), ColliderDesc::sphere(0.5).with_position(Vec3::new(1.0, 0.0, 0.0)))
            .expect("a");

        let mut out = Vec::new();
        let n = world.overlap_sphere(Vec3::ZERO, 3.0, &QueryFilter::default().excluding(id(10)), &mut out);
        assert_eq!(n, 2);
        assert_eq!(out, vec![id(13), id(12)]);
        assert_eq!(world.root_of(id(11)), id(10));
    }

    #[test]
    fn test_body_falls_and_rests() {
        let mut world = world_with_ground();
        world
            .insert(
                id(2),
                ColliderDesc::sphere(0.5)
                    .with_position(Vec3::new(0.0, 3.0, 0.0))
                    .with_body(RigidBody::dynamic(1.0)),
            )
            .expect("ball");

        for _ in 0..200 {
            world.step(0.02);
        }
        let y = world.position_of(id(2)).unwrap_or(Vec3::ZERO).y;
        assert_abs_diff_eq!(y, 0.5, epsilon = 1e-3);
        assert!(world.is_dynamic(id(2)));
        assert!(!world.is_dynamic(id(1)));
    }

    #[test]
    fn test_add_force() {
        let mut world = PhysicsWorld::new(PhysicsConfig::zero_gravity());
        world
            .insert(id(2), ColliderDesc::sphere(0.5).with_body(RigidBody::dynamic(2.0)))
            .expect("crate");
        assert!(world.add_force(id(2), Vec3::X * 4.0, ForceMode::Impulse));
        world.step(0.1);
        assert_abs_diff_eq!(world.velocity(id(2)).unwrap_or(Vec3::ZERO).x, 2.0, epsilon = 1e-5);
        assert!(!world.add_force(id(99), Vec3::X, ForceMode::Impulse));
    }

    #[test]
    fn test_invalid_shape_rejected() {
        let mut world = PhysicsWorld::default();
        assert!(matches!(
            world.insert(id(1), ColliderDesc::sphere(0.0)),
            Err(PhysicsError::InvalidShape(_))
        ));
        world.insert(id(1), ColliderDesc::sphere(1.0)).expect("first");
        assert!(matches!(
            world.insert(id(1), ColliderDesc::sphere(1.0)),
            Err(PhysicsError::DuplicateEntity(_))
        ));
    }
}
