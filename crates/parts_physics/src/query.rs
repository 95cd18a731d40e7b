//! Scene query contract

use crate::body::ForceMode;
use glam::Vec3;
use parts_core::{EntityId, Layer, LayerMask};

/// Result of a raycast or sphere cast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    /// Entity owning the collider that was hit
    pub entity: EntityId,
    /// Hit point in world space
    pub point: Vec3,
    /// Surface normal at hit point
    pub normal: Vec3,
    /// Distance from the query origin
    pub distance: f32,
}

/// Filter applied to every query
#[derive(Debug, Clone)]
pub struct QueryFilter {
    /// Layers that can be hit
    pub mask: LayerMask,
    /// Entities to skip (together with their children)
    pub exclude: Vec<EntityId>,
    /// Whether trigger colliders are reported
    pub include_triggers: bool,
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self {
            mask: LayerMask::ALL,
            exclude: Vec::new(),
            include_triggers: false,
        }
    }
}

impl QueryFilter {
    /// Filter on a layer mask
    pub fn mask(mask: LayerMask) -> Self {
        Self {
            mask,
            ..Default::default()
        }
    }

    /// Skip an entity and its hierarchy
    pub fn excluding(mut self, entity: EntityId) -> Self {
        if !entity.is_null() {
            self.exclude.push(entity);
        }
        self
    }

    /// Report trigger colliders too
    pub fn with_triggers(mut self) -> Self {
        self.include_triggers = true;
        self
    }
}

/// Read-only questions gameplay code asks the scene
pub trait PhysicsQuery {
    /// Nearest hit along a ray. `dir` need not be normalized.
    fn raycast(&self, origin: Vec3, dir: Vec3, max_distance: f32, filter: &QueryFilter) -> Option<RaycastHit>;

    /// Nearest hit of a sphere swept along a ray
    fn sphere_cast(
        &self,
        origin: Vec3,
        radius: f32,
        dir: Vec3,
        max_distance: f32,
        filter: &QueryFilter,
    ) -> Option<RaycastHit>;

    /// Fill `out` with every entity overlapping a sphere. Returns the count.
    fn overlap_sphere(&self, center: Vec3, radius: f32, filter: &QueryFilter, out: &mut Vec<EntityId>) -> usize;

    /// Tag of an entity
    fn tag_of(&self, entity: EntityId) -> Option<&str>;

    /// Layer of an entity
    fn layer_of(&self, entity: EntityId) -> Option<Layer>;

    /// World position of an entity
    fn position_of(&self, entity: EntityId) -> Option<Vec3>;

    /// Parent of an entity in the scene hierarchy
    fn parent_of(&self, entity: EntityId) -> Option<EntityId>;

    /// Topmost ancestor of an entity (the entity itself when it has no parent)
    fn root_of(&self, entity: EntityId) -> EntityId {
        let mut current = entity;
        // Bounded walk in case of a malformed hierarchy
        for _ in 0..64 {
            match self.parent_of(current) {
                Some(parent) if parent != current => current = parent,
                _ => break,
            }
        }
        current
    }

    /// Whether `entity` is `ancestor` or one of its descendants
    fn is_in_hierarchy(&self, entity: EntityId, ancestor: EntityId) -> bool {
        let mut current = entity;
        for _ in 0..64 {
            if current == ancestor {
                return true;
            }
            match self.parent_of(current) {
                Some(parent) if parent != current => current = parent,
                _ => return false,
            }
        }
        false
    }
}

/// Writes gameplay code makes to dynamic bodies
pub trait PhysicsBodies {
    /// True if the entity has a non-kinematic rigid body
    fn is_dynamic(&self, entity: EntityId) -> bool;

    /// Queue a force for the next physics step. Returns false without a body.
    fn add_force(&mut self, entity: EntityId, force: Vec3, mode: ForceMode) -> bool;

    /// Current velocity of a body
    fn velocity(&self, entity: EntityId) -> Option<Vec3>;

    /// Overwrite the velocity of a body
    fn set_velocity(&mut self, entity: EntityId, velocity: Vec3) -> bool;
}
