//! Timed spawners

use crate::activation::{Activatable, Activation};
use glam::{Quat, Vec3};
use parts_core::{EntityId, LayerMask, Scheduler, TimerKey};
use parts_physics::{PhysicsQuery, QueryFilter};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Timer purpose for spawn intervals
pub const SPAWN: &str = "spawn";

/// Attempts to find a clear position before a spawn is skipped
pub const MAX_SPAWN_ATTEMPTS: u32 = 5;

/// Where spawned things appear
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpawnArea {
    /// One of these points, picked at random
    Points(Vec<Vec3>),
    /// Anywhere inside an axis-aligned box
    Box { center: Vec3, half_extents: Vec3 },
    /// Anywhere inside a sphere
    Sphere { center: Vec3, radius: f32 },
}

impl SpawnArea {
    /// Random candidate position, `None` for an empty point list
    pub fn sample(&self, rng: &mut impl Rng) -> Option<Vec3> {
        match self {
            Self::Points(points) => points.choose(rng).copied(),
            Self::Box { center, half_extents } => {
                let h = half_extents.abs();
                Some(
                    *center
                        + Vec3::new(
                            rng.gen_range(-1.0f32..=1.0) * h.x,
                            rng.gen_range(-1.0f32..=1.0) * h.y,
                            rng.gen_range(-1.0f32..=1.0) * h.z,
                        ),
                )
            }
            Self::Sphere { center, radius } => {
                // Rejection sample the unit ball
                loop {
                    let p = Vec3::new(
                        rng.gen_range(-1.0..=1.0),
                        rng.gen_range(-1.0..=1.0),
                        rng.gen_range(-1.0..=1.0),
                    );
                    if p.length_squared() <= 1.0 {
                        return Some(*center + p * *radius);
                    }
                }
            }
        }
    }
}

/// Spawner tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnerConfig {
    /// Prefab names, one picked at random per spawn
    pub prefabs: Vec<String>,
    pub min_interval: f32,
    pub max_interval: f32,
    /// Cap on live spawns; `None` for no limit
    pub max_spawned: Option<usize>,
    /// Skip positions where something already overlaps
    pub avoid_overlap: bool,
    pub overlap_radius: f32,
    pub overlap_mask: LayerMask,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            prefabs: Vec::new(),
            min_interval: 1.0,
            max_interval: 1.0,
            max_spawned: Some(1),
            avoid_overlap: true,
            overlap_radius: 0.5,
            overlap_mask: LayerMask::ALL,
        }
    }
}

impl SpawnerConfig {
    pub fn with_prefab(mut self, prefab: impl Into<String>) -> Self {
        self.prefabs.push(prefab.into());
        self
    }

    pub fn with_interval(mut self, min: f32, max: f32) -> Self {
        self.min_interval = min.max(0.0);
        self.max_interval = max.max(self.min_interval);
        self
    }

    pub fn with_max_spawned(mut self, max: Option<usize>) -> Self {
        self.max_spawned = max;
        self
    }

    pub fn with_overlap(mut self, radius: f32, mask: LayerMask) -> Self {
        self.avoid_overlap = true;
        self.overlap_radius = radius;
        self.overlap_mask = mask;
        self
    }

    pub fn allow_overlap(mut self) -> Self {
        self.avoid_overlap = false;
        self
    }
}

/// Ask the caller to create an instance
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    pub prefab: String,
    pub position: Vec3,
    pub rotation: Quat,
}

/// Spawns prefabs on a random interval while active
#[derive(Debug, Clone)]
pub struct Spawner {
    id: EntityId,
    pub area: SpawnArea,
    pub config: SpawnerConfig,
    /// Rotation given to spawned instances
    pub rotation: Quat,
    activation: Activatable,
    spawned: Vec<EntityId>,
    scratch: Vec<EntityId>,
}

impl Spawner {
    pub fn new(id: EntityId, area: SpawnArea, config: SpawnerConfig) -> Self {
        Self {
            id,
            area,
            config,
            rotation: Quat::IDENTITY,
            activation: Activatable::default(),
            spawned: Vec::new(),
            scratch: Vec::new(),
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_activation(mut self, activation: Activatable) -> Self {
        self.activation = activation;
        self
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.activation.is_active()
    }

    /// Live spawns being tracked
    pub fn spawned(&self) -> &[EntityId] {
        &self.spawned
    }

    fn key(&self) -> TimerKey {
        TimerKey::new(self.id, SPAWN)
    }

    fn schedule_next(&self, scheduler: &mut Scheduler, rng: &mut impl Rng) {
        let (min, max) = (self.config.min_interval, self.config.max_interval);
        let delay = if max > min { rng.gen_range(min..max) } else { min };
        scheduler.start_once(self.key(), delay);
    }

    /// Activate if configured to start active
    pub fn start(&mut self, scheduler: &mut Scheduler, rng: &mut impl Rng) {
        if self.activation.starts_active() {
            self.activate(scheduler, rng);
        }
    }

    /// Start the spawn clock, replacing a running one
    pub fn activate(&mut self, scheduler: &mut Scheduler, rng: &mut impl Rng) {
        self.activation.activate();
        self.schedule_next(scheduler, rng);
    }

    pub fn deactivate(&mut self, scheduler: &mut Scheduler) {
        self.activation.deactivate();
        scheduler.cancel(self.key());
    }

    pub fn apply(&mut self, signal: Activation, scheduler: &mut Scheduler, rng: &mut impl Rng) {
        match signal {
            Activation::Activate => self.activate(scheduler, rng),
            Activation::Deactivate => self.deactivate(scheduler),
        }
    }

    /// Record the entity created for a [`SpawnRequest`]
    pub fn track(&mut self, entity: EntityId) {
        self.spawned.push(entity);
    }

    /// Drop tracked spawns that no longer exist
    pub fn prune(&mut self, is_alive: impl Fn(EntityId) -> bool) {
        self.spawned.retain(|e| is_alive(*e));
    }

    fn is_ready(&self) -> bool {
        self.activation.is_active() && self.config.max_spawned.map_or(true, |max| self.spawned.len() < max)
    }

    /// Handle the spawn timer: schedule the next interval and, if below the
    /// cap, pick a prefab and a clear position
    pub fn handle_timer<Q: PhysicsQuery + ?Sized>(
        &mut self,
        key: &TimerKey,
        scheduler: &mut Scheduler,
        query: &Q,
        rng: &mut impl Rng,
        is_alive: impl Fn(EntityId) -> bool,
    ) -> Option<SpawnRequest> {
        if !key.is(self.id, SPAWN) || !self.activation.is_active() {
            return None;
        }
        self.schedule_next(scheduler, rng);

        self.prune(is_alive);
        if !self.is_ready() {
            return None;
        }
        self.try_spawn(query, rng)
    }

    /// Pick a prefab and position right now, ignoring the cap
    pub fn try_spawn<Q: PhysicsQuery + ?Sized>(&mut self, query: &Q, rng: &mut impl Rng) -> Option<SpawnRequest> {
        let Some(prefab) = self.config.prefabs.choose(rng).cloned() else {
            log::error!("spawner {} has no prefabs", self.id);
            return None;
        };

        let filter = QueryFilter::mask(self.config.overlap_mask);
        for _ in 0..MAX_SPAWN_ATTEMPTS {
            let Some(position) = self.area.sample(rng) else {
                log::error!("spawner {} has no spawn points", self.id);
                return None;
            };
            if !self.config.avoid_overlap {
                return Some(self.request(prefab, position));
            }
            self.scratch.clear();
            if query.overlap_sphere(position, self.config.overlap_radius, &filter, &mut self.scratch) == 0 {
                return Some(self.request(prefab, position));
            }
        }

        log::warn!(
            "spawner {} found no clear position after {} attempts",
            self.id,
            MAX_SPAWN_ATTEMPTS
        );
        None
    }

    fn request(&self, prefab: String, position: Vec3) -> SpawnRequest {
        log::debug!("spawner {} spawning {} at {}", self.id, prefab, position);
        SpawnRequest {
            prefab,
            position,
            rotation: self.rotation,
        }
    }
}
