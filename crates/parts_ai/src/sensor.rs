//! Polling sensors

use glam::{Quat, Vec3};
use parts_core::{yaw_rotation, EntityId, LayerMask, Scheduler, TagFilter, TimerKey, FORWARD};
use parts_physics::{PhysicsQuery, QueryFilter};
use serde::{Deserialize, Serialize};

/// Timer purpose for sensor polls
pub const SENSE: &str = "sense";

/// How a sensor looks at the scene
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SensorShape {
    /// Everything within `radius`, nearest first
    OverlapSphere { radius: f32 },
    /// A horizontal fan of rays spread over `angle` degrees
    Raycast { distance: f32, angle: f32, ray_count: u32 },
    /// A fan of swept spheres
    SphereCast {
        radius: f32,
        distance: f32,
        angle: f32,
        ray_count: u32,
    },
}

/// What a sensor reacts to and how often
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Only colliders with this tag count
    pub tag: TagFilter,
    pub mask: LayerMask,
    /// Seconds between polls; 0 polls every tick
    pub sense_rate: f32,
    /// Capacity of the result buffer
    pub max_sensed: usize,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            tag: TagFilter::any(),
            mask: LayerMask::ALL,
            sense_rate: 0.1,
            max_sensed: 10,
        }
    }
}

impl SensorConfig {
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = TagFilter::tag(tag);
        self
    }

    pub fn with_mask(mut self, mask: LayerMask) -> Self {
        self.mask = mask;
        self
    }

    pub fn with_rate(mut self, seconds: f32) -> Self {
        self.sense_rate = seconds.max(0.0);
        self
    }

    pub fn with_capacity(mut self, max_sensed: usize) -> Self {
        self.max_sensed = max_sensed;
        self
    }
}

/// Directions of a fan of `ray_count` rays spread evenly over `angle`
/// degrees and centered on the forward axis of `rotation`.
pub fn fan_directions(rotation: Quat, angle: f32, ray_count: u32) -> impl Iterator<Item = Vec3> {
    let step = if ray_count > 1 {
        angle / (ray_count - 1) as f32
    } else {
        0.0
    };
    let start = -angle / 2.0;
    let forward = rotation * FORWARD;
    (0..ray_count).map(move |i| yaw_rotation(start + step * i as f32) * forward)
}

/// Polls the scene and remembers what it found last time
#[derive(Debug, Clone)]
pub struct Sensor {
    id: EntityId,
    owner: EntityId,
    pub shape: SensorShape,
    config: SensorConfig,
    sensed: Vec<EntityId>,
    count: usize,
    enabled: bool,
    scratch: Vec<EntityId>,
}

impl Sensor {
    pub fn new(id: EntityId, shape: SensorShape, config: SensorConfig) -> Self {
        let capacity = config.max_sensed;
        Self {
            id,
            owner: EntityId::NULL,
            shape,
            config,
            sensed: vec![EntityId::NULL; capacity],
            count: 0,
            enabled: false,
            scratch: Vec::with_capacity(capacity),
        }
    }

    /// Never sense this entity or anything attached to it
    pub fn with_owner(mut self, owner: EntityId) -> Self {
        self.owner = owner;
        self
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn key(&self) -> TimerKey {
        TimerKey::new(self.id, SENSE)
    }

    /// Start polling. The first poll happens on the next tick; enabling an
    /// enabled sensor restarts its schedule.
    pub fn enable(&mut self, scheduler: &mut Scheduler) {
        self.enabled = true;
        scheduler.start_repeating(self.key(), self.config.sense_rate, 0.0);
    }

    /// Stop polling. The last results stay readable.
    pub fn disable(&mut self, scheduler: &mut Scheduler) {
        self.enabled = false;
        scheduler.cancel(self.key());
    }

    /// What the last poll found
    pub fn sensed(&self) -> &[EntityId] {
        &self.sensed[..self.count]
    }

    pub fn sensed_count(&self) -> usize {
        self.count
    }

    pub fn has_sensed(&self, entity: EntityId) -> bool {
        self.sensed().contains(&entity)
    }

    /// Poll if `key` is this sensor's timer. Returns whether it polled.
    pub fn handle_timer<Q: PhysicsQuery + ?Sized>(
        &mut self,
        key: &TimerKey,
        query: &Q,
        position: Vec3,
        rotation: Quat,
    ) -> bool {
        if !self.enabled || !key.is(self.id, SENSE) {
            return false;
        }
        self.poll(query, position, rotation);
        true
    }

    /// Overwrite the result buffer with what the sensor sees from `position`
    /// facing `rotation`
    pub fn poll<Q: PhysicsQuery + ?Sized>(&mut self, query: &Q, position: Vec3, rotation: Quat) {
        let filter = QueryFilter::mask(self.config.mask).excluding(self.owner);
        self.scratch.clear();

        match self.shape {
            SensorShape::OverlapSphere { radius } => {
                query.overlap_sphere(position, radius, &filter, &mut self.scratch);
            }
            SensorShape::Raycast {
                distance,
                angle,
                ray_count,
            } => {
                for dir in fan_directions(rotation, angle, ray_count) {
                    if let Some(hit) = query.raycast(position, dir, distance, &filter) {
                        self.scratch.push(hit.entity);
                    }
                }
            }
            SensorShape::SphereCast {
                radius,
                distance,
                angle,
                ray_count,
            } => {
                for dir in fan_directions(rotation, angle, ray_count) {
                    if let Some(hit) = query.sphere_cast(position, radius, dir, distance, &filter) {
                        self.scratch.push(hit.entity);
                    }
                }
            }
        }

        self.count = 0;
        for i in 0..self.scratch.len() {
            let entity = self.scratch[i];
            if !self.config.tag.passes(query.tag_of(entity)) {
                continue;
            }
            // Several rays of one fan can land on the same body
            if self.sensed[..self.count].contains(&entity) {
                continue;
            }
            if self.count == self.sensed.len() {
                break;
            }
            self.sensed[self.count] = entity;
            self.count += 1;
        }

        log::trace!("sensor {} sensed {}", self.id, self.count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use parts_core::Layer;
    use parts_physics::{ColliderDesc, PhysicsConfig, PhysicsWorld};

    fn id(n: u64) -> EntityId {
        EntityId::from_raw(n)
    }

    fn world() -> PhysicsWorld {
        let mut world = PhysicsWorld::new(PhysicsConfig::zero_gravity());
        let targets = [
            (1, Vec3::new(0.0, 0.0, 5.0), "Player"),
            (2, Vec3::new(3.0, 0.0, 0.0), "Enemy"),
            (3, Vec3::new(-2.0, 0.0, 0.0), "Player"),
            (4, Vec3::new(0.0, 0.0, -12.0), "Player"),
        ];
        for (n, position, tag) in targets {
            world
                .insert(
                    id(n),
                    ColliderDesc::sphere(0.5)
                        .with_position(position)
                        .with_layer(Layer::PLAYER)
                        .with_tag(tag),
                )
                .unwrap();
        }
        world
    }

    #[test]
    fn test_fan_directions() {
        let angles: Vec<f32> = fan_directions(Quat::IDENTITY, 60.0, 5)
            .map(|d| d.x.atan2(d.z).to_degrees())
            .collect();
        let expected = [-30.0, -15.0, 0.0, 15.0, 30.0];
        assert_eq!(angles.len(), 5);
        for (a, e) in angles.iter().zip(expected) {
            assert_abs_diff_eq!(*a, e, epsilon = 1e-3);
        }

        let single: Vec<Vec3> = fan_directions(Quat::IDENTITY, 60.0, 1).collect();
        assert_eq!(single.len(), 1);
        assert_abs_diff_eq!(single[0].z, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_overlap_sensor_filters_tag() {
        let world = world();
        let config = SensorConfig::default().with_tag("Player");
        let mut sensor = Sensor::new(id(10), SensorShape::OverlapSphere { radius: 6.0 }, config);

        sensor.poll(&world, Vec3::ZERO, Quat::IDENTITY);
        assert_eq!(sensor.sensed(), &[id(3), id(1)]);
        assert_eq!(sensor.sensed_count(), 2);
    }

    #[test]
    fn test_capacity_drops_extra() {
        let world = world();
        let config = SensorConfig::default().with_capacity(2);
        let mut sensor = Sensor::new(id(10), SensorShape::OverlapSphere { radius: 20.0 }, config);

        sensor.poll(&world, Vec3::ZERO, Quat::IDENTITY);
        assert_eq!(sensor.sensed_count(), 2);
        // Nearest first
        assert_eq!(sensor.sensed(), &[id(3), id(2)]);
    }

    #[test]
    fn test_poll_overwrites() {
        let mut world = world();
        let mut sensor = Sensor::new(
            id(10),
            SensorShape::OverlapSphere { radius: 6.0 },
            SensorConfig::default(),
        );
        sensor.poll(&world, Vec3::ZERO, Quat::IDENTITY);
        assert_eq!(sensor.sensed_count(), 3);

        world.set_position(id(2), Vec3::new(30.0, 0.0, 0.0)).unwrap();
        sensor.poll(&world, Vec3::ZERO, Quat::IDENTITY);
        assert_eq!(sensor.sensed_count(), 2);
        assert!(!sensor.has_sensed(id(2)));
    }

    #[test]
    fn test_ray_fan_counts_body_once() {
        let world = world();
        let shape = SensorShape::Raycast {
            distance: 10.0,
            angle: 4.0,
            ray_count: 3,
        };
        let mut sensor = Sensor::new(id(10), shape, SensorConfig::default());
        sensor.poll(&world, Vec3::ZERO, Quat::IDENTITY);
        assert_eq!(sensor.sensed(), &[id(1)]);

        // Turned to face +X the fan finds the enemy instead
        sensor.poll(&world, Vec3::ZERO, yaw_rotation(90.0));
        assert_eq!(sensor.sensed(), &[id(2)]);
    }

    #[test]
    fn test_sphere_cast_fan_and_owner() {
        let world = world();
        let shape = SensorShape::SphereCast {
            radius: 1.0,
            distance: 20.0,
            angle: 0.0,
            ray_count: 1,
        };
        let mut sensor = Sensor::new(id(10), shape, SensorConfig::default());
        sensor.poll(&world, Vec3::ZERO, Quat::IDENTITY);
        assert_eq!(sensor.sensed(), &[id(1)]);

        let mut blind = Sensor::new(id(11), shape, SensorConfig::default()).with_owner(id(1));
        blind.poll(&world, Vec3::ZERO, Quat::IDENTITY);
        assert_eq!(blind.sensed_count(), 0);
    }

    #[test]
    fn test_polling_schedule() {
        let world = world();
        let mut scheduler = Scheduler::new();
        let mut sensor = Sensor::new(
            id(10),
            SensorShape::OverlapSphere { radius: 6.0 },
            SensorConfig::default().with_rate(0.5),
        );
        sensor.enable(&mut scheduler);

        let mut polls = 0;
        for _ in 0..8 {
            for key in scheduler.tick(0.1) {
                if sensor.handle_timer(&key, &world, Vec3::ZERO, Quat::IDENTITY) {
                    polls += 1;
                }
            }
        }
        // Immediately, then every half second
        assert_eq!(polls, 2);

        // Re-enabling replaces the schedule rather than adding a second one
        sensor.enable(&mut scheduler);
        sensor.enable(&mut scheduler);
        assert_eq!(scheduler.len(), 1);

        sensor.disable(&mut scheduler);
        assert!(scheduler.is_empty());
        assert_eq!(sensor.sensed_count(), 3);
    }
}
