//! Character motor

use glam::{Quat, Vec2, Vec3};
use parts_core::{look_rotation, EntityId, LayerMask, FORWARD, UP};
use parts_physics::{ForceMode, PhysicsBodies, PhysicsQuery, QueryFilter};
use serde::{Deserialize, Serialize};

/// Gap kept between the character and what it bumps into
const SKIN: f32 = 1e-3;

/// Input magnitude below which the heading is left alone
const TURN_THRESHOLD: f32 = 0.1;

/// Moves steeper than this downward are not treated as pushes
const PUSH_MIN_Y: f32 = -0.3;

/// Normals with less vertical component than this are walls
const WALL_NORMAL_Y: f32 = 0.7;

/// How the motor moves its character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveMode {
    /// View-relative movement, turning toward the direction of travel
    Kinematic,
    /// X input turns, Y input moves along the facing
    Rotation,
    /// Forces on a dynamic rigid body, applied on the fixed tick
    Physics,
}

impl Default for MoveMode {
    fn default() -> Self {
        Self::Kinematic
    }
}

/// Motor tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionConfig {
    /// Ground speed
    pub speed: f32,
    pub sprint_multiplier: f32,
    /// Jump strength. Kinematic modes reach `sqrt(2 * jump_force * gravity)`.
    pub jump_force: f32,
    /// Gravity while rising
    pub gravity: f32,
    /// Gravity while falling
    pub fall_gravity: f32,
    /// Layers that count as ground and walls
    pub ground_mask: LayerMask,
    /// Ground probe length from the character's center
    pub ground_check_distance: f32,
    /// Vertical velocity held while standing, keeps the probe in contact
    pub grounded_bias: f32,
    /// Turn rate toward the direction of travel
    pub rotate_towards_speed: f32,
    /// Degrees per second for rotation mode
    pub rotation_speed: f32,
    /// Distance from the center to the feet
    pub half_height: f32,
    /// Radius used when sweeping for walls and pushable bodies
    pub radius: f32,
    pub can_push: bool,
    pub push_force: f32,
    /// How movement forces are applied in physics mode
    pub force_mode: ForceMode,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            speed: 5.0,
            sprint_multiplier: 1.5,
            jump_force: 5.0,
            gravity: 9.81,
            fall_gravity: 20.0,
            ground_mask: LayerMask::ALL,
            ground_check_distance: 1.2,
            grounded_bias: -2.0,
            rotate_towards_speed: 10.0,
            rotation_speed: 180.0,
            half_height: 1.0,
            radius: 0.5,
            can_push: true,
            push_force: 5.0,
            force_mode: ForceMode::Force,
        }
    }
}

/// Per-tick input
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoveInput {
    /// X = strafe/turn, Y = forward
    pub movement: Vec2,
    pub sprint: bool,
    /// Edge-triggered; cleared by the first tick that reads it
    pub jump: bool,
}

impl MoveInput {
    pub fn new(movement: Vec2) -> Self {
        Self {
            movement,
            ..Default::default()
        }
    }

    fn take_jump(&mut self) -> bool {
        std::mem::take(&mut self.jump)
    }
}

/// What the motor looks like from outside (animators, cameras, HUD)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionState {
    pub position: Vec3,
    pub rotation: Quat,
    /// Vertical speed tracked by the kinematic modes
    pub vertical_velocity: f32,
    pub grounded: bool,
    /// Full velocity over the last tick
    pub velocity: Vec3,
}

impl MotionState {
    /// In the air and going down
    pub fn is_falling(&self) -> bool {
        !self.grounded && self.vertical_velocity < 0.0
    }
}

impl Default for MotionState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            vertical_velocity: 0.0,
            grounded: false,
            velocity: Vec3::ZERO,
        }
    }
}

/// Events emitted by a motor
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionEvent {
    Jumped,
    Landed,
    /// A dynamic body was pushed
    Pushed { target: EntityId, force: Vec3 },
    /// Physics mode without a dynamic body; the motor stays inert
    MissingBody,
}

/// Moves one character
#[derive(Debug, Clone)]
pub struct CharacterMotor {
    entity: EntityId,
    /// Movement mode
    pub mode: MoveMode,
    pub config: MotionConfig,
    state: MotionState,
    move_direction: Vec3,
    jump_requested: bool,
    inert: bool,
    events: Vec<MotionEvent>,
}

impl CharacterMotor {
    /// Create a motor for `entity`. The entity's own collider is never hit
    /// by the motor's probes.
    pub fn new(entity: EntityId, mode: MoveMode, config: MotionConfig) -> Self {
        Self {
            entity,
            mode,
            config,
            state: MotionState::default(),
            move_direction: Vec3::ZERO,
            jump_requested: false,
            inert: false,
            events: Vec::new(),
        }
    }

    /// Set the starting position
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.state.position = position;
        self
    }

    /// Set the starting heading
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.state.rotation = rotation;
        self
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn state(&self) -> &MotionState {
        &self.state
    }

    pub fn position(&self) -> Vec3 {
        self.state.position
    }

    pub fn rotation(&self) -> Quat {
        self.state.rotation
    }

    pub fn is_grounded(&self) -> bool {
        self.state.grounded
    }

    /// True after physics mode found no body to drive
    pub fn is_inert(&self) -> bool {
        self.inert
    }

    /// Place the character (respawn, teleport)
    pub fn teleport(&mut self, position: Vec3) {
        self.state.position = position;
        self.state.vertical_velocity = 0.0;
        self.state.velocity = Vec3::ZERO;
    }

    /// Ask for a jump on the next tick. Ignored if not grounded then.
    pub fn request_jump(&mut self) {
        self.jump_requested = true;
    }

    /// Take the pending events
    pub fn drain_events(&mut self) -> Vec<MotionEvent> {
        std::mem::take(&mut self.events)
    }

    fn filter(&self) -> QueryFilter {
        QueryFilter::mask(self.config.ground_mask).excluding(self.entity)
    }

    fn current_speed(&self, sprint: bool) -> f32 {
        if sprint {
            self.config.speed * self.config.sprint_multiplier
        } else {
            self.config.speed
        }
    }

    /// Input turned into a flat world direction through the view's rotation
    fn view_direction(input: Vec2, view: Quat) -> Vec3 {
        let mut direction = view * Vec3::new(input.x, 0.0, input.y);
        direction.y = 0.0;
        direction
    }

    fn probe_ground<W: PhysicsQuery + ?Sized>(&self, world: &W) -> bool {
        world
            .raycast(
                self.state.position,
                Vec3::NEG_Y,
                self.config.ground_check_distance,
                &self.filter(),
            )
            .is_some()
    }

    fn set_grounded(&mut self, grounded: bool) {
        if grounded && !self.state.grounded {
            self.events.push(MotionEvent::Landed);
        }
        self.state.grounded = grounded;
    }

    /// Variable-rate tick. Kinematic and rotation modes move here; physics
    /// mode only mirrors the body's state.
    pub fn update<W>(&mut self, dt: f32, input: &mut MoveInput, view: Quat, world: &mut W)
    where
        W: PhysicsQuery + PhysicsBodies + ?Sized,
    {
        match self.mode {
            MoveMode::Kinematic | MoveMode::Rotation => self.move_kinematic(dt, input, view, world),
            MoveMode::Physics => self.sync_from_body(world),
        }
    }

    /// Fixed-rate tick. Only physics mode does work here.
    pub fn fixed_update<W>(&mut self, dt: f32, input: &mut MoveInput, view: Quat, world: &mut W)
    where
        W: PhysicsQuery + PhysicsBodies + ?Sized,
    {
        if self.mode == MoveMode::Physics {
            self.move_physics(dt, input, view, world);
        }
    }

    fn move_kinematic<W>(&mut self, dt: f32, input: &mut MoveInput, view: Quat, world: &mut W)
    where
        W: PhysicsQuery + PhysicsBodies + ?Sized,
    {
        if dt <= 0.0 {
            return;
        }

        let jump = input.take_jump() | std::mem::take(&mut self.jump_requested);
        if jump && self.state.grounded {
            self.state.vertical_velocity = (self.config.jump_force * 2.0 * self.config.gravity).sqrt();
            self.events.push(MotionEvent::Jumped);
        }

        let grounded = self.probe_ground(world);
        self.set_grounded(grounded);
        if grounded && self.state.vertical_velocity < 0.0 {
            self.state.vertical_velocity = self.config.grounded_bias;
        }

        let g = if self.state.vertical_velocity < 0.0 {
            self.config.fall_gravity
        } else {
            self.config.gravity
        };
        self.state.vertical_velocity -= g * dt;

        let speed = self.current_speed(input.sprint);
        let horizontal = match self.mode {
            MoveMode::Rotation => {
                let yaw = input.movement.x * self.config.rotation_speed * dt;
                self.state.rotation = (self.state.rotation * Quat::from_rotation_y(yaw.to_radians())).normalize();
                self.state.rotation * FORWARD * input.movement.y * speed
            }
            _ => {
                let direction = Self::view_direction(input.movement, view);
                if direction.length() > TURN_THRESHOLD {
                    self.move_direction = direction.normalize();
                }
                self.turn_towards_travel(dt);
                direction.normalize_or_zero() * speed
            }
        };

        let start = self.state.position;
        let planar = self.sweep(horizontal * dt, world);
        self.state.position += planar;
        let vertical = self.sweep(UP * self.state.vertical_velocity * dt, world);
        if vertical.y < self.state.vertical_velocity * dt && self.state.vertical_velocity > 0.0 {
            // Head hit a ceiling
            self.state.vertical_velocity = 0.0;
        }
        self.state.position += vertical;
        self.snap_to_ground(world);
        self.state.velocity = (self.state.position - start) / dt;
    }

    fn turn_towards_travel(&mut self, dt: f32) {
        if self.move_direction == Vec3::ZERO {
            return;
        }
        let target = look_rotation(self.move_direction, UP);
        let t = (self.config.rotate_towards_speed * dt).clamp(0.0, 1.0);
        self.state.rotation = self.state.rotation.slerp(target, t).normalize();
    }

    /// Sweep the move for walls and pushable bodies. Returns the displacement
    /// that is actually applied.
    fn sweep<W>(&mut self, displacement: Vec3, world: &mut W) -> Vec3
    where
        W: PhysicsQuery + PhysicsBodies + ?Sized,
    {
        let length = displacement.length();
        if length <= f32::EPSILON {
            return displacement;
        }
        let dir = displacement / length;

        let Some(hit) = world.sphere_cast(self.state.position, self.config.radius, dir, length, &self.filter())
        else {
            return displacement;
        };

        if self.config.can_push && dir.y >= PUSH_MIN_Y && world.is_dynamic(hit.entity) {
            let force = Vec3::new(dir.x, 0.0, dir.z) * self.config.push_force;
            if world.add_force(hit.entity, force, ForceMode::Force) {
                self.events.push(MotionEvent::Pushed {
                    target: hit.entity,
                    force,
                });
            }
        }

        if hit.normal.y >= WALL_NORMAL_Y {
            // Floor contact; the ground snap handles it
            return displacement;
        }

        // Move up to the wall, then slide along it
        let first = dir * (hit.distance - SKIN).max(0.0);
        let mut rest = displacement - first;
        let into = rest.dot(hit.normal);
        if into < 0.0 {
            rest -= hit.normal * into;
        }
        first + rest
    }

    /// Keep the feet from sinking below the ground
    fn snap_to_ground<W: PhysicsQuery + ?Sized>(&mut self, world: &W) {
        if self.state.vertical_velocity > 0.0 {
            return;
        }

        let half = self.config.half_height;
        // Probe from above the center so a capsule that already sank still sees the floor
        let origin = self.state.position + UP * half;
        let Some(hit) = world.raycast(origin, Vec3::NEG_Y, half * 2.0, &self.filter()) else {
            return;
        };

        let floor = hit.point.y;
        if self.state.position.y - half < floor {
            self.state.position.y = floor + half;
        }
    }

    fn move_physics<W>(&mut self, _dt: f32, input: &mut MoveInput, view: Quat, world: &mut W)
    where
        W: PhysicsQuery + PhysicsBodies + ?Sized,
    {
        let jump = input.take_jump() | std::mem::take(&mut self.jump_requested);
        if self.inert {
            return;
        }
        if !world.is_dynamic(self.entity) {
            log::error!("character {} has no dynamic body; physics motor disabled", self.entity);
            self.inert = true;
            self.events.push(MotionEvent::MissingBody);
            return;
        }

        self.sync_from_body(world);

        if jump && self.state.grounded {
            world.add_force(self.entity, UP * self.config.jump_force, ForceMode::Impulse);
            self.events.push(MotionEvent::Jumped);
        }

        let grounded = self.probe_ground(world);
        self.set_grounded(grounded);

        let direction = Self::view_direction(input.movement, view).normalize_or_zero();
        let force = direction * self.current_speed(input.sprint);
        if force != Vec3::ZERO {
            world.add_force(self.entity, force, self.config.force_mode);
        }
    }

    fn sync_from_body<W>(&mut self, world: &W)
    where
        W: PhysicsQuery + PhysicsBodies + ?Sized,
    {
        if let Some(position) = world.position_of(self.entity) {
            self.state.position = position;
        }
        if let Some(velocity) = world.velocity(self.entity) {
            self.state.velocity = velocity;
            self.state.vertical_velocity = velocity.y;
        }
    }
}
