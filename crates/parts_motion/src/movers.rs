//! Simple scene movers
//!
//! Each mover drives a [`Pose`] it is handed every tick. Movers have an
//! `active` flag; an inactive mover leaves the pose alone.

use glam::{EulerRot, Quat, Vec3};
use parts_core::{look_rotation, move_towards, UP};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Position and orientation of a moved object
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::new(Vec3::ZERO)
    }
}

fn euler_degrees(degrees: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::YXZ,
        degrees.y.to_radians(),
        degrees.x.to_radians(),
        degrees.z.to_radians(),
    )
}

/// Spins at a constant rate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rotator {
    /// Degrees per second around X, Y and Z
    pub speed: Vec3,
    /// Rotate around the object's own axes instead of the world's
    pub local: bool,
    pub active: bool,
}

impl Rotator {
    pub fn new(speed: Vec3) -> Self {
        Self {
            speed,
            local: true,
            active: true,
        }
    }

    /// Rotate around world axes
    pub fn in_world_space(mut self) -> Self {
        self.local = false;
        self
    }

    pub fn update(&self, dt: f32, pose: &mut Pose) {
        if !self.active {
            return;
        }
        let step = euler_degrees(self.speed * dt);
        pose.rotation = if self.local {
            pose.rotation * step
        } else {
            step * pose.rotation
        };
        pose.rotation = pose.rotation.normalize();
    }
}

/// Bobs back and forth along a direction around where it started
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wave {
    /// Phase advance per second, in radians
    pub frequency: f32,
    pub amplitude: f32,
    pub direction: Vec3,
    origin: Vec3,
    phase: f32,
    pub active: bool,
}

impl Wave {
    /// Start a wave around `origin`
    pub fn new(origin: Vec3) -> Self {
        Self {
            frequency: 1.0,
            amplitude: 1.0,
            direction: UP,
            origin,
            phase: 0.0,
            active: true,
        }
    }

    pub fn with_frequency(mut self, frequency: f32) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude;
        self
    }

    pub fn with_direction(mut self, direction: Vec3) -> Self {
        self.direction = direction;
        self
    }

    /// Start at a random phase in `[0, max_phase]` so a row of waves drifts apart
    pub fn with_random_phase(mut self, max_phase: f32, rng: &mut impl Rng) -> Self {
        if max_phase > 0.0 {
            self.phase = rng.gen_range(0.0..=max_phase);
        }
        self
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn update(&mut self, dt: f32, pose: &mut Pose) {
        if !self.active {
            return;
        }
        self.phase += self.frequency * dt;
        pose.position = self.origin + self.direction.normalize_or_zero() * self.phase.sin() * self.amplitude;
    }
}

/// Heads for a target point and stops near it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveTowards {
    pub speed: f32,
    pub stopping_distance: f32,
    pub rotation_speed: f32,
    pub rotate_towards_target: bool,
    pub active: bool,
    arrived: bool,
}

impl Default for MoveTowards {
    fn default() -> Self {
        Self {
            speed: 5.0,
            stopping_distance: 0.1,
            rotation_speed: 10.0,
            rotate_towards_target: true,
            active: true,
            arrived: false,
        }
    }
}

impl MoveTowards {
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_stopping_distance(mut self, distance: f32) -> Self {
        self.stopping_distance = distance;
        self
    }

    pub fn has_arrived(&self) -> bool {
        self.arrived
    }

    /// Step toward `target`. With no target the mover idles.
    pub fn update(&mut self, dt: f32, pose: &mut Pose, target: Option<Vec3>) {
        let Some(target) = target else {
            return;
        };
        if !self.active {
            return;
        }

        let direction = target - pose.position;
        self.arrived = direction.length() <= self.stopping_distance;
        if self.arrived {
            return;
        }

        if self.rotate_towards_target && direction != Vec3::ZERO {
            let wanted = look_rotation(direction, UP);
            let t = (self.rotation_speed * dt).clamp(0.0, 1.0);
            pose.rotation = pose.rotation.slerp(wanted, t).normalize();
        }

        pose.position = move_towards(pose.position, target, self.speed * dt);
    }
}

/// Which axes [`FaceTarget`] turns on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaceMode {
    Full,
    /// Stay upright, turn only around Y
    YAxisOnly,
}

impl Default for FaceMode {
    fn default() -> Self {
        Self::Full
    }
}

/// Keeps an object pointed at a target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceTarget {
    pub mode: FaceMode,
    /// Degrees per second. `None` snaps straight to the target.
    pub turn_speed: Option<f32>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Default for FaceTarget {
    fn default() -> Self {
        Self::new(FaceMode::Full)
    }
}

impl FaceTarget {
    pub fn new(mode: FaceMode) -> Self {
        Self {
            mode,
            turn_speed: None,
            active: true,
        }
    }

    pub fn with_turn_speed(mut self, degrees_per_second: f32) -> Self {
        self.turn_speed = Some(degrees_per_second);
        self
    }

    pub fn update(&self, dt: f32, pose: &mut Pose, target: Option<Vec3>) {
        let Some(target) = target else {
            return;
        };
        if !self.active {
            return;
        }

        let mut direction = target - pose.position;
        if self.mode == FaceMode::YAxisOnly {
            direction.y = 0.0;
        }
        if direction.length_squared() <= f32::EPSILON {
            return;
        }

        let wanted = look_rotation(direction, UP);
        pose.rotation = match self.turn_speed {
            None => wanted,
            Some(speed) => rotate_towards(pose.rotation, wanted, (speed * dt).to_radians()),
        };
    }
}

/// Turn `from` toward `to` by at most `max_radians`
fn rotate_towards(from: Quat, to: Quat, max_radians: f32) -> Quat {
    let angle = from.angle_between(to);
    if angle <= max_radians || angle <= f32::EPSILON {
        return to;
    }
    from.slerp(to, max_radians / angle).normalize()
}

/// Order a [`PointsFollower`] walks its points in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FollowMode {
    /// First to last, then stop
    Forward,
    /// Last to first, then stop
    Reverse,
    /// Wrap around forever
    Loop,
    /// Bounce between the ends forever
    PingPong,
}

impl Default for FollowMode {
    fn default() -> Self {
        Self::Loop
    }
}

/// Events emitted by a [`PointsFollower`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowerEvent {
    /// Reached the point at this index
    Arrived(usize),
    /// Walked off the end in a one-way mode
    Finished,
}

/// Travels along a fixed list of points
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsFollower {
    points: Vec<Vec3>,
    pub speed: f32,
    pub arrival_distance: f32,
    pub mode: FollowMode,
    /// Turn to face the point being travelled to
    pub face_direction: bool,
    pub active: bool,
    current: usize,
    reversed: bool,
    complete: bool,
    #[serde(skip)]
    events: Vec<FollowerEvent>,
}

impl PointsFollower {
    pub fn new(points: Vec<Vec3>, mode: FollowMode) -> Self {
        let reversed = mode == FollowMode::Reverse;
        let current = if reversed { points.len().saturating_sub(1) } else { 0 };
        Self {
            points,
            speed: 5.0,
            arrival_distance: 0.1,
            mode,
            face_direction: true,
            active: true,
            current,
            reversed,
            complete: false,
            events: Vec::new(),
        }
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Where the follower starts; place the object here before the first tick
    pub fn start_position(&self) -> Option<Vec3> {
        self.points.get(self.current).copied()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn update(&mut self, dt: f32, pose: &mut Pose) {
        if !self.active || self.complete {
            return;
        }
        let Some(&target) = self.points.get(self.current) else {
            return;
        };

        pose.position = move_towards(pose.position, target, self.speed * dt);

        if self.face_direction {
            let heading = target - pose.position;
            if heading.length_squared() > f32::EPSILON {
                pose.rotation = look_rotation(heading, UP);
            }
        }

        if pose.position.distance(target) <= self.arrival_distance {
            self.events.push(FollowerEvent::Arrived(self.current));
            self.advance();
        }
    }

    fn advance(&mut self) {
        let len = self.points.len();
        let next = if self.reversed {
            self.current.checked_sub(1)
        } else {
            Some(self.current + 1).filter(|n| *n < len)
        };

        match (self.mode, next) {
            (_, Some(next)) => self.current = next,
            (FollowMode::Forward | FollowMode::Reverse, None) => {
                self.complete = true;
                self.events.push(FollowerEvent::Finished);
            }
            (FollowMode::Loop, None) => {
                self.current = if self.reversed { len - 1 } else { 0 };
            }
            (FollowMode::PingPong, None) => {
                self.reversed = !self.reversed;
                if len > 1 {
                    self.current = if self.reversed { self.current - 1 } else { self.current + 1 };
                }
            }
        }
    }

    pub fn drain_events(&mut self) -> Vec<FollowerEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use parts_core::FORWARD;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_rotator_spins() {
        let rotator = Rotator::new(Vec3::new(0.0, 90.0, 0.0));
        let mut pose = Pose::default();
        for _ in 0..10 {
            rotator.update(0.1, &mut pose);
        }
        let facing = pose.rotation * FORWARD;
        assert_abs_diff_eq!(facing.x, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_inactive_mover_is_still() {
        let mut rotator = Rotator::new(Vec3::splat(45.0));
        rotator.active = false;
        let mut pose = Pose::default();
        rotator.update(1.0, &mut pose);
        assert_eq!(pose, Pose::default());
    }

    #[test]
    fn test_wave() {
        let mut wave = Wave::new(Vec3::new(0.0, 2.0, 0.0)).with_amplitude(0.5);
        let mut pose = Pose::new(wave.origin());
        wave.update(std::f32::consts::FRAC_PI_2, &mut pose);
        assert_abs_diff_eq!(pose.position.y, 2.5, epsilon = 1e-5);

        let mut rng = StdRng::seed_from_u64(7);
        let shifted = Wave::new(Vec3::ZERO).with_random_phase(10.0, &mut rng);
        assert!((0.0..=10.0).contains(&shifted.phase()));
    }

    #[test]
    fn test_move_towards_arrives() {
        let mut mover = MoveTowards::default();
        let mut pose = Pose::default();
        let target = Vec3::new(0.0, 0.0, 2.0);

        for _ in 0..30 {
            mover.update(0.1, &mut pose, Some(target));
        }
        assert!(mover.has_arrived());
        assert!(pose.position.distance(target) <= 0.1);
        let facing = pose.rotation * FORWARD;
        assert!(facing.z > 0.99);

        // No target, no motion
        let before = pose;
        mover.update(0.1, &mut pose, None);
        assert_eq!(pose, before);
    }

    #[test]
    fn test_face_target_y_axis_only() {
        let face = FaceTarget::new(FaceMode::YAxisOnly);
        let mut pose = Pose::default();
        face.update(0.1, &mut pose, Some(Vec3::new(5.0, 10.0, 0.0)));
        let facing = pose.rotation * FORWARD;
        assert_abs_diff_eq!(facing.x, 1.0, epsilon = 1e-4);
        assert_abs_diff_eq!(facing.y, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_face_target_turn_speed() {
        let face = FaceTarget::new(FaceMode::Full).with_turn_speed(90.0);
        let mut pose = Pose::default();
        let target = Vec3::new(-5.0, 0.0, 0.0);
        face.update(0.5, &mut pose, Some(target));
        let half = pose.rotation * FORWARD;
        assert_abs_diff_eq!(half.x, -std::f32::consts::FRAC_1_SQRT_2, epsilon = 1e-3);

        face.update(1.0, &mut pose, Some(target));
        let facing = pose.rotation * FORWARD;
        assert_abs_diff_eq!(facing.x, -1.0, epsilon = 1e-4);
    }

    fn square() -> Vec<Vec3> {
        vec![
            Vec3::ZERO,
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 1.0),
        ]
    }

    fn run(follower: &mut PointsFollower, pose: &mut Pose, ticks: usize) -> Vec<FollowerEvent> {
        for _ in 0..ticks {
            follower.update(0.1, pose);
        }
        follower.drain_events()
    }

    #[test]
    fn test_forward_finishes() {
        let mut follower = PointsFollower::new(square(), FollowMode::Forward);
        let mut pose = Pose::new(follower.start_position().unwrap_or_default());
        let events = run(&mut follower, &mut pose, 20);

        assert_eq!(
            events,
            vec![
                FollowerEvent::Arrived(0),
                FollowerEvent::Arrived(1),
                FollowerEvent::Arrived(2),
                FollowerEvent::Finished,
            ]
        );
        assert!(follower.is_complete());
        assert_abs_diff_eq!(pose.position.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_reverse_starts_at_end() {
        let mut follower = PointsFollower::new(square(), FollowMode::Reverse);
        assert_eq!(follower.current_index(), 2);
        let mut pose = Pose::new(follower.start_position().unwrap_or_default());
        let events = run(&mut follower, &mut pose, 20);
        assert_eq!(events.first(), Some(&FollowerEvent::Arrived(2)));
        assert_eq!(events.last(), Some(&FollowerEvent::Finished));
        assert_eq!(pose.position, Vec3::ZERO);
    }

    #[test]
    fn test_loop_wraps() {
        let mut follower = PointsFollower::new(square(), FollowMode::Loop);
        let mut pose = Pose::new(Vec3::ZERO);
        let events = run(&mut follower, &mut pose, 40);
        let arrived: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                FollowerEvent::Arrived(i) => Some(*i),
                FollowerEvent::Finished => None,
            })
            .collect();
        assert_eq!(&arrived[..4], &[0, 1, 2, 0]);
        assert!(!follower.is_complete());
    }

    #[test]
    fn test_ping_pong_bounces() {
        let mut follower = PointsFollower::new(square(), FollowMode::PingPong);
        let mut pose = Pose::new(Vec3::ZERO);
        let events = run(&mut follower, &mut pose, 60);
        let arrived: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                FollowerEvent::Arrived(i) => Some(*i),
                FollowerEvent::Finished => None,
            })
            .collect();
        assert_eq!(&arrived[..5], &[0, 1, 2, 1, 0]);
    }
}
