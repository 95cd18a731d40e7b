//! Actors and turrets
//!
//! Where combat meets game flow: an [`Actor`] turns its health running out
//! into score and a bus event, a [`Turret`] is a weapon with a trigger.

use glam::Vec3;
use parts_combat::{Damageable, Health, HealthEvent, Muzzle, Shot, Weapon, WeaponEvent};
use parts_core::{look_rotation, EntityId, Scheduler, TimerKey, UP};
use parts_event::{EventBus, EventChannel};
use parts_gamestate::GameCommand;
use rand::Rng;

/// Published on the bus when an actor dies
#[derive(Debug, Clone, PartialEq)]
pub struct ActorDied {
    pub actor: EntityId,
    pub position: Vec3,
    /// Score awarded for the kill
    pub points: i32,
    /// Prefab left behind
    pub debris: Option<String>,
    /// Remove the actor from the scene
    pub destroy: bool,
}

/// Something with health that reacts to dying
#[derive(Debug, Clone)]
pub struct Actor {
    pub health: Health,
    /// Score awarded when it dies
    pub points: i32,
    /// Prefab spawned where it died (destructables)
    pub debris: Option<String>,
}

impl Actor {
    pub fn new(health: Health) -> Self {
        Self {
            health,
            points: 0,
            debris: None,
        }
    }

    pub fn with_points(mut self, points: i32) -> Self {
        self.points = points;
        self
    }

    pub fn with_debris(mut self, prefab: impl Into<String>) -> Self {
        self.debris = Some(prefab.into());
        self
    }

    /// Consume pending health events. A death awards points through `game`
    /// and is published on `bus`.
    pub fn react(
        &mut self,
        id: EntityId,
        position: Vec3,
        bus: &EventBus,
        game: &EventChannel<GameCommand>,
    ) -> Option<ActorDied> {
        let mut died = None;
        for event in self.health.drain_events() {
            let HealthEvent::Died { destroy } = event else {
                continue;
            };
            log::debug!("{} died at {}", id, position);

            if self.points != 0 {
                game.send(GameCommand::AddScore(self.points));
            }
            let death = ActorDied {
                actor: id,
                position,
                points: self.points,
                debris: self.debris.clone(),
                destroy,
            };
            bus.publish(death.clone());
            died = Some(death);
        }
        died
    }
}

impl Damageable for Actor {
    fn current_health(&self) -> f32 {
        self.health.current_health()
    }

    fn max_health(&self) -> f32 {
        self.health.max_health()
    }

    fn take_damage(&mut self, amount: f32) {
        self.health.take_damage(amount);
    }

    fn heal(&mut self, amount: f32) {
        self.health.heal(amount);
    }
}

/// A mounted weapon
#[derive(Debug, Clone)]
pub struct Turret {
    pub weapon: Weapon,
    pub muzzle: Muzzle,
    firing: bool,
}

impl Turret {
    /// Mount and equip `weapon`
    pub fn new(mut weapon: Weapon, muzzle: Muzzle) -> Self {
        weapon.equip();
        Self {
            weapon,
            muzzle,
            firing: false,
        }
    }

    /// Id of the mounted weapon, which owns the turret's timers
    pub fn id(&self) -> EntityId {
        self.weapon.id()
    }

    pub fn is_firing(&self) -> bool {
        self.firing
    }

    /// Point the muzzle at `target`
    pub fn aim_at(&mut self, target: Vec3) {
        let dir = target - self.muzzle.position;
        if dir.length_squared() > f32::EPSILON {
            self.muzzle.rotation = look_rotation(dir, UP);
        }
    }

    /// Press the trigger. Pressing while already firing does nothing.
    pub fn fire(&mut self, scheduler: &mut Scheduler, rng: &mut impl Rng) -> bool {
        if !self.firing {
            self.firing = self.weapon.use_weapon(scheduler, &self.muzzle, rng);
        }
        self.firing
    }

    /// Release the trigger
    pub fn stop_fire(&mut self, scheduler: &mut Scheduler) {
        self.firing = false;
        self.weapon.stop_use(scheduler);
    }

    pub fn handle_timer(&mut self, key: &TimerKey, scheduler: &mut Scheduler, rng: &mut impl Rng) -> Option<Shot> {
        self.weapon.handle_timer(key, scheduler, &self.muzzle, rng)
    }

    /// Take the weapon's events. An empty magazine releases the trigger.
    pub fn drain_events(&mut self) -> Vec<WeaponEvent> {
        let events = self.weapon.drain_events();
        if events.iter().any(|e| matches!(e, WeaponEvent::Empty)) {
            self.firing = false;
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parts_combat::{UsageType, WeaponData};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn id(n: u64) -> EntityId {
        EntityId::from_raw(n)
    }

    #[test]
    fn test_death_awards_points_and_publishes() {
        let mut bus = EventBus::new();
        let game = EventChannel::new();
        let deaths = Arc::new(AtomicU32::new(0));
        let counter = deaths.clone();
        bus.subscribe::<ActorDied, _>(move |death| {
            assert_eq!(death.points, 10);
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let mut actor = Actor::new(Health::new(20.0).with_destroy_on_death())
            .with_points(10)
            .with_debris("rubble");
        actor.take_damage(5.0);
        assert!(actor.react(id(1), Vec3::ZERO, &bus, &game).is_none());

        actor.take_damage(50.0);
        let death = actor.react(id(1), Vec3::X, &bus, &game).unwrap();
        assert!(death.destroy);
        assert_eq!(death.debris.as_deref(), Some("rubble"));
        assert_eq!(game.drain(), vec![GameCommand::AddScore(10)]);

        bus.process();
        assert_eq!(deaths.load(Ordering::SeqCst), 1);

        // Already dead: nothing more to report
        actor.take_damage(5.0);
        assert!(actor.react(id(1), Vec3::X, &bus, &game).is_none());
    }

    #[test]
    fn test_no_points_no_score() {
        let bus = EventBus::new();
        let game = EventChannel::new();
        let mut actor = Actor::new(Health::new(1.0));
        actor.take_damage(1.0);
        assert!(actor.react(id(2), Vec3::ZERO, &bus, &game).is_some());
        assert!(game.is_empty());
    }

    #[test]
    fn test_turret_fire_and_stop() {
        let mut scheduler = Scheduler::new();
        let mut rng = StdRng::seed_from_u64(3);
        let data = WeaponData::default().with_usage(UsageType::Auto).with_fire_rate(0.5);
        let mut turret = Turret::new(Weapon::new(id(5), data), Muzzle::default());
        turret.aim_at(Vec3::new(0.0, 0.0, -10.0));

        assert!(turret.fire(&mut scheduler, &mut rng));
        assert!(turret.fire(&mut scheduler, &mut rng));
        let mut shots = 0;
        for _ in 0..4 {
            for key in scheduler.tick(0.5) {
                shots += turret.handle_timer(&key, &mut scheduler, &mut rng).map_or(0, |_| 1);
            }
        }
        assert_eq!(shots, 4);

        let fired: Vec<Vec3> = turret
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                WeaponEvent::Fired(shot) => Some(shot.forward()),
                _ => None,
            })
            .collect();
        assert_eq!(fired.len(), 4);
        assert!(fired.iter().all(|dir| dir.z < -0.99));

        turret.stop_fire(&mut scheduler);
        assert!(!turret.is_firing());
        assert!(scheduler.tick(1.0).is_empty());
    }

    #[test]
    fn test_turret_releases_when_empty() {
        let mut scheduler = Scheduler::new();
        let mut rng = StdRng::seed_from_u64(3);
        let data = WeaponData::default()
            .with_usage(UsageType::Auto)
            .with_fire_rate(0.5)
            .with_rounds(1);
        let mut turret = Turret::new(Weapon::new(id(6), data), Muzzle::default());
        turret.fire(&mut scheduler, &mut rng);
        for _ in 0..2 {
            for key in scheduler.tick(0.5) {
                turret.handle_timer(&key, &mut scheduler, &mut rng);
            }
        }
        turret.drain_events();
        assert!(!turret.is_firing());
        assert!(!turret.fire(&mut scheduler, &mut rng));
    }
}
