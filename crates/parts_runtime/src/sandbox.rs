//! Headless arena driving every gameplay crate
//!
//! One player with a rifle, a turret that opens fire when its sensor sees
//! the player, enemies from a spawner plus a patrolling sentry, a damage
//! zone, a heal zone and a few pickups. The game manager runs the level
//! flow through the scene loader; the audio manager plays cues on a
//! headless emitter pool.
//!
//! The player is driven by a small pilot: it walks toward the nearest
//! enemy, holds the trigger while one is in range, refills at an ammo
//! pickup when dry and retreats to the heal zone when hurt.

use crate::actor::{Actor, ActorDied, Turret};
use crate::config::SandboxConfig;
use glam::{Quat, Vec2, Vec3};
use parts_ai::{Sensor, SensorConfig, SensorShape, WaypointFollower, WaypointGraph};
use parts_audio::{
    AudioClip, AudioConfiguration, AudioCue, AudioManager, ClipGroup, CueRequest, MixerGroup, SequenceMode,
};
use parts_combat::{
    Ammo, AmmoData, AmmoEvent, Damageable, Health, Muzzle, Shot, UsageType, Weapon, WeaponData, WeaponEvent, Zone,
    ZoneEffect,
};
use parts_core::{look_rotation, EntityId, FixedTimestep, IdGenerator, Layer, Scheduler, UP};
use parts_event::{EventBus, EventChannel};
use parts_gamestate::{
    GameCommand, GameEvent, GameManager, HeadlessSceneHost, Lifetime, LoaderEvent, Prefs, PrefsError,
    SceneDescriptor, SceneKind, SceneLoader, SceneProgression, SpawnArea, SpawnRequest, Spawner, SpawnerConfig,
};
use parts_inventory::{CollectContext, CollectOutcome, Inventory, Item, ItemData, OnCollect, Pickup, PickupKind};
use parts_motion::{CharacterMotor, MoveInput, MoveMode};
use parts_physics::{
    ColliderDesc, PhysicsConfig, PhysicsError, PhysicsQuery, PhysicsWorld, QueryFilter, RigidBody,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use thiserror::Error;

pub const PLAYER_TAG: &str = "Player";
pub const ENEMY_TAG: &str = "Enemy";
pub const MAIN_MENU: &str = "MainMenu";

/// Cue names
const SHOT_CUE: &str = "shot";
const IMPACT_CUE: &str = "impact";
const PICKUP_CUE: &str = "pickup";
const EXPLOSION_CUE: &str = "explosion";
const LEVEL_MUSIC: &str = "level_theme";

/// Collider radius of the player and enemies
const BODY_RADIUS: f32 = 0.5;
/// Muzzle height above the player's center
const MUZZLE_HEIGHT: f32 = 0.5;
/// Health fraction below which the pilot heads for healing
const RETREAT_HEALTH: f32 = 0.4;
/// How close the pilot walks to pickups and zones
const ARRIVE_DISTANCE: f32 = 0.2;

/// Sandbox setup errors
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("physics error: {0}")]
    Physics(#[from] PhysicsError),

    #[error("prefs error: {0}")]
    Prefs(#[from] PrefsError),
}

pub type Result<T> = std::result::Result<T, SandboxError>;

/// Numbers reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SandboxSummary {
    pub elapsed: f32,
    pub score: i32,
    pub high_score: i32,
    /// Rounds the player fired
    pub shots: u32,
    pub kills: u32,
    pub player_deaths: u32,
    pub player_health: f32,
    pub pickups: u32,
    /// Scene active at the end
    pub scene: Option<String>,
    /// 1-based level number
    pub level: usize,
}

impl SandboxSummary {
    pub fn log(&self) {
        log::info!("Sandbox summary after {:.1}s:", self.elapsed);
        log::info!("  Scene: {} (level {})", self.scene.as_deref().unwrap_or("none"), self.level);
        log::info!("  Score: {} (high score {})", self.score, self.high_score);
        log::info!("  Shots: {}, kills: {}", self.shots, self.kills);
        log::info!("  Player health: {:.1}, deaths: {}", self.player_health, self.player_deaths);
        log::info!("  Pickups collected: {}", self.pickups);
    }
}

/// Tallies kept by bus subscribers
#[derive(Debug, Default)]
struct Counters {
    kills: AtomicU32,
    player_deaths: AtomicU32,
}

/// Where the pilot is heading and how close it needs to get
#[derive(Debug, Clone, Copy)]
struct Goal {
    position: Vec3,
    stop_distance: f32,
}

pub struct Sandbox {
    config: SandboxConfig,
    ids: IdGenerator,
    rng: StdRng,
    world: PhysicsWorld,
    scheduler: Scheduler,
    clock: FixedTimestep,
    bus: EventBus,
    counters: Arc<Counters>,

    player: EntityId,
    motor: CharacterMotor,
    input: MoveInput,
    inventory: Inventory,
    muzzle: Muzzle,
    trigger_held: bool,
    player_spawned: bool,

    actors: HashMap<EntityId, Actor>,
    turret: Turret,
    sensor: Sensor,
    zones: Vec<Zone>,
    pickups: BTreeMap<EntityId, Pickup>,
    rounds: Vec<Ammo>,
    spawner: Spawner,
    debris: BTreeMap<EntityId, Lifetime>,
    patrol: WaypointGraph,
    patrollers: BTreeMap<EntityId, WaypointFollower>,

    audio: AudioManager,
    cues: EventChannel<CueRequest>,
    music: Option<String>,

    game: GameManager,
    commands: EventChannel<GameCommand>,
    loader: SceneLoader,
    host: HeadlessSceneHost,

    shots: u32,
    collected: u32,
    level_kills: u32,
    elapsed: f32,
}

impl Sandbox {
    /// Build the arena and queue the start of the game
    pub fn new(config: SandboxConfig) -> Result<Self> {
        let ids = IdGenerator::new();
        let mut rng = StdRng::seed_from_u64(config.sandbox.seed);
        let mut scheduler = Scheduler::new();
        let mut world = PhysicsWorld::new(PhysicsConfig {
            timestep: config.sandbox.fixed_step,
            ..Default::default()
        });

        world.insert(
            ids.next(),
            ColliderDesc::cuboid(Vec3::new(40.0, 0.5, 40.0))
                .with_position(Vec3::new(0.0, -0.5, 0.0))
                .with_layer(Layer::ENVIRONMENT),
        )?;

        // Player; the collider is added when the game spawns it
        let player = ids.next();
        let motor = CharacterMotor::new(player, config.player.mode, config.motion_config())
            .with_position(config.player.spawn_point);
        let rifle = ItemData::new("rifle", "Rifle")
            .with_pickup_prefab("rifle_pickup")
            .with_weapon(config.weapon_data());
        let inventory = Inventory::new(player).with_starting_items([Item::from_data(ids.next(), rifle)], &mut scheduler);

        let mut actors = HashMap::new();
        actors.insert(player, Actor::new(Health::new(config.player.max_health)));

        // Turret guarding the far side
        let turret_base = ids.next();
        let turret_position = Vec3::new(8.0, 1.0, 12.0);
        world.insert(
            turret_base,
            ColliderDesc::cuboid(Vec3::splat(0.5))
                .with_position(turret_position)
                .with_layer(Layer::ENVIRONMENT)
                .with_tag("Turret"),
        )?;
        let cannon = WeaponData {
            name: "Turret".to_string(),
            ..Default::default()
        }
        .with_usage(UsageType::Auto)
        .with_fire_rate(0.8)
        .with_ammo(
            AmmoData::projectile(25.0)
                .with_damage(8.0)
                .with_mask(Layer::PLAYER.mask())
                .with_lifetime(2.0),
        );
        let turret = Turret::new(
            Weapon::new(ids.next(), cannon).with_owner(turret_base),
            Muzzle::new(turret_position + Vec3::Y * 0.75, Quat::IDENTITY),
        );
        let mut sensor = Sensor::new(
            ids.next(),
            SensorShape::OverlapSphere { radius: 12.0 },
            SensorConfig::default()
                .with_tag(PLAYER_TAG)
                .with_mask(Layer::PLAYER.mask())
                .with_rate(0.25),
        )
        .with_owner(turret_base);
        sensor.enable(&mut scheduler);

        let zones = vec![
            Zone::new(ids.next(), Vec3::new(-4.0, 1.0, 8.0), 2.0, ZoneEffect::damage()),
            Zone::new(ids.next(), Vec3::new(-8.0, 1.0, -4.0), 2.5, ZoneEffect::heal()),
        ];

        let mut pickups = BTreeMap::new();
        let placements = [
            (Pickup::new(PickupKind::health()), Vec3::new(-8.0, 0.5, -4.0)),
            (Pickup::new(PickupKind::ammo("rifle")), Vec3::new(4.0, 0.5, -6.0)),
            (
                Pickup::new(PickupKind::points()).destroy_on_collect(),
                Vec3::new(0.0, 0.5, 4.0),
            ),
        ];
        for (pickup, position) in placements {
            let id = ids.next();
            world.insert(
                id,
                ColliderDesc::sphere(0.5)
                    .with_position(position)
                    .with_layer(Layer::PICKUPS)
                    .as_trigger(),
            )?;
            pickups.insert(id, pickup.with_effect("sparkle"));
        }

        let mut spawner = Spawner::new(
            ids.next(),
            SpawnArea::Box {
                center: Vec3::new(0.0, 1.0, 18.0),
                half_extents: Vec3::new(10.0, 0.0, 4.0),
            },
            SpawnerConfig::default()
                .with_prefab("grunt")
                .with_prefab("brute")
                .with_interval(2.0, 4.0)
                .with_max_spawned(Some(4))
                .with_overlap(1.0, Layer::ENEMIES.mask()),
        );
        spawner.start(&mut scheduler, &mut rng);

        let patrol = WaypointGraph::ring(&[
            Vec3::new(-6.0, 1.0, 22.0),
            Vec3::new(6.0, 1.0, 22.0),
            Vec3::new(6.0, 1.0, 26.0),
            Vec3::new(-6.0, 1.0, 26.0),
        ]);

        let prefs = match &config.sandbox.prefs_path {
            Some(path) => Prefs::open(path, config.sandbox.prefs_format)?,
            None => Prefs::new(),
        }
        .shared();

        let cues = EventChannel::new();
        let mut audio =
            AudioManager::new(prefs.clone(), cues.clone()).with_max_emitters(config.audio.max_emitters);
        register_cues(&mut audio);
        if let Some(volume) = config.audio.master_volume {
            audio.mixer_mut().set_group_volume(MixerGroup::Master, volume);
        }

        let levels = config
            .sandbox
            .levels
            .iter()
            .map(|name| SceneDescriptor::level(name.clone()).with_music(LEVEL_MUSIC))
            .collect();
        let commands = EventChannel::new();
        let mut game = GameManager::new(ids.next(), prefs, SceneProgression::new(levels), commands.clone())
            .with_main_menu(MAIN_MENU);
        game.resolve_scene(MAIN_MENU);
        let host = HeadlessSceneHost::new(std::iter::once(MAIN_MENU.to_string()).chain(config.sandbox.levels.clone()))
            .with_load_time(0.5);

        let mut bus = EventBus::new();
        let counters = Arc::new(Counters::default());
        {
            let counters = counters.clone();
            let commands = commands.clone();
            bus.subscribe::<ActorDied, _>(move |death| {
                if death.actor == player {
                    counters.player_deaths.fetch_add(1, Ordering::Relaxed);
                    commands.send(GameCommand::PlayerDied(player));
                } else {
                    counters.kills.fetch_add(1, Ordering::Relaxed);
                }
            });
        }
        {
            let cues = cues.clone();
            bus.subscribe::<ActorDied, _>(move |death| {
                if death.debris.is_some() {
                    cues.send(CueRequest::new(EXPLOSION_CUE).at(death.position));
                }
            });
        }

        let mut sandbox = Self {
            clock: FixedTimestep::new(config.sandbox.fixed_step),
            config,
            ids,
            rng,
            world,
            scheduler,
            bus,
            counters,
            player,
            motor,
            input: MoveInput::default(),
            inventory,
            muzzle: Muzzle::default(),
            trigger_held: false,
            player_spawned: false,
            actors,
            turret,
            sensor,
            zones,
            pickups,
            rounds: Vec::new(),
            spawner,
            debris: BTreeMap::new(),
            patrol,
            patrollers: BTreeMap::new(),
            audio,
            cues,
            music: None,
            game,
            commands,
            loader: SceneLoader::new(),
            host,
            shots: 0,
            collected: 0,
            level_kills: 0,
            elapsed: 0.0,
        };

        sandbox.place_enemies();
        sandbox.commands.send(GameCommand::StartGame);
        Ok(sandbox)
    }

    pub fn player(&self) -> EntityId {
        self.player
    }

    pub fn is_player_spawned(&self) -> bool {
        self.player_spawned
    }

    pub fn player_position(&self) -> Vec3 {
        self.motor.position()
    }

    pub fn player_health(&self) -> f32 {
        self.actors.get(&self.player).map_or(0.0, |a| a.current_health())
    }

    /// Actor by id, for scripted damage and inspection
    pub fn actor_mut(&mut self, id: EntityId) -> Option<&mut Actor> {
        self.actors.get_mut(&id)
    }

    /// Living enemies
    pub fn enemy_count(&self) -> usize {
        self.actors.len() - 1
    }

    /// Ids of the living enemies in spawn order
    pub fn enemies(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.actors.keys().copied().filter(|id| *id != self.player).collect();
        ids.sort();
        ids
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn game(&self) -> &GameManager {
        &self.game
    }

    pub fn audio(&self) -> &AudioManager {
        &self.audio
    }

    /// Command inbox of the game manager
    pub fn commands(&self) -> EventChannel<GameCommand> {
        self.commands.clone()
    }

    pub fn active_scene(&self) -> Option<&str> {
        self.host.active()
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    fn player_alive(&self) -> bool {
        self.player_spawned && self.player_health() > 0.0
    }

    /// Run for the configured duration and report
    pub fn run(&mut self) -> SandboxSummary {
        let tick = self.config.sandbox.tick.max(1e-4);
        let steps = (self.config.sandbox.duration / tick).ceil() as u32;
        log::info!("Running {} ticks", steps);
        for _ in 0..steps {
            self.tick(tick);
        }

        if let Err(e) = self.audio.mixer().save() {
            log::warn!("failed to save volume levels: {}", e);
        }
        self.summary()
    }

    pub fn summary(&self) -> SandboxSummary {
        SandboxSummary {
            elapsed: self.elapsed,
            score: self.game.score().get(),
            high_score: self.game.high_score().get(),
            shots: self.shots,
            kills: self.counters.kills.load(Ordering::Relaxed),
            player_deaths: self.counters.player_deaths.load(Ordering::Relaxed),
            player_health: self.player_health(),
            pickups: self.collected,
            scene: self.host.active().map(str::to_string),
            level: self.game.progression().current_level_number(),
        }
    }

    /// Advance one variable-rate frame
    pub fn tick(&mut self, dt: f32) {
        self.elapsed += dt;
        self.run_game_flow(dt);

        if !self.game.is_paused() {
            self.step_physics(dt);
            self.drive_player(dt);
            self.run_timers(dt);
            self.collect_shots();
            self.update_rounds(dt);
            self.update_enemies(dt);
            self.poll_zones();
            self.collect_pickups();
            self.resolve_deaths();
            self.bus.process();
        }

        self.audio.process(&mut self.rng);
        self.audio.tick(dt);
    }

    fn run_game_flow(&mut self, dt: f32) {
        self.game.process(&mut self.scheduler);
        self.route_game_events();

        self.loader.tick(dt, &mut self.host);
        for event in self.loader.drain_events() {
            match event {
                LoaderEvent::LoadStarted(name) => log::info!("Loading {}", name),
                LoaderEvent::LoadDone(name) => self.on_scene_loaded(&name),
                LoaderEvent::FadeOut | LoaderEvent::FadeIn => {}
            }
        }
    }

    fn route_game_events(&mut self) {
        for event in self.game.drain_events() {
            match event {
                GameEvent::LoadScene(name) => {
                    if let Err(e) = self.loader.load(&name, &self.host) {
                        log::debug!("load of {} refused: {}", name, e);
                    }
                }
                GameEvent::PauseChanged(paused) => self.audio.set_paused(paused),
                GameEvent::SpawnPlayer => self.spawn_player(),
                GameEvent::DespawnPlayer(_) => self.despawn_player(),
                GameEvent::HighScore(score) => log::info!("New high score: {}", score),
            }
        }
    }

    fn on_scene_loaded(&mut self, name: &str) {
        let scene = self
            .game
            .progression()
            .levels()
            .iter()
            .find(|level| level.name == name)
            .cloned();
        let kind = scene.as_ref().map_or(SceneKind::Menu, |s| s.kind);
        let music = scene.and_then(|s| s.music);

        if self.music != music {
            if let Some(old) = self.music.take() {
                self.audio.finish_cue(&old);
            }
            if let Some(cue) = &music {
                self.cues
                    .send(CueRequest::new(cue.clone()).with_config(AudioConfiguration::music()));
            }
            self.music = music;
        }

        self.level_kills = 0;
        if kind != SceneKind::Level && self.player_spawned {
            self.despawn_player();
        }
        self.commands.send(GameCommand::SceneReady(kind));
    }

    fn spawn_player(&mut self) {
        let spawn = self.config.player.spawn_point;
        self.motor.teleport(spawn);
        if let Some(actor) = self.actors.get_mut(&self.player) {
            actor.health.reset();
        }

        let mut desc = ColliderDesc::sphere(BODY_RADIUS)
            .with_position(spawn)
            .with_layer(Layer::PLAYER)
            .with_tag(PLAYER_TAG);
        if self.motor.mode == MoveMode::Physics {
            desc = desc.with_body(RigidBody::dynamic(1.0));
        }
        self.world.remove(self.player);
        if let Err(e) = self.world.insert(self.player, desc) {
            log::error!("failed to spawn player: {}", e);
            return;
        }
        self.player_spawned = true;
        log::info!("Player spawned at {}", spawn);
    }

    fn despawn_player(&mut self) {
        self.release_trigger();
        self.world.remove(self.player);
        self.player_spawned = false;
    }

    fn release_trigger(&mut self) {
        if self.trigger_held {
            self.inventory.stop_use_current(&mut self.scheduler);
            self.trigger_held = false;
        }
    }

    fn step_physics(&mut self, dt: f32) {
        let step = self.clock.step;
        for _ in 0..self.clock.advance(dt) {
            self.world.step(step);
            if self.player_alive() {
                self.motor
                    .fixed_update(step, &mut self.input, Quat::IDENTITY, &mut self.world);
            }
        }
    }

    fn drive_player(&mut self, dt: f32) {
        if !self.player_alive() {
            self.input = MoveInput::default();
            self.release_trigger();
            return;
        }

        let position = self.motor.position();
        self.input.movement = match self.pick_goal(position) {
            Some(goal) => {
                let to = goal.position - position;
                let flat = Vec2::new(to.x, to.z);
                if flat.length() > goal.stop_distance {
                    flat.normalize()
                } else {
                    Vec2::ZERO
                }
            }
            None => Vec2::ZERO,
        };
        self.motor
            .update(dt, &mut self.input, Quat::IDENTITY, &mut self.world);
        if self.motor.mode != MoveMode::Physics {
            if let Err(e) = self.world.set_position(self.player, self.motor.position()) {
                log::warn!("player collider out of sync: {}", e);
            }
        }

        let origin = self.motor.position() + Vec3::Y * MUZZLE_HEIGHT;
        let range = self.config.weapon.range;
        let target = self
            .nearest_enemy(self.motor.position())
            .filter(|target| target.distance(origin) <= range);

        match target {
            Some(target) => {
                self.muzzle = Muzzle::new(origin, look_rotation(target - origin, UP));
                if !self.trigger_held {
                    let continuous = self
                        .inventory
                        .current_item()
                        .and_then(|item| item.weapon())
                        .map_or(false, |w| w.data.usage.is_continuous());
                    let pressed = self.inventory.use_current(&mut self.scheduler, &self.muzzle, &mut self.rng);
                    self.trigger_held = pressed && continuous;
                }
            }
            None => {
                self.muzzle = Muzzle::new(origin, self.motor.rotation());
                self.release_trigger();
            }
        }
    }

    fn pick_goal(&self, position: Vec3) -> Option<Goal> {
        let hurt = self
            .actors
            .get(&self.player)
            .map_or(false, |a| a.health_percent() < RETREAT_HEALTH);
        if hurt {
            let heal = self
                .zones
                .iter()
                .find(|zone| matches!(zone.effect, ZoneEffect::Heal { .. }));
            if let Some(zone) = heal {
                return Some(Goal {
                    position: zone.center,
                    stop_distance: ARRIVE_DISTANCE,
                });
            }
        }

        let dry = self
            .inventory
            .current_item()
            .and_then(|item| item.weapon())
            .map_or(false, |w| w.data.max_rounds > 0 && w.ammo() == 0);
        if dry {
            let refill = self
                .pickups
                .iter()
                .filter(|(_, p)| p.is_active() && matches!(p.kind, PickupKind::Ammo { .. }))
                .filter_map(|(id, _)| self.world.position_of(*id))
                .min_by(|a, b| a.distance_squared(position).total_cmp(&b.distance_squared(position)));
            if let Some(refill) = refill {
                return Some(Goal {
                    position: refill,
                    stop_distance: ARRIVE_DISTANCE,
                });
            }
        }

        self.nearest_enemy(position).map(|enemy| Goal {
            position: enemy,
            stop_distance: self.config.player.engage_distance,
        })
    }

    fn nearest_enemy(&self, position: Vec3) -> Option<Vec3> {
        self.actors
            .iter()
            .filter(|(id, actor)| **id != self.player && actor.is_alive())
            .filter_map(|(id, _)| self.world.position_of(*id))
            .min_by(|a, b| a.distance_squared(position).total_cmp(&b.distance_squared(position)))
    }

    fn run_timers(&mut self, dt: f32) {
        for key in self.scheduler.tick(dt) {
            if self.game.handle_timer(&key) {
                continue;
            }
            self.inventory
                .handle_timer(&key, &mut self.scheduler, &self.muzzle, &mut self.rng);
            self.turret.handle_timer(&key, &mut self.scheduler, &mut self.rng);
            self.sensor
                .handle_timer(&key, &self.world, self.turret.muzzle.position, self.turret.muzzle.rotation);

            for zone in &mut self.zones {
                if zone.handle_timer(&key, &mut self.scheduler, &mut self.actors) {
                    break;
                }
            }

            let actors = &self.actors;
            let request = self.spawner.handle_timer(
                &key,
                &mut self.scheduler,
                &self.world,
                &mut self.rng,
                |entity| actors.contains_key(&entity),
            );
            if let Some(request) = request {
                if let Some(id) = self.spawn_enemy(&request) {
                    self.spawner.track(id);
                }
            }

            let expired = self
                .debris
                .get_mut(&key.owner)
                .and_then(|lifetime| lifetime.handle_timer(&key));
            if expired.is_some() {
                self.debris.remove(&key.owner);
            }
        }
    }

    fn collect_shots(&mut self) {
        let mut shots: Vec<Shot> = Vec::new();
        let mut emptied = false;
        for event in self.inventory.drain_events() {
            log::debug!("inventory: {:?}", event);
        }
        let player_events: Vec<WeaponEvent> = self
            .inventory
            .items_mut()
            .flat_map(|item| item.drain_events())
            .collect();
        for event in player_events {
            match event {
                WeaponEvent::Fired(shot) => shots.push(shot),
                WeaponEvent::Empty => emptied = true,
                _ => {}
            }
        }
        for event in self.turret.drain_events() {
            if let WeaponEvent::Fired(shot) = event {
                shots.push(shot);
            }
        }
        if emptied {
            log::debug!("player magazine empty");
            self.trigger_held = false;
        }

        let gravity = self.world.config().gravity;
        for shot in shots {
            if shot.owner == self.player {
                self.shots += 1;
            }
            self.cues.send(CueRequest::new(SHOT_CUE).at(shot.origin));
            self.rounds.push(Ammo::spawn(self.ids.next(), &shot).with_gravity(gravity));
        }
    }

    fn update_rounds(&mut self, dt: f32) {
        for round in &mut self.rounds {
            round.update(dt, &self.world, &mut self.actors);
            for event in round.drain_events() {
                if let AmmoEvent::Impact { point, .. } = event {
                    self.cues.send(CueRequest::new(IMPACT_CUE).at(point));
                }
            }
        }
        self.rounds.retain(|round| !round.is_finished());
    }

    fn update_enemies(&mut self, dt: f32) {
        for (id, follower) in &mut self.patrollers {
            let Some(position) = self.world.position_of(*id) else {
                continue;
            };
            let next = follower.tick(dt, position, &self.patrol, &mut self.rng);
            if let Err(e) = self.world.set_position(*id, next) {
                log::warn!("patrol move failed: {}", e);
            }
        }

        let sees_player = self.player_alive() && self.sensor.has_sensed(self.player);
        if sees_player {
            self.turret.aim_at(self.motor.position());
            self.turret.fire(&mut self.scheduler, &mut self.rng);
        } else if self.turret.is_firing() {
            self.turret.stop_fire(&mut self.scheduler);
        }
    }

    fn poll_zones(&mut self) {
        for zone in &mut self.zones {
            zone.poll(&self.world, &mut self.scheduler, &mut self.actors);
            for event in zone.drain_events() {
                log::trace!("zone {}: {:?}", zone.id(), event);
            }
        }
    }

    fn collect_pickups(&mut self) {
        if !self.player_alive() {
            return;
        }

        let mut touching = Vec::new();
        let filter = QueryFilter::mask(Layer::PICKUPS.mask()).with_triggers();
        self.world
            .overlap_sphere(self.motor.position(), BODY_RADIUS, &filter, &mut touching);

        for id in touching {
            let Some(pickup) = self.pickups.get_mut(&id) else {
                continue;
            };
            let outcome = pickup.try_collect(CollectContext {
                tag: Some(PLAYER_TAG),
                health: self
                    .actors
                    .get_mut(&self.player)
                    .map(|actor| actor as &mut dyn Damageable),
                inventory: Some(&mut self.inventory),
                scheduler: &mut self.scheduler,
                new_item_id: self.ids.next(),
            });

            let CollectOutcome::Collected { points, despawn, .. } = outcome else {
                continue;
            };
            self.collected += 1;
            if let Some(points) = points {
                self.commands.send(GameCommand::AddScore(points));
            }
            if let Some(position) = self.world.position_of(id) {
                self.cues.send(CueRequest::new(PICKUP_CUE).at(position));
            }
            match despawn {
                OnCollect::Destroy => {
                    self.world.remove(id);
                    self.pickups.remove(&id);
                }
                OnCollect::Deactivate => {
                    if let Err(e) = self.world.set_enabled(id, false) {
                        log::warn!("failed to hide pickup: {}", e);
                    }
                }
            }
        }
    }

    fn resolve_deaths(&mut self) {
        let mut ids: Vec<EntityId> = self.actors.keys().copied().collect();
        ids.sort();

        let mut deaths = Vec::new();
        for id in ids {
            let position = if id == self.player {
                self.motor.position()
            } else {
                self.world.position_of(id).unwrap_or_default()
            };
            if let Some(actor) = self.actors.get_mut(&id) {
                if let Some(death) = actor.react(id, position, &self.bus, &self.commands) {
                    deaths.push(death);
                }
            }
        }

        for death in deaths {
            if death.actor == self.player {
                log::info!("Player died");
                self.release_trigger();
                continue;
            }

            self.actors.remove(&death.actor);
            self.patrollers.remove(&death.actor);
            if death.destroy {
                self.world.remove(death.actor);
            } else if let Err(e) = self.world.set_enabled(death.actor, false) {
                log::warn!("failed to disable corpse: {}", e);
            }
            if let Some(prefab) = &death.debris {
                self.spawn_debris(prefab, death.position);
            }

            self.level_kills += 1;
            if self.level_kills == self.config.sandbox.kills_per_level {
                log::info!("Level cleared");
                self.commands.send(GameCommand::NextLevel);
            }
        }
    }

    /// Put the sentry on its patrol and fill the arena up to the configured
    /// enemy count
    fn place_enemies(&mut self) {
        let start = self.patrol.get(0).map(|node| node.position);
        if let Some(position) = start {
            let request = SpawnRequest {
                prefab: "sentry".to_string(),
                position,
                rotation: Quat::IDENTITY,
            };
            if let Some(id) = self.spawn_enemy(&request) {
                let mut follower = WaypointFollower::default().with_speed(2.0);
                follower.start(&self.patrol, position);
                self.patrollers.insert(id, follower);
            }
        }

        for _ in 0..self.config.sandbox.enemies {
            let Some(request) = self.spawner.try_spawn(&self.world, &mut self.rng) else {
                break;
            };
            if let Some(id) = self.spawn_enemy(&request) {
                self.spawner.track(id);
            }
        }
    }

    fn spawn_enemy(&mut self, request: &SpawnRequest) -> Option<EntityId> {
        let (health, points) = match request.prefab.as_str() {
            "brute" => (120.0, 25),
            "sentry" => (80.0, 15),
            _ => (50.0, 10),
        };

        let id = self.ids.next();
        let desc = ColliderDesc::sphere(BODY_RADIUS)
            .with_position(request.position)
            .with_layer(Layer::ENEMIES)
            .with_tag(ENEMY_TAG);
        if let Err(e) = self.world.insert(id, desc) {
            log::error!("failed to spawn {}: {}", request.prefab, e);
            return None;
        }

        let actor = Actor::new(Health::new(health).with_destroy_on_death())
            .with_points(points)
            .with_debris("debris");
        self.actors.insert(id, actor);
        log::debug!("{} {} at {}", request.prefab, id, request.position);
        Some(id)
    }

    fn spawn_debris(&mut self, prefab: &str, position: Vec3) {
        let id = self.ids.next();
        let mut lifetime = Lifetime::new(id, 2.0).with_range(1.5, 2.5);
        lifetime.start(&mut self.scheduler, &mut self.rng);
        self.debris.insert(id, lifetime);
        log::trace!("{} {} at {}", prefab, id, position);
    }
}

/// Cue library of the arena
fn register_cues(audio: &mut AudioManager) {
    audio.register_cue(AudioCue::new(SHOT_CUE).with_group(ClipGroup::new(
        vec![
            AudioClip::new("shot_a", 0.3),
            AudioClip::new("shot_b", 0.3),
            AudioClip::new("shot_c", 0.3),
        ],
        SequenceMode::RandomNoImmediateRepeat,
    )));
    audio.register_cue(AudioCue::new(IMPACT_CUE).with_group(ClipGroup::new(
        vec![AudioClip::new("impact_a", 0.2), AudioClip::new("impact_b", 0.2)],
        SequenceMode::Random,
    )));
    audio.register_cue(AudioCue::new(PICKUP_CUE).with_group(ClipGroup::single(AudioClip::new("pickup", 0.5))));
    audio.register_cue(
        AudioCue::new(EXPLOSION_CUE)
            .with_group(ClipGroup::single(AudioClip::new("blast", 1.2)))
            .with_group(ClipGroup::new(
                vec![AudioClip::new("debris_a", 0.8), AudioClip::new("debris_b", 0.8)],
                SequenceMode::Sequential,
            )),
    );
    audio.register_cue(
        AudioCue::new(LEVEL_MUSIC)
            .with_group(ClipGroup::single(AudioClip::new("theme", 30.0)))
            .looping(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn sandbox() -> Sandbox {
        Sandbox::new(SandboxConfig::default()).unwrap()
    }

    /// Tick until `done` holds or `seconds` run out
    fn run_until(sandbox: &mut Sandbox, seconds: f32, done: impl Fn(&Sandbox) -> bool) -> bool {
        let mut t = 0.0;
        while t < seconds {
            sandbox.tick(DT);
            if done(sandbox) {
                return true;
            }
            t += DT;
        }
        false
    }

    #[test]
    fn test_enemies_placed_at_start() {
        let sandbox = sandbox();
        // Sentry plus the configured three
        assert_eq!(sandbox.enemy_count(), 4);
        assert!(!sandbox.is_player_spawned());
        for id in sandbox.enemies() {
            assert!(sandbox.world().contains(id));
        }
    }

    #[test]
    fn test_player_spawns_after_level_load() {
        let mut sandbox = sandbox();
        assert!(run_until(&mut sandbox, 3.0, |s| s.is_player_spawned()));
        assert_eq!(sandbox.active_scene(), Some("Arena1"));
        assert_eq!(sandbox.game().progression().current_level_number(), 1);
        assert_eq!(sandbox.player_health(), 100.0);
        assert!(sandbox.world().contains(sandbox.player()));

        // Level music started with the scene
        sandbox.tick(DT);
        assert!(sandbox
            .audio()
            .pool()
            .iter()
            .any(|(_, e)| e.is_busy() && e.cue() == Some(LEVEL_MUSIC)));
    }

    #[test]
    fn test_enemy_death_scores_and_explodes() {
        let mut sandbox = sandbox();
        let enemy = sandbox.enemies()[0];
        let points = sandbox.actor_mut(enemy).map(|a| a.points).unwrap();
        assert!(points > 0);

        sandbox.actor_mut(enemy).unwrap().take_damage(1000.0);
        sandbox.tick(DT);
        assert_eq!(sandbox.summary().kills, 1);
        assert!(!sandbox.world().contains(enemy));
        assert_eq!(sandbox.enemy_count(), 3);
        assert!(sandbox
            .audio()
            .pool()
            .iter()
            .any(|(_, e)| e.cue() == Some(EXPLOSION_CUE)));

        // Score is applied when the game handles its inbox
        sandbox.tick(DT);
        assert_eq!(sandbox.game().score().get(), points);
        assert_eq!(sandbox.game().high_score().get(), points);
    }

    #[test]
    fn test_player_death_respawns() {
        let mut sandbox = sandbox();
        assert!(run_until(&mut sandbox, 3.0, |s| s.is_player_spawned()));

        let player = sandbox.player();
        sandbox.actor_mut(player).unwrap().take_damage(1000.0);
        sandbox.tick(DT);
        assert_eq!(sandbox.summary().player_deaths, 1);
        assert_eq!(sandbox.player_health(), 0.0);

        assert!(run_until(&mut sandbox, 3.0, |s| s.player_health() > 0.0));
        assert_eq!(sandbox.player_health(), 100.0);
        assert!(sandbox.world().contains(player));
        assert_eq!(sandbox.summary().player_deaths, 1);
    }

    #[test]
    fn test_pause_freezes_simulation() {
        let mut sandbox = sandbox();
        assert!(run_until(&mut sandbox, 3.0, |s| s.is_player_spawned()));

        sandbox.commands().send(GameCommand::TogglePause);
        sandbox.tick(DT);
        assert!(sandbox.game().is_paused());

        let position = sandbox.player_position();
        let shots = sandbox.summary().shots;
        for _ in 0..120 {
            sandbox.tick(DT);
        }
        assert_eq!(sandbox.player_position(), position);
        assert_eq!(sandbox.summary().shots, shots);

        sandbox.commands().send(GameCommand::TogglePause);
        assert!(run_until(&mut sandbox, 2.0, |s| s.player_position() != position));
    }

    #[test]
    fn test_player_engages_enemies() {
        let mut sandbox = sandbox();
        assert!(run_until(&mut sandbox, 10.0, |s| s.summary().shots > 0));
        assert!(run_until(&mut sandbox, 10.0, |s| s.summary().kills > 0));
    }
}
