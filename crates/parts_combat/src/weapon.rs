//! Weapon firing state machine

use crate::ammo::AmmoData;
use glam::{EulerRot, Quat, Vec3};
use parts_core::{EntityId, Scheduler, TimerKey};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Timer purpose for the single-shot cooldown
pub const COOLDOWN: &str = "cooldown";
/// Timer purpose for the automatic fire loop
pub const AUTO_FIRE: &str = "auto_fire";

/// How holding the trigger behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsageType {
    /// One shot per press
    Single,
    /// Keeps firing while held
    Auto,
    /// One shot per press, grouped with the single-shot cooldown
    Burst,
    /// Continuous output while held (flamethrower, beam)
    Stream,
}

impl Default for UsageType {
    fn default() -> Self {
        Self::Single
    }
}

impl UsageType {
    /// Check if the mode fires from a repeating loop
    pub fn is_continuous(self) -> bool {
        matches!(self, Self::Auto | Self::Stream)
    }
}

/// Weapon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponData {
    /// Display name
    pub name: String,
    /// Trigger behaviour
    pub usage: UsageType,
    /// Seconds between shots
    pub fire_rate: f32,
    /// Random spread per axis in degrees
    pub spread: Vec3,
    /// Magazine size (0 = infinite)
    pub max_rounds: u32,
    /// Animation trigger that must cue the actual shot
    pub anim_trigger: Option<String>,
    /// Animation bool held while equipped
    pub anim_equip: Option<String>,
    /// What each shot spawns
    pub ammo: AmmoData,
}

impl Default for WeaponData {
    fn default() -> Self {
        Self {
            name: String::from("Weapon"),
            usage: UsageType::Single,
            fire_rate: 0.5,
            spread: Vec3::splat(0.1),
            max_rounds: 0,
            anim_trigger: None,
            anim_equip: None,
            ammo: AmmoData::default(),
        }
    }
}

impl WeaponData {
    /// Set the usage type
    pub fn with_usage(mut self, usage: UsageType) -> Self {
        self.usage = usage;
        self
    }

    /// Set the time between shots
    pub fn with_fire_rate(mut self, fire_rate: f32) -> Self {
        self.fire_rate = fire_rate;
        self
    }

    /// Set the magazine size
    pub fn with_rounds(mut self, rounds: u32) -> Self {
        self.max_rounds = rounds;
        self
    }

    /// Set the spread in degrees
    pub fn with_spread(mut self, spread: Vec3) -> Self {
        self.spread = spread;
        self
    }

    /// Require an animation cue for each shot
    pub fn with_anim_trigger(mut self, name: impl Into<String>) -> Self {
        self.anim_trigger = Some(name.into());
        self
    }

    /// Set the ammo
    pub fn with_ammo(mut self, ammo: AmmoData) -> Self {
        self.ammo = ammo;
        self
    }
}

/// Where shots leave the weapon
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Muzzle {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Muzzle {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }
}

impl Default for Muzzle {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Quat::IDENTITY)
    }
}

/// A fired round, ready to be spawned as an `Ammo`
#[derive(Debug, Clone)]
pub struct Shot {
    /// Weapon that fired
    pub weapon: EntityId,
    /// Root of the wielder, excluded from hits
    pub owner: EntityId,
    pub origin: Vec3,
    /// Muzzle rotation with spread applied
    pub rotation: Quat,
    pub ammo: AmmoData,
}

impl Shot {
    /// Direction the round travels
    pub fn forward(&self) -> Vec3 {
        self.rotation * parts_core::FORWARD
    }
}

/// Events emitted by a weapon
#[derive(Debug, Clone)]
pub enum WeaponEvent {
    /// A round left the muzzle
    Fired(Shot),
    /// Play the fire animation; the shot waits for `on_anim_fire_cue`
    AnimTrigger(String),
    /// Set an animation bool
    AnimBool { name: String, value: bool },
    /// Tried to fire with an empty magazine
    Empty,
    /// Cooldown finished
    Ready,
}

/// Weapon instance
#[derive(Debug, Clone)]
pub struct Weapon {
    id: EntityId,
    owner: EntityId,
    /// Configuration
    pub data: WeaponData,
    ammo: u32,
    ready: bool,
    equipped: bool,
    events: Vec<WeaponEvent>,
}

impl Weapon {
    /// Create an unequipped weapon with a full magazine
    pub fn new(id: EntityId, data: WeaponData) -> Self {
        let ammo = data.max_rounds;
        Self {
            id,
            owner: EntityId::NULL,
            data,
            ammo,
            ready: false,
            equipped: false,
            events: Vec::new(),
        }
    }

    /// Set who is holding the weapon
    pub fn with_owner(mut self, owner: EntityId) -> Self {
        self.owner = owner;
        self
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn owner(&self) -> EntityId {
        self.owner
    }

    pub fn set_owner(&mut self, owner: EntityId) {
        self.owner = owner;
    }

    /// Rounds left in the magazine
    pub fn ammo(&self) -> u32 {
        self.ammo
    }

    pub fn is_equipped(&self) -> bool {
        self.equipped
    }

    fn has_ammo(&self) -> bool {
        self.data.max_rounds == 0 || self.ammo > 0
    }

    /// Ready to accept a `use_weapon`
    pub fn is_ready(&self) -> bool {
        self.ready && self.has_ammo()
    }

    /// Finite magazine that is not full
    pub fn needs_ammo(&self) -> bool {
        self.data.max_rounds > 0 && self.ammo < self.data.max_rounds
    }

    /// Add rounds, capped at the magazine size
    pub fn add_ammo(&mut self, amount: u32) {
        self.ammo = self.ammo.saturating_add(amount).min(self.data.max_rounds);
    }

    fn key(&self, purpose: &'static str) -> TimerKey {
        TimerKey::new(self.id, purpose)
    }

    /// Take the weapon in hand
    pub fn equip(&mut self) {
        self.equipped = true;
        self.ready = true;
        if let Some(name) = &self.data.anim_equip {
            self.events.push(WeaponEvent::AnimBool {
                name: name.clone(),
                value: true,
            });
        }
    }

    /// Put the weapon away. Pending cooldowns and fire loops are dropped.
    pub fn unequip(&mut self, scheduler: &mut Scheduler) {
        self.equipped = false;
        self.ready = false;
        scheduler.cancel_owner(self.id);
        if let Some(name) = &self.data.anim_equip {
            self.events.push(WeaponEvent::AnimBool {
                name: name.clone(),
                value: false,
            });
        }
    }

    /// Press the trigger. Returns false when the weapon is not ready.
    /// Holding the trigger of a running auto or stream loop keeps its
    /// rhythm; the loop is not restarted.
    pub fn use_weapon(&mut self, scheduler: &mut Scheduler, muzzle: &Muzzle, rng: &mut impl Rng) -> bool {
        if !self.is_ready() {
            return false;
        }

        if let Some(trigger) = &self.data.anim_trigger {
            self.events.push(WeaponEvent::AnimTrigger(trigger.clone()));
            self.ready = false;
            return true;
        }

        if self.data.usage.is_continuous() {
            let key = self.key(AUTO_FIRE);
            if !scheduler.is_pending(key) {
                let rate = self.data.fire_rate;
                scheduler.start_repeating(key, rate, rate);
            }
        } else {
            self.fire(muzzle, rng);
            self.start_cooldown(scheduler);
        }
        true
    }

    /// Release the trigger
    pub fn stop_use(&mut self, scheduler: &mut Scheduler) {
        if !self.data.usage.is_continuous() {
            self.ready = true;
            scheduler.cancel(self.key(COOLDOWN));
        }
        scheduler.cancel(self.key(AUTO_FIRE));
    }

    /// Animation reached the frame where the shot happens
    pub fn on_anim_fire_cue(&mut self, scheduler: &mut Scheduler, muzzle: &Muzzle, rng: &mut impl Rng) -> Option<Shot> {
        let shot = self.fire(muzzle, rng);
        self.start_cooldown(scheduler);
        shot
    }

    fn start_cooldown(&mut self, scheduler: &mut Scheduler) {
        if self.data.fire_rate > 0.0 {
            self.ready = false;
            scheduler.start_once(self.key(COOLDOWN), self.data.fire_rate);
        } else {
            self.ready = true;
        }
    }

    /// React to a fired timer. Returns the shot if the timer produced one.
    pub fn handle_timer(
        &mut self,
        key: &TimerKey,
        scheduler: &mut Scheduler,
        muzzle: &Muzzle,
        rng: &mut impl Rng,
    ) -> Option<Shot> {
        if key.owner != self.id {
            return None;
        }

        match key.purpose {
            COOLDOWN => {
                self.ready = true;
                self.events.push(WeaponEvent::Ready);
                None
            }
            AUTO_FIRE => {
                if self.has_ammo() {
                    self.fire(muzzle, rng)
                } else {
                    scheduler.cancel(*key);
                    self.events.push(WeaponEvent::Empty);
                    None
                }
            }
            _ => None,
        }
    }

    /// Spawn one round with spread applied
    pub fn fire(&mut self, muzzle: &Muzzle, rng: &mut impl Rng) -> Option<Shot> {
        if !self.has_ammo() {
            self.events.push(WeaponEvent::Empty);
            return None;
        }

        let spread = self.data.spread.abs();
        let mut sample = |s: f32| if s > 0.0 { rng.gen_range(-s..=s) } else { 0.0 };
        let (x, y, z) = (sample(spread.x), sample(spread.y), sample(spread.z));
        let offset = Quat::from_euler(EulerRot::YXZ, y.to_radians(), x.to_radians(), z.to_radians());

        if self.data.max_rounds > 0 {
            self.ammo -= 1;
        }

        let shot = Shot {
            weapon: self.id,
            owner: self.owner,
            origin: muzzle.position,
            rotation: (muzzle.rotation * offset).normalize(),
            ammo: self.data.ammo.clone(),
        };
        log::debug!("{} fired {}, {} rounds left", self.data.name, self.id, self.ammo);
        self.events.push(WeaponEvent::Fired(shot.clone()));
        Some(shot)
    }

    /// Take the pending events
    pub fn drain_events(&mut self) -> Vec<WeaponEvent> {
        std::mem::take(&mut self.events)
    }
}
