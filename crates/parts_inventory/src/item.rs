//! Item definitions and held items

use parts_combat::{Muzzle, Shot, Weapon, WeaponData, WeaponEvent};
use parts_core::{EntityId, Scheduler, TimerKey};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Broad item category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemType {
    /// Worn or held gear
    Equipment,
    /// Fires ammo
    Weapon,
    /// Used up on use
    Consumable,
    /// Crafting and trade goods
    Resource,
    /// Story items
    Quest,
}

impl Default for ItemType {
    fn default() -> Self {
        Self::Equipment
    }
}

/// Item definition shared by every instance of the item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemData {
    /// Unique identifier
    pub id: String,
    /// Display name
    pub display_name: String,
    /// Description
    pub description: String,
    /// Category
    pub item_type: ItemType,
    /// More than one instance may sit in one inventory
    pub allow_multiple: bool,
    /// Maximum stack size
    pub max_stack_size: u32,
    /// Can be taken in hand
    pub equipable: bool,
    /// Animation trigger fired on use
    pub anim_trigger: Option<String>,
    /// Animation bool held while equipped
    pub anim_equip: Option<String>,
    /// What to spawn in the world when dropped
    pub pickup_prefab: Option<String>,
    /// Weapon behaviour, if this item is a weapon
    pub weapon: Option<WeaponData>,
}

impl ItemData {
    /// Create a plain item definition
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            description: String::new(),
            item_type: ItemType::Equipment,
            allow_multiple: false,
            max_stack_size: 1,
            equipable: true,
            anim_trigger: None,
            anim_equip: None,
            pickup_prefab: None,
            weapon: None,
        }
    }

    /// Set description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Set category
    pub fn with_type(mut self, item_type: ItemType) -> Self {
        self.item_type = item_type;
        self
    }

    /// Allow duplicates in one inventory
    pub fn allow_multiple(mut self) -> Self {
        self.allow_multiple = true;
        self
    }

    /// Set max stack size
    pub fn with_max_stack(mut self, size: u32) -> Self {
        self.max_stack_size = size.max(1);
        self
    }

    /// Set the world prefab spawned on drop
    pub fn with_pickup_prefab(mut self, prefab: impl Into<String>) -> Self {
        self.pickup_prefab = Some(prefab.into());
        self
    }

    /// Make this a weapon. The item's animation names carry over when the
    /// weapon data has none of its own.
    pub fn with_weapon(mut self, mut weapon: WeaponData) -> Self {
        self.item_type = ItemType::Weapon;
        if weapon.anim_trigger.is_none() {
            weapon.anim_trigger = self.anim_trigger.clone();
        }
        if weapon.anim_equip.is_none() {
            weapon.anim_equip = self.anim_equip.clone();
        }
        if weapon.name == WeaponData::default().name {
            weapon.name = self.display_name.clone();
        }
        self.weapon = Some(weapon);
        self
    }
}

/// What an item does when used
#[derive(Debug, Clone)]
pub enum ItemKind {
    /// No use behaviour
    Plain,
    Weapon(Weapon),
}

/// An item instance owned by an inventory
#[derive(Debug, Clone)]
pub struct Item {
    id: EntityId,
    /// Definition
    pub data: ItemData,
    equipped: bool,
    /// Behaviour
    pub kind: ItemKind,
}

impl Item {
    /// Instantiate an item from its definition
    pub fn from_data(id: EntityId, data: ItemData) -> Self {
        let kind = match &data.weapon {
            Some(weapon) => ItemKind::Weapon(Weapon::new(id, weapon.clone())),
            None => ItemKind::Plain,
        };
        Self {
            id,
            data,
            equipped: false,
            kind,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Definition id
    pub fn data_id(&self) -> &str {
        &self.data.id
    }

    pub fn is_equipped(&self) -> bool {
        self.equipped
    }

    pub fn weapon(&self) -> Option<&Weapon> {
        match &self.kind {
            ItemKind::Weapon(weapon) => Some(weapon),
            ItemKind::Plain => None,
        }
    }

    pub fn weapon_mut(&mut self) -> Option<&mut Weapon> {
        match &mut self.kind {
            ItemKind::Weapon(weapon) => Some(weapon),
            ItemKind::Plain => None,
        }
    }

    /// Hand the item to a new holder
    pub fn set_owner(&mut self, owner: EntityId) {
        if let Some(weapon) = self.weapon_mut() {
            weapon.set_owner(owner);
        }
    }

    /// Take the item in hand. Equipping twice does nothing.
    pub fn equip(&mut self) {
        if self.equipped {
            return;
        }
        self.equipped = true;
        if let Some(weapon) = self.weapon_mut() {
            weapon.equip();
        }
    }

    /// Put the item away. Unequipping twice does nothing.
    pub fn unequip(&mut self, scheduler: &mut Scheduler) {
        if !self.equipped {
            return;
        }
        self.equipped = false;
        if let Some(weapon) = self.weapon_mut() {
            weapon.unequip(scheduler);
        }
    }

    pub fn is_ready(&self) -> bool {
        match &self.kind {
            ItemKind::Weapon(weapon) => self.equipped && weapon.is_ready(),
            ItemKind::Plain => false,
        }
    }

    /// Begin using the item. Returns false if nothing happened.
    pub fn use_item(&mut self, scheduler: &mut Scheduler, muzzle: &Muzzle, rng: &mut impl Rng) -> bool {
        if !self.equipped {
            return false;
        }
        match &mut self.kind {
            ItemKind::Weapon(weapon) => weapon.use_weapon(scheduler, muzzle, rng),
            ItemKind::Plain => false,
        }
    }

    /// Stop using the item
    pub fn stop_use(&mut self, scheduler: &mut Scheduler) {
        if let ItemKind::Weapon(weapon) = &mut self.kind {
            weapon.stop_use(scheduler);
        }
    }

    /// Animation cue that times the actual use
    pub fn on_anim_use_cue(&mut self, scheduler: &mut Scheduler, muzzle: &Muzzle, rng: &mut impl Rng) -> Option<Shot> {
        match &mut self.kind {
            ItemKind::Weapon(weapon) if self.equipped => weapon.on_anim_fire_cue(scheduler, muzzle, rng),
            _ => None,
        }
    }

    /// Forward a fired timer. Timers owned by something else are ignored.
    pub fn handle_timer(
        &mut self,
        key: &TimerKey,
        scheduler: &mut Scheduler,
        muzzle: &Muzzle,
        rng: &mut impl Rng,
    ) -> Option<Shot> {
        match &mut self.kind {
            ItemKind::Weapon(weapon) => weapon.handle_timer(key, scheduler, muzzle, rng),
            ItemKind::Plain => None,
        }
    }

    /// Take the weapon's pending events, if any
    pub fn drain_events(&mut self) -> Vec<WeaponEvent> {
        match &mut self.kind {
            ItemKind::Weapon(weapon) => weapon.drain_events(),
            ItemKind::Plain => Vec::new(),
        }
    }
}
