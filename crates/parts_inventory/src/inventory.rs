//! Inventory component

use crate::item::{Item, ItemData};
use glam::Vec3;
use parts_combat::{Muzzle, Shot, Weapon};
use parts_core::{EntityId, Scheduler, TimerKey};
use rand::Rng;

/// Inventory events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryEvent {
    /// A different item is now in hand
    ItemChanged { index: usize, item_id: String },
    /// Item added to inventory
    ItemAdded { index: usize, item_id: String },
    /// Item removed from inventory
    ItemRemoved { item_id: String },
}

/// Requests an inventory accepts from input or other systems
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryCommand {
    Next,
    Previous,
    Use,
    StopUse,
}

/// A dropped item waiting to be spawned into the world
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDrop {
    /// World prefab to spawn; nothing is spawned without one
    pub prefab: Option<String>,
    /// Definition id of the dropped item
    pub item_id: String,
    /// Where to spawn it
    pub position: Vec3,
}

/// Ordered items with at most one in hand
#[derive(Debug, Clone)]
pub struct Inventory {
    owner: EntityId,
    items: Vec<Item>,
    current: Option<usize>,
    events: Vec<InventoryEvent>,
}

impl Inventory {
    /// Create an empty inventory for `owner`
    pub fn new(owner: EntityId) -> Self {
        Self {
            owner,
            items: Vec::new(),
            current: None,
            events: Vec::new(),
        }
    }

    /// Fill with starting items, then take the first in hand
    pub fn with_starting_items(mut self, items: impl IntoIterator<Item = Item>, scheduler: &mut Scheduler) -> Self {
        for mut item in items {
            item.unequip(scheduler);
            item.set_owner(self.owner);
            self.items.push(item);
        }
        if !self.items.is_empty() {
            self.switch_item(0, scheduler);
        }
        self
    }

    pub fn owner(&self) -> EntityId {
        self.owner
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Index of the item in hand
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_item(&self) -> Option<&Item> {
        self.current.and_then(|i| self.items.get(i))
    }

    pub fn current_item_mut(&mut self) -> Option<&mut Item> {
        self.current.and_then(|i| self.items.get_mut(i))
    }

    pub fn get_item(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    pub fn get_item_mut(&mut self, index: usize) -> Option<&mut Item> {
        self.items.get_mut(index)
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    pub fn items_mut(&mut self) -> impl Iterator<Item = &mut Item> {
        self.items.iter_mut()
    }

    /// Any item with this definition id
    pub fn has_item(&self, id: &str) -> bool {
        self.items.iter().any(|item| item.data_id() == id)
    }

    /// First weapon built from the given definition id
    pub fn find_weapon_mut(&mut self, id: &str) -> Option<&mut Weapon> {
        self.items
            .iter_mut()
            .filter(|item| item.data_id() == id)
            .find_map(|item| item.weapon_mut())
    }

    /// Put `index` in hand. Returns false for a bad index; switching to the
    /// item already in hand succeeds without side effects.
    pub fn switch_item(&mut self, index: usize, scheduler: &mut Scheduler) -> bool {
        if index >= self.items.len() {
            return false;
        }
        if self.current == Some(index) {
            return true;
        }

        if let Some(current) = self.current_item_mut() {
            current.unequip(scheduler);
        }

        self.current = Some(index);
        let item = &mut self.items[index];
        item.equip();
        log::debug!("{} switched to {}", self.owner, item.data.display_name);
        self.events.push(InventoryEvent::ItemChanged {
            index,
            item_id: item.data.id.clone(),
        });
        true
    }

    /// Cycle forward, wrapping at the end
    pub fn next_item(&mut self, scheduler: &mut Scheduler) {
        let len = self.items.len();
        if len == 0 {
            return;
        }
        let next = self.current.map_or(0, |i| (i + 1) % len);
        self.switch_item(next, scheduler);
    }

    /// Cycle backward, wrapping at the start
    pub fn previous_item(&mut self, scheduler: &mut Scheduler) {
        let len = self.items.len();
        if len == 0 {
            return;
        }
        let previous = self.current.map_or(len - 1, |i| (i + len - 1) % len);
        self.switch_item(previous, scheduler);
    }

    /// Append an item. A duplicate of a definition that does not allow
    /// multiples is rejected. The first item in an empty inventory goes
    /// straight into hand.
    pub fn add_item(&mut self, mut item: Item, scheduler: &mut Scheduler) -> bool {
        if !item.data.allow_multiple && self.has_item(item.data_id()) {
            log::debug!("{} already holds {}", self.owner, item.data_id());
            return false;
        }

        // Only the item in hand is equipped
        item.unequip(scheduler);
        item.set_owner(self.owner);
        let index = self.items.len();
        self.events.push(InventoryEvent::ItemAdded {
            index,
            item_id: item.data.id.clone(),
        });
        self.items.push(item);

        if self.items.len() == 1 {
            self.switch_item(0, scheduler);
        }
        true
    }

    /// Instantiate a definition and add it
    pub fn add_from_data(&mut self, id: EntityId, data: ItemData, scheduler: &mut Scheduler) -> bool {
        self.add_item(Item::from_data(id, data), scheduler)
    }

    /// Remove and return the item at `index`. Removing the item in hand puts
    /// the first remaining item in hand.
    pub fn remove_item(&mut self, index: usize, scheduler: &mut Scheduler) -> Option<Item> {
        if index >= self.items.len() {
            return None;
        }

        if self.current == Some(index) {
            self.items[index].unequip(scheduler);
            self.current = None;
        }

        let item = self.items.remove(index);
        self.events.push(InventoryEvent::ItemRemoved {
            item_id: item.data.id.clone(),
        });

        let current = self.current;
        match current {
            None if !self.items.is_empty() => {
                self.switch_item(0, scheduler);
            }
            Some(current) if index < current => self.current = Some(current - 1),
            _ => {}
        }

        Some(item)
    }

    /// Remove the item at `index` and describe the pickup to spawn for it.
    /// The item instance itself is gone afterwards.
    pub fn drop_item(&mut self, index: usize, position: Vec3, scheduler: &mut Scheduler) -> Option<ItemDrop> {
        let item = self.remove_item(index, scheduler)?;
        Some(ItemDrop {
            prefab: item.data.pickup_prefab,
            item_id: item.data.id,
            position,
        })
    }

    /// Use the item in hand
    pub fn use_current(&mut self, scheduler: &mut Scheduler, muzzle: &Muzzle, rng: &mut impl Rng) -> bool {
        match self.current_item_mut() {
            Some(item) => item.use_item(scheduler, muzzle, rng),
            None => false,
        }
    }

    /// Stop using the item in hand
    pub fn stop_use_current(&mut self, scheduler: &mut Scheduler) {
        if let Some(item) = self.current_item_mut() {
            item.stop_use(scheduler);
        }
    }

    /// Animation cue for the item in hand
    pub fn on_anim_use_cue(&mut self, scheduler: &mut Scheduler, muzzle: &Muzzle, rng: &mut impl Rng) -> Option<Shot> {
        self.current_item_mut()?.on_anim_use_cue(scheduler, muzzle, rng)
    }

    /// Apply an input command
    pub fn apply(&mut self, command: InventoryCommand, scheduler: &mut Scheduler, muzzle: &Muzzle, rng: &mut impl Rng) {
        match command {
            InventoryCommand::Next => self.next_item(scheduler),
            InventoryCommand::Previous => self.previous_item(scheduler),
            InventoryCommand::Use => {
                self.use_current(scheduler, muzzle, rng);
            }
            InventoryCommand::StopUse => self.stop_use_current(scheduler),
        }
    }

    /// Route a fired timer to whichever item owns it
    pub fn handle_timer(
        &mut self,
        key: &TimerKey,
        scheduler: &mut Scheduler,
        muzzle: &Muzzle,
        rng: &mut impl Rng,
    ) -> Option<Shot> {
        let item = self.items.iter_mut().find(|item| item.id() == key.owner)?;
        item.handle_timer(key, scheduler, muzzle, rng)
    }

    /// Take the pending events
    pub fn drain_events(&mut self) -> Vec<InventoryEvent> {
        std::mem::take(&mut self.events)
    }
}
