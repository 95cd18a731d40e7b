//! # parts_inventory - Items, Inventory and Pickups
//!
//! An actor carries an ordered list of items with at most one of them in
//! hand. Weapons are one kind of item; everything else is plain data that
//! can be held, dropped and picked back up.
//!
//! # Features
//!
//! - Item definitions with stacking rules and animation hooks
//! - Single-active-item inventory with next/previous switching
//! - Drop requests that hand a pickup back to the world
//! - Health, ammo, points and item pickups with tag filtering
//!
//! # Example
//!
//! ```ignore
//! use parts_inventory::prelude::*;
//!
//! let pistol = ItemData::new("pistol", "Pistol").with_weapon(WeaponData::default());
//!
//! let mut inventory = Inventory::new(player);
//! inventory.add_item(Item::from_data(ids.next(), pistol), &mut scheduler);
//! inventory.use_current(&mut scheduler, &muzzle, &mut rng);
//! ```

pub mod inventory;
pub mod item;
pub mod pickup;

pub mod prelude {
    pub use crate::inventory::{Inventory, InventoryCommand, InventoryEvent, ItemDrop};
    pub use crate::item::{Item, ItemData, ItemKind, ItemType};
    pub use crate::pickup::{CollectContext, CollectOutcome, OnCollect, Pickup, PickupKind};
}

pub use prelude::*;
