//! Pickups lying in the world

use crate::inventory::Inventory;
use crate::item::{Item, ItemData};
use parts_combat::Damageable;
use parts_core::{EntityId, Scheduler, TagFilter};
use serde::{Deserialize, Serialize};

/// What a pickup gives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PickupKind {
    /// Heal the collector; refused at full health
    Health(f32),
    /// Refill a weapon the collector carries; refused when it is full
    Ammo { weapon_id: String, amount: u32 },
    /// Award score
    Points(i32),
    /// Put an item in the collector's inventory
    Item(ItemData),
}

impl PickupKind {
    pub fn health() -> Self {
        Self::Health(25.0)
    }

    pub fn ammo(weapon_id: impl Into<String>) -> Self {
        Self::Ammo {
            weapon_id: weapon_id.into(),
            amount: 10,
        }
    }

    pub fn points() -> Self {
        Self::Points(10)
    }
}

/// What happens to the pickup once collected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnCollect {
    Destroy,
    /// Hide it; a spawner or script may bring it back
    Deactivate,
}

impl Default for OnCollect {
    fn default() -> Self {
        Self::Deactivate
    }
}

/// Everything a pickup may touch on the collector
pub struct CollectContext<'a> {
    /// Collector's tag
    pub tag: Option<&'a str>,
    pub health: Option<&'a mut dyn Damageable>,
    pub inventory: Option<&'a mut Inventory>,
    pub scheduler: &'a mut Scheduler,
    /// Id for an item created from an item pickup
    pub new_item_id: EntityId,
}

/// Result of a collect attempt
#[derive(Debug, Clone, PartialEq)]
pub enum CollectOutcome {
    /// Collector's tag did not match, or the pickup is already gone
    Ignored,
    /// The pickup had nothing to give this collector; it stays in the world
    Rejected,
    /// Taken
    Collected {
        /// Score to award
        points: Option<i32>,
        /// Effect to spawn where the pickup was
        effect: Option<String>,
        despawn: OnCollect,
    },
}

impl CollectOutcome {
    pub fn is_collected(&self) -> bool {
        matches!(self, Self::Collected { .. })
    }
}

/// A pickup in the world
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pickup {
    pub kind: PickupKind,
    /// Who may collect it
    pub filter: TagFilter,
    pub on_collect: OnCollect,
    /// Effect spawned on collection
    pub effect: Option<String>,
    active: bool,
}

impl Pickup {
    pub fn new(kind: PickupKind) -> Self {
        Self {
            kind,
            filter: TagFilter::tag("Player"),
            on_collect: OnCollect::default(),
            effect: None,
            active: true,
        }
    }

    pub fn with_filter(mut self, filter: TagFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn destroy_on_collect(mut self) -> Self {
        self.on_collect = OnCollect::Destroy;
        self
    }

    pub fn with_effect(mut self, effect: impl Into<String>) -> Self {
        self.effect = Some(effect.into());
        self
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Bring a deactivated pickup back
    pub fn reactivate(&mut self) {
        self.active = true;
    }

    /// Try to hand the pickup to a collector
    pub fn try_collect(&mut self, ctx: CollectContext<'_>) -> CollectOutcome {
        if !self.active || !self.filter.passes(ctx.tag) {
            return CollectOutcome::Ignored;
        }

        let mut points = None;
        let taken = match &self.kind {
            PickupKind::Health(amount) => match ctx.health {
                Some(health) if health.current_health() < health.max_health() => {
                    health.heal(*amount);
                    true
                }
                _ => false,
            },
            PickupKind::Ammo { weapon_id, amount } => {
                match ctx.inventory.and_then(|inv| inv.find_weapon_mut(weapon_id)) {
                    Some(weapon) if weapon.needs_ammo() => {
                        weapon.add_ammo(*amount);
                        true
                    }
                    _ => false,
                }
            }
            PickupKind::Points(value) => {
                points = Some(*value);
                true
            }
            PickupKind::Item(data) => match ctx.inventory {
                Some(inventory) => inventory.add_item(Item::from_data(ctx.new_item_id, data.clone()), ctx.scheduler),
                None => false,
            },
        };

        if !taken {
            return CollectOutcome::Rejected;
        }

        self.active = false;
        log::debug!("pickup collected: {:?}", self.kind);
        CollectOutcome::Collected {
            points,
            effect: self.effect.clone(),
            despawn: self.on_collect,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parts_combat::{Health, WeaponData};

    fn ctx<'a>(
        tag: &'a str,
        health: Option<&'a mut dyn Damageable>,
        inventory: Option<&'a mut Inventory>,
        scheduler: &'a mut Scheduler,
    ) -> CollectContext<'a> {
        CollectContext {
            tag: Some(tag),
            health,
            inventory,
            scheduler,
            new_item_id: EntityId::from_raw(50),
        }
    }

    #[test]
    fn test_health_pickup() {
        let mut scheduler = Scheduler::new();
        let mut health = Health::new(100.0);
        let mut pickup = Pickup::new(PickupKind::health());

        // Full health: stays in the world
        let outcome = pickup.try_collect(ctx("Player", Some(&mut health), None, &mut scheduler));
        assert_eq!(outcome, CollectOutcome::Rejected);
        assert!(pickup.is_active());

        health.take_damage(40.0);
        let outcome = pickup.try_collect(ctx("Player", Some(&mut health), None, &mut scheduler));
        assert!(outcome.is_collected());
        assert_eq!(health.current_health(), 85.0);
        assert!(!pickup.is_active());

        // Already taken
        let outcome = pickup.try_collect(ctx("Player", Some(&mut health), None, &mut scheduler));
        assert_eq!(outcome, CollectOutcome::Ignored);
    }

    #[test]
    fn test_tag_filter() {
        let mut scheduler = Scheduler::new();
        let mut pickup = Pickup::new(PickupKind::points());
        let outcome = pickup.try_collect(ctx("Enemy", None, None, &mut scheduler));
        assert_eq!(outcome, CollectOutcome::Ignored);

        let outcome = pickup.try_collect(ctx("Player", None, None, &mut scheduler));
        assert_eq!(
            outcome,
            CollectOutcome::Collected {
                points: Some(10),
                effect: None,
                despawn: OnCollect::Deactivate,
            }
        );
    }

    #[test]
    fn test_ammo_pickup_needs_matching_weapon() {
        let mut scheduler = Scheduler::new();
        let mut inventory = Inventory::new(EntityId::from_raw(1));
        let rifle = ItemData::new("rifle", "Rifle").with_weapon(WeaponData::default().with_rounds(30));
        inventory.add_from_data(EntityId::from_raw(2), rifle, &mut scheduler);

        let mut wrong = Pickup::new(PickupKind::ammo("shotgun"));
        let outcome = wrong.try_collect(ctx("Player", None, Some(&mut inventory), &mut scheduler));
        assert_eq!(outcome, CollectOutcome::Rejected);

        // Full magazine
        let mut ammo = Pickup::new(PickupKind::ammo("rifle")).destroy_on_collect();
        let outcome = ammo.try_collect(ctx("Player", None, Some(&mut inventory), &mut scheduler));
        assert_eq!(outcome, CollectOutcome::Rejected);

        let weapon = inventory.find_weapon_mut("rifle").unwrap();
        for _ in 0..15 {
            weapon.fire(&parts_combat::Muzzle::default(), &mut rand::thread_rng());
        }
        assert_eq!(weapon.ammo(), 15);

        let outcome = ammo.try_collect(ctx("Player", None, Some(&mut inventory), &mut scheduler));
        assert!(matches!(outcome, CollectOutcome::Collected { despawn: OnCollect::Destroy, .. }));
        assert_eq!(inventory.find_weapon_mut("rifle").map(|w| w.ammo()), Some(25));
    }

    #[test]
    fn test_item_pickup() {
        let mut scheduler = Scheduler::new();
        let mut inventory = Inventory::new(EntityId::from_raw(1));
        let mut pickup = Pickup::new(PickupKind::Item(ItemData::new("key", "Key"))).with_effect("sparkle");

        let outcome = pickup.try_collect(ctx("Player", None, Some(&mut inventory), &mut scheduler));
        assert!(matches!(outcome, CollectOutcome::Collected { effect: Some(ref e), .. } if e == "sparkle"));
        assert!(inventory.has_item("key"));
        assert_eq!(inventory.current_index(), Some(0));

        // A second copy is refused and stays put
        let mut copy = Pickup::new(PickupKind::Item(ItemData::new("key", "Key")));
        let outcome = copy.try_collect(ctx("Player", None, Some(&mut inventory), &mut scheduler));
        assert_eq!(outcome, CollectOutcome::Rejected);
        assert!(copy.is_active());
    }
}
