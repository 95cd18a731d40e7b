//! Integration tests for parts_inventory: picking up, using and dropping gear

use glam::Vec3;
use parts_combat::{Muzzle, UsageType, WeaponData, WeaponEvent};
use parts_core::{EntityId, IdGenerator, Scheduler};
use parts_inventory::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn smg() -> ItemData {
    ItemData::new("smg", "SMG")
        .with_pickup_prefab("smg_pickup")
        .with_weapon(WeaponData::default().with_usage(UsageType::Auto).with_fire_rate(0.1).with_rounds(5))
}

fn shots(inventory: &mut Inventory) -> usize {
    inventory
        .items_mut()
        .flat_map(|item| item.drain_events())
        .filter(|e| matches!(e, WeaponEvent::Fired(_)))
        .count()
}

#[test]
fn test_pickup_fire_refill_drop() {
    let ids = IdGenerator::new();
    let player = ids.next();
    let mut scheduler = Scheduler::new();
    let mut rng = StdRng::seed_from_u64(11);
    let muzzle = Muzzle::default();
    let mut inventory = Inventory::new(player);

    let mut crate_pickup = Pickup::new(PickupKind::Item(smg()));
    let outcome = crate_pickup.try_collect(CollectContext {
        tag: Some("Player"),
        health: None,
        inventory: Some(&mut inventory),
        scheduler: &mut scheduler,
        new_item_id: ids.next(),
    });
    assert!(outcome.is_collected());
    assert_eq!(inventory.current_item().map(|i| i.data_id()), Some("smg"));

    // Hold the trigger for a full second
    inventory.apply(InventoryCommand::Use, &mut scheduler, &muzzle, &mut rng);
    for _ in 0..10 {
        for key in scheduler.tick(0.1) {
            inventory.handle_timer(&key, &mut scheduler, &muzzle, &mut rng);
        }
    }
    inventory.apply(InventoryCommand::StopUse, &mut scheduler, &muzzle, &mut rng);
    assert_eq!(shots(&mut inventory), 5);

    let mut ammo = Pickup::new(PickupKind::ammo("smg"));
    let outcome = ammo.try_collect(CollectContext {
        tag: Some("Player"),
        health: None,
        inventory: Some(&mut inventory),
        scheduler: &mut scheduler,
        new_item_id: EntityId::NULL,
    });
    assert!(outcome.is_collected());
    assert_eq!(inventory.current_item().and_then(|i| i.weapon()).map(|w| w.ammo()), Some(5));

    let drop = inventory.drop_item(0, Vec3::new(3.0, 0.0, 4.0), &mut scheduler);
    assert_eq!(
        drop,
        Some(ItemDrop {
            prefab: Some("smg_pickup".into()),
            item_id: "smg".into(),
            position: Vec3::new(3.0, 0.0, 4.0),
        })
    );
    assert!(inventory.is_empty());
    assert_eq!(inventory.current_index(), None);
    assert!(scheduler.is_empty());
}
