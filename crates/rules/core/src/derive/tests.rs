use super::*;
use crate::modifiers::{INT_LIMIT, Modifier};
use crate::record::{
    AbilityData, ArmorData, ArmorSlot, ClassData, EquipmentData, ItemKind, OwnedItem,
    StarshipComponent, StarshipEquipmentData, StarshipSizeData,
};

fn armor(id: &str, slot: ArmorSlot, value: i32, dex_cap: Option<i32>) -> OwnedItem {
    OwnedItem::new(
        id,
        id,
        ItemKind::Equipment(EquipmentData {
            armor: Some(ArmorData {
                slot,
                value,
                dex_cap,
            }),
        }),
    )
    .equipped()
}

fn character() -> ActorRecord {
    let mut record = ActorRecord::new("pc", ActorKind::Character);
    for (id, value) in [("str", 12), ("dex", 16), ("con", 14), ("wis", 13)] {
        record
            .abilities
            .insert(AbilityId::from(id), AbilityData::with_value(value));
    }
    record.items.push(OwnedItem::new(
        "fighter",
        "Fighter",
        ItemKind::Class(ClassData {
            identifier: "fighter".into(),
            levels: 5,
            hit_die: 10,
            ..Default::default()
        }),
    ));
    record.attributes.hp.value = 30;
    record.attributes.hp.max = 44;
    record
}

fn starship() -> ActorRecord {
    let mut record = ActorRecord::new("ship", ActorKind::Starship);
    record.details.tier = 1;
    record
        .abilities
        .insert(AbilityId::from("dex"), AbilityData::with_value(14));
    record.items.push(OwnedItem::new(
        "hull",
        "Medium Hull",
        ItemKind::StarshipSize(StarshipSizeData::default()),
    ));
    let install = |id: &str, part: StarshipComponent| {
        OwnedItem::new(id, id, ItemKind::StarshipEquipment(StarshipEquipmentData::new(part)))
            .equipped()
    };
    record.items.push(install(
        "plating",
        StarshipComponent::Armor { ac_bonus: 2, dr: 3 },
    ));
    record.items.push(install(
        "deflector",
        StarshipComponent::Shield {
            capacity_multiplier: 1.5,
            regen_multiplier: 0.5,
        },
    ));
    record.items.push(install(
        "reactor",
        StarshipComponent::Reactor {
            fuel_cost: 10,
            power_recovery: 2,
        },
    ));
    record.items.push(install(
        "coupling",
        StarshipComponent::PowerCoupling {
            central_capacity: 6,
            system_capacity: 3,
        },
    ));
    record
}

#[test]
fn repeated_derivation_is_stable() {
    let config = RulesetConfig::standard();
    let record = character();
    let modifiers = [Modifier::add("attributes.ac.bonus", 1)];

    let first = derive(&record, &modifiers, &config);
    assert!(first.patch.is_some());

    let mut stored = record.clone();
    stored.apply_update(first.patch.as_ref().unwrap());
    let second = derive(&stored, &modifiers, &config);
    assert_eq!(second.patch, None);
    assert_eq!(second.actor, first.actor);
    assert_eq!(second.record, first.record);

    let third = derive(&second.record, &modifiers, &config);
    assert_eq!(third.actor, second.actor);
}

#[test]
fn unarmored_and_armored_class() {
    let config = RulesetConfig::standard();
    let mut record = character();
    let unarmored = derive(&record, &[], &config);
    assert_eq!(unarmored.actor.ac.value, 13);

    record.items.push(armor("mail", ArmorSlot::Body, 14, Some(2)));
    record.items.push(armor("buckler", ArmorSlot::Shield, 2, None));
    let armored = derive(&record, &[Modifier::add("attributes.ac.cover", 2)], &config);
    assert_eq!(armored.actor.ac.armor, 16);
    assert_eq!(armored.actor.ac.value, 16 + 2 + 2);
    assert_eq!(armored.actor.ac.equipped_armor, Some(ItemId::from("mail")));
    assert!(armored.warnings.is_empty());
}

#[test]
fn duplicate_body_armor_keeps_first() {
    let config = RulesetConfig::standard();
    let mut record = character();
    record.items.push(armor("leather", ArmorSlot::Body, 11, None));
    record.items.push(armor("plate", ArmorSlot::Body, 18, Some(0)));

    let derivation = derive(&record, &[], &config);
    assert_eq!(derivation.actor.ac.value, 11 + 3);
    let duplicates: Vec<_> = derivation
        .warnings
        .iter()
        .filter(|w| matches!(w, DerivationWarning::DuplicateAuthoritativeItem { .. }))
        .collect();
    assert_eq!(duplicates.len(), 1);
    assert_eq!(
        duplicates[0],
        &DerivationWarning::DuplicateAuthoritativeItem {
            slot: ItemSlot::BodyArmor,
            kept: ItemId::from("leather"),
            ignored: ItemId::from("plate"),
        }
    );
}

#[test]
fn armor_class_modes() {
    let config = RulesetConfig::standard();
    let mut record = character();

    record.attributes.ac.calc = AcCalc::Flat;
    record.attributes.ac.flat = Some(17);
    let flat = derive(&record, &[Modifier::add("attributes.ac.bonus", 5)], &config);
    assert_eq!(flat.actor.ac.value, 17);

    record.attributes.ac.calc = AcCalc::Natural;
    let natural = derive(&record, &[Modifier::add("attributes.ac.bonus", 1)], &config);
    assert_eq!(natural.actor.ac.value, 18);

    record.attributes.ac.calc = AcCalc::from("unarmored-monk");
    let monk = derive(&record, &[], &config);
    assert_eq!(monk.actor.ac.value, 10 + 3 + 1);

    record.attributes.ac.calc = AcCalc::Custom;
    record.attributes.ac.formula = "12 + @abilities.con.mod".into();
    let custom = derive(&record, &[], &config);
    assert_eq!(custom.actor.ac.value, 14);
    assert!(custom.warnings.is_empty());
}

#[test]
fn bad_custom_formula_falls_back_to_default() {
    let config = RulesetConfig::standard();
    let mut record = character();
    record.attributes.ac.calc = AcCalc::Custom;
    record.attributes.ac.formula = "10 + @abilities.nope.mod".into();

    let derivation = derive(&record, &[], &config);
    assert_eq!(derivation.actor.ac.value, 13);
    assert!(matches!(
        &derivation.warnings[..],
        [DerivationWarning::FormulaEvaluation { error: FormulaError::UnresolvedReference(_), .. }]
    ));

    record.attributes.ac.formula = "10 + 1d4".into();
    let derivation = derive(&record, &[], &config);
    assert_eq!(derivation.actor.ac.value, 13);
    assert!(matches!(
        &derivation.warnings[..],
        [DerivationWarning::FormulaEvaluation { error: FormulaError::DiceNotAllowed, .. }]
    ));

    record.attributes.ac.calc = AcCalc::from("psychic-shell");
    let derivation = derive(&record, &[], &config);
    assert_eq!(derivation.actor.ac.value, 13);
    assert_eq!(
        derivation.warnings,
        vec![DerivationWarning::UnknownArmorCalc {
            calc: "psychic-shell".into()
        }]
    );
}

#[test]
fn runaway_custom_formula_falls_back_to_default() {
    let config = RulesetConfig::standard();
    let mut record = character();
    record.attributes.ac.calc = AcCalc::Custom;

    record.attributes.ac.formula = format!("{}10{}", "(".repeat(3_000), ")".repeat(3_000));
    let derivation = derive(&record, &[], &config);
    assert_eq!(derivation.actor.ac.value, 13);
    assert!(matches!(
        &derivation.warnings[..],
        [DerivationWarning::FormulaEvaluation { error: FormulaError::TooLong { .. }, .. }]
    ));

    record.attributes.ac.formula = format!("{}10{}", "(".repeat(100), ")".repeat(100));
    let derivation = derive(&record, &[], &config);
    assert_eq!(derivation.actor.ac.value, 13);
    assert!(matches!(
        &derivation.warnings[..],
        [DerivationWarning::FormulaEvaluation { error: FormulaError::TooDeep { .. }, .. }]
    ));
}

#[test]
fn unequipped_item_modifiers_are_suppressed() {
    let config = RulesetConfig::standard();
    let mut record = character();
    record.items.push(OwnedItem::new(
        "gauntlets",
        "Gauntlets",
        ItemKind::Equipment(EquipmentData::default()),
    ));
    let modifiers = [Modifier::override_with("abilities.str.value", 21).from_item("gauntlets")];

    let unequipped = derive(&record, &modifiers, &config);
    assert_eq!(unequipped.actor.abilities[&AbilityId::from("str")].value, 12);

    record.items.last_mut().unwrap().equipped = true;
    let equipped = derive(&record, &modifiers, &config);
    assert_eq!(equipped.actor.abilities[&AbilityId::from("str")].value, 21);
    assert_eq!(equipped.actor.encumbrance.max, 21.0 * 15.0);
}

#[test]
fn character_pools_and_roll_data() {
    let config = RulesetConfig::standard();
    let mut record = character();
    if let ItemKind::Class(class) = &mut record.items[0].system {
        class.hit_dice_used = 2;
    }
    let derivation = derive(&record, &[Modifier::add("attributes.hp.max", 4)], &config);
    let actor = &derivation.actor;

    assert_eq!(actor.prof, 3);
    assert_eq!(actor.hp.pool.max(), 48);
    assert_eq!(actor.hp.pool.current(), 30);
    let hit_dice = actor.hit_dice.unwrap();
    assert_eq!((hit_dice.current(), hit_dice.max()), (3, 5));
    assert_eq!(hit_dice.denomination, Some(10));
    assert_eq!(actor.roll_data.number("abilities.dex.mod"), Some(3.0));
    assert_eq!(actor.roll_data.number("prof"), Some(3.0));
    assert_eq!(actor.initiative.total, 3);
    assert!(actor.starship.is_none());
    assert!(actor.npc.is_none());
}

#[test]
fn npc_block() {
    let config = RulesetConfig::standard();
    let mut record = ActorRecord::new("npc", ActorKind::Npc);
    record.details.cr = 2.0;
    let derivation = derive(&record, &[], &config);
    assert_eq!(derivation.actor.npc, Some(NpcDetails { cr: 2.0, xp: 450 }));
    assert_eq!(derivation.actor.prof, 2);
}

#[test]
fn starship_block() {
    let config = RulesetConfig::standard();
    let mut record = starship();
    record.attributes.ac.calc = AcCalc::Starship;
    record.attributes.power_dice.insert(Subsystem::Engines, 9);
    record.attributes.shield_points = 100;

    let derivation = derive(&record, &[], &config);
    assert!(derivation.warnings.is_empty());
    let ship = derivation.actor.starship.as_ref().unwrap();

    // medium: 5 + tier 1
    assert_eq!(ship.hull_dice.max(), 6);
    assert_eq!(ship.hull_dice.denomination, Some(8));
    assert_eq!(ship.shield_dice.max(), 6);
    assert_eq!(ship.power_die, 4);
    assert_eq!(ship.power_dice[&Subsystem::Central].max(), 6);
    assert_eq!(ship.power_dice[&Subsystem::Engines].max(), 3);
    assert_eq!(ship.power_dice[&Subsystem::Engines].current(), 3);
    assert_eq!(ship.power_dice[&Subsystem::Weapons].current(), 0);
    assert_eq!(ship.damage_reduction, 3);
    assert_eq!(ship.shield_points.max(), 72);
    assert_eq!(ship.shield_points.current(), 72);
    assert_eq!(ship.shield_regen, 4);
    assert_eq!(ship.fuel_cost, 10);
    assert_eq!(derivation.actor.ac.value, 10 + 2 + 2);
    assert_eq!(derivation.actor.hp.pool.kind, PoolKind::HullPoints);
    assert!(derivation.actor.powercasting.is_empty());
}

#[test]
fn duplicate_reactor_is_warned() {
    let config = RulesetConfig::standard();
    let mut record = starship();
    record.items.push(
        OwnedItem::new(
            "spare-reactor",
            "Spare Reactor",
            ItemKind::StarshipEquipment(StarshipEquipmentData::new(StarshipComponent::Reactor {
                fuel_cost: 1,
                power_recovery: 9,
            })),
        )
        .equipped(),
    );

    let derivation = derive(&record, &[], &config);
    let ship = derivation.actor.starship.unwrap();
    assert_eq!(ship.power_recovery, 2);
    assert_eq!(derivation.warnings.len(), 1);
}

#[test]
fn groups_derive_nothing() {
    let config = RulesetConfig::standard();
    let record = ActorRecord::new("party", ActorKind::Group);
    let derivation = derive(&record, &[Modifier::add("attributes.prof", 3)], &config);
    assert_eq!(derivation.actor.kind, ActorKind::Group);
    assert!(derivation.actor.abilities.is_empty());
    assert_eq!(derivation.actor.prof, 0);
    assert_eq!(derivation.patch, None);
}

#[test]
fn encumbrance_percentage_stays_in_range() {
    let config = RulesetConfig::standard();
    let mut record = character();
    record
        .items
        .push(OwnedItem::new("crate", "Crate", ItemKind::Gear).with_weight(10, 500.0));
    let derivation = derive(&record, &[], &config);
    assert_eq!(derivation.actor.encumbrance.pct, 100.0);
    assert!(derivation.actor.encumbrance.encumbered);
}

#[test]
fn extreme_modifiers_saturate() {
    let config = RulesetConfig::standard();
    let modifiers = [
        Modifier::override_with("attributes.prof", 1.0e12),
        Modifier::add("bonuses.abilities.save", 1.0e12),
        Modifier::add("abilities.dex.value", -1.0e12),
        Modifier::add("attributes.init.bonus", 1.0e12),
    ];

    let derivation = derive(&character(), &modifiers, &config);
    let actor = &derivation.actor;
    assert_eq!(actor.prof, INT_LIMIT);
    let dex = &actor.abilities[&AbilityId::from("dex")];
    assert_eq!(dex.value, -INT_LIMIT);
    assert_eq!(dex.save_bonus, INT_LIMIT);
    assert!(actor.initiative.total > 0);
    assert!(actor.skills.values().all(|skill| skill.passive >= skill.total));

    let mut record = character();
    record
        .abilities
        .insert(AbilityId::from("str"), AbilityData::with_value(i32::MIN));
    let derivation = derive(&record, &[], &config);
    assert_eq!(
        derivation.actor.abilities[&AbilityId::from("str")].modifier,
        i32::MIN.div_euclid(2)
    );
}
