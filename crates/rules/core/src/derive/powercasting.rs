//! Powercasting progression.
//!
//! Characters accumulate each caster track over their class items; NPCs carry
//! a caster level per track directly and use the track's NPC progression.
//!
//! Current points come from the record. NPCs without a stored value start
//! full; player characters never get topped up, their stored value is only
//! clamped to the new maximum.

use std::collections::BTreeMap;

use super::{Ability, Powercasting};
use crate::config::{CasterTrack, CasterTrackRules, ProgressionSpec, RulesetConfig, lookup};
use crate::ids::AbilityId;
use crate::modifiers::ModifierMap;
use crate::pools::{PoolKind, ResourcePool};
use crate::record::{ActorKind, ActorRecord};

#[derive(Default)]
struct Accumulated<'a> {
    points: f64,
    caster_level: f64,
    known: u32,
    /// (levels, progression name, spec) of the limit-setting class.
    limit: Option<(u32, &'a str, &'a ProgressionSpec)>,
}

impl<'a> Accumulated<'a> {
    fn add(&mut self, levels: u32, name: &'a str, spec: &'a ProgressionSpec) {
        self.points += f64::from(levels) * spec.points_per_level;
        self.caster_level += f64::from(levels) * spec.caster_level_rate();
        self.known += lookup(&spec.known, levels as usize);
        if self.limit.is_none_or(|(best, _, _)| levels > best) {
            self.limit = Some((levels, name, spec));
        }
    }
}

fn accumulate<'a>(
    record: &ActorRecord,
    track: CasterTrack,
    rules: &'a CasterTrackRules,
) -> Accumulated<'a> {
    let mut acc = Accumulated::default();

    if record.kind == ActorKind::Npc {
        let levels = record.details.caster_levels.get(&track).copied().unwrap_or(0);
        if levels > 0 {
            if let Some((name, spec)) = rules.progressions.get_key_value(&rules.npc_progression) {
                acc.add(levels, name, spec);
            }
        }
        return acc;
    }

    for (_, class) in record.classes() {
        let Some(progression) = class.powercasting.get(&track) else {
            continue;
        };
        if class.levels == 0 {
            continue;
        }
        if let Some((name, spec)) = rules.progressions.get_key_value(progression) {
            acc.add(class.levels, name, spec);
        }
    }
    acc
}

pub(super) fn derive_powercasting(
    record: &ActorRecord,
    modifiers: &ModifierMap,
    config: &RulesetConfig,
    abilities: &BTreeMap<AbilityId, Ability>,
) -> BTreeMap<CasterTrack, Powercasting> {
    let mut out = BTreeMap::new();

    for (&track, rules) in &config.caster_tracks {
        let acc = accumulate(record, track, rules);
        let Some((_, limit_name, limit_spec)) = acc.limit else {
            continue;
        };

        let best_mod = rules
            .point_abilities
            .iter()
            .filter_map(|id| abilities.get(id))
            .map(|a| a.modifier)
            .max()
            .unwrap_or(0);

        let mut points = acc.points.floor() as i32;
        if acc.caster_level > 0.0 {
            points = points.saturating_add(best_mod);
        }
        points = points.max(0);
        if rules.halve_points {
            points /= 2;
        }
        let max = modifiers
            .int(&format!("attributes.{track}.points.max"), points)
            .max(0) as u32;

        let max_power_level = lookup(&rules.max_power_level, acc.caster_level.floor() as usize)
            .min(limit_spec.max_power_level);

        let stored = record.attributes.points.get(&track).copied();
        let current = match (record.kind, stored) {
            (ActorKind::Npc, None) => max,
            (_, stored) => stored.unwrap_or(0),
        };

        out.insert(
            track,
            Powercasting {
                track,
                caster_level: acc.caster_level,
                points: ResourcePool::new(PoolKind::Points(track), current, max),
                known: acc.known,
                max_power_level,
                levels: rules.power_levels(acc.caster_level.floor() as usize, max_power_level),
                limit: Some(limit_name.to_owned()),
            },
        );
    }

    out
}
