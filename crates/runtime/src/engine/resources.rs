//! Direct spend and roll operations outside of rests.
//!
//! Every operation runs one derivation pass, computes its change, and writes
//! at most one record update and one item batch.

use std::collections::BTreeSet;

use rules_core::pools::roll_pool_die;
use rules_core::{
    ActorId, ActorUpdate, CasterTrack, Derivation, DicePool, DieRoll, DieSelection,
    InsufficientResource, ResourcePool, Subsystem,
};

use super::RulesEngine;
use crate::api::{Decision, DieChoicePrompt, Result, RuntimeError};

impl RulesEngine {
    /// Spend one hit die and add it, plus the hit-die ability modifier, to HP.
    pub async fn roll_hit_die(
        &self,
        id: &ActorId,
        selection: Option<DieSelection>,
    ) -> Result<DieRoll> {
        let derivation = self.derivation(id).await?;
        let pool = DicePool::hit_dice(&derivation.record);
        let mut hp = derivation.actor.hp.pool;
        let bonus = derivation.actor.ability_mod(&self.config().hit_die_ability);

        let (roll, pool) = self.roll_into(id, pool, selection, bonus, &mut hp).await?;
        let update = ActorUpdate {
            hp: Some(hp.current() as i32),
            ..Default::default()
        };
        self.persist(id, &derivation, update, &pool.item_updates())
            .await?;
        Ok(roll)
    }

    /// Spend one hull die into hull points.
    pub async fn roll_hull_die(
        &self,
        id: &ActorId,
        selection: Option<DieSelection>,
    ) -> Result<DieRoll> {
        let derivation = self.derivation(id).await?;
        require_starship(id, &derivation)?;
        let pool = DicePool::hull_dice(&derivation.record, self.config());
        let mut hull = derivation.actor.hp.pool;
        let bonus = derivation.actor.ability_mod(&self.config().hit_die_ability);

        let (roll, pool) = self.roll_into(id, pool, selection, bonus, &mut hull).await?;
        let update = ActorUpdate {
            hp: Some(hull.current() as i32),
            ..Default::default()
        };
        self.persist(id, &derivation, update, &pool.item_updates())
            .await?;
        Ok(roll)
    }

    /// Spend one shield die into shield points. Shield dice add no modifier.
    pub async fn roll_shield_die(
        &self,
        id: &ActorId,
        selection: Option<DieSelection>,
    ) -> Result<DieRoll> {
        let derivation = self.derivation(id).await?;
        let mut shields = require_starship(id, &derivation)?.shield_points;
        let pool = DicePool::shield_dice(&derivation.record, self.config());

        let (roll, pool) = self.roll_into(id, pool, selection, 0, &mut shields).await?;
        let update = ActorUpdate {
            shield_points: Some(shields.current()),
            ..Default::default()
        };
        self.persist(id, &derivation, update, &pool.item_updates())
            .await?;
        Ok(roll)
    }

    /// Expend one power die from a subsystem.
    pub async fn expend_power_die(
        &self,
        id: &ActorId,
        subsystem: Subsystem,
    ) -> Result<ResourcePool> {
        let derivation = self.derivation(id).await?;
        let ship = require_starship(id, &derivation)?;
        let mut pool = ship
            .power_dice
            .get(&subsystem)
            .copied()
            .ok_or_else(|| RuntimeError::NoSuchResource {
                actor: id.clone(),
                resource: format!("{subsystem} power dice"),
            })?;
        pool.spend(1)?;

        let mut update = ActorUpdate::default();
        update.power_dice.insert(subsystem, pool.current());
        self.persist(id, &derivation, update, &[]).await?;
        tracing::debug!(actor = %id, pool = %pool.kind, current = pool.current(), "expended power die");
        Ok(pool)
    }

    /// Spend force or tech points.
    pub async fn spend_powercasting_points(
        &self,
        id: &ActorId,
        track: CasterTrack,
        amount: u32,
    ) -> Result<ResourcePool> {
        let derivation = self.derivation(id).await?;
        let mut pool = derivation
            .actor
            .powercasting
            .get(&track)
            .map(|casting| casting.points)
            .ok_or_else(|| RuntimeError::NoSuchResource {
                actor: id.clone(),
                resource: format!("{track} points"),
            })?;
        pool.spend(amount)?;

        let mut update = ActorUpdate::default();
        update.points.insert(track, pool.current());
        self.persist(id, &derivation, update, &[]).await?;
        tracing::debug!(actor = %id, pool = %pool.kind, spent = amount, current = pool.current(), "spent points");
        Ok(pool)
    }

    pub async fn spend_superiority_die(&self, id: &ActorId) -> Result<ResourcePool> {
        let derivation = self.derivation(id).await?;
        let mut pool = derivation
            .actor
            .superiority
            .as_ref()
            .map(|superiority| superiority.dice)
            .ok_or_else(|| RuntimeError::NoSuchResource {
                actor: id.clone(),
                resource: "superiority dice".to_owned(),
            })?;
        pool.spend(1)?;

        let update = ActorUpdate {
            superiority_dice: Some(pool.current()),
            ..Default::default()
        };
        self.persist(id, &derivation, update, &[]).await?;
        tracing::debug!(actor = %id, current = pool.current(), "spent superiority die");
        Ok(pool)
    }

    /// Resolve the die choice, then spend and roll it into `target`.
    ///
    /// Without an explicit selection the user is asked only when the pool
    /// holds more than one available denomination.
    async fn roll_into(
        &self,
        id: &ActorId,
        mut pool: DicePool,
        selection: Option<DieSelection>,
        bonus: i32,
        target: &mut ResourcePool,
    ) -> Result<(DieRoll, DicePool)> {
        if pool.available() == 0 {
            return Err(InsufficientResource {
                pool: pool.kind,
                requested: 1,
                available: 0,
            }
            .into());
        }

        let selection = match selection {
            Some(selection) => selection,
            None => {
                let denominations: BTreeSet<u32> = pool
                    .buckets()
                    .iter()
                    .filter(|b| b.available() > 0)
                    .map(|b| b.denomination)
                    .collect();
                if denominations.len() > 1 {
                    let prompt = DieChoicePrompt {
                        actor: id.clone(),
                        pool: pool.kind,
                        buckets: pool.buckets().to_vec(),
                    };
                    match self.decisions.choose_die(&prompt).await {
                        Decision::Chosen(selection) => selection,
                        Decision::Cancelled => return Err(RuntimeError::Cancelled),
                    }
                } else {
                    DieSelection::default()
                }
            }
        };

        let roll = roll_pool_die(&mut pool, &selection, bonus, target, self.roller.as_ref())?;
        tracing::debug!(
            actor = %id,
            pool = %roll.pool,
            denomination = roll.denomination,
            roll = roll.roll.total,
            gained = roll.gained,
            "rolled pool die"
        );
        Ok((roll, pool))
    }
}

fn require_starship<'a>(
    id: &ActorId,
    derivation: &'a Derivation,
) -> Result<&'a rules_core::derive::StarshipBlock> {
    derivation
        .actor
        .starship
        .as_ref()
        .ok_or_else(|| RuntimeError::NotAStarship {
            actor: id.clone(),
            kind: derivation.actor.kind,
        })
}
