//! Applies a battle outcome to the world as one validated batch.

use thiserror::Error;
use tracing::{info, warn};

use crate::consts;
use crate::engine::actions;
use crate::engine::context::{BattleContext, BattleOutcome, Combatant};
use crate::model::{Rank, World};

#[derive(Debug, Error, PartialEq)]
pub enum ResolveError {
    #[error("battle site {0} is not a known city")]
    UnknownCity(i64),
    #[error("combatant {0} is not a known officer")]
    UnknownOfficer(i64),
    #[error("survivor row {0} names an unknown officer")]
    UnknownSurvivor(i64),
    #[error("faction {0} no longer exists")]
    MissingFaction(i64),
}

/// Summary of applied consequences, for host UI and logs.
#[derive(Debug, Clone, PartialEq)]
pub struct BattleReport {
    pub attackers_won: bool,
    /// `Some(new_owner)` when ownership changed; `Some(None)` is a reversion
    /// to neutral.
    pub city_flipped_to: Option<Option<i64>>,
    pub loot_per_winner: i64,
    pub eliminated_faction: Option<i64>,
    pub promoted: Vec<i64>,
}

/// One mutation of the world. Planning may fail; applying may not, so a
/// resolution lands fully or not at all.
#[derive(Debug, Clone)]
enum WorldOp {
    SetCityOwner { city: i64, owner: Option<i64> },
    SetGovernor { city: i64, governor: Option<i64> },
    ResetDecay { city: i64 },
    MoveOfficer { officer: i64, city: i64 },
    SetTroops { officer: i64, troops: u32 },
    AddGold { officer: i64, delta: i64 },
    AddReputation { officer: i64, delta: i32 },
    TallyWin { officer: i64 },
    TallyLoss { officer: i64 },
    AdjustOfficerFaction { officer: i64, faction: i64, delta: i32 },
    FreeOfficer { officer: i64 },
    PurgeFactionRelations { faction: i64 },
    RemovePendingOfFaction { faction: i64 },
    RemovePendingAt { city: i64 },
    RemoveFaction { faction: i64 },
    RaiseApCap { officer: i64 },
}

impl WorldOp {
    fn apply(&self, world: &mut World) {
        match *self {
            WorldOp::SetCityOwner { city, owner } => world.city_mut(city).owner = owner,
            WorldOp::SetGovernor { city, governor } => world.city_mut(city).governor = governor,
            WorldOp::ResetDecay { city } => world.city_mut(city).decay_turns = 0,
            WorldOp::MoveOfficer { officer, city } => world.officer_mut(officer).location = city,
            WorldOp::SetTroops { officer, troops } => world.officer_mut(officer).set_troops(troops),
            WorldOp::AddGold { officer, delta } => {
                let gold = &mut world.officer_mut(officer).gold;
                *gold = (*gold + delta).max(0);
            }
            WorldOp::AddReputation { officer, delta } => {
                world.officer_mut(officer).reputation += delta
            }
            WorldOp::TallyWin { officer } => world.officer_mut(officer).battles_won += 1,
            WorldOp::TallyLoss { officer } => world.officer_mut(officer).battles_lost += 1,
            WorldOp::AdjustOfficerFaction {
                officer,
                faction,
                delta,
            } => world.relations.adjust_officer_faction(officer, faction, delta),
            WorldOp::FreeOfficer { officer } => {
                let o = world.officer_mut(officer);
                o.faction = None;
                o.rank = Rank::Free;
                let troops = o.troops;
                o.set_troops(troops);
            }
            WorldOp::PurgeFactionRelations { faction } => world.relations.purge_faction(faction),
            WorldOp::RemovePendingOfFaction { faction } => world
                .pending_battles
                .retain(|b| b.attacker_faction != faction),
            WorldOp::RemovePendingAt { city } => world.remove_pending_at(city),
            WorldOp::RemoveFaction { faction } => {
                world.factions.remove(&faction);
            }
            WorldOp::RaiseApCap { officer } => {
                let o = world.officer_mut(officer);
                o.max_ap = (o.max_ap + 1).min(consts::ACTION_POINT_CAP);
            }
        }
    }
}

fn real_ids(roster: &[Combatant]) -> Vec<i64> {
    roster
        .iter()
        .filter(|c| !c.is_synthetic())
        .map(|c| c.officer_id)
        .collect()
}

/// Apply a fought battle to the world. Consumes the context, so an outcome
/// can only ever land once. Every validation failure returns before the
/// first write.
pub fn resolve(
    world: &mut World,
    ctx: BattleContext,
    outcome: BattleOutcome,
) -> Result<BattleReport, ResolveError> {
    // -- validation ---------------------------------------------------------
    if !world.cities.contains_key(&ctx.target) {
        return Err(ResolveError::UnknownCity(ctx.target));
    }
    for combatant in ctx.attackers.iter().chain(ctx.defenders.iter()) {
        if !combatant.is_synthetic() && !world.officers.contains_key(&combatant.officer_id) {
            return Err(ResolveError::UnknownOfficer(combatant.officer_id));
        }
    }
    for &id in outcome.survivors.keys() {
        if id > 0 && !world.officers.contains_key(&id) {
            return Err(ResolveError::UnknownSurvivor(id));
        }
    }
    for faction in [ctx.attacker_faction, ctx.defender_faction]
        .into_iter()
        .flatten()
    {
        if !world.factions.contains_key(&faction) {
            return Err(ResolveError::MissingFaction(faction));
        }
    }

    // -- planning -----------------------------------------------------------
    let mut ops: Vec<WorldOp> = Vec::new();
    let mut report = BattleReport {
        attackers_won: outcome.attackers_won,
        city_flipped_to: None,
        loot_per_winner: 0,
        eliminated_faction: None,
        promoted: Vec::new(),
    };

    let (winner_faction, loser_faction, winner_roster, loser_roster) = if outcome.attackers_won {
        (
            ctx.attacker_faction,
            ctx.defender_faction,
            &ctx.attackers,
            &ctx.defenders,
        )
    } else {
        (
            ctx.defender_faction,
            ctx.attacker_faction,
            &ctx.defenders,
            &ctx.attackers,
        )
    };
    let winners = real_ids(winner_roster);
    let losers = real_ids(loser_roster);

    ops.push(WorldOp::RemovePendingAt { city: ctx.target });

    // 1. Ownership flip. An independent winning side reverts the city to
    // neutral rather than claiming it.
    let former_owner = world.city(ctx.target).owner;
    let city_flipped = former_owner != winner_faction;
    if city_flipped {
        ops.push(WorldOp::SetCityOwner {
            city: ctx.target,
            owner: winner_faction,
        });
        ops.push(WorldOp::SetGovernor {
            city: ctx.target,
            governor: None,
        });
        ops.push(WorldOp::ResetDecay { city: ctx.target });
        report.city_flipped_to = Some(winner_faction);
        if let (Some(former), Some(conqueror)) = (former_owner, winner_faction) {
            for id in world.officers_at(ctx.target) {
                if world.officer(id).faction == Some(former) {
                    ops.push(WorldOp::AdjustOfficerFaction {
                        officer: id,
                        faction: conqueror,
                        delta: consts::CONQUEST_OPINION_PENALTY,
                    });
                }
            }
        }
    }

    // 2. Loot and reputation. Losers still fought; they take a smaller gain.
    let mut pool: i64 = 0;
    for &id in &losers {
        let tithe = (world.officer(id).gold as f64 * consts::LOOT_FRACTION) as i64;
        pool += tithe;
        ops.push(WorldOp::AddGold {
            officer: id,
            delta: -tithe,
        });
        ops.push(WorldOp::TallyLoss { officer: id });
        ops.push(WorldOp::AddReputation {
            officer: id,
            delta: consts::DEFEAT_REP,
        });
    }
    let toppled_notable = loser_roster
        .iter()
        .any(|c| !c.is_synthetic() && c.rank.level() >= consts::TOP_RANK_LEVEL);
    let rep_gain = consts::VICTORY_REP
        + if toppled_notable {
            consts::UPSET_VICTORY_REP
        } else {
            0
        };
    let share = if winners.is_empty() {
        0
    } else {
        pool / winners.len() as i64
    };
    report.loot_per_winner = share;
    for &id in &winners {
        ops.push(WorldOp::AddGold {
            officer: id,
            delta: share,
        });
        ops.push(WorldOp::TallyWin { officer: id });
        ops.push(WorldOp::AddReputation {
            officer: id,
            delta: rep_gain,
        });
    }

    // 3. Troop write-back.
    for (&id, &troops) in &outcome.survivors {
        if id > 0 {
            ops.push(WorldOp::SetTroops { officer: id, troops });
        }
    }

    // 4. Officer movement after a conquest.
    if outcome.attackers_won && city_flipped {
        if let Some(conqueror) = winner_faction {
            plan_occupation(world, &ctx, conqueror, &winners, &mut ops);
        }
    }

    // 5. Loser faction: elimination cascade or retreat.
    if let Some(beaten) = loser_faction {
        let mut remaining = world.cities_of(beaten);
        if city_flipped {
            remaining.retain(|&c| c != ctx.target);
        }
        if remaining.is_empty() {
            info!(faction = beaten, "faction eliminated");
            report.eliminated_faction = Some(beaten);
            for id in world.officers_of(beaten) {
                ops.push(WorldOp::FreeOfficer { officer: id });
            }
            ops.push(WorldOp::PurgeFactionRelations { faction: beaten });
            ops.push(WorldOp::RemovePendingOfFaction { faction: beaten });
            ops.push(WorldOp::RemoveFaction { faction: beaten });
            if let Some(victor) = winner_faction {
                let leader = world.faction(victor).leader;
                if world.officer(leader).is_player {
                    ops.push(WorldOp::RaiseApCap { officer: leader });
                }
            }
        } else {
            // Every faction officer standing in the lost city pulls back,
            // whether or not they took the field.
            let refuge = remaining[0];
            for id in world.officers_of(beaten) {
                if world.officer(id).location == ctx.target {
                    ops.push(WorldOp::MoveOfficer { officer: id, city: refuge });
                }
            }
        }
    }

    // -- apply --------------------------------------------------------------
    for op in &ops {
        op.apply(world);
    }

    // Promotion recheck for every surviving real participant; reputation
    // moved on both sides. Freed officers sit outside the ladder.
    for &id in winners.iter().chain(losers.iter()) {
        let before = world.officer(id).rank;
        actions::check_promotions(world, id);
        if world.officer(id).rank != before {
            report.promoted.push(id);
        }
    }
    info!(
        city = ctx.target,
        attackers_won = outcome.attackers_won,
        flipped = city_flipped,
        "battle resolved"
    );
    Ok(report)
}

/// Garrison a captured city: pick a governor, send the leader home, march
/// everyone else in.
fn plan_occupation(
    world: &World,
    ctx: &BattleContext,
    conqueror: i64,
    winners: &[i64],
    ops: &mut Vec<WorldOp>,
) {
    let leader = world.faction(conqueror).leader;
    let faction_winners: Vec<i64> = winners
        .iter()
        .copied()
        .filter(|&id| world.officer(id).faction == Some(conqueror))
        .collect();

    let governor = faction_winners
        .iter()
        .copied()
        .filter(|&id| id != leader)
        .max_by_key(|&id| {
            let o = world.officer(id);
            (o.rank.level(), o.politics)
        })
        .or_else(|| faction_winners.first().copied());

    let Some(governor) = governor else {
        return;
    };
    ops.push(WorldOp::SetGovernor {
        city: ctx.target,
        governor: Some(governor),
    });
    ops.push(WorldOp::MoveOfficer {
        officer: governor,
        city: ctx.target,
    });

    // The staging city keeps its sitting governor.
    let source_governor = ctx
        .source
        .and_then(|source| world.city(source).governor.map(|g| (g, source)));
    if let Some((sitting, source)) = source_governor {
        if sitting != governor && world.officers.contains_key(&sitting) {
            ops.push(WorldOp::MoveOfficer {
                officer: sitting,
                city: source,
            });
        }
    }

    if governor != leader && faction_winners.contains(&leader) {
        match world.faction_hq(conqueror) {
            Some(hq) => ops.push(WorldOp::MoveOfficer {
                officer: leader,
                city: hq,
            }),
            None => warn!(faction = conqueror, "no HQ for returning leader"),
        }
    }

    for &id in &faction_winners {
        if id == governor || id == leader {
            continue;
        }
        if source_governor.is_some_and(|(sitting, _)| sitting == id) {
            continue;
        }
        ops.push(WorldOp::MoveOfficer {
            officer: id,
            city: ctx.target,
        });
    }
}
