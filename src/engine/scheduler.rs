//! The campaign day pump: initiative, faction slots, conflict drain, and the
//! end-of-day cycle, exposed as a cooperative state machine the host drives.

use rand::Rng;
use rand::rngs::SmallRng;
use tracing::{debug, info, warn};

use crate::consts;
use crate::engine::ai;
use crate::engine::autoresolve::auto_resolve;
use crate::engine::context::{BattleContext, BattleOutcome, Objective};
use crate::engine::graph::CampaignGraph;
use crate::engine::resolver::{self, BattleReport, ResolveError};
use crate::model::World;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnSlot {
    Faction(i64),
    /// The player acting outside any faction command structure.
    Independent,
}

/// What the host must do next.
#[derive(Debug)]
pub enum Step {
    /// The player's slot is up; act, then call `end_player_turn`.
    AwaitPlayerTurn,
    /// A battle involving the player is due. Fight or auto-resolve it, then
    /// call `submit_battle` with the outcome.
    AwaitBattle(BattleContext),
    /// The named day finished and the world rolled over to the next.
    DayComplete(u32),
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    StartOfDay,
    Slots { index: usize },
    WaitingPlayer { index: usize },
    Conflicts,
    WaitingBattle,
}

#[derive(Debug)]
pub struct TurnScheduler {
    graph: CampaignGraph,
    order: Vec<TurnSlot>,
    phase: Phase,
    /// Battles whose resolution failed today; they stay queued and are
    /// retried on a later day rather than being dropped.
    stalled: Vec<i64>,
}

impl TurnScheduler {
    pub fn new(graph: CampaignGraph) -> Self {
        Self {
            graph,
            order: Vec::new(),
            phase: Phase::StartOfDay,
            stalled: Vec::new(),
        }
    }

    pub fn graph(&self) -> &CampaignGraph {
        &self.graph
    }

    /// Current initiative order; empty before the first roll.
    pub fn initiative_order(&self) -> &[TurnSlot] {
        &self.order
    }

    /// Advance until the host is needed or the day completes.
    pub fn step(&mut self, world: &mut World, rng: &mut SmallRng) -> Step {
        loop {
            match self.phase {
                Phase::StartOfDay => {
                    self.stalled.clear();
                    if self.order.is_empty() || initiative_day(world.current_day) {
                        self.order = roll_initiative(world, rng);
                        info!(day = world.current_day, slots = self.order.len(), "initiative rolled");
                    } else {
                        self.order
                            .retain(|slot| slot_alive(world, *slot));
                    }
                    self.phase = Phase::Slots { index: 0 };
                }
                Phase::Slots { index } => {
                    if index >= self.order.len() {
                        self.phase = Phase::Conflicts;
                        continue;
                    }
                    match self.order[index] {
                        TurnSlot::Independent => {
                            if world.player().is_some() {
                                self.phase = Phase::WaitingPlayer { index };
                                return Step::AwaitPlayerTurn;
                            }
                            self.phase = Phase::Slots { index: index + 1 };
                        }
                        TurnSlot::Faction(faction) => {
                            if !world.factions.contains_key(&faction) {
                                self.phase = Phase::Slots { index: index + 1 };
                                continue;
                            }
                            let leader = world.faction(faction).leader;
                            if world.officer(leader).is_player {
                                self.phase = Phase::WaitingPlayer { index };
                                return Step::AwaitPlayerTurn;
                            }
                            ai::take_faction_turn(world, &self.graph, faction);
                            self.phase = Phase::Slots { index: index + 1 };
                        }
                    }
                }
                Phase::WaitingPlayer { .. } => return Step::AwaitPlayerTurn,
                Phase::Conflicts => {
                    let next = world
                        .pending_battles
                        .iter()
                        .find(|b| !self.stalled.contains(&b.target));
                    let Some(battle) = next else {
                        let finished = world.current_day;
                        end_of_day(world, rng);
                        self.phase = Phase::StartOfDay;
                        return Step::DayComplete(finished);
                    };
                    let target = battle.target;
                    let ctx = BattleContext::build(world, target, rng);
                    if ctx.has_player() || ctx.objective == Objective::ChooseYourSide {
                        self.phase = Phase::WaitingBattle;
                        return Step::AwaitBattle(ctx);
                    }
                    let outcome = auto_resolve(&ctx, rng);
                    // A failed resolution writes nothing; the battle stays
                    // queued and is revisited on a later day.
                    if let Err(err) = resolver::resolve(world, ctx, outcome) {
                        warn!(target, %err, "battle resolution failed, staying queued");
                        self.stalled.push(target);
                    }
                }
                // A context was handed out; the host resolves it out-of-band.
                // Stepping again reissues a fresh snapshot of the same battle.
                Phase::WaitingBattle => {
                    let next = world
                        .pending_battles
                        .iter()
                        .find(|b| !self.stalled.contains(&b.target));
                    let Some(battle) = next else {
                        self.phase = Phase::Conflicts;
                        continue;
                    };
                    warn!(target = battle.target, "reissuing battle context");
                    let ctx = BattleContext::build(world, battle.target, rng);
                    return Step::AwaitBattle(ctx);
                }
            }
        }
    }

    /// Finish the player's slot and hand the day back to the scheduler.
    pub fn end_player_turn(&mut self) {
        if let Phase::WaitingPlayer { index } = self.phase {
            self.phase = Phase::Slots { index: index + 1 };
        }
    }

    /// Apply a host-fought battle and resume the conflict drain.
    pub fn submit_battle(
        &mut self,
        world: &mut World,
        ctx: BattleContext,
        outcome: BattleOutcome,
    ) -> Result<BattleReport, ResolveError> {
        self.phase = Phase::Conflicts;
        resolver::resolve(world, ctx, outcome)
    }
}

/// Initiative re-rolls on day 1 and every `INITIATIVE_PERIOD` days after.
fn initiative_day(day: u32) -> bool {
    (day.max(1) - 1) % consts::INITIATIVE_PERIOD == 0
}

fn slot_alive(world: &World, slot: TurnSlot) -> bool {
    match slot {
        TurnSlot::Faction(faction) => world.factions.contains_key(&faction),
        TurnSlot::Independent => world.player().is_some(),
    }
}

/// Score every faction (and the player, when they answer to no one) and sort
/// the lot together, best first.
fn roll_initiative(world: &World, rng: &mut SmallRng) -> Vec<TurnSlot> {
    let mut scored: Vec<(f32, i64, TurnSlot)> = Vec::new();

    for faction in world.factions.values() {
        let mut best_int = 0;
        let mut best_lead = 0;
        for id in world.officers_of(faction.id) {
            let officer = world.officer(id);
            best_int = best_int.max(officer.intelligence);
            best_lead = best_lead.max(officer.leadership);
        }
        let score = best_int as f32 + 0.5 * best_lead as f32 + rng.random_range(-10.0..=10.0);
        scored.push((score, faction.id, TurnSlot::Faction(faction.id)));
    }

    if let Some(player) = world.player() {
        let leads_faction = world.factions.values().any(|f| f.leader == player);
        if !leads_faction {
            let officer = world.officer(player);
            let score = officer.intelligence as f32
                + 0.5 * officer.leadership as f32
                + rng.random_range(-10.0..=10.0);
            scored.push((score, i64::MAX, TurnSlot::Independent));
        }
    }

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal).then(a.1.cmp(&b.1)));
    scored.into_iter().map(|(_, _, slot)| slot).collect()
}

/// Everything that happens after the last battle of the day.
fn end_of_day(world: &mut World, rng: &mut SmallRng) {
    run_decay(world);
    if world.current_day % consts::HARVEST_PERIOD == 0 {
        run_harvest(world);
    }
    ai::take_ronin_turns(world, rng);
    run_troop_regen(world);
    for officer in world.officers.values_mut() {
        officer.ap = officer.max_ap;
    }
    world.current_day += 1;
    debug!(day = world.current_day, "day rolled over");
}

/// Owned cities with no garrison drift back to neutrality.
fn run_decay(world: &mut World) {
    let city_ids: Vec<i64> = world.cities.keys().copied().collect();
    for id in city_ids {
        let Some(owner) = world.city(id).owner else {
            continue;
        };
        let garrisoned = world
            .officers_at(id)
            .iter()
            .any(|&o| world.officer(o).faction == Some(owner));
        let city = world.city_mut(id);
        if garrisoned {
            city.decay_turns = 0;
        } else {
            city.decay_turns += 1;
            if city.decay_turns >= consts::DECAY_TURNS {
                info!(city = id, faction = owner, "ungarrisoned city reverts to neutral");
                city.owner = None;
                city.governor = None;
                city.is_hq = false;
                city.decay_turns = 0;
            }
        }
    }
}

/// Monthly income: commerce pays gold, agriculture pays supplies, both scaled
/// by public order. Restless cities yield nothing.
fn run_harvest(world: &mut World) {
    let faction_ids: Vec<i64> = world.factions.keys().copied().collect();
    for faction in faction_ids {
        let mut gold: i64 = 0;
        let mut supplies: i64 = 0;
        for city_id in world.cities_of(faction) {
            let city = world.city(city_id);
            if city.public_order < consts::HARVEST_MIN_ORDER {
                continue;
            }
            let order = city.public_order as i64;
            gold += city.commerce as i64 * order / 100;
            supplies += city.agriculture as i64 * 10 * order / 100;
        }
        let record = world.faction_mut(faction);
        record.gold += gold;
        record.supplies += supplies;
        debug!(faction, gold, supplies, "harvest collected");
    }
}

fn run_troop_regen(world: &mut World) {
    for officer in world.officers.values_mut() {
        if officer.faction.is_none() {
            continue;
        }
        let cap = officer.max_troops();
        if officer.troops < cap {
            let gain = ((cap as f32 * consts::TROOP_REGEN_FRAC) as u32)
                .max(consts::TROOP_REGEN_MIN);
            officer.troops = (officer.troops + gain).min(cap);
        }
    }
}
