//! Battle context assembly: a pure read of the world into a self-contained
//! snapshot that either simulator can consume.

use std::collections::BTreeMap;

use rand::Rng;
use rand::rngs::SmallRng;

use crate::consts;
use crate::model::{Formation, Officer, Rank, TroopType, World};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Attackers,
    Defenders,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Attackers => Side::Defenders,
            Side::Defenders => Side::Attackers,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Objective {
    /// Rout every enemy unit.
    Elimination,
    /// The player leads the assault; break the named enemy commander.
    Assassination { target: i64, name: String },
    /// The player defends; survive until the attackers break.
    HoldTheLine,
    /// The player is present but uncommitted.
    ChooseYourSide,
}

/// A battle-local officer snapshot. Synthetic combatants (militia) carry
/// non-positive ids and never receive persistent writes.
#[derive(Debug, Clone, PartialEq)]
pub struct Combatant {
    pub officer_id: i64,
    pub name: String,
    pub faction: Option<i64>,
    pub leadership: i32,
    pub intelligence: i32,
    pub strength: i32,
    pub politics: i32,
    pub charisma: i32,
    pub rank: Rank,
    pub troops: u32,
    pub troop_type: TroopType,
    pub officer_type: TroopType,
    pub formation: Formation,
    pub morale: i32,
    pub is_player: bool,
}

impl Combatant {
    pub fn is_synthetic(&self) -> bool {
        self.officer_id <= 0
    }

    fn from_officer(officer: &Officer, rng: &mut SmallRng) -> Self {
        Combatant {
            officer_id: officer.id,
            name: officer.name.clone(),
            faction: officer.faction,
            leadership: officer.leadership,
            intelligence: officer.intelligence,
            strength: officer.strength,
            politics: officer.politics,
            charisma: officer.charisma,
            rank: officer.rank,
            troops: officer.troops,
            troop_type: officer
                .troop_type
                .unwrap_or_else(|| roll_troop_type(officer, rng)),
            officer_type: officer
                .officer_type
                .unwrap_or_else(|| roll_officer_type(officer, rng)),
            formation: officer.formation,
            morale: officer.morale,
            is_player: officer.is_player,
        }
    }
}

/// Result of a battle, however it was fought. `survivors` maps each real
/// participant to its remaining troop count.
#[derive(Debug, Clone, PartialEq)]
pub struct BattleOutcome {
    pub attackers_won: bool,
    pub survivors: BTreeMap<i64, u32>,
}

/// Everything a simulator needs, detached from the world. Consumed by value
/// on resolution, so a fought battle cannot be applied twice.
#[derive(Debug, Clone)]
pub struct BattleContext {
    pub target: i64,
    pub source: Option<i64>,
    pub city_name: String,
    pub defender_faction: Option<i64>,
    pub attacker_faction: Option<i64>,
    /// Declaring officer, when the battle came from a pending declaration.
    pub leader: Option<i64>,
    pub attackers: Vec<Combatant>,
    pub defenders: Vec<Combatant>,
    /// Present but uncommitted officers; ignored by the simulators.
    pub bystanders: Vec<Combatant>,
    pub objective: Objective,
}

impl BattleContext {
    /// Assemble the context for a battle at `target`. Reads the pending
    /// declaration if one exists; never writes to the world.
    ///
    /// # Panics
    /// Panics if `target` is not a city.
    pub fn build(world: &World, target: i64, rng: &mut SmallRng) -> BattleContext {
        let city = world.city(target);
        let pending = world.pending_at(target);
        let source = pending.and_then(|b| b.source);
        let leader = pending.map(|b| b.leader);
        let defender_faction = city.owner;

        // Candidate pool: everyone at the target, then the attacker's
        // reinforcement ring (source city plus one hop out). First sighting
        // wins on duplicates.
        let mut candidate_ids = world.officers_at(target);
        let attacker_faction = match pending {
            Some(battle) => Some(battle.attacker_faction),
            None => candidate_ids
                .iter()
                .filter_map(|&id| world.officer(id).faction)
                .find(|&f| Some(f) != defender_faction),
        };

        if let Some(attacker) = attacker_faction {
            let mut ring: Vec<i64> = source.into_iter().collect();
            ring.extend(world.neighbors(target));
            for ring_city in ring {
                for id in world.officers_at(ring_city) {
                    let officer = world.officer(id);
                    if officer.faction == Some(attacker) && !candidate_ids.contains(&id) {
                        candidate_ids.push(id);
                    }
                }
            }
        }

        let mut attackers = Vec::new();
        let mut defenders = Vec::new();
        let mut bystanders = Vec::new();
        for id in candidate_ids {
            let officer = world.officer(id);
            if officer.troops == 0 {
                continue;
            }
            let combatant = Combatant::from_officer(officer, rng);
            if officer.faction.is_some() && officer.faction == defender_faction {
                defenders.push(combatant);
            } else if officer.faction.is_some() && officer.faction == attacker_faction {
                attackers.push(combatant);
            } else {
                bystanders.push(combatant);
            }
        }

        // An unclaimed city with no standing garrison raises a militia.
        if defender_faction.is_none() && defenders.is_empty() {
            let count = rng.random_range(consts::MILITIA_MIN..=consts::MILITIA_MAX);
            for i in 0..count {
                defenders.push(militia_guard(-100 - i as i64));
            }
        }

        // Rare third-party joins; the player always chooses for themself.
        let mut committed = Vec::new();
        for (index, bystander) in bystanders.iter().enumerate() {
            if bystander.is_player {
                continue;
            }
            if !rng.random_bool(consts::RONIN_CONSIDER_CHANCE) {
                continue;
            }
            let toward_attackers = mean_relation(world, bystander.officer_id, &attackers);
            let toward_defenders = mean_relation(world, bystander.officer_id, &defenders);
            let threshold = if bystander.faction.is_some() {
                consts::MERCENARY_JOIN_THRESHOLD
            } else {
                consts::RONIN_JOIN_THRESHOLD
            };
            if toward_attackers > threshold && toward_attackers > toward_defenders {
                committed.push((index, Side::Attackers));
            } else if toward_defenders > threshold && toward_defenders > toward_attackers {
                committed.push((index, Side::Defenders));
            }
        }
        for &(index, side) in committed.iter().rev() {
            let combatant = bystanders.remove(index);
            match side {
                Side::Attackers => attackers.push(combatant),
                Side::Defenders => defenders.push(combatant),
            }
        }

        let objective = pick_objective(&attackers, &defenders, &bystanders);

        BattleContext {
            target,
            source,
            city_name: city.name.clone(),
            defender_faction,
            attacker_faction,
            leader,
            attackers,
            defenders,
            bystanders,
            objective,
        }
    }

    pub fn side_of(&self, officer_id: i64) -> Option<Side> {
        if self.attackers.iter().any(|c| c.officer_id == officer_id) {
            Some(Side::Attackers)
        } else if self.defenders.iter().any(|c| c.officer_id == officer_id) {
            Some(Side::Defenders)
        } else {
            None
        }
    }

    pub fn side(&self, side: Side) -> &[Combatant] {
        match side {
            Side::Attackers => &self.attackers,
            Side::Defenders => &self.defenders,
        }
    }

    /// Commit a bystander (typically the player) to a side.
    /// Returns false if the officer is not on the bystander list.
    pub fn join_side(&mut self, officer_id: i64, side: Side) -> bool {
        let Some(index) = self
            .bystanders
            .iter()
            .position(|c| c.officer_id == officer_id)
        else {
            return false;
        };
        let combatant = self.bystanders.remove(index);
        match side {
            Side::Attackers => self.attackers.push(combatant),
            Side::Defenders => self.defenders.push(combatant),
        }
        true
    }

    pub fn has_player(&self) -> bool {
        self.attackers
            .iter()
            .chain(self.defenders.iter())
            .any(|c| c.is_player)
    }
}

fn pick_objective(
    attackers: &[Combatant],
    defenders: &[Combatant],
    bystanders: &[Combatant],
) -> Objective {
    if attackers.iter().any(|c| c.is_player) {
        if let Some(champion) = defenders.iter().max_by_key(|c| c.leadership) {
            return Objective::Assassination {
                target: champion.officer_id,
                name: champion.name.clone(),
            };
        }
        return Objective::Elimination;
    }
    if defenders.iter().any(|c| c.is_player) {
        return Objective::HoldTheLine;
    }
    if bystanders.iter().any(|c| c.is_player) {
        return Objective::ChooseYourSide;
    }
    Objective::Elimination
}

/// Mean opinion toward a roster, skipping synthetic members. An all-synthetic
/// roster reads 0, which can never clear a join threshold.
fn mean_relation(world: &World, officer_id: i64, roster: &[Combatant]) -> f64 {
    let real: Vec<i64> = roster
        .iter()
        .filter(|c| !c.is_synthetic())
        .map(|c| c.officer_id)
        .collect();
    if real.is_empty() {
        return 0.0;
    }
    let total: i32 = real
        .iter()
        .map(|&other| world.relations.officers(officer_id, other))
        .sum();
    f64::from(total) / real.len() as f64
}

fn militia_guard(id: i64) -> Combatant {
    Combatant {
        officer_id: id,
        name: "Militia Guard".to_string(),
        faction: None,
        leadership: 40,
        intelligence: 30,
        strength: 40,
        politics: 20,
        charisma: 30,
        rank: Rank::Volunteer,
        troops: consts::MILITIA_TROOPS,
        troop_type: TroopType::Infantry,
        officer_type: TroopType::Infantry,
        formation: Formation::Vanguard,
        morale: 60,
        is_player: false,
    }
}

/// Weighted troop-type roll for officers without an assigned type.
fn roll_troop_type(officer: &Officer, rng: &mut SmallRng) -> TroopType {
    let mut weights = base_weights();
    if officer.intelligence > 70 {
        weights[1].1 += 50; // Archer
    }
    if officer.strength > 70 {
        weights[2].1 += 50; // Cavalry
    }
    if officer.leadership > 80 {
        weights[4].1 += 30; // Elite
    }
    if officer.intelligence > 50 && officer.politics > 50 {
        weights[3].1 += 20; // Siege
    }
    weighted_pick(&weights, rng)
}

/// Same table, skewed toward the officer's stronger martial inclination.
fn roll_officer_type(officer: &Officer, rng: &mut SmallRng) -> TroopType {
    let mut weights = base_weights();
    if officer.strength > officer.intelligence {
        weights[0].1 *= 2; // Infantry
        weights[2].1 *= 2; // Cavalry
    } else {
        weights[1].1 *= 2; // Archer
        weights[3].1 *= 2; // Siege
    }
    weighted_pick(&weights, rng)
}

fn base_weights() -> [(TroopType, u32); 5] {
    [
        (TroopType::Infantry, 40),
        (TroopType::Archer, 25),
        (TroopType::Cavalry, 25),
        (TroopType::Siege, 5),
        (TroopType::Elite, 5),
    ]
}

fn weighted_pick(weights: &[(TroopType, u32)], rng: &mut SmallRng) -> TroopType {
    let total: u32 = weights.iter().map(|(_, w)| w).sum();
    let mut roll = rng.random_range(0..total);
    for &(kind, weight) in weights {
        if roll < weight {
            return kind;
        }
        roll -= weight;
    }
    TroopType::Infantry
}
