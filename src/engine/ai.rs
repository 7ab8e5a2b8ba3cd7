//! Background decision-making for AI factions and unaffiliated officers.

use rand::Rng;
use rand::rngs::SmallRng;
use tracing::debug;

use crate::consts;
use crate::engine::actions::{self, attack_troop_requirement};
use crate::engine::graph::CampaignGraph;
use crate::model::{Rank, World};

/// One faction's daily turn: at most a single attack declaration.
///
/// Targets are scanned along the faction's border; unclaimed cities are
/// preferred over enemy ones, and among enemy cities the thinnest garrison
/// wins. The strongest supplied officer on the border carries the attack.
pub fn take_faction_turn(world: &mut World, graph: &CampaignGraph, faction: i64) {
    if world.faction_has_pending(faction) {
        return;
    }

    // (priority, garrison strength, target, champion) — lower sorts first.
    let mut options: Vec<(u8, u32, i64, i64)> = Vec::new();
    for city in world.cities_of(faction) {
        if !graph.is_connected_to_hq(world, faction, city) {
            continue;
        }
        let champion = world
            .officers_at(city)
            .into_iter()
            .filter(|&id| {
                let o = world.officer(id);
                o.faction == Some(faction)
                    && !o.is_player
                    && o.ap > 0
                    && o.troops >= attack_troop_requirement(o.max_troops())
            })
            .max_by_key(|&id| world.officer(id).troops);
        let Some(champion) = champion else { continue };

        for &target in graph.neighbors(city) {
            let owner = world.city(target).owner;
            if owner == Some(faction) {
                continue;
            }
            let garrison: u32 = world
                .officers_at(target)
                .iter()
                .map(|&id| world.officer(id).troops)
                .sum();
            let priority = if owner.is_none() { 0 } else { 1 };
            options.push((priority, garrison, target, champion));
        }
    }
    options.sort_unstable();

    for (_, _, target, champion) in options {
        match actions::declare_attack(world, graph, champion, target) {
            Ok(()) => {
                debug!(faction, target, "faction committed to an attack");
                return;
            }
            Err(err) => {
                debug!(faction, target, %err, "expansion option refused");
            }
        }
    }
}

/// End-of-day drift for every factionless, non-player officer: join a
/// well-liked local faction, or wander to a neighboring city.
pub fn take_ronin_turns(world: &mut World, rng: &mut SmallRng) {
    let ronin: Vec<i64> = world
        .officers
        .values()
        .filter(|o| o.faction.is_none() && !o.is_player)
        .map(|o| o.id)
        .collect();

    for id in ronin {
        let location = world.officer(id).location;
        if let Some(local_faction) = world.city(location).owner {
            let leader = world.faction(local_faction).leader;
            let relation = world.relations.officers(id, leader);
            if relation >= consts::RONIN_JOIN_RELATION
                && rng.random_bool(consts::RONIN_JOIN_CHANCE)
            {
                let officer = world.officer_mut(id);
                officer.faction = Some(local_faction);
                officer.rank = Rank::Recruit;
                let recruits = officer.troops.saturating_add(500);
                officer.set_troops(recruits);
                debug!(officer = id, faction = local_faction, "ronin took service");
                continue;
            }
        }
        if rng.random_bool(consts::RONIN_WANDER_CHANCE) {
            let roads = world.neighbors(location);
            if !roads.is_empty() {
                let destination = roads[rng.random_range(0..roads.len())];
                world.officer_mut(id).location = destination;
            }
        }
    }
}
