//! Officer-issued campaign actions and the promotion ladder.

use thiserror::Error;
use tracing::debug;

use crate::consts;
use crate::engine::graph::CampaignGraph;
use crate::model::{PendingBattle, Rank, World};

#[derive(Debug, Error, PartialEq)]
pub enum ActionError {
    #[error("officer belongs to no faction")]
    Unaffiliated,
    #[error("no action points remaining")]
    NoActionPoints,
    #[error("not enough troops: have {have}, need {need}")]
    NotEnoughTroops { have: u32, need: u32 },
    #[error("faction already has a battle pending")]
    BattlePending,
    #[error("target city is not adjacent")]
    NotAdjacent,
    #[error("cannot attack your own city")]
    OwnCity,
    #[error("the enemy already marches on this front")]
    ReverseConflict,
    #[error("staging city is cut off from the faction HQ")]
    SupplyLineCut,
}

/// Minimum troops to stage an attack: a flat floor, or 15% of the officer's
/// cap, whichever is lower.
pub fn attack_troop_requirement(cap: u32) -> u32 {
    consts::ATTACK_MIN_TROOPS_FLAT
        .min((cap as f32 * consts::ATTACK_MIN_TROOPS_FRAC) as u32)
}

/// Declare an attack on `target` from the officer's current city.
///
/// On success: one action point is spent, the officer gains reputation for
/// boldness, a pending battle is queued, and every officer at the target
/// loses some opinion of the attacker.
pub fn declare_attack(
    world: &mut World,
    graph: &CampaignGraph,
    officer_id: i64,
    target: i64,
) -> Result<(), ActionError> {
    let officer = world.officer(officer_id);
    let faction = officer.faction.ok_or(ActionError::Unaffiliated)?;
    if officer.ap < 1 {
        return Err(ActionError::NoActionPoints);
    }
    let need = attack_troop_requirement(officer.max_troops());
    if officer.troops < need {
        return Err(ActionError::NotEnoughTroops {
            have: officer.troops,
            need,
        });
    }
    if world.faction_has_pending(faction) {
        return Err(ActionError::BattlePending);
    }
    let source = officer.location;
    if !world.neighbors(source).contains(&target) {
        return Err(ActionError::NotAdjacent);
    }
    if world.city(target).owner == Some(faction) {
        return Err(ActionError::OwnCity);
    }
    // An enemy column already moving the other way down this road.
    let reverse = world
        .pending_battles
        .iter()
        .any(|b| b.target == source && b.source == Some(target));
    if reverse {
        return Err(ActionError::ReverseConflict);
    }
    if !graph.is_connected_to_hq(world, faction, source) {
        return Err(ActionError::SupplyLineCut);
    }

    let declared_on = world.current_day;
    world.add_pending_battle(PendingBattle {
        target,
        source: Some(source),
        attacker_faction: faction,
        leader: officer_id,
        declared_on,
    });
    {
        let officer = world.officer_mut(officer_id);
        officer.ap -= 1;
        officer.reputation += consts::ATTACK_DECLARATION_REP;
    }
    for defender in world.officers_at(target) {
        world
            .relations
            .adjust_officers(defender, officer_id, consts::ATTACK_OPINION_PENALTY);
    }
    debug!(officer = officer_id, target, "attack declared");
    Ok(())
}

/// Raise the officer to the highest rank their reputation supports.
/// Free officers are outside the ladder and never promoted here.
pub fn check_promotions(world: &mut World, officer_id: i64) {
    let officer = world.officer_mut(officer_id);
    if officer.rank == Rank::Free {
        return;
    }
    let mut level = officer.rank.level();
    while level < 10 && officer.reputation >= Rank::required_reputation(level + 1) {
        level += 1;
    }
    if level > officer.rank.level() {
        officer.rank = Rank::from_level(level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    fn setup() -> (World, CampaignGraph, i64, i64) {
        let world = testutil::two_faction_world();
        let graph = CampaignGraph::from_world(&world);
        let xiahou_dun = testutil::officer_by_name(&world, "Xiahou Dun");
        let hanzhong = testutil::city_by_name(&world, "Hanzhong");
        (world, graph, xiahou_dun, hanzhong)
    }

    #[test]
    fn valid_declaration_spends_ap_and_queues_battle() {
        let (mut world, graph, officer, target) = setup();
        let rep = world.officer(officer).reputation;
        declare_attack(&mut world, &graph, officer, target).unwrap();

        assert_eq!(world.officer(officer).ap, 2);
        assert_eq!(world.officer(officer).reputation, rep + 15);
        assert!(world.pending_at(target).is_some());
        let guan_yu = testutil::officer_by_name(&world, "Guan Yu");
        assert_eq!(world.relations.officers(guan_yu, officer), -5);
    }

    #[test]
    fn refusals_cover_the_whole_chain() {
        let (mut world, graph, officer, target) = setup();

        let ronin = {
            let mut world2 = world.clone();
            let id = testutil::add_player(&mut world2, "Drifter", target);
            world2.officer_mut(id).faction = None;
            (world2, id)
        };
        let (mut ronin_world, ronin_id) = ronin;
        assert_eq!(
            declare_attack(&mut ronin_world, &graph, ronin_id, target),
            Err(ActionError::Unaffiliated)
        );

        world.officer_mut(officer).ap = 0;
        assert_eq!(
            declare_attack(&mut world, &graph, officer, target),
            Err(ActionError::NoActionPoints)
        );
        world.officer_mut(officer).ap = 3;

        world.officer_mut(officer).troops = 50;
        assert_eq!(
            declare_attack(&mut world, &graph, officer, target),
            Err(ActionError::NotEnoughTroops { have: 50, need: 150 })
        );
        world.officer_mut(officer).troops = 3000;

        let chengdu = testutil::city_by_name(&world, "Chengdu");
        assert_eq!(
            declare_attack(&mut world, &graph, officer, chengdu),
            Err(ActionError::NotAdjacent)
        );

        let ye = testutil::city_by_name(&world, "Ye");
        assert_eq!(
            declare_attack(&mut world, &graph, officer, ye),
            Err(ActionError::OwnCity)
        );
    }

    #[test]
    fn one_pending_battle_per_faction() {
        let (mut world, graph, officer, target) = setup();
        declare_attack(&mut world, &graph, officer, target).unwrap();

        let cao_cao = testutil::officer_by_name(&world, "Cao Cao");
        let luoyang = testutil::city_by_name(&world, "Luoyang");
        world.officer_mut(cao_cao).location = luoyang;
        let wan = testutil::city_by_name(&world, "Wan");
        assert_eq!(
            declare_attack(&mut world, &graph, cao_cao, wan),
            Err(ActionError::BattlePending)
        );
    }

    #[test]
    fn reverse_conflict_is_refused() {
        let (mut world, graph, officer, hanzhong) = setup();
        let luoyang = testutil::city_by_name(&world, "Luoyang");
        // Shu already marches Hanzhong -> Luoyang.
        let guan_yu = testutil::officer_by_name(&world, "Guan Yu");
        declare_attack(&mut world, &graph, guan_yu, luoyang).unwrap();

        assert_eq!(
            declare_attack(&mut world, &graph, officer, hanzhong),
            Err(ActionError::ReverseConflict)
        );
    }

    #[test]
    fn cut_supply_line_is_refused() {
        let (mut world, graph, officer, target) = setup();
        // Move the Wei HQ to far-off Chengdu with nothing Wei-owned between
        // it and the staging city; Luoyang can no longer reach its HQ.
        let ye = testutil::city_by_name(&world, "Ye");
        let chengdu = testutil::city_by_name(&world, "Chengdu");
        let wei = world.city(ye).owner.unwrap();
        world.city_mut(ye).owner = None;
        world.city_mut(ye).is_hq = false;
        world.city_mut(chengdu).owner = Some(wei);
        world.city_mut(chengdu).is_hq = true;

        assert_eq!(
            declare_attack(&mut world, &graph, officer, target),
            Err(ActionError::SupplyLineCut)
        );
    }

    #[test]
    fn promotion_reaches_highest_qualified_rank() {
        let mut world = testutil::two_faction_world();
        let officer = testutil::officer_by_name(&world, "Guan Yu");
        world.officer_mut(officer).rank = Rank::Volunteer;
        world.officer_mut(officer).reputation = 1250;
        check_promotions(&mut world, officer);
        assert_eq!(world.officer(officer).rank, Rank::Captain);
    }

    #[test]
    fn free_officers_are_never_promoted() {
        let mut world = testutil::two_faction_world();
        let officer = testutil::officer_by_name(&world, "Guan Yu");
        world.officer_mut(officer).rank = Rank::Free;
        world.officer_mut(officer).reputation = 9999;
        check_promotions(&mut world, officer);
        assert_eq!(world.officer(officer).rank, Rank::Free);
    }
}
