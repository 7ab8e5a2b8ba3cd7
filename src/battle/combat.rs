//! Strike mathematics shared by every battlefield exchange.

use crate::consts;
use crate::model::TroopType;

use super::unit::Unit;

/// Raw attack value before the defender's mitigation.
pub fn attack_value(attacker: &Unit, defender: &Unit) -> f32 {
    let base = attacker.leadership as f32 + attacker.troops / 200.0;
    base * morale_multiplier(attacker.morale)
        * efficiency(attacker)
        * rps_multiplier(attacker.troop_type, defender.troop_type)
        * range_penalty(attacker, defender)
}

pub fn morale_multiplier(morale: f32) -> f32 {
    if morale > 70.0 {
        consts::HIGH_MORALE_MULT
    } else if morale < 30.0 {
        consts::LOW_MORALE_MULT
    } else {
        1.0
    }
}

/// Stat-gated efficiency: a unit whose commander lacks the type's key stat
/// fights at a floor of 0.6, scaling up to 1.0 at the requirement.
pub fn efficiency(unit: &Unit) -> f32 {
    match unit.troop_type.requirement() {
        None => 1.0,
        Some((key, requirement)) => {
            let stat = unit.stat(key);
            if stat >= requirement {
                1.0
            } else {
                0.6 + 0.4 * stat.max(0) as f32 / requirement as f32
            }
        }
    }
}

pub fn rps_multiplier(attacker: TroopType, defender: TroopType) -> f32 {
    if attacker == TroopType::Siege {
        return consts::SIEGE_VS_UNIT_MULT;
    }
    if attacker.counters() == Some(defender) {
        consts::RPS_ADVANTAGE
    } else {
        1.0
    }
}

fn range_penalty(attacker: &Unit, defender: &Unit) -> f32 {
    let min = attacker.min_range();
    if min > 0.0 && attacker.distance_to(defender) < min {
        consts::MIN_RANGE_PENALTY
    } else {
        1.0
    }
}

/// Damage that lands after the defender's mass is counted against the blow.
pub fn damage(attack: f32, defender: &Unit) -> f32 {
    let defense = defender.leadership as f32 + defender.troops / 400.0;
    (attack - defense / 2.0).max(1.0)
}

/// One landed strike, ready to apply to the defender.
#[derive(Debug, Clone, Copy)]
pub struct Strike {
    pub troop_damage: f32,
    pub officer_damage: f32,
    pub morale_damage: f32,
}

/// Resolve a strike: mitigate through armor, punish siege targets, then
/// split between the troop mass and the officer.
pub fn strike(attacker: &Unit, defender: &Unit) -> Strike {
    let raw = damage(attack_value(attacker, defender), defender);
    let mut landed = raw / (1.0 + defender.troop_type.armor() / 50.0);
    if defender.troop_type == TroopType::Siege {
        landed *= consts::SIEGE_TAKEN_MULT;
    }
    let (troop_damage, officer_damage) = if defender.troops > 0.0 {
        (
            landed * consts::TROOP_HP_SHARE,
            landed * (1.0 - consts::TROOP_HP_SHARE),
        )
    } else {
        (0.0, landed)
    };
    Strike {
        troop_damage,
        officer_damage,
        morale_damage: landed / 5.0,
    }
}

/// Seconds between strikes; stronger officers swing faster.
pub fn cooldown(strength: i32) -> f32 {
    1.0 / (1.0 + strength as f32 / 200.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::context::Side;
    use crate::model::{Formation, Rank};
    use crate::battle::map::GridPos;
    use crate::battle::unit::Unit;

    fn unit(troop_type: TroopType, morale: f32, troops: f32) -> Unit {
        let combatant = crate::engine::context::Combatant {
            officer_id: 1,
            name: "Test".into(),
            faction: None,
            leadership: 60,
            intelligence: 50,
            strength: 55,
            politics: 45,
            charisma: 50,
            rank: Rank::Sergeant,
            troops: troops as u32,
            troop_type,
            officer_type: troop_type,
            formation: Formation::Vanguard,
            morale: morale as i32,
            is_player: false,
        };
        let mut next = 0;
        let mut ring = std::iter::repeat(GridPos::new(5, 5));
        let mut units = Unit::spawn(&mut next, &combatant, Side::Attackers, &mut ring);
        let mut u = units.remove(0);
        u.troops = troops;
        u.morale = morale;
        u
    }

    #[test]
    fn cavalry_beats_infantry_beats_archer_beats_cavalry() {
        assert_eq!(
            rps_multiplier(TroopType::Cavalry, TroopType::Infantry),
            consts::RPS_ADVANTAGE
        );
        assert_eq!(
            rps_multiplier(TroopType::Infantry, TroopType::Archer),
            consts::RPS_ADVANTAGE
        );
        assert_eq!(
            rps_multiplier(TroopType::Archer, TroopType::Cavalry),
            consts::RPS_ADVANTAGE
        );
        assert_eq!(rps_multiplier(TroopType::Infantry, TroopType::Cavalry), 1.0);
        assert_eq!(
            rps_multiplier(TroopType::Siege, TroopType::Infantry),
            consts::SIEGE_VS_UNIT_MULT
        );
    }

    #[test]
    fn morale_swings_the_attack() {
        let high = unit(TroopType::Infantry, 90.0, 1000.0);
        let mid = unit(TroopType::Infantry, 50.0, 1000.0);
        let low = unit(TroopType::Infantry, 10.0, 1000.0);
        let foe = unit(TroopType::Elite, 50.0, 1000.0);
        assert!(attack_value(&high, &foe) > attack_value(&mid, &foe));
        assert!(attack_value(&mid, &foe) > attack_value(&low, &foe));
    }

    #[test]
    fn unqualified_cavalry_fights_at_a_discount() {
        let mut weak = unit(TroopType::Cavalry, 50.0, 1000.0);
        weak.strength = 0;
        assert!((efficiency(&weak) - 0.6).abs() < 1e-6);
        weak.strength = 30;
        assert!(efficiency(&weak) > 0.6 && efficiency(&weak) < 1.0);
        weak.strength = 60;
        assert_eq!(efficiency(&weak), 1.0);
    }

    #[test]
    fn damage_never_drops_below_one() {
        let mouse = unit(TroopType::Infantry, 10.0, 10.0);
        let wall = unit(TroopType::Elite, 50.0, 20_000.0);
        let dealt = damage(attack_value(&mouse, &wall), &wall);
        assert_eq!(dealt, 1.0);
    }

    #[test]
    fn min_range_blunts_point_blank_shots() {
        let mut archer = unit(TroopType::Archer, 50.0, 1000.0);
        let foe = unit(TroopType::Elite, 50.0, 1000.0);
        archer.pos = (foe.pos.0 + 10.0, foe.pos.1);
        let close = attack_value(&archer, &foe);
        archer.pos = (foe.pos.0 + 200.0, foe.pos.1);
        let far = attack_value(&archer, &foe);
        assert!(close < far);
        assert!((close / far - consts::MIN_RANGE_PENALTY).abs() < 1e-3);
    }

    #[test]
    fn troopless_units_take_it_all_on_the_officer() {
        let attacker = unit(TroopType::Infantry, 50.0, 1000.0);
        let mut lone = unit(TroopType::Infantry, 50.0, 1000.0);
        lone.troops = 0.0;
        let hit = strike(&attacker, &lone);
        assert_eq!(hit.troop_damage, 0.0);
        assert!(hit.officer_damage > 0.0);
    }

    #[test]
    fn siege_targets_take_half_again() {
        let attacker = unit(TroopType::Infantry, 50.0, 1000.0);
        let engine = unit(TroopType::Siege, 50.0, 1000.0);
        let elite = unit(TroopType::Elite, 50.0, 1000.0);
        let vs_engine = strike(&attacker, &engine);
        let vs_elite = strike(&attacker, &elite);
        // Siege has less armor AND the extra taken-damage multiplier.
        assert!(vs_engine.troop_damage > vs_elite.troop_damage);
    }

    #[test]
    fn stronger_officers_strike_faster() {
        assert!(cooldown(100) < cooldown(20));
        assert!((cooldown(200) - 0.5).abs() < 1e-6);
    }
}
