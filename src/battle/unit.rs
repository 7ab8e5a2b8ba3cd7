//! Battlefield units and their state machine.

use std::collections::VecDeque;

use crate::consts;
use crate::engine::context::{Combatant, Side};
use crate::model::{StatKey, TroopType};

use super::map::GridPos;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    Idle,
    Moving,
    Attacking,
    /// Cavalry mid-charge, carried toward the overshoot point.
    Charging,
    /// Wheeling back around after a charge.
    Looping,
    Retreating,
    /// Fled the field alive; no longer participates.
    Escaped,
    Dead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitTarget {
    Unit(usize),
    Gate(usize),
}

#[derive(Debug, Clone)]
pub struct Unit {
    pub id: usize,
    /// Roster officer this unit fights for; synthetic for militia.
    pub officer_id: i64,
    pub side: Side,
    pub troop_type: TroopType,
    pub leadership: i32,
    pub intelligence: i32,
    pub strength: i32,
    pub politics: i32,
    pub charisma: i32,
    /// Troop hit points; one point is one soldier.
    pub troops: f32,
    pub officer_hp: f32,
    pub morale: f32,
    /// World-unit position; the grid tile is derived.
    pub pos: (f32, f32),
    pub state: UnitState,
    pub path: VecDeque<GridPos>,
    pub target: Option<UnitTarget>,
    pub cooldown: f32,
    /// Where a charge carries the rider before the loop back.
    pub charge_goal: Option<(f32, f32)>,
}

impl Unit {
    /// Spawn the units for one combatant: the officer's own banner plus one
    /// escort squad per full block of troops, split evenly.
    pub fn spawn(
        next_id: &mut usize,
        combatant: &Combatant,
        side: Side,
        positions: &mut impl Iterator<Item = GridPos>,
    ) -> Vec<Unit> {
        let squads = ((combatant.troops / consts::SQUAD_SIZE) as usize).min(consts::MAX_SQUADS);
        let bodies = squads + 1;
        let per_unit = combatant.troops / bodies as u32;
        let mut units = Vec::with_capacity(bodies);
        for body in 0..bodies {
            let pos = positions
                .next()
                .expect("spawn ring exhausted")
                .to_world();
            let officer_hp = if body == 0 {
                100.0 + 2.0 * combatant.leadership as f32
            } else {
                100.0
            };
            units.push(Unit {
                id: *next_id,
                officer_id: combatant.officer_id,
                side,
                troop_type: combatant.troop_type,
                leadership: combatant.leadership,
                intelligence: combatant.intelligence,
                strength: combatant.strength,
                politics: combatant.politics,
                charisma: combatant.charisma,
                troops: per_unit as f32,
                officer_hp,
                morale: combatant.morale as f32,
                pos,
                state: UnitState::Idle,
                path: VecDeque::new(),
                target: None,
                cooldown: 0.0,
                charge_goal: None,
            });
            *next_id += 1;
        }
        units
    }

    pub fn grid_pos(&self) -> GridPos {
        GridPos::from_world(self.pos.0, self.pos.1)
    }

    /// Still on the field and fighting-relevant.
    pub fn is_living(&self) -> bool {
        !matches!(self.state, UnitState::Dead | UnitState::Escaped)
    }

    pub fn is_combat_ready(&self) -> bool {
        self.is_living() && self.state != UnitState::Retreating
    }

    pub fn stat(&self, key: StatKey) -> i32 {
        match key {
            StatKey::Leadership => self.leadership,
            StatKey::Intelligence => self.intelligence,
            StatKey::Strength => self.strength,
            StatKey::Politics => self.politics,
            StatKey::Charisma => self.charisma,
        }
    }

    /// Maximum reach in world units.
    pub fn attack_range(&self) -> f32 {
        match self.troop_type {
            TroopType::Archer => 320.0,
            TroopType::Siege => 480.0,
            _ => 80.0,
        }
    }

    /// Targets closer than this suffer the attacker's minimum-range penalty.
    pub fn min_range(&self) -> f32 {
        match self.troop_type {
            TroopType::Archer => 64.0,
            TroopType::Siege => 128.0,
            _ => 0.0,
        }
    }

    pub fn is_ranged(&self) -> bool {
        matches!(self.troop_type, TroopType::Archer | TroopType::Siege)
    }

    pub fn distance_to(&self, other: &Unit) -> f32 {
        let dx = self.pos.0 - other.pos.0;
        let dy = self.pos.1 - other.pos.1;
        (dx * dx + dy * dy).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Formation, Rank};

    fn combatant(troops: u32) -> Combatant {
        Combatant {
            officer_id: 1,
            name: "Test".into(),
            faction: None,
            leadership: 60,
            intelligence: 50,
            strength: 55,
            politics: 45,
            charisma: 50,
            rank: Rank::Sergeant,
            troops,
            troop_type: TroopType::Infantry,
            officer_type: TroopType::Infantry,
            formation: Formation::Vanguard,
            morale: 80,
            is_player: false,
        }
    }

    fn ring() -> impl Iterator<Item = GridPos> {
        (0..).map(|i| GridPos::new(3 + i % 3, 9 + i / 3))
    }

    #[test]
    fn spawn_splits_troops_across_squads() {
        let mut next = 0;
        let units = Unit::spawn(&mut next, &combatant(1500), Side::Attackers, &mut ring());
        // 1500 troops: three full blocks -> officer + 3 squads, 375 each.
        assert_eq!(units.len(), 4);
        for unit in &units {
            assert_eq!(unit.troops, 375.0);
        }
        assert!(units[0].officer_hp > units[1].officer_hp);
    }

    #[test]
    fn squad_count_is_capped() {
        let mut next = 0;
        let units = Unit::spawn(&mut next, &combatant(20_000), Side::Attackers, &mut ring());
        assert_eq!(units.len(), 1 + consts::MAX_SQUADS);
    }

    #[test]
    fn tiny_band_fights_as_one_unit() {
        let mut next = 0;
        let units = Unit::spawn(&mut next, &combatant(300), Side::Defenders, &mut ring());
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].troops, 300.0);
    }

    #[test]
    fn ranged_types_outreach_melee() {
        let mut next = 0;
        let mut spear = combatant(500);
        spear.troop_type = TroopType::Archer;
        let archer = Unit::spawn(&mut next, &spear, Side::Attackers, &mut ring());
        let melee = Unit::spawn(&mut next, &combatant(500), Side::Attackers, &mut ring());
        assert!(archer[0].attack_range() > melee[0].attack_range());
        assert!(archer[0].min_range() > 0.0);
        assert_eq!(melee[0].min_range(), 0.0);
    }
}
