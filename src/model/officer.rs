use serde::{Deserialize, Serialize};

/// Rank ladder. `Free` sits outside the promotion ladder: it marks an officer
/// released by a faction collapse and shares the level-0 troop cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    Free,
    Volunteer,
    Recruit,
    Soldier,
    Veteran,
    Sergeant,
    Lieutenant,
    Captain,
    Major,
    General,
    Commander,
    Sovereign,
}

impl Rank {
    /// Ladder level. `Free` maps to 0 alongside `Volunteer`.
    pub fn level(self) -> u8 {
        match self {
            Rank::Free | Rank::Volunteer => 0,
            Rank::Recruit => 1,
            Rank::Soldier => 2,
            Rank::Veteran => 3,
            Rank::Sergeant => 4,
            Rank::Lieutenant => 5,
            Rank::Captain => 6,
            Rank::Major => 7,
            Rank::General => 8,
            Rank::Commander => 9,
            Rank::Sovereign => 10,
        }
    }

    pub fn from_level(level: u8) -> Rank {
        match level {
            0 => Rank::Volunteer,
            1 => Rank::Recruit,
            2 => Rank::Soldier,
            3 => Rank::Veteran,
            4 => Rank::Sergeant,
            5 => Rank::Lieutenant,
            6 => Rank::Captain,
            7 => Rank::Major,
            8 => Rank::General,
            9 => Rank::Commander,
            _ => Rank::Sovereign,
        }
    }

    pub fn max_troops(self) -> u32 {
        match self.level() {
            0 => 500,
            1 => 1000,
            2 => 2000,
            3 => 3000,
            4 => 4500,
            5 => 6000,
            6 => 8000,
            7 => 10_000,
            8 => 13_000,
            9 => 16_000,
            _ => 20_000,
        }
    }

    /// Reputation required to attain the given ladder level.
    pub fn required_reputation(level: u8) -> i32 {
        match level {
            1 => 50,
            2 => 150,
            3 => 300,
            4 => 500,
            5 => 800,
            6 => 1200,
            7 => 1800,
            8 => 2500,
            9 => 3500,
            10 => 5000,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TroopType {
    Infantry,
    Archer,
    Cavalry,
    Siege,
    Elite,
}

impl TroopType {
    /// Stat gate for full combat efficiency: `(key stat, requirement)`.
    /// Infantry has no gate.
    pub fn requirement(self) -> Option<(StatKey, i32)> {
        match self {
            TroopType::Infantry => None,
            TroopType::Archer => Some((StatKey::Intelligence, 50)),
            TroopType::Cavalry => Some((StatKey::Strength, 60)),
            TroopType::Siege => Some((StatKey::Intelligence, 60)),
            TroopType::Elite => Some((StatKey::Leadership, 70)),
        }
    }

    /// The type this one strikes at advantage (Cavalry > Infantry > Archer > Cavalry).
    pub fn counters(self) -> Option<TroopType> {
        match self {
            TroopType::Cavalry => Some(TroopType::Infantry),
            TroopType::Infantry => Some(TroopType::Archer),
            TroopType::Archer => Some(TroopType::Cavalry),
            TroopType::Siege | TroopType::Elite => None,
        }
    }

    /// Flat armor rating fed into the `1 + armor/50` damage divisor.
    pub fn armor(self) -> f32 {
        match self {
            TroopType::Infantry => 20.0,
            TroopType::Archer => 10.0,
            TroopType::Cavalry => 25.0,
            TroopType::Siege => 5.0,
            TroopType::Elite => 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKey {
    Leadership,
    Intelligence,
    Strength,
    Politics,
    Charisma,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formation {
    Vanguard,
    Wedge,
    Line,
    Square,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Officer {
    pub id: i64,
    pub name: String,
    /// None ⇒ independent ("ronin").
    pub faction: Option<i64>,
    pub location: i64,
    pub leadership: i32,
    pub intelligence: i32,
    pub strength: i32,
    pub politics: i32,
    pub charisma: i32,
    pub rank: Rank,
    pub troops: u32,
    pub morale: i32,
    pub reputation: i32,
    pub gold: i64,
    pub troop_type: Option<TroopType>,
    pub officer_type: Option<TroopType>,
    pub formation: Formation,
    pub battles_won: u32,
    pub battles_lost: u32,
    pub ap: i32,
    pub max_ap: i32,
    pub is_player: bool,
}

impl Officer {
    pub fn max_troops(&self) -> u32 {
        self.rank.max_troops()
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

    pub fn set_troops(&mut self, troops: u32) {
        self.troops = troops.min(self.max_troops());
    }

    pub fn adjust_morale(&mut self, delta: i32) {
        self.morale = (self.morale + delta).clamp(0, 100);
    }
}
