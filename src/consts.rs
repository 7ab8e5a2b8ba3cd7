//! Campaign and battle tuning constants.

// ---------------------------------------------------------------------------
// Action economy
// ---------------------------------------------------------------------------

/// Starting and reset value for daily action points.
pub const BASE_ACTION_POINTS: i32 = 3;
/// Hard ceiling on max action points, regardless of bonuses.
pub const ACTION_POINT_CAP: i32 = 5;
/// Reputation gained for declaring an attack.
pub const ATTACK_DECLARATION_REP: i32 = 15;
/// Opinion penalty toward the attacker for officers at the targeted city.
pub const ATTACK_OPINION_PENALTY: i32 = -5;
/// Minimum troops to declare an attack: `min(150, 15% of cap)`.
pub const ATTACK_MIN_TROOPS_FLAT: u32 = 150;
pub const ATTACK_MIN_TROOPS_FRAC: f32 = 0.15;

// ---------------------------------------------------------------------------
// Battle context
// ---------------------------------------------------------------------------

/// Chance an eligible bystander is even considered for joining a side.
pub const RONIN_CONSIDER_CHANCE: f64 = 0.05;
/// Mean relation a ronin needs with a side's roster to join it.
pub const RONIN_JOIN_THRESHOLD: f64 = 70.0;
/// Higher bar for officers defecting from another faction mid-battle.
pub const MERCENARY_JOIN_THRESHOLD: f64 = 75.0;
/// Militia garrison synthesized for an undefended neutral city.
pub const MILITIA_MIN: usize = 3;
pub const MILITIA_MAX: usize = 5;
pub const MILITIA_TROOPS: u32 = 500;

// ---------------------------------------------------------------------------
// Auto-resolution
// ---------------------------------------------------------------------------

/// Flat defender bonus for holding a garrisoned position.
pub const AUTO_DEFENDER_BONUS: f32 = 20.0;
/// Replacement defender strength for an empty neutral city.
pub const AUTO_EMPTY_CITY_STRENGTH: f32 = 40.0;
/// Fortune swing added to the attacker roll.
pub const AUTO_LUCK_SWING: f32 = 20.0;
/// Winner casualty fraction range.
pub const AUTO_WINNER_LOSS: (f32, f32) = (0.10, 0.30);
/// Loser casualty fraction range.
pub const AUTO_LOSER_LOSS: (f32, f32) = (0.70, 0.90);

// ---------------------------------------------------------------------------
// Battle resolution
// ---------------------------------------------------------------------------

/// Fraction of each loser's gold paid into the victors' prize pool.
pub const LOOT_FRACTION: f64 = 0.10;
/// Reputation for being on the winning side.
pub const VICTORY_REP: i32 = 50;
/// Consolation reputation for fighting on the losing side.
pub const DEFEAT_REP: i32 = 10;
/// Extra reputation for defeating an officer of rank level >= TOP_RANK_LEVEL.
pub const UPSET_VICTORY_REP: i32 = 100;
pub const TOP_RANK_LEVEL: u8 = 8;
/// Opinion penalty the former owner's local officers take toward the conqueror.
pub const CONQUEST_OPINION_PENALTY: i32 = -15;

// ---------------------------------------------------------------------------
// Battle grid
// ---------------------------------------------------------------------------

pub const MAP_WIDTH: i32 = 30;
pub const MAP_HEIGHT: i32 = 20;
pub const TILE_SIZE: f32 = 64.0;
/// Neutral control points attempted per map.
pub const NEUTRAL_POINT_ATTEMPTS: usize = 6;
/// Minimum world-space spacing between control points.
pub const POINT_SPACING: f32 = 200.0;
pub const GATE_HEALTH: f32 = 500.0;

// ---------------------------------------------------------------------------
// Tactical combat
// ---------------------------------------------------------------------------

pub const UNIT_MOVE_SPEED: f32 = 100.0;
/// Soldiers per escort squad; one squad per full block, max squads per officer.
pub const SQUAD_SIZE: u32 = 500;
pub const MAX_SQUADS: usize = 4;
/// HP split while troops remain: 90% troops, 10% officer.
pub const TROOP_HP_SHARE: f32 = 0.9;
pub const HIGH_MORALE_MULT: f32 = 1.2;
pub const LOW_MORALE_MULT: f32 = 0.5;
pub const RPS_ADVANTAGE: f32 = 1.3;
pub const SIEGE_VS_UNIT_MULT: f32 = 0.5;
pub const SIEGE_TAKEN_MULT: f32 = 1.5;
pub const MIN_RANGE_PENALTY: f32 = 0.4;
/// Cavalry charge trigger window (world units) and overshoot distance.
pub const CHARGE_RANGE: (f32, f32) = (40.0, 120.0);
pub const CHARGE_OVERSHOOT: f32 = 80.0;
/// Cadence timers, seconds.
pub const AI_RETARGET_INTERVAL: f32 = 1.0;
pub const MORALE_DRIFT_INTERVAL: f32 = 3.0;
/// Morale below this deserts `(threshold - morale) * 2` troops per drift.
pub const DESERTION_MORALE: f32 = 30.0;

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Initiative is re-rolled on day 1 and every 7th day after.
pub const INITIATIVE_PERIOD: u32 = 7;
/// Harvest fires on every 28th day.
pub const HARVEST_PERIOD: u32 = 28;
/// Public order below this contributes nothing at harvest.
pub const HARVEST_MIN_ORDER: i32 = 20;
/// Owned city with no garrison reverts to neutral after this many turns.
pub const DECAY_TURNS: u32 = 3;
/// Ronin end-of-day behavior.
pub const RONIN_JOIN_RELATION: i32 = 50;
pub const RONIN_JOIN_CHANCE: f64 = 0.10;
pub const RONIN_WANDER_CHANCE: f64 = 0.50;
/// Daily troop recovery: 5% of cap, at least 10 soldiers.
pub const TROOP_REGEN_FRAC: f32 = 0.05;
pub const TROOP_REGEN_MIN: u32 = 10;
