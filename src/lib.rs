pub mod battle;
pub mod consts;
pub mod db;
pub mod engine;
pub mod flush;
pub mod id;
pub mod model;
pub mod testutil;

pub use engine::{
    BattleContext, BattleOutcome, BattleReport, CampaignGraph, Combatant, Objective, Side, Step,
    TurnScheduler, TurnSlot, auto_resolve, declare_attack, resolve,
};
pub use id::IdGenerator;
pub use model::{
    City, Faction, Formation, Officer, PendingBattle, Rank, Relations, Route, StatKey, TroopType,
    World,
};
