pub mod actions;
pub mod ai;
pub mod autoresolve;
pub mod context;
pub mod graph;
pub mod resolver;
pub mod scheduler;

pub use actions::{ActionError, check_promotions, declare_attack};
pub use autoresolve::auto_resolve;
pub use context::{BattleContext, BattleOutcome, Combatant, Objective, Side};
pub use graph::CampaignGraph;
pub use resolver::{BattleReport, ResolveError, resolve};
pub use scheduler::{Step, TurnScheduler, TurnSlot};
