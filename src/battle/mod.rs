//! Real-time tactical battles fought on a generated grid.

pub mod combat;
pub mod map;
pub mod sim;
pub mod unit;

pub use map::{BattleMap, ControlPoint, GridPos, PointKind};
pub use sim::{
    AutoCapture, BattleEvent, CaptureChoice, CaptureDecider, PromptCapture, TacticalBattle,
};
pub use unit::{Unit, UnitState};
