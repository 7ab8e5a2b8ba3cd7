pub mod city;
pub mod faction;
pub mod officer;
pub mod relations;
pub mod world;

pub use city::{City, Route};
pub use faction::Faction;
pub use officer::{Formation, Officer, Rank, StatKey, TroopType};
pub use relations::Relations;
pub use world::{PendingBattle, World};
