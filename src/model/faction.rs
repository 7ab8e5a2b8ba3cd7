use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Faction {
    pub id: i64,
    pub name: String,
    pub leader: i64,
    pub color: String,
    pub gold: i64,
    pub supplies: i64,
}
