use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct City {
    pub id: i64,
    pub name: String,
    /// None ⇒ neutral / unclaimed.
    pub owner: Option<i64>,
    pub is_hq: bool,
    pub governor: Option<i64>,
    pub commerce: i32,
    pub agriculture: i32,
    pub public_order: i32,
    /// Consecutive end-of-day checks with no owning-faction officer present.
    pub decay_turns: u32,
}

/// Undirected campaign-map connection between two cities.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Route {
    pub a: i64,
    pub b: i64,
}

impl Route {
    pub fn connects(&self, city: i64) -> Option<i64> {
        if self.a == city {
            Some(self.b)
        } else if self.b == city {
            Some(self.a)
        } else {
            None
        }
    }
}
