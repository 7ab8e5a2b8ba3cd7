use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::model::World;

/// Campaign-map adjacency with supply-line reachability checks.
///
/// Rebuilt from the route list; ownership is read live from the world so the
/// graph only needs a `refresh` when routes change, not when cities flip.
#[derive(Debug, Clone, Default)]
pub struct CampaignGraph {
    adjacency: BTreeMap<i64, Vec<i64>>,
}

impl CampaignGraph {
    pub fn from_world(world: &World) -> Self {
        let mut graph = Self::default();
        graph.refresh(world);
        graph
    }

    pub fn refresh(&mut self, world: &World) {
        self.adjacency.clear();
        for city in world.cities.keys() {
            self.adjacency.insert(*city, Vec::new());
        }
        for route in &world.routes {
            self.adjacency.entry(route.a).or_default().push(route.b);
            self.adjacency.entry(route.b).or_default().push(route.a);
        }
        for neighbors in self.adjacency.values_mut() {
            neighbors.sort_unstable();
            neighbors.dedup();
        }
    }

    pub fn neighbors(&self, city: i64) -> &[i64] {
        self.adjacency.get(&city).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `city` can reach the faction HQ through faction-owned cities.
    ///
    /// The queried city must itself be owned by the faction; an unowned city
    /// has no supply line no matter what it borders. A faction owning nothing
    /// is trivially connected: there is no supply network to cut.
    pub fn is_connected_to_hq(&self, world: &World, faction: i64, city: i64) -> bool {
        let owned = world.cities_of(faction);
        if owned.is_empty() {
            return true;
        }
        if world.city(city).owner != Some(faction) {
            return false;
        }
        let hq = match world.faction_hq(faction) {
            Some(hq) => hq,
            None => return true,
        };
        if city == hq {
            return true;
        }

        let mut visited = BTreeSet::from([city]);
        let mut queue = VecDeque::from([city]);
        while let Some(current) = queue.pop_front() {
            for &next in self.neighbors(current) {
                if !visited.insert(next) {
                    continue;
                }
                if next == hq {
                    return true;
                }
                if world.city(next).owner == Some(faction) {
                    queue.push_back(next);
                }
            }
        }
        false
    }
}
