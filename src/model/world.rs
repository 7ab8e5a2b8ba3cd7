use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::city::{City, Route};
use super::faction::Faction;
use super::officer::Officer;
use super::relations::Relations;
use crate::id::IdGenerator;

/// A declared attack waiting for the scheduler's conflict drain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingBattle {
    pub target: i64,
    /// City the attack was staged from, if declared through an officer action.
    pub source: Option<i64>,
    pub attacker_faction: i64,
    /// Declaring officer; leads the attacking side when the context is built.
    pub leader: i64,
    pub declared_on: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    pub officers: BTreeMap<i64, Officer>,
    pub factions: BTreeMap<i64, Faction>,
    pub cities: BTreeMap<i64, City>,
    pub routes: Vec<Route>,
    pub pending_battles: Vec<PendingBattle>,
    pub relations: Relations,
    pub id_gen: IdGenerator,
    pub current_day: u32,
}

impl World {
    pub fn new() -> Self {
        Self {
            officers: BTreeMap::new(),
            factions: BTreeMap::new(),
            cities: BTreeMap::new(),
            routes: Vec::new(),
            pending_battles: Vec::new(),
            relations: Relations::default(),
            id_gen: IdGenerator::new(),
            current_day: 1,
        }
    }

    // -- insertion ----------------------------------------------------------

    /// Add an officer, assigning it a unique ID. Returns the assigned ID.
    ///
    /// # Panics
    /// Panics if the officer's location or faction does not exist.
    pub fn add_officer(&mut self, mut officer: Officer) -> i64 {
        assert!(
            self.cities.contains_key(&officer.location),
            "add_officer: location {} not found",
            officer.location
        );
        if let Some(faction) = officer.faction {
            assert!(
                self.factions.contains_key(&faction),
                "add_officer: faction {faction} not found"
            );
        }
        let id = self.id_gen.next_id();
        officer.id = id;
        self.officers.insert(id, officer);
        id
    }

    /// Add a city, assigning it a unique ID. Returns the assigned ID.
    pub fn add_city(&mut self, mut city: City) -> i64 {
        let id = self.id_gen.next_id();
        city.id = id;
        self.cities.insert(id, city);
        id
    }

    /// Add a faction, assigning it a unique ID. Returns the assigned ID.
    ///
    /// # Panics
    /// Panics if the named leader does not exist.
    pub fn add_faction(&mut self, mut faction: Faction) -> i64 {
        assert!(
            self.officers.contains_key(&faction.leader),
            "add_faction: leader {} not found",
            faction.leader
        );
        let id = self.id_gen.next_id();
        faction.id = id;
        self.factions.insert(id, faction);
        id
    }

    /// Connect two cities. Duplicate and reversed routes are ignored.
    ///
    /// # Panics
    /// Panics if either city does not exist, or on a self-route.
    pub fn add_route(&mut self, a: i64, b: i64) {
        assert_ne!(a, b, "add_route: city cannot connect to itself");
        assert!(self.cities.contains_key(&a), "add_route: city {a} not found");
        assert!(self.cities.contains_key(&b), "add_route: city {b} not found");
        let exists = self
            .routes
            .iter()
            .any(|r| (r.a == a && r.b == b) || (r.a == b && r.b == a));
        if !exists {
            self.routes.push(Route { a, b });
        }
    }

    /// Queue a declared attack.
    ///
    /// # Panics
    /// Panics if a battle is already pending at the target city.
    pub fn add_pending_battle(&mut self, battle: PendingBattle) {
        assert!(
            self.pending_at(battle.target).is_none(),
            "add_pending_battle: city {} already contested",
            battle.target
        );
        self.pending_battles.push(battle);
    }

    // -- panicking accessors ------------------------------------------------

    pub fn officer(&self, id: i64) -> &Officer {
        self.officers
            .get(&id)
            .unwrap_or_else(|| panic!("officer {id} not found"))
    }

    pub fn officer_mut(&mut self, id: i64) -> &mut Officer {
        self.officers
            .get_mut(&id)
            .unwrap_or_else(|| panic!("officer {id} not found"))
    }

    pub fn city(&self, id: i64) -> &City {
        self.cities
            .get(&id)
            .unwrap_or_else(|| panic!("city {id} not found"))
    }

    pub fn city_mut(&mut self, id: i64) -> &mut City {
        self.cities
            .get_mut(&id)
            .unwrap_or_else(|| panic!("city {id} not found"))
    }

    pub fn faction(&self, id: i64) -> &Faction {
        self.factions
            .get(&id)
            .unwrap_or_else(|| panic!("faction {id} not found"))
    }

    pub fn faction_mut(&mut self, id: i64) -> &mut Faction {
        self.factions
            .get_mut(&id)
            .unwrap_or_else(|| panic!("faction {id} not found"))
    }

    // -- queries ------------------------------------------------------------

    /// Officer IDs at a city, ascending.
    pub fn officers_at(&self, city: i64) -> Vec<i64> {
        self.officers
            .values()
            .filter(|o| o.location == city)
            .map(|o| o.id)
            .collect()
    }

    /// Officer IDs belonging to a faction, ascending.
    pub fn officers_of(&self, faction: i64) -> Vec<i64> {
        self.officers
            .values()
            .filter(|o| o.faction == Some(faction))
            .map(|o| o.id)
            .collect()
    }

    /// City IDs owned by a faction, ascending.
    pub fn cities_of(&self, faction: i64) -> Vec<i64> {
        self.cities
            .values()
            .filter(|c| c.owner == Some(faction))
            .map(|c| c.id)
            .collect()
    }

    /// The faction's HQ city, falling back to its lowest-id owned city.
    pub fn faction_hq(&self, faction: i64) -> Option<i64> {
        self.cities
            .values()
            .find(|c| c.owner == Some(faction) && c.is_hq)
            .map(|c| c.id)
            .or_else(|| self.cities_of(faction).first().copied())
    }

    /// Cities one route hop from the given city, ascending, deduped.
    pub fn neighbors(&self, city: i64) -> Vec<i64> {
        let mut out: Vec<i64> = self
            .routes
            .iter()
            .filter_map(|r| r.connects(city))
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn player(&self) -> Option<i64> {
        self.officers.values().find(|o| o.is_player).map(|o| o.id)
    }

    pub fn pending_at(&self, city: i64) -> Option<&PendingBattle> {
        self.pending_battles.iter().find(|b| b.target == city)
    }

    pub fn faction_has_pending(&self, faction: i64) -> bool {
        self.pending_battles
            .iter()
            .any(|b| b.attacker_faction == faction)
    }

    pub fn remove_pending_at(&mut self, city: i64) {
        self.pending_battles.retain(|b| b.target != city);
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
