//! Builders for hand-rolled test worlds.

use crate::model::*;

/// An officer with middling stats, ready to insert. The id is assigned by
/// `World::add_officer`; pass 0 unless constructing a record by hand.
pub fn officer(id: i64, name: &str, faction: Option<i64>, location: i64) -> Officer {
    Officer {
        id,
        name: name.to_string(),
        faction,
        location,
        leadership: 60,
        intelligence: 50,
        strength: 55,
        politics: 45,
        charisma: 50,
        rank: Rank::Sergeant,
        troops: 3000,
        morale: 80,
        reputation: 500,
        gold: 1000,
        troop_type: Some(TroopType::Infantry),
        officer_type: Some(TroopType::Infantry),
        formation: Formation::Vanguard,
        battles_won: 0,
        battles_lost: 0,
        ap: crate::consts::BASE_ACTION_POINTS,
        max_ap: crate::consts::BASE_ACTION_POINTS,
        is_player: false,
    }
}

pub fn city(name: &str, owner: Option<i64>) -> City {
    City {
        id: 0,
        name: name.to_string(),
        owner,
        is_hq: false,
        governor: None,
        commerce: 60,
        agriculture: 60,
        public_order: 70,
        decay_turns: 0,
    }
}

pub fn faction(name: &str, leader: i64) -> Faction {
    Faction {
        id: 0,
        name: name.to_string(),
        leader,
        color: "#888888".to_string(),
        gold: 10_000,
        supplies: 5000,
    }
}

/// Two factions on a five-city map with a neutral city between them.
///
/// ```text
/// Ye(Wei HQ) — Luoyang(Wei) — Wan(neutral) — Hanzhong(Shu) — Chengdu(Shu HQ)
///                    \__________________________/
/// ```
///
/// Each faction has a leader at its HQ and one forward officer.
pub fn two_faction_world() -> World {
    let mut world = World::new();

    let ye = world.add_city(city("Ye", None));
    let luoyang = world.add_city(city("Luoyang", None));
    let wan = world.add_city(city("Wan", None));
    let hanzhong = world.add_city(city("Hanzhong", None));
    let chengdu = world.add_city(city("Chengdu", None));

    world.add_route(ye, luoyang);
    world.add_route(luoyang, wan);
    world.add_route(wan, hanzhong);
    world.add_route(hanzhong, chengdu);
    world.add_route(luoyang, hanzhong);

    let cao_cao = world.add_officer(officer(0, "Cao Cao", None, ye));
    let xiahou_dun = world.add_officer(officer(0, "Xiahou Dun", None, luoyang));
    let liu_bei = world.add_officer(officer(0, "Liu Bei", None, chengdu));
    let guan_yu = world.add_officer(officer(0, "Guan Yu", None, hanzhong));

    let wei = world.add_faction(faction("Wei", cao_cao));
    let shu = world.add_faction(faction("Shu", liu_bei));

    for id in [cao_cao, xiahou_dun] {
        world.officer_mut(id).faction = Some(wei);
    }
    for id in [liu_bei, guan_yu] {
        world.officer_mut(id).faction = Some(shu);
    }

    world.city_mut(ye).owner = Some(wei);
    world.city_mut(ye).is_hq = true;
    world.city_mut(luoyang).owner = Some(wei);
    world.city_mut(hanzhong).owner = Some(shu);
    world.city_mut(chengdu).owner = Some(shu);
    world.city_mut(chengdu).is_hq = true;

    world
}

/// Insert an independent player officer at the given city.
pub fn add_player(world: &mut World, name: &str, location: i64) -> i64 {
    let mut player = officer(0, name, None, location);
    player.is_player = true;
    world.add_officer(player)
}

/// Look up an officer id by name; panics if absent.
pub fn officer_by_name(world: &World, name: &str) -> i64 {
    world
        .officers
        .values()
        .find(|o| o.name == name)
        .map(|o| o.id)
        .unwrap_or_else(|| panic!("no officer named {name}"))
}

/// Look up a city id by name; panics if absent.
pub fn city_by_name(world: &World, name: &str) -> i64 {
    world
        .cities
        .values()
        .find(|c| c.name == name)
        .map(|c| c.id)
        .unwrap_or_else(|| panic!("no city named {name}"))
}
