use serde::de::DeserializeOwned;
use sqlx::{PgPool, Row};

use crate::model::{City, Faction, Officer, PendingBattle, Route, World};

/// Read a full `World` back out of Postgres. The id generator is rebuilt by
/// observing every loaded id, so later insertions cannot collide.
pub async fn fetch_world(pool: &PgPool) -> Result<World, sqlx::Error> {
    let mut world = World::new();

    for row in sqlx::query("SELECT * FROM factions ORDER BY id")
        .fetch_all(pool)
        .await?
    {
        let faction = Faction {
            id: row.get("id"),
            name: row.get("name"),
            leader: row.get("leader"),
            color: row.get("color"),
            gold: row.get("gold"),
            supplies: row.get("supplies"),
        };
        world.id_gen.observe(faction.id);
        world.factions.insert(faction.id, faction);
    }

    for row in sqlx::query("SELECT * FROM cities ORDER BY id")
        .fetch_all(pool)
        .await?
    {
        let city = City {
            id: row.get("id"),
            name: row.get("name"),
            owner: row.get("owner"),
            is_hq: row.get("is_hq"),
            governor: row.get("governor"),
            commerce: row.get("commerce"),
            agriculture: row.get("agriculture"),
            public_order: row.get("public_order"),
            decay_turns: row.get::<i32, _>("decay_turns") as u32,
        };
        world.id_gen.observe(city.id);
        world.cities.insert(city.id, city);
    }

    for row in sqlx::query("SELECT * FROM officers ORDER BY id")
        .fetch_all(pool)
        .await?
    {
        let officer = Officer {
            id: row.get("id"),
            name: row.get("name"),
            faction: row.get("faction"),
            location: row.get("location"),
            leadership: row.get("leadership"),
            intelligence: row.get("intelligence"),
            strength: row.get("strength"),
            politics: row.get("politics"),
            charisma: row.get("charisma"),
            rank: enum_from(row.get("rank"))?,
            troops: row.get::<i32, _>("troops") as u32,
            morale: row.get("morale"),
            reputation: row.get("reputation"),
            gold: row.get("gold"),
            troop_type: opt_enum_from(row.get("troop_type"))?,
            officer_type: opt_enum_from(row.get("officer_type"))?,
            formation: enum_from(row.get("formation"))?,
            battles_won: row.get::<i32, _>("battles_won") as u32,
            battles_lost: row.get::<i32, _>("battles_lost") as u32,
            ap: row.get("ap"),
            max_ap: row.get("max_ap"),
            is_player: row.get("is_player"),
        };
        world.id_gen.observe(officer.id);
        world.officers.insert(officer.id, officer);
    }

    for row in sqlx::query("SELECT a, b FROM routes ORDER BY a, b")
        .fetch_all(pool)
        .await?
    {
        world.routes.push(Route {
            a: row.get("a"),
            b: row.get("b"),
        });
    }

    for row in sqlx::query("SELECT * FROM pending_battles ORDER BY target")
        .fetch_all(pool)
        .await?
    {
        world.pending_battles.push(PendingBattle {
            target: row.get("target"),
            source: row.get("source"),
            attacker_faction: row.get("attacker_faction"),
            leader: row.get("leader"),
            declared_on: row.get::<i32, _>("declared_on") as u32,
        });
    }

    for row in sqlx::query("SELECT kind, a, b, value FROM relations")
        .fetch_all(pool)
        .await?
    {
        let kind: String = row.get("kind");
        let key = (row.get::<i64, _>("a"), row.get::<i64, _>("b"));
        let value: i32 = row.get("value");
        match kind.as_str() {
            "officer_officer" => world.relations.officer_officer.insert(key, value),
            "officer_faction" => world.relations.officer_faction.insert(key, value),
            "faction_faction" => world.relations.faction_faction.insert(key, value),
            other => {
                return Err(sqlx::Error::Decode(
                    format!("unknown relation kind {other}").into(),
                ));
            }
        };
    }

    if let Some(row) = sqlx::query("SELECT value FROM meta WHERE key = 'current_day'")
        .fetch_optional(pool)
        .await?
    {
        world.current_day = row.get::<i64, _>("value") as u32;
    }

    Ok(world)
}

/// Decode a snake_case enum string written by the save path.
fn enum_from<T: DeserializeOwned>(s: &str) -> Result<T, sqlx::Error> {
    serde_json::from_str(&format!("\"{s}\"")).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

fn opt_enum_from<T: DeserializeOwned>(s: Option<&str>) -> Result<Option<T>, sqlx::Error> {
    s.map(enum_from).transpose()
}
