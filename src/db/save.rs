use serde::Serialize;
use sqlx::PgPool;

use crate::model::World;

/// Load an entire `World` into Postgres using COPY FROM STDIN (text format).
///
/// Existing campaign rows are truncated first, so a save always reflects one
/// world. Order respects FK constraints: factions → cities → officers →
/// routes → pending battles → relations → meta.
pub async fn save_world(pool: &PgPool, world: &World) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(
        "TRUNCATE factions, cities, officers, routes, pending_battles, relations, meta",
    )
    .execute(pool)
    .await?;

    // Factions
    {
        let mut buf = String::new();
        for f in world.factions.values() {
            buf.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\t{}\n",
                f.id,
                escape(&f.name),
                f.leader,
                escape(&f.color),
                f.gold,
                f.supplies,
            ));
        }
        copy_in(pool, include_str!("../../sql/copy_factions.sql"), &buf).await?;
    }

    // Cities
    {
        let mut buf = String::new();
        for c in world.cities.values() {
            buf.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
                c.id,
                escape(&c.name),
                opt_i64(c.owner),
                bool_str(c.is_hq),
                opt_i64(c.governor),
                c.commerce,
                c.agriculture,
                c.public_order,
                c.decay_turns,
            ));
        }
        copy_in(pool, include_str!("../../sql/copy_cities.sql"), &buf).await?;
    }

    // Officers
    {
        let mut buf = String::new();
        for o in world.officers.values() {
            buf.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
                o.id,
                escape(&o.name),
                opt_i64(o.faction),
                o.location,
                o.leadership,
                o.intelligence,
                o.strength,
                o.politics,
                o.charisma,
                escape(&enum_str(&o.rank)),
                o.troops,
                o.morale,
                o.reputation,
                o.gold,
                opt_enum(&o.troop_type),
                opt_enum(&o.officer_type),
                escape(&enum_str(&o.formation)),
                o.battles_won,
                o.battles_lost,
                o.ap,
                o.max_ap,
                bool_str(o.is_player),
            ));
        }
        copy_in(pool, include_str!("../../sql/copy_officers.sql"), &buf).await?;
    }

    // Routes
    {
        let mut buf = String::new();
        for r in &world.routes {
            buf.push_str(&format!("{}\t{}\n", r.a, r.b));
        }
        copy_in(pool, include_str!("../../sql/copy_routes.sql"), &buf).await?;
    }

    // Pending battles
    {
        let mut buf = String::new();
        for b in &world.pending_battles {
            buf.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\n",
                b.target,
                opt_i64(b.source),
                b.attacker_faction,
                b.leader,
                b.declared_on,
            ));
        }
        copy_in(pool, include_str!("../../sql/copy_pending_battles.sql"), &buf).await?;
    }

    // Relations, flattened across the three tables
    {
        let mut buf = String::new();
        for (kind, table) in [
            ("officer_officer", &world.relations.officer_officer),
            ("officer_faction", &world.relations.officer_faction),
            ("faction_faction", &world.relations.faction_faction),
        ] {
            for (&(a, b), &value) in table {
                buf.push_str(&format!("{kind}\t{a}\t{b}\t{value}\n"));
            }
        }
        copy_in(pool, include_str!("../../sql/copy_relations.sql"), &buf).await?;
    }

    // Meta
    {
        let buf = format!("current_day\t{}\n", world.current_day);
        copy_in(pool, include_str!("../../sql/copy_meta.sql"), &buf).await?;
    }

    Ok(())
}

/// Execute a COPY FROM STDIN with the given text-format payload.
async fn copy_in(pool: &PgPool, statement: &str, data: &str) -> Result<(), sqlx::Error> {
    let mut conn = pool.acquire().await?;
    let mut copy = conn.copy_in_raw(statement).await?;
    copy.send(data.as_bytes()).await?;
    copy.finish().await?;
    Ok(())
}

/// Escape a string for Postgres COPY text format.
/// Backslash must be escaped first, then the special whitespace characters.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

/// Render an optional id as a COPY text value (`\N` for NULL).
fn opt_i64(v: Option<i64>) -> String {
    match v {
        Some(n) => n.to_string(),
        None => "\\N".to_string(),
    }
}

fn bool_str(v: bool) -> &'static str {
    if v { "t" } else { "f" }
}

/// Serialize a serde enum variant to its snake_case string (strips JSON quotes).
fn enum_str<T: Serialize>(val: &T) -> String {
    let json = serde_json::to_string(val).expect("enum serialization");
    // serde_json wraps string enums in quotes: "\"value\""
    json[1..json.len() - 1].to_string()
}

fn opt_enum<T: Serialize>(val: &Option<T>) -> String {
    match val {
        Some(v) => escape(&enum_str(v)),
        None => "\\N".to_string(),
    }
}
