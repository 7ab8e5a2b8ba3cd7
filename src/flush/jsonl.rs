use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::model::World;

/// A relation row flattened for line-oriented output. The in-memory tables
/// key on id pairs, which JSON maps cannot express.
#[derive(Debug, Serialize)]
struct RelationRow {
    kind: &'static str,
    a: i64,
    b: i64,
    value: i32,
}

/// Write an iterator of serializable items to a JSONL file (one JSON object per line).
fn write_jsonl<T: Serialize>(path: &Path, items: impl Iterator<Item = T>) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for item in items {
        serde_json::to_writer(&mut writer, &item)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

/// Flush the campaign state to JSONL files in the given output directory.
///
/// Creates the output directory if it does not exist. Writes 6 files:
/// - `officers.jsonl` — one Officer per line
/// - `factions.jsonl` — one Faction per line
/// - `cities.jsonl` — one City per line
/// - `routes.jsonl` — one Route per line
/// - `relations.jsonl` — flattened opinion rows from all three tables
/// - `pending_battles.jsonl` — one queued declaration per line
pub fn flush_to_jsonl(world: &World, output_dir: &Path) -> io::Result<()> {
    fs::create_dir_all(output_dir)?;

    write_jsonl(&output_dir.join("officers.jsonl"), world.officers.values())?;
    write_jsonl(&output_dir.join("factions.jsonl"), world.factions.values())?;
    write_jsonl(&output_dir.join("cities.jsonl"), world.cities.values())?;
    write_jsonl(&output_dir.join("routes.jsonl"), world.routes.iter())?;
    write_jsonl(
        &output_dir.join("relations.jsonl"),
        collect_relations(world).into_iter(),
    )?;
    write_jsonl(
        &output_dir.join("pending_battles.jsonl"),
        world.pending_battles.iter(),
    )?;

    Ok(())
}

fn collect_relations(world: &World) -> Vec<RelationRow> {
    let mut rows = Vec::new();
    for (&(a, b), &value) in &world.relations.officer_officer {
        rows.push(RelationRow { kind: "officer_officer", a, b, value });
    }
    for (&(a, b), &value) in &world.relations.officer_faction {
        rows.push(RelationRow { kind: "officer_faction", a, b, value });
    }
    for (&(a, b), &value) in &world.relations.faction_faction {
        rows.push(RelationRow { kind: "faction_faction", a, b, value });
    }
    rows
}
