use grand_campaign::model::World;
use grand_campaign::testutil;

/// The shared two-faction campaign with a few opinion rows filled in, so
/// the relation tables have something to persist.
pub fn build_test_world() -> World {
    let mut world = testutil::two_faction_world();

    let cao_cao = testutil::officer_by_name(&world, "Cao Cao");
    let liu_bei = testutil::officer_by_name(&world, "Liu Bei");
    let wei = world.officer(cao_cao).faction.unwrap();
    let shu = world.officer(liu_bei).faction.unwrap();

    world.relations.adjust_officers(cao_cao, liu_bei, -60);
    world.relations.adjust_factions(wei, shu, -40);
    world.relations.adjust_officer_faction(liu_bei, wei, -25);

    world
}

#[allow(dead_code)]
pub fn read_lines(path: &std::path::Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}
