mod common;

use grand_campaign::engine::{
    BattleContext, CampaignGraph, Objective, Side, Step, TurnScheduler, auto_resolve,
    declare_attack, resolve,
};
use grand_campaign::model::{Rank, World};
use grand_campaign::testutil;
use rand::SeedableRng;
use rand::rngs::SmallRng;

fn run_one_day(world: &mut World, scheduler: &mut TurnScheduler, rng: &mut SmallRng) -> u32 {
    for _ in 0..100 {
        match scheduler.step(world, rng) {
            Step::DayComplete(day) => return day,
            Step::AwaitPlayerTurn => scheduler.end_player_turn(),
            Step::AwaitBattle(mut ctx) => {
                if let Some(player) = world.player() {
                    ctx.join_side(player, Side::Defenders);
                }
                let outcome = auto_resolve(&ctx, rng);
                scheduler.submit_battle(world, ctx, outcome).unwrap();
            }
        }
    }
    panic!("day did not complete within 100 steps");
}

#[test]
fn declared_attack_resolves_into_conquest() {
    let mut world = common::build_test_world();
    let graph = CampaignGraph::from_world(&world);
    let xiahou_dun = testutil::officer_by_name(&world, "Xiahou Dun");
    let guan_yu = testutil::officer_by_name(&world, "Guan Yu");
    let hanzhong = testutil::city_by_name(&world, "Hanzhong");
    let wei = world.officer(xiahou_dun).faction.unwrap();

    // Overwhelming force: the ±20 fortune swing cannot save the defender.
    world.officer_mut(xiahou_dun).rank = Rank::Sovereign;
    world.officer_mut(xiahou_dun).troops = 20_000;
    world.officer_mut(guan_yu).troops = 200;

    declare_attack(&mut world, &graph, xiahou_dun, hanzhong).unwrap();
    assert!(world.pending_at(hanzhong).is_some());

    let mut rng = SmallRng::seed_from_u64(9);
    let ctx = BattleContext::build(&world, hanzhong, &mut rng);
    let outcome = auto_resolve(&ctx, &mut rng);
    assert!(outcome.attackers_won);

    let report = resolve(&mut world, ctx, outcome).unwrap();
    assert_eq!(report.city_flipped_to, Some(Some(wei)));
    assert_eq!(world.city(hanzhong).owner, Some(wei));
    assert_eq!(world.officer(xiahou_dun).location, hanzhong);
    assert!(world.pending_at(hanzhong).is_none());
    // Declaration paid 15, victory at least 50 more.
    assert!(world.officer(xiahou_dun).reputation >= 565);
}

#[test]
fn a_week_of_ai_play_keeps_the_world_consistent() {
    let mut world = common::build_test_world();
    let mut scheduler = TurnScheduler::new(CampaignGraph::from_world(&world));
    let mut rng = SmallRng::seed_from_u64(31);

    for expected in 1..=7u32 {
        let finished = run_one_day(&mut world, &mut scheduler, &mut rng);
        assert_eq!(finished, expected);
        for city in world.cities.values() {
            if let Some(owner) = city.owner {
                assert!(world.factions.contains_key(&owner));
            }
        }
        for officer in world.officers.values() {
            assert!(officer.troops <= officer.max_troops());
            assert_eq!(officer.ap, officer.max_ap, "ap resets at end of day");
        }
    }
    assert_eq!(world.current_day, 8);
}

#[test]
fn independent_player_is_asked_each_day() {
    let mut world = common::build_test_world();
    let wan = testutil::city_by_name(&world, "Wan");
    testutil::add_player(&mut world, "Hero", wan);
    let mut scheduler = TurnScheduler::new(CampaignGraph::from_world(&world));
    let mut rng = SmallRng::seed_from_u64(4);

    let mut player_turns = 0;
    for _ in 0..3 {
        for _ in 0..100 {
            match scheduler.step(&mut world, &mut rng) {
                Step::DayComplete(_) => break,
                Step::AwaitPlayerTurn => {
                    player_turns += 1;
                    scheduler.end_player_turn();
                }
                Step::AwaitBattle(ctx) => {
                    let outcome = auto_resolve(&ctx, &mut rng);
                    scheduler.submit_battle(&mut world, ctx, outcome).unwrap();
                }
            }
        }
    }
    assert_eq!(player_turns, 3, "one player slot per day");
}

#[test]
fn player_battles_are_deferred_to_the_host() {
    let mut world = common::build_test_world();
    let graph = CampaignGraph::from_world(&world);
    let hanzhong = testutil::city_by_name(&world, "Hanzhong");
    let player = testutil::add_player(&mut world, "Hero", hanzhong);
    let xiahou_dun = testutil::officer_by_name(&world, "Xiahou Dun");
    declare_attack(&mut world, &graph, xiahou_dun, hanzhong).unwrap();

    let mut scheduler = TurnScheduler::new(CampaignGraph::from_world(&world));
    let mut rng = SmallRng::seed_from_u64(12);

    let mut saw_battle = false;
    for _ in 0..100 {
        match scheduler.step(&mut world, &mut rng) {
            Step::DayComplete(_) => break,
            Step::AwaitPlayerTurn => scheduler.end_player_turn(),
            Step::AwaitBattle(mut ctx) => {
                saw_battle = true;
                // The uncommitted player makes this a choose-your-side fight.
                assert_eq!(ctx.objective, Objective::ChooseYourSide);
                assert!(ctx.join_side(player, Side::Defenders));
                let outcome = auto_resolve(&ctx, &mut rng);
                scheduler.submit_battle(&mut world, ctx, outcome).unwrap();
            }
        }
    }
    assert!(saw_battle, "the contested city never reached the host");
    assert!(world.pending_at(hanzhong).is_none());
}
