//! Instant battle resolution by aggregate strength.

use std::collections::BTreeMap;

use rand::Rng;
use rand::rngs::SmallRng;

use crate::consts;
use crate::engine::context::{BattleContext, BattleOutcome, Combatant};

fn side_strength(roster: &[Combatant]) -> f32 {
    roster
        .iter()
        .map(|c| c.strength as f32 + c.troops as f32 / 100.0)
        .sum()
}

/// Resolve a battle without simulating it. Pure: all persistent consequences
/// (loot, reputation, promotion) are applied by the resolver.
pub fn auto_resolve(ctx: &BattleContext, rng: &mut SmallRng) -> BattleOutcome {
    let attacker_strength = side_strength(&ctx.attackers);
    let defender_strength = if ctx.defenders.is_empty() && ctx.defender_faction.is_none() {
        consts::AUTO_EMPTY_CITY_STRENGTH
    } else {
        side_strength(&ctx.defenders) + consts::AUTO_DEFENDER_BONUS
    };

    let luck = rng.random_range(-consts::AUTO_LUCK_SWING..=consts::AUTO_LUCK_SWING);
    let attackers_won = attacker_strength + luck > defender_strength;

    let winner_loss = rng.random_range(consts::AUTO_WINNER_LOSS.0..=consts::AUTO_WINNER_LOSS.1);
    let loser_loss = rng.random_range(consts::AUTO_LOSER_LOSS.0..=consts::AUTO_LOSER_LOSS.1);
    let (attacker_loss, defender_loss) = if attackers_won {
        (winner_loss, loser_loss)
    } else {
        (loser_loss, winner_loss)
    };

    let mut survivors = BTreeMap::new();
    for (roster, loss) in [(&ctx.attackers, attacker_loss), (&ctx.defenders, defender_loss)] {
        for combatant in roster.iter() {
            let kept = (combatant.troops as f32 * (1.0 - loss)).floor() as u32;
            survivors.insert(combatant.officer_id, kept);
        }
    }

    BattleOutcome {
        attackers_won,
        survivors,
    }
}
