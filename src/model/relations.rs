use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Sparse opinion tables. Missing rows read 0; stored values are clamped to
/// [-100, 100]. Officer↔officer rows are symmetric and keyed low-id-first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Relations {
    pub officer_officer: BTreeMap<(i64, i64), i32>,
    pub officer_faction: BTreeMap<(i64, i64), i32>,
    pub faction_faction: BTreeMap<(i64, i64), i32>,
}

fn canonical(a: i64, b: i64) -> (i64, i64) {
    if a <= b { (a, b) } else { (b, a) }
}

impl Relations {
    /// Opinion between two officers. An officer's opinion of themself is 100.
    pub fn officers(&self, a: i64, b: i64) -> i32 {
        if a == b {
            return 100;
        }
        self.officer_officer
            .get(&canonical(a, b))
            .copied()
            .unwrap_or(0)
    }

    pub fn adjust_officers(&mut self, a: i64, b: i64, delta: i32) {
        if a == b {
            return;
        }
        let key = canonical(a, b);
        let value = self.officer_officer.get(&key).copied().unwrap_or(0);
        self.officer_officer
            .insert(key, (value + delta).clamp(-100, 100));
    }

    pub fn officer_faction(&self, officer: i64, faction: i64) -> i32 {
        self.officer_faction
            .get(&(officer, faction))
            .copied()
            .unwrap_or(0)
    }

    pub fn adjust_officer_faction(&mut self, officer: i64, faction: i64, delta: i32) {
        let value = self.officer_faction(officer, faction);
        self.officer_faction
            .insert((officer, faction), (value + delta).clamp(-100, 100));
    }

    pub fn factions(&self, a: i64, b: i64) -> i32 {
        if a == b {
            return 100;
        }
        self.faction_faction
            .get(&canonical(a, b))
            .copied()
            .unwrap_or(0)
    }

    pub fn adjust_factions(&mut self, a: i64, b: i64, delta: i32) {
        if a == b {
            return;
        }
        let key = canonical(a, b);
        let value = self.faction_faction.get(&key).copied().unwrap_or(0);
        self.faction_faction
            .insert(key, (value + delta).clamp(-100, 100));
    }

    /// Drop every row mentioning the faction. Used by the elimination cascade.
    pub fn purge_faction(&mut self, faction: i64) {
        self.officer_faction.retain(|&(_, f), _| f != faction);
        self.faction_faction
            .retain(|&(a, b), _| a != faction && b != faction);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_rows_read_zero() {
        let relations = Relations::default();
        assert_eq!(relations.officers(1, 2), 0);
        assert_eq!(relations.officer_faction(1, 10), 0);
        assert_eq!(relations.factions(10, 11), 0);
    }

    #[test]
    fn self_opinion_is_always_full() {
        let mut relations = Relations::default();
        relations.adjust_officers(5, 5, -40);
        assert_eq!(relations.officers(5, 5), 100);
        assert!(relations.officer_officer.is_empty());
    }

    #[test]
    fn symmetric_and_clamped() {
        let mut relations = Relations::default();
        relations.adjust_officers(2, 1, 80);
        relations.adjust_officers(1, 2, 80);
        assert_eq!(relations.officers(1, 2), 100);
        assert_eq!(relations.officers(2, 1), 100);
        relations.adjust_officers(1, 2, -300);
        assert_eq!(relations.officers(1, 2), -100);
    }

    #[test]
    fn purge_drops_both_tables() {
        let mut relations = Relations::default();
        relations.adjust_officer_faction(1, 10, 30);
        relations.adjust_officer_faction(1, 11, 30);
        relations.adjust_factions(10, 11, -20);
        relations.purge_faction(10);
        assert_eq!(relations.officer_faction(1, 10), 0);
        assert_eq!(relations.officer_faction(1, 11), 30);
        assert_eq!(relations.factions(10, 11), 0);
    }
}
