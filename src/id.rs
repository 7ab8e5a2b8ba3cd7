/// Monotonic ID generator shared across all record types.
/// Guarantees globally unique positive IDs — no two objects of any type share an ID.
/// Negative IDs are reserved for synthetic battle-only combatants (militia).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IdGenerator {
    next: i64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn starting_from(start: i64) -> Self {
        assert!(start > 0, "IdGenerator: ids must be positive");
        Self { next: start }
    }

    pub fn next_id(&mut self) -> i64 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Bump the counter past `id` so reloaded worlds never reissue an ID.
    pub fn observe(&mut self, id: i64) {
        if id >= self.next {
            self.next = id + 1;
        }
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
