use std::collections::{HashMap, HashSet};

use crate::generate::value::Value;

/// Run-scoped ledger of already-issued key values per `(table, column)`.
///
/// Owned by a single generation run and passed by reference into every
/// synthesis call; discarded when the run ends. Never a process-wide
/// singleton.
#[derive(Default)]
pub struct UniquenessRegistry {
    issued: HashMap<(String, String), HashSet<String>>,
}

impl UniquenessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `candidate` for `(table, column)` iff it has not been issued
    /// yet. Returns false without side effect on a duplicate.
    pub fn reserve(&mut self, table: &str, column: &str, candidate: &Value) -> bool {
        self.issued
            .entry((table.to_string(), column.to_string()))
            .or_default()
            .insert(candidate.to_unique_key())
    }

    /// Number of values issued for one column so far.
    pub fn issued_count(&self, table: &str, column: &str) -> usize {
        self.issued
            .get(&(table.to_string(), column.to_string()))
            .map(|s| s.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_rejects_duplicates() {
        let mut registry = UniquenessRegistry::new();
        let v = Value::Int(7);
        assert!(registry.reserve("orders", "order_id", &v));
        assert!(!registry.reserve("orders", "order_id", &v));
        assert!(registry.reserve("orders", "order_id", &Value::Int(8)));
        assert_eq!(registry.issued_count("orders", "order_id"), 2);
    }

    #[test]
    fn test_columns_are_independent() {
        let mut registry = UniquenessRegistry::new();
        let v = Value::String("x".into());
        assert!(registry.reserve("orders", "a", &v));
        assert!(registry.reserve("orders", "b", &v));
        assert!(registry.reserve("refunds", "a", &v));
    }
}
