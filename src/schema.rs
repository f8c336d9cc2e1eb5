use indexmap::IndexSet;

use crate::record::{CORE_HEADERS, MatchRecord};

/// Append-only, first-seen ordered set of output columns.
#[derive(Debug, Clone)]
pub struct SchemaAccumulator {
    columns: IndexSet<String>,
}

impl Default for SchemaAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaAccumulator {
    pub fn new() -> Self {
        Self {
            columns: CORE_HEADERS.iter().map(|h| h.to_string()).collect(),
        }
    }

    pub fn register(&mut self, name: &str) -> bool {
        if self.columns.contains(name) {
            return false;
        }
        self.columns.insert(name.to_string())
    }

    pub fn absorb(&mut self, record: &MatchRecord) {
        for column in record.columns() {
            self.register(column);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains(name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.columns.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_idempotent_and_ordered() {
        let mut schema = SchemaAccumulator::new();
        let seeded = schema.len();
        assert!(!schema.register("kills"));
        assert!(schema.register("bomb_stats_bomb_plants"));
        assert!(schema.register("medal_Killjoy"));
        assert!(!schema.register("bomb_stats_bomb_plants"));
        assert_eq!(schema.len(), seeded + 2);
        let tail: Vec<&str> = schema.columns().skip(seeded).collect();
        assert_eq!(tail, ["bomb_stats_bomb_plants", "medal_Killjoy"]);
        assert_eq!(schema.columns().next(), Some("player_gamertag"));
    }
}
