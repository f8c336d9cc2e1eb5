use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;

pub const CORE_HEADERS: &[&str] = &[
    "player_gamertag",
    "player_xuid",
    "match_number",
    "match_id",
    "date",
    "duration",
    "game_type",
    "map",
    "playlist",
    "playlist_id",
    "outcome",
    "team_id",
    "team_rank",
    "kills",
    "deaths",
    "assists",
    "kd",
    "kda",
    "accuracy",
    "score",
    "medal_count",
    "match_csr_value",
    "match_csr_tier_name",
    "match_csr_sub_tier_name",
    "match_mmr_value",
    "current_csr_value",
    "current_csr_tier_name",
    "current_csr_sub_tier_name",
    "current_csr_measurement_matches_remaining",
    "current_csr_initial_measurement_matches",
    "current_csr_tier_start",
    "season_max_csr_value",
    "season_max_csr_tier_name",
    "season_max_csr_sub_tier_name",
    "all_time_max_csr_value",
    "all_time_max_csr_tier_name",
    "all_time_max_csr_sub_tier_name",
];

const NUMERIC_COLUMNS: &[&str] = &[
    "match_number",
    "team_id",
    "team_rank",
    "kills",
    "deaths",
    "assists",
    "kd",
    "kda",
    "score",
    "medal_count",
    "accuracy",
];

const SNAPSHOT_PREFIXES: &[&str] = &[
    "current_csr_",
    "season_max_csr_",
    "all_time_max_csr_",
    "match_csr_",
    "post_match_csr_",
    "match_mmr_",
];

const SNAPSHOT_NUMERIC_SUFFIXES: &[&str] = &["_id", "_value", "_start", "_remaining", "_matches"];

const COUNT_SUFFIXES: &[&str] = &[
    "_count",
    "_kills",
    "_score",
    "_ticks",
    "_captures",
    "_defusals",
    "_plants",
    "_returns",
    "_steals",
    "_grabs",
    "_secures",
    "_denied",
    "_survived",
    "_remaining",
    "_assists",
    "_executions",
    "_pick_ups",
    "_detonations",
];

const NUMERIC_PREFIXES: &[&str] = &["time_", "damage_", "medal_"];

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn empty() -> Self {
        Cell::Text(String::new())
    }

    /// Scalar form of a payload value. `null` has no cell; callers pick a column default.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(Cell::Int(i64::from(*b))),
            Value::Number(n) => {
                if let Some(v) = n.as_i64() {
                    Some(Cell::Int(v))
                } else if let Some(v) = n.as_u64().and_then(|v| i64::try_from(v).ok()) {
                    Some(Cell::Int(v))
                } else {
                    n.as_f64().map(Cell::Float)
                }
            }
            Value::String(s) => Some(Cell::Text(s.clone())),
            other => Some(Cell::Text(other.to_string())),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Int(v) => write!(f, "{v}"),
            Cell::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{v:.1}"),
            Cell::Float(v) => write!(f, "{v}"),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl From<i32> for Cell {
    fn from(value: i32) -> Self {
        Cell::Int(i64::from(value))
    }
}

impl From<usize> for Cell {
    fn from(value: usize) -> Self {
        Cell::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Float(value)
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

pub fn is_numeric_column(name: &str) -> bool {
    if NUMERIC_COLUMNS.contains(&name) {
        return true;
    }
    if SNAPSHOT_PREFIXES.iter().any(|p| name.starts_with(p))
        && SNAPSHOT_NUMERIC_SUFFIXES.iter().any(|s| name.ends_with(s))
    {
        return true;
    }
    COUNT_SUFFIXES.iter().any(|s| name.ends_with(s))
        || NUMERIC_PREFIXES.iter().any(|p| name.starts_with(p))
        || name.contains("time_as_")
}

/// Value a column takes when the payload did not supply one: `0` for count, score, time and
/// damage like columns, otherwise an empty string.
pub fn column_default(name: &str) -> Cell {
    if is_numeric_column(name) {
        Cell::Int(0)
    } else {
        Cell::empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchRecord {
    cells: IndexMap<String, Cell>,
}

impl MatchRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Cell>) {
        self.cells.insert(column.into(), value.into());
    }

    pub fn set_default(&mut self, column: &str, value: impl Into<Cell>) -> bool {
        if self.cells.contains_key(column) {
            return false;
        }
        self.cells.insert(column.to_string(), value.into());
        true
    }

    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.cells.get(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.cells.contains_key(column)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    /// Re-keys the record against `schema`: columns follow schema order and every missing
    /// column is backfilled with [`column_default`].
    pub fn rekey<'a>(&mut self, schema: impl IntoIterator<Item = &'a str>) {
        let mut old = std::mem::take(&mut self.cells);
        for column in schema {
            let value = old
                .swap_remove(column)
                .unwrap_or_else(|| column_default(column));
            self.cells.insert(column.to_string(), value);
        }
        // Unregistered leftovers keep their relative order at the tail.
        self.cells.extend(old);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_heuristic_matches_count_like_columns() {
        assert!(is_numeric_column("capture_the_flag_stats_flag_captures"));
        assert!(is_numeric_column("oddball_stats_time_as_skull_carrier"));
        assert!(is_numeric_column("medal_Killjoy"));
        assert!(is_numeric_column("post_match_csr_value"));
        assert!(is_numeric_column("damage_dealt"));
        assert!(!is_numeric_column("current_csr_tier_name"));
        assert!(!is_numeric_column("average_life_duration"));
        assert_eq!(column_default("map"), Cell::empty());
    }

    #[test]
    fn float_cells_keep_a_decimal() {
        assert_eq!(Cell::Float(3.0).to_string(), "3.0");
        assert_eq!(Cell::Float(0.25).to_string(), "0.25");
        assert_eq!(Cell::Int(10).to_string(), "10");
    }

    #[test]
    fn rekey_orders_and_backfills() {
        let mut record = MatchRecord::new();
        record.set("map", "Aquarius");
        record.set("kills", 4i64);
        record.rekey(["kills", "map", "bomb_stats_bomb_plants", "game_type"]);
        let cols: Vec<&str> = record.columns().collect();
        assert_eq!(cols, ["kills", "map", "bomb_stats_bomb_plants", "game_type"]);
        assert_eq!(record.get("bomb_stats_bomb_plants"), Some(&Cell::Int(0)));
        assert_eq!(record.get("game_type"), Some(&Cell::empty()));
    }
}
