use serde_json::{Map, Value};

use crate::attr;
use crate::metadata::MedalCatalog;
use crate::record::{Cell, MatchRecord, column_default};
use crate::schema::SchemaAccumulator;

const CORE_CATEGORY: &str = "core_stats";

pub struct StatsFlattener<'c> {
    medals: &'c MedalCatalog,
}

impl<'c> StatsFlattener<'c> {
    pub fn new(medals: &'c MedalCatalog) -> Self {
        Self { medals }
    }

    /// Flattens a participant `stats` object. Returns the non-core categories the payload
    /// exposed, in payload order.
    pub fn flatten(
        &self,
        stats: &Value,
        record: &mut MatchRecord,
        schema: &mut SchemaAccumulator,
    ) -> Vec<String> {
        let Some(groups) = stats.as_object() else {
            return Vec::new();
        };
        if let Some(core) = groups.get(CORE_CATEGORY).and_then(Value::as_object) {
            self.flatten_core(core, record, schema);
        }

        let mut categories = Vec::new();
        for (category, fields) in groups {
            if category == CORE_CATEGORY || category.starts_with('_') {
                continue;
            }
            let Some(fields) = fields.as_object() else {
                continue;
            };
            for (field, value) in fields {
                let column = format!("{category}_{field}");
                let cell = Cell::from_json(value).unwrap_or_else(|| column_default(&column));
                schema.register(&column);
                record.set(column, cell);
            }
            categories.push(category.clone());
        }
        categories
    }

    fn flatten_core(
        &self,
        core: &Map<String, Value>,
        record: &mut MatchRecord,
        schema: &mut SchemaAccumulator,
    ) {
        for (name, value) in core {
            match name.as_str() {
                "medals" => {
                    let count = value.as_array().map_or(0, Vec::len);
                    record.set("medal_count", count);
                    self.count_columns(value, record, schema);
                }
                "personal_scores" => self.count_columns(value, record, schema),
                "accuracy" => record.set("accuracy", accuracy_cell(value)),
                _ => {
                    let cell = Cell::from_json(value).unwrap_or_else(|| column_default(name));
                    schema.register(name);
                    record.set(name.as_str(), cell);
                }
            }
        }
        if let Some(kd) = kill_death_ratio(core) {
            record.set("kd", kd);
        }
    }

    fn count_columns(&self, entries: &Value, record: &mut MatchRecord, schema: &mut SchemaAccumulator) {
        let Some(entries) = entries.as_array() else {
            return;
        };
        for entry in entries {
            let (Some(id), Some(count)) = (
                attr::lookup(entry, &["name_id"]),
                attr::lookup(entry, &["count"]).and_then(Cell::from_json),
            ) else {
                continue;
            };
            let column = self.medal_column(id);
            schema.register(&column);
            record.set(column, count);
        }
    }

    pub fn medal_column(&self, id: &Value) -> String {
        match self.medals.name_for(id) {
            Some(name) => format!("medal_{}", sanitize_identifier(name)),
            None => format!(
                "medal_id_{}",
                attr::as_text(id).unwrap_or_else(|| id.to_string())
            ),
        }
    }
}

pub fn sanitize_identifier(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

fn accuracy_cell(value: &Value) -> Cell {
    match value {
        Value::Number(n) if n.is_f64() => {
            let ratio = n.as_f64().unwrap_or_default();
            if ratio <= 1.0 {
                Cell::Float(ratio * 100.0)
            } else {
                Cell::Float(ratio)
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Cell::Float)
            .unwrap_or_else(|_| Cell::text(s.as_str())),
        other => Cell::from_json(other).unwrap_or(Cell::Int(0)),
    }
}

/// `kd`/`kdr` when the payload carries one, else kills / deaths rounded to two places.
/// With no deaths the ratio is the kill count.
pub fn kill_death_ratio(core: &Map<String, Value>) -> Option<Cell> {
    for key in ["kd", "kdr"] {
        if let Some(cell) = core.get(key).and_then(Cell::from_json) {
            return Some(cell);
        }
    }
    let kills = core.get("kills").and_then(attr::as_float)?;
    let deaths = core.get("deaths").and_then(attr::as_float)?;
    if deaths > 0.0 {
        Some(Cell::Float((kills / deaths * 100.0).round() / 100.0))
    } else {
        core.get("kills").and_then(Cell::from_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn core(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn kd_falls_back_to_kills_without_deaths() {
        assert_eq!(kill_death_ratio(&core(json!({"kills": 10, "deaths": 0}))), Some(Cell::Int(10)));
        assert_eq!(kill_death_ratio(&core(json!({"kills": 9, "deaths": 3}))), Some(Cell::Float(3.0)));
        assert_eq!(kill_death_ratio(&core(json!({"kills": 7, "deaths": 3}))), Some(Cell::Float(2.33)));
        assert_eq!(kill_death_ratio(&core(json!({"kdr": 1.5, "kills": 1}))), Some(Cell::Float(1.5)));
        assert_eq!(kill_death_ratio(&core(json!({"kills": 1}))), None);
    }

    #[test]
    fn accuracy_ratio_is_rescaled() {
        assert_eq!(accuracy_cell(&json!(0.5)), Cell::Float(50.0));
        assert_eq!(accuracy_cell(&json!(47.25)), Cell::Float(47.25));
        assert_eq!(accuracy_cell(&json!("53.33")), Cell::Float(53.33));
    }

    #[test]
    fn sanitize_replaces_punctuation() {
        assert_eq!(sanitize_identifier("Grapple-Jack!"), "Grapple_Jack_");
        assert_eq!(sanitize_identifier("Ninja"), "Ninja");
    }
}
