use crate::record::{Cell, MatchRecord};
use crate::schema::SchemaAccumulator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatCategory {
    Bomb,
    CaptureTheFlag,
    Elimination,
    Oddball,
    Zones,
}

impl StatCategory {
    pub const ALL: [StatCategory; 5] = [
        StatCategory::Bomb,
        StatCategory::CaptureTheFlag,
        StatCategory::Elimination,
        StatCategory::Oddball,
        StatCategory::Zones,
    ];

    const CLASSIFY_ORDER: [StatCategory; 5] = [
        StatCategory::CaptureTheFlag,
        StatCategory::Bomb,
        StatCategory::Elimination,
        StatCategory::Oddball,
        StatCategory::Zones,
    ];

    pub fn key(self) -> &'static str {
        match self {
            StatCategory::Bomb => "bomb_stats",
            StatCategory::CaptureTheFlag => "capture_the_flag_stats",
            StatCategory::Elimination => "elimination_stats",
            StatCategory::Oddball => "oddball_stats",
            StatCategory::Zones => "zones_stats",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key() == key)
    }

    fn keywords(self) -> &'static [&'static str] {
        match self {
            StatCategory::CaptureTheFlag => &["ctf", "flag", "capture the flag"],
            StatCategory::Bomb => &["bomb", "assault"],
            StatCategory::Elimination => &["elim", "elimination", "attrition"],
            StatCategory::Oddball => &["oddball", "ball"],
            StatCategory::Zones => &["zone", "stronghold", "koth", "king", "control"],
        }
    }

    pub fn fields(self) -> &'static [&'static str] {
        match self {
            StatCategory::Bomb => &[
                "bomb_carriers_killed",
                "bomb_defusals",
                "bomb_defusers_killed",
                "bomb_detonations",
                "bomb_pick_ups",
                "bomb_plants",
                "bomb_returns",
                "kills_as_bomb_carrier",
                "time_as_bomb_carrier",
            ],
            StatCategory::CaptureTheFlag => &[
                "flag_capture_assists",
                "flag_captures",
                "flag_carriers_killed",
                "flag_grabs",
                "flag_returners_killed",
                "flag_returns",
                "flag_secures",
                "flag_steals",
                "kills_as_flag_carrier",
                "kills_as_flag_returner",
                "time_as_flag_carrier",
            ],
            StatCategory::Elimination => &[
                "allies_revived",
                "elimination_assists",
                "eliminations",
                "enemy_revives_denied",
                "executions",
                "kills_as_last_player_standing",
                "last_players_standing_killed",
                "rounds_survived",
                "times_revived_by_ally",
                "lives_remaining",
                "elimination_order",
            ],
            StatCategory::Oddball => &[
                "kills_as_skull_carrier",
                "longest_time_as_skull_carrier",
                "skull_carriers_killed",
                "skull_grabs",
                "time_as_skull_carrier",
                "skull_scoring_ticks",
            ],
            StatCategory::Zones => &[
                "zone_captures",
                "zone_defensive_kills",
                "zone_offensive_kills",
                "zone_secures",
                "total_zone_occupation_time",
                "zone_scoring_ticks",
                "stronghold_captures",
                "stronghold_defensive_kills",
                "stronghold_offensive_kills",
                "stronghold_secures",
                "stronghold_occupation_time",
                "stronghold_scoring_ticks",
            ],
        }
    }

    pub fn columns(self) -> impl Iterator<Item = String> {
        let key = self.key();
        self.fields().iter().map(move |f| format!("{key}_{f}"))
    }
}

pub fn classify(game_type: &str) -> Vec<StatCategory> {
    let lowered = game_type.to_lowercase();
    StatCategory::CLASSIFY_ORDER
        .into_iter()
        .filter(|c| c.keywords().iter().any(|k| lowered.contains(k)))
        .collect()
}

/// Categories that must be present on a record: the classified ones, plus any category the
/// payload exposed, or every category when neither yields anything.
pub fn applicable_categories(game_type: &str, exposed: &[String]) -> Vec<StatCategory> {
    let mut categories = classify(game_type);
    for category in exposed.iter().filter_map(|k| StatCategory::from_key(k)) {
        if !categories.contains(&category) {
            categories.push(category);
        }
    }
    if categories.is_empty() {
        categories = StatCategory::ALL.to_vec();
    }
    categories
}

pub fn fill_defaults(
    record: &mut MatchRecord,
    schema: &mut SchemaAccumulator,
    categories: &[StatCategory],
) -> usize {
    let mut added = 0;
    for category in categories {
        for column in category.columns() {
            if record.set_default(&column, Cell::Int(0)) {
                added += 1;
            }
            schema.register(&column);
        }
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_matches_keywords() {
        assert_eq!(classify("Capture the Flag"), vec![StatCategory::CaptureTheFlag]);
        assert_eq!(classify("Ranked:Oddball"), vec![StatCategory::Oddball]);
        assert_eq!(classify("King of the Hill"), vec![StatCategory::Zones]);
        assert!(classify("Slayer").is_empty());
    }

    #[test]
    fn unknown_modes_get_every_category() {
        assert_eq!(applicable_categories("Slayer", &[]), StatCategory::ALL.to_vec());
        let exposed = vec!["elimination_stats".to_string(), "extraction_stats".to_string()];
        assert_eq!(
            applicable_categories("CTF", &exposed),
            vec![StatCategory::CaptureTheFlag, StatCategory::Elimination]
        );
    }
}
