use serde_json::Value;

use crate::attr;
use crate::error::{FetchError, FetchResult};
use crate::record::{Cell, MatchRecord};
use crate::source::payload_player_id;

pub const DEFAULT_RANKED_PLAYLIST: &str = "edfef3ac-9cbe-4fa2-b949-8f29deafd483";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSlot {
    Current,
    SeasonMax,
    AllTimeMax,
    Match,
    PostMatch,
}

impl SnapshotSlot {
    pub fn prefix(self) -> &'static str {
        match self {
            SnapshotSlot::Current => "current_csr",
            SnapshotSlot::SeasonMax => "season_max_csr",
            SnapshotSlot::AllTimeMax => "all_time_max_csr",
            SnapshotSlot::Match => "match_csr",
            SnapshotSlot::PostMatch => "post_match_csr",
        }
    }

    fn has_progress(self) -> bool {
        matches!(self, SnapshotSlot::Current)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsrReading {
    pub value: Option<Cell>,
    pub tier: Option<String>,
    pub sub_tier: Option<String>,
    pub tier_start: Option<Cell>,
    pub measurement_matches_remaining: Option<Cell>,
    pub initial_measurement_matches: Option<Cell>,
}

impl CsrReading {
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        let cell = |key: &str| attr::lookup(value, &[key]).and_then(Cell::from_json);
        Some(CsrReading {
            value: cell("value"),
            tier: attr::text_at(value, &["tier"]),
            sub_tier: attr::text_at(value, &["sub_tier"]),
            tier_start: cell("tier_start"),
            measurement_matches_remaining: cell("measurement_matches_remaining"),
            initial_measurement_matches: cell("initial_measurement_matches"),
        })
    }

    pub fn apply(&self, record: &mut MatchRecord, slot: SnapshotSlot) {
        let prefix = slot.prefix();
        if let Some(value) = &self.value {
            record.set(format!("{prefix}_value"), value.clone());
        }
        if let Some(tier) = &self.tier {
            record.set(format!("{prefix}_tier_name"), tier.as_str());
        }
        if let Some(sub_tier) = &self.sub_tier {
            record.set(format!("{prefix}_sub_tier_name"), sub_tier.as_str());
        }
        if !slot.has_progress() {
            return;
        }
        if let Some(v) = &self.measurement_matches_remaining {
            record.set(format!("{prefix}_measurement_matches_remaining"), v.clone());
        }
        if let Some(v) = &self.initial_measurement_matches {
            record.set(format!("{prefix}_initial_measurement_matches"), v.clone());
        }
        if let Some(v) = &self.tier_start {
            record.set(format!("{prefix}_tier_start"), v.clone());
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankTriple {
    pub current: Option<CsrReading>,
    pub season_max: Option<CsrReading>,
    pub all_time_max: Option<CsrReading>,
}

impl RankTriple {
    fn from_value(value: &Value) -> Option<Self> {
        let reading = |key: &str| attr::lookup(value, &[key]).and_then(CsrReading::from_value);
        let triple = RankTriple {
            current: reading("current"),
            season_max: reading("season_max"),
            all_time_max: reading("all_time_max"),
        };
        if triple.current.is_none() && triple.season_max.is_none() && triple.all_time_max.is_none()
        {
            None
        } else {
            Some(triple)
        }
    }

    pub fn apply(&self, record: &mut MatchRecord) {
        if let Some(r) = &self.current {
            r.apply(record, SnapshotSlot::Current);
        }
        if let Some(r) = &self.season_max {
            r.apply(record, SnapshotSlot::SeasonMax);
        }
        if let Some(r) = &self.all_time_max {
            r.apply(record, SnapshotSlot::AllTimeMax);
        }
    }
}

/// Known shapes of a rank-triple payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RankShape<'a> {
    /// `{result: {current, season_max, all_time_max}}`
    Wrapped(RankTriple),
    /// `{current, season_max, all_time_max}`
    Nested(RankTriple),
    Unknown(&'a Value),
}

impl<'a> RankShape<'a> {
    pub fn decode(value: &'a Value) -> Self {
        if let Some(triple) = attr::lookup(value, &["result"]).and_then(RankTriple::from_value) {
            return RankShape::Wrapped(triple);
        }
        if let Some(triple) = RankTriple::from_value(value) {
            return RankShape::Nested(triple);
        }
        RankShape::Unknown(value)
    }

    pub fn into_triple(self) -> FetchResult<RankTriple> {
        match self {
            RankShape::Wrapped(triple) | RankShape::Nested(triple) => Ok(triple),
            RankShape::Unknown(_) => Err(FetchError::Shape("no rank snapshot present".into())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchSkillReading {
    pub pre_match: Option<CsrReading>,
    pub post_match: Option<CsrReading>,
    pub mmr: Option<Cell>,
}

impl MatchSkillReading {
    pub fn apply(&self, record: &mut MatchRecord) {
        if let Some(r) = &self.pre_match {
            r.apply(record, SnapshotSlot::Match);
        }
        if let Some(r) = &self.post_match {
            r.apply(record, SnapshotSlot::PostMatch);
        }
        if let Some(mmr) = &self.mmr {
            record.set("match_mmr_value", mmr.clone());
        }
    }

    /// `{id, csr, mmr: {value}}` entries.
    fn from_flat(entry: &Value) -> Self {
        MatchSkillReading {
            pre_match: attr::lookup(entry, &["csr"]).and_then(CsrReading::from_value),
            post_match: None,
            mmr: attr::lookup(entry, &["mmr", "value"]).and_then(Cell::from_json),
        }
    }

    /// `{id, result: {rank_recap: {pre_match_csr, post_match_csr}, team_mmr}}` entries.
    fn from_rank_recap(entry: &Value) -> Self {
        let recap = |key: &str| {
            attr::lookup(entry, &["result", "rank_recap", key]).and_then(CsrReading::from_value)
        };
        MatchSkillReading {
            pre_match: recap("pre_match_csr"),
            post_match: recap("post_match_csr"),
            mmr: attr::lookup(entry, &["result", "team_mmr"]).and_then(Cell::from_json),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillShapeKind {
    PlayersList,
    RankRecapList,
    FlatValue,
}

/// Order in which match-skill shapes are tried. Live payloads have only ever matched one
/// shape at a time; the first shape that carries the queried player wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillShapePriority(pub Vec<SkillShapeKind>);

impl Default for SkillShapePriority {
    fn default() -> Self {
        SkillShapePriority(vec![
            SkillShapeKind::PlayersList,
            SkillShapeKind::RankRecapList,
            SkillShapeKind::FlatValue,
        ])
    }
}

/// Known shapes of a per-match skill response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchSkillShape<'a> {
    /// `{players: [{id, csr, mmr}]}`
    PlayersList(&'a [Value]),
    /// `{value: [{id, result: {rank_recap, team_mmr}}]}`
    RankRecapList(&'a [Value]),
    /// `{value: {id, csr, mmr}}`
    FlatValue(&'a Value),
    Unknown(&'a Value),
}

impl<'a> MatchSkillShape<'a> {
    fn decode_as(kind: SkillShapeKind, response: &'a Value) -> Option<Self> {
        match kind {
            SkillShapeKind::PlayersList => attr::lookup(response, &["players"])
                .and_then(Value::as_array)
                .filter(|list| !list.is_empty())
                .map(|list| MatchSkillShape::PlayersList(list.as_slice())),
            SkillShapeKind::RankRecapList => attr::lookup(response, &["value"])
                .and_then(Value::as_array)
                .map(|list| MatchSkillShape::RankRecapList(list.as_slice())),
            SkillShapeKind::FlatValue => attr::lookup(response, &["value"])
                .filter(|v| v.is_object() && (attr::has(v, "id") || attr::has(v, "result")))
                .map(MatchSkillShape::FlatValue),
        }
    }

    pub fn decode_all(response: &'a Value, priority: &SkillShapePriority) -> Vec<Self> {
        let shapes: Vec<Self> = priority
            .0
            .iter()
            .filter_map(|kind| Self::decode_as(*kind, response))
            .collect();
        if shapes.is_empty() {
            vec![MatchSkillShape::Unknown(response)]
        } else {
            shapes
        }
    }

    pub fn reading_for(&self, player_id: &str) -> Option<MatchSkillReading> {
        match self {
            MatchSkillShape::PlayersList(list) => find_player(list, player_id)
                .map(MatchSkillReading::from_flat),
            MatchSkillShape::RankRecapList(list) => find_player(list, player_id)
                .map(MatchSkillReading::from_rank_recap),
            MatchSkillShape::FlatValue(entry) => is_player(entry, player_id)
                .then(|| MatchSkillReading::from_flat(entry)),
            MatchSkillShape::Unknown(_) => None,
        }
    }
}

fn is_player(entry: &Value, player_id: &str) -> bool {
    attr::lookup(entry, &["id"])
        .and_then(payload_player_id)
        .is_some_and(|id| id == player_id)
}

fn find_player<'a>(list: &'a [Value], player_id: &str) -> Option<&'a Value> {
    list.iter().find(|entry| is_player(entry, player_id))
}

#[derive(Debug, Clone)]
pub struct CsrExtractor {
    pub priority: SkillShapePriority,
    pub fallback_playlist: String,
}

impl Default for CsrExtractor {
    fn default() -> Self {
        Self {
            priority: SkillShapePriority::default(),
            fallback_playlist: DEFAULT_RANKED_PLAYLIST.to_string(),
        }
    }
}

impl CsrExtractor {
    pub fn with_fallback_playlist(mut self, playlist: impl Into<String>) -> Self {
        self.fallback_playlist = playlist.into();
        self
    }

    pub fn lookup_playlist<'b>(&'b self, playlist_id: Option<&'b str>) -> &'b str {
        playlist_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or(self.fallback_playlist.as_str())
    }

    pub fn apply_rank(&self, value: &Value, record: &mut MatchRecord) -> FetchResult<()> {
        RankShape::decode(value).into_triple()?.apply(record);
        Ok(())
    }

    pub fn apply_participant(&self, participant: &Value, record: &mut MatchRecord) -> FetchResult<()> {
        let reading = attr::lookup(participant, &["csr"])
            .and_then(CsrReading::from_value)
            .ok_or_else(|| FetchError::Shape("participant carries no csr".into()))?;
        reading.apply(record, SnapshotSlot::Current);
        Ok(())
    }

    pub fn apply_match_skill(
        &self,
        response: &Value,
        player_id: &str,
        record: &mut MatchRecord,
    ) -> FetchResult<()> {
        let reading = MatchSkillShape::decode_all(response, &self.priority)
            .iter()
            .find_map(|shape| shape.reading_for(player_id))
            .ok_or_else(|| {
                FetchError::Shape(format!("match skill carries no entry for {player_id}"))
            })?;
        reading.apply(record);
        Ok(())
    }

    /// Playlist rank responses are either a `value` list keyed by player id or a single triple.
    pub fn apply_playlist_skill(
        &self,
        response: &Value,
        player_id: &str,
        record: &mut MatchRecord,
    ) -> FetchResult<()> {
        if let Some(list) = attr::lookup(response, &["value"]).and_then(Value::as_array) {
            let entry = find_player(list, player_id).ok_or_else(|| {
                FetchError::Shape(format!("playlist rank carries no entry for {player_id}"))
            })?;
            return self.apply_rank(entry, record);
        }
        self.apply_rank(response, record)
    }
}
