//! Builds one normalized record per (player, match).
//!
//! Stages run in a fixed order:
//! `FetchMatch -> ResolveNames -> LocateParticipant -> ExtractCsr -> FlattenStats -> FillDefaults -> Emit`.
//! Only a failed match fetch aborts; every later failure degrades to defaults.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::attr::{self, NAME_FIELDS};
use crate::csr::CsrExtractor;
use crate::error::{Degrade, FetchError};
use crate::flatten::StatsFlattener;
use crate::game_mode::{applicable_categories, fill_defaults};
use crate::metadata::MetadataCache;
use crate::record::{CORE_HEADERS, Cell, MatchRecord, column_default};
use crate::schema::SchemaAccumulator;
use crate::source::{AssetKind, PlayerRef, StatsService, payload_player_id};

const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    FetchMatch,
    ResolveNames,
    LocateParticipant,
    ExtractCsr,
    FlattenStats,
    FillDefaults,
    Emit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BuildOutcome {
    /// The player took part; the record went through every stage.
    Emitted(MatchRecord),
    /// The match loaded but the player was not among its participants; header fields only.
    ParticipantMissing(MatchRecord),
    /// No record for this pair.
    Aborted { stage: BuildStage, error: FetchError },
}

impl BuildOutcome {
    pub fn into_record(self) -> Option<MatchRecord> {
        match self {
            BuildOutcome::Emitted(record) | BuildOutcome::ParticipantMissing(record) => Some(record),
            BuildOutcome::Aborted { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchHeader {
    pub date: String,
    pub duration: String,
    pub game_type: String,
    pub map: String,
    pub playlist: String,
    pub playlist_id: Option<String>,
}

pub struct MatchRecordBuilder<'a, S: StatsService + ?Sized> {
    service: &'a S,
    csr: CsrExtractor,
}

impl<'a, S: StatsService + ?Sized> MatchRecordBuilder<'a, S> {
    pub fn new(service: &'a S) -> Self {
        Self {
            service,
            csr: CsrExtractor::default(),
        }
    }

    pub fn with_csr(mut self, csr: CsrExtractor) -> Self {
        self.csr = csr;
        self
    }

    pub fn build(
        &self,
        metadata: &mut MetadataCache<'a, S>,
        schema: &mut SchemaAccumulator,
        player: &PlayerRef,
        match_id: &str,
        match_number: usize,
    ) -> BuildOutcome {
        log::info!("Processing match ID: {match_id} for player {}", player.display_name);

        enter(match_id, BuildStage::FetchMatch);
        let detail = match self.service.match_detail(match_id) {
            Ok(detail) if detail.is_object() => detail,
            Ok(_) => {
                return abort(
                    match_id,
                    FetchError::Shape("match detail is not an object".into()),
                );
            }
            Err(error) => return abort(match_id, error),
        };

        enter(match_id, BuildStage::ResolveNames);
        let header = resolve_header(&detail, metadata);
        let mut record = header_record(player, match_id, match_number, &header);

        enter(match_id, BuildStage::LocateParticipant);
        let Some(participant) = find_participant(&detail, &player.id) else {
            log::warn!("{} not found among participants of {match_id}", player.display_name);
            schema.absorb(&record);
            return BuildOutcome::ParticipantMissing(record);
        };
        apply_participant_fields(&detail, participant, &mut record);
        for column in CORE_HEADERS {
            record.set_default(column, column_default(column));
        }

        enter(match_id, BuildStage::ExtractCsr);
        self.extract_csr(participant, player, match_id, header.playlist_id.as_deref(), &mut record);

        enter(match_id, BuildStage::FlattenStats);
        let exposed = match attr::lookup(participant, &["player_team_stats"])
            .and_then(Value::as_array)
            .and_then(|teams| teams.first())
            .and_then(|team| attr::lookup(team, &["stats"]))
        {
            Some(stats) => StatsFlattener::new(metadata.medal_catalog()).flatten(stats, &mut record, schema),
            None => Vec::new(),
        };

        enter(match_id, BuildStage::FillDefaults);
        let categories = applicable_categories(&header.game_type, &exposed);
        fill_defaults(&mut record, schema, &categories);

        enter(match_id, BuildStage::Emit);
        schema.absorb(&record);
        BuildOutcome::Emitted(record)
    }

    fn extract_csr(
        &self,
        participant: &Value,
        player: &PlayerRef,
        match_id: &str,
        playlist_id: Option<&str>,
        record: &mut MatchRecord,
    ) {
        let ids = [player.id.clone()];

        self.csr
            .apply_participant(participant, record)
            .or_degrade((), "participant csr");

        self.service
            .match_skill(match_id, &ids)
            .and_then(|response| self.csr.apply_match_skill(&response, &player.id, record))
            .or_degrade((), "match skill");

        let playlist = self.csr.lookup_playlist(playlist_id);
        self.service
            .playlist_skill(playlist, &ids)
            .and_then(|response| self.csr.apply_playlist_skill(&response, &player.id, record))
            .or_degrade((), "playlist csr");
    }
}

fn enter(match_id: &str, stage: BuildStage) {
    log::trace!("{match_id}: {stage:?}");
}

fn abort(match_id: &str, error: FetchError) -> BuildOutcome {
    log::warn!("skipping match {match_id}: {error}");
    BuildOutcome::Aborted {
        stage: BuildStage::FetchMatch,
        error,
    }
}

pub fn resolve_header<S: StatsService + ?Sized>(
    detail: &Value,
    metadata: &mut MetadataCache<'_, S>,
) -> MatchHeader {
    let null = Value::Null;
    let info = attr::lookup_or(detail, &["match_info"], &null);

    let mut game_type = match attr::lookup(info, &["game_variant_category"]) {
        Some(raw) if attr::as_int(raw).is_some() && !raw.is_boolean() => {
            format!("Game Type: {}", attr::as_text(raw).unwrap_or_default())
        }
        Some(raw) => attr::as_text(raw).unwrap_or_else(|| UNKNOWN.to_string()),
        None => UNKNOWN.to_string(),
    };
    if let Some(variant) = attr::lookup(info, &["ugc_game_variant"]) {
        if let Some(name) = attr::first_present(variant, NAME_FIELDS) {
            game_type = name;
        }
        if game_type.starts_with("Game Type:") || game_type == UNKNOWN {
            if let Some(asset_id) = attr::text_at(variant, &["asset_id"]) {
                let version = attr::version_of(variant);
                game_type = metadata.resolve_name(AssetKind::GameVariant, &asset_id, version.as_deref());
            }
        }
    }

    let map = match attr::lookup(info, &["map_variant"]) {
        Some(variant) => named_asset(variant, AssetKind::Map, metadata),
        None => UNKNOWN.to_string(),
    };

    let (playlist, playlist_id) = match attr::lookup(info, &["playlist"]) {
        Some(entry) => (
            named_asset(entry, AssetKind::Playlist, metadata),
            attr::text_at(entry, &["asset_id"]).filter(|id| !id.is_empty()),
        ),
        None => (UNKNOWN.to_string(), None),
    };

    MatchHeader {
        date: attr::lookup(info, &["start_time"])
            .map(format_start_time)
            .unwrap_or_default(),
        duration: attr::lookup(info, &["duration"])
            .map(format_duration)
            .unwrap_or_default(),
        game_type,
        map,
        playlist,
        playlist_id,
    }
}

fn named_asset<S: StatsService + ?Sized>(
    reference: &Value,
    kind: AssetKind,
    metadata: &mut MetadataCache<'_, S>,
) -> String {
    if let Some(name) = attr::first_present(reference, NAME_FIELDS) {
        return name;
    }
    match attr::text_at(reference, &["asset_id"]).filter(|id| !id.is_empty()) {
        Some(asset_id) => {
            let version = attr::version_of(reference);
            metadata.resolve_name(kind, &asset_id, version.as_deref())
        }
        None => UNKNOWN.to_string(),
    }
}

fn header_record(player: &PlayerRef, match_id: &str, match_number: usize, header: &MatchHeader) -> MatchRecord {
    let mut record = MatchRecord::new();
    record.set("player_gamertag", player.display_name.as_str());
    record.set("player_xuid", player.id.as_str());
    record.set("match_number", match_number);
    record.set("match_id", match_id);
    record.set("date", header.date.as_str());
    record.set("duration", header.duration.as_str());
    record.set("game_type", header.game_type.as_str());
    record.set("map", header.map.as_str());
    record.set("playlist", header.playlist.as_str());
    record.set(
        "playlist_id",
        header.playlist_id.as_deref().unwrap_or(UNKNOWN),
    );
    record
}

fn find_participant<'v>(detail: &'v Value, player_id: &str) -> Option<&'v Value> {
    attr::lookup(detail, &["players"])?
        .as_array()?
        .iter()
        .find(|p| {
            attr::lookup(p, &["player_id"])
                .and_then(payload_player_id)
                .is_some_and(|id| id == player_id)
        })
}

fn apply_participant_fields(detail: &Value, participant: &Value, record: &mut MatchRecord) {
    let team_id = attr::lookup(participant, &["last_team_id"])
        .and_then(Cell::from_json)
        .unwrap_or(Cell::Int(0));
    let outcome = attr::lookup(participant, &["outcome"])
        .map(outcome_label)
        .unwrap_or_else(|| UNKNOWN.to_string());

    let wanted = attr::lookup(participant, &["last_team_id"]).and_then(attr::as_int).unwrap_or(0);
    let team_rank = attr::lookup(detail, &["teams"])
        .and_then(Value::as_array)
        .and_then(|teams| {
            teams
                .iter()
                .find(|t| attr::int_at(t, &["team_id"]) == Some(wanted))
        })
        .and_then(|team| attr::lookup(team, &["rank"]))
        .and_then(Cell::from_json)
        .unwrap_or(Cell::Int(0));

    record.set("outcome", outcome);
    record.set("team_id", team_id);
    record.set("team_rank", team_rank);
}

pub fn outcome_label(value: &Value) -> String {
    let raw = attr::as_text(value).unwrap_or_default();
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return raw;
    }
    match raw.parse::<u64>() {
        Ok(0) => "Left".to_string(),
        Ok(1) => "Loss".to_string(),
        Ok(2) => "Win".to_string(),
        Ok(3) => "Tie".to_string(),
        _ => format!("Unknown ({raw})"),
    }
}

/// RFC 3339 start time as `YYYY-MM-DD HH:MM:SS` UTC; anything else is passed through.
pub fn format_start_time(value: &Value) -> String {
    let raw = attr::as_text(value).unwrap_or_default();
    match DateTime::parse_from_rfc3339(&raw) {
        Ok(parsed) => parsed
            .with_timezone(&Utc)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        Err(_) => raw,
    }
}

/// ISO-8601 duration (`PT8M36.2S`) as `H:MM:SS[.ffffff]`; anything else is passed through.
pub fn format_duration(value: &Value) -> String {
    let raw = attr::as_text(value).unwrap_or_default();
    match parse_iso_duration(&raw) {
        Some(micros) => {
            let total_secs = micros / 1_000_000;
            let frac = micros % 1_000_000;
            let (h, m, s) = (total_secs / 3600, (total_secs % 3600) / 60, total_secs % 60);
            if frac > 0 {
                format!("{h}:{m:02}:{s:02}.{frac:06}")
            } else {
                format!("{h}:{m:02}:{s:02}")
            }
        }
        None => raw,
    }
}

fn parse_iso_duration(raw: &str) -> Option<u64> {
    let rest = raw.trim().strip_prefix('P')?;
    let mut micros = 0f64;
    let mut number = String::new();
    let mut in_time = false;
    for ch in rest.chars() {
        match ch {
            'T' => in_time = true,
            '0'..='9' | '.' => number.push(ch),
            unit => {
                let n: f64 = number.parse().ok()?;
                number.clear();
                let scale = match (unit, in_time) {
                    ('D', false) => 86_400.0,
                    ('H', true) => 3_600.0,
                    ('M', true) => 60.0,
                    ('S', true) => 1.0,
                    _ => return None,
                };
                micros += n * scale * 1_000_000.0;
            }
        }
    }
    if !number.is_empty() {
        return None;
    }
    Some(micros.round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn outcome_codes_map_to_labels() {
        assert_eq!(outcome_label(&json!(2)), "Win");
        assert_eq!(outcome_label(&json!("1")), "Loss");
        assert_eq!(outcome_label(&json!(7)), "Unknown (7)");
        assert_eq!(outcome_label(&json!("DidNotFinish")), "DidNotFinish");
    }

    #[test]
    fn durations_render_like_clock_time() {
        assert_eq!(format_duration(&json!("PT8M36.2S")), "0:08:36.200000");
        assert_eq!(format_duration(&json!("PT1H2M3S")), "1:02:03");
        assert_eq!(format_duration(&json!("soon")), "soon");
    }

    #[test]
    fn start_time_is_normalized_to_utc() {
        assert_eq!(
            format_start_time(&json!("2024-03-09T18:04:05.123Z")),
            "2024-03-09 18:04:05"
        );
        assert_eq!(format_start_time(&json!("yesterday")), "yesterday");
    }
}
