use anyhow::Result;
use heck::ToSnakeCase;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde_json::{Map, Value};

use crate::attr;
use crate::config::Tokens;
use crate::error::{FetchError, FetchResult};
use crate::http_client::http_client;
use crate::source::{AssetKind, MatchType, StatsService};

const STATS_HOST: &str = "https://halostats.svc.halowaypoint.com";
const SKILL_HOST: &str = "https://skill.svc.halowaypoint.com";
const DISCOVERY_HOST: &str = "https://discovery-infiniteugc.svc.halowaypoint.com";
const GAMECMS_HOST: &str = "https://gamecms-hacs.svc.halowaypoint.com";

const SPARTAN_HEADER: &str = "x-343-authorization-spartan";
const CLEARANCE_HEADER: &str = "343-clearance";

pub struct WaypointClient {
    client: &'static Client,
    tokens: Tokens,
}

impl WaypointClient {
    pub fn new(tokens: Tokens) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            tokens,
        })
    }

    fn get_json(&self, url: &str) -> FetchResult<Value> {
        let mut req = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .header(SPARTAN_HEADER, &self.tokens.spartan_token);
        if let Some(clearance) = self.tokens.clearance_token.as_deref() {
            req = req.header(CLEARANCE_HEADER, clearance);
        }

        let resp = req
            .send()
            .map_err(|err| FetchError::Transient(format!("GET {url}: {err}")))?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(url.to_string()));
        }
        let body = resp
            .text()
            .map_err(|err| FetchError::Transient(format!("reading {url}: {err}")))?;
        if !status.is_success() {
            return Err(FetchError::Transient(format!("http {status}: {url}")));
        }
        parse_body(&body)
    }
}

pub fn parse_body(body: &str) -> FetchResult<Value> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Value::Null);
    }
    let raw: Value = serde_json::from_str(trimmed)
        .map_err(|err| FetchError::Shape(format!("invalid json: {err}")))?;
    Ok(normalize_keys(raw))
}

/// Recursively renames object keys (`PlayerTeamStats`, `nameId`) to snake_case
/// (`player_team_stats`, `name_id`).
pub fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, inner) in map {
                out.insert(key.to_snake_case(), normalize_keys(inner));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}

fn players_query(player_ids: &[String]) -> String {
    player_ids
        .iter()
        .map(|id| format!("xuid({id})"))
        .collect::<Vec<_>>()
        .join(",")
}

fn asset_path(kind: AssetKind) -> &'static str {
    match kind {
        AssetKind::Map => "maps",
        AssetKind::Playlist => "playlists",
        AssetKind::GameVariant => "ugcGameVariants",
        AssetKind::MapModePair => "mapModePairs",
    }
}

impl StatsService for WaypointClient {
    fn match_detail(&self, match_id: &str) -> FetchResult<Value> {
        self.get_json(&format!("{STATS_HOST}/hi/matches/{match_id}/stats"))
    }

    fn match_skill(&self, match_id: &str, player_ids: &[String]) -> FetchResult<Value> {
        let players = players_query(player_ids);
        self.get_json(&format!(
            "{SKILL_HOST}/hi/matches/{match_id}/skill?players={players}"
        ))
    }

    fn playlist_skill(&self, playlist_id: &str, player_ids: &[String]) -> FetchResult<Value> {
        let players = players_query(player_ids);
        self.get_json(&format!(
            "{SKILL_HOST}/hi/playlist/{playlist_id}/csrs?players={players}"
        ))
    }

    fn medal_catalog(&self) -> FetchResult<Value> {
        self.get_json(&format!(
            "{GAMECMS_HOST}/hi/Waypoint/file/medals/metadata.json"
        ))
    }

    fn asset(&self, kind: AssetKind, asset_id: &str, version_id: &str) -> FetchResult<Value> {
        let path = asset_path(kind);
        self.get_json(&format!(
            "{DISCOVERY_HOST}/hi/{path}/{asset_id}/versions/{version_id}"
        ))
    }

    fn match_history(
        &self,
        player_id: &str,
        offset: usize,
        count: usize,
        match_type: MatchType,
    ) -> FetchResult<Vec<String>> {
        let body = self.get_json(&format!(
            "{STATS_HOST}/hi/players/xuid({player_id})/matches?start={offset}&count={count}&type={match_type}"
        ))?;
        let results = attr::lookup(&body, &["results"])
            .and_then(Value::as_array)
            .ok_or_else(|| FetchError::Shape("match history has no results".into()))?;
        Ok(results
            .iter()
            .filter_map(|entry| attr::text_at(entry, &["match_id"]))
            .filter(|id| !id.is_empty())
            .collect())
    }
}
