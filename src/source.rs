use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::error::FetchResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Map,
    Playlist,
    GameVariant,
    MapModePair,
}

impl AssetKind {
    pub fn fallback_label(self, asset_id: &str) -> String {
        let kind = match self {
            AssetKind::Map | AssetKind::MapModePair => "Map",
            AssetKind::Playlist => "Playlist",
            AssetKind::GameVariant => "Game Type",
        };
        format!("{kind} ID: {asset_id}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum MatchType {
    #[default]
    All,
    Matchmaking,
    Custom,
    Local,
}

impl MatchType {
    pub fn as_query(self) -> &'static str {
        match self {
            MatchType::All => "All",
            MatchType::Matchmaking => "Matchmaking",
            MatchType::Custom => "Custom",
            MatchType::Local => "Local",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query())
    }
}

/// A roster entry. `id` is always the bare numeric identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRef {
    pub display_name: String,
    pub id: String,
}

impl PlayerRef {
    pub fn new(display_name: impl Into<String>, raw_id: &str) -> Self {
        Self {
            display_name: display_name.into(),
            id: clean_player_id(raw_id),
        }
    }

    pub fn wrapped_id(&self) -> String {
        format!("xuid({})", self.id)
    }
}

impl<'de> Deserialize<'de> for PlayerRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawPlayer {
            gamertag: String,
            xuid: Value,
        }
        let raw = RawPlayer::deserialize(deserializer)?;
        let id = match &raw.xuid {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Ok(PlayerRef::new(raw.gamertag, &id))
    }
}

pub fn clean_player_id(raw: &str) -> String {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix("xuid(")
        .or_else(|| trimmed.strip_prefix("XUID("))
        .map(|rest| rest.trim_end_matches(')'))
        .unwrap_or(trimmed);
    inner.trim().to_string()
}

/// Player identifier of a payload entry, normalized for comparison with [`PlayerRef::id`].
pub fn payload_player_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(clean_player_id(s)),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Operations the pipeline consumes. Every call may fail; the core decides how to degrade.
pub trait StatsService {
    fn match_detail(&self, match_id: &str) -> FetchResult<Value>;

    fn match_skill(&self, match_id: &str, player_ids: &[String]) -> FetchResult<Value>;

    fn playlist_skill(&self, playlist_id: &str, player_ids: &[String]) -> FetchResult<Value>;

    fn medal_catalog(&self) -> FetchResult<Value>;

    fn asset(&self, kind: AssetKind, asset_id: &str, version_id: &str) -> FetchResult<Value>;

    fn match_history(
        &self,
        player_id: &str,
        offset: usize,
        count: usize,
        match_type: MatchType,
    ) -> FetchResult<Vec<String>>;
}

impl<S: StatsService + ?Sized> StatsService for &S {
    fn match_detail(&self, match_id: &str) -> FetchResult<Value> {
        (**self).match_detail(match_id)
    }

    fn match_skill(&self, match_id: &str, player_ids: &[String]) -> FetchResult<Value> {
        (**self).match_skill(match_id, player_ids)
    }

    fn playlist_skill(&self, playlist_id: &str, player_ids: &[String]) -> FetchResult<Value> {
        (**self).playlist_skill(playlist_id, player_ids)
    }

    fn medal_catalog(&self) -> FetchResult<Value> {
        (**self).medal_catalog()
    }

    fn asset(&self, kind: AssetKind, asset_id: &str, version_id: &str) -> FetchResult<Value> {
        (**self).asset(kind, asset_id, version_id)
    }

    fn match_history(
        &self,
        player_id: &str,
        offset: usize,
        count: usize,
        match_type: MatchType,
    ) -> FetchResult<Vec<String>> {
        (**self).match_history(player_id, offset, count, match_type)
    }
}
