#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde_json::{Value, json};

use halo_match_export::error::{FetchError, FetchResult};
use halo_match_export::source::{AssetKind, MatchType, PlayerRef, StatsService};
use halo_match_export::waypoint::parse_body;

pub const PLAYER_A: &str = "2533274818160056";
pub const PLAYER_B: &str = "2533274965035069";

pub fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

/// Fixture payload after the same key normalization the HTTP client applies.
pub fn fixture(name: &str) -> Value {
    parse_body(&read_fixture(name)).expect("fixture should parse")
}

pub fn player_a() -> PlayerRef {
    PlayerRef::new("l 0cty l", &format!("xuid({PLAYER_A})"))
}

pub fn player_b() -> PlayerRef {
    PlayerRef::new("Zaidster7", PLAYER_B)
}

/// In-memory [`StatsService`]. Anything not registered answers `NotFound`; every call is counted.
#[derive(Default)]
pub struct FixtureService {
    pub matches: HashMap<String, Value>,
    pub match_skill: HashMap<String, Value>,
    pub playlist_skill: HashMap<String, Value>,
    pub assets: HashMap<(AssetKind, String), Value>,
    pub medals: Option<Value>,
    pub history: HashMap<String, Vec<String>>,
    /// Asset fetches that fail transiently before the registered payload is served.
    pub asset_failures: Cell<usize>,
    /// Medal catalog fetches that fail transiently before the registered catalog is served.
    pub medal_failures: Cell<usize>,
    calls: RefCell<HashMap<&'static str, usize>>,
    history_requests: RefCell<Vec<(usize, usize, MatchType)>>,
}

impl FixtureService {
    /// Two players, four listed matches for A (one of them missing upstream), one for B.
    pub fn standard() -> Self {
        let mut service = FixtureService::default();
        service.matches.insert("ctf-1".into(), fixture("match_ctf.json"));
        service.matches.insert("slayer-1".into(), fixture("match_slayer.json"));
        service.matches.insert("orphan-1".into(), fixture("match_orphan.json"));
        service
            .match_skill
            .insert("ctf-1".into(), fixture("match_skill_rank_recap.json"));
        service
            .playlist_skill
            .insert("pl-ranked".into(), fixture("playlist_csr_wrapped.json"));
        service.medals = Some(fixture("medals.json"));
        service.assets.insert(
            (AssetKind::GameVariant, "gv-ctf".into()),
            json!({"asset_id": "gv-ctf", "public_name": "Capture the Flag"}),
        );
        service.assets.insert(
            (AssetKind::Map, "map-aq".into()),
            json!({"asset_id": "map-aq", "public_name": "Aquarius"}),
        );
        service
            .assets
            .insert((AssetKind::Playlist, "pl-ranked".into()), json!({"asset_id": "pl-ranked"}));
        service.assets.insert(
            (AssetKind::MapModePair, "pl-ranked".into()),
            json!({"public_name": "Ranked Arena"}),
        );
        service.history.insert(
            PLAYER_A.into(),
            vec!["ctf-1".into(), "slayer-1".into(), "broken-1".into(), "orphan-1".into()],
        );
        service.history.insert(PLAYER_B.into(), vec!["ctf-1".into()]);
        service
    }

    pub fn calls(&self, op: &str) -> usize {
        self.calls.borrow().get(op).copied().unwrap_or(0)
    }

    pub fn history_requests(&self) -> Vec<(usize, usize, MatchType)> {
        self.history_requests.borrow().clone()
    }

    fn hit(&self, op: &'static str) {
        *self.calls.borrow_mut().entry(op).or_insert(0) += 1;
    }
}

fn served(value: Option<&Value>, what: &str) -> FetchResult<Value> {
    value
        .cloned()
        .ok_or_else(|| FetchError::NotFound(what.to_string()))
}

impl StatsService for FixtureService {
    fn match_detail(&self, match_id: &str) -> FetchResult<Value> {
        self.hit("match_detail");
        served(self.matches.get(match_id), match_id)
    }

    fn match_skill(&self, match_id: &str, _player_ids: &[String]) -> FetchResult<Value> {
        self.hit("match_skill");
        served(self.match_skill.get(match_id), match_id)
    }

    fn playlist_skill(&self, playlist_id: &str, _player_ids: &[String]) -> FetchResult<Value> {
        self.hit("playlist_skill");
        served(self.playlist_skill.get(playlist_id), playlist_id)
    }

    fn medal_catalog(&self) -> FetchResult<Value> {
        self.hit("medal_catalog");
        let pending = self.medal_failures.get();
        if pending > 0 {
            self.medal_failures.set(pending - 1);
            return Err(FetchError::Transient("medals: 503".into()));
        }
        served(self.medals.as_ref(), "medals")
    }

    fn asset(&self, kind: AssetKind, asset_id: &str, _version_id: &str) -> FetchResult<Value> {
        self.hit("asset");
        let pending = self.asset_failures.get();
        if pending > 0 {
            self.asset_failures.set(pending - 1);
            return Err(FetchError::Transient(format!("{asset_id}: 503")));
        }
        served(self.assets.get(&(kind, asset_id.to_string())), asset_id)
    }

    fn match_history(
        &self,
        player_id: &str,
        offset: usize,
        count: usize,
        match_type: MatchType,
    ) -> FetchResult<Vec<String>> {
        self.hit("match_history");
        self.history_requests
            .borrow_mut()
            .push((offset, count, match_type));
        let listed = self
            .history
            .get(player_id)
            .ok_or_else(|| FetchError::NotFound(player_id.to_string()))?;
        Ok(listed.iter().skip(offset).take(count).cloned().collect())
    }
}
