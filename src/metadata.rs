//! One [`MetadataCache`] lives for one export run. Resolved names are written once and never
//! refreshed; failed name lookups are not remembered, so the next request for the same asset
//! retries the fetch.

use std::collections::HashMap;

use once_cell::unsync::OnceCell;
use serde_json::Value;

use crate::attr::{self, NAME_FIELDS};
use crate::error::{FetchError, FetchResult};
use crate::source::{AssetKind, StatsService};

const GAME_VARIANT_NAME_FIELDS: &[&str] = &[
    "name",
    "asset_name",
    "internal_name",
    "display_name",
    "public_name",
    "title",
    "game_mode",
];

const GAME_VARIANT_PROPERTY_FIELDS: &[&str] = &["name", "display_name", "game_mode", "variant_name"];

#[derive(Debug, Clone, Default)]
pub struct MedalCatalog {
    by_id: HashMap<u64, String>,
    by_text: HashMap<String, String>,
}

impl MedalCatalog {
    pub fn from_payload(payload: &Value) -> FetchResult<Self> {
        let Some(medals) = attr::lookup(payload, &["medals"]).and_then(Value::as_array) else {
            return Err(FetchError::Shape("medal catalog has no medals list".into()));
        };
        let mut catalog = MedalCatalog::default();
        for medal in medals {
            let Some(id) = attr::lookup(medal, &["name_id"]) else {
                continue;
            };
            let Some(name) = attr::text_at(medal, &["name"]) else {
                continue;
            };
            catalog.insert(id, name);
        }
        Ok(catalog)
    }

    fn insert(&mut self, id: &Value, name: String) {
        if let Some(numeric) = attr::as_int(id).and_then(|v| u64::try_from(v).ok()) {
            self.by_id.insert(numeric, name.clone());
            self.by_text.insert(numeric.to_string(), name);
        } else if let Some(text) = attr::as_text(id) {
            self.by_text.insert(text, name);
        }
    }

    pub fn name_by_id(&self, id: u64) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    pub fn name_by_text(&self, id: &str) -> Option<&str> {
        self.by_text.get(id.trim()).map(String::as_str)
    }

    pub fn name_for(&self, id: &Value) -> Option<&str> {
        match id {
            Value::Number(n) => n
                .as_u64()
                .and_then(|v| self.name_by_id(v))
                .or_else(|| self.name_by_text(&n.to_string())),
            Value::String(s) => self.name_by_text(s),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.by_text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_text.is_empty()
    }

    pub fn entries(&self) -> Vec<(String, String)> {
        let mut numeric: Vec<(&u64, &String)> = self.by_id.iter().collect();
        numeric.sort_by_key(|(id, _)| **id);
        let mut out: Vec<(String, String)> = numeric
            .into_iter()
            .map(|(id, name)| (id.to_string(), name.clone()))
            .collect();
        let mut text_only: Vec<(&String, &String)> = self
            .by_text
            .iter()
            .filter(|(id, _)| id.parse::<u64>().is_err())
            .collect();
        text_only.sort();
        out.extend(text_only.into_iter().map(|(id, name)| (id.clone(), name.clone())));
        out
    }
}

pub struct MetadataCache<'a, S: StatsService + ?Sized> {
    source: &'a S,
    names: HashMap<(AssetKind, String), String>,
    medals: OnceCell<MedalCatalog>,
}

impl<'a, S: StatsService + ?Sized> MetadataCache<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            names: HashMap::new(),
            medals: OnceCell::new(),
        }
    }

    /// Fetched on first use only. A failed fetch leaves the catalog empty for the rest of the
    /// run so every record labels a medal the same way.
    pub fn medal_catalog(&self) -> &MedalCatalog {
        self.medals.get_or_init(|| {
            self.source
                .medal_catalog()
                .and_then(|payload| MedalCatalog::from_payload(&payload))
                .unwrap_or_else(|err| {
                    log::warn!("medal catalog unavailable: {err}; medals will be labelled by id");
                    MedalCatalog::default()
                })
        })
    }

    /// Display name for an asset, or `"{Kind} ID: {asset_id}"` when it cannot be resolved.
    pub fn resolve_name(
        &mut self,
        kind: AssetKind,
        asset_id: &str,
        version_id: Option<&str>,
    ) -> String {
        let Some(version_id) = version_id.filter(|v| !v.trim().is_empty()) else {
            return kind.fallback_label(asset_id);
        };
        let key = (kind, format!("{asset_id}:{version_id}"));
        if let Some(name) = self.names.get(&key) {
            return name.clone();
        }

        match self.lookup_name(kind, asset_id, version_id) {
            Ok(name) => {
                self.names.insert(key, name.clone());
                name
            }
            Err(err) => {
                log::warn!("{kind:?} {asset_id}:{version_id} name lookup failed: {err}");
                kind.fallback_label(asset_id)
            }
        }
    }

    pub fn cached_names(&self) -> usize {
        self.names.len()
    }

    fn lookup_name(&self, kind: AssetKind, asset_id: &str, version_id: &str) -> FetchResult<String> {
        let payload = self.source.asset(kind, asset_id, version_id)?;
        if let Some(name) = name_from_asset(kind, &payload) {
            return Ok(name);
        }
        if matches!(kind, AssetKind::Map | AssetKind::Playlist) {
            let pair = self
                .source
                .asset(AssetKind::MapModePair, asset_id, version_id)?;
            if let Some(name) = attr::first_present(&pair, NAME_FIELDS) {
                return Ok(name);
            }
        }
        Err(FetchError::Shape(format!("no name field on {kind:?} {asset_id}")))
    }
}

fn name_from_asset(kind: AssetKind, payload: &Value) -> Option<String> {
    match kind {
        AssetKind::GameVariant => attr::first_present(payload, GAME_VARIANT_NAME_FIELDS).or_else(
            || {
                attr::lookup(payload, &["properties"])
                    .and_then(|props| attr::first_present(props, GAME_VARIANT_PROPERTY_FIELDS))
            },
        ),
        _ => attr::first_present(payload, NAME_FIELDS),
    }
}
