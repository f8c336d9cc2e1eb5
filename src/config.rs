use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use serde::Deserialize;

use crate::csr::{CsrExtractor, DEFAULT_RANKED_PLAYLIST};
use crate::pipeline::RunOptions;
use crate::source::{MatchType, PlayerRef};

/// Export per-match stats for a roster of players into one flat table.
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct Cli {
    /// JSON roster: `[{"gamertag": "...", "xuid": "..."}]`
    #[arg(long, default_value = "roster.json")]
    pub roster: PathBuf,

    /// JSON file holding `spartan_token` and `clearance_token`
    #[arg(long, default_value = "tokens.json")]
    pub tokens: PathBuf,

    /// Matches per player, most recent first
    #[arg(long, default_value_t = 5)]
    pub count: usize,

    #[arg(long, value_enum, default_value_t = MatchType::All)]
    pub match_type: MatchType,

    /// Output file; `.xlsx` writes a workbook, anything else CSV
    #[arg(long, default_value = "halo_multi_player_stats.csv")]
    pub out: PathBuf,

    /// Build the table without writing it
    #[arg(long)]
    pub no_save: bool,
}

impl Cli {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            match_count: self.count,
            match_type: self.match_type,
            csr: CsrExtractor::default().with_fallback_playlist(fallback_playlist()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tokens {
    pub spartan_token: String,
    #[serde(default)]
    pub clearance_token: Option<String>,
}

/// `SPARTAN_TOKEN` / `CLEARANCE_TOKEN` win over the token file.
pub fn load_tokens(path: &Path) -> Result<Tokens> {
    let env_spartan = env_non_empty("SPARTAN_TOKEN");
    let env_clearance = env_non_empty("CLEARANCE_TOKEN");

    if let Some(spartan_token) = env_spartan.clone() {
        if env_clearance.is_some() || !path.exists() {
            return Ok(Tokens {
                spartan_token,
                clearance_token: env_clearance,
            });
        }
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("read token file {}", path.display()))?;
    let mut tokens: Tokens = serde_json::from_str(&raw)
        .with_context(|| format!("parse token file {}", path.display()))?;
    if let Some(spartan) = env_spartan {
        tokens.spartan_token = spartan;
    }
    if env_clearance.is_some() {
        tokens.clearance_token = env_clearance;
    }
    if tokens.spartan_token.trim().is_empty() {
        return Err(anyhow!("token file {} has an empty spartan_token", path.display()));
    }
    Ok(tokens)
}

pub fn load_roster(path: &Path) -> Result<Vec<PlayerRef>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("read roster {}", path.display()))?;
    parse_roster(&raw).with_context(|| format!("parse roster {}", path.display()))
}

pub fn parse_roster(raw: &str) -> Result<Vec<PlayerRef>> {
    let players: Vec<PlayerRef> = serde_json::from_str(raw).context("invalid roster json")?;
    if let Some(bad) = players.iter().find(|p| p.id.is_empty()) {
        return Err(anyhow!("roster entry {} has no xuid", bad.display_name));
    }
    Ok(players)
}

pub fn fallback_playlist() -> String {
    env_non_empty("HALO_FALLBACK_PLAYLIST").unwrap_or_else(|| DEFAULT_RANKED_PLAYLIST.to_string())
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_accepts_wrapped_and_numeric_ids() {
        let roster = parse_roster(
            r#"[{"gamertag": "l 0cty l", "xuid": "xuid(2533274818160056)"},
                {"gamertag": "Zaidster7", "xuid": 2533274965035069}]"#,
        )
        .unwrap();
        assert_eq!(roster[0].id, "2533274818160056");
        assert_eq!(roster[1].id, "2533274965035069");
        assert_eq!(roster[1].display_name, "Zaidster7");
    }

    #[test]
    fn roster_rejects_blank_ids() {
        assert!(parse_roster(r#"[{"gamertag": "x", "xuid": ""}]"#).is_err());
    }
}
