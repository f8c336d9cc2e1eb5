use std::io;

use anyhow::{Context, Result, anyhow};
use clap::Parser;

use halo_match_export::config::load_tokens;
use halo_match_export::metadata::MetadataCache;
use halo_match_export::waypoint::WaypointClient;

/// Print the medal catalog as `id,name` CSV.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    #[arg(long, default_value = "tokens.json")]
    tokens: std::path::PathBuf,
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let client = WaypointClient::new(load_tokens(&args.tokens)?)?;
    let metadata = MetadataCache::new(&client);
    let catalog = metadata.medal_catalog();
    if catalog.is_empty() {
        return Err(anyhow!("medal catalog is empty or unavailable"));
    }

    let mut writer = csv::Writer::from_writer(io::stdout().lock());
    writer.write_record(["id", "name"]).context("write header")?;
    for (id, name) in catalog.entries() {
        writer.write_record([id, name]).context("write medal row")?;
    }
    writer.flush().context("flush stdout")?;
    Ok(())
}
