use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;

use halo_match_export::config::{Cli, load_roster, load_tokens};
use halo_match_export::export;
use halo_match_export::pipeline::PipelineDriver;
use halo_match_export::waypoint::WaypointClient;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let tokens = load_tokens(&cli.tokens)?;
    let roster = load_roster(&cli.roster)?;
    if roster.is_empty() {
        println!("Roster {} is empty, nothing to export", cli.roster.display());
        return Ok(());
    }

    let client = WaypointClient::new(tokens).context("unable to set up stats client")?;
    let driver = PipelineDriver::new(&client, cli.run_options());
    let table = driver.run_with_progress(&roster, |progress| {
        eprint!(
            "\r[{}/{}] {:<60}",
            progress.current, progress.total, progress.message
        );
        io::stderr().flush().ok();
    });
    eprintln!();

    let summary = &table.summary;
    println!("Halo match export complete");
    println!("Players: {}", summary.players);
    println!("Matches listed: {}", summary.matches_listed);
    println!(
        "Records: {} ({} without participant data)",
        summary.records, summary.missing_participants
    );
    println!("Skipped matches: {}", summary.aborted);
    println!("Columns: {}", summary.columns);

    if cli.no_save {
        println!("Not saved (--no-save)");
    } else if table.records.is_empty() {
        println!("No records, {} not written", cli.out.display());
    } else {
        export::write_table(&cli.out, &table)?;
        println!("Saved: {}", cli.out.display());
    }

    if !summary.errors.is_empty() {
        println!("Errors: {}", summary.errors.len());
        for err in summary.errors.iter().take(8) {
            println!(" - {err}");
        }
    }

    Ok(())
}
