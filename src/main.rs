use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

mod config;
mod dashboard;
mod db;
mod sim;

use config::{Command, Config};
use dashboard::{AppState, MatchupReport};
use db::Database;
use sim::CancelFlag;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();
    config.validate()?;

    if config.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build_global()
            .context("configure simulation thread pool")?;
        info!("Simulation pool sized to {} thread(s)", config.threads);
    }

    let db = Database::open(&config.database_path)?;
    info!("Database opened: {}", config.database_path);

    match &config.command {
        Command::Teams => {
            for team in db.list_teams(&config.games_table)? {
                println!("{team}");
            }
        }
        Command::Simulate {
            home,
            away,
            sims,
            bin_width,
            json,
        } => {
            let games = db.load_games(&config.games_table)?;
            info!("Loaded {} historical games", games.len());

            let (home, away, sims, bin_width) = (home.clone(), away.clone(), *sims, *bin_width);
            let settings = config.settings();
            let report = tokio::task::spawn_blocking(move || {
                dashboard::run_matchup(
                    &games,
                    &home,
                    &away,
                    sims,
                    bin_width,
                    settings,
                    CancelFlag::new(),
                )
            })
            .await
            .context("simulation task failed")??;

            if *json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Command::Serve {
            dashboard_addr,
            max_sims,
        } => {
            let games = db.load_games(&config.games_table)?;
            let teams = db.list_teams(&config.games_table)?;
            info!(
                "Loaded {} historical games across {} teams",
                games.len(),
                teams.len()
            );

            let state = AppState {
                games: Arc::new(games),
                teams: Arc::new(teams),
                settings: config.settings(),
                max_sims: *max_sims,
            };
            let app = dashboard::router(state);
            let addr: SocketAddr = dashboard_addr
                .parse()
                .with_context(|| format!("invalid dashboard address {dashboard_addr}"))?;
            info!("API listening on http://{}", addr);
            let listener = tokio::net::TcpListener::bind(addr).await?;

            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

/// Plain-text results table and margin histogram.
fn print_report(report: &MatchupReport) {
    let r = &report.result;
    let fmt_margin = |m: Option<i64>| m.map_or_else(|| "-".to_string(), |m| m.to_string());

    println!(
        "{} (home) vs {} (away): {} simulations, seed {}",
        report.home, report.away, r.trials, r.seed
    );
    println!();
    println!("{:<6} {:>8} {:>8} {:>10} {:>10}", "Team", "Wins", "Win %", "Avg Pts", "Avg Marg");
    println!(
        "{:<6} {:>8} {:>8.1} {:>10} {:>10}",
        report.home,
        r.home_wins,
        r.home_win_pct,
        r.home_avg_points,
        fmt_margin(r.home_avg_margin)
    );
    println!(
        "{:<6} {:>8} {:>8.1} {:>10} {:>10}",
        report.away,
        r.away_wins,
        r.away_win_pct,
        r.away_avg_points,
        fmt_margin(r.away_avg_margin)
    );

    let hist = &report.histogram;
    let peak = hist.bins.iter().map(|b| b.count).max().unwrap_or(0).max(1);
    println!();
    println!("Margin distribution (home - away, {} games):", hist.total());
    for bin in &hist.bins {
        let bar = "#".repeat(((bin.count * 50) / peak) as usize);
        println!("{:>5} .. {:<5} {:>6} {}", bin.lower, bin.upper, bin.count, bar);
    }
}
