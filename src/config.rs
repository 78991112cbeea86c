use clap::{Parser, Subcommand};

use crate::db::validate_table_name;
use crate::sim::{SimulationSettings, WinPctFormula};

/// Monte Carlo matchup simulator over historical pace and efficiency data
#[derive(Parser, Debug, Clone)]
#[command(name = "matchup-sim", version, about)]
pub struct Config {
    /// SQLite database holding the historical games
    #[arg(long, env = "DATABASE_PATH", default_value = "nba_data.db", global = true)]
    pub database_path: String,

    /// Table with one row per historical game
    #[arg(long, env = "GAMES_TABLE", default_value = "games", global = true)]
    pub games_table: String,

    /// Draw attempts per trial before a run of tied games is reported as degenerate
    #[arg(long, env = "MAX_RETRIES", default_value = "10000", global = true)]
    pub max_retries: u32,

    /// Base seed for reproducible runs (random when unset)
    #[arg(long, env = "SIM_SEED", global = true)]
    pub seed: Option<u64>,

    /// How win counts are turned into percentages
    #[arg(
        long,
        env = "WIN_PCT_FORMULA",
        value_enum,
        default_value = "normalized",
        global = true
    )]
    pub win_pct_formula: WinPctFormula,

    /// Worker threads for parallel trials (0 = one per core)
    #[arg(long, env = "SIM_THREADS", default_value = "0", global = true)]
    pub threads: usize,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Simulate one matchup and print the results
    Simulate {
        /// Home team code, e.g. MIN
        #[arg(long)]
        home: String,

        /// Away team code, e.g. DEN
        #[arg(long)]
        away: String,

        /// Number of simulated games
        #[arg(long, env = "SIMULATIONS", default_value = "1000")]
        sims: u32,

        /// Width of the margin histogram bins, in points
        #[arg(long, default_value = "5")]
        bin_width: i64,

        /// Print the result as JSON instead of a table
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// List the team codes available in the dataset
    Teams,

    /// Serve simulation results over HTTP
    Serve {
        /// Listen address
        #[arg(long, env = "DASHBOARD_ADDR", default_value = "0.0.0.0:8080")]
        dashboard_addr: String,

        /// Upper bound on `sims` accepted per request
        #[arg(long, env = "MAX_SIMULATIONS", default_value = "100000")]
        max_sims: u32,
    },
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        validate_table_name(&self.games_table)?;
        if self.max_retries == 0 {
            anyhow::bail!("max_retries must be at least 1");
        }
        match &self.command {
            Command::Simulate {
                home,
                away,
                sims,
                bin_width,
                ..
            } => {
                if home.trim().is_empty() || away.trim().is_empty() {
                    anyhow::bail!("home and away team codes must not be empty");
                }
                if *sims == 0 {
                    anyhow::bail!("sims must be at least 1");
                }
                if *bin_width < 1 {
                    anyhow::bail!("bin_width must be at least 1");
                }
            }
            Command::Serve { max_sims, .. } => {
                if *max_sims == 0 {
                    anyhow::bail!("max_sims must be at least 1");
                }
            }
            Command::Teams => {}
        }
        Ok(())
    }

    pub fn settings(&self) -> SimulationSettings {
        SimulationSettings {
            max_retries: self.max_retries,
            seed: self.seed,
            win_pct: self.win_pct_formula,
        }
    }
}
