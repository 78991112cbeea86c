//! Matchup orchestration: N independent game trials, aggregated.
//!
//! Trial `i` draws from its own `SmallRng` seeded with `seed + i`, so a run
//! is reproducible for a given seed regardless of how rayon schedules the
//! trials. Aggregation folds per-worker integer tallies and merges them,
//! which is exact and independent of order.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::db::models::HistoricalGameRecord;

use super::error::SimulationError;
use super::game::{round_half_even, GameSimulator, SimulatedGame};
use super::profile::{Role, TeamProfile};

/// How win counts are turned into a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WinPctFormula {
    /// `round(wins / 100)`, as the historical tool computed it. Only equals
    /// a percentage when exactly 10 000 trials are run.
    Legacy,
    /// `wins / trials * 100`
    #[default]
    Normalized,
}

impl WinPctFormula {
    pub fn win_pct(self, wins: u64, trials: u64) -> f64 {
        match self {
            WinPctFormula::Legacy => round_half_even(wins as f64 / 100.0) as f64,
            WinPctFormula::Normalized => {
                if trials == 0 {
                    0.0
                } else {
                    wins as f64 * 100.0 / trials as f64
                }
            }
        }
    }
}

/// Shared cancellation switch, checked before every trial.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationSettings {
    /// Attempts per trial before a tied draw is reported as degenerate.
    pub max_retries: u32,
    /// Base seed; a fresh one is drawn per run when `None`.
    pub seed: Option<u64>,
    pub win_pct: WinPctFormula,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        SimulationSettings {
            max_retries: 10_000,
            seed: None,
            win_pct: WinPctFormula::default(),
        }
    }
}

/// Aggregated outcome of a matchup simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchupResult {
    pub home_win_pct: f64,
    pub away_win_pct: f64,
    /// Mean winning margin over the home team's wins; `None` if it never won.
    pub home_avg_margin: Option<i64>,
    /// Mean winning margin over the away team's wins; `None` if it never won.
    pub away_avg_margin: Option<i64>,
    pub home_avg_points: i64,
    pub away_avg_points: i64,
    /// Signed `home - away` margin of every trial, in trial order.
    pub margins: Vec<i64>,
    pub trials: u64,
    pub home_wins: u64,
    pub away_wins: u64,
    pub seed: u64,
}

/// Per-worker running totals. Integer sums keep the reduction exact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Tally {
    trials: u64,
    home_wins: u64,
    away_wins: u64,
    home_margin_sum: i64,
    away_margin_sum: i64,
    home_points_sum: i64,
    away_points_sum: i64,
}

impl Tally {
    fn record(mut self, game: &SimulatedGame) -> Self {
        self.trials += 1;
        self.home_points_sum += game.home_points;
        self.away_points_sum += game.away_points;
        if game.home_won() {
            self.home_wins += 1;
            self.home_margin_sum += game.margin;
        } else {
            self.away_wins += 1;
            self.away_margin_sum -= game.margin;
        }
        self
    }

    fn merge(self, other: Self) -> Self {
        Tally {
            trials: self.trials + other.trials,
            home_wins: self.home_wins + other.home_wins,
            away_wins: self.away_wins + other.away_wins,
            home_margin_sum: self.home_margin_sum + other.home_margin_sum,
            away_margin_sum: self.away_margin_sum + other.away_margin_sum,
            home_points_sum: self.home_points_sum + other.home_points_sum,
            away_points_sum: self.away_points_sum + other.away_points_sum,
        }
    }
}

fn rounded_mean(sum: i64, n: u64) -> Option<i64> {
    (n > 0).then(|| round_half_even(sum as f64 / n as f64))
}

pub struct MatchupSimulator {
    settings: SimulationSettings,
    cancel: CancelFlag,
}

impl MatchupSimulator {
    pub fn new(settings: SimulationSettings) -> Self {
        MatchupSimulator {
            settings,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Profile both teams from `games` and simulate `trials` games between
    /// them, `home` hosting `away`.
    pub fn simulate_matchup(
        &self,
        games: &[HistoricalGameRecord],
        home: &str,
        away: &str,
        trials: u32,
    ) -> Result<MatchupResult, SimulationError> {
        let home_profile = TeamProfile::build(games, home, Role::Home)?;
        let away_profile = TeamProfile::build(games, away, Role::Away)?;
        debug!(
            "Profiles built: {} from {} home games, {} from {} away games",
            home_profile.team, home_profile.games, away_profile.team, away_profile.games
        );
        self.simulate_profiles(&home_profile, &away_profile, trials)
    }

    /// Simulate `trials` games between two prepared profiles.
    pub fn simulate_profiles(
        &self,
        home: &TeamProfile,
        away: &TeamProfile,
        trials: u32,
    ) -> Result<MatchupResult, SimulationError> {
        if trials == 0 {
            return Err(SimulationError::InvalidTrialCount);
        }
        let simulator = GameSimulator::new(home, away, self.settings.max_retries)?;
        let seed = self
            .settings
            .seed
            .unwrap_or_else(|| rand::thread_rng().gen());

        info!(
            "Simulating {} @ {}: {} trials (seed {})",
            away.team, home.team, trials, seed
        );
        let started = Instant::now();

        let games = (0..trials)
            .into_par_iter()
            .map(|i| {
                if self.cancel.is_cancelled() {
                    return Err(SimulationError::Cancelled);
                }
                let mut rng = SmallRng::seed_from_u64(seed.wrapping_add(u64::from(i)));
                simulator.simulate_game(&mut rng)
            })
            .collect::<Result<Vec<SimulatedGame>, SimulationError>>()?;

        let tally = games
            .par_iter()
            .fold(Tally::default, |t, g| t.record(g))
            .reduce(Tally::default, Tally::merge);

        let result = build_result(&tally, &games, seed, self.settings.win_pct);
        info!(
            "Simulated {} @ {} in {:?}: home {:.1}% / away {:.1}%",
            away.team,
            home.team,
            started.elapsed(),
            WinPctFormula::Normalized.win_pct(tally.home_wins, tally.trials),
            WinPctFormula::Normalized.win_pct(tally.away_wins, tally.trials),
        );
        Ok(result)
    }
}

fn build_result(
    tally: &Tally,
    games: &[SimulatedGame],
    seed: u64,
    formula: WinPctFormula,
) -> MatchupResult {
    MatchupResult {
        home_win_pct: formula.win_pct(tally.home_wins, tally.trials),
        away_win_pct: formula.win_pct(tally.away_wins, tally.trials),
        home_avg_margin: rounded_mean(tally.home_margin_sum, tally.home_wins),
        away_avg_margin: rounded_mean(tally.away_margin_sum, tally.away_wins),
        home_avg_points: rounded_mean(tally.home_points_sum, tally.trials).unwrap_or(0),
        away_avg_points: rounded_mean(tally.away_points_sum, tally.trials).unwrap_or(0),
        margins: games.iter().map(|g| g.margin).collect(),
        trials: tally.trials,
        home_wins: tally.home_wins,
        away_wins: tally.away_wins,
        seed,
    }
}
