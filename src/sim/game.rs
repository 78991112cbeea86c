//! Single-game draw.
//!
//! Each side contributes three normal draws (pace, points scored per
//! possession, points given up per possession). The game pace is the mean of
//! both paces, and each side's efficiency is the mean of its offence and the
//! opponent's defence:
//!
//! ```text
//! pace        = round((home_pace + away_pace) / 2)
//! home_points = round(((home_scored + away_given_up) / 2) * pace)
//! away_points = round(((away_scored + home_given_up) / 2) * pace)
//! ```
//!
//! Tied games are rejected and all six values redrawn, up to `max_retries`
//! attempts.

use rand::distributions::Distribution;
use rand::Rng;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;

use super::error::SimulationError;
use super::profile::{Stat, TeamProfile};
use super::stats::StatSummary;

/// Outcome of one simulated game. `margin` is never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedGame {
    pub home_points: i64,
    pub away_points: i64,
    pub pace: i64,
    /// `home_points - away_points`
    pub margin: i64,
}

impl SimulatedGame {
    pub fn home_won(&self) -> bool {
        self.margin > 0
    }
}

/// Round half to even, the convention used when the historical tables were
/// summarised.
pub(crate) fn round_half_even(x: f64) -> i64 {
    x.round_ties_even() as i64
}

/// Draws values for one statistic. A zero spread short-circuits to the mean
/// since `Normal` requires a positive standard deviation.
#[derive(Debug, Clone)]
enum StatSampler {
    Fixed(f64),
    Normal(Normal),
}

impl StatSampler {
    fn new(team: &str, stat: Stat, summary: &StatSummary) -> Result<Self, SimulationError> {
        if summary.std_dev == 0.0 {
            return Ok(StatSampler::Fixed(summary.mean));
        }
        Normal::new(summary.mean, summary.std_dev)
            .map(StatSampler::Normal)
            .map_err(|e| SimulationError::InvalidDistribution {
                team: team.to_string(),
                stat,
                reason: e.to_string(),
            })
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            StatSampler::Fixed(v) => *v,
            StatSampler::Normal(n) => n.sample(rng),
        }
    }
}

#[derive(Debug, Clone)]
struct ProfileSampler {
    pace: StatSampler,
    points_scored: StatSampler,
    points_given_up: StatSampler,
}

impl ProfileSampler {
    fn new(profile: &TeamProfile) -> Result<Self, SimulationError> {
        let sampler = |stat| StatSampler::new(&profile.team, stat, profile.summary(stat));
        Ok(ProfileSampler {
            pace: sampler(Stat::Pace)?,
            points_scored: sampler(Stat::PointsScored)?,
            points_given_up: sampler(Stat::PointsGivenUp)?,
        })
    }
}

/// Simulates games between a fixed home and away profile.
///
/// Holds no mutable state, so one instance can be shared by every worker;
/// randomness comes from the generator passed to [`GameSimulator::simulate_game`].
#[derive(Debug, Clone)]
pub struct GameSimulator {
    home: ProfileSampler,
    away: ProfileSampler,
    max_retries: u32,
}

impl GameSimulator {
    pub fn new(
        home: &TeamProfile,
        away: &TeamProfile,
        max_retries: u32,
    ) -> Result<Self, SimulationError> {
        Ok(GameSimulator {
            home: ProfileSampler::new(home)?,
            away: ProfileSampler::new(away)?,
            max_retries: max_retries.max(1),
        })
    }

    /// Draw one game with a winner.
    pub fn simulate_game<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<SimulatedGame, SimulationError> {
        for _ in 0..self.max_retries {
            let game = self.draw(rng);
            if game.margin != 0 {
                return Ok(game);
            }
        }
        Err(SimulationError::DegenerateSimulation {
            attempts: self.max_retries,
        })
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> SimulatedGame {
        let home_pace = self.home.pace.draw(rng);
        let home_scored = self.home.points_scored.draw(rng);
        let home_given_up = self.home.points_given_up.draw(rng);
        let away_pace = self.away.pace.draw(rng);
        let away_scored = self.away.points_scored.draw(rng);
        let away_given_up = self.away.points_given_up.draw(rng);

        let pace = round_half_even((home_pace + away_pace) / 2.0);
        let possessions = pace as f64;
        let home_points = round_half_even(((home_scored + away_given_up) / 2.0) * possessions);
        let away_points = round_half_even(((away_scored + home_given_up) / 2.0) * possessions);

        SimulatedGame {
            home_points,
            away_points,
            pace,
            margin: home_points - away_points,
        }
    }
}
