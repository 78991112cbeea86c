use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::models::HistoricalGameRecord;

use super::error::SimulationError;
use super::stats::StatSummary;

/// Which side of the matchup a profile is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Home,
    Away,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Home => f.write_str("home"),
            Role::Away => f.write_str("away"),
        }
    }
}

/// The three statistics a profile is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    Pace,
    PointsScored,
    PointsGivenUp,
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stat::Pace => f.write_str("pace"),
            Stat::PointsScored => f.write_str("points scored per possession"),
            Stat::PointsGivenUp => f.write_str("points given up per possession"),
        }
    }
}

/// Normal-approximation parameters for one team in one role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamProfile {
    pub team: String,
    pub role: Role,
    /// Number of historical games the summaries were computed from.
    pub games: usize,
    pub pace: StatSummary,
    pub points_scored: StatSummary,
    pub points_given_up: StatSummary,
}

impl TeamProfile {
    /// Build a profile from the team's historical games in `role`.
    ///
    /// Home profiles use the games the team hosted, away profiles the games
    /// it played on the road. Pace always comes from the `pace_home` column
    /// since it is the only pace recorded for a game.
    pub fn build(
        games: &[HistoricalGameRecord],
        team: &str,
        role: Role,
    ) -> Result<Self, SimulationError> {
        let team = team.trim().to_uppercase();

        let rows: Vec<&HistoricalGameRecord> = games
            .iter()
            .filter(|g| {
                let code = match role {
                    Role::Home => &g.home_team,
                    Role::Away => &g.away_team,
                };
                code.trim().eq_ignore_ascii_case(&team)
            })
            .collect();

        if rows.is_empty() {
            return Err(SimulationError::DataNotFound { team, role });
        }

        let pace: Vec<f64> = rows.iter().map(|g| g.pace).collect();
        let home_ppp: Vec<f64> = rows.iter().map(|g| g.home_points_per_possession).collect();
        let away_ppp: Vec<f64> = rows.iter().map(|g| g.away_points_per_possession).collect();

        let (scored, given_up) = match role {
            Role::Home => (home_ppp, away_ppp),
            Role::Away => (away_ppp, home_ppp),
        };

        let summarize = |stat: Stat, series: &[f64]| {
            StatSummary::from_samples(series).ok_or_else(|| SimulationError::InsufficientData {
                team: team.clone(),
                role,
                stat,
                samples: series.len(),
            })
        };

        let pace = summarize(Stat::Pace, &pace)?;
        let points_scored = summarize(Stat::PointsScored, &scored)?;
        let points_given_up = summarize(Stat::PointsGivenUp, &given_up)?;

        Ok(TeamProfile {
            games: rows.len(),
            team,
            role,
            pace,
            points_scored,
            points_given_up,
        })
    }

    pub fn summary(&self, stat: Stat) -> &StatSummary {
        match stat {
            Stat::Pace => &self.pace,
            Stat::PointsScored => &self.points_scored,
            Stat::PointsGivenUp => &self.points_given_up,
        }
    }
}
