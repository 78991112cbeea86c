use serde::{Deserialize, Serialize};

/// One historical game as recorded in the `games` table.
///
/// Every rate is stored from the perspective named in the column: the home
/// side's points per possession, the away side's, and the game pace as
/// measured for the home side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalGameRecord {
    /// `team_abbreviation_home`, e.g. "MIN"
    pub home_team: String,
    /// `team_abbreviation_away`
    pub away_team: String,
    /// `points_per_possession_home`
    pub home_points_per_possession: f64,
    /// `points_per_possession_away`
    pub away_points_per_possession: f64,
    /// `pace_home` (possessions per game)
    pub pace: f64,
}

impl HistoricalGameRecord {
    pub fn new(
        home_team: impl Into<String>,
        away_team: impl Into<String>,
        home_points_per_possession: f64,
        away_points_per_possession: f64,
        pace: f64,
    ) -> Self {
        HistoricalGameRecord {
            home_team: home_team.into(),
            away_team: away_team.into(),
            home_points_per_possession,
            away_points_per_possession,
            pace,
        }
    }

    /// All numeric columns are usable for statistics.
    pub fn is_finite(&self) -> bool {
        self.home_points_per_possession.is_finite()
            && self.away_points_per_possession.is_finite()
            && self.pace.is_finite()
    }
}
