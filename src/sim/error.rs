use thiserror::Error;

use super::profile::{Role, Stat};

/// Failures raised by the simulation core.
///
/// The `Display` text is meant to be shown to users as-is: it names the
/// team and the missing data rather than internal details.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("no historical games found for team {team} playing {role}")]
    DataNotFound { team: String, role: Role },

    #[error(
        "insufficient historical data for team {team}: {stat} needs at least 2 {role} games, found {samples}"
    )]
    InsufficientData {
        team: String,
        role: Role,
        stat: Stat,
        samples: usize,
    },

    #[error("simulation produced a tied game on every one of {attempts} attempts")]
    DegenerateSimulation { attempts: u32 },

    #[error("invalid {stat} distribution for team {team}: {reason}")]
    InvalidDistribution {
        team: String,
        stat: Stat,
        reason: String,
    },

    #[error("trial count must be at least 1")]
    InvalidTrialCount,

    #[error("simulation cancelled")]
    Cancelled,
}

impl SimulationError {
    /// True when the error comes from missing or thin historical data
    /// rather than from the simulation itself.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            SimulationError::DataNotFound { .. } | SimulationError::InsufficientData { .. }
        )
    }
}
