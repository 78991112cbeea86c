pub mod error;
pub mod game;
pub mod histogram;
pub mod matchup;
pub mod profile;
pub mod stats;

pub use error::SimulationError;
pub use histogram::MarginHistogram;
pub use matchup::{CancelFlag, MatchupResult, MatchupSimulator, SimulationSettings, WinPctFormula};
