use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tracing::{error, warn};

use crate::db::models::HistoricalGameRecord;
use crate::sim::{
    CancelFlag, MarginHistogram, MatchupResult, MatchupSimulator, SimulationError,
    SimulationSettings, WinPctFormula,
};

pub const DEFAULT_SIMS: u32 = 1_000;
pub const DEFAULT_BIN_WIDTH: i64 = 5;

#[derive(Clone)]
pub struct AppState {
    /// Historical games, loaded once at startup.
    pub games: Arc<Vec<HistoricalGameRecord>>,
    pub teams: Arc<Vec<String>>,
    pub settings: SimulationSettings,
    pub max_sims: u32,
}

/// Simulation result plus what a results table and margin chart need.
#[derive(Debug, Clone, Serialize)]
pub struct MatchupReport {
    pub home: String,
    pub away: String,
    pub generated_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub result: MatchupResult,
    pub histogram: MarginHistogram,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulateParams {
    pub home: String,
    pub away: String,
    pub sims: Option<u32>,
    pub seed: Option<u64>,
    pub bin_width: Option<i64>,
    pub win_pct_formula: Option<WinPctFormula>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub version: &'static str,
    pub games: usize,
    pub teams: usize,
}

/// Build the Axum router for the results API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/teams", get(teams_handler))
        .route("/api/simulate", get(simulate_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// Run one matchup and package it with its histogram. Blocking; the
/// trials fan out over rayon's pool.
pub fn run_matchup(
    games: &[HistoricalGameRecord],
    home: &str,
    away: &str,
    sims: u32,
    bin_width: i64,
    settings: SimulationSettings,
    cancel: CancelFlag,
) -> Result<MatchupReport, SimulationError> {
    let started = Instant::now();
    let result = MatchupSimulator::new(settings)
        .with_cancel(cancel)
        .simulate_matchup(games, home, away, sims)?;
    let histogram = MarginHistogram::from_margins(&result.margins, bin_width);
    Ok(MatchupReport {
        home: home.trim().to_uppercase(),
        away: away.trim().to_uppercase(),
        generated_at: Utc::now(),
        elapsed_ms: started.elapsed().as_millis() as u64,
        result,
        histogram,
    })
}

/// Map simulation failures to HTTP responses with a message fit for users.
pub fn error_response(err: &SimulationError) -> (StatusCode, String) {
    let status = match err {
        SimulationError::DataNotFound { .. } => StatusCode::NOT_FOUND,
        SimulationError::InsufficientData { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        SimulationError::InvalidTrialCount => StatusCode::BAD_REQUEST,
        SimulationError::DegenerateSimulation { .. }
        | SimulationError::InvalidDistribution { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        SimulationError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, err.to_string())
}

/// Raises the cancel flag when the request future is dropped, e.g. when the
/// client disconnects mid-run.
struct CancelOnDrop(CancelFlag);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// GET /
async fn index_handler(State(state): State<Arc<AppState>>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        games: state.games.len(),
        teams: state.teams.len(),
    })
}

/// GET /api/teams
async fn teams_handler(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.teams.as_ref().clone())
}

/// GET /api/simulate?home=MIN&away=DEN&sims=1000&seed=7&bin_width=5
async fn simulate_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SimulateParams>,
) -> Result<Json<MatchupReport>, (StatusCode, String)> {
    let sims = params.sims.unwrap_or(DEFAULT_SIMS);
    if sims == 0 || sims > state.max_sims {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("sims must be between 1 and {}", state.max_sims),
        ));
    }
    let bin_width = params.bin_width.unwrap_or(DEFAULT_BIN_WIDTH);
    if bin_width < 1 {
        return Err((StatusCode::BAD_REQUEST, "bin_width must be at least 1".into()));
    }

    let mut settings = state.settings;
    if params.seed.is_some() {
        settings.seed = params.seed;
    }
    if let Some(formula) = params.win_pct_formula {
        settings.win_pct = formula;
    }

    let cancel = CancelFlag::new();
    let _guard = CancelOnDrop(cancel.clone());
    let games = Arc::clone(&state.games);
    let SimulateParams { home, away, .. } = params;

    let task = tokio::task::spawn_blocking(move || {
        run_matchup(&games, &home, &away, sims, bin_width, settings, cancel)
    });

    match task.await {
        Ok(Ok(report)) => Ok(Json(report)),
        Ok(Err(e)) => {
            if e.is_data_error() {
                warn!("Simulation rejected: {}", e);
            } else {
                error!("Simulation failed: {}", e);
            }
            Err(error_response(&e))
        }
        Err(e) => {
            error!("Simulation task panicked: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "simulation task failed".into(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn season() -> Vec<HistoricalGameRecord> {
        vec![
            HistoricalGameRecord::new("MIN", "LAL", 1.12, 1.01, 98.0),
            HistoricalGameRecord::new("MIN", "BOS", 1.04, 1.08, 101.0),
            HistoricalGameRecord::new("MIN", "PHX", 1.09, 0.99, 99.5),
            HistoricalGameRecord::new("LAL", "DEN", 1.02, 1.13, 97.0),
            HistoricalGameRecord::new("BOS", "DEN", 1.10, 1.05, 100.5),
            HistoricalGameRecord::new("PHX", "DEN", 1.07, 1.00, 102.0),
            HistoricalGameRecord::new("PHX", "UTA", 1.07, 1.00, 102.0),
        ]
    }

    fn state() -> Arc<AppState> {
        Arc::new(AppState {
            games: Arc::new(season()),
            teams: Arc::new(vec!["BOS".into(), "LAL".into(), "MIN".into(), "PHX".into()]),
            settings: SimulationSettings {
                max_retries: 1_000,
                seed: Some(3),
                win_pct: WinPctFormula::Normalized,
            },
            max_sims: 5_000,
        })
    }

    fn params(home: &str, away: &str, sims: Option<u32>) -> SimulateParams {
        SimulateParams {
            home: home.into(),
            away: away.into(),
            sims,
            seed: None,
            bin_width: None,
            win_pct_formula: None,
        }
    }

    #[test]
    fn report_histogram_covers_all_trials() {
        let s = state();
        let report = run_matchup(&s.games, "min", "den", 300, 4, s.settings, CancelFlag::new()).unwrap();
        assert_eq!(report.home, "MIN");
        assert_eq!(report.away, "DEN");
        assert_eq!(report.result.margins.len(), 300);
        assert_eq!(report.histogram.total(), 300);
        assert_eq!(report.histogram.bin_width, 4);
    }

    #[test]
    fn data_errors_map_to_client_statuses() {
        let s = state();
        let err = run_matchup(&s.games, "SAC", "DEN", 10, 5, s.settings, CancelFlag::new())
            .unwrap_err();
        let (status, msg) = error_response(&err);
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(msg.contains("SAC"));

        let err = run_matchup(&s.games, "MIN", "UTA", 10, 5, s.settings, CancelFlag::new())
            .unwrap_err();
        let (status, msg) = error_response(&err);
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(msg.contains("insufficient historical data for team UTA"), "{msg}");
    }

    #[tokio::test]
    async fn simulate_endpoint_returns_report() {
        let Json(report) = simulate_handler(State(state()), Query(params("MIN", "DEN", Some(200))))
            .await
            .unwrap();
        assert_eq!(report.result.trials, 200);
        assert_eq!(report.result.seed, 3);
        assert_eq!(report.result.home_wins + report.result.away_wins, 200);
    }

    #[tokio::test]
    async fn simulate_endpoint_validates_sims() {
        let (status, _) = simulate_handler(State(state()), Query(params("MIN", "DEN", Some(0))))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, msg) =
            simulate_handler(State(state()), Query(params("MIN", "DEN", Some(5_001))))
                .await
                .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(msg.contains("5000"));
    }

    #[tokio::test]
    async fn seed_parameter_overrides_default() {
        let mut p = params("MIN", "DEN", Some(50));
        p.seed = Some(77);
        p.win_pct_formula = Some(WinPctFormula::Legacy);
        let Json(report) = simulate_handler(State(state()), Query(p)).await.unwrap();
        assert_eq!(report.result.seed, 77);
        // Legacy divides by 100: at most round(50 / 100) = 0 or 1.
        assert!(report.result.home_win_pct <= 1.0);
    }

    #[tokio::test]
    async fn teams_endpoint_lists_codes() {
        let Json(teams) = teams_handler(State(state())).await;
        assert_eq!(teams.len(), 4);
        let Json(info) = index_handler(State(state())).await;
        assert_eq!(info.games, 7);
        assert_eq!(info.service, "matchup-sim");
    }

    #[test]
    fn dropping_guard_cancels() {
        let flag = CancelFlag::new();
        {
            let _guard = CancelOnDrop(flag.clone());
            assert!(!flag.is_cancelled());
        }
        assert!(flag.is_cancelled());
    }
}
