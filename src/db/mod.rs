use anyhow::{anyhow, bail, Context, Result};
use rusqlite::{Connection, OpenFlags};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

pub mod models;
use models::HistoricalGameRecord;

/// Read-only handle on the historical games database (single connection with mutex).
///
/// The schema is owned by whatever ingests the games; this side only reads
/// the columns the simulator needs.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open an existing SQLite database read-only. A missing file is an error
    /// rather than an empty database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("open sqlite db {path}"))?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Database {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection mutex poisoned"))
    }

    // ── Historical games ─────────────────────────────────────────────────────

    /// Load every usable game from `table`, oldest first.
    ///
    /// Rows with a NULL or non-finite team code, rate or pace are skipped.
    pub fn load_games(&self, table: &str) -> Result<Vec<HistoricalGameRecord>> {
        validate_table_name(table)?;
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT team_abbreviation_home, team_abbreviation_away,
                        points_per_possession_home, points_per_possession_away,
                        pace_home
                 FROM {table} ORDER BY game_date"
            ))
            .with_context(|| format!("prepare games query on table {table}"))?;
        let rows = stmt
            .query_map([], map_game_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("read games from table {table}"))?;

        let total = rows.len();
        let games: Vec<HistoricalGameRecord> = rows
            .into_iter()
            .flatten()
            .filter(HistoricalGameRecord::is_finite)
            .collect();
        let skipped = total - games.len();
        if skipped > 0 {
            warn!("Skipped {} of {} rows in {} with missing values", skipped, total, table);
        }
        debug!("Loaded {} historical games from {}", games.len(), table);
        Ok(games)
    }

    /// Distinct home team codes, sorted.
    pub fn list_teams(&self, table: &str) -> Result<Vec<String>> {
        validate_table_name(table)?;
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT DISTINCT TRIM(team_abbreviation_home) AS team FROM {table}
             WHERE team_abbreviation_home IS NOT NULL
             ORDER BY team"
        ))?;
        let teams = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(teams)
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

/// Table names are spliced into SQL, so only plain identifiers are accepted.
pub fn validate_table_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        bail!("table name must not be empty");
    };
    if !(first.is_ascii_alphabetic() || first == '_')
        || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        bail!("invalid table name {name:?}: only letters, digits and '_' are allowed");
    }
    Ok(())
}

fn map_game_row(row: &rusqlite::Row) -> rusqlite::Result<Option<HistoricalGameRecord>> {
    let home: Option<String> = row.get(0)?;
    let away: Option<String> = row.get(1)?;
    let home_ppp: Option<f64> = row.get(2)?;
    let away_ppp: Option<f64> = row.get(3)?;
    let pace: Option<f64> = row.get(4)?;
    Ok(match (home, away, home_ppp, away_ppp, pace) {
        (Some(home), Some(away), Some(home_ppp), Some(away_ppp), Some(pace)) => Some(
            HistoricalGameRecord::new(home.trim(), away.trim(), home_ppp, away_ppp, pace),
        ),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SCHEMA: &str = r#"
    CREATE TABLE games (
        game_date                  TEXT NOT NULL,
        team_abbreviation_home     TEXT,
        team_abbreviation_away     TEXT,
        points_per_possession_home REAL,
        points_per_possession_away REAL,
        pace_home                  REAL
    );
    INSERT INTO games VALUES ('2021-01-03', 'MIN', 'DEN', 1.10, 1.02, 99.0);
    INSERT INTO games VALUES ('2021-01-01', 'DEN', 'MIN', 1.15, 1.01, 101.0);
    INSERT INTO games VALUES ('2021-01-02', 'LAL', 'MIN', 1.05, NULL, 97.5);
    INSERT INTO games VALUES ('2021-01-04', ' BOS ', 'LAL', 1.08, 1.12, 95.0);
    "#;

    fn test_db() -> Database {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(TEST_SCHEMA).unwrap();
        Database::from_connection(conn)
    }

    #[test]
    fn loads_games_in_date_order_skipping_nulls() {
        let games = test_db().load_games("games").unwrap();
        assert_eq!(games.len(), 3);
        assert_eq!(games[0].home_team, "DEN");
        assert_eq!(games[1].home_team, "MIN");
        assert_eq!(games[1].away_team, "DEN");
        assert_eq!(games[1].home_points_per_possession, 1.10);
        assert_eq!(games[1].pace, 99.0);
        assert_eq!(games[2].home_team, "BOS", "codes are trimmed");
    }

    #[test]
    fn lists_distinct_home_teams() {
        let teams = test_db().list_teams("games").unwrap();
        assert_eq!(teams, vec!["BOS", "DEN", "LAL", "MIN"]);
    }

    #[test]
    fn missing_table_is_an_error() {
        assert!(test_db().load_games("matches").is_err());
    }

    #[test]
    fn rejects_unsafe_table_names() {
        assert!(validate_table_name("games").is_ok());
        assert!(validate_table_name("_games_2021").is_ok());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("1games").is_err());
        assert!(validate_table_name("games; DROP TABLE games").is_err());
        assert!(test_db().load_games("games--").is_err());
    }

    #[test]
    fn open_requires_existing_file() {
        let path = std::env::temp_dir().join("matchup-sim-does-not-exist.db");
        let _ = std::fs::remove_file(&path);
        assert!(Database::open(path.to_str().unwrap()).is_err());
    }
}
