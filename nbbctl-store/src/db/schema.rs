//! Schema initialization.
//!
//! Every statement is `CREATE TABLE IF NOT EXISTS`, so this runs on each
//! start against fresh and existing databases alike. Tables are listed in
//! foreign-key dependency order and created inside a single transaction.

use tracing::{debug, info};

use super::pool::ConnectionPool;
use super::session::Session;
use crate::error::{StoreError, StoreResult};

/// `(table, DDL)` in creation order.
pub const TABLES: [(&str, &str); 7] = [
    (
        "teams",
        r#"
        CREATE TABLE IF NOT EXISTS teams (
            id VARCHAR(100) PRIMARY KEY,
            name VARCHAR(50),
            logo TEXT
        )
        "#,
    ),
    (
        "players",
        r#"
        CREATE TABLE IF NOT EXISTS players (
            id INTEGER PRIMARY KEY,
            player_name VARCHAR(50),
            player_icon_url TEXT
        )
        "#,
    ),
    (
        "player_teams_by_season",
        r#"
        CREATE TABLE IF NOT EXISTS player_teams_by_season (
            player_id INTEGER REFERENCES players(id) NOT NULL,
            player_team_id VARCHAR(100) REFERENCES teams(id) NOT NULL,
            season VARCHAR(20) NOT NULL,
            player_number VARCHAR(10),
            PRIMARY KEY (player_id, player_team_id, season)
        )
        "#,
    ),
    (
        "games",
        r#"
        CREATE TABLE IF NOT EXISTS games (
            id INTEGER PRIMARY KEY,
            game_date DATE,
            game_time TIME,
            home_team_id VARCHAR(100) REFERENCES teams(id),
            away_team_id VARCHAR(100) REFERENCES teams(id),
            home_team_score INTEGER,
            away_team_score INTEGER,
            round VARCHAR(30),
            stage VARCHAR(30),
            season VARCHAR(20),
            arena VARCHAR(100),
            link TEXT
        )
        "#,
    ),
    (
        "player_stats",
        r#"
        CREATE TABLE IF NOT EXISTS player_stats (
            player_id INTEGER REFERENCES players(id) NOT NULL,
            game_id INTEGER REFERENCES games(id) NOT NULL,
            team_id VARCHAR(100) REFERENCES teams(id) NOT NULL,
            quarter VARCHAR(10) NOT NULL,
            minutes_played FLOAT,
            assist INTEGER,
            points_attempts INTEGER,
            points_made INTEGER,
            defensive_rebounds INTEGER,
            offensive_rebounds INTEGER,
            three_points_attempts INTEGER,
            three_points_made INTEGER,
            two_points_attempts INTEGER,
            two_points_made INTEGER,
            free_throws_attempts INTEGER,
            free_throws_made INTEGER,
            steals INTEGER,
            blocks INTEGER,
            fouls_committed INTEGER,
            fouls_received INTEGER,
            total_errors INTEGER,
            dunks INTEGER,
            plus_minus_while_on_court INTEGER,
            efficiency INTEGER,
            PRIMARY KEY (player_id, game_id, quarter)
        )
        "#,
    ),
    (
        "shots",
        r#"
        CREATE TABLE IF NOT EXISTS shots (
            id SERIAL PRIMARY KEY,
            player_id INTEGER REFERENCES players(id),
            game_id INTEGER REFERENCES games(id),
            team_id VARCHAR(100) REFERENCES teams(id),
            shot_quarter VARCHAR(10),
            shot_time TIME,
            shot_type VARCHAR(20),
            shot_x_location FLOAT,
            shot_y_location FLOAT
        )
        "#,
    ),
    (
        "play_by_play",
        r#"
        CREATE TABLE IF NOT EXISTS play_by_play (
            id SERIAL PRIMARY KEY,
            game_id INTEGER REFERENCES games(id) NOT NULL,
            player_id INTEGER REFERENCES players(id),
            team_id VARCHAR(100) REFERENCES teams(id),
            quarter_time TIME,
            quarter VARCHAR(10) NOT NULL,
            home_score INTEGER NOT NULL,
            away_score INTEGER NOT NULL,
            play TEXT NOT NULL
        )
        "#,
    ),
];

/// Create every table that does not exist yet.
///
/// Any failure rolls the whole transaction back; the caller should treat
/// the error as fatal.
pub async fn initialize(pool: &ConnectionPool) -> StoreResult<()> {
    info!("Initializing schema...");

    Session::run(pool, |session| {
        Box::pin(async move {
            for (table, ddl) in TABLES {
                sqlx::query(ddl)
                    .execute(session.conn())
                    .await
                    .map_err(|err| StoreError::new(format!("creating table {table}"), err))?;
                debug!(table, "table ready");
            }
            Ok::<_, StoreError>(())
        })
    })
    .await?;

    info!("schema ready ({} tables)", TABLES.len());
    Ok(())
}
