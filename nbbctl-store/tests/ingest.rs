//! End-to-end ingestion against a real PostgreSQL.
//!
//! Run with: DATABASE_URL=postgres://... cargo test -p nbbctl-store -- --ignored
//!
//! Every test uses random player/game ids and logo URLs so runs against a
//! shared database do not interfere with each other.

use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;
use nbbctl_core::{
    team_id_from_logo, GameRecord, PlayByPlayRecord, PlayerRecord, PlayerStatRecord, PoolConfig,
    Record, ShotRecord, TeamRecord,
};
use nbbctl_store::db::repos::{Applied, PlayerRepo};
use nbbctl_store::dispatch;
use nbbctl_store::{ConnectionPool, IngestError, Ingestor, Session, StoreErrorKind};
use rand::Rng;
use sqlx::postgres::PgConnectOptions;

fn connect_options() -> PgConnectOptions {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
    PgConnectOptions::from_str(&url).expect("valid DATABASE_URL")
}

async fn ingestor() -> Ingestor {
    let options = connect_options();
    let config = PoolConfig {
        min_connections: 1,
        max_connections: 8,
        acquire_timeout: Some(Duration::from_secs(10)),
    };
    let pool = ConnectionPool::connect_with(options, &config)
        .await
        .expect("pool creation failed");
    Ingestor::from_pool(pool).await.expect("schema initialization failed")
}

fn random_id() -> i32 {
    rand::thread_rng().gen_range(1_000_000..i32::MAX)
}

fn logo(tag: &str) -> String {
    format!("http://test.local/{tag}-{}.png", random_id())
}

fn team(name: &str, logo: &str) -> Record {
    Record::Team(TeamRecord {
        id: None,
        name: Some(name.to_string()),
        logo: Some(logo.to_string()),
    })
}

fn game(id: i32, home: &str, away: &str, home_score: i32, away_score: i32) -> Record {
    Record::Game(GameRecord {
        game_id: Some(id),
        game_date: NaiveDate::from_ymd_opt(2024, 3, 15),
        home_team_id: team_id_from_logo(home),
        away_team_id: team_id_from_logo(away),
        home_team_score: Some(home_score),
        away_team_score: Some(away_score),
        round: Some("12ª rodada".into()),
        stage: Some("Temporada regular".into()),
        season: Some("2023/2024".into()),
        arena: Some("Ginásio".into()),
        ..Default::default()
    })
}

fn player(id: i32, team_logo: &str, number: &str) -> Record {
    Record::Player(PlayerRecord {
        player_id: Some(id),
        player_name: Some(format!("Player {id}")),
        player_icon_url: None,
        player_team_id: team_id_from_logo(team_logo),
        season: Some("2023/2024".into()),
        player_number: Some(number.into()),
    })
}

fn stat(player_id: i32, game_id: i32, team_logo: &str, points: i32) -> Record {
    Record::PlayerStat(PlayerStatRecord {
        player_id: Some(player_id),
        game_id: Some(game_id),
        team_id: team_id_from_logo(team_logo),
        quarter: Some("1".into()),
        points_made: Some(points),
        efficiency: Some(points),
        ..Default::default()
    })
}

async fn count(ing: &Ingestor, sql: &str, key: i32) -> i64 {
    sqlx::query_scalar(sql)
        .bind(key)
        .fetch_one(ing.pool().pg_pool())
        .await
        .expect("count query failed")
}

async fn count_teams(ing: &Ingestor, id: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM teams WHERE id = $1")
        .bind(id)
        .fetch_one(ing.pool().pg_pool())
        .await
        .expect("count query failed")
}

#[tokio::test]
#[ignore = "requires database"]
async fn schema_initialization_is_repeatable() {
    let ing = ingestor().await;
    // A second initialization against the now-existing schema
    let again = Ingestor::from_pool(ing.pool().clone()).await;
    assert!(again.is_ok());
    ing.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn keyed_entities_are_idempotent() {
    let ing = ingestor().await;
    let home = logo("home");
    let away = logo("away");
    let game_id = random_id();
    let player_id = random_id();

    for _ in 0..2 {
        ing.ingest(team("Home", &home)).await.unwrap();
        ing.ingest(team("Away", &away)).await.unwrap();
        ing.ingest(player(player_id, &home, "7")).await.unwrap();
        ing.ingest(game(game_id, &home, &away, 80, 70)).await.unwrap();
        ing.ingest(stat(player_id, game_id, &home, 12)).await.unwrap();
    }

    let home_id = team_id_from_logo(&home).unwrap();
    assert_eq!(count_teams(&ing, &home_id).await, 1);
    assert_eq!(count(&ing, "SELECT COUNT(*) FROM players WHERE id = $1", player_id).await, 1);
    assert_eq!(
        count(
            &ing,
            "SELECT COUNT(*) FROM player_teams_by_season WHERE player_id = $1",
            player_id
        )
        .await,
        1
    );
    assert_eq!(count(&ing, "SELECT COUNT(*) FROM games WHERE id = $1", game_id).await, 1);
    assert_eq!(
        count(&ing, "SELECT COUNT(*) FROM player_stats WHERE game_id = $1", game_id).await,
        1
    );
    ing.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn reingestion_overwrites_mutable_columns() {
    let ing = ingestor().await;
    let home = logo("home");
    let player_id = random_id();

    ing.ingest(team("Old name", &home)).await.unwrap();
    ing.ingest(team("New name", &home)).await.unwrap();
    ing.ingest(player(player_id, &home, "7")).await.unwrap();
    ing.ingest(player(player_id, &home, "23")).await.unwrap();

    let name: String = sqlx::query_scalar("SELECT name FROM teams WHERE id = $1")
        .bind(team_id_from_logo(&home))
        .fetch_one(ing.pool().pg_pool())
        .await
        .unwrap();
    assert_eq!(name, "New name");

    let number: String = sqlx::query_scalar(
        "SELECT player_number FROM player_teams_by_season WHERE player_id = $1",
    )
    .bind(player_id)
    .fetch_one(ing.pool().pg_pool())
    .await
    .unwrap();
    assert_eq!(number, "23");
    ing.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn stat_for_unknown_game_fails_and_leaves_nothing() {
    let ing = ingestor().await;
    let home = logo("home");
    let player_id = random_id();
    let missing_game = random_id();

    ing.ingest(team("Home", &home)).await.unwrap();
    ing.ingest(player(player_id, &home, "7")).await.unwrap();

    let err = ing
        .ingest(stat(player_id, missing_game, &home, 10))
        .await
        .unwrap_err();
    match err {
        IngestError::Store(store) => {
            assert_eq!(store.kind, StoreErrorKind::ForeignKeyViolation)
        }
        other => panic!("expected store error, got {other}"),
    }
    assert_eq!(
        count(&ing, "SELECT COUNT(*) FROM player_stats WHERE game_id = $1", missing_game).await,
        0
    );
    ing.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn failed_season_row_rolls_back_player_row() {
    let ing = ingestor().await;
    let player_id = random_id();
    // The team behind this logo is never ingested
    let unknown_team = logo("ghost");

    let err = ing
        .ingest(player(player_id, &unknown_team, "9"))
        .await
        .unwrap_err();
    assert!(!err.is_drop());

    assert_eq!(count(&ing, "SELECT COUNT(*) FROM players WHERE id = $1", player_id).await, 0);
    ing.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn team_without_logo_is_dropped_not_stored() {
    let ing = ingestor().await;
    let name = format!("No logo {}", random_id());

    let err = ing
        .ingest(Record::Team(TeamRecord {
            id: None,
            name: Some(name.clone()),
            logo: Some(String::new()),
        }))
        .await
        .unwrap_err();
    assert!(err.is_drop());

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM teams WHERE name = $1")
        .bind(&name)
        .fetch_one(ing.pool().pg_pool())
        .await
        .unwrap();
    assert_eq!(rows, 0);
    ing.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn missing_stat_keys_commit_nothing() {
    let ing = ingestor().await;
    let game_id = random_id();

    let report = ing
        .ingest(Record::PlayerStat(PlayerStatRecord {
            player_id: Some(random_id()),
            game_id: Some(game_id),
            quarter: Some("2".into()),
            ..Default::default()
        }))
        .await
        .unwrap();

    assert!(!report.is_persisted());
    assert_eq!(
        report.writes[0].applied,
        Applied::Skipped {
            missing: vec!["team_id"]
        }
    );
    ing.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn game_between_two_teams_end_to_end() {
    let ing = ingestor().await;
    let a = logo("a");
    let b = logo("b");
    let game_id = random_id();

    ing.ingest(team("Team A", &a)).await.unwrap();
    ing.ingest(team("Team B", &b)).await.unwrap();
    ing.ingest(game(game_id, &a, &b, 88, 75)).await.unwrap();

    let row: (String, String, i32, i32, String) = sqlx::query_as(
        "SELECT home_team_id, away_team_id, home_team_score, away_team_score, arena
         FROM games WHERE id = $1",
    )
    .bind(game_id)
    .fetch_one(ing.pool().pg_pool())
    .await
    .unwrap();
    assert_eq!(row.0, team_id_from_logo(&a).unwrap());
    assert_eq!(row.1, team_id_from_logo(&b).unwrap());
    assert_eq!((row.2, row.3), (88, 75));

    ing.ingest(game(game_id, &a, &b, 90, 75)).await.unwrap();

    let updated: (String, String, i32, i32, String) = sqlx::query_as(
        "SELECT home_team_id, away_team_id, home_team_score, away_team_score, arena
         FROM games WHERE id = $1",
    )
    .bind(game_id)
    .fetch_one(ing.pool().pg_pool())
    .await
    .unwrap();
    assert_eq!((updated.2, updated.3), (90, 75));
    assert_eq!((&updated.0, &updated.1, &updated.4), (&row.0, &row.1, &row.4));
    assert_eq!(count(&ing, "SELECT COUNT(*) FROM games WHERE id = $1", game_id).await, 1);
    ing.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn event_logs_are_not_deduplicated() {
    let ing = ingestor().await;
    let home = logo("home");
    let away = logo("away");
    let game_id = random_id();
    let player_id = random_id();

    ing.ingest(team("Home", &home)).await.unwrap();
    ing.ingest(team("Away", &away)).await.unwrap();
    ing.ingest(player(player_id, &home, "4")).await.unwrap();
    ing.ingest(game(game_id, &home, &away, 0, 0)).await.unwrap();

    let shot = Record::Shot(ShotRecord {
        player_id: Some(player_id),
        game_id: Some(game_id),
        team_id: team_id_from_logo(&home),
        shot_quarter: Some("1".into()),
        shot_type: Some("3PT".into()),
        shot_x_location: Some(12.5),
        shot_y_location: Some(40.0),
        ..Default::default()
    });
    let play = Record::PlayByPlay(PlayByPlayRecord {
        game_id: Some(game_id),
        player_id: Some(player_id),
        team_id: team_id_from_logo(&home),
        quarter: Some("1".into()),
        home_score: Some(3),
        away_score: Some(0),
        play: Some("Cesta de 3 pontos".into()),
        ..Default::default()
    });

    for _ in 0..2 {
        ing.ingest(shot.clone()).await.unwrap();
        ing.ingest(play.clone()).await.unwrap();
    }

    assert_eq!(count(&ing, "SELECT COUNT(*) FROM shots WHERE game_id = $1", game_id).await, 2);
    assert_eq!(
        count(&ing, "SELECT COUNT(*) FROM play_by_play WHERE game_id = $1", game_id).await,
        2
    );
    ing.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn concurrent_upserts_of_one_game_converge() {
    let ing = ingestor().await;
    let home = logo("home");
    let away = logo("away");
    let game_id = random_id();
    ing.ingest(team("Home", &home)).await.unwrap();
    ing.ingest(team("Away", &away)).await.unwrap();

    let records: Vec<Record> = (0..20)
        .map(|score| game(game_id, &home, &away, score, 0))
        .collect();
    let stats = ing.ingest_stream(futures::stream::iter(records), 8).await;

    assert_eq!(stats.persisted, 20);
    assert_eq!(stats.failed, 0);
    assert_eq!(count(&ing, "SELECT COUNT(*) FROM games WHERE id = $1", game_id).await, 1);
    ing.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn dropped_session_rolls_back_and_returns_connection() {
    let ing = ingestor().await;
    let player_id = random_id();

    let Record::Player(record) = player(player_id, "http://x/none.png", "1") else {
        unreachable!()
    };
    {
        let mut session = Session::begin(ing.pool()).await.unwrap();
        let applied = PlayerRepo::new(session.conn())
            .upsert(&record)
            .await
            .unwrap();
        assert_eq!(applied, Applied::Written);
        // Dropped here without commit
    }

    assert_eq!(count(&ing, "SELECT COUNT(*) FROM players WHERE id = $1", player_id).await, 0);
    ing.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn a_failed_record_does_not_affect_its_neighbours() {
    let ing = ingestor().await;
    let home = logo("home");
    let good_player = random_id();
    let bad_player = random_id();

    let records = vec![
        team("Home", &home),
        player(bad_player, &logo("ghost"), "1"),
        player(good_player, &home, "2"),
        Record::Team(TeamRecord::default()),
    ];
    // Sequential so the team exists before the good player
    let stats = ing.ingest_stream(futures::stream::iter(records), 1).await;

    assert_eq!(stats.persisted, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.dropped, 1);
    assert_eq!(count(&ing, "SELECT COUNT(*) FROM players WHERE id = $1", good_player).await, 1);
    assert_eq!(count(&ing, "SELECT COUNT(*) FROM players WHERE id = $1", bad_player).await, 0);
    ing.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn dispatch_inside_a_caller_owned_session() {
    let ing = ingestor().await;
    let home = logo("home");
    let home_id = team_id_from_logo(&home).unwrap();

    let mut session = Session::begin(ing.pool()).await.unwrap();
    let report = dispatch::dispatch(&mut session, team("Home", &home))
        .await
        .unwrap();
    assert!(report.is_persisted());

    // Drops surface before any statement runs; the session stays usable
    let err = dispatch::dispatch(&mut session, player_without_id())
        .await
        .unwrap_err();
    assert!(err.is_drop());

    // Uncommitted work is invisible outside the session
    assert_eq!(count_teams(&ing, &home_id).await, 0);
    session.commit().await.unwrap();
    assert_eq!(count_teams(&ing, &home_id).await, 1);
    ing.close().await;
}

fn player_without_id() -> Record {
    Record::Player(PlayerRecord {
        player_name: Some("Anon".into()),
        ..Default::default()
    })
}

#[tokio::test]
#[ignore = "requires database"]
async fn session_holds_a_pooled_connection_until_it_ends() {
    let config = PoolConfig {
        min_connections: 1,
        max_connections: 1,
        acquire_timeout: Some(Duration::from_secs(1)),
    };
    let pool = ConnectionPool::connect_with(connect_options(), &config)
        .await
        .expect("pool creation failed");

    let session = Session::begin(&pool).await.unwrap();
    let err = pool.acquire().await.unwrap_err();
    assert_eq!(err.kind, StoreErrorKind::Connectivity);

    session.commit().await.unwrap();
    let conn = pool.acquire().await.expect("connection released by commit");
    pool.release(conn);
    pool.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn stream_runs_a_custom_operation_per_record() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let ing = ingestor().await;
    let calls = AtomicUsize::new(0);
    let records = vec![team("A", &logo("a")), team("B", &logo("b")), player_without_id()];

    let stats = ing
        .ingest_stream_with(futures::stream::iter(records), 2, |ingestor, record| {
            calls.fetch_add(1, Ordering::Relaxed);
            ingestor.ingest(record)
        })
        .await;

    assert_eq!(calls.load(Ordering::Relaxed), 3);
    assert_eq!(stats.persisted, 2);
    assert_eq!(stats.dropped, 1);
    ing.close().await;
}
