//! Local store setup: connection pragmas and the cache/session schema.

use sqlx::sqlite::{SqliteConnection, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::{info, warn};

/// Bumped whenever `schema.sql` changes shape. Cached rows are disposable,
/// so a mismatch drops `cache_entries` instead of migrating it.
const STORE_VERSION: i64 = 1;

const CONNECTION_PRAGMAS: [&str; 3] = [
    "PRAGMA foreign_keys = ON",
    "PRAGMA busy_timeout = 5000",
    "PRAGMA synchronous = NORMAL",
];

/// Open (creating if needed) the local store at `db_path` and bring its schema
/// up to date.
pub async fn init_db(db_path: &str) -> Result<SqlitePool, sqlx::Error> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .after_connect(|conn, _meta| Box::pin(async move { apply_pragmas(conn).await }))
        .connect(&format!("sqlite:{}?mode=rwc", db_path))
        .await?;

    let reset = ensure_schema(&pool).await?;
    info!(
        "Local store ready at {} (version {}, cache reset: {})",
        db_path, STORE_VERSION, reset
    );
    Ok(pool)
}

/// Returns true when stale cache rows were dropped.
async fn ensure_schema(pool: &SqlitePool) -> Result<bool, sqlx::Error> {
    let (found,): (i64,) = sqlx::query_as("PRAGMA user_version")
        .fetch_one(pool)
        .await?;

    // 0 is a fresh file; anything else that differs is an older layout
    let reset = found != 0 && found != STORE_VERSION;
    if reset {
        warn!(
            "Local store version {} does not match {}, dropping cached entries",
            found, STORE_VERSION
        );
        sqlx::query("DROP TABLE IF EXISTS cache_entries")
            .execute(pool)
            .await?;
    }

    for statement in schema_statements(include_str!("schema.sql")) {
        sqlx::query(statement).execute(pool).await?;
    }

    // PRAGMA does not take bind parameters
    sqlx::query(&format!("PRAGMA user_version = {}", STORE_VERSION))
        .execute(pool)
        .await?;

    Ok(reset)
}

fn schema_statements(sql: &str) -> impl Iterator<Item = &str> {
    sql.split(';').map(str::trim).filter(|s| !s.is_empty())
}

async fn apply_pragmas(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    for pragma in CONNECTION_PRAGMAS {
        sqlx::query(pragma).execute(&mut *conn).await?;
    }

    // journal_mode answers with the mode actually in effect
    sqlx::query("PRAGMA journal_mode = WAL")
        .fetch_one(&mut *conn)
        .await?;

    Ok(())
}
