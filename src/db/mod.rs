//! SQLite persistence for grants, tags and their associations.

mod repository;
mod seed;

pub use repository::*;
pub use seed::seed_if_empty;

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};

/// Schema statements, applied in order on every start.
///
/// AUTOINCREMENT keeps ids of deleted rows from being handed out again.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS tags (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        color TEXT NOT NULL DEFAULT '#007bff',
        description TEXT,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS grants (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT,
        amount REAL,
        deadline TEXT,
        status TEXT NOT NULL DEFAULT 'active',
        organization TEXT,
        contact_email TEXT,
        website TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS grant_tags (
        grant_id INTEGER NOT NULL REFERENCES grants(id) ON DELETE CASCADE,
        tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
        PRIMARY KEY (grant_id, tag_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_grant_tags_tag_id ON grant_tags(tag_id)",
    "CREATE INDEX IF NOT EXISTS idx_grants_status ON grants(status)",
];

/// Open (creating if needed) the database file and bring the schema up to date.
pub async fn init_database(db_path: &Path, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    for statement in SCHEMA {
        sqlx::query(statement).execute(&pool).await?;
    }
    tracing::debug!("Schema ready at {:?}", db_path);

    Ok(pool)
}
