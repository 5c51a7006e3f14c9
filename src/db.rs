//! SQLite connection and schema management.
//!
//! The store is deliberately small: a `reviews` table holding the last
//! full scan (replaced wholesale per scan) and a `state` key-value table
//! holding two JSON-encoded entries, `snapshot` and `stats`, with
//! independent lifecycles.

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::config::Config;

pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let db_path = &config.db.path;

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Create all tables. Idempotent — safe to run on every `revscan init`.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = connect(config).await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reviews (
            review_id TEXT PRIMARY KEY,
            id_provenance TEXT NOT NULL DEFAULT 'source',
            seq INTEGER NOT NULL,
            asin TEXT,
            product_title TEXT NOT NULL,
            product_image TEXT,
            rating INTEGER NOT NULL DEFAULT 0,
            helpful_votes INTEGER NOT NULL DEFAULT 0,
            review_text TEXT,
            review_image TEXT,
            review_link TEXT,
            last_changed TEXT
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reviews_seq ON reviews(seq)")
        .execute(&pool)
        .await?;

    pool.close().await;
    Ok(())
}
