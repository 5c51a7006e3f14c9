//! Persisted scan state.
//!
//! Two JSON-encoded key-value entries live in the `state` table with
//! independent lifecycles: `snapshot` (the minimal per-review projection
//! used for diffing) and `stats` (the run summary shown in the header).
//! The `reviews` table holds the last successful scan's full record set,
//! replaced wholesale each run, so `export` and `stats` work across
//! processes.
//!
//! The snapshot is merge-on-write: entries for reviews the source no
//! longer returns are kept, deliberately, so vote history survives a
//! review temporarily disappearing from pagination.

use anyhow::{Context, Result};
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;

use crate::models::{IdProvenance, ReviewRecord, RunStats, SnapshotEntry};

const SNAPSHOT_KEY: &str = "snapshot";
const STATS_KEY: &str = "stats";

async fn get_state(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM state WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(value)
}

async fn set_state(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query(
        r#"
        INSERT INTO state (key, value, updated_at) VALUES (?, ?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
    )
    .bind(key)
    .bind(value)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

/// Load the prior-run snapshot. Missing → empty. A corrupt stored value
/// is logged and treated as empty rather than failing the scan.
pub async fn load_snapshot(pool: &SqlitePool) -> Result<Vec<SnapshotEntry>> {
    match get_state(pool, SNAPSHOT_KEY).await? {
        None => Ok(Vec::new()),
        Some(json) => match serde_json::from_str(&json) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                eprintln!("warning: stored snapshot is corrupt, starting fresh: {}", e);
                Ok(Vec::new())
            }
        },
    }
}

/// Merge the scan's record set into the stored snapshot and write the
/// full merged set back. Existing `last_changed` dates are preserved when
/// the incoming record carries none; entries absent from `records` are
/// left untouched. Entries are written in id order so the serialized form
/// is deterministic — merging the same set twice is a no-op.
pub async fn merge_snapshot(pool: &SqlitePool, records: &[ReviewRecord]) -> Result<()> {
    let mut merged: BTreeMap<String, SnapshotEntry> = load_snapshot(pool)
        .await?
        .into_iter()
        .map(|e| (e.id.clone(), e))
        .collect();

    for record in records {
        let last_changed = record.last_changed.or_else(|| {
            merged
                .get(&record.review_id)
                .and_then(|existing| existing.last_changed)
        });
        merged.insert(
            record.review_id.clone(),
            SnapshotEntry {
                id: record.review_id.clone(),
                asin: record.asin.clone(),
                votes: record.helpful_votes,
                last_changed,
            },
        );
    }

    let entries: Vec<&SnapshotEntry> = merged.values().collect();
    let json = serde_json::to_string(&entries).context("failed to encode snapshot")?;
    set_state(pool, SNAPSHOT_KEY, &json).await
}

pub async fn load_stats(pool: &SqlitePool) -> Result<Option<RunStats>> {
    match get_state(pool, STATS_KEY).await? {
        None => Ok(None),
        Some(json) => match serde_json::from_str(&json) {
            Ok(stats) => Ok(Some(stats)),
            Err(e) => {
                eprintln!("warning: stored stats are corrupt, ignoring: {}", e);
                Ok(None)
            }
        },
    }
}

pub async fn save_stats(pool: &SqlitePool, stats: &RunStats) -> Result<()> {
    let json = serde_json::to_string(stats).context("failed to encode run stats")?;
    set_state(pool, STATS_KEY, &json).await
}

/// Replace the stored full record set with this scan's records.
pub async fn replace_reviews(pool: &SqlitePool, records: &[ReviewRecord]) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM reviews").execute(&mut *tx).await?;

    for r in records {
        sqlx::query(
            r#"
            INSERT INTO reviews (review_id, id_provenance, seq, asin, product_title,
                                 product_image, rating, helpful_votes, review_text,
                                 review_image, review_link, last_changed)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&r.review_id)
        .bind(r.id_provenance.as_str())
        .bind(r.seq)
        .bind(&r.asin)
        .bind(&r.product_title)
        .bind(&r.product_image)
        .bind(r.rating as i64)
        .bind(r.helpful_votes)
        .bind(&r.review_text)
        .bind(&r.review_image)
        .bind(&r.review_link)
        .bind(r.last_changed.map(|d| d.to_string()))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Load the last scan's record set in scan order.
pub async fn load_reviews(pool: &SqlitePool) -> Result<Vec<ReviewRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT review_id, id_provenance, seq, asin, product_title, product_image,
               rating, helpful_votes, review_text, review_image, review_link, last_changed
        FROM reviews ORDER BY seq
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in &rows {
        let provenance: String = row.get("id_provenance");
        let last_changed: Option<String> = row.get("last_changed");
        records.push(ReviewRecord {
            review_id: row.get("review_id"),
            id_provenance: IdProvenance::parse(&provenance),
            seq: row.get("seq"),
            asin: row.get("asin"),
            product_title: row.get("product_title"),
            product_image: row.get("product_image"),
            rating: row.get::<i64, _>("rating") as u8,
            helpful_votes: row.get("helpful_votes"),
            review_text: row.get("review_text"),
            review_image: row.get("review_image"),
            review_link: row.get("review_link"),
            last_changed: last_changed.and_then(|d| d.parse().ok()),
        });
    }
    Ok(records)
}
