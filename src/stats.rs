//! Stored-summary display.
//!
//! Prints the persisted run stats and store location without touching the
//! network, so users can check when they last scanned and what it found.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::scan::render_header;
use crate::store;

pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    let stats = store::load_stats(&pool).await?;
    let snapshot_len = store::load_snapshot(&pool).await?.len();
    let stored_reviews: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews")
        .fetch_one(&pool)
        .await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("revscan — store overview");
    println!("========================");
    println!();
    println!("  Database:          {}", config.db.path.display());
    println!("  Size:              {}", format_bytes(db_size));
    println!();
    println!("  {}", render_header(stats.as_ref()));
    println!("  Stored records:    {}", stored_reviews);
    println!("  Snapshot entries:  {}", snapshot_len);
    println!();

    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
