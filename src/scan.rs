//! Scan orchestration.
//!
//! Coordinates the full pipeline: paginate → parse → diff against the
//! stored snapshot → derive views → render → persist. Persistence
//! failures are logged and do not abort the scan; the rendered result is
//! still shown and the stale snapshot simply survives until the next run.

use anyhow::Result;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::Config;
use crate::db;
use crate::diff::diff_against_snapshot;
use crate::fetch::{fetch_all, DriverOptions, HttpFetcher};
use crate::models::{ReviewViews, RunStats};
use crate::progress::ProgressMode;
use crate::store;
use crate::views::{build_views, scan_stats};

pub async fn run_scan(
    config: &Config,
    max_pages: Option<u32>,
    dry_run: bool,
    progress: ProgressMode,
) -> Result<()> {
    let pool = db::connect(config).await?;

    let prior_stats = store::load_stats(&pool).await?;
    println!("{}", render_header(prior_stats.as_ref()));

    let snapshot = store::load_snapshot(&pool).await?;

    let fetcher = HttpFetcher::new(&config.source)?;
    let mut opts = DriverOptions::from_source(&config.source);
    if let Some(cap) = max_pages {
        opts.max_pages = cap;
    }

    // Ctrl-C aborts between page requests; the partial accumulation is
    // safe to discard and the stored snapshot stays untouched.
    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_on_signal = Arc::clone(&cancel);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_on_signal.store(true, Ordering::Relaxed);
        }
    });

    let reporter = progress.reporter();
    let mut records = fetch_all(&fetcher, &opts, reporter.as_ref(), &cancel).await?;

    let today = Utc::now().date_naive();
    let changed = diff_against_snapshot(&mut records, &snapshot, today);
    let views = build_views(&records, changed);
    let stats = scan_stats(&records, today);

    print!("{}", render_views(&views));
    println!("{}", render_header(Some(&stats)));

    if dry_run {
        println!("(dry-run) nothing persisted");
    } else {
        // Each write failure is recoverable: log and keep going, so one
        // full storage outage still leaves the scan output usable.
        if let Err(e) = store::replace_reviews(&pool, &records).await {
            eprintln!("warning: failed to persist review records: {:#}", e);
        }
        if let Err(e) = store::merge_snapshot(&pool, &records).await {
            eprintln!("warning: failed to persist snapshot: {:#}", e);
        }
        if let Err(e) = store::save_stats(&pool, &stats).await {
            eprintln!("warning: failed to persist run stats: {:#}", e);
        }
    }
    println!("ok");

    pool.close().await;
    Ok(())
}

/// One-line summary shown before and after a scan. Zero counts render as
/// "-" and the date is omitted until a scan has run.
pub fn render_header(stats: Option<&RunStats>) -> String {
    let (reviews, votes, date) = match stats {
        Some(s) => (s.total_reviews, s.total_votes, s.last_scan_date),
        None => (0, 0, None),
    };
    let reviews = if reviews > 0 {
        reviews.to_string()
    } else {
        "-".to_string()
    };
    let votes = if votes > 0 {
        votes.to_string()
    } else {
        "-".to_string()
    };
    let date = date
        .map(|d| format!("  last scanned: {}", d))
        .unwrap_or_default();
    format!("reviews: {}  helpful votes: {}{}", reviews, votes, date)
}

/// Render the three derived views as plain text sections.
pub fn render_views(views: &ReviewViews) -> String {
    let mut out = String::new();

    if !views.changed.is_empty() {
        out.push_str("\nNew votes since last scan:\n");
        for c in &views.changed {
            let delta = c.delta();
            let sign = if delta > 0 { "+" } else { "" };
            out.push_str(&format!(
                "  {} ({}{})  [{}/5]  {}\n",
                c.new_votes, sign, delta, c.record.rating, c.record.product_title
            ));
        }
    }

    if !views.recent.is_empty() {
        out.push_str("\nRecently changed votes:\n");
        for r in &views.recent {
            let date = r
                .last_changed
                .map(|d| d.to_string())
                .unwrap_or_default();
            out.push_str(&format!(
                "  {}  [{}/5]  {}  ({})\n",
                r.helpful_votes, r.rating, r.product_title, date
            ));
        }
    }

    out.push_str("\nMost helpful reviews:\n");
    if views.top_ranked.is_empty() {
        out.push_str("  (no reviews with helpful votes)\n");
    }
    for r in &views.top_ranked {
        out.push_str(&format!(
            "  {}  [{}/5]  {}\n",
            r.helpful_votes, r.rating, r.product_title
        ));
        if let Some(link) = &r.review_link {
            out.push_str(&format!("      {}\n", link));
        }
    }
    out.push('\n');

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChangedEntry, IdProvenance, ReviewRecord};
    use chrono::NaiveDate;

    fn record(id: &str, votes: i64) -> ReviewRecord {
        ReviewRecord {
            review_id: id.to_string(),
            id_provenance: IdProvenance::Source,
            seq: 1,
            asin: None,
            product_title: format!("Product {}", id),
            product_image: None,
            rating: 4,
            helpful_votes: votes,
            review_text: None,
            review_image: None,
            review_link: Some(format!("https://reviews.example.com/r/{}", id)),
            last_changed: None,
        }
    }

    #[test]
    fn test_header_shows_dashes_before_first_scan() {
        assert_eq!(render_header(None), "reviews: -  helpful votes: -");
    }

    #[test]
    fn test_header_shows_counts_and_date() {
        let stats = RunStats {
            total_reviews: 12,
            total_votes: 34,
            last_scan_date: Some(NaiveDate::from_ymd_opt(2025, 1, 9).unwrap()),
        };
        assert_eq!(
            render_header(Some(&stats)),
            "reviews: 12  helpful votes: 34  last scanned: 2025-01-09"
        );
    }

    #[test]
    fn test_render_views_shows_signed_deltas() {
        let up = ChangedEntry {
            record: record("A", 5),
            old_votes: 3,
            new_votes: 5,
        };
        let down = ChangedEntry {
            record: record("B", 1),
            old_votes: 2,
            new_votes: 1,
        };
        let views = ReviewViews {
            changed: vec![up, down],
            recent: vec![],
            top_ranked: vec![],
        };

        let text = render_views(&views);
        assert!(text.contains("5 (+2)"));
        assert!(text.contains("1 (-1)"));
    }

    #[test]
    fn test_render_views_lists_top_ranked_with_links() {
        let views = ReviewViews {
            changed: vec![],
            recent: vec![],
            top_ranked: vec![record("A", 9)],
        };

        let text = render_views(&views);
        assert!(text.contains("Most helpful reviews:"));
        assert!(text.contains("9  [4/5]  Product A"));
        assert!(text.contains("https://reviews.example.com/r/A"));
    }
}
