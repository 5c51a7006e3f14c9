//! Derived view construction.
//!
//! Builds the three collections rendered after a scan — changed, recently
//! changed, and top-ranked — from the merged record set. Both sorts are
//! stable so that ties keep their original relative (scan) order, which
//! makes the output reproducible run to run.

use chrono::NaiveDate;

use crate::models::{ChangedEntry, ReviewRecord, ReviewViews, RunStats};

/// How many entries the "recently changed" view keeps.
const RECENT_LIMIT: usize = 10;

/// Build the derived views. `changed` comes straight from the diff engine
/// and passes through with its order intact.
pub fn build_views(records: &[ReviewRecord], changed: Vec<ChangedEntry>) -> ReviewViews {
    let mut recent: Vec<ReviewRecord> = records
        .iter()
        .filter(|r| r.last_changed.is_some())
        .cloned()
        .collect();
    // Vec::sort_by is stable; ties keep scan order.
    recent.sort_by(|a, b| b.last_changed.cmp(&a.last_changed));
    recent.truncate(RECENT_LIMIT);

    let mut top_ranked: Vec<ReviewRecord> = records
        .iter()
        .filter(|r| r.helpful_votes > 0)
        .cloned()
        .collect();
    top_ranked.sort_by(|a, b| b.helpful_votes.cmp(&a.helpful_votes));

    ReviewViews {
        changed,
        recent,
        top_ranked,
    }
}

/// Aggregate run statistics over the full record set.
pub fn scan_stats(records: &[ReviewRecord], today: NaiveDate) -> RunStats {
    RunStats {
        total_reviews: records.len() as i64,
        total_votes: records.iter().map(|r| r.helpful_votes).sum(),
        last_scan_date: Some(today),
    }
}
