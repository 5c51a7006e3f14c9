//! Core data models for the scan pipeline.
//!
//! These types represent the review records, persisted snapshot entries,
//! and derived views that flow through the fetch → diff → render pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How a record's identity was obtained.
///
/// Ids parsed out of the structured menu blob are server-confirmed; ids
/// recovered from the review permalink (or synthesized from the run-scoped
/// sequence when even that is missing) are degraded-confidence and kept
/// distinguishable in case downstream logic ever needs to treat them
/// differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdProvenance {
    /// Extracted from the embedded JSON blob's edit/delete URLs.
    Source,
    /// Derived from the review permalink path or the parse sequence.
    Link,
}

impl IdProvenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdProvenance::Source => "source",
            IdProvenance::Link => "link",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "source" => IdProvenance::Source,
            _ => IdProvenance::Link,
        }
    }
}

/// One review as parsed from a page fragment.
#[derive(Debug, Clone)]
pub struct ReviewRecord {
    /// Unique within one run; last parsed wins on collision.
    pub review_id: String,
    pub id_provenance: IdProvenance,
    /// Run-scoped parse order. Display addressing only, never identity.
    pub seq: i64,
    pub asin: Option<String>,
    pub product_title: String,
    pub product_image: Option<String>,
    /// 1–5 stars; 0 when the star class could not be parsed.
    pub rating: u8,
    pub helpful_votes: i64,
    pub review_text: Option<String>,
    pub review_image: Option<String>,
    /// Permalink with query parameters and fragment removed.
    pub review_link: Option<String>,
    /// Day the vote count was last observed to change.
    pub last_changed: Option<NaiveDate>,
}

/// Minimal per-review projection persisted between runs.
///
/// Entries are never evicted: a review that temporarily disappears from
/// pagination keeps its stored vote history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub id: String,
    pub asin: Option<String>,
    pub votes: i64,
    #[serde(default)]
    pub last_changed: Option<NaiveDate>,
}

/// Run summary, overwritten on every successful scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    pub total_reviews: i64,
    pub total_votes: i64,
    pub last_scan_date: Option<NaiveDate>,
}

/// A review whose helpful-vote count differs from the snapshot.
#[derive(Debug, Clone)]
pub struct ChangedEntry {
    pub record: ReviewRecord,
    pub old_votes: i64,
    pub new_votes: i64,
}

impl ChangedEntry {
    /// Signed vote delta since the last scan.
    pub fn delta(&self) -> i64 {
        self.new_votes - self.old_votes
    }
}

/// The three derived collections rendered after a scan.
#[derive(Debug, Clone)]
pub struct ReviewViews {
    /// Vote-count changes, in scan order.
    pub changed: Vec<ChangedEntry>,
    /// Up to 10 records with the most recent change dates.
    pub recent: Vec<ReviewRecord>,
    /// Records with at least one vote, most helpful first.
    pub top_ranked: Vec<ReviewRecord>,
}
