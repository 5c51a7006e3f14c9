//! Vote-delta computation against the prior snapshot.
//!
//! Compares a freshly fetched record set with the persisted snapshot and
//! produces one [`ChangedEntry`] per review whose helpful-vote count
//! moved. Unchanged records get their historical change date copied
//! forward so it survives across runs; first-time records are not treated
//! as changed and get no date. Pure — `today` is injected by the caller,
//! so identical inputs always produce identical outputs.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::models::{ChangedEntry, ReviewRecord, SnapshotEntry};

/// Diff `current` against `snapshot`, stamping `last_changed` in place.
/// Returned entries preserve the input record order.
pub fn diff_against_snapshot(
    current: &mut [ReviewRecord],
    snapshot: &[SnapshotEntry],
    today: NaiveDate,
) -> Vec<ChangedEntry> {
    let stored: HashMap<&str, &SnapshotEntry> =
        snapshot.iter().map(|e| (e.id.as_str(), e)).collect();

    let mut changed = Vec::new();

    for record in current.iter_mut() {
        let entry = match stored.get(record.review_id.as_str()) {
            Some(entry) => entry,
            None => continue,
        };

        if entry.votes != record.helpful_votes {
            record.last_changed = Some(today);
            changed.push(ChangedEntry {
                record: record.clone(),
                old_votes: entry.votes,
                new_votes: record.helpful_votes,
            });
        } else {
            record.last_changed = entry.last_changed;
        }
    }

    changed
}
