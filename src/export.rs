//! CSV export of the last scan's record set.
//!
//! Produces a UTF-8, BOM-prefixed, semicolon-delimited CSV — the dialect
//! spreadsheet applications import without a wizard. Every field is
//! double-quoted with internal quotes doubled. Output goes to `--output`
//! or stdout; with no prior scan stored this is a notice and a no-op.

use anyhow::Result;
use std::path::Path;

use crate::config::Config;
use crate::db;
use crate::models::ReviewRecord;
use crate::store;

const HEADERS: [&str; 11] = [
    "seq",
    "reviewId",
    "asin",
    "productTitle",
    "productImage",
    "rating",
    "helpfulVotes",
    "reviewText",
    "reviewImage",
    "reviewLink",
    "lastChanged",
];

pub async fn run_export(config: &Config, output: Option<&Path>) -> Result<()> {
    let pool = db::connect(config).await?;
    let records = store::load_reviews(&pool).await?;
    pool.close().await;

    if records.is_empty() {
        eprintln!("no reviews stored; run `revscan scan` first");
        return Ok(());
    }

    let csv = to_csv(&records);

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &csv)?;
            eprintln!("Exported {} reviews to {}", records.len(), path.display());
        }
        None => {
            print!("{}", csv);
        }
    }

    Ok(())
}

/// Serialize records to the export dialect. Deterministic for a given
/// record set.
pub fn to_csv(records: &[ReviewRecord]) -> String {
    let mut out = String::from("\u{feff}");
    out.push_str(&HEADERS.join(";"));
    out.push('\n');

    for r in records {
        let fields = [
            r.seq.to_string(),
            r.review_id.clone(),
            r.asin.clone().unwrap_or_default(),
            r.product_title.clone(),
            r.product_image.clone().unwrap_or_default(),
            r.rating.to_string(),
            r.helpful_votes.to_string(),
            r.review_text.clone().unwrap_or_default(),
            r.review_image.clone().unwrap_or_default(),
            r.review_link.clone().unwrap_or_default(),
            r.last_changed.map(|d| d.to_string()).unwrap_or_default(),
        ];
        let row: Vec<String> = fields.iter().map(|f| quote(f)).collect();
        out.push_str(&row.join(";"));
        out.push('\n');
    }

    out
}

/// Double-quote a field, doubling internal quotes.
fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}
