//! # revscan
//!
//! An incremental scanner for your own product review history. revscan
//! pages through the profile's review endpoint with the server-issued
//! continuation token, parses the returned HTML fragments into typed
//! records, diffs them against the snapshot persisted by the previous
//! run to spot helpful-vote changes, and renders three derived views:
//! newly changed, recently changed, and top-ranked. The full record set
//! can be exported as semicolon-delimited CSV.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────┐   ┌────────┐   ┌────────┐   ┌────────┐   ┌─────────┐
//! │ fetch     │──▶│ parse  │──▶│ diff   │──▶│ views  │──▶│ render/ │
//! │ (paginate)│   │ (HTML) │   │ (votes)│   │ (sort) │   │ export  │
//! └──────────┘   └────────┘   └───┬────┘   └────────┘   └─────────┘
//!                                 │ snapshot merge
//!                             ┌───▼────┐
//!                             │ SQLite │
//!                             └────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`parse`] | HTML fragment → review records + continuation token |
//! | [`fetch`] | Sequential, rate-limited pagination driver |
//! | [`diff`] | Vote-delta computation against the prior snapshot |
//! | [`views`] | Derived view construction (changed / recent / top) |
//! | [`store`] | Snapshot, stats, and record persistence |
//! | [`scan`] | Pipeline orchestration and rendering |
//! | [`export`] | BOM-prefixed semicolon CSV export |
//! | [`stats`] | Stored-summary display |
//! | [`db`] | Database connection and schema |
//! | [`progress`] | Per-page scan progress reporting |

pub mod config;
pub mod db;
pub mod diff;
pub mod export;
pub mod fetch;
pub mod models;
pub mod parse;
pub mod progress;
pub mod scan;
pub mod stats;
pub mod store;
pub mod views;
