//! Pagination driver.
//!
//! Repeatedly requests pages through an injected [`PageFetcher`] until the
//! server stops issuing continuation tokens, the page cap is reached, or
//! the scan is cancelled. Strictly sequential — the upstream rate-limits,
//! and a concurrent burst risks a temporary block — with a fixed pause
//! between successive requests rather than adaptive backoff.
//!
//! The accumulating record set is an explicit owned `Vec` threaded through
//! the loop and returned to the caller; nothing is kept in ambient state.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;

use crate::config::SourceConfig;
use crate::models::ReviewRecord;
use crate::parse;
use crate::progress::{ScanProgressEvent, ScanProgressReporter};

/// Fatal page-fetch failure. No retries anywhere: the only mitigation
/// against upstream throttling is the fixed inter-request delay.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("upstream returned HTTP status {status}")]
    Status { status: u16 },
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Capability to fetch one page of review HTML. The driver depends on
/// this seam so tests can substitute a scripted fetcher.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Issue one GET for a page of `page_size` reviews. `token` is `None`
    /// for the first page. Returns the raw HTML fragment.
    async fn fetch_page(&self, page_size: u32, token: Option<&str>) -> Result<String, FetchError>;
}

/// Real fetcher over HTTP.
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpFetcher {
    pub fn new(source: &SourceConfig) -> Result<Self> {
        let base_url = Url::parse(&source.base_url)
            .with_context(|| format!("invalid source.base_url: {}", source.base_url))?;
        let client = reqwest::Client::builder()
            .timeout(source.timeout())
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_page(&self, page_size: u32, token: Option<&str>) -> Result<String, FetchError> {
        let mut url = self.base_url.clone();
        {
            // query_pairs_mut URL-encodes the opaque token for us.
            let mut qp = url.query_pairs_mut();
            qp.append_pair("pageSize", &page_size.to_string());
            if let Some(token) = token {
                qp.append_pair("pageToken", token);
            }
        }

        let response = self
            .client
            .get(url)
            .header("Accept", "text/html")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}

/// Driver parameters, taken from `[source]` config.
#[derive(Debug, Clone)]
pub struct DriverOptions {
    pub page_size: u32,
    /// Fixed pause between successive page requests.
    pub request_delay: Duration,
    /// Hard cap on pages per scan; 0 = unlimited.
    pub max_pages: u32,
}

impl DriverOptions {
    pub fn from_source(source: &SourceConfig) -> Self {
        Self {
            page_size: source.page_size,
            request_delay: source.request_delay(),
            max_pages: source.max_pages,
        }
    }
}

/// Fetch every page of the review history and return the full record set.
///
/// On a failed page the records accumulated so far are discarded — a
/// partial set would understate the run totals and poison the next diff —
/// and the error surfaces with a notice of how much was dropped. The
/// cancellation flag is checked before each request; a cancelled scan
/// likewise discards its accumulation.
///
/// Review ids are unique in the returned set: a collision overwrites the
/// earlier record in place (last parsed wins).
pub async fn fetch_all(
    fetcher: &dyn PageFetcher,
    opts: &DriverOptions,
    progress: &dyn ScanProgressReporter,
    cancel: &AtomicBool,
) -> Result<Vec<ReviewRecord>> {
    let mut records: Vec<ReviewRecord> = Vec::new();
    let mut by_id: HashMap<String, usize> = HashMap::new();
    let mut token: Option<String> = None;
    let mut next_seq: i64 = 1;
    let mut page: u32 = 0;

    loop {
        if cancel.load(Ordering::Relaxed) {
            bail!(
                "scan cancelled after {} page(s); {} review(s) discarded",
                page,
                records.len()
            );
        }

        page += 1;
        progress.report(ScanProgressEvent::Fetching { page });

        let body = match fetcher.fetch_page(opts.page_size, token.as_deref()).await {
            Ok(body) => body,
            Err(e) => {
                eprintln!(
                    "scan failed on page {}; discarding {} review(s) fetched so far",
                    page,
                    records.len()
                );
                return Err(e).with_context(|| format!("failed to fetch page {}", page));
            }
        };

        let parsed = parse::parse_page(&body, next_seq);
        for warning in &parsed.warnings {
            eprintln!("warning: page {}: {}", page, warning);
        }

        for record in parsed.records {
            next_seq = record.seq + 1;
            match by_id.get(&record.review_id) {
                Some(&idx) => records[idx] = record,
                None => {
                    by_id.insert(record.review_id.clone(), records.len());
                    records.push(record);
                }
            }
        }

        progress.report(ScanProgressEvent::Fetched {
            page,
            records_total: records.len(),
        });

        token = parsed.next_token;
        if token.is_none() {
            break;
        }
        if opts.max_pages > 0 && page >= opts.max_pages {
            break;
        }

        tokio::time::sleep(opts.request_delay).await;
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    fn card(id: &str, votes: i64) -> String {
        format!(
            r#"<div class="review-card-container">
               <a class="a-link-normal a-text-normal" href="/gp/customer-reviews/{}"></a>
               <span class="review-title a-text-bold">Product {}</span>
               <span class="review-reaction-count">{}</span>
               </div>"#,
            id, id, votes
        )
    }

    fn html_page(token: Option<&str>, cards: &[String]) -> String {
        let token_input = token
            .map(|t| format!(r#"<input name="pageToken" value="{}">"#, t))
            .unwrap_or_default();
        format!(
            r#"{}<div id="contentAjax">{}</div>"#,
            token_input,
            cards.concat()
        )
    }

    /// Scripted fetcher: returns canned pages in order, or an error.
    struct MockFetcher {
        pages: Mutex<Vec<Result<String, FetchError>>>,
        calls: AtomicUsize,
    }

    impl MockFetcher {
        fn new(pages: Vec<Result<String, FetchError>>) -> Self {
            Self {
                pages: Mutex::new(pages),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PageFetcher for MockFetcher {
        async fn fetch_page(
            &self,
            _page_size: u32,
            _token: Option<&str>,
        ) -> Result<String, FetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let mut pages = self.pages.lock().unwrap();
            if n < pages.len() {
                std::mem::replace(&mut pages[n], Ok(String::new()))
            } else {
                panic!("fetch_page called past the end of the script");
            }
        }
    }

    fn opts() -> DriverOptions {
        DriverOptions {
            page_size: 100,
            request_delay: Duration::ZERO,
            max_pages: 0,
        }
    }

    #[tokio::test]
    async fn test_terminates_when_token_absent() {
        let fetcher = MockFetcher::new(vec![
            Ok(html_page(Some("t2"), &[card("R1", 1)])),
            Ok(html_page(Some("t3"), &[card("R2", 2)])),
            Ok(html_page(None, &[card("R3", 3)])),
        ]);
        let cancel = AtomicBool::new(false);

        let records = fetch_all(&fetcher, &opts(), &NoProgress, &cancel)
            .await
            .unwrap();

        assert_eq!(fetcher.call_count(), 3);
        assert_eq!(records.len(), 3);
        let seqs: Vec<i64> = records.iter().map(|r| r.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_page_cap_stops_the_loop() {
        let fetcher = MockFetcher::new(vec![Ok(html_page(Some("t2"), &[card("R1", 1)]))]);
        let cancel = AtomicBool::new(false);
        let opts = DriverOptions {
            max_pages: 1,
            ..opts()
        };

        let records = fetch_all(&fetcher, &opts, &NoProgress, &cancel)
            .await
            .unwrap();

        assert_eq!(fetcher.call_count(), 1);
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_page_discards_accumulation() {
        let fetcher = MockFetcher::new(vec![
            Ok(html_page(Some("t2"), &[card("R1", 1)])),
            Err(FetchError::Status { status: 503 }),
        ]);
        let cancel = AtomicBool::new(false);

        let err = fetch_all(&fetcher, &opts(), &NoProgress, &cancel)
            .await
            .unwrap_err();

        assert_eq!(fetcher.call_count(), 2);
        assert!(err.to_string().contains("page 2"));
        let fetch_err = err.downcast_ref::<FetchError>().unwrap();
        assert!(matches!(fetch_err, FetchError::Status { status: 503 }));
    }

    #[tokio::test]
    async fn test_cancellation_stops_before_first_request() {
        let fetcher = MockFetcher::new(vec![]);
        let cancel = AtomicBool::new(true);

        let err = fetch_all(&fetcher, &opts(), &NoProgress, &cancel)
            .await
            .unwrap_err();

        assert_eq!(fetcher.call_count(), 0);
        assert!(err.to_string().contains("cancelled"));
    }

    #[tokio::test]
    async fn test_duplicate_review_id_last_parsed_wins() {
        let fetcher = MockFetcher::new(vec![
            Ok(html_page(Some("t2"), &[card("R1", 1), card("R2", 5)])),
            Ok(html_page(None, &[card("R1", 9)])),
        ]);
        let cancel = AtomicBool::new(false);

        let records = fetch_all(&fetcher, &opts(), &NoProgress, &cancel)
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        let r1 = records.iter().find(|r| r.review_id == "R1").unwrap();
        assert_eq!(r1.helpful_votes, 9);
    }
}
