//! Review page parser.
//!
//! Turns one HTML page fragment into zero or more [`ReviewRecord`]s plus
//! the continuation token for the next page. Pure: the only output is the
//! returned [`ParsedPage`]; per-field parse failures are collected as
//! warnings for the caller to log, never raised as errors. A malformed
//! field degrades that one field (null or default) — the record is still
//! emitted.

use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use crate::models::{IdProvenance, ReviewRecord};

/// Result of parsing one page fragment.
#[derive(Debug)]
pub struct ParsedPage {
    /// Server-issued cursor for the next page. `None` (missing control or
    /// empty value) means pagination is exhausted.
    pub next_token: Option<String>,
    pub records: Vec<ReviewRecord>,
    /// Recovered per-field failures, for stderr logging by the caller.
    pub warnings: Vec<String>,
}

struct Selectors {
    token_input: Selector,
    content: Selector,
    card: Selector,
    menu_span: Selector,
    review_link: Selector,
    title: Selector,
    description: Selector,
    star_icon: Selector,
    reaction_count: Selector,
    product_thumb: Selector,
    review_image: Selector,
}

impl Selectors {
    fn new() -> Self {
        Self {
            token_input: Selector::parse(r#"input[name="pageToken"]"#).expect("token selector"),
            content: Selector::parse("#contentAjax").expect("content selector"),
            card: Selector::parse(".review-card-container").expect("card selector"),
            menu_span: Selector::parse("span[data-a-review-menu-ingress-display]")
                .expect("menu selector"),
            review_link: Selector::parse("a.a-link-normal.a-text-normal").expect("link selector"),
            title: Selector::parse("span.review-title.a-text-bold").expect("title selector"),
            description: Selector::parse("span.review-description").expect("description selector"),
            star_icon: Selector::parse("i.a-icon-star").expect("star selector"),
            reaction_count: Selector::parse("span.review-reaction-count")
                .expect("reaction selector"),
            product_thumb: Selector::parse("img.review-product-thumbnail")
                .expect("thumbnail selector"),
            review_image: Selector::parse("img.review-image").expect("review image selector"),
        }
    }
}

/// Parse one page fragment. `seq_start` is the next run-scoped sequence
/// number; records are numbered contiguously from it in document order.
pub fn parse_page(html: &str, seq_start: i64) -> ParsedPage {
    let sel = Selectors::new();
    let doc = Html::parse_fragment(html);

    let next_token = doc
        .select(&sel.token_input)
        .next()
        .and_then(|input| input.value().attr("value"))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    let mut records = Vec::new();
    let mut warnings = Vec::new();

    let content = match doc.select(&sel.content).next() {
        Some(el) => el,
        None => {
            warnings.push("no #contentAjax element found in the response".to_string());
            return ParsedPage {
                next_token,
                records,
                warnings,
            };
        }
    };

    for (i, card) in content.select(&sel.card).enumerate() {
        let seq = seq_start + i as i64;
        records.push(parse_card(&card, &sel, seq, &mut warnings));
    }

    ParsedPage {
        next_token,
        records,
        warnings,
    }
}

fn parse_card(
    card: &ElementRef,
    sel: &Selectors,
    seq: i64,
    warnings: &mut Vec<String>,
) -> ReviewRecord {
    // Identity, preferably from the menu blob's edit/delete URLs.
    let mut asin = None;
    let mut review_id = None;

    if let Some(data_attr) = card
        .select(&sel.menu_span)
        .next()
        .and_then(|span| span.value().attr("data-a-review-menu-ingress-display"))
    {
        match serde_json::from_str::<serde_json::Value>(data_attr) {
            Ok(blob) => {
                for key in ["editUrl", "deleteUrl"] {
                    if asin.is_some() && review_id.is_some() {
                        break;
                    }
                    if let Some(url) = blob.get(key).and_then(|v| v.as_str()) {
                        asin = asin.or_else(|| query_param(url, "asin"));
                        review_id = review_id.or_else(|| query_param(url, "reviewID"));
                    }
                }
            }
            Err(e) => warnings.push(format!("card {}: malformed review menu JSON: {}", seq, e)),
        }
    }

    let review_link = card
        .select(&sel.review_link)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(clean_url);

    // Fall back to the permalink's last path segment for identity.
    let mut id_provenance = IdProvenance::Source;
    if review_id.is_none() {
        id_provenance = IdProvenance::Link;
        review_id = review_link.as_deref().and_then(last_path_segment);
    }
    let review_id = review_id.unwrap_or_else(|| {
        warnings.push(format!("card {}: no review id found, synthesizing one", seq));
        format!("card-{}", seq)
    });

    let product_title = text_of(card, &sel.title).unwrap_or_default();
    let review_text = text_of(card, &sel.description);

    // Star rating from the `a-star-N` class token; unparseable → 0 stars.
    let rating = card
        .select(&sel.star_icon)
        .next()
        .and_then(|icon| {
            icon.value()
                .classes()
                .find_map(|cls| cls.strip_prefix("a-star-").map(str::to_string))
        })
        .and_then(|n| n.parse::<u8>().ok())
        .unwrap_or(0);

    let helpful_votes = match text_of(card, &sel.reaction_count) {
        Some(text) => match text.parse::<i64>() {
            Ok(n) => n,
            Err(_) => {
                warnings.push(format!(
                    "card {}: unparseable helpful-vote count {:?}, defaulting to 0",
                    seq, text
                ));
                0
            }
        },
        None => 0,
    };

    let product_image = attr_of(card, &sel.product_thumb, "src");
    let review_image = attr_of(card, &sel.review_image, "src");

    ReviewRecord {
        review_id,
        id_provenance,
        seq,
        asin,
        product_title,
        product_image,
        rating,
        helpful_votes,
        review_text,
        review_image,
        review_link,
        last_changed: None,
    }
}

fn text_of(card: &ElementRef, sel: &Selector) -> Option<String> {
    card.select(sel).next().map(|el| {
        el.text().collect::<String>().trim().to_string()
    })
}

fn attr_of(card: &ElementRef, sel: &Selector, attr: &str) -> Option<String> {
    card.select(sel)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(str::to_string)
}

/// Extract a query parameter from an absolute or relative URL.
fn query_param(url: &str, key: &str) -> Option<String> {
    let parsed = match Url::parse(url) {
        Ok(u) => u,
        // Relative edit/delete URLs still carry the parameters we need.
        Err(_) => Url::parse("https://relative.invalid")
            .ok()?
            .join(url)
            .ok()?,
    };
    parsed
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// Strip query parameters and fragment from a permalink.
fn clean_url(href: &str) -> String {
    match Url::parse(href) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        }
        // Relative href: a textual strip preserves the path unchanged.
        Err(_) => href
            .split(['?', '#'])
            .next()
            .unwrap_or(href)
            .to_string(),
    }
}

fn last_path_segment(link: &str) -> Option<String> {
    let path = match Url::parse(link) {
        Ok(url) => url.path().to_string(),
        Err(_) => link.to_string(),
    };
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|seg| !seg.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(token: &str, cards: &str) -> String {
        let token_input = if token.is_empty() {
            String::new()
        } else {
            format!(r#"<input type="hidden" name="pageToken" value="{}">"#, token)
        };
        format!(
            r#"<div>{}<div id="contentAjax">{}</div></div>"#,
            token_input, cards
        )
    }

    fn full_card() -> &'static str {
        // Entity-escaped JSON blob, as the server emits it.
        r#"
        <div class="review-card-container">
          <span data-a-review-menu-ingress-display="{&quot;editUrl&quot;:&quot;https://reviews.example.com/review/edit-review?asin=B00TEST01&amp;reviewID=R1ABCDEF&quot;}"></span>
          <a class="a-link-normal a-text-normal" href="https://reviews.example.com/gp/customer-reviews/R1ABCDEF?ref=cm_cr"></a>
          <span class="review-title a-text-bold">Great widget</span>
          <span class="review-description">Does what it says on the tin.</span>
          <i class="a-icon a-icon-star a-star-4"></i>
          <span class="review-reaction-count">17</span>
          <img class="review-product-thumbnail" src="https://img.example.com/widget.jpg">
          <img class="review-image" src="https://img.example.com/mine.jpg">
        </div>
        "#
    }

    #[test]
    fn test_full_card_extracts_all_fields() {
        let html = page("tok-2", full_card());
        let parsed = parse_page(&html, 1);

        assert_eq!(parsed.next_token.as_deref(), Some("tok-2"));
        assert_eq!(parsed.records.len(), 1);

        let r = &parsed.records[0];
        assert_eq!(r.review_id, "R1ABCDEF");
        assert_eq!(r.id_provenance, IdProvenance::Source);
        assert_eq!(r.asin.as_deref(), Some("B00TEST01"));
        assert_eq!(r.product_title, "Great widget");
        assert_eq!(r.rating, 4);
        assert_eq!(r.helpful_votes, 17);
        assert_eq!(
            r.review_text.as_deref(),
            Some("Does what it says on the tin.")
        );
        assert_eq!(
            r.review_link.as_deref(),
            Some("https://reviews.example.com/gp/customer-reviews/R1ABCDEF")
        );
        assert_eq!(
            r.product_image.as_deref(),
            Some("https://img.example.com/widget.jpg")
        );
        assert_eq!(
            r.review_image.as_deref(),
            Some("https://img.example.com/mine.jpg")
        );
        assert_eq!(r.seq, 1);
    }

    #[test]
    fn test_every_wellformed_card_yields_a_record_with_an_id() {
        let cards: String = (0..5)
            .map(|i| {
                format!(
                    r#"<div class="review-card-container">
                       <a class="a-link-normal a-text-normal" href="/gp/customer-reviews/R{}X?ref=x"></a>
                       <span class="review-title a-text-bold">Item {}</span>
                       </div>"#,
                    i, i
                )
            })
            .collect();
        let parsed = parse_page(&page("", &cards), 1);

        assert_eq!(parsed.records.len(), 5);
        for r in &parsed.records {
            assert!(!r.review_id.is_empty());
        }
        assert!(parsed.next_token.is_none());
    }

    #[test]
    fn test_malformed_menu_blob_falls_back_to_link_identity() {
        let card = r#"
        <div class="review-card-container">
          <span data-a-review-menu-ingress-display="{not json"></span>
          <a class="a-link-normal a-text-normal" href="https://reviews.example.com/gp/customer-reviews/R9FALLBACK?x=1#frag"></a>
          <span class="review-title a-text-bold">Still emitted</span>
        </div>
        "#;
        let parsed = parse_page(&page("next", card), 1);

        assert_eq!(parsed.records.len(), 1);
        let r = &parsed.records[0];
        assert_eq!(r.review_id, "R9FALLBACK");
        assert_eq!(r.id_provenance, IdProvenance::Link);
        assert!(r.asin.is_none());
        assert!(!parsed.warnings.is_empty());
    }

    #[test]
    fn test_missing_everything_still_emits_with_synthesized_id() {
        let card = r#"<div class="review-card-container"><span class="review-title a-text-bold">Bare</span></div>"#;
        let parsed = parse_page(&page("", card), 7);

        assert_eq!(parsed.records.len(), 1);
        let r = &parsed.records[0];
        assert_eq!(r.review_id, "card-7");
        assert_eq!(r.id_provenance, IdProvenance::Link);
        assert_eq!(r.rating, 0);
        assert_eq!(r.helpful_votes, 0);
        assert!(r.review_text.is_none());
        assert!(r.product_image.is_none());
    }

    #[test]
    fn test_unparseable_votes_default_to_zero_with_warning() {
        let card = r#"
        <div class="review-card-container">
          <a class="a-link-normal a-text-normal" href="/gp/customer-reviews/R1"></a>
          <span class="review-reaction-count">lots</span>
        </div>
        "#;
        let parsed = parse_page(&page("", card), 1);
        assert_eq!(parsed.records[0].helpful_votes, 0);
        assert!(parsed
            .warnings
            .iter()
            .any(|w| w.contains("helpful-vote count")));
    }

    #[test]
    fn test_empty_token_value_is_terminal() {
        let html = r#"<input name="pageToken" value="">
               <div id="contentAjax"></div>"#;
        let parsed = parse_page(html, 1);
        assert!(parsed.next_token.is_none());
    }

    #[test]
    fn test_missing_content_container_yields_no_records_but_keeps_token() {
        let html = r#"<input name="pageToken" value="tok-9"><div>no content here</div>"#;
        let parsed = parse_page(html, 1);
        assert!(parsed.records.is_empty());
        assert_eq!(parsed.next_token.as_deref(), Some("tok-9"));
        assert!(!parsed.warnings.is_empty());
    }

    #[test]
    fn test_sequence_numbers_are_contiguous_from_start() {
        let cards = format!("{}{}", full_card(), full_card());
        let parsed = parse_page(&page("", &cards), 40);
        let seqs: Vec<i64> = parsed.records.iter().map(|r| r.seq).collect();
        assert_eq!(seqs, vec![40, 41]);
    }
}
