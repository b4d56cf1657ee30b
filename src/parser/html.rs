//! HTML page parser
//!
//! Extracts the document title and every raw link target. Link resolution
//! and filtering happen later, in the frontier expansion step.

use scraper::Html;
use url::Url;

use crate::parser::selectors::{BASE, LINKS, TITLE};
use crate::parser::ParsedPage;
use crate::utils::normalize_whitespace;

/// Parse an HTML body fetched from `base_url`
///
/// Never fails: malformed markup is parsed leniently and a page without a
/// title or links yields `None` and an empty list. A `<base href>` in the
/// document replaces `base_url` when it resolves to an absolute URL.
pub fn parse_page(body: &str, base_url: &str) -> ParsedPage {
    let document = Html::parse_document(body);

    let title = document
        .select(&TITLE)
        .next()
        .map(|el| normalize_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty());

    let links: Vec<String> = document
        .select(&LINKS)
        .filter_map(|el| el.value().attr("href"))
        .map(|href| href.trim().to_string())
        .collect();

    ParsedPage {
        base_url: effective_base(&document, base_url),
        title,
        links,
    }
}

fn effective_base(document: &Html, base_url: &str) -> String {
    let declared = document
        .select(&BASE)
        .next()
        .and_then(|el| el.value().attr("href"));

    match (declared, Url::parse(base_url)) {
        (Some(href), Ok(base)) => base
            .join(href.trim())
            .map(|u| u.to_string())
            .unwrap_or_else(|_| base_url.to_string()),
        _ => base_url.to_string(),
    }
}
