//! HTML parsing and link extraction
//!
//! This module turns a fetched body into the two things a crawl needs: the
//! page title for the result record, and the raw link targets that feed the
//! frontier.

pub mod html;
pub mod selectors;

pub use html::parse_page;

use serde::{Deserialize, Serialize};

use crate::crawler::url::frontier_candidates;

/// Output of parsing one page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedPage {
    /// URL relative links resolve against
    pub base_url: String,

    /// Whitespace-normalized `<title>` text
    pub title: Option<String>,

    /// Raw `href` values in document order
    pub links: Vec<String>,
}

impl ParsedPage {
    /// Number of anchors with an `href`
    pub fn link_count(&self) -> u32 {
        u32::try_from(self.links.len()).unwrap_or(u32::MAX)
    }

    /// Distinct absolute http(s) URLs linked from this page
    pub fn candidates(&self) -> Vec<String> {
        frontier_candidates(&self.base_url, &self.links)
    }
}
