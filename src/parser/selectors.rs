//! CSS selectors used by the page parser

use scraper::Selector;
use std::sync::LazyLock;

// Selectors are string literals, so a parse failure is a programming error
macro_rules! parse_selector {
    ($s:expr) => {
        Selector::parse($s).expect(concat!("Invalid CSS selector: ", $s))
    };
}

/// `<title>` anywhere in the document
pub static TITLE: LazyLock<Selector> = LazyLock::new(|| parse_selector!("title"));

/// Every anchor carrying an `href`
pub static LINKS: LazyLock<Selector> = LazyLock::new(|| parse_selector!("a[href]"));

/// `<base href>`, which overrides the document URL for link resolution
pub static BASE: LazyLock<Selector> = LazyLock::new(|| parse_selector!("base[href]"));
