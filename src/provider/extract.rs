//! Player iframe extraction.
//!
//! Embed pages differ in where they put the player, so selectors are tried
//! in a fixed priority order: ID-based first, then class-based, then
//! container-scoped, and finally any `iframe` in the document. The first
//! frame whose source is an absolute http(s) URL wins.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::candidate::absolute_http_url;

/// Selector ladder, highest priority first.
const SELECTOR_LADDER: &[&str] = &[
    // ID-based
    "iframe#player",
    "iframe#iframe",
    "#player iframe",
    "#player-embed iframe",
    // Class-based
    "iframe.player",
    "iframe.embed",
    ".player iframe",
    ".embed-responsive iframe",
    // Container-scoped
    ".video iframe",
    ".video-player iframe",
    "#video iframe",
    ".tab-content iframe",
    // Generic
    "iframe",
];

/// Attributes checked for the frame source; lazy loaders use `data-src`.
const SOURCE_ATTRS: &[&str] = &["src", "data-src", "data-lazy-src"];

static SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    SELECTOR_LADDER
        .iter()
        .filter_map(|s| match Selector::parse(s) {
            Ok(sel) => Some(sel),
            Err(e) => {
                tracing::error!(selector = s, error = ?e, "invalid built-in selector");
                None
            }
        })
        .collect()
});

/// Find the first embedded player URL in `html`.
pub fn first_embed_url(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    SELECTORS
        .iter()
        .find_map(|selector| document.select(selector).find_map(frame_source))
}

fn frame_source(element: ElementRef<'_>) -> Option<String> {
    SOURCE_ATTRS
        .iter()
        .filter_map(|attr| element.value().attr(attr))
        .find_map(absolute_http_url)
        .map(String::from)
}
