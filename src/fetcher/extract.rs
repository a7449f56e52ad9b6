//! Plain-text extraction from feed entry markup
//!
//! Feed summaries frequently arrive as HTML fragments. Delivery bodies
//! want plain text, so tags are stripped and image URLs are pulled out
//! separately for attachment handling downstream.

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

// Both literals are known-valid, parse cannot fail
static IMG_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img").expect("valid selector"));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Strip markup from a summary fragment
///
/// Returns the plain text with whitespace runs collapsed, plus any image
/// URLs found in `img` tags. Input that carries no markup is passed
/// through with only whitespace normalization.
pub fn clean_markup(raw: &str) -> (String, Vec<String>) {
    if !raw.contains('<') {
        return (normalize_whitespace(raw), Vec::new());
    }

    let fragment = Html::parse_fragment(raw);

    let images = fragment
        .select(&IMG_SELECTOR)
        .filter_map(|img| img.value().attr("src"))
        .filter(|src| !src.is_empty())
        .map(String::from)
        .collect();

    let text: String = fragment.root_element().text().collect::<Vec<_>>().join(" ");

    (normalize_whitespace(&text), images)
}

fn normalize_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text.trim(), " ").into_owned()
}
