//! Localized source display names
//!
//! Maps well-known publisher hosts to display names. A `zh` target gets
//! the Chinese name, any other target the English one. Hosts are matched
//! exactly after stripping a leading `www.`.

use url::Url;

/// Display label when neither the host table nor the feed knows the source
pub const UNKNOWN_SOURCE: &str = "Unknown source";

// (host, chinese name, english name)
const DOMAIN_SOURCES: &[(&str, &str, &str)] = &[
    ("cnn.com", "美国有线电视新闻网", "CNN"),
    ("bbc.com", "英国广播公司", "BBC"),
    ("wsj.com", "华尔街日报", "The Wall Street Journal"),
    ("foreignaffairs.com", "外交事务", "Foreign Affairs"),
    ("ft.com", "金融时报", "Financial Times"),
    ("reuters.com", "路透社", "Reuters"),
    ("theatlantic.com", "大西洋月刊", "The Atlantic"),
    ("economist.com", "经济学人", "The Economist"),
    ("nytimes.com", "纽约时报", "The New York Times"),
    ("bloomberg.com", "彭博社", "Bloomberg"),
    ("theconversation.com", "对话", "The Conversation"),
    ("nautil.us", "鹦鹉螺", "Nautilus"),
    ("longreads.com", "长读", "Longreads"),
    ("nature.com", "自然", "Nature"),
    ("science.org", "科学", "Science"),
    ("eff.org", "电子前哨基金会", "Electronic Frontier Foundation"),
    ("ieee.org", "电气电子工程师学会", "IEEE"),
    ("brookings.edu", "布鲁金斯学会", "Brookings Institution"),
];

/// Resolve the display name for an entry
///
/// Falls back to the feed-declared label, then [`UNKNOWN_SOURCE`], when
/// the link host is not in the table.
pub fn source_label(link: &str, feed_label: Option<&str>, language: &str) -> String {
    if let Some(host) = Url::parse(link).ok().and_then(|u| u.host_str().map(String::from)) {
        let host = host.strip_prefix("www.").unwrap_or(&host);
        for (domain, zh, en) in DOMAIN_SOURCES {
            if host == *domain {
                return if language == "zh" { (*zh).to_string() } else { (*en).to_string() };
            }
        }
    }

    feed_label
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .unwrap_or_else(|| UNKNOWN_SOURCE.to_string())
}
