//! Post link detection and shortcode extraction.
//!
//! Regex patterns are compile-time validated through `lazy_regex!`.

// lazy_regex! uses once_cell statics internally
#![allow(clippy::non_std_lazy_statics)]

use lazy_regex::lazy_regex;
use reqwest::Url;
use std::fmt;

/// Shortcode in a post path: `/reel/<code>`, `/reels/<code>` or `/p/<code>`
static RE_SHORTCODE: lazy_regex::Lazy<regex::Regex> =
    lazy_regex!(r"(?i:instagram\.com/(?:reel|reels|p)/)([A-Za-z0-9_\-]+)/?");

/// A full post link embedded anywhere in a message
static RE_POST_LINK: lazy_regex::Lazy<regex::Regex> = lazy_regex!(
    r"(?i)(https?://(?:www\.)?instagram\.com/(?:reel|reels|p)/[A-Za-z0-9_\-]+/?(?:\?[^\s]*)?)"
);

/// Short identifier of a post, made of `[A-Za-z0-9_-]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shortcode(String);

impl Shortcode {
    /// The shortcode as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Shortcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Shortcode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Drops query string and fragment, keeping scheme, host and path.
///
/// Returns `None` when the link is not an absolute URL.
#[must_use]
pub fn normalize_link(link: &str) -> Option<String> {
    let mut url = Url::parse(link.trim()).ok()?;
    url.set_query(None);
    url.set_fragment(None);
    Some(url.into())
}

/// Extracts the post shortcode from a link.
///
/// Tracking parameters such as `?igshid=...` are ignored. Links that cannot be parsed
/// as URLs are matched as-is.
///
/// # Examples
///
/// ```
/// use reel_relay::relay::shortcode::extract_shortcode;
///
/// let code = extract_shortcode("https://www.instagram.com/reel/ABC123/?igshid=xyz");
/// assert_eq!(code.as_ref().map(|c| c.as_str()), Some("ABC123"));
/// assert!(extract_shortcode("https://example.com/watch?v=1").is_none());
/// ```
#[must_use]
pub fn extract_shortcode(link: &str) -> Option<Shortcode> {
    let normalized = normalize_link(link);
    let haystack = normalized.as_deref().unwrap_or(link);

    RE_SHORTCODE
        .captures(haystack)
        .and_then(|caps| caps.get(1))
        .map(|m| Shortcode(m.as_str().to_string()))
}

/// Finds the first post link in free-form message text.
///
/// # Examples
///
/// ```
/// use reel_relay::relay::shortcode::find_post_link;
///
/// let text = "look https://www.instagram.com/p/Cx_1-a/ nice";
/// assert_eq!(find_post_link(text), Some("https://www.instagram.com/p/Cx_1-a/"));
/// ```
#[must_use]
pub fn find_post_link(text: &str) -> Option<&str> {
    RE_POST_LINK.find(text).map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(link: &str) -> Option<String> {
        extract_shortcode(link).map(|c| c.to_string())
    }

    #[test]
    fn test_extract_all_path_shapes() {
        assert_eq!(
            code("https://www.instagram.com/reel/ABC123/"),
            Some("ABC123".to_string())
        );
        assert_eq!(
            code("https://instagram.com/reels/DqR_9-x"),
            Some("DqR_9-x".to_string())
        );
        assert_eq!(
            code("https://www.instagram.com/p/Zz0/"),
            Some("Zz0".to_string())
        );
    }

    #[test]
    fn test_query_and_fragment_are_ignored() {
        let plain = code("https://www.instagram.com/reel/ABC123/");
        assert_eq!(
            code("https://www.instagram.com/reel/ABC123/?igshid=xyz"),
            plain
        );
        assert_eq!(
            code("https://www.instagram.com/reel/ABC123?utm_source=ig_web#comments"),
            plain
        );
    }

    #[test]
    fn test_extraction_is_idempotent_on_normalized_form() {
        for link in [
            "https://www.instagram.com/reel/ABC123/?igshid=1",
            "https://www.instagram.com/reels/x_Y-z/",
            "http://instagram.com/p/q1w2e3?hl=en",
        ] {
            let first = extract_shortcode(link);
            let normalized = normalize_link(link).expect("link should parse");
            assert_eq!(extract_shortcode(&normalized), first);
        }
    }

    #[test]
    fn test_unparseable_link_falls_back_to_raw_match() {
        assert!(normalize_link("instagram.com/reel/RAW1/").is_none());
        assert_eq!(code("instagram.com/reel/RAW1/"), Some("RAW1".to_string()));
    }

    #[test]
    fn test_case_insensitive_host_and_path() {
        assert_eq!(
            code("https://WWW.Instagram.COM/REEL/MiXeD1/"),
            Some("MiXeD1".to_string())
        );
    }

    #[test]
    fn test_no_shortcode() {
        assert_eq!(code("https://www.instagram.com/stories/someone/"), None);
        assert_eq!(code("https://www.instagram.com/reel/"), None);
        assert_eq!(code("not a link at all"), None);
    }

    #[test]
    fn test_find_post_link_in_text() {
        let text = "check this out https://www.instagram.com/reel/ABC123/?igshid=1 cool";
        assert_eq!(
            find_post_link(text),
            Some("https://www.instagram.com/reel/ABC123/?igshid=1")
        );
        assert_eq!(
            find_post_link("HTTPS://INSTAGRAM.COM/P/abc"),
            Some("HTTPS://INSTAGRAM.COM/P/abc")
        );
        assert_eq!(find_post_link("https://youtube.com/watch?v=1"), None);
    }
}
