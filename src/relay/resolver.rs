//! Media URL discovery in lookup responses.
//!
//! Lookup responses have no fixed schema. The resolver walks the JSON tree and collects
//! every URL-looking string found under a known media field, at any depth.

use serde_json::{Map, Value};
use std::collections::HashSet;

/// Single-URL fields, in priority order. The first truthy one wins per object.
const DIRECT_URL_FIELDS: &[&str] = &["video_url", "media_url", "download_url", "url", "src"];

/// Field holding a list of video variants, each with its own `url`
const VIDEO_VERSIONS_FIELD: &str = "video_versions";

/// Field holding the URL inside a variant
const VERSION_URL_FIELD: &str = "url";

/// Substring that marks a candidate as directly playable
const PREFERRED_EXTENSION: &str = ".mp4";

fn is_url_like(value: &str) -> bool {
    value.starts_with("http")
}

/// Truthiness of a JSON value: null, false, zero and empty containers are falsy
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Depth-first collector over the Map / Sequence / Scalar cases of a JSON tree
#[derive(Default)]
struct CandidateCollector {
    found: Vec<String>,
}

impl CandidateCollector {
    fn visit(&mut self, node: &Value) {
        match node {
            Value::Object(map) => self.visit_map(map),
            Value::Array(items) => items.iter().for_each(|item| self.visit(item)),
            // Strings are leaves, never walked character by character
            Value::String(_) | Value::Number(_) | Value::Bool(_) | Value::Null => {}
        }
    }

    fn visit_map(&mut self, map: &Map<String, Value>) {
        let direct = DIRECT_URL_FIELDS
            .iter()
            .filter_map(|field| map.get(*field))
            .find(|value| is_truthy(value));
        if let Some(Value::String(url)) = direct {
            self.push(url);
        }

        if let Some(Value::Array(versions)) = map.get(VIDEO_VERSIONS_FIELD) {
            for version in versions {
                if let Some(Value::String(url)) = version
                    .as_object()
                    .and_then(|v| v.get(VERSION_URL_FIELD))
                {
                    self.push(url);
                }
            }
        }

        map.values().for_each(|value| self.visit(value));
    }

    fn push(&mut self, url: &str) {
        if is_url_like(url) {
            self.found.push(url.to_string());
        }
    }

    /// Unique candidates in first-seen order
    fn into_unique(self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.found
            .into_iter()
            .filter(|url| seen.insert(url.clone()))
            .collect()
    }
}

/// Collects all candidate media URLs from a lookup response, best first.
///
/// Candidates containing `.mp4` come first; within each group shorter URLs win. The
/// sort is stable, so equal candidates keep their discovery order.
#[must_use]
pub fn collect_candidates(response: &Value) -> Vec<String> {
    let mut collector = CandidateCollector::default();
    collector.visit(response);

    let mut candidates = collector.into_unique();
    candidates.sort_by_key(|url| (!url.contains(PREFERRED_EXTENSION), url.chars().count()));
    candidates
}

/// Picks the best direct media URL from a lookup response.
///
/// # Examples
///
/// ```
/// use reel_relay::relay::resolver::best_video_url;
/// use serde_json::json;
///
/// let response = json!({"items": [{"video_versions": [
///     {"url": "https://cdn/x.mp4"},
///     {"url": "https://cdn/y.jpg"}
/// ]}]});
/// assert_eq!(best_video_url(&response).as_deref(), Some("https://cdn/x.mp4"));
/// ```
#[must_use]
pub fn best_video_url(response: &Value) -> Option<String> {
    collect_candidates(response).into_iter().next()
}
