//! Stream candidates and output normalization.
//!
//! Providers return loosely-shaped candidates; [`normalize`] enforces the
//! output invariants before anything reaches the caller:
//!
//! - `url` is an absolute `http`/`https` URL (protocol-relative `//host`
//!   sources are upgraded to `https`)
//! - `quality` is always set, defaulting to `"auto"`
//! - duplicate URLs are dropped, first occurrence wins

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use url::Url;

/// Quality label used when a provider does not report one.
pub const DEFAULT_QUALITY: &str = "auto";

/// A single resolved stream URL plus metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamCandidate {
    /// Display name, usually the provider name (`"Cuevana"`, `"FlixHQ 2"`).
    pub name: String,
    pub url: String,
    /// Audio language tag, e.g. `"LAT"`.
    pub lang: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
}

impl StreamCandidate {
    pub fn new(name: impl Into<String>, url: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            lang: lang.into(),
            quality: None,
        }
    }

    #[must_use]
    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = Some(quality.into());
        self
    }
}

/// Parse `raw` as an absolute http(s) URL.
///
/// Protocol-relative URLs are resolved against `https:`. Returns `None`
/// for relative paths, other schemes, or unparseable input.
pub fn absolute_http_url(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let parsed = if raw.starts_with("//") {
        Url::parse(&format!("https:{raw}")).ok()?
    } else {
        Url::parse(raw).ok()?
    };
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Some(parsed),
        _ => None,
    }
}

/// Validate one candidate, returning its normalized form.
pub fn normalize_one(mut candidate: StreamCandidate) -> Option<StreamCandidate> {
    let url = absolute_http_url(&candidate.url)?;
    if candidate.url.trim_start().starts_with("//") {
        candidate.url = url.to_string();
    } else {
        candidate.url = candidate.url.trim().to_string();
    }
    if candidate.quality.as_deref().is_none_or(|q| q.trim().is_empty()) {
        candidate.quality = Some(DEFAULT_QUALITY.to_string());
    }
    Some(candidate)
}

/// Normalize a candidate list, preserving order.
pub fn normalize(candidates: impl IntoIterator<Item = StreamCandidate>) -> Vec<StreamCandidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter_map(|c| {
            let original = c.url.clone();
            let normalized = normalize_one(c);
            if normalized.is_none() {
                tracing::debug!(url = %original, "dropping candidate without absolute URL");
            }
            normalized
        })
        .filter(|c| seen.insert(c.url.clone()))
        .collect()
}

/// Serialized response body: `{ "sources": [...] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcesResponse {
    pub sources: Vec<StreamCandidate>,
}

impl From<Vec<StreamCandidate>> for SourcesResponse {
    fn from(sources: Vec<StreamCandidate>) -> Self {
        Self { sources }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_absolute_http_urls() {
        assert!(absolute_http_url("https://cdn.example/a/1").is_some());
        assert!(absolute_http_url("http://cdn.example/a/1").is_some());
    }

    #[test]
    fn upgrades_protocol_relative() {
        let url = absolute_http_url("//embed.example/v/9").unwrap();
        assert_eq!(url.as_str(), "https://embed.example/v/9");
    }

    #[test]
    fn rejects_relative_and_foreign_schemes() {
        assert!(absolute_http_url("/embed/9").is_none());
        assert!(absolute_http_url("embed.html").is_none());
        assert!(absolute_http_url("javascript:void(0)").is_none());
        assert!(absolute_http_url("about:blank").is_none());
        assert!(absolute_http_url("").is_none());
    }

    #[test]
    fn quality_defaults_to_auto() {
        let c = normalize_one(StreamCandidate::new("A", "https://cdn.example/a/1", "LAT")).unwrap();
        assert_eq!(c.quality.as_deref(), Some("auto"));

        let c = normalize_one(StreamCandidate::new("A", "https://cdn.example/a/1", "LAT").with_quality("1080p"))
            .unwrap();
        assert_eq!(c.quality.as_deref(), Some("1080p"));
    }

    #[test]
    fn normalize_drops_invalid_and_duplicates_in_order() {
        let out = normalize(vec![
            StreamCandidate::new("A", "https://cdn.example/a/1", "LAT"),
            StreamCandidate::new("B", "not a url", "LAT"),
            StreamCandidate::new("C", "https://cdn.example/c/1", "LAT"),
            StreamCandidate::new("D", "https://cdn.example/a/1", "LAT"),
        ]);
        let names: Vec<_> = out.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["A", "C"]);
    }

    #[test]
    fn response_serializes_sources_key() {
        let body = SourcesResponse::from(vec![StreamCandidate::new("A", "https://cdn.example/a/1", "LAT")]);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["sources"][0]["name"], "A");
        assert!(json["sources"][0].get("quality").is_none());
    }
}
