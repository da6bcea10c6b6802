//! Per-provider URL templates.
//!
//! A template is a plain URL with `{slug}`, `{season}` and `{episode}`
//! placeholders, e.g. `https://cuevana.bi/serie/{slug}/temporada-{season}/episodio-{episode}`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

const PLACEHOLDERS: &[&str] = &["slug", "season", "episode"];

/// Validated URL template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UrlTemplate(pub(super) String);

impl UrlTemplate {
    /// Parse and validate a template.
    ///
    /// Rejects unbalanced braces, unknown placeholders, and templates that
    /// don't reference `{slug}`.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let mut rest = raw;
        let mut has_slug = false;
        while let Some(open) = rest.find('{') {
            if rest[..open].contains('}') {
                return Err(format!("unbalanced '}}' in template {raw:?}"));
            }
            let after = &rest[open + 1..];
            let close = after
                .find('}')
                .ok_or_else(|| format!("unclosed '{{' in template {raw:?}"))?;
            let name = &after[..close];
            if !PLACEHOLDERS.contains(&name) {
                return Err(format!("unknown placeholder {{{name}}} in template {raw:?}"));
            }
            has_slug |= name == "slug";
            rest = &after[close + 1..];
        }
        if rest.contains('}') {
            return Err(format!("unbalanced '}}' in template {raw:?}"));
        }
        if !has_slug {
            return Err(format!("template {raw:?} must contain {{slug}}"));
        }
        Ok(Self(raw.to_string()))
    }

    /// Whether the template references season/episode numbers.
    pub fn is_episodic(&self) -> bool {
        self.0.contains("{season}") || self.0.contains("{episode}")
    }

    /// Substitute placeholders.
    ///
    /// Fails if the template needs a season or episode that the request
    /// doesn't carry.
    pub fn render(&self, slug: &str, season: Option<u32>, episode: Option<u32>) -> Result<String, ProviderError> {
        let mut out = self.0.replace("{slug}", slug);
        for (name, value) in [("{season}", season), ("{episode}", episode)] {
            if out.contains(name) {
                let value = value.ok_or_else(|| {
                    ProviderError::Parse(format!("template needs {name} but request has none"))
                })?;
                out = out.replace(name, &value.to_string());
            }
        }
        Ok(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UrlTemplate {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<UrlTemplate> for String {
    fn from(t: UrlTemplate) -> Self {
        t.0
    }
}

impl fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_movie_template() {
        let t = UrlTemplate::parse("https://cuevana.bi/pelicula/{slug}").unwrap();
        assert_eq!(t.render("inception", None, None).unwrap(), "https://cuevana.bi/pelicula/inception");
        assert!(!t.is_episodic());
    }

    #[test]
    fn renders_series_template() {
        let t = UrlTemplate::parse("https://repelishd.city/serie/{slug}-temporada-{season}-episodio-{episode}").unwrap();
        assert!(t.is_episodic());
        assert_eq!(
            t.render("dark", Some(1), Some(4)).unwrap(),
            "https://repelishd.city/serie/dark-temporada-1-episodio-4"
        );
    }

    #[test]
    fn series_template_without_numbers_fails() {
        let t = UrlTemplate::parse("https://x.example/{slug}/{season}").unwrap();
        assert!(t.render("dark", None, None).is_err());
    }

    #[test]
    fn rejects_bad_templates() {
        assert!(UrlTemplate::parse("https://x.example/pelicula").is_err());
        assert!(UrlTemplate::parse("https://x.example/{slug").is_err());
        assert!(UrlTemplate::parse("https://x.example/{title}").is_err());
        assert!(UrlTemplate::parse("https://x.example/slug}/{slug}").is_err());
    }

    #[test]
    fn deserializes_through_validation() {
        let ok: Result<UrlTemplate, _> = serde_json::from_str(r#""https://x.example/{slug}""#);
        assert!(ok.is_ok());
        let bad: Result<UrlTemplate, _> = serde_json::from_str(r#""https://x.example/{nope}""#);
        assert!(bad.is_err());
    }
}
