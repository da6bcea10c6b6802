//! Lookup requests: the validated core shape and the raw boundary shape.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ResolveError;

/// Kind of media being looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Series,
}

impl MediaType {
    /// Parse the boundary type string. Accepts `movie`, `tv` and `series`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "movie" => Some(Self::Movie),
            "tv" | "series" => Some(Self::Series),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Series => "tv",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated request for stream sources.
///
/// Construct through [`LookupRequest::movie`], [`LookupRequest::episode`] or
/// [`SourceQuery::into_request`]; all three enforce the field invariants.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupRequest {
    media_type: MediaType,
    title: String,
    season: Option<u32>,
    episode: Option<u32>,
}

impl LookupRequest {
    /// Movie lookup. Fails on an empty title.
    pub fn movie(title: impl Into<String>) -> Result<Self, ResolveError> {
        let title = non_empty_title(title.into())?;
        Ok(Self {
            media_type: MediaType::Movie,
            title,
            season: None,
            episode: None,
        })
    }

    /// Series episode lookup. Season and episode are 1-based.
    pub fn episode(title: impl Into<String>, season: u32, episode: u32) -> Result<Self, ResolveError> {
        let title = non_empty_title(title.into())?;
        if season == 0 || episode == 0 {
            return Err(ResolveError::InvalidRequest(
                "season and episode must be positive integers".into(),
            ));
        }
        Ok(Self {
            media_type: MediaType::Series,
            title,
            season: Some(season),
            episode: Some(episode),
        })
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn season(&self) -> Option<u32> {
        self.season
    }

    pub fn episode_number(&self) -> Option<u32> {
        self.episode
    }

    pub fn is_series(&self) -> bool {
        self.media_type == MediaType::Series
    }
}

impl fmt::Display for LookupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.season, self.episode) {
            (Some(s), Some(e)) => write!(f, "{} ({}) S{s:02}E{e:02}", self.title, self.media_type),
            _ => write!(f, "{} ({})", self.title, self.media_type),
        }
    }
}

fn non_empty_title(title: String) -> Result<String, ResolveError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ResolveError::InvalidRequest("Missing type or title".into()));
    }
    Ok(trimmed.to_string())
}

/// Raw query parameters as they arrive at the HTTP/CLI boundary.
///
/// Every field is an optional string; [`into_request`](Self::into_request)
/// does all validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceQuery {
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    pub title: Option<String>,
    pub season: Option<String>,
    pub episode: Option<String>,
}

impl SourceQuery {
    /// Validate and convert into a [`LookupRequest`].
    ///
    /// Missing type or title yields the "Missing type or title" error. For
    /// movies, season and episode are ignored even when present.
    pub fn into_request(self) -> Result<LookupRequest, ResolveError> {
        let (Some(kind), Some(title)) = (self.media_type.as_deref().map(str::trim), self.title) else {
            return Err(ResolveError::InvalidRequest("Missing type or title".into()));
        };
        if kind.is_empty() || title.trim().is_empty() {
            return Err(ResolveError::InvalidRequest("Missing type or title".into()));
        }

        let media_type = MediaType::parse(kind)
            .ok_or_else(|| ResolveError::InvalidRequest(format!("Unknown media type: {kind}")))?;

        match media_type {
            MediaType::Movie => LookupRequest::movie(title),
            MediaType::Series => {
                let season = parse_positive("season", self.season.as_deref())?;
                let episode = parse_positive("episode", self.episode.as_deref())?;
                LookupRequest::episode(title, season, episode)
            }
        }
    }
}

fn parse_positive(field: &str, value: Option<&str>) -> Result<u32, ResolveError> {
    let raw = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ResolveError::InvalidRequest(format!("Missing {field} for series lookup")))?;

    match raw.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ResolveError::InvalidRequest(format!(
            "{field} must be a positive integer, got {raw:?}"
        ))),
    }
}
