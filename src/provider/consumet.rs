//! Consumet-style aggregation API provider.
//!
//! Three calls against the API:
//!
//! 1. `GET {base}/{route}/{title}`: search, first hit wins
//! 2. `GET {base}/{route}/info?id={media_id}`: episode list
//! 3. `GET {base}/{route}/watch?episodeId={id}&mediaId={media_id}`: sources
//!
//! Every returned source becomes a candidate named `"{label} {n}"`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use super::{SourceProvider, DEFAULT_LANG};
use crate::candidate::{StreamCandidate, DEFAULT_QUALITY};
use crate::error::ProviderError;
use crate::http_client::HttpClient;
use crate::request::LookupRequest;

pub const DEFAULT_BASE_URL: &str = "https://api-consumet-org-wg40.onrender.com";
const DEFAULT_ROUTE: &str = "movies/flixhq";

/// Settings for the aggregation-API provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    pub enabled: bool,
    pub base_url: String,
    /// Provider route under the base, e.g. `movies/flixhq`.
    pub route: String,
    /// Display-name prefix for candidates.
    pub label: String,
    pub lang: String,
    /// When set, a series lookup with no exact season/episode match yields
    /// nothing instead of the first listed episode.
    pub strict_episode_match: bool,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: DEFAULT_BASE_URL.to_string(),
            route: DEFAULT_ROUTE.to_string(),
            label: "FlixHQ".to_string(),
            lang: DEFAULT_LANG.to_string(),
            strict_episode_match: false,
        }
    }
}

pub struct ConsumetProvider {
    client: HttpClient,
    config: AggregatorConfig,
}

impl ConsumetProvider {
    pub fn new(config: AggregatorConfig, client: HttpClient) -> Self {
        Self { client, config }
    }

    fn endpoint(&self, tail: &str) -> Result<Url, ProviderError> {
        let base = self.config.base_url.trim_end_matches('/');
        let route = self.config.route.trim_matches('/');
        Url::parse(&format!("{base}/{route}/{tail}"))
            .map_err(|e| ProviderError::Parse(format!("invalid aggregator URL: {e}")))
    }

    fn search_url(&self, title: &str) -> Result<Url, ProviderError> {
        self.endpoint(&urlencoding::encode(title))
    }

    fn info_url(&self, media_id: &str) -> Result<Url, ProviderError> {
        let mut url = self.endpoint("info")?;
        url.query_pairs_mut().append_pair("id", media_id);
        Ok(url)
    }

    fn watch_url(&self, episode_id: &str, media_id: &str) -> Result<Url, ProviderError> {
        let mut url = self.endpoint("watch")?;
        url.query_pairs_mut()
            .append_pair("episodeId", episode_id)
            .append_pair("mediaId", media_id);
        Ok(url)
    }
}

#[async_trait]
impl SourceProvider for ConsumetProvider {
    fn name(&self) -> &str {
        &self.config.label
    }

    fn lang(&self) -> &str {
        &self.config.lang
    }

    async fn lookup(
        &self,
        request: &LookupRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<StreamCandidate>, ProviderError> {
        let search: SearchResponse = self
            .client
            .fetch_json(self.search_url(request.title())?.as_str(), cancel)
            .await?;
        debug!(provider = %self.config.label, count = search.results.len(), "search results");

        let hit = search
            .results
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::NotFound(format!("no search results for {:?}", request.title())))?;
        debug!(media_id = %hit.id, title = ?hit.title, "using first search result");

        let info: InfoResponse = self
            .client
            .fetch_json(self.info_url(&hit.id)?.as_str(), cancel)
            .await?;
        let episode = select_episode(&info.episodes, request, self.config.strict_episode_match)
            .ok_or_else(|| ProviderError::NotFound(format!("no matching episode for {request}")))?;
        debug!(episode_id = %episode.id, "episode selected");

        let watch: WatchResponse = self
            .client
            .fetch_json(self.watch_url(&episode.id, &hit.id)?.as_str(), cancel)
            .await?;

        Ok(watch
            .sources
            .into_iter()
            .enumerate()
            .filter_map(|(idx, source)| {
                let url = source.url.filter(|u| !u.trim().is_empty())?;
                Some(
                    StreamCandidate::new(format!("{} {}", self.config.label, idx + 1), url, &self.config.lang)
                        .with_quality(source.quality.unwrap_or_else(|| DEFAULT_QUALITY.to_string())),
                )
            })
            .collect())
    }
}

/// Pick the episode to stream.
///
/// Series lookups prefer an exact season/number match; otherwise (and for
/// movies) the first listed episode is used unless `strict` is set.
fn select_episode<'a>(episodes: &'a [Episode], request: &LookupRequest, strict: bool) -> Option<&'a Episode> {
    if let (Some(season), Some(number)) = (request.season(), request.episode_number()) {
        if let Some(exact) = episodes
            .iter()
            .find(|e| e.season == Some(season) && e.number == Some(number))
        {
            return Some(exact);
        }
        if strict {
            return None;
        }
        if let Some(first) = episodes.first() {
            warn!(%request, fallback = %first.id, "no exact episode match, using first listed episode");
        }
    }
    episodes.first()
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: String,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InfoResponse {
    #[serde(default)]
    episodes: Vec<Episode>,
}

#[derive(Debug, Deserialize)]
struct Episode {
    id: String,
    #[serde(default)]
    season: Option<u32>,
    #[serde(default)]
    number: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct WatchResponse {
    #[serde(default)]
    sources: Vec<WatchSource>,
}

#[derive(Debug, Deserialize)]
struct WatchSource {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    quality: Option<String>,
}
