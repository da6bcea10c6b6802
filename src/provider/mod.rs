//! Stream source providers.
//!
//! # Architecture
//!
//! - [`SourceProvider`]: async trait every provider implements
//! - [`ProviderSpec`]: data-driven description of a scraping provider
//!   (name, language, URL templates, fetch mode)
//! - [`ScrapeProvider`]: static or rendered page fetch + iframe extraction
//! - [`ConsumetProvider`]: lookup through a Consumet-style aggregation API
//!
//! Providers never fail to their caller: [`SourceProvider::resolve`] logs
//! any [`ProviderError`] and returns an empty list.

pub mod consumet;
pub mod extract;
pub mod scrape;
pub mod template;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::browser::BrowserLauncher;
use crate::candidate::StreamCandidate;
use crate::error::ProviderError;
use crate::http_client::HttpClient;
use crate::request::LookupRequest;

pub use consumet::{AggregatorConfig, ConsumetProvider};
pub use scrape::ScrapeProvider;
pub use template::UrlTemplate;

/// Language tag of the built-in providers (Latin-American Spanish).
pub const DEFAULT_LANG: &str = "LAT";

/// A single external source that can be queried for stream URLs.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Stable display name (e.g., `"Cuevana"`).
    fn name(&self) -> &str;

    /// Language tag attached to this provider's candidates.
    fn lang(&self) -> &str;

    /// Fallible lookup. Implementors return an empty vec or an error when
    /// nothing is found; both mean "no candidate" to the resolver.
    async fn lookup(
        &self,
        request: &LookupRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<StreamCandidate>, ProviderError>;

    /// Infallible lookup: errors are logged and turned into no candidates.
    async fn resolve(&self, request: &LookupRequest, cancel: &CancellationToken) -> Vec<StreamCandidate> {
        match self.lookup(request, cancel).await {
            Ok(candidates) => {
                debug!(provider = self.name(), count = candidates.len(), "provider finished");
                candidates
            }
            Err(ProviderError::NotFound(reason)) => {
                debug!(provider = self.name(), %request, reason = %reason, "provider has no match");
                Vec::new()
            }
            Err(e) => {
                warn!(provider = self.name(), %request, error = %e, "provider lookup failed");
                Vec::new()
            }
        }
    }
}

/// How a scraping provider retrieves its page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// Plain HTTP GET of the page HTML.
    #[default]
    Static,
    /// Load in headless Chromium and read the rendered DOM.
    Rendered,
}

/// Configuration-table entry for a scraping provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSpec {
    pub name: String,
    #[serde(default = "default_lang")]
    pub lang: String,
    /// Template for movie pages.
    pub movie: UrlTemplate,
    /// Template for series episode pages.
    pub series: UrlTemplate,
    #[serde(default)]
    pub fetch: FetchMode,
}

fn default_lang() -> String {
    DEFAULT_LANG.to_string()
}

impl ProviderSpec {
    fn builtin(name: &str, movie: &str, series: &str) -> Self {
        Self {
            name: name.to_string(),
            lang: default_lang(),
            movie: UrlTemplate(movie.to_string()),
            series: UrlTemplate(series.to_string()),
            fetch: FetchMode::Static,
        }
    }
}

/// Built-in scraping providers in priority order.
pub fn builtin_specs() -> Vec<ProviderSpec> {
    vec![
        ProviderSpec::builtin(
            "Cuevana",
            "https://cuevana.bi/pelicula/{slug}",
            "https://cuevana.bi/serie/{slug}/temporada-{season}/episodio-{episode}",
        ),
        ProviderSpec::builtin(
            "PelisPlus",
            "https://pelisplus.lat/pelicula/{slug}",
            "https://pelisplus.lat/serie/{slug}/temporada-{season}/episodio-{episode}",
        ),
        ProviderSpec::builtin(
            "RePelis",
            "https://repelishd.city/pelicula/{slug}",
            "https://repelishd.city/serie/{slug}-temporada-{season}-episodio-{episode}",
        ),
    ]
}

/// Instantiate providers from specs, in the given order.
///
/// Rendered providers share `launcher`; it must be present if any spec
/// asks for rendering.
pub fn build_scrapers(
    specs: &[ProviderSpec],
    client: &HttpClient,
    launcher: Option<&Arc<dyn BrowserLauncher>>,
) -> Result<Vec<Arc<dyn SourceProvider>>, String> {
    specs
        .iter()
        .map(|spec| {
            let provider = match spec.fetch {
                FetchMode::Static => ScrapeProvider::new_static(spec.clone(), client.clone()),
                FetchMode::Rendered => {
                    let launcher = launcher.ok_or_else(|| {
                        format!("provider {} needs a headless browser but none is available", spec.name)
                    })?;
                    ScrapeProvider::new_rendered(spec.clone(), Arc::clone(launcher))
                }
            };
            Ok(Arc::new(provider) as Arc<dyn SourceProvider>)
        })
        .collect()
}
