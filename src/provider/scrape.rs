//! Embed-page scraping provider.
//!
//! Builds the page URL from the provider's templates, fetches it (static
//! HTML or rendered DOM), and returns the first player iframe as a
//! single candidate.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::extract::first_embed_url;
use super::{FetchMode, ProviderSpec, SourceProvider};
use crate::browser::{render_page, BrowserLauncher};
use crate::candidate::StreamCandidate;
use crate::error::ProviderError;
use crate::http_client::HttpClient;
use crate::request::LookupRequest;
use crate::slug::make_slug;

enum PageFetcher {
    Static(HttpClient),
    Rendered(Arc<dyn BrowserLauncher>),
}

/// Scraping provider driven by a [`ProviderSpec`].
pub struct ScrapeProvider {
    spec: ProviderSpec,
    fetcher: PageFetcher,
}

impl ScrapeProvider {
    pub fn new_static(spec: ProviderSpec, client: HttpClient) -> Self {
        Self {
            spec,
            fetcher: PageFetcher::Static(client),
        }
    }

    pub fn new_rendered(spec: ProviderSpec, launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self {
            spec,
            fetcher: PageFetcher::Rendered(launcher),
        }
    }

    pub fn spec(&self) -> &ProviderSpec {
        &self.spec
    }

    pub fn fetch_mode(&self) -> FetchMode {
        match self.fetcher {
            PageFetcher::Static(_) => FetchMode::Static,
            PageFetcher::Rendered(_) => FetchMode::Rendered,
        }
    }

    /// Page URL for `request`, or `NotFound` when the title has no slug.
    pub fn page_url(&self, request: &LookupRequest) -> Result<String, ProviderError> {
        let slug = make_slug(request.title());
        if slug.is_empty() {
            return Err(ProviderError::NotFound(format!(
                "title {:?} has no URL-safe slug",
                request.title()
            )));
        }
        if request.is_series() {
            self.spec
                .series
                .render(&slug, request.season(), request.episode_number())
        } else {
            self.spec.movie.render(&slug, None, None)
        }
    }

    async fn fetch_page(&self, url: &str, cancel: &CancellationToken) -> Result<String, ProviderError> {
        match &self.fetcher {
            PageFetcher::Static(client) => client.fetch_text(url, cancel).await,
            PageFetcher::Rendered(launcher) => render_page(launcher.as_ref(), url, cancel).await,
        }
    }
}

#[async_trait]
impl SourceProvider for ScrapeProvider {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn lang(&self) -> &str {
        &self.spec.lang
    }

    async fn lookup(
        &self,
        request: &LookupRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<StreamCandidate>, ProviderError> {
        let url = self.page_url(request)?;
        debug!(provider = %self.spec.name, %url, mode = ?self.fetch_mode(), "scraping page");

        let html = self.fetch_page(&url, cancel).await?;
        let Some(embed) = first_embed_url(&html) else {
            debug!(provider = %self.spec.name, %url, bytes = html.len(), "no player iframe on page");
            return Ok(Vec::new());
        };

        Ok(vec![StreamCandidate::new(&self.spec.name, embed, &self.spec.lang)])
    }
}
