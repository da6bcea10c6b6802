//! Provider contract tests against a local mock server.
//!
//! Covers the scraping provider (static and rendered fetch) and the
//! aggregation-API provider's search → info → watch flow.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use streamfind::provider::UrlTemplate;
use streamfind::{
    AggregatorConfig, Browser, BrowserLauncher, ConsumetProvider, FetchMode, HttpClient, LookupRequest,
    ProviderError, ProviderSpec, ScrapeProvider, SourceProvider,
};

const PLAYER_PAGE: &str = r#"
<html><body>
  <iframe src="https://ads.example/banner"></iframe>
  <div id="player"><iframe src="https://embed.example/e/abc123"></iframe></div>
</body></html>
"#;

fn spec(base: &str, fetch: FetchMode) -> ProviderSpec {
    ProviderSpec {
        name: "Mock".to_string(),
        lang: "LAT".to_string(),
        movie: UrlTemplate::parse(&format!("{base}/pelicula/{{slug}}")).unwrap(),
        series: UrlTemplate::parse(&format!("{base}/serie/{{slug}}/temporada-{{season}}/episodio-{{episode}}")).unwrap(),
        fetch,
    }
}

fn client() -> HttpClient {
    HttpClient::new().unwrap()
}

// ─── Scraping provider ───────────────────────────────────────────────────────

#[tokio::test]
async fn scrape_finds_player_iframe() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pelicula/el-laberinto-del-fauno"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PLAYER_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let provider = ScrapeProvider::new_static(spec(&server.uri(), FetchMode::Static), client());
    let request = LookupRequest::movie("El Laberinto del Fauno").unwrap();
    let found = provider.resolve(&request, &CancellationToken::new()).await;

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Mock");
    assert_eq!(found[0].url, "https://embed.example/e/abc123");
    assert_eq!(found[0].lang, "LAT");
}

#[tokio::test]
async fn scrape_series_episode_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/serie/dark/temporada-1/episodio-4"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PLAYER_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let provider = ScrapeProvider::new_static(spec(&server.uri(), FetchMode::Static), client());
    let request = LookupRequest::episode("Dark", 1, 4).unwrap();
    assert_eq!(provider.resolve(&request, &CancellationToken::new()).await.len(), 1);
}

#[tokio::test]
async fn scrape_non_2xx_is_no_candidate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let provider = ScrapeProvider::new_static(spec(&server.uri(), FetchMode::Static), client());
    let request = LookupRequest::movie("Inception").unwrap();
    let cancel = CancellationToken::new();

    assert!(matches!(provider.lookup(&request, &cancel).await, Err(ProviderError::Status(404))));
    assert!(provider.resolve(&request, &cancel).await.is_empty());
}

#[tokio::test]
async fn scrape_page_without_iframe_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><p>No encontrado</p></html>"))
        .mount(&server)
        .await;

    let provider = ScrapeProvider::new_static(spec(&server.uri(), FetchMode::Static), client());
    let request = LookupRequest::movie("Inception").unwrap();
    assert!(provider.lookup(&request, &CancellationToken::new()).await.unwrap().is_empty());
}

#[tokio::test]
async fn scrape_respects_cancellation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(PLAYER_PAGE)
                .set_delay(std::time::Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let provider = ScrapeProvider::new_static(spec(&server.uri(), FetchMode::Static), client());
    let request = LookupRequest::movie("Inception").unwrap();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(std::time::Duration::from_secs(5), provider.lookup(&request, &cancel))
        .await
        .expect("lookup ignored cancellation");
    assert!(matches!(result, Err(ProviderError::Cancelled)));
}

/// Returns canned DOM and counts launches and closes.
struct CannedLauncher {
    dom: &'static str,
    launched: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

struct CannedBrowser {
    dom: &'static str,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl BrowserLauncher for CannedLauncher {
    async fn launch(&self) -> Result<Box<dyn Browser>, ProviderError> {
        self.launched.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CannedBrowser {
            dom: self.dom,
            closed: Arc::clone(&self.closed),
        }))
    }
}

#[async_trait]
impl Browser for CannedBrowser {
    async fn render(&mut self, _url: &str, _cancel: &CancellationToken) -> Result<String, ProviderError> {
        Ok(self.dom.to_string())
    }

    async fn close(&mut self) -> Result<(), ProviderError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn rendered_scrape_uses_browser_session() {
    let launched = Arc::new(AtomicUsize::new(0));
    let closed = Arc::new(AtomicUsize::new(0));
    let launcher: Arc<dyn BrowserLauncher> = Arc::new(CannedLauncher {
        dom: PLAYER_PAGE,
        launched: Arc::clone(&launched),
        closed: Arc::clone(&closed),
    });

    let provider = ScrapeProvider::new_rendered(spec("https://unused.example", FetchMode::Rendered), launcher);
    let request = LookupRequest::movie("Inception").unwrap();
    let found = provider.resolve(&request, &CancellationToken::new()).await;

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].url, "https://embed.example/e/abc123");
    assert_eq!(launched.load(Ordering::SeqCst), 1);
    assert_eq!(closed.load(Ordering::SeqCst), 1);
}

// ─── Aggregation provider ────────────────────────────────────────────────────

fn aggregator(server: &MockServer, strict: bool) -> ConsumetProvider {
    let config = AggregatorConfig {
        base_url: server.uri(),
        strict_episode_match: strict,
        ..AggregatorConfig::default()
    };
    ConsumetProvider::new(config, client())
}

async fn mount_search(server: &MockServer, title: &str, id: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/movies/flixhq/{title}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "currentPage": 1,
            "hasNextPage": false,
            "results": [
                { "id": id, "title": title, "type": "Movie" },
                { "id": "movie/watch-other-1", "title": "Other" }
            ]
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_info(server: &MockServer, id: &str, episodes: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/movies/flixhq/info"))
        .and(query_param("id", id))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": id, "episodes": episodes })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_watch(server: &MockServer, episode_id: &str, media_id: &str, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/movies/flixhq/watch"))
        .and(query_param("episodeId", episode_id))
        .and(query_param("mediaId", media_id))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "headers": { "Referer": "https://embed.example" },
            "sources": [
                { "url": "https://cdn.example/hls/1080.m3u8", "quality": "1080p", "isM3U8": true },
                { "url": "https://cdn.example/hls/auto.m3u8" }
            ],
            "subtitles": []
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn aggregator_movie_flow() {
    let server = MockServer::start().await;
    let media = "movie/watch-inception-19764";
    mount_search(&server, "Inception", media).await;
    mount_info(&server, media, json!([{ "id": "19764", "title": "Inception" }])).await;
    mount_watch(&server, "19764", media, 1).await;

    let provider = aggregator(&server, false);
    let request = LookupRequest::movie("Inception").unwrap();
    let found = provider.lookup(&request, &CancellationToken::new()).await.unwrap();

    let names: Vec<_> = found.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["FlixHQ 1", "FlixHQ 2"]);
    assert_eq!(found[0].url, "https://cdn.example/hls/1080.m3u8");
    assert_eq!(found[0].quality.as_deref(), Some("1080p"));
    assert_eq!(found[1].quality.as_deref(), Some("auto"));
    assert!(found.iter().all(|c| c.lang == "LAT"));
}

fn dark_episodes() -> serde_json::Value {
    json!([
        { "id": "1001", "title": "Secrets", "season": 1, "number": 1 },
        { "id": "1004", "title": "Double Lives", "season": 1, "number": 4 },
        { "id": "2001", "title": "Beginnings and Endings", "season": 2, "number": 1 }
    ])
}

#[tokio::test]
async fn aggregator_series_exact_episode() {
    let server = MockServer::start().await;
    let media = "tv/watch-dark-19349";
    mount_search(&server, "Dark", media).await;
    mount_info(&server, media, dark_episodes()).await;
    mount_watch(&server, "1004", media, 1).await;

    let request = LookupRequest::episode("Dark", 1, 4).unwrap();
    let found = aggregator(&server, false).resolve(&request, &CancellationToken::new()).await;
    assert_eq!(found.len(), 2);
}

#[tokio::test]
async fn aggregator_falls_back_to_first_episode() {
    let server = MockServer::start().await;
    let media = "tv/watch-dark-19349";
    mount_search(&server, "Dark", media).await;
    mount_info(&server, media, dark_episodes()).await;
    mount_watch(&server, "1001", media, 1).await;

    let request = LookupRequest::episode("Dark", 3, 8).unwrap();
    let found = aggregator(&server, false).resolve(&request, &CancellationToken::new()).await;
    assert_eq!(found.len(), 2);
}

#[tokio::test]
async fn aggregator_strict_mode_skips_watch() {
    let server = MockServer::start().await;
    let media = "tv/watch-dark-19349";
    mount_search(&server, "Dark", media).await;
    mount_info(&server, media, dark_episodes()).await;
    mount_watch(&server, "1001", media, 0).await;

    let request = LookupRequest::episode("Dark", 3, 8).unwrap();
    let provider = aggregator(&server, true);
    let result = provider.lookup(&request, &CancellationToken::new()).await;
    assert!(matches!(result, Err(ProviderError::NotFound(_))));
}

#[tokio::test]
async fn aggregator_empty_search_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movies/flixhq/Nada"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .mount(&server)
        .await;

    let request = LookupRequest::movie("Nada").unwrap();
    let result = aggregator(&server, false).lookup(&request, &CancellationToken::new()).await;
    assert!(matches!(result, Err(ProviderError::NotFound(_))));
}

#[tokio::test]
async fn aggregator_error_status_is_no_candidate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let request = LookupRequest::movie("Inception").unwrap();
    let provider = aggregator(&server, false);
    assert!(provider.resolve(&request, &CancellationToken::new()).await.is_empty());
}

#[tokio::test]
async fn aggregator_malformed_json_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>rate limited</html>"))
        .mount(&server)
        .await;

    let request = LookupRequest::movie("Inception").unwrap();
    let result = aggregator(&server, false).lookup(&request, &CancellationToken::new()).await;
    assert!(matches!(result, Err(ProviderError::Parse(_))));
}
