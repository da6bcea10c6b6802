//! `streamfind` - Multi-provider stream source resolver
//!
//! # Features
//!
//! - **Providers**: Data-driven embed-page scrapers plus a Consumet-style aggregation API
//! - **Policies**: Parallel fan-out or sequential fallback over the provider list
//! - **Fetching**: Spoofed desktop-browser HTTP profiles, headless Chromium for rendered pages
//! - **Deadlines**: Cancellation-token based per-request timeouts with partial results
//! - **Server**: axum `GET /api/sources` endpoint
//!
//! # Example
//!
//! ```rust,no_run
//! use streamfind::{Config, LookupRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let resolver = Config::default().build_resolver()?;
//!     let request = LookupRequest::movie("Inception")?;
//!     for source in resolver.resolve(&request).await {
//!         println!("{} [{}] {}", source.name, source.lang, source.url);
//!     }
//!     Ok(())
//! }
//! ```

pub mod browser;
pub mod candidate;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod http_client;
pub mod provider;
pub mod request;
pub mod resolver;
pub mod server;
pub mod slug;

pub use browser::{Browser, BrowserLauncher, BrowserSession, ChromiumLauncher};
pub use candidate::{normalize, SourcesResponse, StreamCandidate};
pub use config::Config;
pub use error::{ProviderError, ResolveError, Result};
pub use fingerprint::{chrome_profile, firefox_profile, random_profile, BrowserProfile};
pub use http_client::HttpClient;
pub use provider::{
    builtin_specs, AggregatorConfig, ConsumetProvider, FetchMode, ProviderSpec, ScrapeProvider, SourceProvider,
};
pub use request::{LookupRequest, MediaType, SourceQuery};
pub use resolver::{Policy, ResultCache, Resolver};
pub use slug::make_slug;

/// Version of streamfind
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
