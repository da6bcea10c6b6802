//! Service configuration loaded from `~/.config/streamfind/config.toml`.
//!
//! Every section is optional; a missing file means built-in defaults.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::browser::{BrowserLauncher, ChromiumLauncher, NAVIGATION_TIMEOUT, SETTLE_DELAY};
use crate::fingerprint::random_profile;
use crate::http_client::{HttpClient, DEFAULT_TIMEOUT};
use crate::provider::{build_scrapers, builtin_specs, AggregatorConfig, ConsumetProvider, FetchMode, ProviderSpec};
use crate::resolver::cache::DEFAULT_CAPACITY;
use crate::resolver::{Policy, ResultCache, Resolver};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 45;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub policy: Policy,
    /// Per-call deadline; `None` waits for every provider.
    pub request_timeout_secs: Option<u64>,
    /// Result cache TTL; 0 disables the cache.
    pub cache_ttl_secs: u64,
    pub cache_capacity: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            policy: Policy::Parallel,
            request_timeout_secs: Some(DEFAULT_REQUEST_TIMEOUT_SECS),
            cache_ttl_secs: 0,
            cache_capacity: DEFAULT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    /// Overrides the randomly chosen desktop user agent.
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Chromium binary; detected from `PATH` when unset.
    pub binary: Option<PathBuf>,
    pub navigation_timeout_secs: u64,
    pub settle_delay_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            binary: None,
            navigation_timeout_secs: NAVIGATION_TIMEOUT.as_secs(),
            settle_delay_secs: SETTLE_DELAY.as_secs(),
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub resolver: ResolverConfig,
    pub http: HttpConfig,
    pub browser: BrowserConfig,
    /// Scraping providers in priority order.
    pub providers: Vec<ProviderSpec>,
    /// Aggregation API, queried after every scraping provider.
    pub aggregator: AggregatorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            resolver: ResolverConfig::default(),
            http: HttpConfig::default(),
            browser: BrowserConfig::default(),
            providers: builtin_specs(),
            aggregator: AggregatorConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// tried and a missing file yields defaults. `PORT` overrides
    /// `server.port` in both cases.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, if `PORT` is
    /// not a port number, or if validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = config_path();
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    debug!(path = %path.display(), "no config file, using defaults");
                    Self::default()
                }
            }
        };
        config.apply_port_override(std::env::var("PORT").ok().as_deref())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file without env overrides or validation.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("invalid TOML in {}", path.display()))?;
        info!(path = %path.display(), providers = config.providers.len(), "loaded config");
        Ok(config)
    }

    pub fn apply_port_override(&mut self, port: Option<&str>) -> Result<()> {
        if let Some(raw) = port.map(str::trim).filter(|p| !p.is_empty()) {
            self.server.port = raw
                .parse()
                .with_context(|| format!("PORT must be a port number, got {raw:?}"))?;
        }
        Ok(())
    }

    /// Check cross-field constraints serde can't express.
    pub fn validate(&self) -> Result<()> {
        if self.providers.is_empty() {
            bail!("provider table is empty");
        }
        let mut names = HashSet::new();
        for spec in &self.providers {
            if spec.name.trim().is_empty() {
                bail!("provider with empty name");
            }
            if !names.insert(spec.name.as_str()) {
                bail!("duplicate provider name {:?}", spec.name);
            }
        }
        if self.aggregator.enabled && names.contains(self.aggregator.label.as_str()) {
            bail!("aggregator label {:?} collides with a provider name", self.aggregator.label);
        }
        if self.resolver.request_timeout_secs == Some(0) {
            bail!("resolver.request_timeout_secs must be positive (omit it to disable the deadline)");
        }
        if self.http.timeout_secs == 0 {
            bail!("http.timeout_secs must be positive");
        }
        if self.browser.navigation_timeout_secs == 0 {
            bail!("browser.navigation_timeout_secs must be positive");
        }
        Ok(())
    }

    pub fn needs_browser(&self) -> bool {
        self.providers.iter().any(|p| p.fetch == FetchMode::Rendered)
    }

    /// Assemble the resolver: HTTP client, optional browser launcher,
    /// scraping providers in table order, then the aggregator.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client can't be built or a rendered provider is
    /// configured without a usable Chromium binary.
    pub fn build_resolver(&self) -> Result<Resolver> {
        let mut profile = random_profile();
        if let Some(ua) = &self.http.user_agent {
            profile = profile.with_user_agent(ua.clone());
        }
        let user_agent = profile.user_agent.clone();
        let client = HttpClient::with_profile(profile, Duration::from_secs(self.http.timeout_secs))
            .context("failed to build HTTP client")?;

        let launcher = if self.needs_browser() {
            Some(self.launcher(user_agent)?)
        } else {
            None
        };

        let mut providers =
            build_scrapers(&self.providers, &client, launcher.as_ref()).map_err(anyhow::Error::msg)?;
        if self.aggregator.enabled {
            providers.push(Arc::new(ConsumetProvider::new(self.aggregator.clone(), client)));
        }

        let mut resolver = Resolver::new(providers, self.resolver.policy);
        if let Some(secs) = self.resolver.request_timeout_secs {
            resolver = resolver.with_request_timeout(Duration::from_secs(secs));
        }
        if self.resolver.cache_ttl_secs > 0 {
            resolver = resolver.with_cache(ResultCache::new(
                Duration::from_secs(self.resolver.cache_ttl_secs),
                self.resolver.cache_capacity,
            ));
        }
        Ok(resolver)
    }

    fn launcher(&self, user_agent: String) -> Result<Arc<dyn BrowserLauncher>> {
        let launcher = match &self.browser.binary {
            Some(binary) => ChromiumLauncher::new(binary, user_agent),
            None => ChromiumLauncher::detect(user_agent)
                .context("a rendered provider is configured but no Chromium binary was found in PATH")?,
        };
        debug!(binary = %launcher.binary().display(), "using headless browser");
        Ok(Arc::new(
            launcher
                .with_navigation_timeout(Duration::from_secs(self.browser.navigation_timeout_secs))
                .with_settle_delay(Duration::from_secs(self.browser.settle_delay_secs)),
        ))
    }
}

/// Default config file location.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("streamfind")
        .join("config.toml")
}
