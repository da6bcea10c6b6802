use std::time::Duration;

use anyhow::{Context, Result};

use streamfind::{Config, Policy, SourceQuery, SourcesResponse};

pub struct ResolveArgs {
    pub media_type: String,
    pub title: String,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub policy: Option<Policy>,
    pub timeout: Option<u64>,
}

/// Resolve one title and print `{ "sources": [...] }` to stdout.
pub async fn cmd_resolve(mut config: Config, args: ResolveArgs) -> Result<()> {
    let query = SourceQuery {
        media_type: Some(args.media_type),
        title: Some(args.title),
        season: args.season.map(|s| s.to_string()),
        episode: args.episode.map(|e| e.to_string()),
    };
    // Validate before building providers so a bad query never touches the network.
    let request = query.into_request().map_err(|e| anyhow::anyhow!("{}", e.message()))?;

    if let Some(policy) = args.policy {
        config.resolver.policy = policy;
    }
    let mut resolver = config.build_resolver()?;
    if let Some(secs) = args.timeout {
        resolver = resolver.with_request_timeout(Duration::from_secs(secs.max(1)));
    }

    let sources = resolver.resolve(&request).await;
    if sources.is_empty() {
        eprintln!("❌ No sources found for {request}");
    } else {
        eprintln!("✅ {} source(s) for {request}", sources.len());
    }

    let body = serde_json::to_string_pretty(&SourcesResponse::from(sources)).context("failed to encode sources")?;
    println!("{body}");
    Ok(())
}
