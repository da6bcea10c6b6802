use anyhow::Result;

use streamfind::{Config, Policy};

pub async fn cmd_serve(
    mut config: Config,
    bind: Option<String>,
    port: Option<u16>,
    policy: Option<Policy>,
) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(policy) = policy {
        config.resolver.policy = policy;
    }

    println!("🚀 streamfind {} on http://{}", streamfind::VERSION, config.server.addr());
    streamfind::server::serve(&config).await
}
