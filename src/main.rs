//! `streamfind` CLI - Look up stream sources or run the HTTP API

mod cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use streamfind::{Config, Policy};

use cmd::{cmd_providers, cmd_resolve, cmd_serve};

#[derive(Parser)]
#[command(name = "streamfind")]
#[command(about = "Find playable stream sources for movies and series")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/streamfind/config.toml)
    #[arg(short, long, global = true, env = "STREAMFIND_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to bind
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on (also read from PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Provider policy: parallel or fallback
        #[arg(long)]
        policy: Option<Policy>,
    },

    /// Resolve sources for one title and print JSON
    Resolve {
        /// Media type: movie or tv
        #[arg(short = 't', long = "type", value_name = "TYPE")]
        media_type: String,

        /// Title to look up
        #[arg(long)]
        title: String,

        /// Season number (series only)
        #[arg(short, long)]
        season: Option<u32>,

        /// Episode number (series only)
        #[arg(short, long)]
        episode: Option<u32>,

        /// Provider policy: parallel or fallback
        #[arg(long)]
        policy: Option<Policy>,

        /// Overall deadline in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// List configured providers in priority order
    Providers,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so `resolve` output stays pipeable
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { bind, port, policy } => {
            cmd_serve(config, bind, port, policy).await?;
        }
        Commands::Resolve {
            media_type,
            title,
            season,
            episode,
            policy,
            timeout,
        } => {
            let args = cmd::ResolveArgs {
                media_type,
                title,
                season,
                episode,
                policy,
                timeout,
            };
            cmd_resolve(config, args).await?;
        }
        Commands::Providers => {
            cmd_providers(&config);
        }
    }

    Ok(())
}
