use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::Parser;
use pollwatch::config::{FeedConfig, WatchConfig};
use pollwatch::logging::{LogOptions, init_logging};
use pollwatch::monitor::FeedWatcher;
use pollwatch::notification::connect_sink;
use pollwatch::utils::http_client::default_client;
use pollwatch::utils::shutdown::cancel_on_shutdown;
use pollwatch_platforms::diverse::DiverseFeed;
use tracing::{error, info};

/// Announce new products on diverse.direct.
#[derive(Parser, Debug)]
#[command(name = "diche", author, version, about, long_about = None)]
struct Args {
    /// Announce this many of the newest products right away
    #[arg(default_value_t = 0)]
    skip: usize,

    /// Discord bot token
    #[arg(long, env = "diche_discord_token", hide_env_values = true)]
    discord_token: Option<String>,

    /// Discord channel id to post into
    #[arg(long, env = "diche_discord_channel")]
    discord_channel: Option<u64>,

    /// Discord webhook URL, used instead of the bot
    #[arg(long, env = "diche_discord_webhook", hide_env_values = true)]
    discord_webhook: Option<String>,

    /// Stop paging after this many pages per scan
    #[arg(long)]
    max_pages: Option<u32>,

    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Also write logs to this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let _guard = init_logging(&LogOptions {
        verbose: args.verbose,
        quiet: args.quiet,
        log_dir: args.log_dir,
        file_prefix: "diche".to_string(),
    })?;

    let config = WatchConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    let client = default_client()?;

    let discord = config.discord_config(args.discord_token, args.discord_channel, args.discord_webhook);
    let sink = connect_sink(discord, client.clone())
        .await
        .context("Failed to connect to Discord")?;

    let mut feed_config = config.feed_config(FeedConfig::default());
    if args.max_pages.is_some() {
        feed_config.max_pages = args.max_pages;
    }

    let mut watcher = FeedWatcher::new(DiverseFeed::new(client), sink, feed_config)
        .with_cancellation(cancel_on_shutdown());
    watcher
        .run(args.skip)
        .await
        .context("Initial fetch failed")?;

    info!("Stopped");
    Ok(())
}
