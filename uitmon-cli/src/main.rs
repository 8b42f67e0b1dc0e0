use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::Parser;
use pollwatch::config::{DEFAULT_ISSUE_INTERVAL, PollConfig, WatchConfig};
use pollwatch::logging::{LogOptions, init_logging};
use pollwatch::monitor::{ChangeDetector, PollLoop, RunOutcome};
use pollwatch::notification::connect_sink;
use pollwatch::utils::http_client::default_client;
use pollwatch::utils::shutdown::cancel_on_shutdown;
use pollwatch_platforms::unity::{IssueStatus, UnityIssueTracker, is_issue_url};
use tracing::{error, info, warn};

/// Follow Unity issue tracker entries until they are resolved.
#[derive(Parser, Debug)]
#[command(name = "uitmon", author, version, about, long_about = None)]
struct Args {
    /// Issue URLs, e.g. https://issuetracker.unity3d.com/issues/<slug>
    #[arg(required = true)]
    issues: Vec<String>,

    /// Discord bot token
    #[arg(long, env = "uitmon_discord_token", hide_env_values = true)]
    discord_token: Option<String>,

    /// Discord channel id to post into
    #[arg(long, env = "uitmon_discord_channel")]
    discord_channel: Option<u64>,

    /// Discord webhook URL, used instead of the bot
    #[arg(long, env = "uitmon_discord_webhook", hide_env_values = true)]
    discord_webhook: Option<String>,

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

/// Split issue arguments into valid URLs and the rest.
fn partition_issue_urls(issues: Vec<String>) -> (Vec<String>, Vec<String>) {
    issues.into_iter().partition(|url| is_issue_url(url))
}

async fn run(args: Args) -> anyhow::Result<()> {
    let _guard = init_logging(&LogOptions {
        verbose: args.verbose,
        quiet: args.quiet,
        log_dir: args.log_dir,
        file_prefix: "uitmon".to_string(),
    })?;

    let (issues, invalid) = partition_issue_urls(args.issues);
    for url in &invalid {
        warn!("Invalid URL {}", url);
    }

    let config = WatchConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    let client = default_client()?;

    let discord = config.discord_config(args.discord_token, args.discord_channel, args.discord_webhook);
    let sink = connect_sink(discord, client.clone())
        .await
        .context("Failed to connect to Discord")?;

    let poll_config = config.poll_config(PollConfig {
        interval: DEFAULT_ISSUE_INTERVAL,
        prefetch_initial: true,
        ..Default::default()
    });

    let mut poll = PollLoop::new(
        UnityIssueTracker::new(client),
        ChangeDetector::new(IssueStatus::is_resolved),
        sink,
        poll_config,
    )
    .with_cancellation(cancel_on_shutdown());

    match poll.run(issues).await? {
        RunOutcome::Completed => info!("No unresolved issues left"),
        RunOutcome::Cancelled => info!("Stopped with {} issues unresolved", poll.watch_set().len()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_invalid_urls_are_split_off() {
        let (valid, invalid) = partition_issue_urls(vec![
            "https://issuetracker.unity3d.com/issues/crash-on-import".to_string(),
            "https://example.com/issues/1".to_string(),
            "crash-on-import".to_string(),
        ]);
        assert_eq!(
            valid,
            vec!["https://issuetracker.unity3d.com/issues/crash-on-import"]
        );
        assert_eq!(invalid.len(), 2);
    }
}
