use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use pollwatch::auth::{AuthSession, Credential};
use pollwatch::config::{DEFAULT_GOAL_INTERVAL, FetchErrorPolicy, PollConfig, WatchConfig};
use pollwatch::logging::{LogOptions, init_logging};
use pollwatch::monitor::{ChangeDetector, PollLoop, RunOutcome};
use pollwatch::notification::connect_sink;
use pollwatch::utils::http_client::default_client;
use pollwatch::utils::shutdown::cancel_on_shutdown;
use pollwatch_platforms::twitch::{BroadcasterStatus, TwitchAuth, TwitchUsers};
use tracing::{error, info};

/// Announce when Twitch users become affiliates or partners.
#[derive(Parser, Debug)]
#[command(name = "manfred", author, version, about, long_about = None)]
struct Args {
    /// Twitch logins to watch
    #[arg(required = true)]
    logins: Vec<String>,

    /// Twitch application client id
    #[arg(long, env = "manfred_twitch_id", hide_env_values = true)]
    twitch_id: String,

    /// Twitch application client secret
    #[arg(long, env = "manfred_twitch_secret", hide_env_values = true)]
    twitch_secret: String,

    /// Existing app access token to try before logging in
    #[arg(long, env = "manfred_twitch_current_token", hide_env_values = true)]
    twitch_token: Option<String>,

    /// Discord bot token
    #[arg(long, env = "manfred_discord_token", hide_env_values = true)]
    discord_token: Option<String>,

    /// Discord channel id to post into
    #[arg(long, env = "manfred_discord_channel")]
    discord_channel: Option<u64>,

    /// Discord webhook URL, used instead of the bot
    #[arg(long, env = "manfred_discord_webhook", hide_env_values = true)]
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

async fn run(args: Args) -> anyhow::Result<()> {
    let _guard = init_logging(&LogOptions {
        verbose: args.verbose,
        quiet: args.quiet,
        log_dir: args.log_dir,
        file_prefix: "manfred".to_string(),
    })?;

    let config = WatchConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    let client = default_client()?;

    let discord = config.discord_config(args.discord_token, args.discord_channel, args.discord_webhook);
    let sink = connect_sink(discord, client.clone())
        .await
        .context("Failed to connect to Discord")?;

    info!("Logging in to Twitch");
    let authenticator = TwitchAuth::new(client.clone(), &args.twitch_id, args.twitch_secret);
    let mut session = AuthSession::new(Arc::new(authenticator), config.auth_config());
    session
        .start(args.twitch_token.map(Credential::new))
        .await
        .context("Twitch login failed")?;
    info!("Twitch login ok");

    let detector =
        ChangeDetector::new(BroadcasterStatus::has_broadcaster_type).with_notify_changed(false);
    let poll_config = config.poll_config(PollConfig {
        interval: DEFAULT_GOAL_INTERVAL,
        fetch_error_policy: FetchErrorPolicy::SkipRestOfTick,
        ..Default::default()
    });

    let mut poll = PollLoop::new(
        TwitchUsers::new(client, args.twitch_id),
        detector,
        sink,
        poll_config,
    )
    .with_auth(session)
    .with_cancellation(cancel_on_shutdown());

    match poll.run(args.logins).await? {
        RunOutcome::Completed => info!("Every watched user has a broadcaster type"),
        RunOutcome::Cancelled => info!("Stopped before every user got a broadcaster type"),
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
    fn test_logins_required() {
        let result = Args::try_parse_from(["manfred", "--twitch-id", "id", "--twitch-secret", "s"]);
        assert!(result.is_err());

        let args = Args::try_parse_from([
            "manfred",
            "--twitch-id",
            "id",
            "--twitch-secret",
            "s",
            "alice",
            "bob",
        ])
        .unwrap();
        assert_eq!(args.logins, vec!["alice", "bob"]);
    }
}
