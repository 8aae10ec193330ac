//! sheet-watch - Register a Drive push-notification channel
//!
//! Asks Drive to POST change notifications for a folder to a web hook, so
//! that dropping images into the folder can fire a sweep.

use clap::Parser;
use libsheetcast::credentials::{fetch_credentials, DRIVE_SCOPE};
use libsheetcast::logging::LoggingConfig;
use libsheetcast::watch::{register_watch, ChannelRequest, DEFAULT_CHANNEL_ID};
use libsheetcast::{Config, Result, SheetcastError};
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "sheet-watch")]
#[command(version)]
#[command(about = "Register a Drive push-notification channel for a folder")]
#[command(long_about = "\
sheet-watch - Register a Drive push-notification channel for a folder

DESCRIPTION:
    Registers a web_hook channel on a Drive folder. Drive then sends change
    notifications for the folder to ADDRESS until the channel expires.
    Prints the channel Drive returned as JSON on stdout.

USAGE:
    sheet-watch 1AbCdEfG --address https://example.com/drive-hook

EXIT CODES:
    0 - Channel registered
    1 - Runtime error (including a request Drive rejected)
    2 - Configuration or credential error
    3 - Invalid input

SECRET NAME:
    --secret-name, then [watch] secret_name in the config file, then
    service-account-appspot-credentials.
")]
struct Cli {
    /// Drive folder id to watch
    folder_id: String,

    /// HTTPS address that receives notifications
    #[arg(long, value_name = "URL")]
    address: String,

    /// Channel id
    #[arg(long, value_name = "ID", default_value = DEFAULT_CHANNEL_ID)]
    channel_id: String,

    /// Secret holding the service-account key (secret_manager source only)
    #[arg(long, value_name = "NAME")]
    secret_name: Option<String>,

    /// Path to the configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    LoggingConfig::from_env(cli.verbose).init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    if !cli.address.starts_with("https://") {
        return Err(SheetcastError::InvalidInput(format!(
            "address must be an https:// URL, got '{}'",
            cli.address
        )));
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    config.credentials.secret_name = config.watch.resolve_secret_name(cli.secret_name.as_deref());

    let credentials = fetch_credentials(&config.credentials, &[DRIVE_SCOPE]).await?;
    let channel = ChannelRequest {
        id: cli.channel_id,
        address: cli.address,
    };

    let client = reqwest::Client::new();
    let descriptor = register_watch(&credentials, &client, &cli.folder_id, &channel).await?;
    debug!("Channel expires at {:?}", descriptor.expiration);

    let json = serde_json::to_string_pretty(&descriptor)
        .map_err(|e| SheetcastError::InvalidInput(format!("cannot encode channel: {}", e)))?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_secret_name_flag_is_optional() {
        let cli = parse(&["sheet-watch", "f1", "--address", "https://example.com/h"]);
        assert_eq!(cli.secret_name, None);
        assert_eq!(cli.channel_id, DEFAULT_CHANNEL_ID);
    }

    #[test]
    fn test_config_secret_name_survives_without_flag() {
        let config = Config::from_toml("[watch]\nsecret_name = \"drive-hook-key\"\n").unwrap();

        let cli = parse(&["sheet-watch", "f1", "--address", "https://example.com/h"]);
        assert_eq!(
            config.watch.resolve_secret_name(cli.secret_name.as_deref()),
            "drive-hook-key"
        );

        let cli = parse(&[
            "sheet-watch",
            "f1",
            "--address",
            "https://example.com/h",
            "--secret-name",
            "override",
        ]);
        assert_eq!(
            config.watch.resolve_secret_name(cli.secret_name.as_deref()),
            "override"
        );
    }
}
