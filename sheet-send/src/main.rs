//! sheet-send - Sweep the posting ledger
//!
//! Reads the ledger, publishes every post that is due, and records each
//! outcome back in the ledger. Meant to be fired by a scheduler; `--interval`
//! keeps it running for hosts without one.

use clap::Parser;
use libsheetcast::logging::{LogFormat, LoggingConfig};
use libsheetcast::scheduling::parse_interval;
use libsheetcast::{run_sweep, Config, Result, SheetcastError};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "sheet-send")]
#[command(version)]
#[command(about = "Publish the scheduled posts in a spreadsheet ledger")]
#[command(long_about = "\
sheet-send - Publish the scheduled posts in a spreadsheet ledger

DESCRIPTION:
    sheet-send reads the ledger spreadsheet, picks every row whose status is
    Scheduled, whose platform is X and whose schedule has passed, and for
    each one downloads the listed images, uploads them and publishes the
    description with the row's model account.

    Successful rows are marked Posted. Failed rows keep their status and get
    the failure written to their error cell, so the next run retries them.

    On success it prints a single line to stdout:
        Posts processed successfully

USAGE:
    # One sweep (what a scheduler or HTTP trigger runs)
    sheet-send

    # Keep sweeping every five minutes until interrupted
    sheet-send --interval 5m

    # JSON logs for a log collector
    sheet-send --log-format json

SIGNALS:
    SIGTERM, SIGINT - Stop after the current sweep (with --interval)

CONFIGURATION:
    Configuration file: ~/.config/sheetcast/config.toml
    (override with --config or SHEETCAST_CONFIG)

    [credentials]
    source = \"secret_manager\"    # or \"key_file\"
    secret_name = \"social-schedule-secret\"

    [ledger]
    document = \"Social Scheduler\"

    Per-model X credentials come from the environment:
    {MODEL}_API_KEY, {MODEL}_API_KEY_SECRET, {MODEL}_ACCESS_TOKEN,
    {MODEL}_ACCESS_TOKEN_SECRET, {MODEL}_BEARER_TOKEN

EXIT CODES:
    0 - Sweep completed (individual rows may have failed)
    1 - Ledger or runtime error, or another sweep is running
    2 - Configuration or credential error
    3 - Invalid input
")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Repeat the sweep at this interval until interrupted
    #[arg(long, value_name = "DURATION")]
    #[arg(help = "Sweep repeatedly, e.g. 300, 90s or 5m (default: sweep once)")]
    interval: Option<String>,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Log format (text, json, pretty)
    #[arg(long, value_name = "FORMAT")]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::from_env(cli.verbose);
    if let Some(format) = cli.log_format {
        logging.format = format;
    }
    logging.init();

    match run(cli).await {
        Ok(()) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let interval = cli
        .interval
        .as_deref()
        .map(|value| parse_interval(&with_default_unit(value)))
        .transpose()?;

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    let Some(interval) = interval else {
        let summary = run_sweep(&config).await?;
        println!("{}", summary);
        return Ok(());
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    setup_signal_handlers(shutdown.clone())?;
    info!("Sweeping every {}s", interval.as_secs());

    loop {
        match run_sweep(&config).await {
            Ok(summary) => println!("{}", summary),
            Err(SheetcastError::Locked(reason)) => warn!("Sweep skipped: {}", reason),
            Err(e) => error!("Sweep failed: {}", e),
        }

        // Sleep until the next sweep, checking for shutdown every second
        for _ in 0..interval.as_secs() {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }
            sleep(Duration::from_secs(1)).await;
        }

        if shutdown.load(Ordering::Relaxed) {
            info!("Shutdown requested, stopping");
            break;
        }
    }

    Ok(())
}

/// Bare numbers are seconds
fn with_default_unit(value: &str) -> String {
    let value = value.trim();
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
        format!("{}s", value)
    } else {
        value.to_string()
    }
}

#[cfg(unix)]
fn setup_signal_handlers(shutdown: Arc<AtomicBool>) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM])
        .map_err(|e| SheetcastError::InvalidInput(format!("Signal setup failed: {}", e)))?;

    std::thread::spawn(move || {
        if signals.forever().next().is_some() {
            info!("Received shutdown signal, stopping after the current sweep");
            shutdown.store(true, Ordering::Relaxed);
        }
    });

    Ok(())
}

#[cfg(not(unix))]
fn setup_signal_handlers(_shutdown: Arc<AtomicBool>) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_number_is_seconds() {
        assert_eq!(with_default_unit("300"), "300s");
        assert_eq!(with_default_unit(" 5m "), "5m");
        assert_eq!(with_default_unit(""), "");
    }

    #[test]
    fn test_cli_parses_options() {
        let cli = Cli::parse_from([
            "sheet-send",
            "--interval",
            "90s",
            "--log-format",
            "json",
            "-v",
        ]);
        assert_eq!(cli.interval.as_deref(), Some("90s"));
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        assert!(cli.verbose);
        assert!(cli.config.is_none());
    }
}
