//! One complete invocation: lock, credentials, ledger, process

use chrono::Local;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::credentials::{fetch_credentials, SWEEP_SCOPES};
use crate::error::Result;
use crate::fetch::HttpImageFetcher;
use crate::ledger::sheets::SheetsLedger;
use crate::lock::InvocationLock;
use crate::platforms::x::XPublisherFactory;
use crate::processor::RowProcessor;
use crate::types::{RowOutcome, RowResult};

/// Line printed by the trigger after a completed sweep
pub const SUMMARY: &str = "Posts processed successfully";

/// Run one sweep against the configured ledger
///
/// Row-local failures do not make this fail; they are in the ledger and in
/// the log. The returned string is the summary line for the caller.
///
/// # Errors
///
/// Returns `Locked` when another invocation is running, and credential,
/// ledger, or configuration errors that stop the sweep.
pub async fn run_sweep(config: &Config) -> Result<String> {
    let lock_path = config.lock.resolve_path()?;
    let _lock = InvocationLock::acquire(&lock_path, config.lock.stale_after())?;

    let credentials = Arc::new(fetch_credentials(&config.credentials, SWEEP_SCOPES).await?);

    let client = reqwest::Client::new();
    let ledger = SheetsLedger::open(client.clone(), credentials.clone(), &config.ledger).await?;
    let fetcher = HttpImageFetcher::new(client.clone(), &config.fetch).with_drive_auth(credentials);
    let publishers = XPublisherFactory::new(client, config.x.clone());

    let processor = RowProcessor::new(
        Arc::new(ledger),
        Arc::new(fetcher),
        Arc::new(publishers),
        config.ledger.platform.clone(),
    );

    let outcomes = processor.process(Local::now().naive_local()).await?;
    log_outcomes(&outcomes);

    Ok(SUMMARY.to_string())
}

fn log_outcomes(outcomes: &[RowOutcome]) {
    for outcome in outcomes {
        match &outcome.result {
            RowResult::Posted { post_id } => {
                info!("Row {} ({}): posted {}", outcome.row, outcome.id, post_id)
            }
            RowResult::Failed { stage, message } => warn!(
                "Row {} ({}): {} failed: {}",
                outcome.row, outcome.id, stage, message
            ),
            RowResult::Skipped { reason } => {
                warn!("Row {} ({}): skipped: {}", outcome.row, outcome.id, reason)
            }
        }
    }
}
