//! Row processor: one sweep over the ledger
//!
//! For every due row, strictly in ledger order and one at a time:
//! build the model's publisher, fetch images into a per-row scratch
//! directory, upload them, publish, and record the outcome in the ledger.
//!
//! Failures inside a row are written to that row's `error` cell and the sweep
//! moves on; the row stays `Scheduled` and is picked up again by the next
//! invocation. A failed ledger read or write aborts the sweep.

use chrono::NaiveDateTime;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::error::{Result, SheetcastError};
use crate::fetch::{split_locators, ImageFetcher, ScratchDir};
use crate::ledger::{Column, LedgerStore, PostLedger};
use crate::platforms::PublisherFactory;
use crate::scheduling::{classify, format_last_updated, Eligibility};
use crate::types::{PostRecord, PostStatus, PublishReceipt, RowOutcome, RowResult, Stage};

/// Collaborators for one sweep
///
/// Built once per invocation and handed to the processor; nothing here is
/// global.
#[derive(Clone)]
pub struct RowProcessor {
    ledger: Arc<dyn LedgerStore>,
    fetcher: Arc<dyn ImageFetcher>,
    publishers: Arc<dyn PublisherFactory>,
    platform: String,
}

impl RowProcessor {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        fetcher: Arc<dyn ImageFetcher>,
        publishers: Arc<dyn PublisherFactory>,
        platform: impl Into<String>,
    ) -> Self {
        Self {
            ledger,
            fetcher,
            publishers,
            platform: platform.into(),
        }
    }

    /// Run one sweep with `now` as the scheduling cut-off
    ///
    /// Returns one outcome per row the sweep acted on. Rows that are not
    /// scheduled for this platform, or are scheduled in the future, are not
    /// touched and produce no outcome.
    ///
    /// # Errors
    ///
    /// Fails if the ledger cannot be read, lacks a required column, or a
    /// cell write fails.
    pub async fn process(&self, now: NaiveDateTime) -> Result<Vec<RowOutcome>> {
        let (ledger, records) = PostLedger::read_all(self.ledger.as_ref()).await?;
        let mut outcomes = Vec::new();

        for record in &records {
            let span = info_span!("row", row = record.row, id = %record.id);
            let outcome = match classify(record, &self.platform, now) {
                Eligibility::Ignored | Eligibility::Future => continue,
                Eligibility::Unparseable(reason) => {
                    self.skip_row(&ledger, record, reason)
                        .instrument(span)
                        .await?
                }
                Eligibility::Due => self.process_row(&ledger, record, now).instrument(span).await?,
            };
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    async fn skip_row(
        &self,
        ledger: &PostLedger<'_>,
        record: &PostRecord,
        reason: String,
    ) -> Result<RowOutcome> {
        warn!("Skipping row with unparseable schedule: {}", reason);
        if record.error != reason {
            ledger.update_cell(record.row, Column::Error, &reason).await?;
        }
        Ok(RowOutcome {
            row: record.row,
            id: record.id.clone(),
            result: RowResult::Skipped { reason },
        })
    }

    async fn process_row(
        &self,
        ledger: &PostLedger<'_>,
        record: &PostRecord,
        now: NaiveDateTime,
    ) -> Result<RowOutcome> {
        info!("Processing post for model {}", record.model);

        let result = match self.run_pipeline(record).await {
            Ok(receipt) => {
                ledger
                    .update_cell(record.row, Column::Status, PostStatus::Posted.as_str())
                    .await?;
                ledger
                    .update_cell(record.row, Column::LastUpdated, &format_last_updated(now))
                    .await?;
                info!("Posted as {}", receipt.post_id);
                RowResult::Posted {
                    post_id: receipt.post_id,
                }
            }
            Err((stage, error)) if error.is_row_local() => {
                let message = error.to_string();
                warn!("Failed during {}: {}", stage, message);
                ledger
                    .update_cell(record.row, Column::Error, &message)
                    .await?;
                RowResult::Failed { stage, message }
            }
            Err((_, error)) => return Err(error),
        };

        Ok(RowOutcome {
            row: record.row,
            id: record.id.clone(),
            result,
        })
    }

    /// Fetch, upload and publish one row; the scratch directory is removed
    /// when this returns
    async fn run_pipeline(
        &self,
        record: &PostRecord,
    ) -> std::result::Result<PublishReceipt, (Stage, SheetcastError)> {
        let publisher = self
            .publishers
            .for_model(&record.model)
            .map_err(|e| (Stage::Credentials, e))?;

        let locators = split_locators(&record.source);
        let scratch = ScratchDir::new().map_err(|e| (Stage::Fetch, e))?;
        debug!("Fetching {} image(s)", locators.len());
        let paths = self
            .fetcher
            .fetch(&locators, &scratch)
            .await
            .map_err(|e| (Stage::Fetch, e))?;

        let media = publisher
            .upload(&paths)
            .await
            .map_err(|e| (Stage::Upload, e))?;

        publisher
            .publish(&record.description, &media)
            .await
            .map_err(|e| (Stage::Publish, e))
    }
}
