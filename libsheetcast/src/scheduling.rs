//! Schedule parsing and row eligibility
//!
//! Ledger timestamps are naive local times in `YYYY-MM-DD HH:MM:SS`. The
//! sweep compares them against a single `now` captured when it starts.

use chrono::NaiveDateTime;

use crate::types::{PostRecord, PostStatus};
use crate::{SheetcastError, Result};

pub const SCHEDULE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format written into the `last_updated` column
pub const LAST_UPDATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Where a row stands relative to the current sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    /// Due now; process it
    Due,
    /// Scheduled for later
    Future,
    /// Not a scheduled row for our platform; never touched
    Ignored,
    /// Scheduled for our platform but the timestamp does not parse
    Unparseable(String),
}

/// Parse a ledger schedule value
///
/// Surrounding whitespace is tolerated since spreadsheet cells often carry it.
///
/// # Errors
///
/// Returns `InvalidInput` when the value is not in `YYYY-MM-DD HH:MM:SS`.
pub fn parse_schedule(input: &str) -> Result<NaiveDateTime> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SheetcastError::InvalidInput(
            "Schedule cannot be empty".to_string(),
        ));
    }

    NaiveDateTime::parse_from_str(trimmed, SCHEDULE_FORMAT).map_err(|e| {
        SheetcastError::InvalidInput(format!(
            "Could not parse schedule '{}' (expected YYYY-MM-DD HH:MM:SS): {}",
            trimmed, e
        ))
    })
}

/// Classify a row against the eligibility predicate
///
/// A row is due iff its status is `Scheduled`, its platform matches and its
/// schedule is at or before `now`.
pub fn classify(record: &PostRecord, platform: &str, now: NaiveDateTime) -> Eligibility {
    if record.status != PostStatus::Scheduled || record.platform != platform {
        return Eligibility::Ignored;
    }

    match parse_schedule(&record.schedule) {
        Ok(at) if at <= now => Eligibility::Due,
        Ok(_) => Eligibility::Future,
        Err(e) => Eligibility::Unparseable(e.to_string()),
    }
}

pub fn format_last_updated(now: NaiveDateTime) -> String {
    now.format(LAST_UPDATED_FORMAT).to_string()
}

/// Parse a sweep interval such as "15m" or "1h 30m"
pub fn parse_interval(input: &str) -> Result<std::time::Duration> {
    let duration = humantime::parse_duration(input.trim()).map_err(|e| {
        SheetcastError::InvalidInput(format!("Could not parse interval '{}': {}", input, e))
    })?;

    if duration.as_secs() == 0 {
        return Err(SheetcastError::InvalidInput(
            "Interval must be at least one second".to_string(),
        ));
    }

    Ok(duration)
}
