//! Sheetcast - spreadsheet-driven scheduled posting
//!
//! This library reads scheduled posts from a Google Sheets ledger, fetches
//! their images, publishes them to X with per-model credentials, and records
//! each outcome back in the ledger.

pub mod config;
pub mod credentials;
pub mod error;
pub mod fetch;
pub mod ledger;
pub mod lock;
pub mod logging;
pub mod platforms;
pub mod processor;
pub mod scheduling;
pub mod sweep;
pub mod types;
pub mod watch;

// Re-export commonly used types
pub use config::Config;
pub use credentials::{GoogleCredentials, PlatformCredentials, ServiceAccountKey, TokenSource};
pub use error::{Result, SheetcastError};
pub use ledger::{Column, LedgerStore, PostLedger};
pub use lock::InvocationLock;
pub use processor::RowProcessor;
pub use sweep::{run_sweep, SUMMARY};
pub use types::{PostRecord, PostStatus, RowOutcome, RowResult, Stage};
