//! The post ledger: a spreadsheet of scheduled posts
//!
//! Storage backends implement [`LedgerStore`], which only knows about raw
//! cell values. [`PostLedger`] layers the header-name column resolution on
//! top: columns are located once per pass from row 1, so the order of columns
//! in the sheet does not matter, only their names.

use async_trait::async_trait;

use crate::error::{LedgerError, Result};
use crate::types::{PostRecord, PostStatus};

pub mod mock;
pub mod sheets;

/// Raw cell access to a ledger table
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Read the whole table, header row first
    ///
    /// Rows may be ragged; trailing empty cells are commonly omitted by
    /// spreadsheet APIs.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Read` on any transport fault.
    async fn read_values(&self) -> Result<Vec<Vec<String>>>;

    /// Overwrite a single cell; `row` and `column` are 1-based
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Write` on any transport fault. Callers do not retry.
    async fn write_cell(&self, row: usize, column: usize, value: &str) -> Result<()>;

    /// Short backend name for logs
    fn name(&self) -> &str;
}

/// Ledger columns the sweep reads or writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Id,
    Model,
    Platform,
    Status,
    Schedule,
    Source,
    Description,
    LastUpdated,
    Error,
}

impl Column {
    pub const ALL: [Column; 9] = [
        Column::Id,
        Column::Model,
        Column::Platform,
        Column::Status,
        Column::Schedule,
        Column::Source,
        Column::Description,
        Column::LastUpdated,
        Column::Error,
    ];

    /// Header name as it appears in row 1
    pub fn header(&self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::Model => "model",
            Column::Platform => "platform",
            Column::Status => "status",
            Column::Schedule => "schedule",
            Column::Source => "source",
            Column::Description => "description",
            Column::LastUpdated => "last_updated",
            Column::Error => "error",
        }
    }
}

/// 1-based column positions resolved from the header row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    positions: [usize; 9],
}

impl ColumnMap {
    /// Locate every required column in the header row
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::MissingColumn` naming the first absent header.
    pub fn from_header(header: &[String]) -> Result<Self> {
        let mut positions = [0usize; 9];
        for (slot, column) in Column::ALL.iter().enumerate() {
            let index = header
                .iter()
                .position(|name| name.trim() == column.header())
                .ok_or_else(|| LedgerError::MissingColumn(column.header().to_string()))?;
            positions[slot] = index + 1;
        }
        Ok(Self { positions })
    }

    /// 1-based position of a column
    pub fn position(&self, column: Column) -> usize {
        // Declaration order of `Column` matches `Column::ALL`
        self.positions[column as usize]
    }

    fn cell<'a>(&self, row: &'a [String], column: Column) -> &'a str {
        row.get(self.position(column) - 1)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Build a record from one data row; `row_number` is the 1-based ledger row
    pub fn record(&self, row_number: usize, row: &[String]) -> PostRecord {
        PostRecord {
            row: row_number,
            id: self.cell(row, Column::Id).to_string(),
            model: self.cell(row, Column::Model).to_string(),
            platform: self.cell(row, Column::Platform).to_string(),
            status: PostStatus::parse(self.cell(row, Column::Status)),
            schedule: self.cell(row, Column::Schedule).to_string(),
            source: self.cell(row, Column::Source).to_string(),
            description: self.cell(row, Column::Description).to_string(),
            last_updated: self.cell(row, Column::LastUpdated).to_string(),
            error: self.cell(row, Column::Error).to_string(),
        }
    }
}

/// Column-aware view of a ledger for one processing pass
pub struct PostLedger<'a> {
    store: &'a dyn LedgerStore,
    columns: ColumnMap,
}

impl<'a> PostLedger<'a> {
    /// Read the header and every data row
    ///
    /// Fully blank rows are skipped but still count towards row numbering.
    pub async fn read_all(store: &'a dyn LedgerStore) -> Result<(Self, Vec<PostRecord>)> {
        let values = store.read_values().await?;
        let mut rows = values.into_iter();

        let header = rows
            .next()
            .ok_or_else(|| LedgerError::Read("ledger has no header row".to_string()))?;
        let columns = ColumnMap::from_header(&header)?;

        let records = rows
            .enumerate()
            .filter(|(_, row)| row.iter().any(|cell| !cell.trim().is_empty()))
            .map(|(index, row)| columns.record(index + 2, &row))
            .collect::<Vec<_>>();

        tracing::debug!(
            "Read {} record(s) from {} ledger",
            records.len(),
            store.name()
        );

        Ok((Self { store, columns }, records))
    }

    pub fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    /// Overwrite one named cell of a ledger row
    pub async fn update_cell(&self, row: usize, column: Column, value: &str) -> Result<()> {
        self.store
            .write_cell(row, self.columns.position(column), value)
            .await
    }
}
