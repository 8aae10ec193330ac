//! In-memory ledger for tests
//!
//! Available in all builds so integration tests and downstream crates can
//! drive the row processor without a spreadsheet.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::error::{LedgerError, Result};
use crate::ledger::LedgerStore;

#[derive(Debug, Default)]
struct MockLedgerState {
    values: Vec<Vec<String>>,
    writes: Vec<(usize, usize, String)>,
    read_count: usize,
}

/// Ledger backed by a vector of rows
///
/// Clones share state, so a test can keep a handle while the processor owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct MockLedger {
    state: Arc<Mutex<MockLedgerState>>,
    fail_reads: Option<String>,
    fail_writes: Option<String>,
}

impl MockLedger {
    /// Create a ledger from rows, header first
    pub fn new(values: Vec<Vec<String>>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockLedgerState {
                values,
                ..Default::default()
            })),
            ..Default::default()
        }
    }

    /// Create a ledger whose reads fail
    pub fn read_failure(error: &str) -> Self {
        Self {
            fail_reads: Some(error.to_string()),
            ..Self::new(Vec::new())
        }
    }

    /// Make every write fail with the given message
    pub fn with_write_failure(mut self, error: &str) -> Self {
        self.fail_writes = Some(error.to_string());
        self
    }

    /// All successful writes as (row, column, value), in order
    pub fn writes(&self) -> Vec<(usize, usize, String)> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn write_count(&self) -> usize {
        self.state.lock().unwrap().writes.len()
    }

    pub fn read_count(&self) -> usize {
        self.state.lock().unwrap().read_count
    }

    /// Current value of a cell addressed by 1-based row and header name
    pub fn cell(&self, row: usize, header: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        let column = state.values.first()?.iter().position(|h| h == header)?;
        state
            .values
            .get(row - 1)
            .map(|r| r.get(column).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl LedgerStore for MockLedger {
    async fn read_values(&self) -> Result<Vec<Vec<String>>> {
        if let Some(error) = &self.fail_reads {
            return Err(LedgerError::Read(error.clone()).into());
        }
        let mut state = self.state.lock().unwrap();
        state.read_count += 1;
        Ok(state.values.clone())
    }

    async fn write_cell(&self, row: usize, column: usize, value: &str) -> Result<()> {
        if let Some(error) = &self.fail_writes {
            return Err(LedgerError::Write(error.clone()).into());
        }
        if row == 0 || column == 0 {
            return Err(LedgerError::Write(format!(
                "invalid cell address ({}, {})",
                row, column
            ))
            .into());
        }

        let mut state = self.state.lock().unwrap();
        if state.values.len() < row {
            state.values.resize(row, Vec::new());
        }
        let cells = &mut state.values[row - 1];
        if cells.len() < column {
            cells.resize(column, String::new());
        }
        cells[column - 1] = value.to_string();
        state.writes.push((row, column, value.to_string()));
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
