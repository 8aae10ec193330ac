//! Mock image fetcher for testing

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::error::{FetchError, Result};
use crate::fetch::{ImageFetcher, ScratchDir};

/// Writes placeholder files instead of downloading
///
/// Clones share call records.
#[derive(Debug, Clone, Default)]
pub struct MockFetcher {
    /// Fail on the locator at this index within a call
    fail_at: Option<usize>,
    calls: Arc<Mutex<Vec<Vec<String>>>>,
    fetched: Arc<Mutex<Vec<String>>>,
    scratch_dirs: Arc<Mutex<Vec<PathBuf>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail on the `index`-th locator (0-based) of every call
    pub fn failing_at(index: usize) -> Self {
        Self {
            fail_at: Some(index),
            ..Self::default()
        }
    }

    /// Number of `fetch` invocations, including empty ones
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Locator lists passed to each call
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    /// Locators that were actually "downloaded"
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    /// Scratch directories handed to the fetcher, in call order
    pub fn scratch_dirs(&self) -> Vec<PathBuf> {
        self.scratch_dirs.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageFetcher for MockFetcher {
    async fn fetch(&self, locators: &[String], scratch: &ScratchDir) -> Result<Vec<PathBuf>> {
        self.calls.lock().unwrap().push(locators.to_vec());
        self.scratch_dirs
            .lock()
            .unwrap()
            .push(scratch.path().to_path_buf());

        let mut paths = Vec::new();
        for (index, locator) in locators.iter().enumerate() {
            if self.fail_at == Some(index) {
                return Err(FetchError::Http {
                    locator: locator.clone(),
                    status: 404,
                }
                .into());
            }
            let path = scratch.next_path("jpg");
            std::fs::write(&path, locator.as_bytes())
                .map_err(|e| FetchError::Io(e.to_string()))?;
            self.fetched.lock().unwrap().push(locator.clone());
            paths.push(path);
        }
        Ok(paths)
    }
}
