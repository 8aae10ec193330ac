//! Mock publisher implementation for testing
//!
//! Simulates upload and publish successes and failures while recording every
//! call. It is available in all builds so integration tests can exercise the
//! row processor without credentials or network access.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{PlatformError, Result};
use crate::platforms::{MediaPublisher, PublisherFactory};
use crate::types::{MediaHandle, PublishReceipt};

/// A recorded publish call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishCall {
    pub model: String,
    pub caption: String,
    pub media: Vec<MediaHandle>,
}

#[derive(Debug, Default)]
struct MockRecord {
    uploads: Vec<PathBuf>,
    publishes: Vec<PublishCall>,
    models_requested: Vec<String>,
    next_id: usize,
}

/// Configuration for mock publisher behavior
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Fail the upload at this index (0-based) within a call
    pub upload_fail_at: Option<usize>,

    /// Error to return from publish, if any
    pub publish_error: Option<String>,

    /// Models whose credentials are "missing"
    pub missing_models: HashSet<String>,
}

/// Publisher factory whose publishers share one call record
#[derive(Debug, Clone, Default)]
pub struct MockPublisherFactory {
    config: MockConfig,
    record: Arc<Mutex<MockRecord>>,
}

impl MockPublisherFactory {
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            record: Arc::default(),
        }
    }

    /// Every call succeeds
    pub fn success() -> Self {
        Self::new(MockConfig::default())
    }

    /// Upload number `index` of every row fails
    pub fn upload_failure(index: usize) -> Self {
        Self::new(MockConfig {
            upload_fail_at: Some(index),
            ..Default::default()
        })
    }

    /// Every publish fails with `error`
    pub fn publish_failure(error: &str) -> Self {
        Self::new(MockConfig {
            publish_error: Some(error.to_string()),
            ..Default::default()
        })
    }

    /// Treat `model` as having no credentials
    pub fn without_credentials_for(mut self, model: &str) -> Self {
        self.config.missing_models.insert(model.to_string());
        self
    }

    pub fn upload_count(&self) -> usize {
        self.record.lock().unwrap().uploads.len()
    }

    pub fn uploads(&self) -> Vec<PathBuf> {
        self.record.lock().unwrap().uploads.clone()
    }

    pub fn publish_count(&self) -> usize {
        self.record.lock().unwrap().publishes.len()
    }

    pub fn publishes(&self) -> Vec<PublishCall> {
        self.record.lock().unwrap().publishes.clone()
    }

    pub fn models_requested(&self) -> Vec<String> {
        self.record.lock().unwrap().models_requested.clone()
    }
}

impl PublisherFactory for MockPublisherFactory {
    fn for_model(&self, model: &str) -> Result<Box<dyn MediaPublisher>> {
        self.record
            .lock()
            .unwrap()
            .models_requested
            .push(model.to_string());

        if self.config.missing_models.contains(model) {
            return Err(PlatformError::Authentication(format!(
                "Missing X credentials for model '{}'",
                model
            ))
            .into());
        }

        Ok(Box::new(MockPublisher {
            model: model.to_string(),
            config: self.config.clone(),
            record: self.record.clone(),
            uploads_in_call: Mutex::new(0),
        }))
    }
}

/// Mock publisher handed out by [`MockPublisherFactory`]
pub struct MockPublisher {
    model: String,
    config: MockConfig,
    record: Arc<Mutex<MockRecord>>,
    uploads_in_call: Mutex<usize>,
}

#[async_trait]
impl MediaPublisher for MockPublisher {
    async fn upload_one(&self, path: &Path) -> Result<MediaHandle> {
        let index = {
            let mut count = self.uploads_in_call.lock().unwrap();
            let index = *count;
            *count += 1;
            index
        };

        if self.config.upload_fail_at == Some(index) {
            return Err(PlatformError::Posting(format!(
                "Mock upload failed for {}",
                path.display()
            ))
            .into());
        }

        if !path.exists() {
            return Err(PlatformError::Posting(format!(
                "cannot read {}: not found",
                path.display()
            ))
            .into());
        }

        let mut record = self.record.lock().unwrap();
        record.uploads.push(path.to_path_buf());
        record.next_id += 1;
        Ok(MediaHandle(format!("media-{}", record.next_id)))
    }

    async fn publish(&self, caption: &str, media: &[MediaHandle]) -> Result<PublishReceipt> {
        let mut record = self.record.lock().unwrap();
        record.publishes.push(PublishCall {
            model: self.model.clone(),
            caption: caption.to_string(),
            media: media.to_vec(),
        });

        if let Some(error) = &self.config.publish_error {
            return Err(PlatformError::Posting(error.clone()).into());
        }

        record.next_id += 1;
        Ok(PublishReceipt {
            post_id: format!("post-{}", record.next_id),
            text: caption.to_string(),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}
