//! Publishing clients for social platforms
//!
//! A [`MediaPublisher`] uploads local image files and publishes a caption
//! with the resulting media handles. Clients are built per ledger row by a
//! [`PublisherFactory`], since each row names the model whose credentials
//! it posts with.
//!
//! # Examples
//!
//! ```no_run
//! use libsheetcast::config::XConfig;
//! use libsheetcast::platforms::{PublisherFactory, x::XPublisherFactory};
//!
//! # async fn example() -> libsheetcast::Result<()> {
//! let factory = XPublisherFactory::new(reqwest::Client::new(), XConfig::default());
//! let publisher = factory.for_model("alice")?;
//!
//! let handles = publisher.upload(&["/tmp/cat.jpg".into()]).await?;
//! let receipt = publisher.publish("Caturday", &handles).await?;
//! println!("Posted {}", receipt.post_id);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::{MediaHandle, PublishReceipt};

pub mod mock;
pub mod oauth;
pub mod x;

/// Upload-then-publish interface to a social platform
#[async_trait]
pub trait MediaPublisher: Send + Sync {
    /// Upload a single file and return its media handle
    ///
    /// # Errors
    ///
    /// Returns a `PlatformError` describing the platform's rejection or the
    /// transport fault.
    async fn upload_one(&self, path: &Path) -> Result<MediaHandle>;

    /// Upload files in order
    ///
    /// The first failure aborts the remaining uploads. An empty list yields
    /// no handles and makes no calls, which is how text-only posts go out.
    async fn upload(&self, paths: &[PathBuf]) -> Result<Vec<MediaHandle>> {
        let mut handles = Vec::with_capacity(paths.len());
        for path in paths {
            handles.push(self.upload_one(path).await?);
        }
        Ok(handles)
    }

    /// Publish one post
    ///
    /// When `media` is empty the post carries no media parameter at all.
    async fn publish(&self, caption: &str, media: &[MediaHandle]) -> Result<PublishReceipt>;

    /// Platform name for logs
    fn name(&self) -> &str;
}

/// Builds a publisher for the credential set a row names
pub trait PublisherFactory: Send + Sync {
    /// # Errors
    ///
    /// Returns `PlatformError::Authentication` when the model's credentials
    /// are not available.
    fn for_model(&self, model: &str) -> Result<Box<dyn MediaPublisher>>;
}
