//! Image fetching for post sources
//!
//! A row's `source` cell holds comma-separated locators: either plain image
//! URLs or Google Drive share links (`.../file/d/<ID>/view`). Share links are
//! fetched through the Drive API (`files/<ID>?alt=media`) with the sweep's
//! service-account token, so files shared only with that account work too.
//!
//! Downloads land in a [`ScratchDir`] owned by the caller. The directory and
//! everything in it is removed when the `ScratchDir` is dropped, whichever way
//! the row finishes.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{FetchError, Result};

pub mod http;
pub mod mock;

pub use http::HttpImageFetcher;

/// Downloads locators into local files
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch every locator in order, one file per locator
    ///
    /// An empty slice yields an empty vector without touching the network.
    ///
    /// # Errors
    ///
    /// The first failed download aborts the whole list and its error is
    /// returned. Files already written stay in `scratch` until it is dropped.
    async fn fetch(&self, locators: &[String], scratch: &ScratchDir) -> Result<Vec<PathBuf>>;
}

/// Split a `source` cell into locators
///
/// Parts are trimmed and empty parts dropped, so `""` and `" , "` both give
/// an empty list.
pub fn split_locators(source: &str) -> Vec<String> {
    source
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// A classified image locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// Google Drive share link with its file id
    DriveFile { id: String },
    /// Anything else, fetched as-is
    Url(String),
}

impl Locator {
    pub fn parse(locator: &str) -> Self {
        const MARKER: &str = "/file/d/";

        if let Some(start) = locator.find(MARKER) {
            let rest = &locator[start + MARKER.len()..];
            let end = rest
                .find(|c| c == '/' || c == '?' || c == '#')
                .unwrap_or(rest.len());
            let id = &rest[..end];
            if !id.is_empty() {
                return Locator::DriveFile { id: id.to_string() };
            }
        }

        Locator::Url(locator.to_string())
    }

    /// URL to actually GET for this locator
    pub fn download_url(&self, drive_api_base: &str) -> String {
        match self {
            Locator::DriveFile { id } => format!(
                "{}/files/{}?alt=media&supportsAllDrives=true",
                drive_api_base.trim_end_matches('/'),
                percent_encoding::utf8_percent_encode(id, percent_encoding::NON_ALPHANUMERIC)
            ),
            Locator::Url(url) => url.clone(),
        }
    }
}

/// Image types we recognise from a response `Content-Type`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMimeType {
    Jpeg,
    Png,
    Gif,
    WebP,
}

impl ImageMimeType {
    /// Parse a MIME string, ignoring parameters such as `; charset=...`
    pub fn from_mime_str(s: &str) -> Option<Self> {
        let essence = s.split(';').next().unwrap_or("").trim().to_lowercase();
        match essence.as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/gif" => Some(Self::Gif),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::WebP => "webp",
        }
    }
}

/// Per-row scratch directory for downloaded images
///
/// File names carry a counter that only increases for the lifetime of the
/// directory, so paths never collide.
pub struct ScratchDir {
    dir: tempfile::TempDir,
    counter: AtomicUsize,
}

impl ScratchDir {
    /// Create a fresh directory under the system temp dir
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("sheetcast-")
            .tempdir()
            .map_err(|e| FetchError::Io(format!("cannot create scratch directory: {}", e)))?;
        Ok(Self {
            dir,
            counter: AtomicUsize::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Reserve the next file path with the given extension
    pub fn next_path(&self, extension: &str) -> PathBuf {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        self.dir.path().join(format!("image_{}.{}", n, extension))
    }
}
