//! Core types for Sheetcast

use serde::{Deserialize, Serialize};

/// Status column value of a ledger row
///
/// Only `Scheduled -> Posted` is ever written; anything else an operator types
/// into the column is carried as `Other` and left alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostStatus {
    Scheduled,
    Posted,
    Other(String),
}

impl PostStatus {
    pub fn parse(value: &str) -> Self {
        match value {
            "Scheduled" => PostStatus::Scheduled,
            "Posted" => PostStatus::Posted,
            other => PostStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PostStatus::Scheduled => "Scheduled",
            PostStatus::Posted => "Posted",
            PostStatus::Other(s) => s,
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One data row of the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    /// 1-based ledger row; data row k lives on row k + 1
    pub row: usize,
    pub id: String,
    pub model: String,
    pub platform: String,
    pub status: PostStatus,
    pub schedule: String,
    pub source: String,
    pub description: String,
    pub last_updated: String,
    pub error: String,
}

/// Opaque identifier returned by the platform after a media upload
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaHandle(pub String);

impl MediaHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MediaHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the platform hands back for a published post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReceipt {
    pub post_id: String,
    pub text: String,
}

/// Pipeline stage a row-local failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Credentials,
    Fetch,
    Upload,
    Publish,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Credentials => write!(f, "credentials"),
            Stage::Fetch => write!(f, "fetch"),
            Stage::Upload => write!(f, "upload"),
            Stage::Publish => write!(f, "publish"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum RowResult {
    Posted { post_id: String },
    Failed { stage: Stage, message: String },
    Skipped { reason: String },
}

/// Result of handling a single ledger row during a sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowOutcome {
    pub row: usize,
    pub id: String,
    pub result: RowResult,
}

impl RowOutcome {
    pub fn is_posted(&self) -> bool {
        matches!(self.result, RowResult::Posted { .. })
    }
}
