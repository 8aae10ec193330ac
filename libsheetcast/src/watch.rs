//! Drive push-notification channel registration
//!
//! Registers a `web_hook` channel on a Drive folder so changes to it can
//! trigger a sweep. This is a one-shot setup helper and is not part of the
//! posting path.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

use crate::credentials::TokenSource;
use crate::error::{Result, SheetcastError};

/// Secret holding the key used for channel registration
pub const WATCH_SECRET_NAME: &str = "service-account-appspot-credentials";

/// Default channel id
pub const DEFAULT_CHANNEL_ID: &str = "drive-watcher";

const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Channel to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRequest {
    pub id: String,
    pub address: String,
}

#[derive(Debug, Serialize)]
struct WatchBody<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    address: &'a str,
    payload: bool,
}

/// Channel returned by Drive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelDescriptor {
    pub id: String,
    pub resource_id: String,
    #[serde(default)]
    pub resource_uri: String,
    /// Milliseconds since the epoch, as a decimal string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<String>,
}

/// Register a push-notification channel on `folder_id`
///
/// # Errors
///
/// Returns `SheetcastError::InvalidInput` for an empty folder id or address,
/// and `SheetcastError::Watch` when Drive cannot be reached or refuses the
/// request.
pub async fn register_watch(
    credentials: &dyn TokenSource,
    client: &Client,
    folder_id: &str,
    channel: &ChannelRequest,
) -> Result<ChannelDescriptor> {
    register_watch_at(DRIVE_FILES_URL, credentials, client, folder_id, channel).await
}

/// [`register_watch`] against an alternative Drive files endpoint
pub async fn register_watch_at(
    files_base: &str,
    credentials: &dyn TokenSource,
    client: &Client,
    folder_id: &str,
    channel: &ChannelRequest,
) -> Result<ChannelDescriptor> {
    let folder_id = folder_id.trim();
    if folder_id.is_empty() {
        return Err(SheetcastError::InvalidInput("folder id is empty".to_string()));
    }
    if channel.address.trim().is_empty() {
        return Err(SheetcastError::InvalidInput(
            "notification address is empty".to_string(),
        ));
    }

    let token = credentials.bearer_token().await?;
    let url = watch_url(files_base, folder_id);
    info!("Registering channel '{}' on folder {}", channel.id, folder_id);

    let response = client
        .post(&url)
        .bearer_auth(&token)
        .json(&watch_body(channel))
        .timeout(HTTP_TIMEOUT)
        .send()
        .await
        .map_err(|e| SheetcastError::Watch(format!("request failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(SheetcastError::Watch(format!(
            "rejected with HTTP {}: {}",
            status, text
        )));
    }

    let descriptor: ChannelDescriptor = response
        .json()
        .await
        .map_err(|e| SheetcastError::Watch(format!("bad channel response: {}", e)))?;

    info!(
        "Channel {} registered for resource {}",
        descriptor.id, descriptor.resource_id
    );
    Ok(descriptor)
}

fn watch_url(files_base: &str, folder_id: &str) -> String {
    format!(
        "{}/{}/watch",
        files_base.trim_end_matches('/'),
        percent_encoding::utf8_percent_encode(folder_id, percent_encoding::NON_ALPHANUMERIC)
    )
}

fn watch_body(channel: &ChannelRequest) -> WatchBody<'_> {
    WatchBody {
        id: &channel.id,
        kind: "web_hook",
        address: &channel.address,
        payload: true,
    }
}
