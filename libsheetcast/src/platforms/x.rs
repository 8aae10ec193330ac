//! X (Twitter) publisher
//!
//! Media goes through the v1.1 upload endpoint as multipart form data; posts
//! go through the v2 `POST /2/tweets` endpoint. Both are signed with the
//! model's OAuth 1.0a user credentials. There is no retry and no waiting on
//! rate limits: a 429 comes back as `PlatformError::RateLimit` and the row is
//! retried by the next sweep.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::config::XConfig;
use crate::credentials::PlatformCredentials;
use crate::error::{PlatformError, Result};
use crate::platforms::oauth::authorization_header;
use crate::platforms::{MediaPublisher, PublisherFactory};
use crate::types::{MediaHandle, PublishReceipt};

/// Longest slice of an error body carried into error messages
const MAX_ERROR_BODY: usize = 500;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    media_id_string: String,
}

#[derive(Debug, Serialize)]
struct TweetMedia<'a> {
    media_ids: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct TweetRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    media: Option<TweetMedia<'a>>,
}

#[derive(Debug, Deserialize)]
struct TweetData {
    id: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct TweetResponse {
    data: TweetData,
}

fn tweet_request<'a>(caption: &'a str, media: &'a [MediaHandle]) -> TweetRequest<'a> {
    TweetRequest {
        text: caption,
        media: if media.is_empty() {
            None
        } else {
            Some(TweetMedia {
                media_ids: media.iter().map(MediaHandle::as_str).collect(),
            })
        },
    }
}

/// X client for one model's account
pub struct XClient {
    client: Client,
    credentials: PlatformCredentials,
    api_base: String,
    upload_base: String,
    timeout: Duration,
}

impl XClient {
    pub fn new(client: Client, credentials: PlatformCredentials, config: &XConfig) -> Self {
        Self {
            client,
            credentials,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            upload_base: config.upload_base.trim_end_matches('/').to_string(),
            timeout: config.timeout(),
        }
    }

    fn upload_url(&self) -> String {
        format!("{}/1.1/media/upload.json", self.upload_base)
    }

    fn tweets_url(&self) -> String {
        format!("{}/2/tweets", self.api_base)
    }
}

#[async_trait]
impl MediaPublisher for XClient {
    async fn upload_one(&self, path: &Path) -> Result<MediaHandle> {
        debug!("Uploading media {}", path.display());

        let bytes = tokio::fs::read(path).await.map_err(|e| {
            PlatformError::Posting(format!("cannot read {}: {}", path.display(), e))
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "image".to_string());

        let form = reqwest::multipart::Form::new().part(
            "media",
            reqwest::multipart::Part::bytes(bytes).file_name(file_name),
        );

        let url = self.upload_url();
        let auth = authorization_header(&self.credentials, "POST", &url, &[])?;

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, auth)
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| map_transport_error(e, "upload media"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| map_transport_error(e, "upload media"))?;

        if !status.is_success() {
            return Err(map_status(status, &body, "upload media").into());
        }

        let parsed: UploadResponse = serde_json::from_str(&body).map_err(|e| {
            PlatformError::Posting(format!("X upload response parse error: {}", e))
        })?;

        debug!("Media uploaded: {}", parsed.media_id_string);
        Ok(MediaHandle(parsed.media_id_string))
    }

    async fn publish(&self, caption: &str, media: &[MediaHandle]) -> Result<PublishReceipt> {
        let url = self.tweets_url();
        let auth = authorization_header(&self.credentials, "POST", &url, &[])?;

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, auth)
            .json(&tweet_request(caption, media))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| map_transport_error(e, "create post"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| map_transport_error(e, "create post"))?;

        if !status.is_success() {
            return Err(map_status(status, &body, "create post").into());
        }

        let parsed: TweetResponse = serde_json::from_str(&body).map_err(|e| {
            PlatformError::Posting(format!("X post response parse error: {}", e))
        })?;

        Ok(PublishReceipt {
            post_id: parsed.data.id,
            text: parsed.data.text,
        })
    }

    fn name(&self) -> &str {
        "x"
    }
}

/// Builds an [`XClient`] from `{MODEL}_*` environment variables
pub struct XPublisherFactory {
    client: Client,
    config: XConfig,
}

impl XPublisherFactory {
    pub fn new(client: Client, config: XConfig) -> Self {
        Self { client, config }
    }
}

impl PublisherFactory for XPublisherFactory {
    fn for_model(&self, model: &str) -> Result<Box<dyn MediaPublisher>> {
        debug!("Setting up X client for model {}", model);
        let credentials = PlatformCredentials::from_env(model)?;
        Ok(Box::new(XClient::new(
            self.client.clone(),
            credentials,
            &self.config,
        )))
    }
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((index, _)) => &body[..index],
        None => body,
    }
}

/// Map a non-success X response to a `PlatformError`
///
/// - 401 → `Authentication`
/// - 400, 403, 422 → `Validation` (X uses 403 for policy rejections such as
///   duplicate content)
/// - 429 → `RateLimit`
/// - 5xx → `Network`
/// - anything else → `Posting`
fn map_status(status: StatusCode, body: &str, context: &str) -> PlatformError {
    let body = truncate(body.trim());
    match status.as_u16() {
        401 => PlatformError::Authentication(format!(
            "X rejected credentials ({}): HTTP {}: {}",
            context, status, body
        )),
        400 | 403 | 422 => PlatformError::Validation(format!(
            "X rejected request ({}): HTTP {}: {}",
            context, status, body
        )),
        429 => PlatformError::RateLimit(format!(
            "X rate limit hit ({}): HTTP {}: {}",
            context, status, body
        )),
        500..=599 => PlatformError::Network(format!(
            "X server error ({}): HTTP {}: {}",
            context, status, body
        )),
        _ => PlatformError::Posting(format!(
            "X request failed ({}): HTTP {}: {}",
            context, status, body
        )),
    }
}

fn map_transport_error(error: reqwest::Error, context: &str) -> PlatformError {
    if error.is_timeout() {
        PlatformError::Network(format!("X request timed out ({}): {}", context, error))
    } else {
        PlatformError::Network(format!("X request failed ({}): {}", context, error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tweet_request_omits_media_when_empty() {
        let json = serde_json::to_value(tweet_request("hello", &[])).unwrap();
        assert_eq!(json, serde_json::json!({ "text": "hello" }));
    }

    #[test]
    fn test_tweet_request_with_media() {
        let handles = vec![MediaHandle("111".to_string()), MediaHandle("222".to_string())];
        let json = serde_json::to_value(tweet_request("pics", &handles)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "text": "pics", "media": { "media_ids": ["111", "222"] } })
        );
    }

    #[test]
    fn test_map_status() {
        assert!(matches!(
            map_status(StatusCode::UNAUTHORIZED, "", "create post"),
            PlatformError::Authentication(_)
        ));
        assert!(matches!(
            map_status(StatusCode::FORBIDDEN, "duplicate content", "create post"),
            PlatformError::Validation(_)
        ));
        assert!(matches!(
            map_status(StatusCode::TOO_MANY_REQUESTS, "", "upload media"),
            PlatformError::RateLimit(_)
        ));
        assert!(matches!(
            map_status(StatusCode::BAD_GATEWAY, "", "upload media"),
            PlatformError::Network(_)
        ));
        assert!(matches!(
            map_status(StatusCode::NOT_FOUND, "", "upload media"),
            PlatformError::Posting(_)
        ));
    }

    #[test]
    fn test_map_status_includes_context_and_body() {
        let error = map_status(
            StatusCode::FORBIDDEN,
            r#"{"detail":"You are not allowed to create a Tweet with duplicate content."}"#,
            "create post",
        );
        let message = error.to_string();
        assert!(message.contains("create post"));
        assert!(message.contains("duplicate content"));
    }

    #[test]
    fn test_truncate_long_bodies() {
        let body = "é".repeat(MAX_ERROR_BODY + 10);
        assert_eq!(truncate(&body).chars().count(), MAX_ERROR_BODY);
        assert_eq!(truncate("short"), "short");
    }

    #[test]
    fn test_urls_strip_trailing_slash() {
        let config = XConfig {
            api_base: "http://127.0.0.1:8080/".to_string(),
            upload_base: "http://127.0.0.1:8081/".to_string(),
            timeout_secs: 5,
        };
        let credentials = PlatformCredentials::from_lookup("t", |name| Some(name.to_string())).unwrap();
        let client = XClient::new(Client::new(), credentials, &config);
        assert_eq!(client.tweets_url(), "http://127.0.0.1:8080/2/tweets");
        assert_eq!(client.upload_url(), "http://127.0.0.1:8081/1.1/media/upload.json");
    }
}
