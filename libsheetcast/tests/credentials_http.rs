//! Secret Manager and metadata-server clients against a loopback stub

mod common;

use base64::Engine;
use secrecy::ExposeSecret;
use serial_test::serial;

use common::{Recorded, Reply};
use libsheetcast::credentials::{AmbientIdentity, SecretManager};
use libsheetcast::error::{CredentialError, SheetcastError};

const SECRET_PATH: &str = "/v1/projects/demo-project/secrets/social-schedule-secret/versions/latest:access";

fn secret_reply(data: &[u8]) -> Reply {
    let encoded = base64::engine::general_purpose::STANDARD.encode(data);
    Reply::json(
        200,
        serde_json::json!({
            "name": "projects/123/secrets/social-schedule-secret/versions/4",
            "payload": { "data": encoded }
        }),
    )
}

fn clear_ambient_env() {
    for var in ["GOOGLE_CLOUD_PROJECT", "GCP_PROJECT", "GOOGLE_OAUTH_ACCESS_TOKEN"] {
        std::env::remove_var(var);
    }
}

#[tokio::test]
async fn test_secret_access_returns_decoded_payload() {
    let (addr, seen) = common::spawn(|_: &Recorded| secret_reply(br#"{"type":"service_account"}"#)).await;
    let manager = SecretManager::with_base(reqwest::Client::new(), &format!("http://{}/v1/", addr));

    let secret = manager
        .access("demo-project", "social-schedule-secret", "latest", "ambient-token")
        .await
        .unwrap();

    assert_eq!(secret.expose_secret(), r#"{"type":"service_account"}"#);
    let requests = seen.lock().unwrap();
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].target, SECRET_PATH);
    assert_eq!(requests[0].header("authorization"), Some("Bearer ambient-token"));
}

#[tokio::test]
async fn test_secret_access_denied_is_credential_error() {
    let (addr, _) = common::spawn(|_: &Recorded| {
        Reply::json(
            403,
            serde_json::json!({"error": {"code": 403, "status": "PERMISSION_DENIED"}}),
        )
    })
    .await;
    let manager = SecretManager::with_base(reqwest::Client::new(), &format!("http://{}/v1", addr));

    let err = manager
        .access("demo-project", "social-schedule-secret", "latest", "ambient-token")
        .await
        .unwrap_err();

    match &err {
        SheetcastError::Credential(CredentialError::SecretAccess(message)) => {
            assert!(message.contains("social-schedule-secret"));
            assert!(message.contains("403"));
            assert!(message.contains("PERMISSION_DENIED"));
        }
        other => panic!("expected secret access error, got {:?}", other),
    }
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn test_secret_payload_must_be_utf8() {
    let (addr, _) = common::spawn(|_: &Recorded| secret_reply(&[0xff, 0xfe, 0x00, 0x80])).await;
    let manager = SecretManager::with_base(reqwest::Client::new(), &format!("http://{}/v1", addr));

    let err = manager
        .access("demo-project", "social-schedule-secret", "latest", "ambient-token")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SheetcastError::Credential(CredentialError::Malformed(_))
    ));
}

#[tokio::test]
#[serial]
async fn test_ambient_identity_falls_back_to_metadata_server() {
    clear_ambient_env();
    let (addr, seen) = common::spawn(|request: &Recorded| {
        if request.header("metadata-flavor") != Some("Google") {
            return Reply::text(403, "missing Metadata-Flavor");
        }
        match request.target.as_str() {
            "/computeMetadata/v1/project/project-id" => Reply::text(200, "demo-project\n"),
            "/computeMetadata/v1/instance/service-accounts/default/token" => Reply::json(
                200,
                serde_json::json!({
                    "access_token": "metadata-token",
                    "expires_in": 3599,
                    "token_type": "Bearer"
                }),
            ),
            _ => Reply::text(404, "not found"),
        }
    })
    .await;
    let identity = AmbientIdentity::with_base(
        reqwest::Client::new(),
        &format!("http://{}/computeMetadata/v1", addr),
    );

    assert_eq!(identity.project_id().await.unwrap(), "demo-project");
    assert_eq!(identity.access_token().await.unwrap(), "metadata-token");

    let requests = seen.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|r| r.method == "GET"));
}

#[tokio::test]
#[serial]
async fn test_ambient_identity_prefers_environment() {
    clear_ambient_env();
    std::env::set_var("GOOGLE_CLOUD_PROJECT", "env-project");
    std::env::set_var("GOOGLE_OAUTH_ACCESS_TOKEN", "env-token");
    let (addr, seen) = common::spawn(|_: &Recorded| Reply::text(500, "unused")).await;
    let identity = AmbientIdentity::with_base(reqwest::Client::new(), &format!("http://{}", addr));

    let project = identity.project_id().await;
    let token = identity.access_token().await;
    clear_ambient_env();

    assert_eq!(project.unwrap(), "env-project");
    assert_eq!(token.unwrap(), "env-token");
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn test_metadata_server_error_is_ambient_identity_error() {
    clear_ambient_env();
    let (addr, _) = common::spawn(|_: &Recorded| Reply::text(404, "not found")).await;
    let identity = AmbientIdentity::with_base(reqwest::Client::new(), &format!("http://{}", addr));

    let err = identity.project_id().await.unwrap_err();
    assert!(matches!(
        err,
        SheetcastError::Credential(CredentialError::AmbientIdentity(_))
    ));
    assert_eq!(err.exit_code(), 2);
}
