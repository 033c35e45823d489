//! Provisioning and execution-name lookups against a mock control plane.

use readsim_runtime::error::{LogUploadError, ProvisionError};
use readsim_runtime::logs::{ControlPlaneExecutionName, ExecutionNameSource};
use readsim_runtime::provision::{ExecutionToken, Provisioner};
use readsim_runtime::runner::RuntimeConfig;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Config pointing at the mock server with a token variable unique to the test.
fn config_for(server: &MockServer, token: Option<&str>) -> RuntimeConfig {
    let var = format!("READSIM_IT_TOKEN_{}", uuid::Uuid::new_v4().simple());
    if let Some(token) = token {
        std::env::set_var(&var, token);
    }
    RuntimeConfig::default()
        .with_control_plane(server.uri())
        .with_token_env(var)
}

#[tokio::test]
async fn provision_returns_volume_name() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/provision-storage"))
        .and(header("authorization", "Latch-Execution-Token test"))
        .and(body_json(serde_json::json!({ "storage_gib": 100 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "pvc-readsim-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provisioner = Provisioner::new(&config_for(&server, Some("test"))).unwrap();
    let volume = provisioner.provision().await.unwrap();

    assert_eq!(volume.as_str(), "pvc-readsim-1");
}

#[tokio::test]
async fn provision_rejected_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/provision-storage"))
        .respond_with(ResponseTemplate::new(503).set_body_string("no capacity"))
        .expect(1)
        .mount(&server)
        .await;

    let provisioner = Provisioner::new(&config_for(&server, Some("test"))).unwrap();

    match provisioner.provision().await {
        Err(ProvisionError::Rejected { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "no capacity");
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn provision_response_without_name() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/provision-storage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "ok"
        })))
        .mount(&server)
        .await;

    let provisioner = Provisioner::new(&config_for(&server, Some("test"))).unwrap();

    assert!(matches!(
        provisioner.provision().await,
        Err(ProvisionError::InvalidResponse(_))
    ));
}

#[tokio::test]
async fn provision_without_token_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let provisioner = Provisioner::new(&config_for(&server, None)).unwrap();

    assert!(matches!(
        provisioner.provision().await,
        Err(ProvisionError::Authentication(_))
    ));
}

#[tokio::test]
async fn provision_with_explicit_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("authorization", "Latch-Execution-Token explicit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "pvc-2"
        })))
        .mount(&server)
        .await;

    let provisioner = Provisioner::new(&config_for(&server, None)).unwrap();
    let volume = provisioner
        .provision_with_token(&ExecutionToken::new("explicit"))
        .await
        .unwrap();

    assert_eq!(volume.to_string(), "pvc-2");
}

#[tokio::test]
async fn execution_name_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/execution-name"))
        .and(header("authorization", "Latch-Execution-Token test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "brave-otter-17"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let source = ControlPlaneExecutionName::new(&config_for(&server, Some("test"))).unwrap();

    assert_eq!(source.resolve().await.unwrap(), "brave-otter-17");
}

#[tokio::test]
async fn execution_name_lookup_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/execution-name"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let source = ControlPlaneExecutionName::new(&config_for(&server, Some("test"))).unwrap();

    assert!(matches!(
        source.resolve().await,
        Err(LogUploadError::Resolution(_))
    ));
}
