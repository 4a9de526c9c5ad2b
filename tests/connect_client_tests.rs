//! Mock HTTP tests for ConnectClient.
//!
//! These tests cover:
//! - Request shape for snapshot upload and camera registration
//! - Error mapping for non-2xx responses
//! - Transport failures

use connect_cam::camera::CameraConfig;
use connect_cam::capture::Frame;
use connect_cam::connect::{ConnectApi, ConnectClient, ConnectError, Credentials};
use connect_cam::devices::Device;
use wiremock::matchers::{body_bytes, body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0xFF, 0xD9];

fn client_for(server: &MockServer) -> ConnectClient {
    let credentials = Credentials::new("secret-token").unwrap();
    ConnectClient::with_base_url(credentials, server.uri()).unwrap()
}

fn frame() -> Frame {
    Frame::new(JPEG.to_vec()).unwrap()
}

// === Snapshot Upload ===

#[tokio::test]
async fn test_upload_snapshot_sends_put_with_headers_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/c/snapshot"))
        .and(header("Content-Type", "image/jpg"))
        .and(header("Token", "secret-token"))
        .and(header("Fingerprint", "pi-prusa-cam-device"))
        .and(body_bytes(JPEG.to_vec()))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.upload_snapshot(frame()).await.unwrap();
}

#[tokio::test]
async fn test_upload_snapshot_custom_fingerprint() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/c/snapshot"))
        .and(header("Fingerprint", "garage-printer-cam"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let credentials = Credentials::with_fingerprint("secret-token", "garage-printer-cam").unwrap();
    let client = ConnectClient::with_base_url(credentials, server.uri()).unwrap();
    client.upload_snapshot(frame()).await.unwrap();
}

#[tokio::test]
async fn test_upload_snapshot_error_with_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/c/snapshot"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "code": "UNAUTHORIZED",
            "message": "Invalid token"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.upload_snapshot(frame()).await.unwrap_err();

    match err {
        ConnectError::Api { status, body } => {
            assert_eq!(status, 401);
            let body = body.expect("JSON error body should be parsed");
            assert_eq!(body["code"], "UNAUTHORIZED");
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_upload_snapshot_error_without_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/c/snapshot"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.upload_snapshot(frame()).await.unwrap_err();

    assert!(matches!(err, ConnectError::Api { status: 503, body: None }));
    assert_eq!(err.status(), Some(503));
}

#[tokio::test]
async fn test_upload_snapshot_is_single_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/c/snapshot"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.upload_snapshot(frame()).await.is_err());
}

#[tokio::test]
async fn test_upload_snapshot_connection_refused() {
    let credentials = Credentials::new("secret-token").unwrap();
    let client =
        ConnectClient::with_base_url(credentials, "http://127.0.0.1:9".to_string()).unwrap();

    let err = client.upload_snapshot(frame()).await.unwrap_err();
    assert!(matches!(err, ConnectError::Http(_)));
    assert_eq!(err.status(), None);
}

// === Camera Registration ===

#[tokio::test]
async fn test_update_camera_info_sends_config_json() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/c/info"))
        .and(header("Token", "secret-token"))
        .and(header("Fingerprint", "pi-prusa-cam-device"))
        .and(body_json(serde_json::json!({
            "config": {
                "name": "Prusa Pi Camera",
                "path": "/dev/video0",
                "driver": "V4L2",
                "trigger_scheme": "THIRTY_SEC",
                "resolution": { "width": 1920, "height": 1080 }
            }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let config = CameraConfig::for_device(&Device::new("/dev/video0"));
    client.update_camera_info(&config).await.unwrap();
}

#[tokio::test]
async fn test_update_camera_info_is_repeatable() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/c/info"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let config = CameraConfig::for_device(&Device::new("/dev/video0"));
    client.update_camera_info(&config).await.unwrap();
    client.update_camera_info(&config).await.unwrap();
}

#[tokio::test]
async fn test_update_camera_info_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/c/info"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "message": "Unknown trigger scheme"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let config = CameraConfig::for_device(&Device::new("/dev/video0"));
    let err = client.update_camera_info(&config).await.unwrap_err();

    assert_eq!(err.status(), Some(400));
    assert!(err.to_string().contains("Unknown trigger scheme"));
}

// === Trait Object ===

#[tokio::test]
async fn test_client_usable_through_connect_api_trait() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/c/snapshot"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let api: Box<dyn ConnectApi> = Box::new(client_for(&server));
    api.upload_snapshot(frame()).await.unwrap();
}
