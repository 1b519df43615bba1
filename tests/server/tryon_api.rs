use serde_json::json;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{TestApp, spawn_app, spawn_app_without_storage};

async fn mount_image_origins(app: &TestApp) {
    for name in ["human.jpg", "garment.jpg"] {
        Mock::given(method("GET"))
            .and(path(format!("/images/{name}")))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(b"fake-image-bytes".to_vec(), "image/jpeg"),
            )
            .mount(&app.mock_server)
            .await;
    }
}

/// Mounts the inference space: file upload, the try-on procedure returning
/// two file references, and the referenced output files themselves.
async fn mount_inference(app: &TestApp) {
    let uri = app.mock_server.uri();

    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["/tmp/space/input.png"])))
        .mount(&app.mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/run/tryon"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "path": "/tmp/space/out.webp", "url": format!("{uri}/files/out.webp") },
                { "path": "/tmp/space/mask.png", "url": format!("{uri}/files/mask.png") }
            ]
        })))
        .mount(&app.mock_server)
        .await;

    for name in ["out.webp", "mask.png"] {
        Mock::given(method("GET"))
            .and(path(format!("/files/{name}")))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(b"fake-output-bytes".to_vec(), "image/webp"),
            )
            .mount(&app.mock_server)
            .await;
    }
}

async fn mount_storage(app: &TestApp) {
    Mock::given(method("POST"))
        .and(path_regex(r"^/storage/v1/object/test-bucket/.+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Key": "ignored" })))
        .mount(&app.mock_server)
        .await;
}

fn valid_payload(app: &TestApp) -> serde_json::Value {
    json!({
        "human_image_url": app.image_url("human.jpg"),
        "garment_image_url": app.image_url("garment.jpg"),
        "garment_description": "blue shirt"
    })
}

#[tokio::test]
async fn missing_image_url_returns_fixed_400_body() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let payloads = [
        json!({ "garment_image_url": "http://g/b.jpg" }),
        json!({ "human_image_url": "http://h/a.jpg" }),
        json!({}),
        json!({ "human_image_url": "", "garment_image_url": "http://g/b.jpg" }),
    ];

    for payload in payloads {
        let response = client
            .post(app.endpoint())
            .json(&payload)
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(response.status(), 400);
        let body: serde_json::Value = response.json().await.expect("Failed to parse response");
        assert_eq!(
            body,
            json!({ "error": "Missing human_image_url or garment_image_url" })
        );
    }
}

#[tokio::test]
async fn successful_request_returns_public_urls() {
    let app = spawn_app().await;
    mount_image_origins(&app).await;
    mount_inference(&app).await;
    mount_storage(&app).await;

    let client = reqwest::Client::new();
    let response = client
        .post(app.endpoint())
        .json(&valid_payload(&app))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    let output_url = body["output_url"].as_str().expect("missing output_url");
    let masked_url = body["masked_url"].as_str().expect("missing masked_url");

    assert!(output_url.starts_with(&app.public_url_prefix("processed_images")));
    assert!(masked_url.starts_with(&app.public_url_prefix("masked_images")));
    // Random key prefix keeps published objects collision-resistant
    assert!(output_url.ends_with("_out.webp"));
    assert!(masked_url.ends_with("_mask.png"));
}

#[tokio::test]
async fn scratch_files_are_removed_after_success() {
    let app = spawn_app().await;
    mount_image_origins(&app).await;
    mount_inference(&app).await;
    mount_storage(&app).await;

    let client = reqwest::Client::new();
    let response = client
        .post(app.endpoint())
        .json(&valid_payload(&app))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
    assert!(
        app.scratch_entries().is_empty(),
        "scratch files left behind: {:?}",
        app.scratch_entries()
    );
}

#[tokio::test]
async fn wrong_shape_inference_result_returns_500_without_upload() {
    let app = spawn_app().await;
    mount_image_origins(&app).await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["/tmp/space/input.png"])))
        .mount(&app.mock_server)
        .await;

    // One element instead of two: an upstream contract change
    Mock::given(method("POST"))
        .and(path("/run/tryon"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "path": "/tmp/space/out.webp" }]
        })))
        .mount(&app.mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/storage/v1/object/.+$"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .named("storage upload")
        .mount(&app.mock_server)
        .await;

    let client = reqwest::Client::new();
    let response = client
        .post(app.endpoint())
        .json(&valid_payload(&app))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 500);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(
        body["error"],
        "Unexpected response format from inference service. Expected two output images."
    );

    assert!(app.scratch_entries().is_empty());
    app.mock_server.verify().await;
}

#[tokio::test]
async fn unconfigured_storage_fails_every_request_at_publish() {
    let app = spawn_app_without_storage().await;
    mount_image_origins(&app).await;
    mount_inference(&app).await;

    let client = reqwest::Client::new();

    // Download and inference succeed; the failure is deterministic at publish
    for _ in 0..2 {
        let response = client
            .post(app.endpoint())
            .json(&valid_payload(&app))
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(response.status(), 500);
        let body: serde_json::Value = response.json().await.expect("Failed to parse response");
        let message = body["error"].as_str().expect("missing error message");
        assert!(
            message.contains("Storage client not initialized"),
            "unexpected error: {message}"
        );
    }

    assert!(app.scratch_entries().is_empty());
}

#[tokio::test]
async fn failed_input_download_returns_500() {
    let app = spawn_app().await;

    Mock::given(method("GET"))
        .and(path("/images/human.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&app.mock_server)
        .await;

    let client = reqwest::Client::new();
    let response = client
        .post(app.endpoint())
        .json(&valid_payload(&app))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 500);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    let message = body["error"].as_str().expect("missing error message");
    assert!(
        message.contains("Error downloading image"),
        "unexpected error: {message}"
    );

    assert!(app.scratch_entries().is_empty());
}

#[tokio::test]
async fn upload_failure_is_propagated() {
    let app = spawn_app().await;
    mount_image_origins(&app).await;
    mount_inference(&app).await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/storage/v1/object/test-bucket/.+$"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "statusCode": "403",
            "error": "Unauthorized",
            "message": "new row violates row-level security policy"
        })))
        .mount(&app.mock_server)
        .await;

    let client = reqwest::Client::new();
    let response = client
        .post(app.endpoint())
        .json(&valid_payload(&app))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 500);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    let message = body["error"].as_str().expect("missing error message");
    assert!(
        message.contains("Storage upload returned status 403"),
        "unexpected error: {message}"
    );

    assert!(app.scratch_entries().is_empty());
}
