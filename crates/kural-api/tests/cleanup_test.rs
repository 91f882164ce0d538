mod helpers;

use axum_test::multipart::MultipartForm;
use helpers::fixtures::jpeg_part;
use helpers::{api_path, setup_test_app, TestApp};
use kural_core::constants::DEFAULT_COVER_PLACEHOLDER;
use serde_json::{json, Value};

async fn upload_cover(app: &TestApp) -> Value {
    app.client()
        .post(&api_path("/books/42/cover"))
        .multipart(MultipartForm::new().add_part("image", jpeg_part(400, 600, "cover.jpg")))
        .await
        .json()
}

#[tokio::test]
async fn test_cleanup_reports_each_path() {
    let app = setup_test_app().await;
    let cover = upload_cover(&app).await;
    let cover_path = cover["coverImage"].as_str().unwrap();
    let thumb_path = cover["responsiveSizes"]["thumb"].as_str().unwrap();

    let response = app
        .client()
        .post(&api_path("/uploads/cleanup"))
        .json(&json!({
            "paths": [
                cover_path,
                DEFAULT_COVER_PLACEHOLDER,
                "/uploads/books/missing.webp",
                thumb_path,
            ]
        }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["deleted"], 2);
    assert_eq!(body["failed"], 1);

    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["path"], cover_path);
    assert_eq!(results[0]["success"], true);
    assert_eq!(results[1]["path"], "/uploads/books/missing.webp");
    assert_eq!(results[1]["success"], false);
    assert!(results[1]["error"].is_string());
    assert_eq!(results[2]["success"], true);

    assert!(results
        .iter()
        .all(|r| r["path"] != DEFAULT_COVER_PLACEHOLDER));
    assert_eq!(app.storage().len().await, 3);
}

#[tokio::test]
async fn test_cleanup_only_placeholder() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post(&api_path("/uploads/cleanup"))
        .json(&json!({ "paths": [DEFAULT_COVER_PLACEHOLDER] }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["deleted"], 0);
    assert_eq!(body["failed"], 0);
    assert!(app.storage().removal_log().await.is_empty());
}

#[tokio::test]
async fn test_cleanup_malformed_body() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post(&api_path("/uploads/cleanup"))
        .json(&json!({ "files": ["/uploads/books/a.webp"] }))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_probe_stored_image() {
    let app = setup_test_app().await;
    let cover = upload_cover(&app).await;
    let cover_path = cover["coverImage"].as_str().unwrap();

    let response = app
        .client()
        .get(&api_path("/uploads/probe"))
        .add_query_param("path", cover_path)
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["exists"], true);
    assert_eq!(body["metadata"]["width"], 400);
    assert_eq!(body["metadata"]["height"], 600);
    assert_eq!(body["metadata"]["format"], "webp");
    assert!(body["size"].as_u64().unwrap() > 0);
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn test_probe_missing_image() {
    let app = setup_test_app().await;

    for _ in 0..2 {
        let response = app
            .client()
            .get(&api_path("/uploads/probe"))
            .add_query_param("path", "/uploads/books/nope.webp")
            .await;

        assert_eq!(response.status_code(), 200);
        let body: Value = response.json();
        assert_eq!(body["exists"], false);
        assert!(body["error"].is_string());
    }
}
