//! Media intake through the real extractors: multipart parsing, the image
//! MIME filter, file persistence under generated names, and the merge of
//! stored filenames into the body's media list.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use volunflow_api::extract::{FormBody, MediaForm};
use volunflow_api::media::MediaStore;

const BOUNDARY: &str = "x-test-boundary";

async fn echo_media(MediaForm(body): MediaForm) -> Json<Value> {
    Json(body)
}

async fn echo_form(FormBody(body): FormBody) -> Json<Value> {
    Json(body)
}

fn media_app(store: MediaStore) -> Router {
    Router::new().route("/echo", post(echo_media)).with_state(store)
}

fn text_part(name: &str, value: &str) -> String {
    format!(
        "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
        BOUNDARY, name, value
    )
}

fn file_part(name: &str, filename: &str, content_type: &str, bytes: &str) -> String {
    format!(
        "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n{}\r\n",
        BOUNDARY, name, filename, content_type, bytes
    )
}

fn multipart_request(parts: &[String]) -> Request<Body> {
    let body = format!("{}--{}--\r\n", parts.concat(), BOUNDARY);
    Request::builder()
        .method("POST")
        .uri("/echo")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn temp_store() -> (MediaStore, std::path::PathBuf) {
    let dir = std::env::temp_dir().join(format!("volunflow-intake-test-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    (MediaStore::new(&dir), dir)
}

#[tokio::test]
async fn stores_uploads_and_merges_generated_names() {
    let (store, dir) = temp_store();
    let app = media_app(store);

    let request = multipart_request(&[
        text_part("title", "Beach day"),
        text_part("media", "[\"existing.png\"]"),
        file_part("media", "photo.png", "image/png", "fake png bytes"),
    ]);
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["title"], "Beach day");

    let media = body["media"].as_array().unwrap();
    assert_eq!(media.len(), 2);
    assert_eq!(media[0], "existing.png");

    let stored_name = media[1].as_str().unwrap();
    assert!(stored_name.ends_with(".png"));
    let written = std::fs::read(dir.join(stored_name)).unwrap();
    assert_eq!(written, b"fake png bytes");

    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn missing_media_field_defaults_to_an_empty_list() {
    let (store, dir) = temp_store();
    let response = media_app(store)
        .oneshot(multipart_request(&[text_part("title", "No files")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["media"], serde_json::json!([]));

    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn rejects_non_image_uploads_wholesale() {
    let (store, dir) = temp_store();
    let request = multipart_request(&[file_part(
        "media",
        "report.pdf",
        "application/pdf",
        "%PDF-1.4",
    )]);
    let response = media_app(store).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["message"], "File must be an image (JPEG, PNG, or GIF)");
    // Nothing was persisted for the rejected request.
    assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn rejects_malformed_media_json_string() {
    let (store, dir) = temp_store();
    let response = media_app(store)
        .oneshot(multipart_request(&[text_part("media", "[broken")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["message"], "Invalid format for media");

    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn form_body_accepts_json_and_rejects_files() {
    let app = Router::new().route("/echo", post(echo_form));

    let request = Request::builder()
        .method("POST")
        .uri("/echo")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"name":"Pat","tags":["a"]}"#))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["name"], "Pat");
    assert_eq!(body["tags"], serde_json::json!(["a"]));

    let response = app
        .oneshot(multipart_request(&[file_part(
            "media",
            "photo.png",
            "image/png",
            "bytes",
        )]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn form_body_collects_multipart_text_fields() {
    let app = Router::new().route("/echo", post(echo_form));

    let response = app
        .oneshot(multipart_request(&[
            text_part("name", "Pat"),
            text_part("message", "Hello"),
        ]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["name"], "Pat");
    assert_eq!(body["message"], "Hello");
}
