/// Multipart create/update with image uploads
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use habit_tracker_server::*;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

const BOUNDARY: &str = "habit-form-boundary";
const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake image";

async fn test_app() -> (Router, TempDir) {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let config = ServerConfig::new(
        3000,
        StoreLocation::Memory,
        temp_dir.path().join("uploads"),
    )
    .with_public_url(Some("http://habits.test".to_string()));
    let server = HabitTrackerServer::new(config)
        .await
        .expect("Failed to create server");
    (server.router(), temp_dir)
}

fn multipart_body(fields: &[(&str, &str)], image: Option<(&str, &[u8])>) -> Vec<u8> {
    multipart_body_with_file_field(fields, "image", image)
}

fn multipart_body_with_file_field(
    fields: &[(&str, &str)],
    file_field: &str,
    image: Option<(&str, &[u8])>,
) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: image/png\r\n\r\n",
                BOUNDARY, file_field, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

async fn send_multipart(app: &Router, method: Method, uri: &str, body: Vec<u8>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn test_create_with_image_serves_upload() {
    let (app, temp_dir) = test_app().await;

    let body = multipart_body(
        &[
            ("title", "Sketch daily"),
            ("userEmail", "sam@example.com"),
            ("isPrivate", "true"),
        ],
        Some(("cover.png", PNG_BYTES)),
    );
    let (status, created) = send_multipart(&app, Method::POST, "/habitCards", body).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();

    let (_, bytes) = get(&app, &format!("/habits/{}", id)).await;
    let habit: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(habit["title"], "Sketch daily");
    assert_eq!(habit["isPrivate"], true);

    let image_url = habit["imageUrl"].as_str().expect("imageUrl is set");
    assert!(image_url.starts_with("http://habits.test/uploads/image-"));
    assert!(image_url.ends_with(".png"));

    // The file is on disk and served under /uploads
    let file_name = image_url.rsplit('/').next().unwrap();
    assert!(temp_dir.path().join("uploads").join(file_name).exists());

    let (status, served) = get(&app, &format!("/uploads/{}", file_name)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(served, PNG_BYTES);
}

#[tokio::test]
async fn test_create_without_file_leaves_image_unset() {
    let (app, _temp_dir) = test_app().await;

    let body = multipart_body(&[("title", "No picture")], Some(("", &b""[..])));
    let (status, created) = send_multipart(&app, Method::POST, "/habitCards", body).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, bytes) = get(&app, &format!("/habits/{}", created["id"].as_str().unwrap())).await;
    let habit: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(habit["imageUrl"].is_null());
}

#[tokio::test]
async fn test_update_replaces_image() {
    let (app, _temp_dir) = test_app().await;

    let body = multipart_body(&[("title", "Paint")], None);
    let (_, created) = send_multipart(&app, Method::POST, "/habitCards", body).await;
    let id = created["id"].as_str().unwrap().to_string();

    let body = multipart_body(&[("category", "Art")], Some(("canvas.jpg", PNG_BYTES)));
    let (status, updated) =
        send_multipart(&app, Method::PATCH, &format!("/habits/{}", id), body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Paint");
    assert_eq!(updated["category"], "Art");
    assert!(updated["imageUrl"].as_str().unwrap().ends_with(".jpg"));
}

#[tokio::test]
async fn test_unknown_upload_is_not_found() {
    let (app, _temp_dir) = test_app().await;

    let (status, _) = get(&app, "/uploads/missing.png").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

fn files_in(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

#[tokio::test]
async fn test_rejected_requests_leave_no_uploads() {
    let (app, temp_dir) = test_app().await;
    let uploads = temp_dir.path().join("uploads");

    let long_title = "x".repeat(101);
    let body = multipart_body(&[("title", long_title.as_str())], Some(("cover.png", PNG_BYTES)));
    let (status, _) = send_multipart(&app, Method::POST, "/habitCards", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let missing = HabitId::new();
    let body = multipart_body(&[("title", "Paint")], Some(("cover.png", PNG_BYTES)));
    let (status, _) =
        send_multipart(&app, Method::PATCH, &format!("/habits/{}", missing), body).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let body = multipart_body(&[("title", "Paint")], Some(("cover.png", PNG_BYTES)));
    let (status, _) = send_multipart(&app, Method::PATCH, "/habits/not-an-id", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(files_in(&uploads), 0);

    // A successful upload is kept
    let body = multipart_body(&[("title", "Paint")], Some(("cover.png", PNG_BYTES)));
    let (status, _) = send_multipart(&app, Method::POST, "/habitCards", body).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(files_in(&uploads), 1);
}

#[tokio::test]
async fn test_file_outside_image_field_is_ignored() {
    let (app, temp_dir) = test_app().await;

    let body = multipart_body_with_file_field(
        &[("title", "Portrait")],
        "avatar",
        Some(("me.png", PNG_BYTES)),
    );
    let (status, created) = send_multipart(&app, Method::POST, "/habitCards", body).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, bytes) = get(&app, &format!("/habits/{}", created["id"].as_str().unwrap())).await;
    let habit: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(habit["title"], "Portrait");
    assert!(habit["imageUrl"].is_null());
    assert_eq!(files_in(&temp_dir.path().join("uploads")), 0);
}
