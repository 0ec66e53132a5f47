/// HTTP API tests, driving the router directly
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use habit_tracker_server::*;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

const MISSING_ID: &str = "5f0c1e2a-8b7d-4c3e-9a1b-2d3c4e5f6a7b";

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap()
}

fn fixed_today() -> NaiveDate {
    fixed_now().date_naive()
}

async fn test_app() -> (Router, TempDir) {
    test_app_with_clock(Utc::now).await
}

async fn test_app_with_clock(clock: Clock) -> (Router, TempDir) {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let config = ServerConfig::new(
        3000,
        StoreLocation::Sqlite(temp_dir.path().join("habits.db")),
        temp_dir.path().join("uploads"),
    );
    let server = HabitTrackerServer::new(config)
        .await
        .expect("Failed to create server")
        .with_clock(clock);
    (server.router(), temp_dir)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("Failed to build request");

    let response = app.clone().oneshot(request).await.expect("Request failed");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn create(app: &Router, body: Value) -> String {
    let (status, response) = send(app, Method::POST, "/habitCards", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(response["message"], "Habit added successfully");
    response["id"].as_str().expect("id is a string").to_string()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _temp_dir) = test_app().await;

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"Server is running fine!");
}

#[tokio::test]
async fn test_crud_round_trip() {
    let (app, _temp_dir) = test_app().await;

    let id = create(
        &app,
        json!({
            "title": "Drink water",
            "description": "Eight glasses",
            "category": "Health",
            "reminderTime": "08:00",
            "userEmail": "sam@example.com",
            "userName": "Sam",
            "isPrivate": false
        }),
    )
    .await;

    let (status, habit) = send(&app, Method::GET, &format!("/habits/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(habit["_id"], id);
    assert_eq!(habit["title"], "Drink water");
    assert_eq!(habit["creator"], json!({ "name": "Sam", "email": "sam@example.com" }));
    assert_eq!(habit["completionHistory"], json!([]));
    assert_eq!(habit["currentStreak"], 0);

    let (status, updated) = send(
        &app,
        Method::PATCH,
        &format!("/habits/{}", id),
        Some(json!({ "title": "Drink more water", "currentStreak": 99 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Drink more water");
    assert_eq!(updated["description"], "Eight glasses");
    assert_eq!(updated["currentStreak"], 0);

    let (_, fetched) = send(&app, Method::GET, &format!("/habits/{}", id), None).await;
    assert_eq!(fetched["title"], "Drink more water");

    let (status, deleted) = send(&app, Method::DELETE, &format!("/habits/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["message"], "Habit deleted successfully");

    let (status, body) = send(&app, Method::GET, &format!("/habits/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "message": "Habit not found" }));
}

#[tokio::test]
async fn test_missing_habit_is_not_found_everywhere() {
    let (app, _temp_dir) = test_app().await;

    let requests = [
        (Method::GET, format!("/habits/{}", MISSING_ID), None),
        (
            Method::PATCH,
            format!("/habits/{}", MISSING_ID),
            Some(json!({ "title": "x" })),
        ),
        (Method::DELETE, format!("/habits/{}", MISSING_ID), None),
        (Method::PATCH, format!("/habits/complete/{}", MISSING_ID), None),
    ];

    for (method, uri, body) in requests {
        let (status, response) = send(&app, method, &uri, body).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(response["message"], "Habit not found");
    }
}

#[tokio::test]
async fn test_malformed_id_is_bad_request() {
    let (app, _temp_dir) = test_app().await;

    let (status, body) = send(&app, Method::GET, "/habits/not-an-id", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Failed to fetch habit");
    assert!(body["error"].is_string());

    let (status, body) = send(&app, Method::DELETE, "/habits/not-an-id", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Failed to delete habit");
}

#[tokio::test]
async fn test_create_validation() {
    let (app, _temp_dir) = test_app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/habitCards",
        Some(json!({ "title": "x".repeat(101) })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Failed to add habit");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/habitCards")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Missing creator falls back to "Unknown"
    let id = create(&app, json!({ "title": "Anonymous" })).await;
    let (_, habit) = send(&app, Method::GET, &format!("/habits/{}", id), None).await;
    assert_eq!(habit["creator"]["email"], "Unknown");
    assert_eq!(habit["isPrivate"], false);
}

#[tokio::test]
async fn test_latest_habits_are_limited_and_newest_first() {
    let (app, _temp_dir) = test_app().await;

    for i in 0..8 {
        create(&app, json!({ "title": format!("Habit {}", i) })).await;
    }

    let (status, body) = send(&app, Method::GET, "/habitCards", None).await;
    assert_eq!(status, StatusCode::OK);
    let habits = body.as_array().expect("list body is an array");
    assert_eq!(habits.len(), 6);
    assert_eq!(habits[0]["title"], "Habit 7");
    assert_eq!(habits[5]["title"], "Habit 2");

    let (_, body) = send(&app, Method::GET, "/publicHabits", None).await;
    assert_eq!(body.as_array().unwrap().len(), 8);
}

#[tokio::test]
async fn test_public_habits_include_private_ones() {
    let (app, _temp_dir) = test_app().await;

    create(&app, json!({ "title": "Open", "isPrivate": false })).await;
    create(&app, json!({ "title": "Secret", "isPrivate": "true" })).await;

    let (status, body) = send(&app, Method::GET, "/publicHabits", None).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|habit| habit["title"].as_str())
        .collect();
    assert_eq!(titles, vec!["Secret", "Open"]);
}

#[tokio::test]
async fn test_my_habits_filters_by_creator_email() {
    let (app, _temp_dir) = test_app().await;

    create(&app, json!({ "title": "Run", "userEmail": "sam@example.com" })).await;
    create(&app, json!({ "title": "Swim", "creatorEmail": "alex@example.com" })).await;
    create(&app, json!({ "title": "Read", "userEmail": "sam@example.com" })).await;

    for path in ["/myHabits/sam@example.com", "/myhabits/sam@example.com"] {
        let (status, body) = send(&app, Method::GET, path, None).await;
        assert_eq!(status, StatusCode::OK);
        let titles: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|habit| habit["title"].as_str())
            .collect();
        assert_eq!(titles, vec!["Read", "Run"]);
    }

    let (status, body) = send(&app, Method::GET, "/myHabits/nobody@example.com", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_mark_complete_builds_streak_and_is_idempotent() {
    let (app, _temp_dir) = test_app_with_clock(fixed_now).await;
    let id = create(&app, json!({ "title": "Stretch" })).await;
    let uri = format!("/habits/complete/{}", id);

    let today = fixed_today();
    let yesterday = today - Duration::days(1);

    // No body means today
    let (status, habit) = send(&app, Method::PATCH, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(habit["currentStreak"], 1);

    let (status, habit) = send(
        &app,
        Method::PATCH,
        &uri,
        Some(json!({ "date": yesterday.to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(habit["currentStreak"], 2);
    assert_eq!(
        habit["completionHistory"],
        json!([yesterday.to_string(), today.to_string()])
    );

    // Same day again, with a time of day attached
    let (status, habit) = send(
        &app,
        Method::PATCH,
        &uri,
        Some(json!({ "date": format!("{}T18:30:00.000Z", today) })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(habit["currentStreak"], 2);
    assert_eq!(habit["completionHistory"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_mark_complete_rejects_bad_dates() {
    let (app, _temp_dir) = test_app().await;
    let id = create(&app, json!({ "title": "Journal" })).await;

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/habits/complete/{}", id),
        Some(json!({ "date": "yesterday-ish" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Failed to mark habit complete");

    let (_, habit) = send(&app, Method::GET, &format!("/habits/{}", id), None).await;
    assert_eq!(habit["completionHistory"], json!([]));
}

#[tokio::test]
async fn test_streak_is_fresh_on_read() {
    let (app, _temp_dir) = test_app_with_clock(fixed_now).await;
    let id = create(&app, json!({ "title": "Walk" })).await;

    // A streak that ended two days ago reads back as zero
    let two_days_ago = fixed_today() - Duration::days(2);
    let (_, habit) = send(
        &app,
        Method::PATCH,
        &format!("/habits/complete/{}", id),
        Some(json!({ "date": two_days_ago.to_string() })),
    )
    .await;
    assert_eq!(habit["currentStreak"], 0);

    let (_, listed) = send(&app, Method::GET, "/habitCards", None).await;
    assert_eq!(listed[0]["currentStreak"], 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_completions_are_all_kept() {
    let (app, _temp_dir) = test_app_with_clock(fixed_now).await;
    let id = create(&app, json!({ "title": "Practice scales" })).await;
    let uri = format!("/habits/complete/{}", id);

    let mut tasks = Vec::new();
    for days_back in 0..20 {
        let app = app.clone();
        let uri = uri.clone();
        let date = (fixed_today() - Duration::days(days_back)).to_string();
        tasks.push(tokio::spawn(async move {
            send(&app, Method::PATCH, &uri, Some(json!({ "date": date }))).await
        }));
    }
    for task in tasks {
        let (status, _) = task.await.expect("Request task panicked");
        assert_eq!(status, StatusCode::OK);
    }

    let (_, habit) = send(&app, Method::GET, &format!("/habits/{}", id), None).await;
    let history = habit["completionHistory"].as_array().unwrap();
    assert_eq!(history.len(), 20);
    for days_back in 0..20 {
        let date = (fixed_today() - Duration::days(days_back)).to_string();
        assert!(history.contains(&json!(date)), "missing {}", date);
    }
    assert_eq!(habit["currentStreak"], 20);
}

#[tokio::test]
async fn test_patch_cannot_set_image_url() {
    let (app, _temp_dir) = test_app().await;
    let id = create(&app, json!({ "title": "Garden" })).await;

    let (status, habit) = send(
        &app,
        Method::PATCH,
        &format!("/habits/{}", id),
        Some(json!({ "imageUrl": "http://elsewhere.example/x.png" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(habit["imageUrl"].is_null());

    let (_, fetched) = send(&app, Method::GET, &format!("/habits/{}", id), None).await;
    assert!(fetched["imageUrl"].is_null());
}
