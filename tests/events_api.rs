use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use booking_server::auth::TokenService;
use booking_server::clock::FixedClock;
use booking_server::repository;
use booking_server::routes::{create_routes, RouterOptions};
use booking_server::state::AppState;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

fn ts(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

async fn build_app() -> (Router, FixedClock) {
    let pool = repository::connect_in_memory().await.unwrap();
    let clock = FixedClock::new(ts("2024-12-15T12:00:00Z"));
    let tokens = TokenService::new("integration-secret", Duration::hours(2));
    let state = AppState::new(pool, tokens, Arc::new(clock.clone()));
    (create_routes(state, &RouterOptions::default()), clock)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Signs up and logs in, returning `(user_id, token)`.
async fn user(app: &Router, email: &str) -> (i64, String) {
    let credentials = json!({"email": email, "password": "hunter2"});
    let (status, body) = send(app, Method::POST, "/signup", None, Some(credentials.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send(app, Method::POST, "/login", None, Some(credentials)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    (id, body["data"]["token"].as_str().unwrap().to_string())
}

async fn create_standup(app: &Router, token: &str) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/events",
        Some(token),
        Some(json!({
            "title": "Standup",
            "start_time": "2025-01-01T09:00:00Z",
            "end_time": "2025-01-01T09:30:00Z",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let (app, _) = build_app().await;
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn event_routes_require_a_valid_token() {
    let (app, _) = build_app().await;

    let (status, body) = send(&app, Method::GET, "/events", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "AUTH_ERROR");

    let (status, _) = send(&app, Method::GET, "/events", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn standup_lifecycle() {
    let (app, _) = build_app().await;
    let (organizer, org_token) = user(&app, "org@example.com").await;
    let (attendee, attendee_token) = user(&app, "ada@example.com").await;

    let id = create_standup(&app, &org_token).await;
    let uri = format!("/events/{id}");
    let registration = format!("/events/{id}/registration");

    let (status, body) = send(&app, Method::GET, &uri, Some(&attendee_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Standup");
    assert_eq!(body["data"]["organizer"], organizer);
    assert_eq!(body["data"]["attendees"], json!([]));

    let (status, _) = send(&app, Method::POST, &registration, Some(&attendee_token), None).await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, body) = send(&app, Method::GET, &uri, Some(&attendee_token), None).await;
    assert_eq!(body["data"]["attendees"], json!([attendee]));

    let (status, body) = send(&app, Method::POST, &registration, Some(&attendee_token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "DUPLICATE_REGISTRATION");

    let (status, _) = send(&app, Method::DELETE, &registration, Some(&attendee_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, Method::GET, &uri, Some(&attendee_token), None).await;
    assert_eq!(body["data"]["attendees"], json!([]));
}

#[tokio::test]
async fn partial_update_reports_rejected_fields() {
    let (app, _) = build_app().await;
    let (organizer, org_token) = user(&app, "org@example.com").await;
    let id = create_standup(&app, &org_token).await;

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/events/{id}"),
        Some(&org_token),
        Some(json!({
            "Title": "Retro",
            "location": 12,
            "organizer": organizer + 1,
            "colour": "blue",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    let data = &body["data"];
    assert_eq!(data["event"]["title"], "Retro");
    assert_eq!(data["event"]["organizer"], organizer);
    assert_eq!(data["applied"], json!(["title"]));
    assert_eq!(data["ignored"], json!(["colour"]));
    assert_eq!(data["rejected"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn only_the_organizer_may_mutate() {
    let (app, _) = build_app().await;
    let (_, org_token) = user(&app, "org@example.com").await;
    let (_, other_token) = user(&app, "ada@example.com").await;
    let id = create_standup(&app, &org_token).await;
    let uri = format!("/events/{id}");

    let patch = Some(json!({"title": "Mine"}));
    let (status, _) = send(&app, Method::PUT, &uri, Some(&other_token), patch).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, Method::DELETE, &uri, Some(&other_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&org_token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::GET, &uri, Some(&org_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = send(&app, Method::GET, "/events", Some(&org_token), None).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn ended_events_cannot_be_updated() {
    let (app, clock) = build_app().await;
    let (_, org_token) = user(&app, "org@example.com").await;
    let id = create_standup(&app, &org_token).await;

    clock.set(ts("2025-01-01T10:00:00Z"));

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/events/{id}"),
        Some(&org_token),
        Some(json!({"title": "Too late"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "EVENT_EXPIRED");
}

#[tokio::test]
async fn malformed_input_is_a_validation_error() {
    let (app, _) = build_app().await;
    let (_, org_token) = user(&app, "org@example.com").await;

    let (status, body) = send(&app, Method::GET, "/events/abc", Some(&org_token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = send(
        &app,
        Method::POST,
        "/events",
        Some(&org_token),
        Some(json!({"title": "No times"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let again = Some(json!({"email": "org@example.com", "password": "x"}));
    let (status, body) = send(&app, Method::POST, "/signup", None, again).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "email is already registered");
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let (app, _) = build_app().await;
    user(&app, "org@example.com").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/login",
        None,
        Some(json!({"email": "org@example.com", "password": "nope"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
