use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;

use branch_cell::*;
use shared_utils::clock::FixedClock;
use shared_utils::test_utils::{monday_at, JwtTestUtils, TestConfig, TestUser};

fn app() -> (axum::Router, TestConfig) {
    let test_config = TestConfig::default();
    let clock = Arc::new(FixedClock::new(monday_at(10, 0)));
    let service = Arc::new(BranchService::new(Arc::new(InMemoryBranchDirectory::new()), clock));
    (branch_routes(test_config.to_arc(), service), test_config)
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn create_branch_request(token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/")
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", JwtTestUtils::bearer(token));
    }
    let payload = json!({
        "city": "Bishkek",
        "address": "Chuy 100",
        "description": "Main office",
        "schedules": [
            { "day": "monday", "open_time": "09:00:00", "close_time": "17:00:00" }
        ]
    });
    builder.body(Body::from(payload.to_string())).unwrap()
}

#[tokio::test]
async fn test_list_branches_is_public() {
    let (app, _) = app();

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["total"], 0);
}

#[tokio::test]
async fn test_create_branch_requires_token() {
    let (app, _) = app();

    let response = app.oneshot(create_branch_request(None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_branch_requires_staff_role() {
    let (app, config) = app();
    let token = JwtTestUtils::create_test_token(&TestUser::client("c@example.com"), &config.jwt_secret, None);

    let response = app.oneshot(create_branch_request(Some(&token))).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_staff_creates_branch_and_reads_open_status() {
    let (app, config) = app();
    let token = JwtTestUtils::create_test_token(&TestUser::staff("s@example.com"), &config.jwt_secret, None);

    let response = app.clone().oneshot(create_branch_request(Some(&token))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let created = body_json(response).await;
    let branch_id = created["branch"]["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/{}", branch_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["is_open"], true);
    assert_eq!(json["schedules"][0]["day"], "monday");
}

#[tokio::test]
async fn test_unknown_branch_returns_404() {
    let (app, _) = app();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/{}", uuid::Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_staff_roster_is_staff_only() {
    let (app, config) = app();
    let staff = JwtTestUtils::create_test_token(&TestUser::staff("s@example.com"), &config.jwt_secret, None);
    let client = JwtTestUtils::create_test_token(&TestUser::client("c@example.com"), &config.jwt_secret, None);

    let response = app.clone().oneshot(create_branch_request(Some(&staff))).await.unwrap();
    let branch_id = body_json(response).await["branch"]["id"].as_str().unwrap().to_string();
    let teller = uuid::Uuid::new_v4();

    let assign = |token: &str| {
        Request::builder()
            .method("PUT")
            .uri(format!("/{}/staff", branch_id))
            .header("Content-Type", "application/json")
            .header("Authorization", JwtTestUtils::bearer(token))
            .body(Body::from(json!({ "user_id": teller }).to_string()))
            .unwrap()
    };

    let response = app.clone().oneshot(assign(&client)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.clone().oneshot(assign(&staff)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/{}/staff", branch_id))
                .header("Authorization", JwtTestUtils::bearer(&staff))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["staff"][0]["user_id"], teller.to_string());
}
