//! Login, logout and `/api/me`.

use reqwest::StatusCode;
use serde_json::json;

use rabit_core::UserRole;
use rabit_integration_tests::{PASSWORD, TestApp, get_json, post_json};

#[tokio::test]
async fn test_login_sets_session_and_me_reports_user() {
    let app = TestApp::spawn().await;
    let (client, user) = app.login_as("owner@example.com", UserRole::Owner).await;

    let (status, me) = get_json(&client, &app.url("/api/me")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["user"]["id"], user.id.as_i32());
    assert_eq!(me["is_admin"], false);
    assert!(me["brand"].is_null());
}

#[tokio::test]
async fn test_bad_credentials_message() {
    let app = TestApp::spawn().await;
    app.create_user("owner@example.com", UserRole::Owner).await;
    let client = TestApp::client();

    let (status, body) = post_json(
        &client,
        &app.url("/auth/login"),
        &json!({"email": "owner@example.com", "password": "wrong-password"}),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password. Please try again.");

    let (status, body) = post_json(
        &client,
        &app.url("/auth/login"),
        &json!({"email": "not-an-email", "password": PASSWORD}),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Please enter a valid email address.");
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = TestApp::spawn().await;
    let (client, _) = app.login_as("owner@example.com", UserRole::Owner).await;

    let resp = client
        .post(app.url("/auth/logout"))
        .send()
        .await
        .expect("logout");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let (status, _) = get_json(&client, &app.url("/api/me")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_anonymous_requests_rejected() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();

    let (status, _) = get_json(&client, &app.url("/api/me")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = get_json(&client, &app.url("/api/brands/1/orders")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
