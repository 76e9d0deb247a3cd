//! AI shipping suggestions against the mock Claude API.

use reqwest::StatusCode;
use serde_json::json;

use rabit_core::UserRole;
use rabit_integration_tests::{ClaudeReply, TestApp, post_json};

fn form() -> serde_json::Value {
    json!({
        "order_details": "2 linen shirts to Alexandria, fragile packaging",
        "past_performance_data": "Aramex: 2 days, 98% on time. DHL: 1 day, expensive."
    })
}

#[tokio::test]
async fn test_suggestion_returns_companies_and_reasoning() {
    let app = TestApp::spawn().await;
    let (client, _) = app.login_as("owner@example.com", UserRole::Owner).await;

    let (status, body) = post_json(&client, &app.url("/api/shipping-suggestion"), &form()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["suggested_companies"], json!(["Aramex", "DHL"]));
    assert!(body["reasoning"].as_str().is_some_and(|r| !r.is_empty()));
    assert_eq!(app.claude_calls(), 1);
}

#[tokio::test]
async fn test_short_input_never_reaches_the_model() {
    let app = TestApp::spawn().await;
    let (client, _) = app.login_as("owner@example.com", UserRole::Owner).await;

    let (status, body) = post_json(
        &client,
        &app.url("/api/shipping-suggestion"),
        &json!({"order_details": "shirts", "past_performance_data": "ok"}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["fields"]["order_details"][0],
        "Order details must be at least 10 characters long."
    );
    assert_eq!(
        body["fields"]["past_performance_data"][0],
        "Performance data must be at least 10 characters long."
    );
    assert_eq!(app.claude_calls(), 0);
}

#[tokio::test]
async fn test_model_failure_is_reported_generically() {
    let app = TestApp::spawn_with(ClaudeReply::Fail).await;
    let (client, _) = app.login_as("owner@example.com", UserRole::Owner).await;

    let (status, body) = post_json(&client, &app.url("/api/shipping-suggestion"), &form()).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Failed to get suggestions from AI.");
    assert_eq!(app.claude_calls(), 1);
}

#[tokio::test]
async fn test_suggestion_requires_login() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();

    let (status, _) = post_json(&client, &app.url("/api/shipping-suggestion"), &form()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.claude_calls(), 0);
}
