//! Brand creation and brand-scoped access.

use reqwest::StatusCode;
use serde_json::json;

use rabit_core::UserRole;
use rabit_integration_tests::{TestApp, get_json, post_json};

#[tokio::test]
async fn test_owner_creates_one_brand() {
    let app = TestApp::spawn().await;
    let (client, brand_id) = app.owner_with_brand("owner@example.com").await;

    let (_, me) = get_json(&client, &app.url("/api/me")).await;
    assert_eq!(me["brand"]["id"], brand_id);
    assert_eq!(
        me["brand"]["logo"],
        "https://placehold.co/100x100.png?text=A"
    );

    let (status, _) = post_json(
        &client,
        &app.url("/api/brands"),
        &json!({"name": "Second Brand", "phone": "0123456789"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_brand_form_errors_per_field() {
    let app = TestApp::spawn().await;
    let (client, _) = app.login_as("owner@example.com", UserRole::Owner).await;

    let (status, body) = post_json(
        &client,
        &app.url("/api/brands"),
        &json!({"name": "A", "phone": "123", "logo": "not a url"}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["fields"]["name"][0],
        "Brand name must be at least 2 characters."
    );
    assert_eq!(body["fields"]["phone"][0], "Please enter a valid phone number.");
    assert_eq!(
        body["fields"]["logo"][0],
        "Please enter a valid URL for the logo."
    );
}

#[tokio::test]
async fn test_other_owner_cannot_see_brand() {
    let app = TestApp::spawn().await;
    let (_, brand_id) = app.owner_with_brand("owner@example.com").await;
    let (intruder, _) = app.login_as("other@example.com", UserRole::Owner).await;

    let (status, _) = get_json(
        &intruder,
        &app.url(&format!("/api/brands/{brand_id}/orders")),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_sees_and_creates_brands() {
    let app = TestApp::spawn().await;
    let (_, brand_id) = app.owner_with_brand("owner@example.com").await;
    let (admin, _) = app.login_as("admin@example.com", UserRole::Admin).await;
    let second_owner = app.create_user("second@example.com", UserRole::Owner).await;

    let (status, body) = post_json(
        &admin,
        &app.url("/api/admin/brands"),
        &json!({
            "name": "Second Goods",
            "phone": "0987654321",
            "owner_id": second_owner.id.as_i32()
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["owner"], second_owner.id.as_i32());

    let (status, brands) = get_json(&admin, &app.url("/api/admin/brands")).await;
    assert_eq!(status, StatusCode::OK);
    let brands = brands.as_array().expect("brand list");
    assert_eq!(brands.len(), 2);
    // Newest first
    assert_eq!(brands[0]["name"], "Second Goods");

    let (status, _) = get_json(
        &admin,
        &app.url(&format!("/api/brands/{brand_id}/products")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_owner_cannot_use_admin_routes() {
    let app = TestApp::spawn().await;
    let (client, _) = app.login_as("owner@example.com", UserRole::Owner).await;

    let (status, _) = get_json(&client, &app.url("/api/admin/brands")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unknown_brand_is_not_found() {
    let app = TestApp::spawn().await;
    let (admin, _) = app.login_as("admin@example.com", UserRole::Admin).await;

    let (status, _) = get_json(&admin, &app.url("/api/brands/999/orders")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
