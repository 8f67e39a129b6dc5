mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

#[tokio::test]
async fn ping_returns_pong() {
    let app = common::spawn_app();
    let (status, body) = app.send(Method::GET, "/ping", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "pong" }));
}

#[tokio::test]
async fn root_greets() {
    let app = common::spawn_app();
    let (status, body) = app.send(Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("Hello, Farm2Table!"));
}

#[tokio::test]
async fn farmer_record_echoes_three_fields_with_id() {
    let app = common::spawn_app();
    let (status, body) = app
        .send(
            Method::POST,
            "/farmer",
            None,
            Some(json!({
                "name": "Wanjiru",
                "phone": "0712345678",
                "location": "Nyeri",
                "extra": "ignored",
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "Wanjiru");
    assert_eq!(body["phone"], "0712345678");
    assert_eq!(body["location"], "Nyeri");
    assert!(body["id"].as_str().is_some());
    assert_eq!(body.as_object().unwrap().len(), 4);
}

#[tokio::test]
async fn protected_routes_need_a_token() {
    let app = common::spawn_app();
    let (status, body) = app.send(Method::GET, "/listings", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Missing Authorization header");

    let (status, _) = app.get("/listings", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
