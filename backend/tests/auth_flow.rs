mod common;

use axum::http::{Method, StatusCode};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use farm2table_backend::{auth, models::Account, store::MarketStore};

#[tokio::test]
async fn signup_then_login_redirects_to_dashboard() {
    let app = common::spawn_app();
    let (token, user_id) = app.register("Grace@Example.com", "farmer").await;

    let (status, me) = app.get("/auth/me", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["role"], "farmer");
    assert_eq!(me["redirect"], "/farmer-dashboard");
    assert_eq!(me["user"]["id"], user_id);
    assert_eq!(me["user"]["email"], "grace@example.com");
    assert!(me["user"].get("password_hash").is_none());

    let (status, profile) = app.get("/profile", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["status"], "active");
}

#[tokio::test]
async fn signup_requires_a_role() {
    let app = common::spawn_app();
    let (status, body) = app
        .send(
            Method::POST,
            "/auth/signup",
            None,
            Some(json!({ "email": "norole@example.com", "password": "secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().starts_with("Please select a role"));
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let app = common::spawn_app();
    app.register("dup@example.com", "buyer").await;
    let (status, _) = app
        .send(
            Method::POST,
            "/auth/signup",
            None,
            Some(json!({ "email": "DUP@example.com", "password": "secret123", "role": "buyer" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn admin_signup_outside_allow_list_is_forbidden() {
    let app = common::spawn_app();
    let (status, _) = app
        .send(
            Method::POST,
            "/auth/signup",
            None,
            Some(json!({
                "email": "mallory@example.com",
                "password": "secret123",
                "role": "admin",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (token, _) = app.register("ADMIN1@example.com", "admin").await;
    let (status, me) = app.get("/auth/me", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["redirect"], "/admin-dashboard");
}

#[tokio::test]
async fn admin_claim_in_metadata_is_downgraded_at_login() {
    let app = common::spawn_app();
    let account = Account {
        id: Uuid::new_v4(),
        email: "sneaky@example.com".into(),
        password_hash: auth::hash_password("secret123", 4).unwrap(),
        full_name: None,
        phone: None,
        location: None,
        signup_role: Some("admin".into()),
        created_at: Utc::now(),
    };
    app.store.insert_account(account.clone()).await.unwrap();

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "sneaky@example.com", "password": "secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "buyer");
    assert_eq!(body["downgraded"], true);
    assert_eq!(body["redirect"], "/buyer-marketplace");

    // The resolved role is written back as the user's role row.
    let stored = app.store.find_role(account.id).await.unwrap();
    assert_eq!(stored.as_deref(), Some("buyer"));
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = common::spawn_app();
    app.register("amina@example.com", "buyer").await;
    let (status, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "amina@example.com", "password": "nope-nope" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid login credentials");
}

#[tokio::test]
async fn suspended_user_cannot_log_in() {
    let app = common::spawn_app();
    let (admin, _) = app.register("admin2@example.com", "admin").await;
    let (_, user_id) = app.register("otieno@example.com", "transporter").await;

    let (status, profile) = app
        .send(
            Method::PUT,
            &format!("/admin/users/{user_id}/status"),
            Some(&admin),
            Some(json!({ "status": "suspended" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["status"], "suspended");

    let (status, _) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "otieno@example.com", "password": "secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, activity) = app.get("/admin/activity?limit=5", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(activity[0]["action"], "user_status_changed");
}

#[tokio::test]
async fn suspension_revokes_existing_tokens() {
    let app = common::spawn_app();
    let (admin, _) = app.register("admin2@example.com", "admin").await;
    let (token, user_id) = app.register("wanjiku@example.com", "buyer").await;
    let status_uri = format!("/admin/users/{user_id}/status");

    let (status, _) = app.get("/profile", &token).await;
    assert_eq!(status, StatusCode::OK);

    app.send(Method::PUT, &status_uri, Some(&admin), Some(json!({ "status": "suspended" })))
        .await;

    let (status, body) = app.get("/profile", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Your account has been suspended");
    let (status, _) = app
        .post("/support", &token, json!({ "subject": "Help", "message": "Locked out" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    app.send(Method::PUT, &status_uri, Some(&admin), Some(json!({ "status": "active" })))
        .await;
    let (status, _) = app.get("/cart", &token).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn admin_lists_and_deletes_users() {
    let app = common::spawn_app();
    let (admin, admin_id) = app.register("admin1@example.com", "admin").await;
    let (token, user_id) = app.register("kipchoge@example.com", "transporter").await;

    let (status, users) = app.get("/admin/users", &admin).await;
    assert_eq!(status, StatusCode::OK);
    let listed = users
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["user_id"] == user_id.as_str())
        .unwrap();
    assert_eq!(listed["role"], "transporter");
    assert_eq!(listed["status"], "active");

    let user_uri = format!("/admin/users/{user_id}");
    let (status, _) = app.send(Method::DELETE, &user_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .send(Method::DELETE, &format!("/admin/users/{admin_id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.send(Method::DELETE, &user_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.send(Method::DELETE, &user_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get("/profile", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "kipchoge@example.com", "password": "secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, users) = app.get("/admin/users", &admin).await;
    assert_eq!(users.as_array().unwrap().len(), 1);
    let (_, activity) = app.get("/admin/activity?limit=1", &admin).await;
    assert_eq!(activity[0]["action"], "user_deleted");
}

#[tokio::test]
async fn malformed_bodies_answer_with_a_json_message() {
    let app = common::spawn_app();

    let (status, body) = app
        .post_raw("/auth/login", Some("application/json"), "{\"email\": ")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string(), "{body}");

    let (status, body) = app
        .post_raw("/auth/login", Some("application/json"), "{\"email\": \"a@b.c\"}")
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"].as_str().unwrap().contains("password"), "{body}");

    let (status, body) = app.post_raw("/auth/login", None, "email=a@b.c").await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(body["message"].is_string(), "{body}");
}
