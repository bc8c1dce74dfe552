//! Authentication and rate limiting integration tests.
//!
//! Run with: `cargo test -p profego-api --test auth_test`

mod helpers;

use helpers::{setup_test_app, setup_test_app_with, TEST_EMAIL, TEST_PASSWORD};
use serde_json::{json, Value};

#[tokio::test]
async fn test_register_then_login() {
    let app = setup_test_app().await;
    let client = app.client();

    let register = client
        .post("/api/auth/register")
        .json(&json!({"email": "nuevo@example.com", "password": "clave123"}))
        .await;
    assert_eq!(register.status_code(), 200);
    let body: Value = register.json();
    assert_eq!(body["message"], "User registered successfully");

    let login = client
        .post("/api/auth/login")
        .json(&json!({"email": "nuevo@example.com", "password": "clave123"}))
        .await;
    assert_eq!(login.status_code(), 200);
    let body: Value = login.json();
    assert_eq!(body["email"], "nuevo@example.com");
    assert_eq!(body["message"], "Login successful");

    let token = body["token"].as_str().unwrap().to_string();
    let list = client
        .get("/api/files/list")
        .add_header("Authorization", format!("Bearer {}", token))
        .await;
    assert_eq!(list.status_code(), 200);
    let files: Vec<Value> = list.json();
    assert!(files.is_empty());
}

#[tokio::test]
async fn test_register_existing_email() {
    let app = setup_test_app().await;
    app.identity.add_user(TEST_EMAIL, TEST_PASSWORD);

    let response = app
        .client()
        .post("/api/auth/register")
        .json(&json!({"email": TEST_EMAIL, "password": "otra-clave"}))
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_login_failures() {
    let app = setup_test_app().await;
    let client = app.client();
    app.identity.add_user(TEST_EMAIL, TEST_PASSWORD);

    let unknown = client
        .post("/api/auth/login")
        .json(&json!({"email": "nadie@example.com", "password": TEST_PASSWORD}))
        .await;
    assert_eq!(unknown.status_code(), 400);
    let body: Value = unknown.json();
    assert_eq!(body["detail"], "User not found");

    let wrong = client
        .post("/api/auth/login")
        .json(&json!({"email": TEST_EMAIL, "password": "incorrecta"}))
        .await;
    assert_eq!(wrong.status_code(), 400);
    let body: Value = wrong.json();
    assert_eq!(body["detail"], "Invalid credentials");
}

#[tokio::test]
async fn test_credentials_are_validated() {
    let app = setup_test_app().await;
    let client = app.client();

    let bad_email = client
        .post("/api/auth/register")
        .json(&json!({"email": "no-es-correo", "password": "clave123"}))
        .await;
    assert_eq!(bad_email.status_code(), 400);

    let short_password = client
        .post("/api/auth/register")
        .json(&json!({"email": "corto@example.com", "password": "123"}))
        .await;
    assert_eq!(short_password.status_code(), 400);
}

#[tokio::test]
async fn test_login_rate_limited() {
    let app = setup_test_app_with(&[("AUTH_RATE_LIMIT_PER_MINUTE", "2")]).await;
    let client = app.client();
    app.identity.add_user(TEST_EMAIL, TEST_PASSWORD);
    let credentials = json!({"email": TEST_EMAIL, "password": TEST_PASSWORD});

    for _ in 0..2 {
        let response = client.post("/api/auth/login").json(&credentials).await;
        assert_eq!(response.status_code(), 200);
        assert!(response.maybe_header("x-ratelimit-remaining").is_some());
    }

    let limited = client.post("/api/auth/login").json(&credentials).await;
    assert_eq!(limited.status_code(), 429);
    assert!(limited.maybe_header("retry-after").is_some());
    let body: Value = limited.json();
    assert_eq!(body["code"], "TOO_MANY_REQUESTS");
}
