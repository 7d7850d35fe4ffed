use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use sample_app_backend::config::StorageBackend;
use sample_app_backend::routes::create_router;
use sample_app_common::{ErrorBody, UserView};
use crate::test_utils::{setup_test_env, setup_test_env_with};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

fn router() -> (Router, TempDir) {
    let (state, temp_dir) = setup_test_env();
    (create_router(state), temp_dir)
}

async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.unwrap()
}

fn json_request(method: &str, uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn empty_request(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// `name=value` part of the response's Set-Cookie header
fn session_cookie(response: &Response) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("Set-Cookie header")
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn signup_body(email: &str) -> Value {
    json!({
        "name": "Example User",
        "email": email,
        "password": "foobar",
        "password_confirmation": "foobar",
    })
}

#[tokio::test]
async fn test_signup_me_signout_flow() {
    let (router, _temp_dir) = router();

    let response = send(&router, json_request("POST", "/users", signup_body("user@example.com"), None)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let cookie = session_cookie(&response);
    let created: UserView = body_json(response).await;

    let response = send(&router, empty_request("GET", "/me", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let me: UserView = body_json(response).await;
    assert_eq!(me, created);

    let response = send(&router, empty_request("DELETE", "/sessions", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(session_cookie(&response).ends_with('='));

    // the old cookie no longer resolves after the token rotated
    let response = send(&router, empty_request("GET", "/me", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signup_validation_errors() {
    let (router, _temp_dir) = router();
    let body = json!({
        "name": "",
        "email": "user@invalid",
        "password": "foo",
        "password_confirmation": "bar",
    });

    let response = send(&router, json_request("POST", "/users", body, None)).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.headers().get(header::SET_COOKIE).is_none());

    let body: ErrorBody = body_json(response).await;
    assert_eq!(body.error.code, "VAL_001");
    let fields: Vec<&str> = body.error.fields.iter().map(|f| f.field.as_str()).collect();
    for field in ["name", "email", "password", "password_confirmation"] {
        assert!(fields.contains(&field), "missing error on {field}");
    }
}

#[tokio::test]
async fn test_signup_duplicate_email() {
    let (router, _temp_dir) = router();
    send(&router, json_request("POST", "/users", signup_body("user@example.com"), None)).await;

    let response = send(&router, json_request("POST", "/users", signup_body("USER@example.com"), None)).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: ErrorBody = body_json(response).await;
    assert_eq!(body.error.fields[0].full_message(), "Email has already been taken");
}

#[tokio::test]
async fn test_signin() {
    let (router, _temp_dir) = router();
    send(&router, json_request("POST", "/users", signup_body("user@example.com"), None)).await;

    let response = send(
        &router,
        json_request("POST", "/sessions", json!({"email": "User@Example.com", "password": "foobar"}), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response);

    let response = send(&router, empty_request("GET", "/me", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &router,
        json_request("POST", "/sessions", json!({"email": "user@example.com", "password": "wrong!"}), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: ErrorBody = body_json(response).await;
    assert_eq!(body.error.code, "AUTH_002");
}

#[tokio::test]
async fn test_show_user() {
    let (router, _temp_dir) = router();
    let response = send(&router, json_request("POST", "/users", signup_body("user@example.com"), None)).await;
    let created: UserView = body_json(response).await;

    let response = send(&router, empty_request("GET", &format!("/users/{}", created.id), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let raw: Value = body_json(response).await;
    assert_eq!(raw["email"], "user@example.com");
    assert!(raw.get("password_digest").is_none());

    let missing = uuid::Uuid::new_v4();
    let response = send(&router, empty_request("GET", &format!("/users/{missing}"), None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_user_permissions() {
    let (router, _temp_dir) = router();

    let response = send(&router, json_request("POST", "/users", signup_body("first@example.com"), None)).await;
    let first_cookie = session_cookie(&response);
    let first: UserView = body_json(response).await;

    let response = send(&router, json_request("POST", "/users", signup_body("second@example.com"), None)).await;
    let second: UserView = body_json(response).await;

    let uri = format!("/users/{}", first.id);
    let rename = json!({"name": "Renamed"});

    let response = send(&router, json_request("PATCH", &uri, rename.clone(), None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let other_uri = format!("/users/{}", second.id);
    let response = send(&router, json_request("PATCH", &other_uri, rename.clone(), Some(&first_cookie))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&router, json_request("PATCH", &uri, rename, Some(&first_cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated: UserView = body_json(response).await;
    assert_eq!(updated.name, "Renamed");
    assert_eq!(updated.email, "first@example.com");

    let response = send(
        &router,
        json_request("PATCH", &uri, json!({"email": "SECOND@example.com"}), Some(&first_cookie)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_tampered_cookie_is_anonymous() {
    let (router, _temp_dir) = router();
    let response = send(&router, json_request("POST", "/users", signup_body("user@example.com"), None)).await;
    let cookie = session_cookie(&response);

    let tampered = format!("{cookie}x");
    let response = send(&router, empty_request("GET", "/me", Some(&tampered))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&router, empty_request("GET", "/me", Some("remember_token=plain-token"))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_quoted_cookie_value_is_accepted() {
    let (router, _temp_dir) = router();
    let response = send(&router, json_request("POST", "/users", signup_body("user@example.com"), None)).await;
    let cookie = session_cookie(&response);

    let (name, value) = cookie.split_once('=').unwrap();
    let quoted = format!("{name}=\"{value}\"");
    let response = send(&router, empty_request("GET", "/me", Some(&quoted))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_file_backed_sessions_survive_restart() {
    let (state, temp_dir) = setup_test_env_with(StorageBackend::File);
    let response = send(
        &create_router(state),
        json_request("POST", "/users", signup_body("user@example.com"), None),
    )
    .await;
    let cookie = session_cookie(&response);

    // same secret file and data directory, new process state
    let settings = crate::test_utils::test_settings(&temp_dir, StorageBackend::File);
    let state = sample_app_backend::AppState::from_settings(settings).unwrap();
    let router = create_router(std::sync::Arc::new(state));

    let response = send(&router, empty_request("GET", "/me", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
}
