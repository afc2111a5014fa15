use std::net::SocketAddr;

use axum::Json;
use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use serde_json::{Value, json};
use session::MemoryStorage;
use session::storage::TOKEN_KEY;

use super::*;

async fn login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["password"] == "secret" {
        (StatusCode::OK, Json(json!({ "token": "tok-1", "type": "Bearer", "username": body["username"] })))
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Invalid username or password" })))
    }
}

async fn register(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["username"] == "taken" {
        (StatusCode::BAD_REQUEST, Json(json!({ "message": "Username is already taken" })))
    } else {
        (StatusCode::OK, Json(json!({ "message": "User registered successfully" })))
    }
}

async fn me(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some("Bearer tok-1") => (StatusCode::OK, Json(json!({ "userId": 7, "username": "alice" }))),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" }))),
    }
}

async fn spawn_backend() -> SocketAddr {
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/user/me", get(me))
        .route("/api/broken/user/me", get(|| async { "not json" }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    addr
}

fn client(addr: SocketAddr, storage: MemoryStorage) -> HttpAccountApi<MemoryStorage> {
    HttpAccountApi::new(format!("http://{addr}/api/"), storage).expect("client")
}

#[tokio::test]
async fn login_decodes_token_and_user() {
    let api = client(spawn_backend().await, MemoryStorage::new());
    let request = LoginRequest { username: "alice".to_owned(), password: "secret".to_owned() };

    let response = api.login(&request).await.expect("login");

    assert_eq!(response.token.as_deref(), Some("tok-1"));
    assert_eq!(response.user.username.as_deref(), Some("alice"));
}

#[tokio::test]
async fn login_rejection_carries_server_message() {
    let api = client(spawn_backend().await, MemoryStorage::new());
    let request = LoginRequest { username: "alice".to_owned(), password: "wrong".to_owned() };

    let err = api.login(&request).await.expect_err("rejected");

    assert!(err.is_unauthorized());
    assert_eq!(err.server_message(), Some("Invalid username or password"));
}

#[tokio::test]
async fn register_maps_message_body_on_failure() {
    let api = client(spawn_backend().await, MemoryStorage::new());
    let request = RegisterRequest { username: "taken".to_owned(), ..RegisterRequest::default() };

    let err = api.register(&request).await.expect_err("rejected");

    assert_eq!(err, ApiError::Rejected {
        status: 400,
        body: ErrorBody { error: None, message: Some("Username is already taken".to_owned()) },
    });
}

#[tokio::test]
async fn register_ignores_success_body() {
    let api = client(spawn_backend().await, MemoryStorage::new());
    let request = RegisterRequest { username: "bob".to_owned(), ..RegisterRequest::default() };

    assert_eq!(api.register(&request).await, Ok(()));
}

#[tokio::test]
async fn current_user_sends_stored_bearer_token() {
    let api = client(spawn_backend().await, MemoryStorage::with_entries([(TOKEN_KEY, "tok-1")]));

    let user = api.current_user().await.expect("me");

    assert_eq!(user.user_id, Some(7));
    assert_eq!(user.username.as_deref(), Some("alice"));
}

#[tokio::test]
async fn current_user_without_token_is_unauthorized() {
    let api = client(spawn_backend().await, MemoryStorage::new());

    let err = api.current_user().await.expect_err("no token");

    assert!(err.is_unauthorized());
    assert!(!err.is_transient());
}

#[tokio::test]
async fn undecodable_success_body_is_decode_error() {
    let addr = spawn_backend().await;
    let api = HttpAccountApi::new(format!("http://{addr}/api/broken"), MemoryStorage::new()).expect("client");

    assert!(matches!(api.current_user().await, Err(ApiError::Decode(_))));
}

#[tokio::test]
async fn unreachable_backend_is_transient_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let api = client(addr, MemoryStorage::new());

    let err = api.current_user().await.expect_err("refused");

    assert!(matches!(err, ApiError::Transport(_)));
    assert!(err.is_transient());
}
