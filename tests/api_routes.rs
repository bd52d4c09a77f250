mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::{init_logging, setup_test_db};
use parlor::server::config::configure_app_with_services;
use parlor::server::services::{
    conversation::ConversationLog, openai::OpenAiService, session_store::SessionStore,
};
use serde_json::json;
use sqlx::SqlitePool;
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NAMING_MODEL: &str = "gpt-4";
const CHAT_MODEL: &str = "gpt-3.5-turbo";

fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "test_response",
        "object": "chat.completion",
        "created": 1234567890,
        "model": CHAT_MODEL,
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": content
            },
            "finish_reason": "stop"
        }]
    })
}

fn build_app(pool: &SqlitePool, base_url: String) -> (Arc<SessionStore>, Router) {
    let sessions = Arc::new(SessionStore::new(pool.clone()));
    let log = Arc::new(ConversationLog::new(pool.clone()));
    let openai = Arc::new(OpenAiService::with_base_url("test_key".to_string(), base_url));
    let app = configure_app_with_services(
        sessions.clone(),
        log,
        openai,
        NAMING_MODEL.to_string(),
    );
    (sessions, app)
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn prompt_without_model_is_rejected() {
    init_logging();
    let pool = setup_test_db().await;
    let (_, app) = build_app(&pool, "http://127.0.0.1:9/v1".to_string());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/chat")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({"prompt": "Hello"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["error"], "no model selected");
}

#[tokio::test]
async fn prompt_with_model_cookie_runs_full_turn() {
    init_logging();
    let pool = setup_test_db().await;
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"model": NAMING_MODEL})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Quantum Quill")))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"model": CHAT_MODEL})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Hi there")))
        .mount(&server)
        .await;

    let (sessions, app) = build_app(&pool, format!("{}/v1", server.uri()));
    let session = sessions.create_session().await.unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/chat")
                .header(header::CONTENT_TYPE, "application/json")
                .header(
                    header::COOKIE,
                    format!("model={}; session_id={}", CHAT_MODEL, session.session_id),
                )
                .body(Body::from(json!({"prompt": "Hello"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["reply"]["role"], "assistant");
    assert_eq!(body["reply"]["content"], "Hi there");
    assert_eq!(body["session"]["session_id"], session.session_id.as_str());
    assert_eq!(body["session"]["name"], "Quantum Quill");
}

#[tokio::test]
async fn models_endpoint_filters_chat_capable_ids() {
    init_logging();
    let pool = setup_test_db().await;
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [
                {"id": "gpt-4", "object": "model"},
                {"id": "gpt-3.5-turbo", "object": "model"},
                {"id": "text-embedding-3", "object": "model"}
            ]
        })))
        .mount(&server)
        .await;

    let (_, app) = build_app(&pool, format!("{}/v1", server.uri()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/models")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["models"], json!(["gpt-3.5-turbo", "gpt-4"]));
}

#[tokio::test]
async fn choosing_an_unlisted_model_is_rejected() {
    init_logging();
    let pool = setup_test_db().await;
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [{"id": "gpt-4", "object": "model"}]
        })))
        .mount(&server)
        .await;

    let (_, app) = build_app(&pool, format!("{}/v1", server.uri()));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/models")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({"model": "llama-70b"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn loading_unknown_session_is_not_found() {
    init_logging();
    let pool = setup_test_db().await;
    let (_, app) = build_app(&pool, "http://127.0.0.1:9/v1".to_string());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/sessions")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({"session_id": "missing"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_sessions_returns_created_sessions() {
    init_logging();
    let pool = setup_test_db().await;
    let (sessions, app) = build_app(&pool, "http://127.0.0.1:9/v1".to_string());

    let session = sessions.create_session().await.unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/sessions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(
        body["sessions"][0]["session_id"],
        session.session_id.as_str()
    );
}

#[tokio::test]
async fn new_session_clears_the_cookie() {
    init_logging();
    let pool = setup_test_db().await;
    let (_, app) = build_app(&pool, "http://127.0.0.1:9/v1".to_string());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/chat/new")
                .header(header::COOKIE, "session_id=20240101000000-deadbeef")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("removal cookie")
        .to_str()
        .unwrap();
    assert!(set_cookie.starts_with("session_id="));
}
