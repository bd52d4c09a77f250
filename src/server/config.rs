use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::configuration::Settings;
use crate::server::handlers::{
    chat::{get_chat, new_session, send_prompt},
    selection::{choose_model, list_models, list_sessions, load_session, set_api_key},
};
use crate::server::services::{
    chat::ChatService, conversation::ConversationLog, openai::OpenAiService,
    session_store::SessionStore,
};

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub log: Arc<ConversationLog>,
    pub openai: Arc<OpenAiService>,
    pub chat: Arc<ChatService>,
}

pub fn configure_app(pool: SqlitePool, settings: &Settings) -> Router {
    let sessions = Arc::new(SessionStore::new(pool.clone()));
    let log = Arc::new(ConversationLog::new(pool));
    let openai = Arc::new(OpenAiService::new(&settings.openai));

    configure_app_with_services(sessions, log, openai, settings.openai.naming_model.clone())
}

/// Router construction with pre-built services; tests use this to point the
/// completion client at a mock server.
pub fn configure_app_with_services(
    sessions: Arc<SessionStore>,
    log: Arc<ConversationLog>,
    openai: Arc<OpenAiService>,
    naming_model: String,
) -> Router {
    let chat = Arc::new(ChatService::new(
        sessions.clone(),
        log.clone(),
        openai.clone(),
        naming_model,
    ));

    let state = AppState {
        sessions,
        log,
        openai,
        chat,
    };

    app_router(state)
}

async fn health() -> &'static str {
    "OK"
}

fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", get(get_chat).post(send_prompt))
        .route("/api/chat/new", post(new_session))
        .route("/api/models", get(list_models).post(choose_model))
        .route("/api/sessions", get(list_sessions).post(load_session))
        .route("/api/api-key", post(set_api_key))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
