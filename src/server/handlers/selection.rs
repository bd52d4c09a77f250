use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::server::{config::AppState, error::ChatError, models::chat::Session};

use super::chat::{MODEL_COOKIE, SESSION_COOKIE};

pub const API_KEY_COOKIE: &str = "api_key";

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<String>,
}

pub async fn list_models(State(state): State<AppState>) -> Result<Json<ModelsResponse>, ChatError> {
    let models = state.openai.list_models().await?;
    Ok(Json(ModelsResponse { models }))
}

#[derive(Debug, Deserialize)]
pub struct ChooseModelRequest {
    pub model: String,
}

pub async fn choose_model(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<ChooseModelRequest>,
) -> Result<(CookieJar, StatusCode), ChatError> {
    let available = state.openai.list_models().await?;
    if !available.contains(&request.model) {
        return Err(ChatError::UnknownModel(request.model));
    }

    info!("Model selected: {}", request.model);
    let jar = jar.add(Cookie::new(MODEL_COOKIE, request.model));
    Ok((jar, StatusCode::NO_CONTENT))
}

#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub sessions: Vec<Session>,
}

pub async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<SessionsResponse>, ChatError> {
    let sessions = state.sessions.list_sessions().await?;
    Ok(Json(SessionsResponse { sessions }))
}

#[derive(Debug, Deserialize)]
pub struct LoadSessionRequest {
    pub session_id: String,
}

pub async fn load_session(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<LoadSessionRequest>,
) -> Result<(CookieJar, StatusCode), ChatError> {
    let session = state.sessions.get_session(&request.session_id).await?;
    let jar = jar.add(Cookie::new(SESSION_COOKIE, session.session_id));
    Ok((jar, StatusCode::NO_CONTENT))
}

#[derive(Debug, Deserialize)]
pub struct SetApiKeyRequest {
    pub api_key: String,
}

/// Stores the visitor-supplied key in cookie state. Outbound completion
/// calls keep authenticating with the process-wide credential; the stored
/// value is not attached to requests.
pub async fn set_api_key(
    jar: CookieJar,
    Json(request): Json<SetApiKeyRequest>,
) -> (CookieJar, StatusCode) {
    warn!("Visitor-scoped API key stored; outbound requests use the process-wide credential");
    let jar = jar.add(Cookie::new(API_KEY_COOKIE, request.api_key));
    (jar, StatusCode::NO_CONTENT)
}
