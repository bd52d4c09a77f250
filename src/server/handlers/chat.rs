use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::server::{
    config::AppState,
    error::ChatError,
    models::chat::{Session, Turn},
};

pub const SESSION_COOKIE: &str = "session_id";
pub const MODEL_COOKIE: &str = "model";

#[derive(Debug, Serialize)]
pub struct ChatView {
    pub session: Session,
    pub model: String,
    pub turns: Vec<Turn>,
}

#[derive(Debug, Deserialize)]
pub struct SendPromptRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct SendPromptResponse {
    pub session: Session,
    pub reply: Turn,
}

fn selected_model(jar: &CookieJar) -> Result<String, ChatError> {
    jar.get(MODEL_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|model| !model.is_empty())
        .ok_or(ChatError::NoModelSelected)
}

fn active_session_id(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE).map(|c| c.value().to_string())
}

pub async fn get_chat(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<ChatView>), ChatError> {
    let model = selected_model(&jar)?;
    let active = active_session_id(&jar);

    let session = state.chat.ensure_session(active.as_deref()).await?;
    let jar = jar.add(Cookie::new(SESSION_COOKIE, session.session_id.clone()));

    let turns = state.log.list_turns(&session.session_id).await?;

    Ok((
        jar,
        Json(ChatView {
            session,
            model,
            turns,
        }),
    ))
}

pub async fn send_prompt(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<SendPromptRequest>,
) -> Result<(CookieJar, Json<SendPromptResponse>), ChatError> {
    let model = selected_model(&jar)?;
    let active = active_session_id(&jar);

    let session = state.chat.ensure_session(active.as_deref()).await?;
    let jar = jar.add(Cookie::new(SESSION_COOKIE, session.session_id.clone()));

    info!("Chat prompt for session {} using {}", session.session_id, model);
    let reply = state
        .chat
        .submit_prompt(&session.session_id, &model, &request.prompt)
        .await?;

    // The session may have been named during the turn; reload it.
    let session = state.sessions.get_session(&session.session_id).await?;

    Ok((jar, Json(SendPromptResponse { session, reply })))
}

/// Resets the visitor to no active session. Model selection survives.
pub async fn new_session(jar: CookieJar) -> (CookieJar, StatusCode) {
    let jar = jar.remove(Cookie::from(SESSION_COOKIE));
    (jar, StatusCode::NO_CONTENT)
}
