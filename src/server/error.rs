use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

/// Failure taxonomy for the chat service.
///
/// Selection-flow failures (model listing, credentials) surface immediately
/// with no persisted side effect. Mid-conversation completion failures
/// propagate after the user turn was persisted; re-submitting the prompt is
/// the recovery path.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("could not allocate a unique session id")]
    SessionConflict,

    #[error("completion service rejected the credential")]
    Auth,

    #[error("model not recognized: {0}")]
    UnknownModel(String),

    #[error("completion service failure: {0}")]
    Service(String),

    #[error("no model selected")]
    NoModelSelected,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ChatError {
    fn status(&self) -> StatusCode {
        match self {
            ChatError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            ChatError::SessionConflict => StatusCode::CONFLICT,
            ChatError::Auth => StatusCode::UNAUTHORIZED,
            ChatError::UnknownModel(_) => StatusCode::BAD_REQUEST,
            ChatError::Service(_) => StatusCode::BAD_GATEWAY,
            ChatError::NoModelSelected => StatusCode::BAD_REQUEST,
            ChatError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {:?}", self);
        }
        (
            status,
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}
