use std::sync::Arc;

use tracing::{info, warn};

use crate::server::error::ChatError;
use crate::server::models::chat::{Role, Session, Turn};
use crate::server::services::conversation::ConversationLog;
use crate::server::services::openai::{ChatMessage, OpenAiService};
use crate::server::services::session_store::SessionStore;

/// Injected into the request when the log held nothing before the current
/// prompt. Never persisted.
const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

const SESSION_NAMING_PROMPT: &str = "Create a unique and creative name for a chat session.";
const SESSION_NAME_MAX_TOKENS: i32 = 10;

/// Orchestrates one chat turn: persist the prompt, name the session on its
/// first turn, call the completion service with the full history, persist
/// the reply.
pub struct ChatService {
    sessions: Arc<SessionStore>,
    log: Arc<ConversationLog>,
    openai: Arc<OpenAiService>,
    naming_model: String,
}

impl ChatService {
    pub fn new(
        sessions: Arc<SessionStore>,
        log: Arc<ConversationLog>,
        openai: Arc<OpenAiService>,
        naming_model: String,
    ) -> Self {
        Self {
            sessions,
            log,
            openai,
            naming_model,
        }
    }

    /// Resolves the visitor's active session, creating one when there is no
    /// active id. A stale id (cookie for a session that no longer exists)
    /// also starts a fresh session instead of failing the chat view.
    pub async fn ensure_session(
        &self,
        active_session_id: Option<&str>,
    ) -> Result<Session, ChatError> {
        if let Some(session_id) = active_session_id {
            match self.sessions.get_session(session_id).await {
                Ok(session) => return Ok(session),
                Err(ChatError::SessionNotFound(_)) => {
                    warn!("Active session {} no longer exists, starting a new one", session_id);
                }
                Err(e) => return Err(e),
            }
        }

        self.sessions.create_session().await
    }

    pub async fn submit_prompt(
        &self,
        session_id: &str,
        model: &str,
        prompt: &str,
    ) -> Result<Turn, ChatError> {
        let session = self.sessions.get_session(session_id).await?;

        // The user turn is persisted before the completion call; if that
        // call fails the log keeps the prompt and re-submission recovers.
        self.log.append_turn(session_id, Role::User, prompt).await?;

        if !session.is_named() {
            self.name_session(session_id).await;
        }

        let turns = self.log.list_turns(session_id).await?;
        let mut messages: Vec<ChatMessage> = Vec::with_capacity(turns.len() + 1);
        if turns.len() == 1 {
            // First prompt in this session.
            messages.push(ChatMessage::new(Role::System.as_str(), DEFAULT_SYSTEM_PROMPT));
        }
        messages.extend(turns.iter().map(ChatMessage::from));

        let reply = self.openai.complete(model, &messages).await?;

        let assistant_turn = self
            .log
            .append_turn(session_id, Role::Assistant, &reply)
            .await?;
        info!("Completed chat turn for session {}", session_id);

        Ok(assistant_turn)
    }

    /// Best-effort naming call against the fixed naming model. Failure is
    /// logged and the name stays empty, so the next prompt tries again.
    async fn name_session(&self, session_id: &str) {
        let request = vec![ChatMessage::new(Role::User.as_str(), SESSION_NAMING_PROMPT)];

        match self
            .openai
            .complete_with_max_tokens(&self.naming_model, &request, SESSION_NAME_MAX_TOKENS)
            .await
        {
            Ok(name) => {
                info!("Naming session {} -> {}", session_id, name);
                if let Err(e) = self.sessions.rename_session(session_id, &name).await {
                    warn!("Failed to store session name: {}", e);
                }
            }
            Err(e) => {
                warn!("Failed to generate session name: {}", e);
            }
        }
    }
}
