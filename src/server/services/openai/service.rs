use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use std::time::Duration;
use tracing::{debug, warn};

use crate::configuration::OpenAiSettings;
use crate::server::error::ChatError;

use super::types::{ApiErrorBody, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ModelList};

/// Model ids containing this marker are considered chat-capable.
const CHAT_MODEL_MARKER: &str = "gpt";

/// Thin client for an OpenAI-compatible completion service. Stateless beyond
/// the HTTP client; persistence of turns is the orchestrator's concern.
#[derive(Debug, Clone)]
pub struct OpenAiService {
    client: Client,
    api_key: Secret<String>,
    base_url: String,
    max_reply_tokens: i32,
}

impl OpenAiService {
    pub fn new(settings: &OpenAiSettings) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.completion_timeout_seconds))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.clone(),
            max_reply_tokens: settings.max_reply_tokens,
        }
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key: Secret::new(api_key),
            base_url,
            max_reply_tokens: 150,
        }
    }

    /// Sends the full ordered history (oldest first) and returns the trimmed
    /// text of the first choice, bounded by the configured reply limit.
    pub async fn complete(&self, model: &str, history: &[ChatMessage]) -> Result<String, ChatError> {
        self.request_completion(model, history, self.max_reply_tokens)
            .await
    }

    /// Same call with an explicit reply bound (used for session naming).
    pub async fn complete_with_max_tokens(
        &self,
        model: &str,
        history: &[ChatMessage],
        max_tokens: i32,
    ) -> Result<String, ChatError> {
        self.request_completion(model, history, max_tokens).await
    }

    async fn request_completion(
        &self,
        model: &str,
        history: &[ChatMessage],
        max_tokens: i32,
    ) -> Result<String, ChatError> {
        debug!("Requesting completion from {} ({} messages)", model, history.len());

        let request = ChatCompletionRequest {
            model: model.to_string(),
            messages: history.to_vec(),
            max_tokens: Some(max_tokens),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&request)
            .send()
            .await
            .map_err(|e| ChatError::Service(format!("completion request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_completion_error(model, status, &body));
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Service(format!("could not parse completion response: {}", e)))?;

        body.choices
            .first()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or_else(|| ChatError::Service("completion response had no choices".to_string()))
    }

    fn classify_completion_error(model: &str, status: StatusCode, body: &str) -> ChatError {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return ChatError::Auth;
        }

        let code = serde_json::from_str::<ApiErrorBody>(body)
            .ok()
            .and_then(|b| b.error.code);
        if status == StatusCode::NOT_FOUND || code.as_deref() == Some("model_not_found") {
            return ChatError::UnknownModel(model.to_string());
        }

        warn!("Completion API error ({}): {}", status, body);
        ChatError::Service(format!("completion service returned {}", status))
    }

    /// Queries the remote model listing and keeps the chat-capable ids.
    pub async fn list_models(&self) -> Result<Vec<String>, ChatError> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .send()
            .await
            .map_err(|e| ChatError::Service(format!("model listing failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ChatError::Auth);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Model listing error ({}): {}", status, body);
            return Err(ChatError::Service(format!(
                "model listing returned {}",
                status
            )));
        }

        let body: ModelList = response
            .json()
            .await
            .map_err(|e| ChatError::Service(format!("could not parse model listing: {}", e)))?;

        let mut models: Vec<String> = body
            .data
            .into_iter()
            .map(|m| m.id)
            .filter(|id| id.contains(CHAT_MODEL_MARKER))
            .collect();
        models.sort();

        Ok(models)
    }
}
