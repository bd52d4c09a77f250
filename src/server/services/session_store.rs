use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::server::error::ChatError;
use crate::server::models::chat::Session;

const CREATE_ATTEMPTS: u32 = 3;

/// Persisted session records. Sessions are created unnamed, named exactly
/// once by the orchestrator, and never deleted.
pub struct SessionStore {
    pool: SqlitePool,
}

impl SessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Timestamp-based id with a random suffix so two sessions created in
    /// the same second still differ.
    fn generate_session_id() -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}-{}", Utc::now().format("%Y%m%d%H%M%S"), &suffix[..8])
    }

    pub async fn create_session(&self) -> Result<Session, ChatError> {
        for _ in 0..CREATE_ATTEMPTS {
            let session_id = Self::generate_session_id();
            let created_at = Utc::now();

            let result =
                sqlx::query("INSERT INTO sessions (session_id, name, created_at) VALUES (?1, '', ?2)")
                    .bind(&session_id)
                    .bind(created_at)
                    .execute(&self.pool)
                    .await;

            match result {
                Ok(_) => {
                    info!("Created session {}", session_id);
                    return Ok(Session {
                        session_id,
                        name: String::new(),
                        created_at,
                    });
                }
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(ChatError::SessionConflict)
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Session, ChatError> {
        sqlx::query_as::<_, Session>(
            "SELECT session_id, name, created_at FROM sessions WHERE session_id = ?1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ChatError::SessionNotFound(session_id.to_string()))
    }

    pub async fn list_sessions(&self) -> Result<Vec<Session>, ChatError> {
        let sessions = sqlx::query_as::<_, Session>(
            "SELECT session_id, name, created_at FROM sessions ORDER BY id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    /// Sets the display name while it is still empty. Renaming an already
    /// named session is a no-op; renaming a missing one is an error.
    pub async fn rename_session(&self, session_id: &str, name: &str) -> Result<(), ChatError> {
        let result = sqlx::query("UPDATE sessions SET name = ?1 WHERE session_id = ?2 AND name = ''")
            .bind(name)
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            // Distinguish "already named" from "no such session".
            self.get_session(session_id).await?;
        }

        Ok(())
    }
}
