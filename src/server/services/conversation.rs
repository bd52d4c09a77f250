use chrono::Utc;
use sqlx::SqlitePool;

use crate::server::error::ChatError;
use crate::server::models::chat::{Role, Turn};

/// Append-only log of turns per session. Turns are never edited or removed;
/// the autoincrement id is the replay order.
pub struct ConversationLog {
    pool: SqlitePool,
}

impl ConversationLog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn append_turn(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
    ) -> Result<Turn, ChatError> {
        let created_at = Utc::now();

        let id = sqlx::query(
            "INSERT INTO turns (session_id, role, content, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(session_id)
        .bind(role)
        .bind(content)
        .bind(created_at)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(Turn {
            id,
            session_id: session_id.to_string(),
            role,
            content: content.to_string(),
            created_at,
        })
    }

    pub async fn list_turns(&self, session_id: &str) -> Result<Vec<Turn>, ChatError> {
        let turns = sqlx::query_as::<_, Turn>(
            "SELECT id, session_id, role, content, created_at
             FROM turns
             WHERE session_id = ?1
             ORDER BY id ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(turns)
    }
}
