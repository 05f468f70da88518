//! Group chat — persist messages and shape them for frames and REST history.

use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::frame::Data;
use crate::services::session::SessionUser;

/// Messages returned per history request.
const HISTORY_LIMIT: i64 = 100;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message body is empty")]
    EmptyMessage,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl crate::frame::ErrorCode for ChatError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyMessage => "E_EMPTY_MESSAGE",
            Self::Database(_) => "E_DATABASE",
        }
    }
}

/// A persisted chat message with its sender's identity.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub group_id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub sender_email: String,
    pub body: String,
    /// Milliseconds since Unix epoch.
    pub sent_at_ms: i64,
}

impl ChatMessage {
    /// Shape this message as flat frame data.
    #[must_use]
    pub fn to_data(&self) -> Data {
        let mut data = Data::new();
        data.insert("message_id".into(), serde_json::Value::String(self.id.to_string()));
        data.insert("sender_id".into(), serde_json::Value::String(self.sender_id.to_string()));
        data.insert("sender_name".into(), serde_json::Value::String(self.sender_name.clone()));
        data.insert("sender_email".into(), serde_json::Value::String(self.sender_email.clone()));
        data.insert("body".into(), serde_json::Value::String(self.body.clone()));
        data.insert("sent_at_ms".into(), serde_json::Value::from(self.sent_at_ms));
        data
    }
}

fn odt_to_ms(ts: OffsetDateTime) -> i64 {
    i64::try_from(ts.unix_timestamp_nanos() / 1_000_000).unwrap_or(0)
}

/// Persist a message and return it for fan-out.
///
/// # Errors
///
/// `EmptyMessage` if the body is blank after trimming; database errors
/// otherwise.
pub async fn send_message(
    pool: &PgPool,
    group_id: Uuid,
    sender: &SessionUser,
    body: &str,
) -> Result<ChatMessage, ChatError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(ChatError::EmptyMessage);
    }

    let id = Uuid::new_v4();
    let row = sqlx::query(
        "INSERT INTO messages (id, group_id, sender_id, body) VALUES ($1, $2, $3, $4)
         RETURNING created_at",
    )
    .bind(id)
    .bind(group_id)
    .bind(sender.id)
    .bind(body)
    .fetch_one(pool)
    .await?;
    let created_at: OffsetDateTime = row.get("created_at");

    Ok(ChatMessage {
        id,
        group_id,
        sender_id: sender.id,
        sender_name: sender.name.clone(),
        sender_email: sender.email.clone(),
        body: body.to_string(),
        sent_at_ms: odt_to_ms(created_at),
    })
}

/// Load recent messages for a group, oldest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_messages(pool: &PgPool, group_id: Uuid) -> Result<Vec<ChatMessage>, ChatError> {
    let rows = sqlx::query(
        r"SELECT m.id, m.sender_id, m.body, m.created_at, u.name, u.email
          FROM (
              SELECT id, sender_id, body, created_at
              FROM messages
              WHERE group_id = $1
              ORDER BY created_at DESC
              LIMIT $2
          ) m
          JOIN users u ON u.id = m.sender_id
          ORDER BY m.created_at ASC",
    )
    .bind(group_id)
    .bind(HISTORY_LIMIT)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| ChatMessage {
            id: r.get("id"),
            group_id,
            sender_id: r.get("sender_id"),
            sender_name: r.get("name"),
            sender_email: r.get("email"),
            body: r.get("body"),
            sent_at_ms: odt_to_ms(r.get("created_at")),
        })
        .collect())
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
