//! Database entities

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub is_verified: bool,
    pub verification_code: Option<String>,
    /// Chat session the account was last looking at.
    pub active_session_id: Option<i64>,
}

/// Row data for a freshly registered, unverified account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub verification_code: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct ChatSession {
    pub id: i64,
    pub username: String,
    pub session_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
}

#[derive(Debug, Clone, FromRow)]
pub struct ChatMessage {
    pub id: i64,
    pub session_id: i64,
    pub message_type: MessageKind,
    pub message_text: String,
    pub response_text: String,
    /// Stored file name below the uploads directory.
    pub image_filename: Option<String>,
    /// Name the client gave the upload; display only.
    pub image_name: Option<String>,
    pub voice_filename: Option<String>,
    pub language: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewChatMessage {
    pub session_id: i64,
    pub message_type: MessageKind,
    pub message_text: String,
    pub response_text: String,
    pub image_filename: Option<String>,
    pub image_name: Option<String>,
    pub voice_filename: Option<String>,
    pub language: String,
}

/// Server side state of one browser, keyed by the token in its cookie.
#[derive(Debug, Clone, FromRow)]
pub struct WebSession {
    pub token: Uuid,
    pub username: Option<String>,
    pub pending_email: Option<String>,
    pub created_at: DateTime<Utc>,
}
