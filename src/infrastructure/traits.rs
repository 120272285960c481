//! Infrastructure traits, used for DI on higher levels

use crate::infrastructure::entities;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> sqlx::Result<Option<entities::Account>>;

    async fn find_by_username(&self, username: &str) -> sqlx::Result<Option<entities::Account>>;

    /// Looks up an account holding either the email or the username.
    async fn find_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> sqlx::Result<Option<entities::Account>>;

    async fn create_account(
        &self,
        account: entities::NewAccount,
    ) -> sqlx::Result<entities::Account>;

    /// Marks the account verified if `code` matches the stored code.
    ///
    /// Returns `false` when nothing matched.
    async fn verify_account(&self, email: &str, code: &str) -> sqlx::Result<bool>;

    async fn set_active_session(
        &self,
        username: &str,
        session_id: Option<i64>,
    ) -> sqlx::Result<()>;
}

#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Finds a session only if it is owned by `username`.
    async fn find_session(
        &self,
        session_id: i64,
        username: &str,
    ) -> sqlx::Result<Option<entities::ChatSession>>;

    async fn create_session(
        &self,
        username: &str,
        session_name: &str,
        created_at: DateTime<Utc>,
    ) -> sqlx::Result<entities::ChatSession>;

    /// Lists the user's sessions, most recently updated first.
    async fn list_sessions(&self, username: &str) -> sqlx::Result<Vec<entities::ChatSession>>;

    /// Returns `false` if no owned session was renamed.
    async fn rename_session(
        &self,
        session_id: i64,
        username: &str,
        session_name: &str,
    ) -> sqlx::Result<bool>;

    /// Deletes an owned session and all of its messages in one transaction.
    ///
    /// Returns `false` if no owned session existed.
    async fn delete_session(&self, session_id: i64, username: &str) -> sqlx::Result<bool>;

    /// Inserts a message and bumps the session's `updated_at` in one transaction.
    async fn append_message(
        &self,
        message: entities::NewChatMessage,
    ) -> sqlx::Result<entities::ChatMessage>;

    /// Lists messages of an owned session, oldest first.
    async fn list_messages(
        &self,
        session_id: i64,
        username: &str,
    ) -> sqlx::Result<Vec<entities::ChatMessage>>;
}

#[async_trait]
pub trait WebSessionRepository: Send + Sync {
    async fn create(&self, session: entities::WebSession) -> sqlx::Result<entities::WebSession>;

    async fn find(&self, token: Uuid) -> sqlx::Result<Option<entities::WebSession>>;

    async fn clear_pending_email(&self, token: Uuid) -> sqlx::Result<()>;

    async fn delete(&self, token: Uuid) -> sqlx::Result<()>;

    /// Removes every session created at or before `cutoff`.
    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> sqlx::Result<u64>;
}
