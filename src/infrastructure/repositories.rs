//! DB Repository abstractions

use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::entities::{
    Account, ChatMessage, ChatSession, NewAccount, NewChatMessage, WebSession,
};
use crate::infrastructure::traits::{AccountRepository, ChatRepository, WebSessionRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use di::{Ref, injectable};
use log::error;
use uuid::Uuid;

#[injectable(AccountRepository)]
pub struct DbAccountRepository {
    connection: Ref<DatabaseConnection>,
}

#[async_trait]
impl AccountRepository for DbAccountRepository {
    async fn find_by_email(&self, email: &str) -> sqlx::Result<Option<Account>> {
        sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&**self.connection)
            .await
            .inspect_err(|e| error!("failed to look up account by email: {e}"))
    }

    async fn find_by_username(&self, username: &str) -> sqlx::Result<Option<Account>> {
        sqlx::query_as("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&**self.connection)
            .await
            .inspect_err(|e| error!("failed to look up account by username: {e}"))
    }

    async fn find_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> sqlx::Result<Option<Account>> {
        sqlx::query_as("SELECT * FROM users WHERE email = ? OR username = ? LIMIT 1")
            .bind(email)
            .bind(username)
            .fetch_optional(&**self.connection)
            .await
            .inspect_err(|e| error!("failed to look up account: {e}"))
    }

    async fn create_account(&self, account: NewAccount) -> sqlx::Result<Account> {
        sqlx::query_as(
            "INSERT INTO users (email, username, password_hash, is_verified, verification_code) VALUES (?, ?, ?, 0, ?) RETURNING *",
        )
        .bind(account.email)
        .bind(account.username)
        .bind(account.password_hash)
        .bind(account.verification_code)
        .fetch_one(&**self.connection)
        .await
        .inspect_err(|e| error!("failed to create account: {e}"))
    }

    async fn verify_account(&self, email: &str, code: &str) -> sqlx::Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET is_verified = 1, verification_code = NULL WHERE email = ? AND verification_code = ? AND is_verified = 0",
        )
        .bind(email)
        .bind(code)
        .execute(&**self.connection)
        .await
        .inspect_err(|e| error!("failed to verify account: {e}"))?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_active_session(&self, username: &str, session_id: Option<i64>) -> sqlx::Result<()> {
        sqlx::query("UPDATE users SET active_session_id = ? WHERE username = ?")
            .bind(session_id)
            .bind(username)
            .execute(&**self.connection)
            .await
            .inspect_err(|e| error!("failed to store active session: {e}"))?;
        Ok(())
    }
}

#[injectable(ChatRepository)]
pub struct DbChatRepository {
    connection: Ref<DatabaseConnection>,
}

#[async_trait]
impl ChatRepository for DbChatRepository {
    async fn find_session(&self, session_id: i64, username: &str) -> sqlx::Result<Option<ChatSession>> {
        sqlx::query_as("SELECT * FROM chat_sessions WHERE id = ? AND username = ?")
            .bind(session_id)
            .bind(username)
            .fetch_optional(&**self.connection)
            .await
            .inspect_err(|e| error!("failed to look up chat session: {e}"))
    }

    async fn create_session(
        &self,
        username: &str,
        session_name: &str,
        created_at: DateTime<Utc>,
    ) -> sqlx::Result<ChatSession> {
        sqlx::query_as(
            "INSERT INTO chat_sessions (username, session_name, created_at, updated_at) VALUES (?, ?, ?, ?) RETURNING *",
        )
        .bind(username)
        .bind(session_name)
        .bind(created_at)
        .bind(created_at)
        .fetch_one(&**self.connection)
        .await
        .inspect_err(|e| error!("failed to create chat session: {e}"))
    }

    async fn list_sessions(&self, username: &str) -> sqlx::Result<Vec<ChatSession>> {
        sqlx::query_as(
            "SELECT * FROM chat_sessions WHERE username = ? ORDER BY updated_at DESC, id DESC",
        )
        .bind(username)
        .fetch_all(&**self.connection)
        .await
        .inspect_err(|e| error!("failed to list chat sessions: {e}"))
    }

    async fn rename_session(
        &self,
        session_id: i64,
        username: &str,
        session_name: &str,
    ) -> sqlx::Result<bool> {
        let result =
            sqlx::query("UPDATE chat_sessions SET session_name = ? WHERE id = ? AND username = ?")
                .bind(session_name)
                .bind(session_id)
                .bind(username)
                .execute(&**self.connection)
                .await
                .inspect_err(|e| error!("failed to rename chat session: {e}"))?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_session(&self, session_id: i64, username: &str) -> sqlx::Result<bool> {
        let mut tx = self
            .connection
            .begin()
            .await
            .inspect_err(|e| error!("failed to start transaction: {e}"))?;

        sqlx::query(
            "DELETE FROM chat_messages WHERE session_id IN (SELECT id FROM chat_sessions WHERE id = ? AND username = ?)",
        )
        .bind(session_id)
        .bind(username)
        .execute(&mut *tx)
        .await
        .inspect_err(|e| error!("failed to delete chat messages: {e}"))?;

        let deleted = sqlx::query("DELETE FROM chat_sessions WHERE id = ? AND username = ?")
            .bind(session_id)
            .bind(username)
            .execute(&mut *tx)
            .await
            .inspect_err(|e| error!("failed to delete chat session: {e}"))?
            .rows_affected();

        tx.commit()
            .await
            .inspect_err(|e| error!("failed to commit session delete: {e}"))?;

        Ok(deleted == 1)
    }

    async fn append_message(&self, message: NewChatMessage) -> sqlx::Result<ChatMessage> {
        let now = Utc::now();
        let mut tx = self
            .connection
            .begin()
            .await
            .inspect_err(|e| error!("failed to start transaction: {e}"))?;

        let touched = sqlx::query("UPDATE chat_sessions SET updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(message.session_id)
            .execute(&mut *tx)
            .await
            .inspect_err(|e| error!("failed to touch chat session: {e}"))?
            .rows_affected();

        if touched == 0 {
            error!("chat session {} does not exist", message.session_id);
            return Err(sqlx::Error::RowNotFound);
        }

        let saved: ChatMessage = sqlx::query_as(
            "INSERT INTO chat_messages (session_id, message_type, message_text, response_text, image_filename, image_name, voice_filename, language, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(message.session_id)
        .bind(message.message_type)
        .bind(message.message_text)
        .bind(message.response_text)
        .bind(message.image_filename)
        .bind(message.image_name)
        .bind(message.voice_filename)
        .bind(message.language)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .inspect_err(|e| error!("failed to save chat message: {e}"))?;

        tx.commit()
            .await
            .inspect_err(|e| error!("failed to commit chat message: {e}"))?;

        Ok(saved)
    }

    async fn list_messages(&self, session_id: i64, username: &str) -> sqlx::Result<Vec<ChatMessage>> {
        sqlx::query_as(
            "SELECT chat_messages.* FROM chat_messages INNER JOIN chat_sessions ON chat_sessions.id = chat_messages.session_id WHERE chat_messages.session_id = ? AND chat_sessions.username = ? ORDER BY chat_messages.created_at ASC, chat_messages.id ASC",
        )
        .bind(session_id)
        .bind(username)
        .fetch_all(&**self.connection)
        .await
        .inspect_err(|e| error!("failed to list chat messages: {e}"))
    }
}

#[injectable(WebSessionRepository)]
pub struct DbWebSessionRepository {
    connection: Ref<DatabaseConnection>,
}

#[async_trait]
impl WebSessionRepository for DbWebSessionRepository {
    async fn create(&self, session: WebSession) -> sqlx::Result<WebSession> {
        sqlx::query_as(
            "INSERT INTO web_sessions (token, username, pending_email, created_at) VALUES (?, ?, ?, ?) RETURNING *",
        )
        .bind(session.token)
        .bind(session.username)
        .bind(session.pending_email)
        .bind(session.created_at)
        .fetch_one(&**self.connection)
        .await
        .inspect_err(|e| error!("failed to create web session: {e}"))
    }

    async fn find(&self, token: Uuid) -> sqlx::Result<Option<WebSession>> {
        sqlx::query_as("SELECT * FROM web_sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(&**self.connection)
            .await
            .inspect_err(|e| error!("failed to look up web session: {e}"))
    }

    async fn clear_pending_email(&self, token: Uuid) -> sqlx::Result<()> {
        sqlx::query("UPDATE web_sessions SET pending_email = NULL WHERE token = ?")
            .bind(token)
            .execute(&**self.connection)
            .await
            .inspect_err(|e| error!("failed to update web session: {e}"))?;
        Ok(())
    }

    async fn delete(&self, token: Uuid) -> sqlx::Result<()> {
        sqlx::query("DELETE FROM web_sessions WHERE token = ?")
            .bind(token)
            .execute(&**self.connection)
            .await
            .inspect_err(|e| error!("failed to delete web session: {e}"))?;
        Ok(())
    }

    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> sqlx::Result<u64> {
        let result = sqlx::query("DELETE FROM web_sessions WHERE created_at <= ?")
            .bind(cutoff)
            .execute(&**self.connection)
            .await
            .inspect_err(|e| error!("failed to purge expired web sessions: {e}"))?;
        Ok(result.rows_affected())
    }
}
