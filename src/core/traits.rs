//! DI "Interfaces"

use crate::core::language::Language;
use crate::core::orchestrator::{ChatReply, ImageUpload};
use crate::core::services::{AccountError, LoginOutcome, Registration};
use crate::infrastructure::entities;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Turns a user utterance into assistant text.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// Never fails: upstream problems become a canned sentence in `language`.
    async fn generate_reply(&self, prompt: &str, language: Language) -> String;
}

/// Turns assistant text into an audio file in the voices directory.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Returns the stored file name, or `None` when no audio was produced.
    ///
    /// Implementations must stop promptly once `cancel` fires and must not
    /// leave a partial file behind.
    async fn synthesize(
        &self,
        text: &str,
        language: Language,
        cancel: CancellationToken,
    ) -> Option<String>;
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends the verification code; `false` if the mail did not go out.
    async fn send_verification(&self, email: &str, username: &str, code: &str) -> bool;
}

#[async_trait]
pub trait AccountService: Send + Sync {
    /// Creates an unverified account and mails its verification code.
    ///
    /// Returns the normalised email the code was sent to.
    async fn register(&self, registration: Registration) -> Result<String, AccountError>;

    /// Confirms the pending email with the code that was mailed to it.
    async fn verify_email(&self, email: &str, code: &str) -> Result<(), AccountError>;

    async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AccountError>;
}

/// Server side browser sessions behind the signed cookie.
#[async_trait]
pub trait WebSessionService: Send + Sync {
    /// Starts a new browser session and returns it with its cookie value.
    async fn start(
        &self,
        username: Option<String>,
        pending_email: Option<String>,
    ) -> Option<(entities::WebSession, String)>;

    /// Resolves a cookie value; bad signatures and unknown tokens yield `None`.
    async fn resolve(&self, cookie: Option<&str>) -> Option<entities::WebSession>;

    async fn clear_pending_email(&self, token: Uuid) -> bool;

    async fn end(&self, token: Uuid) -> bool;
}

/// Chat session bookkeeping and the message pipeline.
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Returns the requested session if `username` owns it, otherwise a new one.
    async fn get_or_create_session(
        &self,
        username: &str,
        session_id: Option<i64>,
    ) -> Option<entities::ChatSession>;

    /// The session the user is currently viewing, created if needed.
    async fn current_session(&self, username: &str) -> Option<entities::ChatSession>;

    /// Creates a session and makes it current.
    async fn new_session(&self, username: &str) -> Option<entities::ChatSession>;

    /// Makes `session_id` current, or a fresh session if the user does not own it.
    async fn switch_session(&self, username: &str, session_id: i64)
    -> Option<entities::ChatSession>;

    async fn list_sessions(&self, username: &str) -> Vec<entities::ChatSession>;

    async fn list_messages(&self, username: &str, session_id: i64) -> Vec<entities::ChatMessage>;

    /// Deletes the session and its messages.
    ///
    /// If it was the current session, a fresh one becomes current.
    async fn delete_session(&self, username: &str, session_id: i64) -> bool;

    /// Returns `false` if the user owns no such session.
    async fn rename_session(&self, username: &str, session_id: i64, name: &str) -> bool;

    async fn send_text(&self, username: &str, message: &str, language: Language) -> ChatReply;

    async fn send_image(
        &self,
        username: &str,
        upload: ImageUpload,
        language: Language,
    ) -> ChatReply;
}
