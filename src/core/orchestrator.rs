//! Chat orchestration: resolves the current session, generates the reply,
//! synthesises speech under a deadline and persists the exchange.

use crate::config::AppConfig;
use crate::core::language::Language;
use crate::core::traits::{ChatService, ReplyGenerator, SpeechSynthesizer};
use crate::infrastructure::entities::{ChatMessage, ChatSession, MessageKind, NewChatMessage};
use crate::infrastructure::traits::{AccountRepository, ChatRepository};
use async_trait::async_trait;
use chrono::{Local, Utc};
use di::{Ref, injectable};
use log::{error, info, warn};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub const LOGIN_REQUIRED: &str = "Please login first.";
pub const ENTER_MESSAGE: &str = "ದಯವಿಟ್ಟು ಸಂದೇಶವನ್ನು ನಮೂದಿಸಿ.";
pub const UPLOAD_IMAGE: &str = "ದಯವಿಟ್ಟು ಚಿತ್ರವನ್ನು ಅಪ್‌ಲೋಡ್ ಮಾಡಿ.";

/// How long a cancelled producer may take to report a file it already wrote.
const LATE_AUDIO_GRACE: Duration = Duration::from_secs(1);

/// What `/chat` and `/upload` answer with.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub reply: String,
    /// URL of the synthesised audio, if any.
    pub voice: Option<String>,
}

impl ChatReply {
    pub fn text_only(reply: impl Into<String>) -> ChatReply {
        ChatReply {
            reply: reply.into(),
            voice: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// File name as sent by the client. Never used as a path.
    pub original_name: String,
    pub bytes: Vec<u8>,
}

pub fn default_session_name() -> String {
    format!("Chat {}", Local::now().format("%Y-%m-%d %H:%M"))
}

pub fn voice_url(filename: &str) -> String {
    format!("/voices/{filename}")
}

/// Opaque stored name for an upload, keeping a short alphanumeric extension.
pub fn stored_image_name(original_name: &str) -> String {
    let extension = original_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| (1..=5).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".to_owned());
    format!("{}.{extension}", Uuid::new_v4().simple())
}

pub fn image_prompt(original_name: &str, language: Language) -> String {
    format!(
        "A farmer uploaded a crop image named {original_name}. Analyze this image and describe what crop it may be, identify any visible diseases or pests, and suggest remedies in {} language.",
        language.code()
    )
}

#[injectable(ChatService)]
pub struct ChatOrchestrator {
    chats: Ref<dyn ChatRepository>,
    accounts: Ref<dyn AccountRepository>,
    assistant: Ref<dyn ReplyGenerator>,
    speech: Ref<dyn SpeechSynthesizer>,
    config: Ref<AppConfig>,
}

impl ChatOrchestrator {
    async fn make_current(&self, username: &str, session: Option<ChatSession>) -> Option<ChatSession> {
        let session = session?;
        // The session is still usable for this request if remembering it fails.
        if let Err(e) = self
            .accounts
            .set_active_session(username, Some(session.id))
            .await
        {
            warn!("could not make session {} current for {username}: {e}", session.id);
        }
        Some(session)
    }

    /// Runs synthesis as its own task and gives up after the configured deadline.
    ///
    /// The task is cancelled when the deadline passes or when this future is
    /// dropped, e.g. because the client went away.
    async fn synthesize_with_deadline(&self, text: &str, language: Language) -> Option<String> {
        let cancel = CancellationToken::new();
        let _cancel_on_drop = cancel.clone().drop_guard();
        let speech = self.speech.clone();
        let text = text.to_owned();
        let token = cancel.clone();
        let mut task =
            tokio::spawn(async move { speech.synthesize(&text, language, token).await });

        let outcome = tokio::time::timeout(self.config.speech.deadline, &mut task).await;
        match outcome {
            Ok(Ok(filename)) => filename,
            Ok(Err(e)) => {
                error!("speech synthesis task failed: {e}");
                None
            }
            Err(_) => {
                warn!(
                    "speech synthesis exceeded {:?}, replying without audio",
                    self.config.speech.deadline
                );
                cancel.cancel();
                // A producer that finished right at the deadline may still hand back a file.
                let late = tokio::time::timeout(LATE_AUDIO_GRACE, task).await;
                if let Ok(Ok(Some(filename))) = late {
                    self.remove_file(&self.config.voices_dir.join(filename)).await;
                }
                None
            }
        }
    }

    async fn remove_file(&self, path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!("failed to remove {}: {e}", path.display());
        }
    }

    async fn exchange(
        &self,
        username: &str,
        prompt: &str,
        language: Language,
        record: NewChatMessage,
    ) -> (ChatReply, bool) {
        let reply = self.assistant.generate_reply(prompt, language).await;
        let voice_filename = self.synthesize_with_deadline(&reply, language).await;

        let saved = self
            .chats
            .append_message(NewChatMessage {
                response_text: reply.clone(),
                voice_filename: voice_filename.clone(),
                ..record
            })
            .await;
        if saved.is_err() {
            error!("reply for {username} was not saved");
            if let Some(filename) = &voice_filename {
                self.remove_file(&self.config.voices_dir.join(filename)).await;
            }
            return (ChatReply::text_only(reply), false);
        }

        let voice = voice_filename.as_deref().map(voice_url);
        (ChatReply { reply, voice }, true)
    }
}

#[async_trait]
impl ChatService for ChatOrchestrator {
    async fn get_or_create_session(
        &self,
        username: &str,
        session_id: Option<i64>,
    ) -> Option<ChatSession> {
        if let Some(session_id) = session_id {
            match self.chats.find_session(session_id, username).await {
                Ok(Some(session)) => return Some(session),
                Ok(None) => {}
                Err(_) => return None,
            }
        }

        self.chats
            .create_session(username, &default_session_name(), Utc::now())
            .await
            .ok()
    }

    async fn current_session(&self, username: &str) -> Option<ChatSession> {
        let active = self
            .accounts
            .find_by_username(username)
            .await
            .ok()
            .flatten()?
            .active_session_id;

        let session = self.get_or_create_session(username, active).await?;
        if active == Some(session.id) {
            Some(session)
        } else {
            self.make_current(username, Some(session)).await
        }
    }

    async fn new_session(&self, username: &str) -> Option<ChatSession> {
        let session = self.get_or_create_session(username, None).await;
        self.make_current(username, session).await
    }

    async fn switch_session(&self, username: &str, session_id: i64) -> Option<ChatSession> {
        let session = self.get_or_create_session(username, Some(session_id)).await;
        self.make_current(username, session).await
    }

    async fn list_sessions(&self, username: &str) -> Vec<ChatSession> {
        self.chats
            .list_sessions(username)
            .await
            .unwrap_or_default()
    }

    async fn list_messages(&self, username: &str, session_id: i64) -> Vec<ChatMessage> {
        self.chats
            .list_messages(session_id, username)
            .await
            .unwrap_or_default()
    }

    async fn delete_session(&self, username: &str, session_id: i64) -> bool {
        let was_active = self
            .accounts
            .find_by_username(username)
            .await
            .ok()
            .flatten()
            .and_then(|account| account.active_session_id)
            == Some(session_id);

        let Ok(deleted) = self.chats.delete_session(session_id, username).await else {
            return false;
        };

        if deleted {
            info!("deleted chat session {session_id} of {username}");
            if was_active {
                self.new_session(username).await;
            }
        }
        deleted
    }

    async fn rename_session(&self, username: &str, session_id: i64, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        self.chats
            .rename_session(session_id, username, name)
            .await
            .unwrap_or(false)
    }

    async fn send_text(&self, username: &str, message: &str, language: Language) -> ChatReply {
        let message = message.trim();
        if message.is_empty() {
            return ChatReply::text_only(ENTER_MESSAGE);
        }

        let Some(session) = self.current_session(username).await else {
            return ChatReply::text_only(LOGIN_REQUIRED);
        };

        let record = NewChatMessage {
            session_id: session.id,
            message_type: MessageKind::Text,
            message_text: message.to_owned(),
            response_text: String::new(),
            image_filename: None,
            image_name: None,
            voice_filename: None,
            language: language.code().to_owned(),
        };
        self.exchange(username, message, language, record).await.0
    }

    async fn send_image(
        &self,
        username: &str,
        upload: ImageUpload,
        language: Language,
    ) -> ChatReply {
        if upload.original_name.trim().is_empty() || upload.bytes.is_empty() {
            return ChatReply::text_only(UPLOAD_IMAGE);
        }

        let Some(session) = self.current_session(username).await else {
            return ChatReply::text_only(LOGIN_REQUIRED);
        };

        let stored_name = stored_image_name(&upload.original_name);
        let path = self.config.uploads_dir.join(&stored_name);
        if let Err(e) = tokio::fs::write(&path, &upload.bytes).await {
            error!("failed to store upload {}: {e}", path.display());
            return ChatReply::text_only(UPLOAD_IMAGE);
        }

        let prompt = image_prompt(&upload.original_name, language);
        let record = NewChatMessage {
            session_id: session.id,
            message_type: MessageKind::Image,
            message_text: format!("Image: {}", upload.original_name),
            response_text: String::new(),
            image_filename: Some(stored_name),
            image_name: Some(upload.original_name),
            voice_filename: None,
            language: language.code().to_owned(),
        };
        let (reply, saved) = self.exchange(username, &prompt, language, record).await;
        if !saved {
            self.remove_file(&path).await;
        }
        reply
    }
}
