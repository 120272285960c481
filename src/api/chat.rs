//! Chat endpoints

use crate::api::pages::render;
use crate::api::{ExtractSessionCookie, signed_in_user};
use crate::api::chat::schemas::{
    ActionResult, ChatForm, MessageView, NewChatResponse, RenameRequest, SessionView,
};
use crate::core::language::Language;
use crate::core::orchestrator::{ChatReply, ImageUpload, LOGIN_REQUIRED, UPLOAD_IMAGE};
use crate::core::traits::{ChatService, WebSessionService};
use axum::extract::{DefaultBodyLimit, Multipart, Path};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{delete, get, post};
use axum::{Form, Json, Router};
use di_axum::Inject;
use log::warn;
use minijinja::context;

/// Largest accepted image upload.
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

pub fn router() -> Router {
    Router::new()
        .route("/index", get(index))
        .route("/new_chat", post(new_chat))
        .route("/switch_session/:id", get(switch_session))
        .route("/chat", post(chat))
        .route(
            "/upload",
            post(upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/delete_session/:id", delete(delete_session))
        .route("/rename_session/:id", post(rename_session))
}

async fn index(
    Inject(chat): Inject<dyn ChatService>,
    Inject(web_sessions): Inject<dyn WebSessionService>,
    cookie: ExtractSessionCookie,
) -> Response {
    let Some(user) = signed_in_user(&web_sessions, &cookie).await else {
        return Redirect::to("/login").into_response();
    };
    let Some(current) = chat.current_session(&user).await else {
        return (StatusCode::INTERNAL_SERVER_ERROR, "chat session unavailable").into_response();
    };

    let current_messages: Vec<MessageView> = chat
        .list_messages(&user, current.id)
        .await
        .into_iter()
        .map(MessageView::from)
        .collect();
    let chat_sessions: Vec<SessionView> = chat
        .list_sessions(&user)
        .await
        .into_iter()
        .map(SessionView::from)
        .collect();

    render(
        "index.html",
        context! {
            user,
            current_messages,
            chat_sessions,
            current_session_id => current.id,
            current_session_name => current.session_name,
        },
    )
}

async fn new_chat(
    Inject(chat): Inject<dyn ChatService>,
    Inject(web_sessions): Inject<dyn WebSessionService>,
    cookie: ExtractSessionCookie,
) -> Response {
    let Some(user) = signed_in_user(&web_sessions, &cookie).await else {
        return Json(ActionResult::failed("Not logged in")).into_response();
    };

    match chat.new_session(&user).await {
        Some(session) => Json(NewChatResponse {
            success: true,
            session_id: session.id,
            session_name: session.session_name,
            messages: Vec::new(),
        })
        .into_response(),
        None => Json(ActionResult::failed("Could not create chat")).into_response(),
    }
}

async fn switch_session(
    Inject(chat): Inject<dyn ChatService>,
    Inject(web_sessions): Inject<dyn WebSessionService>,
    cookie: ExtractSessionCookie,
    Path(session_id): Path<i64>,
) -> Redirect {
    let Some(user) = signed_in_user(&web_sessions, &cookie).await else {
        return Redirect::to("/login");
    };
    chat.switch_session(&user, session_id).await;
    Redirect::to("/index")
}

async fn chat(
    Inject(chat): Inject<dyn ChatService>,
    Inject(web_sessions): Inject<dyn WebSessionService>,
    cookie: ExtractSessionCookie,
    Form(form): Form<ChatForm>,
) -> Json<ChatReply> {
    let Some(user) = signed_in_user(&web_sessions, &cookie).await else {
        return Json(ChatReply::text_only(LOGIN_REQUIRED));
    };

    Json(
        chat.send_text(&user, &form.message, Language::from_code(&form.lang))
            .await,
    )
}

async fn upload(
    Inject(chat): Inject<dyn ChatService>,
    Inject(web_sessions): Inject<dyn WebSessionService>,
    cookie: ExtractSessionCookie,
    mut multipart: Multipart,
) -> Json<ChatReply> {
    let Some(user) = signed_in_user(&web_sessions, &cookie).await else {
        return Json(ChatReply::text_only(LOGIN_REQUIRED));
    };

    let mut image = None;
    let mut lang = String::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!("malformed upload: {e}");
                return Json(ChatReply::text_only(UPLOAD_IMAGE));
            }
        };

        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "image" => {
                let original_name = field.file_name().unwrap_or_default().to_owned();
                match field.bytes().await {
                    Ok(bytes) => {
                        image = Some(ImageUpload {
                            original_name,
                            bytes: bytes.to_vec(),
                        })
                    }
                    Err(e) => {
                        warn!("failed to read upload: {e}");
                        return Json(ChatReply::text_only(UPLOAD_IMAGE));
                    }
                }
            }
            "lang" => lang = field.text().await.unwrap_or_default(),
            _ => {}
        }
    }

    let Some(image) = image else {
        return Json(ChatReply::text_only(UPLOAD_IMAGE));
    };
    Json(
        chat.send_image(&user, image, Language::from_code(&lang))
            .await,
    )
}

async fn delete_session(
    Inject(chat): Inject<dyn ChatService>,
    Inject(web_sessions): Inject<dyn WebSessionService>,
    cookie: ExtractSessionCookie,
    Path(session_id): Path<i64>,
) -> Json<ActionResult> {
    let Some(user) = signed_in_user(&web_sessions, &cookie).await else {
        return Json(ActionResult::failed("Not logged in"));
    };

    if chat.delete_session(&user, session_id).await {
        Json(ActionResult::ok())
    } else {
        Json(ActionResult {
            success: false,
            error: None,
        })
    }
}

async fn rename_session(
    Inject(chat): Inject<dyn ChatService>,
    Inject(web_sessions): Inject<dyn WebSessionService>,
    cookie: ExtractSessionCookie,
    Path(session_id): Path<i64>,
    Json(request): Json<RenameRequest>,
) -> Json<ActionResult> {
    let Some(user) = signed_in_user(&web_sessions, &cookie).await else {
        return Json(ActionResult::failed("Not logged in"));
    };

    if request.new_name.trim().is_empty() {
        return Json(ActionResult::failed("Name cannot be empty"));
    }

    if chat.rename_session(&user, session_id, &request.new_name).await {
        Json(ActionResult::ok())
    } else {
        Json(ActionResult::failed("Session not found"))
    }
}

pub mod schemas {
    use crate::core::orchestrator::voice_url;
    use crate::infrastructure::entities;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};

    #[derive(Deserialize, Debug, Default)]
    pub struct ChatForm {
        #[serde(default)]
        pub message: String,
        #[serde(default)]
        pub lang: String,
    }

    #[derive(Deserialize, Debug, Default)]
    pub struct RenameRequest {
        #[serde(default)]
        pub new_name: String,
    }

    #[derive(Serialize, Debug)]
    pub struct ActionResult {
        pub success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub error: Option<String>,
    }

    impl ActionResult {
        pub fn ok() -> ActionResult {
            ActionResult {
                success: true,
                error: None,
            }
        }

        pub fn failed(error: &str) -> ActionResult {
            ActionResult {
                success: false,
                error: Some(error.to_owned()),
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct NewChatResponse {
        pub success: bool,
        pub session_id: i64,
        pub session_name: String,
        pub messages: Vec<MessageView>,
    }

    #[derive(Serialize, Debug)]
    pub struct SessionView {
        pub id: i64,
        pub name: String,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    impl From<entities::ChatSession> for SessionView {
        fn from(session: entities::ChatSession) -> Self {
            SessionView {
                id: session.id,
                name: session.session_name,
                created_at: session.created_at,
                updated_at: session.updated_at,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct MessageView {
        pub message_type: entities::MessageKind,
        pub message_text: String,
        pub response_text: String,
        pub image_url: Option<String>,
        pub image_name: Option<String>,
        pub voice_url: Option<String>,
        pub language: String,
        pub created_at: DateTime<Utc>,
    }

    impl From<entities::ChatMessage> for MessageView {
        fn from(message: entities::ChatMessage) -> Self {
            MessageView {
                message_type: message.message_type,
                message_text: message.message_text,
                response_text: message.response_text,
                image_url: message
                    .image_filename
                    .map(|filename| format!("/uploads/{filename}")),
                image_name: message.image_name,
                voice_url: message.voice_filename.as_deref().map(voice_url),
                language: message.language,
                created_at: message.created_at,
            }
        }
    }
}
