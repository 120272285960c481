//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use di::{Ref, ServiceProvider, singleton};
use krishi_mitra::app;
use krishi_mitra::config::{AppConfig, AssistantSettings, SmtpSettings, SpeechSettings};
use krishi_mitra::core::language::Language;
use krishi_mitra::core::services::Registration;
use krishi_mitra::core::traits::{
    AccountService, ChatService, Mailer, ReplyGenerator, SpeechSynthesizer, WebSessionService,
};
use krishi_mitra::infrastructure::database::DatabaseConnection;
use krishi_mitra::infrastructure::entities::Account;
use krishi_mitra::infrastructure::traits::{AccountRepository, WebSessionRepository};
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, OnceLock};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Configuration pointing at a private in-memory database and `dir`.
pub fn test_config(dir: &Path) -> AppConfig {
    AppConfig {
        bind_address: "127.0.0.1:0".to_owned(),
        secret_key: "test-secret".to_owned(),
        session_ttl: Duration::from_secs(3600),
        database: SqliteConnectOptions::from_str("sqlite::memory:").unwrap(),
        uploads_dir: dir.join("uploads"),
        voices_dir: dir.join("voices"),
        smtp: SmtpSettings {
            server: "localhost".to_owned(),
            port: 2525,
            address: None,
            password: None,
        },
        assistant: AssistantSettings {
            api_key: None,
            url: "http://127.0.0.1:9/v1/chat/completions".to_owned(),
            model: "test-model".to_owned(),
            timeout: Duration::from_secs(5),
        },
        speech: SpeechSettings {
            url: "http://127.0.0.1:9/translate_tts".to_owned(),
            deadline: Duration::from_secs(1),
        },
    }
}

/// Serves `router` on an ephemeral local port.
pub async fn spawn_server(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Records every verification email instead of sending it.
#[derive(Default)]
pub struct CapturingMailer {
    pub sent: Mutex<Vec<(String, String, String)>>,
    pub fail: AtomicBool,
}

impl CapturingMailer {
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _, _)| to == email)
            .map(|(_, _, code)| code.clone())
    }
}

#[async_trait]
impl Mailer for CapturingMailer {
    async fn send_verification(&self, email: &str, username: &str, code: &str) -> bool {
        if self.fail.load(Ordering::SeqCst) {
            return false;
        }
        self.sent
            .lock()
            .unwrap()
            .push((email.to_owned(), username.to_owned(), code.to_owned()));
        true
    }
}

/// Answers every prompt with the same text.
pub struct FixedAssistant {
    pub reply: String,
    pub prompts: Mutex<Vec<String>>,
}

impl FixedAssistant {
    pub fn new(reply: &str) -> FixedAssistant {
        FixedAssistant {
            reply: reply.to_owned(),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ReplyGenerator for FixedAssistant {
    async fn generate_reply(&self, prompt: &str, _language: Language) -> String {
        self.prompts.lock().unwrap().push(prompt.to_owned());
        self.reply.clone()
    }
}

/// Pretends to have written an audio file.
#[derive(Default)]
pub struct InstantSynthesizer {
    pub calls: AtomicUsize,
}

#[async_trait]
impl SpeechSynthesizer for InstantSynthesizer {
    async fn synthesize(
        &self,
        _text: &str,
        _language: Language,
        _cancel: CancellationToken,
    ) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Some("instant.mp3".to_owned())
    }
}

/// Never finishes on its own; only returns once cancelled.
#[derive(Default)]
pub struct StalledSynthesizer {
    pub cancelled: AtomicBool,
}

#[async_trait]
impl SpeechSynthesizer for StalledSynthesizer {
    async fn synthesize(
        &self,
        _text: &str,
        _language: Language,
        cancel: CancellationToken,
    ) -> Option<String> {
        cancel.cancelled().await;
        self.cancelled.store(true, Ordering::SeqCst);
        None
    }
}

/// Ignores cancellation and writes its file only after `delay`.
pub struct LateSynthesizer {
    pub delay: Duration,
    pub voices_dir: OnceLock<PathBuf>,
}

#[async_trait]
impl SpeechSynthesizer for LateSynthesizer {
    async fn synthesize(
        &self,
        _text: &str,
        _language: Language,
        _cancel: CancellationToken,
    ) -> Option<String> {
        tokio::time::sleep(self.delay).await;
        let filename = "late.mp3".to_owned();
        let dir = self.voices_dir.get()?;
        tokio::fs::write(dir.join(&filename), b"late-audio").await.ok()?;
        Some(filename)
    }
}

/// Deletes every chat session while "thinking", so the reply cannot be saved.
#[derive(Default)]
pub struct SessionWipingAssistant {
    pub pool: OnceLock<SqlitePool>,
}

#[async_trait]
impl ReplyGenerator for SessionWipingAssistant {
    async fn generate_reply(&self, _prompt: &str, _language: Language) -> String {
        let pool = self.pool.get().unwrap();
        sqlx::query("DELETE FROM chat_sessions")
            .execute(pool)
            .await
            .unwrap();
        "lost reply".to_owned()
    }
}

/// Names of the files in `dir`.
pub fn files_in(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

pub struct TestApp {
    pub dir: TempDir,
    pub config: AppConfig,
    pub router: Router,
    /// Provider behind `router`, for calling services directly.
    pub services: ServiceProvider,
    pub mailer: Ref<CapturingMailer>,
}

impl TestApp {
    pub async fn new(
        assistant: Ref<dyn ReplyGenerator>,
        speech: Ref<dyn SpeechSynthesizer>,
    ) -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        config.ensure_directories().unwrap();

        let mailer = Ref::new(CapturingMailer::default());
        let mailer_instance = mailer.clone();

        let mut services = app::services(config.clone());
        services
            .add(
                singleton::<dyn ReplyGenerator, FixedAssistant>()
                    .from(move |_| assistant.clone()),
            )
            .add(
                singleton::<dyn SpeechSynthesizer, InstantSynthesizer>()
                    .from(move |_| speech.clone()),
            )
            .add(
                singleton::<dyn Mailer, CapturingMailer>()
                    .from(move |_| mailer_instance.clone() as Ref<dyn Mailer>),
            );
        let provider = services.build_provider().unwrap();

        provider
            .get_required::<DatabaseConnection>()
            .migrate()
            .await
            .unwrap();

        let router = app::router(provider.clone(), &config);

        TestApp {
            dir,
            config,
            router,
            services: provider,
            mailer,
        }
    }

    pub async fn with_reply(reply: &str) -> TestApp {
        TestApp::new(
            Ref::new(FixedAssistant::new(reply)),
            Ref::new(InstantSynthesizer::default()),
        )
        .await
    }

    pub fn accounts(&self) -> Ref<dyn AccountService> {
        self.services.get_required::<dyn AccountService>()
    }

    pub fn chat(&self) -> Ref<dyn ChatService> {
        self.services.get_required::<dyn ChatService>()
    }

    pub fn web_sessions(&self) -> Ref<dyn WebSessionService> {
        self.services.get_required::<dyn WebSessionService>()
    }

    pub fn database(&self) -> Ref<DatabaseConnection> {
        self.services.get_required::<DatabaseConnection>()
    }

    pub fn web_session_rows(&self) -> Ref<dyn WebSessionRepository> {
        self.services.get_required::<dyn WebSessionRepository>()
    }

    /// Stored account row for `email`.
    pub async fn account(&self, email: &str) -> Option<Account> {
        self.services
            .get_required::<dyn AccountRepository>()
            .find_by_email(email)
            .await
            .unwrap()
    }

    /// Registers and verifies an account through the real flow.
    pub async fn verified_user(&self, username: &str) -> String {
        let email = format!("{username}@example.in");
        self.accounts()
            .register(Registration {
                email: email.clone(),
                username: username.to_owned(),
                password: "s3cret-pass".to_owned(),
            })
            .await
            .unwrap();
        let code = self.mailer.last_code_for(&email).unwrap();
        self.accounts().verify_email(&email, &code).await.unwrap();
        email
    }

    /// `Cookie` header value for a signed-in browser of `username`.
    pub async fn signed_in_cookie(&self, username: &str) -> String {
        self.verified_user(username).await;
        let (_, cookie) = self
            .web_sessions()
            .start(Some(username.to_owned()), None)
            .await
            .unwrap();
        format!("krishi_session={cookie}")
    }
}
