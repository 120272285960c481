//! Application configuration, read from the environment at startup.

use sqlx::sqlite::SqliteConnectOptions;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Runtime configuration shared by every service through the DI container.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP listener binds to.
    pub bind_address: String,
    /// Key used to sign the browser session cookie.
    pub secret_key: String,
    /// Browser sessions older than this are rejected and purged.
    pub session_ttl: Duration,
    pub database: SqliteConnectOptions,
    pub uploads_dir: PathBuf,
    pub voices_dir: PathBuf,
    pub smtp: SmtpSettings,
    pub assistant: AssistantSettings,
    pub speech: SpeechSettings,
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    pub address: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AssistantSettings {
    /// `None` disables the remote call and every reply is a canned notice.
    pub api_key: Option<String>,
    pub url: String,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SpeechSettings {
    pub url: String,
    /// How long a chat request waits for audio before replying without it.
    pub deadline: Duration,
}

impl AppConfig {
    /// Build the configuration from environment variables (and `.env`, if present).
    pub fn from_env() -> anyhow::Result<AppConfig> {
        dotenvy::dotenv().ok();

        // Serverless hosts only allow writes below /tmp.
        let (default_database, uploads_dir, voices_dir) = if env_flag("VERCEL") {
            (
                "sqlite:///tmp/krishi.db",
                PathBuf::from("/tmp/uploads"),
                PathBuf::from("/tmp/voices"),
            )
        } else {
            (
                "sqlite://krishi.db",
                PathBuf::from("static/uploads"),
                PathBuf::from("static/voices"),
            )
        };

        let database_url = env_or("DATABASE_URL", default_database);
        let database = SqliteConnectOptions::from_str(&database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        Ok(AppConfig {
            bind_address: env_or("BIND_ADDRESS", "0.0.0.0:3000"),
            secret_key: env_or("SECRET_KEY", "krishi_secret_key"),
            session_ttl: Duration::from_secs(
                parse_env::<u64>("SESSION_TTL_HOURS", 7 * 24) * 3600,
            ),
            database,
            uploads_dir,
            voices_dir,
            smtp: SmtpSettings {
                server: env_or("SMTP_SERVER", "smtp.gmail.com"),
                port: parse_env("SMTP_PORT", 587),
                address: env_opt("EMAIL_ADDRESS"),
                password: env_opt("EMAIL_PASSWORD"),
            },
            assistant: AssistantSettings {
                api_key: env_opt("OPENROUTER_API_KEY"),
                url: env_or(
                    "OPENROUTER_URL",
                    "https://openrouter.ai/api/v1/chat/completions",
                ),
                model: env_or("OPENROUTER_MODEL", "google/gemini-2.0-flash-001"),
                timeout: Duration::from_secs(30),
            },
            speech: SpeechSettings {
                url: env_or("TTS_URL", "https://translate.google.com/translate_tts"),
                deadline: Duration::from_secs(parse_env("SYNTHESIS_TIMEOUT_SECS", 10)),
            },
        })
    }

    /// Create the upload and voice directories if they are missing.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.uploads_dir)?;
        std::fs::create_dir_all(&self.voices_dir)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_flag(key: &str) -> bool {
    std::env::var(key).is_ok_and(|v| v == "1")
}

fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
