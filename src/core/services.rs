//! Implementations for the account and browser session services.
//!

use crate::config::AppConfig;
use crate::core::credentials;
use crate::core::traits::{AccountService, Mailer, WebSessionService};
use crate::infrastructure::entities::{Account, NewAccount, WebSession};
use crate::infrastructure::traits::{AccountRepository, WebSessionRepository};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use di::{Ref, injectable};
use log::{debug, error, info, warn};
use thiserror::Error;
use uuid::Uuid;

/// Account flow failures; `Display` is the sentence shown on the form.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountError {
    #[error("Fill all fields.")]
    MissingFields,

    #[error("Enter valid email.")]
    InvalidEmail,

    #[error("Email/Username exists.")]
    AlreadyExists,

    #[error("Failed to send email.")]
    EmailDelivery,

    #[error("Enter code")]
    EmptyCode,

    #[error("Invalid code")]
    InvalidCode,

    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("Something went wrong. Please try again.")]
    Storage,
}

/// Raw registration form input.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub enum LoginOutcome {
    Authenticated(Account),
    /// Credentials matched an account that has not confirmed its email yet.
    PendingVerification(String),
}

#[injectable(AccountService)]
pub struct DbAccountService {
    accounts: Ref<dyn AccountRepository>,
    mailer: Ref<dyn Mailer>,
}

#[async_trait]
impl AccountService for DbAccountService {
    async fn register(&self, registration: Registration) -> Result<String, AccountError> {
        let email = registration.email.trim().to_lowercase();
        let username = registration.username.trim().to_owned();
        let password = registration.password.trim();

        if email.is_empty() || username.is_empty() || password.is_empty() {
            return Err(AccountError::MissingFields);
        }
        if !credentials::is_valid_email(&email) {
            return Err(AccountError::InvalidEmail);
        }

        let existing = self
            .accounts
            .find_by_email_or_username(&email, &username)
            .await
            .map_err(|_| AccountError::Storage)?;
        if existing.is_some() {
            return Err(AccountError::AlreadyExists);
        }

        let password_hash = credentials::hash_password(password).map_err(|e| {
            error!("failed to hash password: {e}");
            AccountError::Storage
        })?;
        let code = credentials::generate_verification_code();

        self.accounts
            .create_account(NewAccount {
                email: email.clone(),
                username: username.clone(),
                password_hash,
                verification_code: code.clone(),
            })
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => AccountError::AlreadyExists,
                _ => AccountError::Storage,
            })?;

        // The account row stays even if the mail fails.
        if !self.mailer.send_verification(&email, &username, &code).await {
            return Err(AccountError::EmailDelivery);
        }

        info!("registered account {username}");
        Ok(email)
    }

    async fn verify_email(&self, email: &str, code: &str) -> Result<(), AccountError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(AccountError::EmptyCode);
        }

        match self.accounts.verify_account(email, code).await {
            Ok(true) => {
                info!("verified {email}");
                Ok(())
            }
            Ok(false) => Err(AccountError::InvalidCode),
            Err(_) => Err(AccountError::Storage),
        }
    }

    async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AccountError> {
        let email = email.trim().to_lowercase();
        let account = self
            .accounts
            .find_by_email(&email)
            .await
            .map_err(|_| AccountError::Storage)?
            .ok_or(AccountError::InvalidCredentials)?;

        if !credentials::verify_password(&account.password_hash, password.trim()) {
            warn!("rejected login for {email}");
            return Err(AccountError::InvalidCredentials);
        }

        if account.is_verified {
            Ok(LoginOutcome::Authenticated(account))
        } else {
            Ok(LoginOutcome::PendingVerification(email))
        }
    }
}

#[injectable(WebSessionService)]
pub struct DbWebSessionService {
    sessions: Ref<dyn WebSessionRepository>,
    config: Ref<AppConfig>,
}

impl DbWebSessionService {
    /// Sessions created at or before this instant have expired.
    fn expiry_cutoff(&self) -> Option<DateTime<Utc>> {
        let ttl = TimeDelta::from_std(self.config.session_ttl).ok()?;
        Utc::now().checked_sub_signed(ttl)
    }
}

#[async_trait]
impl WebSessionService for DbWebSessionService {
    async fn start(
        &self,
        username: Option<String>,
        pending_email: Option<String>,
    ) -> Option<(WebSession, String)> {
        if let Some(cutoff) = self.expiry_cutoff() {
            if let Ok(purged @ 1..) = self.sessions.delete_created_before(cutoff).await {
                debug!("purged {purged} expired browser sessions");
            }
        }

        let session = self
            .sessions
            .create(WebSession {
                token: Uuid::new_v4(),
                username,
                pending_email,
                created_at: Utc::now(),
            })
            .await
            .ok()?;

        let cookie = credentials::sign_token(&self.config.secret_key, session.token);
        Some((session, cookie))
    }

    async fn resolve(&self, cookie: Option<&str>) -> Option<WebSession> {
        let token = credentials::verify_token(&self.config.secret_key, cookie?)?;
        let session = self.sessions.find(token).await.ok().flatten()?;

        match self.expiry_cutoff() {
            Some(cutoff) if session.created_at <= cutoff => {
                info!("browser session {} expired", session.token);
                let _ = self.sessions.delete(session.token).await;
                None
            }
            _ => Some(session),
        }
    }

    async fn clear_pending_email(&self, token: Uuid) -> bool {
        self.sessions.clear_pending_email(token).await.is_ok()
    }

    async fn end(&self, token: Uuid) -> bool {
        self.sessions.delete(token).await.is_ok()
    }
}
