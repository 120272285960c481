//! Registration, email verification, login and logout pages.

use crate::api::pages::render;
use crate::api::{ExtractSessionCookie, expired_session_cookie, session_cookie};
use crate::core::services::{AccountError, LoginOutcome, Registration};
use crate::core::traits::{AccountService, ChatService, WebSessionService};
use axum::http::header::SET_COOKIE;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use di_axum::Inject;
use log::info;
use minijinja::context;

pub fn router() -> Router {
    Router::new()
        .route("/", get(landing))
        .route("/register", get(register_page).post(register))
        .route("/verify-email", get(verify_page).post(verify_email))
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
}

async fn landing() -> Response {
    render("landing.html", context! {})
}

async fn register_page() -> Response {
    render("register.html", context! {})
}

async fn register(
    Inject(accounts): Inject<dyn AccountService>,
    Inject(web_sessions): Inject<dyn WebSessionService>,
    Form(form): Form<schemas::RegisterForm>,
) -> Response {
    let registration = Registration {
        email: form.email,
        username: form.username,
        password: form.password,
    };

    match accounts.register(registration).await {
        Ok(email) => match web_sessions.start(None, Some(email)).await {
            Some((_, cookie)) => (
                [(SET_COOKIE, session_cookie(&cookie))],
                Redirect::to("/verify-email"),
            )
                .into_response(),
            None => render("register.html", context! { error => "Registration failed." }),
        },
        Err(AccountError::Storage) => {
            render("register.html", context! { error => "Registration failed." })
        }
        Err(e) => render("register.html", context! { error => e.to_string() }),
    }
}

async fn verify_page(
    Inject(web_sessions): Inject<dyn WebSessionService>,
    cookie: ExtractSessionCookie,
) -> Response {
    match web_sessions
        .resolve(cookie.0.as_deref())
        .await
        .and_then(|session| session.pending_email)
    {
        Some(email) => render("verify_email.html", context! { email }),
        None => Redirect::to("/register").into_response(),
    }
}

async fn verify_email(
    Inject(accounts): Inject<dyn AccountService>,
    Inject(web_sessions): Inject<dyn WebSessionService>,
    cookie: ExtractSessionCookie,
    Form(form): Form<schemas::VerifyForm>,
) -> Response {
    let Some(session) = web_sessions.resolve(cookie.0.as_deref()).await else {
        return Redirect::to("/register").into_response();
    };
    let Some(email) = session.pending_email else {
        return Redirect::to("/register").into_response();
    };

    match accounts.verify_email(&email, &form.verification_code).await {
        Ok(()) => {
            web_sessions.clear_pending_email(session.token).await;
            Redirect::to("/login").into_response()
        }
        Err(AccountError::Storage) => render(
            "verify_email.html",
            context! { email, error => "Verification failed" },
        ),
        Err(e) => render("verify_email.html", context! { email, error => e.to_string() }),
    }
}

async fn login_page() -> Response {
    render("login.html", context! {})
}

async fn login(
    Inject(accounts): Inject<dyn AccountService>,
    Inject(web_sessions): Inject<dyn WebSessionService>,
    Inject(chat): Inject<dyn ChatService>,
    cookie: ExtractSessionCookie,
    Form(form): Form<schemas::LoginForm>,
) -> Response {
    let outcome = match accounts.login(&form.email, &form.password).await {
        Ok(outcome) => outcome,
        Err(e) => return render("login.html", context! { error => e.to_string() }),
    };

    // A fresh token on every login; the previous one is dropped.
    if let Some(previous) = web_sessions.resolve(cookie.0.as_deref()).await {
        web_sessions.end(previous.token).await;
    }

    let (started, target) = match outcome {
        LoginOutcome::Authenticated(account) => {
            info!("{} logged in", account.username);
            chat.current_session(&account.username).await;
            (
                web_sessions.start(Some(account.username), None).await,
                "/index",
            )
        }
        LoginOutcome::PendingVerification(email) => {
            (web_sessions.start(None, Some(email)).await, "/verify-email")
        }
    };

    match started {
        Some((_, cookie)) => (
            [(SET_COOKIE, session_cookie(&cookie))],
            Redirect::to(target),
        )
            .into_response(),
        None => render("login.html", context! { error => AccountError::Storage.to_string() }),
    }
}

async fn logout(
    Inject(web_sessions): Inject<dyn WebSessionService>,
    cookie: ExtractSessionCookie,
) -> Response {
    if let Some(session) = web_sessions.resolve(cookie.0.as_deref()).await {
        web_sessions.end(session.token).await;
    }
    (
        [(SET_COOKIE, expired_session_cookie())],
        Redirect::to("/"),
    )
        .into_response()
}

pub mod schemas {
    use serde::Deserialize;

    #[derive(Deserialize, Debug, Default)]
    pub struct RegisterForm {
        #[serde(default)]
        pub email: String,
        #[serde(default)]
        pub username: String,
        #[serde(default)]
        pub password: String,
    }

    #[derive(Deserialize, Debug, Default)]
    pub struct VerifyForm {
        #[serde(default)]
        pub verification_code: String,
    }

    #[derive(Deserialize, Debug, Default)]
    pub struct LoginForm {
        #[serde(default)]
        pub email: String,
        #[serde(default)]
        pub password: String,
    }
}
