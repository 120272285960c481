use crate::core::traits::WebSessionService;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use di::Ref;
use std::convert::Infallible;

pub mod accounts;
pub mod chat;
pub mod pages;

pub const SESSION_COOKIE: &str = "krishi_session";

/// Raw value of the browser session cookie, if the request carries one.
#[derive(Debug, Default)]
pub struct ExtractSessionCookie(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for ExtractSessionCookie
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Infallible> {
        let value = parts
            .headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|header| header.to_str().ok())
            .flat_map(|header| header.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .map(|(_, value)| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        Ok(ExtractSessionCookie(value))
    }
}

/// `Set-Cookie` value storing a signed session token.
pub fn session_cookie(value: &str) -> String {
    format!("{SESSION_COOKIE}={value}; Path=/; HttpOnly; SameSite=Lax")
}

/// `Set-Cookie` value that removes the session cookie.
pub fn expired_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Username of the signed-in account behind the cookie.
pub async fn signed_in_user(
    web_sessions: &Ref<dyn WebSessionService>,
    cookie: &ExtractSessionCookie,
) -> Option<String> {
    web_sessions.resolve(cookie.0.as_deref()).await?.username
}
