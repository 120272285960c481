//! Password hashing, verification codes and signed session cookies.

use anyhow::{Result, anyhow};
use argon2::Argon2;
use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
};
use hmac::{Hmac, Mac};
use rand::Rng;
use regex::Regex;
use sha2::Sha256;
use std::sync::LazyLock;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@]+@[^@]+\.[^@]+").expect("email pattern is valid"));

pub fn hash_password(password: &str) -> Result<String> {
    if password.is_empty() {
        return Err(anyhow!("password is empty"));
    }
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!(err.to_string()))?;
    Ok(hash.to_string())
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Six random decimal digits, zero padded.
pub fn generate_verification_code() -> String {
    format!("{:06}", rand::rng().random_range(0..1_000_000))
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_SHAPE.is_match(email)
}

/// Encodes a session token as `<token>.<hex hmac>` for the cookie.
pub fn sign_token(secret: &str, token: Uuid) -> String {
    let token = token.simple().to_string();
    let signature = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mut mac) => {
            mac.update(token.as_bytes());
            hex::encode(mac.finalize().into_bytes())
        }
        Err(_) => String::new(),
    };
    format!("{token}.{signature}")
}

/// Returns the token if the cookie value carries a valid signature.
pub fn verify_token(secret: &str, value: &str) -> Option<Uuid> {
    let (token, signature) = value.split_once('.')?;
    let expected = hex::decode(signature).ok()?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(token.as_bytes());
    mac.verify_slice(&expected).ok()?;
    Uuid::try_parse(token).ok()
}
