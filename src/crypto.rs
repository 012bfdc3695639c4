use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::{config::AppConfig, error::ApiError};

/// Lifetime of a password reset token, in seconds.
pub const RESET_TOKEN_TTL_SECS: i64 = 60 * 60;

/// AccessClaims
///
/// Payload of the short-lived bearer token sent on every authenticated request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (sub): the user's primary key.
    pub sub: i32,
    pub email: String,
    /// Role slug at issue time. Authorization re-reads the role from the store.
    pub role: String,
    pub iat: usize,
    pub exp: usize,
}

/// RefreshClaims
///
/// Payload of the long-lived token exchanged at `/auth/refresh`. Carries the user id only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: i32,
    pub iat: usize,
    pub exp: usize,
}

fn window(ttl: Duration) -> (usize, usize) {
    let now = Utc::now().timestamp().max(0) as usize;
    (now, now + ttl.as_secs() as usize)
}

/// issue_access_token
///
/// Signs `{sub, email, role}` with the access secret.
pub fn issue_access_token(
    config: &AppConfig,
    user_id: i32,
    email: &str,
    role: &str,
) -> Result<String, ApiError> {
    let (iat, exp) = window(config.access_token_ttl);
    let claims = AccessClaims {
        sub: user_id,
        email: email.to_string(),
        role: role.to_string(),
        iat,
        exp,
    };
    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    Ok(encode(&Header::default(), &claims, &key)?)
}

/// issue_refresh_token
///
/// Signs `{sub}` with the refresh secret.
pub fn issue_refresh_token(config: &AppConfig, user_id: i32) -> Result<String, ApiError> {
    let (iat, exp) = window(config.refresh_token_ttl);
    let claims = RefreshClaims {
        sub: user_id,
        iat,
        exp,
    };
    let key = EncodingKey::from_secret(config.refresh_secret.as_bytes());
    Ok(encode(&Header::default(), &claims, &key)?)
}

/// verify_access_token
///
/// Checks signature and expiry. Expired tokens surface as `TOKEN_EXPIRED`, anything
/// else (bad signature, malformed, refresh token) as `INVALID_TOKEN`.
pub fn verify_access_token(config: &AppConfig, token: &str) -> Result<AccessClaims, ApiError> {
    let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let data = decode::<AccessClaims>(token, &key, &Validation::default())?;
    Ok(data.claims)
}

pub fn verify_refresh_token(config: &AppConfig, token: &str) -> Result<RefreshClaims, ApiError> {
    let key = DecodingKey::from_secret(config.refresh_secret.as_bytes());
    let data = decode::<RefreshClaims>(token, &key, &Validation::default())?;
    Ok(data.claims)
}

// --- Passwords ---

/// Hashing is CPU-bound; callers on the async runtime go through `hash_password_blocking`.
pub fn hash_password(password: &str, cost: u32) -> Result<String, ApiError> {
    Ok(bcrypt::hash(password, cost)?)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    Ok(bcrypt::verify(password, hash)?)
}

pub async fn hash_password_blocking(password: String, cost: u32) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(|e| ApiError::internal(format!("hashing task failed: {e}")))?
}

pub async fn verify_password_blocking(password: String, hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| ApiError::internal(format!("verification task failed: {e}")))?
}

/// generate_reset_token
///
/// 32 random bytes, hex encoded (64 characters).
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

const SPECIAL_CHARACTERS: &str = "!@#$%^&*(),.?\":{}|<>";

/// password_strength_errors
///
/// Returns every rule the password breaks; empty means the password is acceptable.
pub fn password_strength_errors(password: &str) -> Vec<&'static str> {
    let mut errors = Vec::new();
    if password.chars().count() < 8 {
        errors.push("Password must be at least 8 characters long");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push("Password must contain at least one uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push("Password must contain at least one lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push("Password must contain at least one number");
    }
    if !password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)) {
        errors.push("Password must contain at least one special character");
    }
    errors
}
