//! Email/password auth gated to an institutional email domain.
//!
//! DESIGN
//! ======
//! Registration is open to exactly one email domain (`ALLOWED_EMAIL_DOMAIN`,
//! default `bmsce.ac.in`); everything else is rejected before touching the
//! database. Passwords are stored as SHA-256 over a per-user random salt.
//! Login failures are reported as a single `InvalidCredentials` error so the
//! response does not reveal whether the email exists.

use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::services::session::{SessionUser, bytes_to_hex};

const DEFAULT_ALLOWED_DOMAIN: &str = "bmsce.ac.in";
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email")]
    InvalidEmail,
    #[error("only @{0} emails allowed")]
    WrongDomain(String),
    #[error("password must be at least {MIN_PASSWORD_LEN} characters")]
    WeakPassword,
    #[error("email already registered")]
    EmailTaken,
    #[error("wrong password or email")]
    InvalidCredentials,
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// The single email domain allowed to register.
#[must_use]
pub fn allowed_email_domain() -> String {
    std::env::var("ALLOWED_EMAIL_DOMAIN").unwrap_or_else(|_| DEFAULT_ALLOWED_DOMAIN.into())
}

#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    if normalized.is_empty() || !normalized.contains('@') {
        return None;
    }
    let parts = normalized.split('@').collect::<Vec<_>>();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return None;
    }
    Some(normalized)
}

/// Normalize and enforce the institutional domain gate.
pub fn validate_institutional_email(email: &str, allowed_domain: &str) -> Result<String, AuthError> {
    let normalized = normalize_email(email).ok_or(AuthError::InvalidEmail)?;
    let domain = normalized
        .split('@')
        .nth(1)
        .ok_or(AuthError::InvalidEmail)?;
    if !domain.eq_ignore_ascii_case(allowed_domain) {
        return Err(AuthError::WrongDomain(allowed_domain.to_string()));
    }
    Ok(normalized)
}

#[must_use]
pub(crate) fn generate_salt() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes_to_hex(&bytes)
}

#[must_use]
pub(crate) fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    bytes_to_hex(&hasher.finalize())
}

pub(crate) fn name_from_email(email: &str) -> String {
    let local = email
        .split('@')
        .next()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or("user");
    local.to_owned()
}

/// Register a new user. The display name falls back to the email local part.
pub async fn register(
    pool: &PgPool,
    email: &str,
    name: &str,
    password: &str,
    allowed_domain: &str,
) -> Result<SessionUser, AuthError> {
    let normalized = validate_institutional_email(email, allowed_domain)?;
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword);
    }

    let name = if name.trim().is_empty() { name_from_email(&normalized) } else { name.trim().to_owned() };
    let salt = generate_salt();
    let hash = hash_password(password, &salt);
    let id = Uuid::new_v4();

    let result = sqlx::query(
        r"INSERT INTO users (id, email, name, password_hash, password_salt)
          VALUES ($1, $2, $3, $4, $5)
          ON CONFLICT (email) DO NOTHING",
    )
    .bind(id)
    .bind(&normalized)
    .bind(&name)
    .bind(&hash)
    .bind(&salt)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AuthError::EmailTaken);
    }

    Ok(SessionUser { id, email: normalized, name })
}

/// Verify email + password, returning the user on success.
pub async fn login(pool: &PgPool, email: &str, password: &str) -> Result<SessionUser, AuthError> {
    let normalized = normalize_email(email).ok_or(AuthError::InvalidCredentials)?;

    let row = sqlx::query("SELECT id, email, name, password_hash, password_salt FROM users WHERE email = $1")
        .bind(&normalized)
        .fetch_optional(pool)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    let salt: String = row.get("password_salt");
    let stored: String = row.get("password_hash");
    if hash_password(password, &salt) != stored {
        return Err(AuthError::InvalidCredentials);
    }

    Ok(SessionUser { id: row.get("id"), email: row.get("email"), name: row.get("name") })
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
