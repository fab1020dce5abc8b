// Single-admin login backed by Redis sessions.
// Credentials come from config; sessions are opaque random tokens in a cookie.

pub mod handlers;
pub mod middleware;

use redis::AsyncCommands;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::Config;
use crate::errors::AppError;

pub const SESSION_COOKIE: &str = "ranker_session";

/// The logged-in user, stored in request extensions by `require_session`.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub username: String,
}

pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Checks the submitted credentials against the configured admin account.
/// The username is checked first so the error names the field that was wrong.
pub fn verify_credentials(config: &Config, username: &str, password: &str) -> Result<(), AppError> {
    if username != config.admin_username {
        return Err(AppError::InvalidCredentials("Invalid username".to_string()));
    }
    if !hash_password(password).eq_ignore_ascii_case(&config.admin_password_sha256) {
        return Err(AppError::InvalidCredentials("Invalid password".to_string()));
    }
    Ok(())
}

fn session_key(token: &str) -> String {
    format!("session:{token}")
}

/// Redis-backed session storage with a fixed time-to-live.
#[derive(Clone)]
pub struct SessionStore {
    client: redis::Client,
    ttl_secs: u64,
}

impl SessionStore {
    pub fn new(client: redis::Client, ttl_secs: u64) -> Self {
        Self { client, ttl_secs }
    }

    /// Opens a session for `username` and returns its token.
    pub async fn create(&self, username: &str) -> Result<String, AppError> {
        let token = Uuid::new_v4().simple().to_string();
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(session_key(&token), username, self.ttl_secs)
            .await?;
        Ok(token)
    }

    /// Resolves a token to its username; `None` when unknown or expired.
    pub async fn lookup(&self, token: &str) -> Result<Option<String>, AppError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let username: Option<String> = conn.get(session_key(token)).await?;
        Ok(username)
    }

    pub async fn destroy(&self, token: &str) -> Result<(), AppError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del::<_, ()>(session_key(token)).await?;
        Ok(())
    }
}
