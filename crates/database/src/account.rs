use std::sync::Arc;

use core_types::SessionInfo;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use sqlx::Row;

use crate::connection::{live, SharedConnection};
use crate::error::DbError;
use crate::session::SessionState;

// Username rule: starts with a letter, 3-20 characters, letters, digits and
// underscore only.
static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[A-Za-z][A-Za-z0-9_]{2,19}$").unwrap());

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap());

/// One-way credential digest: SHA-256 over the UTF-8 bytes, lowercase hex.
///
/// Deterministic and unsalted, and used identically at storage and
/// verification time. Both roles share this digest; the admin side stores
/// hashes too. An unsalted fixed digest is a known weakness for anything
/// beyond a closed deployment (see DESIGN.md).
pub(crate) fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn is_strong_password(password: &str) -> bool {
    password.chars().count() >= 8
        && password.chars().any(|c| c.is_alphabetic())
        && password.chars().any(|c| c.is_ascii_digit())
}

/// End-user registration, login and session state. Owns the `user_account`
/// table.
pub struct UserAccountService {
    pub(crate) conn: Arc<SharedConnection>,
    session: SessionState,
}

impl UserAccountService {
    pub(crate) fn new(conn: Arc<SharedConnection>, session: SessionState) -> Self {
        Self { conn, session }
    }

    /// Creates a new account and returns its row id.
    ///
    /// Validation short-circuits in contract order: required fields, username
    /// rule, email rule, password strength, confirmation match, then the two
    /// uniqueness probes. Only the hash of the password is stored.
    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<i64, DbError> {
        let mut guard = self.conn.lock().await;
        let conn = live(&mut guard)?;

        if email.is_empty() || username.is_empty() || password.is_empty()
            || confirm_password.is_empty()
        {
            return Err(DbError::Validation(
                "email, username, password and confirmation are required".to_string(),
            ));
        }
        if !USERNAME_RE.is_match(username) {
            return Err(DbError::Validation(
                "username must start with a letter and use 3-20 letters, digits or underscores"
                    .to_string(),
            ));
        }
        if !EMAIL_RE.is_match(email) {
            return Err(DbError::Validation(
                "email address is not valid".to_string(),
            ));
        }
        if !is_strong_password(password) {
            return Err(DbError::Validation(
                "password must be at least 8 characters and contain a letter and a digit"
                    .to_string(),
            ));
        }
        if password != confirm_password {
            return Err(DbError::Validation(
                "password and confirmation do not match".to_string(),
            ));
        }

        let taken = sqlx::query("SELECT id FROM user_account WHERE username = ?")
            .bind(username)
            .fetch_optional(&mut *conn)
            .await?;
        if taken.is_some() {
            return Err(DbError::Conflict(format!(
                "username {username} is already registered"
            )));
        }

        let taken = sqlx::query("SELECT id FROM user_account WHERE email = ?")
            .bind(email)
            .fetch_optional(&mut *conn)
            .await?;
        if taken.is_some() {
            return Err(DbError::Conflict(format!(
                "email {email} is already registered"
            )));
        }

        let result =
            sqlx::query("INSERT INTO user_account (email, username, password_hash) VALUES (?, ?, ?)")
                .bind(email)
                .bind(username)
                .bind(hash_password(password))
                .execute(&mut *conn)
                .await?;
        let id = result.last_insert_rowid();

        tracing::info!(%username, id, "user registered");
        Ok(id)
    }

    /// Verifies credentials, records the session and returns it.
    ///
    /// An unknown username and a wrong password are reported as distinct
    /// credential errors. A wrong password leaves any existing session
    /// untouched. On success the account's last-login timestamp is updated
    /// best-effort; a failure there is logged, not returned.
    pub async fn login(&self, username: &str, password: &str) -> Result<SessionInfo, DbError> {
        let mut guard = self.conn.lock().await;
        let conn = live(&mut guard)?;

        if username.is_empty() || password.is_empty() {
            return Err(DbError::Validation(
                "username and password are required".to_string(),
            ));
        }

        let row = sqlx::query(
            "SELECT id, username, email, password_hash FROM user_account WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&mut *conn)
        .await?;
        let Some(row) = row else {
            return Err(DbError::Credential(format!("user {username} does not exist")));
        };

        let stored_hash: String = row.try_get("password_hash")?;
        if stored_hash != hash_password(password) {
            tracing::warn!(%username, "user login rejected: wrong password");
            return Err(DbError::Credential("wrong password".to_string()));
        }

        let info = SessionInfo {
            id: row.try_get("id")?,
            name: row.try_get("username")?,
            email: Some(row.try_get("email")?),
        };

        if let Err(e) = sqlx::query("UPDATE user_account SET last_login = CURRENT_TIMESTAMP WHERE id = ?")
            .bind(info.id)
            .execute(&mut *conn)
            .await
        {
            tracing::warn!(error = %e, "failed to record last-login time");
        }

        self.session.begin(info.clone());
        tracing::info!(user = %info.name, "user logged in");
        Ok(info)
    }

    /// Replaces an account's password after re-verifying the current one.
    ///
    /// The new password must pass the same strength rule as registration and
    /// match its confirmation; only its hash is stored, through a bound
    /// UPDATE. Session state is untouched either way.
    pub async fn reset_password(
        &self,
        username: &str,
        old_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<(), DbError> {
        let mut guard = self.conn.lock().await;
        let conn = live(&mut guard)?;

        if username.is_empty() || old_password.is_empty() || new_password.is_empty()
            || confirm_password.is_empty()
        {
            return Err(DbError::Validation(
                "username, current password, new password and confirmation are required"
                    .to_string(),
            ));
        }
        if !is_strong_password(new_password) {
            return Err(DbError::Validation(
                "new password must be at least 8 characters and contain a letter and a digit"
                    .to_string(),
            ));
        }
        if new_password != confirm_password {
            return Err(DbError::Validation(
                "new password and confirmation do not match".to_string(),
            ));
        }

        let row = sqlx::query("SELECT id, password_hash FROM user_account WHERE username = ?")
            .bind(username)
            .fetch_optional(&mut *conn)
            .await?;
        let Some(row) = row else {
            return Err(DbError::Credential(format!("user {username} does not exist")));
        };

        let stored_hash: String = row.try_get("password_hash")?;
        if stored_hash != hash_password(old_password) {
            tracing::warn!(%username, "password reset rejected: wrong password");
            return Err(DbError::Credential("wrong password".to_string()));
        }

        let id: i64 = row.try_get("id")?;
        let result = sqlx::query("UPDATE user_account SET password_hash = ? WHERE id = ?")
            .bind(hash_password(new_password))
            .bind(id)
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        tracing::info!(%username, "password reset");
        Ok(())
    }

    /// Unconditionally returns the user session to logged-out.
    pub fn logout(&self) {
        self.session.clear();
        tracing::info!("user logged out");
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_logged_in()
    }

    pub fn current_user_id(&self) -> Option<i64> {
        self.session.current().map(|info| info.id)
    }

    pub fn current_username(&self) -> Option<String> {
        self.session.current().map(|info| info.name)
    }

    pub fn current_user_email(&self) -> Option<String> {
        self.session.current().and_then(|info| info.email)
    }
}
