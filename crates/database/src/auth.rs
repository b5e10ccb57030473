use std::sync::Arc;

use core_types::SessionInfo;
use sqlx::Row;

use crate::account::hash_password;
use crate::connection::{live, SharedConnection};
use crate::error::DbError;
use crate::session::SessionState;

/// Administrator credential verification and session state.
///
/// The `admin_account` table is read-only to this layer; there is no
/// admin-creation operation. Admin credentials use the same digest as user
/// accounts.
pub struct AdminAuthService {
    pub(crate) conn: Arc<SharedConnection>,
    session: SessionState,
}

impl AdminAuthService {
    pub(crate) fn new(conn: Arc<SharedConnection>, session: SessionState) -> Self {
        Self { conn, session }
    }

    /// Verifies an administrator credential pair.
    ///
    /// Any miss, unknown name or wrong password, forces the session to
    /// logged-out and returns one non-distinguishing credential error, so the
    /// caller cannot tell which half of the pair was wrong.
    pub async fn login(&self, name: &str, password: &str) -> Result<SessionInfo, DbError> {
        let mut guard = self.conn.lock().await;
        let conn = live(&mut guard)?;

        if name.is_empty() || password.is_empty() {
            return Err(DbError::Validation(
                "administrator name and password are required".to_string(),
            ));
        }

        let row = match sqlx::query(
            "SELECT id, name, password_hash FROM admin_account WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&mut *conn)
        .await
        {
            Ok(row) => row,
            Err(e) => {
                self.session.clear();
                return Err(e.into());
            }
        };

        let verified = match &row {
            Some(row) => match row.try_get::<String, _>("password_hash") {
                Ok(stored) => stored == hash_password(password),
                Err(e) => {
                    self.session.clear();
                    return Err(e.into());
                }
            },
            None => false,
        };
        if !verified {
            self.session.clear();
            tracing::warn!(admin = %name, "administrator login rejected");
            return Err(DbError::Credential(
                "administrator name or password is incorrect".to_string(),
            ));
        }

        let row = row.ok_or(DbError::NotFound)?;
        let info = SessionInfo {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: None,
        };
        self.session.begin(info.clone());
        tracing::info!(admin = %info.name, "administrator logged in");
        Ok(info)
    }

    /// Unconditionally returns the admin session to logged-out.
    pub fn logout(&self) {
        self.session.clear();
        tracing::info!("administrator logged out");
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_logged_in()
    }

    pub fn current_id(&self) -> Option<i64> {
        self.session.current().map(|info| info.id)
    }

    pub fn current_name(&self) -> Option<String> {
        self.session.current().map(|info| info.name)
    }
}
