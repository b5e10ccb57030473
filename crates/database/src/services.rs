use std::env;
use std::sync::Arc;

use dotenvy::dotenv;

use crate::account::UserAccountService;
use crate::auth::AdminAuthService;
use crate::connection::{ConnectionManager, SharedConnection};
use crate::error::DbError;
use crate::repository::FlightRepository;
use crate::session::SessionState;

/// The explicitly constructed service set.
///
/// One `SharedConnection` and two `SessionState` handles are threaded through
/// all four services, so every operation serializes on the same lock and
/// connection teardown can reset both roles. An application builds exactly
/// one of these at its composition root and passes it by reference; tests
/// build as many as they like.
pub struct Services {
    pub connection: ConnectionManager,
    pub flights: FlightRepository,
    pub admin_auth: AdminAuthService,
    pub users: UserAccountService,
}

impl Services {
    /// Wires the full service set against the given connection URL.
    /// Nothing is opened until [`ConnectionManager::connect`] is called.
    pub fn new(url: impl Into<String>) -> Self {
        let conn = Arc::new(SharedConnection::new(url));
        let admin_session = SessionState::new();
        let user_session = SessionState::new();

        Self {
            connection: ConnectionManager::new(
                Arc::clone(&conn),
                admin_session.clone(),
                user_session.clone(),
            ),
            flights: FlightRepository::new(Arc::clone(&conn)),
            admin_auth: AdminAuthService::new(Arc::clone(&conn), admin_session),
            users: UserAccountService::new(conn, user_session),
        }
    }

    /// Builds the service set from the `DATABASE_URL` environment variable,
    /// loading a `.env` file first if one is present.
    pub fn from_env() -> Result<Self, DbError> {
        dotenv().ok();
        let url = env::var("DATABASE_URL")
            .map_err(|_| DbError::ConfigError("DATABASE_URL must be set.".to_string()))?;
        Ok(Self::new(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::hash_password;

    #[tokio::test]
    async fn disconnect_resets_both_sessions() {
        let services = Services::new("sqlite::memory:");
        services.connection.connect().await.unwrap();

        {
            let mut guard = services.admin_auth.conn.lock().await;
            let conn = guard.as_mut().unwrap();
            sqlx::query("INSERT INTO admin_account (name, password_hash) VALUES (?, ?)")
                .bind("root")
                .bind(hash_password("adminpw99"))
                .execute(&mut *conn)
                .await
                .unwrap();
        }
        services
            .users
            .register("a@b.com", "user1", "passw0rd", "passw0rd")
            .await
            .unwrap();

        services.admin_auth.login("root", "adminpw99").await.unwrap();
        services.users.login("user1", "passw0rd").await.unwrap();
        assert!(services.admin_auth.is_logged_in());
        assert!(services.users.is_logged_in());

        services.connection.disconnect().await;
        assert!(!services.connection.is_connected().await);
        assert!(!services.admin_auth.is_logged_in());
        assert!(!services.users.is_logged_in());
    }

    #[tokio::test]
    async fn independent_service_sets_do_not_share_state() {
        let a = Services::new("sqlite::memory:");
        let b = Services::new("sqlite::memory:");
        a.connection.connect().await.unwrap();
        b.connection.connect().await.unwrap();

        a.users
            .register("a@b.com", "user1", "passw0rd", "passw0rd")
            .await
            .unwrap();
        a.users.login("user1", "passw0rd").await.unwrap();

        // `b` has its own store and its own sessions.
        assert!(!b.users.is_logged_in());
        assert!(matches!(
            b.users.login("user1", "passw0rd").await,
            Err(crate::DbError::Credential(_))
        ));
    }
}
