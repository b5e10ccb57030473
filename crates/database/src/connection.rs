use std::str::FromStr;
use std::sync::Arc;

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Connection, SqliteConnection};
use tokio::sync::{Mutex, MutexGuard};

use crate::error::DbError;
use crate::session::SessionState;

/// The single physical handle to the store, shared by every service.
///
/// All public operations in this crate lock the handle for their full
/// duration, from validation through result interpretation, so the data
/// layer is effectively single-threaded with respect to the database.
/// `None` means disconnected.
pub(crate) struct SharedConnection {
    handle: Mutex<Option<SqliteConnection>>,
    url: String,
}

impl SharedConnection {
    pub(crate) fn new(url: impl Into<String>) -> Self {
        Self {
            handle: Mutex::new(None),
            url: url.into(),
        }
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, Option<SqliteConnection>> {
        self.handle.lock().await
    }
}

/// Fails fast with [`DbError::NotConnected`] when the handle is closed.
pub(crate) fn live(
    guard: &mut Option<SqliteConnection>,
) -> Result<&mut SqliteConnection, DbError> {
    guard.as_mut().ok_or(DbError::NotConnected)
}

/// Owns the lifecycle of the shared handle.
///
/// Holds a clone of both session states because sessions are tied to the
/// connection: tearing the connection down logs both roles out.
pub struct ConnectionManager {
    conn: Arc<SharedConnection>,
    admin_session: SessionState,
    user_session: SessionState,
}

impl ConnectionManager {
    pub(crate) fn new(
        conn: Arc<SharedConnection>,
        admin_session: SessionState,
        user_session: SessionState,
    ) -> Self {
        Self {
            conn,
            admin_session,
            user_session,
        }
    }

    /// Opens the shared handle and ensures the schema exists.
    ///
    /// Idempotent: if the handle is already open the schema-ensure step is
    /// re-run and the call succeeds without reopening anything.
    pub async fn connect(&self) -> Result<(), DbError> {
        let mut guard = self.conn.lock().await;

        if let Some(handle) = guard.as_mut() {
            ensure_schema(handle).await?;
            tracing::debug!("database already connected");
            return Ok(());
        }

        let options = SqliteConnectOptions::from_str(&self.conn.url)?.create_if_missing(true);
        let mut handle = SqliteConnection::connect_with(&options).await?;
        ensure_schema(&mut handle).await?;
        *guard = Some(handle);

        tracing::info!(url = %self.conn.url, "database connected");
        Ok(())
    }

    /// Closes the handle if open and logs both roles out.
    ///
    /// Session reset is unconditional: it happens even when nothing was open,
    /// and a failure to close the handle is logged rather than returned.
    pub async fn disconnect(&self) {
        let mut guard = self.conn.lock().await;
        if let Some(handle) = guard.take() {
            match handle.close().await {
                Ok(()) => tracing::info!("database disconnected"),
                Err(e) => tracing::warn!(error = %e, "closing the database handle failed"),
            }
        }
        drop(guard);

        self.admin_session.clear();
        self.user_session.clear();
    }

    /// Pure status read, no side effects.
    pub async fn is_connected(&self) -> bool {
        self.conn.lock().await.is_some()
    }
}

/// Canonical schema, applied with CREATE-IF-NOT-EXISTS on every connect.
///
/// Schedule timestamps and fares are TEXT: the canonical `%Y-%m-%d %H:%M:%S`
/// layout keeps lexical and chronological order identical, and SQLite has no
/// DECIMAL type so prices round-trip as decimal strings. The admin table is
/// read-only to this layer; rows are provisioned out of band.
async fn ensure_schema(conn: &mut SqliteConnection) -> Result<(), DbError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS flight (
            flight_id    TEXT PRIMARY KEY,
            departure    TEXT NOT NULL,
            destination  TEXT NOT NULL,
            depart_time  TEXT NOT NULL,
            arrive_time  TEXT NOT NULL,
            price        TEXT NOT NULL,
            total_seats  INTEGER NOT NULL,
            remain_seats INTEGER NOT NULL
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS admin_account (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            name          TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_account (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            email         TEXT NOT NULL UNIQUE,
            username      TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            create_time   TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            last_login    TEXT
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    Ok(())
}
