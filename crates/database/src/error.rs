use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to load environment variables for database connection: {0}")]
    ConfigError(String),

    #[error("The database is not connected.")]
    NotConnected,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("The requested data was not found in the database.")]
    NotFound,

    #[error("Credential verification failed: {0}")]
    Credential(String),

    #[error("The database driver reported an error: {0}")]
    Driver(#[from] sqlx::Error),

    #[error("Failed to decode a stored value: {0}")]
    Decode(String),
}
