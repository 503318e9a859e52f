use thiserror::Error;

/// Boxed error used as the source of startup failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Centralized error types for the application
///
/// Storage and configuration failures are converted to this enum for
/// consistent handling. `StorageInit` and `Config` are fatal at startup,
/// everything else is recovered by the caller.
///
/// # Example
///
/// ```no_run
/// use educore::error::AppError;
///
/// fn handle_error(err: AppError) {
///     eprintln!("Error: {}", err);
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// The database file could not be created, opened or migrated.
    #[error("Storage initialization failed for {path}: {source}")]
    StorageInit {
        path: String,
        #[source]
        source: BoxError,
    },

    /// A chat record write did not commit.
    #[error("Failed to write chat {chat_id}: {source}")]
    StorageWrite {
        chat_id: i64,
        #[source]
        source: rusqlite::Error,
    },

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database connection pool errors
    #[error("Database pool error: {0}")]
    DatabasePool(#[from] r2d2::Error),

    /// Missing or invalid environment configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid catalog seed document
    #[error("Catalog seed error: {0}")]
    Seed(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Whether the process must stop instead of serving traffic.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::StorageInit { .. } | AppError::Config(_))
    }
}
