//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Calling module decides what the user sees                             │
//! │                                                                         │
//! │  Fatal variants abort the whole save transaction. Expected-but-unhappy │
//! │  outcomes (empty pool on direct acquire, nothing to release)           │
//! │  travel as Option / bool results, NOT through this enum.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use atlas_core::CoreError;

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and caller feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// No current sequence counter row exists for the object class.
    ///
    /// ## When This Occurs
    /// - Counters were never provisioned for the object class
    /// - The period rolled over and no new current row was provisioned
    ///
    /// Fatal for the caller's transaction: codes cannot be invented.
    #[error("no current sequence counter for object class: {object_class}")]
    CounterNotFound { object_class: String },

    /// A save needed a reserved code but the pool had no free row.
    ///
    /// Only raised inside an orchestrated save. Direct pool acquisition
    /// reports exhaustion as `None`, not as an error.
    #[error("reservation pool exhausted for object type: {object_type}")]
    PoolExhausted { object_type: String },

    /// A reserved code could not be bound to its entity.
    ///
    /// ## When This Occurs
    /// - The lock was lost or released before the save committed
    /// - Another user claimed the number first
    ///
    /// Raised inside the save transaction, so the entity insert rolls back
    /// with it - no entity is ever committed without its claimed code.
    #[error("could not claim reserved code '{code}' for the saving user")]
    ClaimFailed { code: String },

    /// An insert/update touched zero rows where one was required.
    #[error("persisting {entity} affected no rows")]
    PersistFailed { entity: String },

    /// Workflow rule violation (invalid transition, unknown object type).
    #[error(transparent)]
    Workflow(#[from] CoreError),

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Inserting a duplicate business code
    /// - Duplicate (object_type, number) in the reservation pool
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Connection pool timed out (all connections in use).
    #[error("Connection pool exhausted")]
    PoolTimedOut,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a PersistFailed error for a given entity type.
    pub fn persist_failed(entity: impl Into<String>) -> Self {
        DbError::PersistFailed {
            entity: entity.into(),
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolTimedOut
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite error messages for constraints:
                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>"
                // FK constraint: "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolTimedOut,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
