//! # Database and Service Error Types
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)          CoreError (tally-core)            │
//! │       │                                   │                             │
//! │       ▼                                   │                             │
//! │  DbError ← constraint classification      │                             │
//! │       │                                   │                             │
//! │       └──────────────┬────────────────────┘                             │
//! │                      ▼                                                  │
//! │  ServiceError ← returned by every service; the transaction is dropped   │
//! │       │          (rolled back) as the error propagates                  │
//! │       ▼                                                                 │
//! │  ErrorResponse ← stable code + status + message (+ shortages)           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use tally_core::{CoreError, ErrorKind, StockShortage};
use thiserror::Error;

// =============================================================================
// Database Error
// =============================================================================

/// Database operation errors.
///
/// These errors wrap sqlx errors and classify SQLite constraint failures.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate SKU or user email
    /// - A second open price entry for one (product, kind)
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Acting user id that does not exist
    /// - Product id that does not exist
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (negative stock, bad enum text, ...).
    #[error("Check constraint failed: {message}")]
    CheckViolation { message: String },

    /// Attempt to update or delete a ledger row.
    #[error("Append-only table rejected write: {message}")]
    AppendOnly { message: String },

    /// Another writer held the database lock past the busy timeout.
    #[error("Database is busy: {0}")]
    Busy(String),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

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

    /// Classifies the error for callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::NotFound { .. } => ErrorKind::NotFound,
            DbError::ForeignKeyViolation { .. } => ErrorKind::InvalidArgument,
            DbError::UniqueViolation { .. } => ErrorKind::Conflict,
            _ => ErrorKind::Internal,
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
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

                // SQLite constraint messages:
                //   "UNIQUE constraint failed: <table>.<column>"
                //   "FOREIGN KEY constraint failed"
                //   "CHECK constraint failed: <expr>"
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
                } else if msg.contains("CHECK constraint failed") {
                    DbError::CheckViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("append-only") {
                    DbError::AppendOnly {
                        message: msg.to_string(),
                    }
                } else if msg.contains("database is locked") || msg.contains("database is busy") {
                    DbError::Busy(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

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

// =============================================================================
// Service Error
// =============================================================================

/// Error returned by the transactional services.
///
/// Domain failures and persistence failures stay distinct so the most
/// specific kind reaches the caller.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Core(e) => e.kind(),
            ServiceError::Db(e) => e.kind(),
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        ServiceError::Db(err.into())
    }
}

impl From<tally_core::ValidationError> for ServiceError {
    fn from(err: tally_core::ValidationError) -> Self {
        ServiceError::Core(err.into())
    }
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

// =============================================================================
// Error Response
// =============================================================================

/// Body a transport layer sends for a failed operation.
///
/// ## Serialization
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "status": 400,
///   "message": "Insufficient stock for 1 sale line(s)",
///   "shortages": [
///     { "productId": "…", "productName": "Green tea", "requested": 5, "available": 2 }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub code: ErrorKind,
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortages: Option<Vec<ShortageBody>>,
}

/// Wire shape of one insufficiency line.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortageBody {
    pub product_id: String,
    pub product_name: String,
    pub requested: i64,
    pub available: i64,
}

impl From<StockShortage> for ShortageBody {
    fn from(s: StockShortage) -> Self {
        ShortageBody {
            product_id: s.product_id,
            product_name: s.product_name,
            requested: s.requested,
            available: s.available,
        }
    }
}

impl From<&ServiceError> for ErrorResponse {
    fn from(err: &ServiceError) -> Self {
        let code = err.kind();
        let message = match err {
            ServiceError::Core(core) => core.to_string(),
            ServiceError::Db(DbError::NotFound { entity, id }) => {
                format!("{} not found: {}", entity, id)
            }
            ServiceError::Db(DbError::ForeignKeyViolation { message }) => {
                tracing::warn!("Foreign key violation: {}", message);
                "Invalid reference".to_string()
            }
            ServiceError::Db(DbError::UniqueViolation { .. }) => {
                "Conflicting record already exists".to_string()
            }
            ServiceError::Db(db) => {
                // Log the actual error but return a generic message
                tracing::error!("Database operation failed: {}", db);
                "Database operation failed".to_string()
            }
        };
        let shortages = match err {
            ServiceError::Core(core) => core
                .shortages()
                .map(|lines| lines.into_iter().map(ShortageBody::from).collect()),
            ServiceError::Db(_) => None,
        };

        ErrorResponse {
            code,
            status: code.status_code(),
            message,
            shortages,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_error_kinds() {
        assert_eq!(DbError::not_found("Sale", "x").kind(), ErrorKind::NotFound);
        assert_eq!(
            DbError::ForeignKeyViolation {
                message: "FOREIGN KEY constraint failed".into()
            }
            .kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(DbError::Busy("locked".into()).kind(), ErrorKind::Internal);
        assert_eq!(DbError::PoolExhausted.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_response_for_sale_shortage() {
        let err: ServiceError = CoreError::InsufficientStockForSale(vec![StockShortage {
            product_id: "p-1".into(),
            product_name: "Green tea".into(),
            requested: 5,
            available: 2,
        }])
        .into();

        let body = ErrorResponse::from(&err);
        assert_eq!(body.status, 400);
        assert_eq!(body.code, ErrorKind::InsufficientStock);

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["code"], "INSUFFICIENT_STOCK");
        assert_eq!(json["shortages"][0]["productId"], "p-1");
        assert_eq!(json["shortages"][0]["requested"], 5);
        assert_eq!(json["shortages"][0]["available"], 2);
    }

    #[test]
    fn test_response_hides_persistence_details() {
        let err: ServiceError = DbError::QueryFailed("near \"SELEC\": syntax error".into()).into();
        let body = ErrorResponse::from(&err);
        assert_eq!(body.status, 500);
        assert_eq!(body.message, "Database operation failed");
        assert!(body.shortages.is_none());

        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("shortages").is_none());
    }

    #[test]
    fn test_response_for_conflict() {
        let err: ServiceError = CoreError::SaleAlreadyCancelled("s-1".into()).into();
        let body = ErrorResponse::from(&err);
        assert_eq!(body.status, 409);
        assert_eq!(body.message, "Sale s-1 is already cancelled");
    }
}
