//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Domain rule failures                           │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── ErrorKind        - Stable classification for callers              │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  ├── DbError          - Database operation failures                    │
//! │  ├── ServiceError     - CoreError | DbError, returned by services      │
//! │  └── ErrorResponse    - What a transport layer serializes              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ServiceError → ErrorResponse      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every error maps onto exactly one [`ErrorKind`]. The kind is what callers
//! branch on; the message is for humans.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::price::PriceKind;
use crate::sale::StockShortage;

// =============================================================================
// Error Kind
// =============================================================================

/// Stable failure classification surfaced to callers.
///
/// ## Status Mapping
/// ```text
/// NotFound          → 404
/// InvalidArgument   → 400
/// InsufficientStock → 400
/// Conflict          → 409
/// Internal          → 500
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Referenced product, sale or batch is absent.
    NotFound,
    /// Missing or out-of-range input.
    InvalidArgument,
    /// Not enough stock for a decrement or a sale.
    InsufficientStock,
    /// State does not allow the operation (double cancel, timeline clash).
    Conflict,
    /// Unexpected persistence failure.
    Internal,
}

impl ErrorKind {
    /// HTTP-equivalent status code for this kind.
    pub const fn status_code(self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::InvalidArgument | ErrorKind::InsufficientStock => 400,
            ErrorKind::Conflict => 409,
            ErrorKind::Internal => 500,
        }
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Domain errors raised by the ledger engine.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Sale cannot be found.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Batch cannot be found.
    #[error("Batch not found: {0}")]
    BatchNotFound(String),

    /// A single decreasing movement asked for more than the projection holds.
    ///
    /// ## User Workflow
    /// ```text
    /// registerOutput(qty: 5)
    ///      │
    ///      ▼
    /// conditional decrement: stock=3 ≥ 5? no
    ///      │
    ///      ▼
    /// InsufficientStock { available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// caller decides whether to retry with 3
    /// ```
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// One or more sale lines cannot be fulfilled. Carries every short line,
    /// not just the first one found.
    #[error("Insufficient stock for {} sale line(s)", .0.len())]
    InsufficientStockForSale(Vec<StockShortage>),

    /// Cancellation is not idempotent: the second call fails.
    #[error("Sale {0} is already cancelled")]
    SaleAlreadyCancelled(String),

    /// A product referenced by a stored sale is gone or inactive, so its
    /// stock cannot be restored.
    #[error("Product {product_id} is no longer available: {reason}")]
    ProductUnavailable { product_id: String, reason: String },

    /// A price change would overlap the active interval.
    #[error("Price timeline conflict for product {product_id} ({kind}): {reason}")]
    PriceTimelineConflict {
        product_id: String,
        kind: PriceKind,
        reason: String,
    },

    /// Tax and discount would drive the total below zero.
    #[error("Sale total would be negative: subtotal {subtotal} + tax {tax} - discount {discount}")]
    NegativeTotal {
        subtotal: i64,
        tax: i64,
        discount: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Classifies the error for callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::ProductNotFound(_)
            | CoreError::SaleNotFound(_)
            | CoreError::BatchNotFound(_) => ErrorKind::NotFound,
            CoreError::InsufficientStock { .. } | CoreError::InsufficientStockForSale(_) => {
                ErrorKind::InsufficientStock
            }
            CoreError::SaleAlreadyCancelled(_)
            | CoreError::ProductUnavailable { .. }
            | CoreError::PriceTimelineConflict { .. } => ErrorKind::Conflict,
            CoreError::NegativeTotal { .. } | CoreError::Validation(_) => {
                ErrorKind::InvalidArgument
            }
        }
    }

    /// Per-line stock detail, if this is a stock failure.
    ///
    /// A single-movement failure is reported as a one-element list with an
    /// empty product name, so callers handle both shapes the same way.
    pub fn shortages(&self) -> Option<Vec<StockShortage>> {
        match self {
            CoreError::InsufficientStock {
                product_id,
                available,
                requested,
            } => Some(vec![StockShortage {
                product_id: product_id.clone(),
                product_name: String::new(),
                requested: *requested,
                available: *available,
            }]),
            CoreError::InsufficientStockForSale(lines) => Some(lines.clone()),
            _ => None,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Services run validation before opening a transaction.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or greater.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, invalid email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A collection that needs at least one element is empty.
    #[error("{field} must not be empty")]
    Empty { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_id: "p-1".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product p-1: available 3, requested 5"
        );

        let err = CoreError::SaleAlreadyCancelled("s-9".to_string());
        assert_eq!(err.to_string(), "Sale s-9 is already cancelled");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "user_id".to_string(),
        };
        assert_eq!(err.to_string(), "user_id is required");

        let err = ValidationError::Empty {
            field: "items".to_string(),
        };
        assert_eq!(err.to_string(), "items must not be empty");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_kinds_and_status_codes() {
        assert_eq!(
            CoreError::ProductNotFound("x".into()).kind().status_code(),
            404
        );
        assert_eq!(
            CoreError::InsufficientStockForSale(vec![]).kind().status_code(),
            400
        );
        assert_eq!(
            CoreError::SaleAlreadyCancelled("x".into()).kind().status_code(),
            409
        );
        assert_eq!(
            CoreError::NegativeTotal {
                subtotal: 1,
                tax: 0,
                discount: 2
            }
            .kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(ErrorKind::Internal.status_code(), 500);
    }

    #[test]
    fn test_single_shortage_is_reported_as_list() {
        let err = CoreError::InsufficientStock {
            product_id: "p-1".to_string(),
            available: 2,
            requested: 5,
        };
        let lines = err.shortages().unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].available, 2);
        assert_eq!(lines[0].requested, 5);

        assert!(CoreError::SaleNotFound("s".into()).shortages().is_none());
    }

    #[test]
    fn test_error_kind_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorKind::InsufficientStock).unwrap();
        assert_eq!(json, "\"INSUFFICIENT_STOCK\"");
    }
}
