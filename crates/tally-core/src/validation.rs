//! # Validation Module
//!
//! Input validation for ledger, sale and price requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Transport (external)                                         │
//! │  └── Deserialization, authentication, acting user                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE, called by every service before BEGIN            │
//! │  ├── Required ids, positive quantities, non-negative money             │
//! │  └── Discount range, pagination bounds                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (stock >= 0), CHECK (quantity > 0)                          │
//! │  └── Foreign keys to products/users                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::{DEFAULT_PAGE_LIMIT, FULL_DISCOUNT_BPS, MAX_PAGE_LIMIT};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates that a reference or text field is present.
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_required;
///
/// assert!(validate_required("user_id", "u-1").is_ok());
/// assert!(validate_required("user_id", "  ").is_err());
/// ```
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates an optional free-text field's length.
pub fn validate_max_len(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

/// Validates an optional email address.
///
/// Only the shape is checked (`local@domain`); deliverability is not.
pub fn validate_email(field: &str, value: Option<&str>) -> ValidationResult<()> {
    let Some(email) = value.map(str::trim).filter(|e| !e.is_empty()) else {
        return Ok(());
    };

    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    };

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be an email address".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a movement or line quantity.
///
/// ## Rules
/// - Must be positive (> 0). Direction is carried by the movement kind,
///   never by the sign of the quantity.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}

/// Validates a monetary amount in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free items, untaxed sales)
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_non_negative_cents;
///
/// assert!(validate_non_negative_cents("unit_cost", 0).is_ok());
/// assert!(validate_non_negative_cents("unit_cost", -1).is_err());
/// ```
pub fn validate_non_negative_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates an item discount in basis points (0% to 100%).
pub fn validate_discount_bps(bps: u32) -> ValidationResult<()> {
    if bps > FULL_DISCOUNT_BPS {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: FULL_DISCOUNT_BPS as i64,
        });
    }
    Ok(())
}

/// Resolves a requested page size.
///
/// `None` falls back to [`DEFAULT_PAGE_LIMIT`]; zero or anything above
/// [`MAX_PAGE_LIMIT`] is rejected.
pub fn validate_page_limit(limit: Option<u32>) -> ValidationResult<u32> {
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    if limit == 0 || limit > MAX_PAGE_LIMIT {
        return Err(ValidationError::OutOfRange {
            field: "limit".to_string(),
            min: 1,
            max: MAX_PAGE_LIMIT as i64,
        });
    }
    Ok(limit)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_required() {
        assert!(validate_required("product_id", "abc").is_ok());
        assert!(validate_required("product_id", "").is_err());
        assert!(validate_required("product_id", "   ").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(100_000).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
    }

    #[test]
    fn test_validate_non_negative_cents() {
        assert!(validate_non_negative_cents("tax", 0).is_ok());
        assert!(validate_non_negative_cents("tax", 1099).is_ok());
        let err = validate_non_negative_cents("tax", -1).unwrap_err();
        assert_eq!(err.to_string(), "tax must not be negative");
    }

    #[test]
    fn test_validate_discount_bps() {
        assert!(validate_discount_bps(0).is_ok());
        assert!(validate_discount_bps(10_000).is_ok());
        assert!(validate_discount_bps(10_001).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("client_email", None).is_ok());
        assert!(validate_email("client_email", Some("")).is_ok());
        assert!(validate_email("client_email", Some("ana@shop.example")).is_ok());
        assert!(validate_email("client_email", Some("ana")).is_err());
        assert!(validate_email("client_email", Some("@shop.example")).is_err());
        assert!(validate_email("client_email", Some("ana@localhost")).is_err());
    }

    #[test]
    fn test_validate_page_limit() {
        assert_eq!(validate_page_limit(None).unwrap(), DEFAULT_PAGE_LIMIT);
        assert_eq!(validate_page_limit(Some(10)).unwrap(), 10);
        assert!(validate_page_limit(Some(0)).is_err());
        assert!(validate_page_limit(Some(MAX_PAGE_LIMIT + 1)).is_err());
    }

    #[test]
    fn test_validate_max_len() {
        assert!(validate_max_len("notes", None, 5).is_ok());
        assert!(validate_max_len("notes", Some("hello"), 5).is_ok());
        assert!(validate_max_len("notes", Some("hello!"), 5).is_err());
    }
}
