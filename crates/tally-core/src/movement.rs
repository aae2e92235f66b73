//! # Stock Movements
//!
//! Ledger entries and the rules that give each movement kind its direction.
//!
//! ## Kind Table
//! ```text
//! ┌──────────────────────┬───────────┬──────────────────┐
//! │ kind                 │ direction │ default reason   │
//! ├──────────────────────┼───────────┼──────────────────┤
//! │ input                │ increase  │ purchase         │
//! │ output               │ decrease  │ sale             │
//! │ adjustment_add       │ increase  │ adjustment       │
//! │ adjustment_subtract  │ decrease  │ adjustment       │
//! │ return_in            │ increase  │ return           │
//! │ return_out           │ decrease  │ return           │
//! │ transfer_in          │ increase  │ transfer         │
//! │ transfer_out         │ decrease  │ transfer         │
//! └──────────────────────┴───────────┴──────────────────┘
//! ```
//!
//! Quantities are always positive; the kind carries the sign. Adding a kind
//! means adding one row to [`MovementKind::spec`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::{
    validate_max_len, validate_non_negative_cents, validate_quantity, validate_required,
    ValidationResult,
};

// =============================================================================
// Direction
// =============================================================================

/// Which way a movement moves the stock projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockDirection {
    Increase,
    Decrease,
}

impl StockDirection {
    /// Signed delta for a positive quantity.
    #[inline]
    pub const fn signed(self, quantity: i64) -> i64 {
        match self {
            StockDirection::Increase => quantity,
            StockDirection::Decrease => -quantity,
        }
    }

    /// Stock after applying `quantity` in this direction.
    #[inline]
    pub const fn apply(self, stock: i64, quantity: i64) -> i64 {
        stock + self.signed(quantity)
    }

    /// Stock before a movement that ended at `current`.
    #[inline]
    pub const fn revert(self, current: i64, quantity: i64) -> i64 {
        current - self.signed(quantity)
    }
}

// =============================================================================
// Movement Kind
// =============================================================================

/// Operational class of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Input,
    Output,
    AdjustmentAdd,
    AdjustmentSubtract,
    ReturnIn,
    ReturnOut,
    TransferIn,
    TransferOut,
}

/// One row of the kind table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindSpec {
    pub direction: StockDirection,
    pub default_reason: MovementReason,
}

impl MovementKind {
    pub const ALL: [MovementKind; 8] = [
        MovementKind::Input,
        MovementKind::Output,
        MovementKind::AdjustmentAdd,
        MovementKind::AdjustmentSubtract,
        MovementKind::ReturnIn,
        MovementKind::ReturnOut,
        MovementKind::TransferIn,
        MovementKind::TransferOut,
    ];

    /// The kind table. Every per-kind decision is read from here.
    pub const fn spec(self) -> KindSpec {
        use MovementReason as R;
        use StockDirection::{Decrease, Increase};

        let (direction, default_reason) = match self {
            MovementKind::Input => (Increase, R::Purchase),
            MovementKind::Output => (Decrease, R::Sale),
            MovementKind::AdjustmentAdd => (Increase, R::Adjustment),
            MovementKind::AdjustmentSubtract => (Decrease, R::Adjustment),
            MovementKind::ReturnIn => (Increase, R::Return),
            MovementKind::ReturnOut => (Decrease, R::Return),
            MovementKind::TransferIn => (Increase, R::Transfer),
            MovementKind::TransferOut => (Decrease, R::Transfer),
        };
        KindSpec {
            direction,
            default_reason,
        }
    }

    #[inline]
    pub const fn direction(self) -> StockDirection {
        self.spec().direction
    }

    #[inline]
    pub const fn default_reason(self) -> MovementReason {
        self.spec().default_reason
    }

    #[inline]
    pub const fn is_increase(self) -> bool {
        matches!(self.direction(), StockDirection::Increase)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            MovementKind::Input => "input",
            MovementKind::Output => "output",
            MovementKind::AdjustmentAdd => "adjustment_add",
            MovementKind::AdjustmentSubtract => "adjustment_subtract",
            MovementKind::ReturnIn => "return_in",
            MovementKind::ReturnOut => "return_out",
            MovementKind::TransferIn => "transfer_in",
            MovementKind::TransferOut => "transfer_out",
        }
    }
}

// =============================================================================
// Movement Reason
// =============================================================================

/// Business reason recorded alongside the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementReason {
    Purchase,
    Sale,
    Adjustment,
    Return,
    Transfer,
    Initial,
    Damaged,
    Expired,
    Other,
}

// =============================================================================
// Stock Movement (ledger entry)
// =============================================================================

/// An immutable ledger entry.
///
/// `current_stock == kind.direction().apply(previous_stock, quantity)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    pub quantity: i64,
    pub kind: MovementKind,
    pub reason: MovementReason,
    pub unit_cost_cents: i64,
    pub total_cost_cents: i64,
    pub notes: Option<String>,
    pub document_reference: Option<String>,
    /// Id of the sale or batch that caused this movement.
    pub reference_id: Option<String>,
    pub previous_stock: i64,
    pub current_stock: i64,
    /// Opaque location tag.
    pub location_id: Option<String>,
    pub user_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    /// Signed change this entry applied to the projection.
    #[inline]
    pub fn signed_delta(&self) -> i64 {
        self.kind.direction().signed(self.quantity)
    }

    /// Whether the before/after snapshots agree with kind and quantity.
    pub fn snapshots_agree(&self) -> bool {
        self.kind.direction().apply(self.previous_stock, self.quantity) == self.current_stock
    }

    #[inline]
    pub fn total_cost(&self) -> Money {
        Money::from_cents(self.total_cost_cents)
    }
}

// =============================================================================
// New Movement (ledger request)
// =============================================================================

/// A request to append one ledger entry.
///
/// ## Example
/// ```rust
/// use tally_core::movement::{MovementKind, MovementReason, NewMovement};
///
/// let movement = NewMovement::new("product-id", "user-id", MovementKind::Output, 3, 500)
///     .reference_id("sale-id")
///     .notes("Sale #sale-id");
///
/// assert_eq!(movement.reason, MovementReason::Sale); // default for Output
/// assert_eq!(movement.total_cost_cents(), 1500);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMovement {
    pub product_id: String,
    pub user_id: String,
    pub kind: MovementKind,
    pub reason: MovementReason,
    pub quantity: i64,
    pub unit_cost_cents: i64,
    pub notes: Option<String>,
    pub document_reference: Option<String>,
    pub reference_id: Option<String>,
    pub location_id: Option<String>,
}

impl NewMovement {
    /// Creates a request with the kind's default reason.
    pub fn new(
        product_id: impl Into<String>,
        user_id: impl Into<String>,
        kind: MovementKind,
        quantity: i64,
        unit_cost_cents: i64,
    ) -> Self {
        NewMovement {
            product_id: product_id.into(),
            user_id: user_id.into(),
            kind,
            reason: kind.default_reason(),
            quantity,
            unit_cost_cents,
            notes: None,
            document_reference: None,
            reference_id: None,
            location_id: None,
        }
    }

    pub fn reason(mut self, reason: MovementReason) -> Self {
        self.reason = reason;
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn document_reference(mut self, reference: impl Into<String>) -> Self {
        self.document_reference = Some(reference.into());
        self
    }

    pub fn reference_id(mut self, id: impl Into<String>) -> Self {
        self.reference_id = Some(id.into());
        self
    }

    pub fn location(mut self, location_id: impl Into<String>) -> Self {
        self.location_id = Some(location_id.into());
        self
    }

    /// Derived total cost (`quantity × unit cost`).
    #[inline]
    pub fn total_cost_cents(&self) -> i64 {
        self.quantity * self.unit_cost_cents
    }

    /// Checks required references, quantity and cost.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_required("product_id", &self.product_id)?;
        validate_required("user_id", &self.user_id)?;
        validate_quantity(self.quantity)?;
        validate_non_negative_cents("unit_cost", self.unit_cost_cents)?;
        validate_max_len("notes", self.notes.as_deref(), 1000)?;
        self.quantity
            .checked_mul(self.unit_cost_cents)
            .ok_or_else(|| ValidationError::OutOfRange {
                field: "total_cost".to_string(),
                min: 0,
                max: i64::MAX,
            })?;
        Ok(())
    }

    /// Builds the ledger entry for a projection that moved from
    /// `previous_stock` to `current_stock`.
    pub fn into_movement(self, previous_stock: i64, current_stock: i64) -> StockMovement {
        let total_cost_cents = self.total_cost_cents();
        StockMovement {
            id: uuid::Uuid::new_v4().to_string(),
            product_id: self.product_id,
            quantity: self.quantity,
            kind: self.kind,
            reason: self.reason,
            unit_cost_cents: self.unit_cost_cents,
            total_cost_cents,
            notes: self.notes,
            document_reference: self.document_reference,
            reference_id: self.reference_id,
            previous_stock,
            current_stock,
            location_id: self.location_id,
            user_id: self.user_id,
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// Movement Filter
// =============================================================================

/// Filters for listing ledger entries. All fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementFilter {
    pub product_id: Option<String>,
    pub kind: Option<MovementKind>,
    pub reason: Option<MovementReason>,
    pub reference_id: Option<String>,
    /// Inclusive lower bound on `created_at`.
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`.
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increase_set() {
        let increasing: Vec<_> = MovementKind::ALL
            .into_iter()
            .filter(|k| k.is_increase())
            .collect();
        assert_eq!(
            increasing,
            vec![
                MovementKind::Input,
                MovementKind::AdjustmentAdd,
                MovementKind::ReturnIn,
                MovementKind::TransferIn,
            ]
        );
    }

    #[test]
    fn test_direction_arithmetic() {
        assert_eq!(StockDirection::Increase.apply(10, 3), 13);
        assert_eq!(StockDirection::Decrease.apply(10, 3), 7);
        assert_eq!(StockDirection::Decrease.revert(7, 3), 10);
        assert_eq!(StockDirection::Increase.revert(13, 3), 10);
    }

    #[test]
    fn test_default_reasons() {
        assert_eq!(MovementKind::Input.default_reason(), MovementReason::Purchase);
        assert_eq!(MovementKind::Output.default_reason(), MovementReason::Sale);
        assert_eq!(
            MovementKind::AdjustmentSubtract.default_reason(),
            MovementReason::Adjustment
        );
        assert_eq!(MovementKind::ReturnOut.default_reason(), MovementReason::Return);
    }

    #[test]
    fn test_kind_names_match_serde() {
        for kind in MovementKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_new_movement_validation() {
        let ok = NewMovement::new("p", "u", MovementKind::Input, 5, 100);
        assert!(ok.validate().is_ok());

        assert!(NewMovement::new("p", "u", MovementKind::Input, 0, 100)
            .validate()
            .is_err());
        assert!(NewMovement::new("p", "u", MovementKind::Input, 1, -1)
            .validate()
            .is_err());
        assert!(NewMovement::new("", "u", MovementKind::Input, 1, 1)
            .validate()
            .is_err());
        assert!(NewMovement::new("p", " ", MovementKind::Input, 1, 1)
            .validate()
            .is_err());
        assert!(NewMovement::new("p", "u", MovementKind::Input, i64::MAX, 2)
            .validate()
            .is_err());
    }

    #[test]
    fn test_into_movement_snapshots() {
        let movement = NewMovement::new("p", "u", MovementKind::Output, 3, 500)
            .into_movement(10, 7);
        assert_eq!(movement.total_cost_cents, 1500);
        assert_eq!(movement.signed_delta(), -3);
        assert!(movement.snapshots_agree());
    }
}
