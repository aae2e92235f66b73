//! # Price Timeline
//!
//! Per product and price kind, an ordered sequence of validity intervals
//! `[valid_from, valid_to)`. At most one interval per (product, kind) is
//! open (`valid_to = None`); that one is the active price and its value is
//! mirrored into the product's matching price field.
//!
//! ```text
//! retail  ├──── 9.00 ────┤├──── 10.00 ─────────────────►
//!         T1             T2                     (open)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::Product;
use crate::validation::{validate_non_negative_cents, validate_required, ValidationResult};

// =============================================================================
// Price Kind
// =============================================================================

/// Which of the product's prices an entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PriceKind {
    Cost,
    Retail,
    Wholesale,
}

impl PriceKind {
    pub const ALL: [PriceKind; 3] = [PriceKind::Cost, PriceKind::Retail, PriceKind::Wholesale];

    /// Product column that mirrors the active value of this kind.
    ///
    /// This is the only place the kind → field mapping lives.
    pub const fn product_column(self) -> &'static str {
        match self {
            PriceKind::Cost => "cost_cents",
            PriceKind::Retail => "retail_price_cents",
            PriceKind::Wholesale => "wholesale_price_cents",
        }
    }

    /// Reads the mirrored value of this kind from a product.
    pub fn current_value(self, product: &Product) -> Money {
        match self {
            PriceKind::Cost => product.cost(),
            PriceKind::Retail => product.retail_price(),
            PriceKind::Wholesale => product.wholesale_price(),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            PriceKind::Cost => "cost",
            PriceKind::Retail => "retail",
            PriceKind::Wholesale => "wholesale",
        }
    }
}

impl fmt::Display for PriceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Price History Entry
// =============================================================================

/// One interval of the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PriceHistoryEntry {
    pub id: String,
    pub product_id: String,
    pub price_kind: PriceKind,
    pub value_cents: i64,
    #[ts(as = "String")]
    pub valid_from: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub valid_to: Option<DateTime<Utc>>,
    pub user_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl PriceHistoryEntry {
    #[inline]
    pub fn is_open(&self) -> bool {
        self.valid_to.is_none()
    }

    #[inline]
    pub fn value(&self) -> Money {
        Money::from_cents(self.value_cents)
    }

    /// Whether `at` falls inside `[valid_from, valid_to)`.
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        self.valid_from <= at && self.valid_to.map_or(true, |end| at < end)
    }
}

/// Checks that a new interval starting at `start` may follow `active`.
///
/// A start earlier than the active entry's start would leave two intervals
/// overlapping, so it is rejected. An equal start closes the active entry
/// as an empty interval.
pub fn ensure_follows(active: Option<&PriceHistoryEntry>, start: DateTime<Utc>) -> CoreResult<()> {
    match active {
        Some(entry) if start < entry.valid_from => Err(CoreError::PriceTimelineConflict {
            product_id: entry.product_id.clone(),
            kind: entry.price_kind,
            reason: format!(
                "new start {} is before active start {}",
                start.to_rfc3339(),
                entry.valid_from.to_rfc3339()
            ),
        }),
        _ => Ok(()),
    }
}

/// Finds the entry covering `at` in one (product, kind) timeline.
pub fn price_at(entries: &[PriceHistoryEntry], at: DateTime<Utc>) -> Option<&PriceHistoryEntry> {
    entries.iter().find(|e| e.covers(at))
}

/// Checks a whole (product, kind) timeline: at most one open entry and no
/// two intervals overlapping.
pub fn timeline_is_consistent(entries: &[PriceHistoryEntry]) -> bool {
    let mut sorted: Vec<&PriceHistoryEntry> = entries.iter().collect();
    // Closed entries first on equal starts; an empty [t, t) precedes [t, ∞).
    sorted.sort_by_key(|e| (e.valid_from, e.is_open()));

    let open = sorted.iter().filter(|e| e.is_open()).count();
    if open > 1 {
        return false;
    }

    sorted.windows(2).all(|pair| match pair[0].valid_to {
        Some(end) => end <= pair[1].valid_from,
        None => false,
    })
}

// =============================================================================
// Requests & Filters
// =============================================================================

/// A request to register a new price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceChange {
    pub product_id: String,
    pub kind: PriceKind,
    pub value_cents: i64,
    pub user_id: String,
    /// Start of the new interval. Defaults to now.
    pub starts_at: Option<DateTime<Utc>>,
}

impl PriceChange {
    pub fn new(
        product_id: impl Into<String>,
        kind: PriceKind,
        value_cents: i64,
        user_id: impl Into<String>,
    ) -> Self {
        PriceChange {
            product_id: product_id.into(),
            kind,
            value_cents,
            user_id: user_id.into(),
            starts_at: None,
        }
    }

    pub fn starting_at(mut self, at: DateTime<Utc>) -> Self {
        self.starts_at = Some(at);
        self
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_required("product_id", &self.product_id)?;
        validate_required("user_id", &self.user_id)?;
        validate_non_negative_cents("value", self.value_cents)?;
        Ok(())
    }
}

/// The product's currently mirrored prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CurrentPrices {
    pub cost_cents: i64,
    pub retail_price_cents: i64,
    pub wholesale_price_cents: i64,
}

impl From<&Product> for CurrentPrices {
    fn from(product: &Product) -> Self {
        CurrentPrices {
            cost_cents: product.cost_cents,
            retail_price_cents: product.retail_price_cents,
            wholesale_price_cents: product.wholesale_price_cents,
        }
    }
}

/// Filters for listing timeline entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceHistoryFilter {
    pub product_id: Option<String>,
    pub kind: Option<PriceKind>,
    /// Inclusive lower bound on `valid_from`.
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `valid_from`.
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
    use chrono::Duration;

    fn entry(from: DateTime<Utc>, to: Option<DateTime<Utc>>, value: i64) -> PriceHistoryEntry {
        PriceHistoryEntry {
            id: uuid::Uuid::new_v4().to_string(),
            product_id: "p".into(),
            price_kind: PriceKind::Retail,
            value_cents: value,
            valid_from: from,
            valid_to: to,
            user_id: "u".into(),
            created_at: from,
        }
    }

    #[test]
    fn test_product_columns_are_distinct() {
        let cols: Vec<_> = PriceKind::ALL.iter().map(|k| k.product_column()).collect();
        assert_eq!(cols, vec!["cost_cents", "retail_price_cents", "wholesale_price_cents"]);
    }

    #[test]
    fn test_current_value_reads_matching_field() {
        let mut p = Product::new("SKU", "Name");
        p.cost_cents = 1;
        p.retail_price_cents = 2;
        p.wholesale_price_cents = 3;
        assert_eq!(PriceKind::Cost.current_value(&p).cents(), 1);
        assert_eq!(PriceKind::Retail.current_value(&p).cents(), 2);
        assert_eq!(PriceKind::Wholesale.current_value(&p).cents(), 3);
    }

    #[test]
    fn test_ensure_follows() {
        let t1 = Utc::now();
        let active = entry(t1, None, 900);

        assert!(ensure_follows(None, t1).is_ok());
        assert!(ensure_follows(Some(&active), t1).is_ok());
        assert!(ensure_follows(Some(&active), t1 + Duration::hours(1)).is_ok());

        let err = ensure_follows(Some(&active), t1 - Duration::seconds(1)).unwrap_err();
        assert!(matches!(err, CoreError::PriceTimelineConflict { .. }));
    }

    #[test]
    fn test_price_at_uses_half_open_intervals() {
        let t1 = Utc::now();
        let t2 = t1 + Duration::days(1);
        let entries = vec![entry(t1, Some(t2), 900), entry(t2, None, 1000)];

        assert!(price_at(&entries, t1 - Duration::seconds(1)).is_none());
        assert_eq!(price_at(&entries, t1).unwrap().value_cents, 900);
        assert_eq!(price_at(&entries, t2).unwrap().value_cents, 1000);
        assert_eq!(
            price_at(&entries, t2 + Duration::days(30)).unwrap().value_cents,
            1000
        );
    }

    #[test]
    fn test_timeline_consistency() {
        let t1 = Utc::now();
        let t2 = t1 + Duration::days(1);

        let good = vec![entry(t1, Some(t2), 900), entry(t2, None, 1000)];
        assert!(timeline_is_consistent(&good));

        let two_open = vec![entry(t1, None, 900), entry(t2, None, 1000)];
        assert!(!timeline_is_consistent(&two_open));

        let overlap = vec![
            entry(t1, Some(t2 + Duration::hours(1)), 900),
            entry(t2, None, 1000),
        ];
        assert!(!timeline_is_consistent(&overlap));
    }

    #[test]
    fn test_price_change_validation() {
        assert!(PriceChange::new("p", PriceKind::Cost, 0, "u").validate().is_ok());
        assert!(PriceChange::new("p", PriceKind::Cost, -1, "u").validate().is_err());
        assert!(PriceChange::new("", PriceKind::Cost, 1, "u").validate().is_err());
    }
}
