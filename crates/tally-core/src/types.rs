//! # Domain Types
//!
//! Core domain types shared by the ledger engine.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │    SaleItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  stock ◄────────┼───┼─ projection of  │   │  unit price and │       │
//! │  │  cost/retail/   │   │  the ledger     │   │  cost snapshots │       │
//! │  │  wholesale ◄────┼───┼─ projection of  │   │  discount_bps   │       │
//! │  │  min_stock      │   │  the timeline   │   │  total_price    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   SaleStatus    │   │    SaleType     │   │     Batch       │       │
//! │  │  Pending        │   │  Retail         │   │  received stock │       │
//! │  │  Completed      │   │  Wholesale      │   │  at a unit cost │       │
//! │  │  Cancelled      │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Ledger entries live in [`crate::movement`], price timeline entries in
//! [`crate::price`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// The product record as seen by the ledger engine.
///
/// Product master data is owned elsewhere. The engine reads identity and
/// treats `stock` and the three price fields as projections it keeps
/// accurate: `stock` from the movement ledger, prices from the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name, used in insufficiency reports.
    pub name: String,

    /// Quantity on hand. Never negative.
    pub stock: i64,

    /// Threshold at or below which the product counts as low on stock.
    pub min_stock: i64,

    /// Current cost in cents.
    pub cost_cents: i64,

    /// Current retail price in cents.
    pub retail_price_cents: i64,

    /// Current wholesale price in cents.
    pub wholesale_price_cents: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Creates an active product with zero stock and zero prices.
    ///
    /// Stock and prices are filled in through the ledger and the price
    /// timeline, never by writing the fields directly.
    pub fn new(sku: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Product {
            id: uuid::Uuid::new_v4().to_string(),
            sku: sku.into(),
            name: name.into(),
            stock: 0,
            min_stock: 0,
            cost_cents: 0,
            retail_price_cents: 0,
            wholesale_price_cents: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the low-stock threshold.
    pub fn with_min_stock(mut self, min_stock: i64) -> Self {
        self.min_stock = min_stock;
        self
    }

    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_cents)
    }

    #[inline]
    pub fn retail_price(&self) -> Money {
        Money::from_cents(self.retail_price_cents)
    }

    #[inline]
    pub fn wholesale_price(&self) -> Money {
        Money::from_cents(self.wholesale_price_cents)
    }

    /// Default unit price for a sale of the given type.
    pub fn price_for(&self, sale_type: SaleType) -> Money {
        match sale_type {
            SaleType::Retail => self.retail_price(),
            SaleType::Wholesale => self.wholesale_price(),
        }
    }

    /// Checks whether `quantity` can be taken from the current projection.
    #[inline]
    pub fn has_stock_for(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }

    /// True when stock is at or below the minimum threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }

    /// Retail margin over cost, in basis points of the retail price.
    pub fn retail_margin_bps(&self) -> Option<i64> {
        self.retail_price().margin_bps_over(self.cost())
    }

    /// Wholesale margin over cost, in basis points of the wholesale price.
    pub fn wholesale_margin_bps(&self) -> Option<i64> {
        self.wholesale_price().margin_bps_over(self.cost())
    }

    pub fn summary(&self) -> ProductSummary {
        ProductSummary {
            id: self.id.clone(),
            sku: self.sku.clone(),
            name: self.name.clone(),
        }
    }
}

/// Product identity attached to sale items on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductSummary {
    pub id: String,
    pub sku: String,
    pub name: String,
}

// =============================================================================
// User
// =============================================================================

/// An acting user as referenced by audit fields.
///
/// Users are managed by the authentication layer; the engine only needs a
/// row to reference and a summary to attach on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: String,
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale.
///
/// ## Lifecycle
/// ```text
/// ∅ ──createSale──► Completed ──cancelSale──► Cancelled (terminal)
///
/// Pending is reserved for partial-fulfilment flows and is never produced
/// by createSale.
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    Pending,
    Completed,
    Cancelled,
}

impl SaleStatus {
    /// Whether a sale in this status may be cancelled.
    #[inline]
    pub const fn is_cancellable(self) -> bool {
        !matches!(self, SaleStatus::Cancelled)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            SaleStatus::Pending => "pending",
            SaleStatus::Completed => "completed",
            SaleStatus::Cancelled => "cancelled",
        }
    }
}

// =============================================================================
// Sale Type
// =============================================================================

/// Selects which product price is the default unit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleType {
    #[default]
    Retail,
    Wholesale,
}

// =============================================================================
// Sale
// =============================================================================

/// A sale header.
///
/// `total_cents == subtotal_cents + tax_cents - discount_cents` and
/// `subtotal_cents` is the sum of its items' `total_price_cents`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub user_id: String,
    pub client_name: String,
    pub client_document: Option<String>,
    pub client_phone: Option<String>,
    pub client_email: Option<String>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub notes: Option<String>,
    pub status: SaleStatus,
    pub sale_type: SaleType,
    pub document_number: Option<String>,
    pub payment_method: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Checks the header's total identity.
    pub fn totals_balance(&self) -> bool {
        self.total_cents == self.subtotal_cents + self.tax_cents - self.discount_cents
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A sale line with price and cost snapshots taken at sale time.
///
/// Later price changes never alter these values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub unit_cost_cents: i64,
    /// Discount in basis points (0..=10000).
    pub discount_bps: u32,
    pub total_price_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    #[inline]
    pub fn unit_cost(&self) -> Money {
        Money::from_cents(self.unit_cost_cents)
    }

    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }

    /// Line revenue minus the cost snapshot of the goods sold.
    pub fn gross_margin(&self) -> Money {
        self.total_price() - self.unit_cost().multiply_quantity(self.quantity)
    }
}

/// A sale item with its product attached.
///
/// `product` is `None` only if the product row has since disappeared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLine {
    pub item: SaleItem,
    pub product: Option<ProductSummary>,
}

/// A sale with its items, their products and the acting user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleDetails {
    pub sale: Sale,
    pub user: Option<UserSummary>,
    pub lines: Vec<SaleLine>,
}

impl SaleDetails {
    /// Sum of line totals, which must equal the stored subtotal.
    pub fn items_subtotal(&self) -> Money {
        self.lines.iter().map(|l| l.item.total_price()).sum()
    }
}

// =============================================================================
// Batch
// =============================================================================

/// A receipt of stock at a known unit cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Batch {
    pub id: String,
    pub product_id: String,
    pub initial_quantity: i64,
    pub available_quantity: i64,
    pub unit_cost_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Batch {
    /// Value of the batch as received.
    pub fn received_value(&self) -> Money {
        Money::from_cents(self.unit_cost_cents).multiply_quantity(self.initial_quantity)
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// One page of a listing with the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: u32,
    pub offset: u32,
}

impl<T> Page<T> {
    /// Whether rows exist past this page.
    pub fn has_more(&self) -> bool {
        (self.offset as i64) + (self.items.len() as i64) < self.total
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> Product {
        let mut p = Product::new("COFFEE-1KG", "Coffee 1kg").with_min_stock(3);
        p.stock = 10;
        p.cost_cents = 500;
        p.retail_price_cents = 800;
        p.wholesale_price_cents = 650;
        p
    }

    #[test]
    fn test_price_for_sale_type() {
        let p = product();
        assert_eq!(p.price_for(SaleType::Retail).cents(), 800);
        assert_eq!(p.price_for(SaleType::Wholesale).cents(), 650);
    }

    #[test]
    fn test_stock_checks() {
        let mut p = product();
        assert!(p.has_stock_for(10));
        assert!(!p.has_stock_for(11));
        assert!(!p.is_low_stock());
        p.stock = 3;
        assert!(p.is_low_stock());
    }

    #[test]
    fn test_margins() {
        let p = product();
        assert_eq!(p.retail_margin_bps(), Some(3750));
        assert_eq!(p.wholesale_margin_bps(), Some(2307));
    }

    #[test]
    fn test_sale_status_rules() {
        assert!(SaleStatus::Completed.is_cancellable());
        assert!(SaleStatus::Pending.is_cancellable());
        assert!(!SaleStatus::Cancelled.is_cancellable());
        assert_eq!(
            serde_json::to_string(&SaleStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
    }

    #[test]
    fn test_gross_margin() {
        let item = SaleItem {
            id: "i".into(),
            sale_id: "s".into(),
            product_id: "p".into(),
            quantity: 2,
            unit_price_cents: 800,
            unit_cost_cents: 500,
            discount_bps: 0,
            total_price_cents: 1600,
            created_at: Utc::now(),
        };
        assert_eq!(item.gross_margin().cents(), 600);
    }

    #[test]
    fn test_page_has_more() {
        let page = Page {
            items: vec![1, 2],
            total: 5,
            limit: 2,
            offset: 2,
        };
        assert!(page.has_more());
        let last = Page {
            items: vec![5],
            total: 5,
            limit: 2,
            offset: 4,
        };
        assert!(!last.has_more());
    }
}
