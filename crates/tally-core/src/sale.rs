//! # Sale Math
//!
//! Request types for the sale engine and the pure parts of `createSale`:
//! per-line stock checks, line pricing, and totals.
//!
//! ## Pricing a Line
//! ```text
//! unit price  = explicit price        if the line names one
//!             = product.retail_price  for a retail sale
//!             = product.wholesale_price for a wholesale sale
//!
//! line total  = (unit price × quantity) − round_half_up(… × discount_bps / 10000)
//!
//! subtotal    = Σ line totals                 (exact, integer cents)
//! total       = subtotal + tax − discount     (rejected if negative)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Product, SaleItem, SaleStatus, SaleType};
use crate::validation::{
    validate_discount_bps, validate_email, validate_max_len, validate_non_negative_cents,
    validate_quantity, validate_required, ValidationResult,
};

// =============================================================================
// Requests
// =============================================================================

/// Client identification carried on the sale header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub document: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl ClientInfo {
    pub fn named(name: impl Into<String>) -> Self {
        ClientInfo {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// One requested line of a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLineRequest {
    pub product_id: String,
    pub quantity: i64,
    /// Explicit unit price; the sale type's product price when absent.
    pub unit_price_cents: Option<i64>,
    /// Discount in basis points; zero when absent.
    pub discount_bps: Option<u32>,
}

impl SaleLineRequest {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        SaleLineRequest {
            product_id: product_id.into(),
            quantity,
            unit_price_cents: None,
            discount_bps: None,
        }
    }

    pub fn unit_price(mut self, cents: i64) -> Self {
        self.unit_price_cents = Some(cents);
        self
    }

    pub fn discount_bps(mut self, bps: u32) -> Self {
        self.discount_bps = Some(bps);
        self
    }

    fn validate(&self) -> ValidationResult<()> {
        validate_required("product_id", &self.product_id)?;
        validate_quantity(self.quantity)?;
        if let Some(price) = self.unit_price_cents {
            validate_non_negative_cents("unit_price", price)?;
        }
        if let Some(bps) = self.discount_bps {
            validate_discount_bps(bps)?;
        }
        Ok(())
    }
}

/// A request to record a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSale {
    pub user_id: String,
    pub client: ClientInfo,
    pub items: Vec<SaleLineRequest>,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub notes: Option<String>,
    pub sale_type: SaleType,
    pub document_number: Option<String>,
    /// Free text; [`crate::DEFAULT_PAYMENT_METHOD`] when absent.
    pub payment_method: Option<String>,
}

impl NewSale {
    /// Creates a retail sale with no tax or header discount.
    pub fn new(user_id: impl Into<String>, client: ClientInfo, items: Vec<SaleLineRequest>) -> Self {
        NewSale {
            user_id: user_id.into(),
            client,
            items,
            tax_cents: 0,
            discount_cents: 0,
            notes: None,
            sale_type: SaleType::Retail,
            document_number: None,
            payment_method: None,
        }
    }

    pub fn sale_type(mut self, sale_type: SaleType) -> Self {
        self.sale_type = sale_type;
        self
    }

    pub fn tax(mut self, cents: i64) -> Self {
        self.tax_cents = cents;
        self
    }

    pub fn discount(mut self, cents: i64) -> Self {
        self.discount_cents = cents;
        self
    }

    pub fn payment_method(mut self, method: impl Into<String>) -> Self {
        self.payment_method = Some(method.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Checks everything that can be checked without reading products.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_required("user_id", &self.user_id)?;
        validate_required("client_name", &self.client.name)?;
        validate_email("client_email", self.client.email.as_deref())?;
        validate_max_len("notes", self.notes.as_deref(), 1000)?;
        validate_non_negative_cents("tax", self.tax_cents)?;
        validate_non_negative_cents("discount", self.discount_cents)?;

        if self.items.is_empty() {
            return Err(ValidationError::Empty {
                field: "items".to_string(),
            });
        }
        self.items.iter().try_for_each(SaleLineRequest::validate)
    }

    pub fn resolved_payment_method(&self) -> String {
        self.payment_method
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(crate::DEFAULT_PAYMENT_METHOD)
            .to_string()
    }
}

// =============================================================================
// Insufficiency Report
// =============================================================================

/// One line of an insufficiency report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockShortage {
    pub product_id: String,
    pub product_name: String,
    pub requested: i64,
    pub available: i64,
}

impl StockShortage {
    /// Compares a line against the product's projected stock.
    pub fn check(line: &SaleLineRequest, product: &Product) -> Option<StockShortage> {
        if product.has_stock_for(line.quantity) {
            return None;
        }
        Some(StockShortage {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            requested: line.quantity,
            available: product.stock,
        })
    }
}

// =============================================================================
// Priced Lines & Totals
// =============================================================================

/// A line with its prices resolved against the product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub unit_cost: Money,
    pub discount_bps: u32,
    pub total_price: Money,
}

impl PricedLine {
    /// Resolves the unit price and line total.
    ///
    /// Fails with `OutOfRange` when `unit price × quantity` does not fit in
    /// an `i64` of cents.
    pub fn price(line: &SaleLineRequest, product: &Product, sale_type: SaleType) -> CoreResult<PricedLine> {
        let unit_price = line
            .unit_price_cents
            .map(Money::from_cents)
            .unwrap_or_else(|| product.price_for(sale_type));
        let discount_bps = line.discount_bps.unwrap_or(0);
        let total_price = unit_price
            .checked_multiply_quantity(line.quantity)
            .ok_or_else(|| out_of_range("line_total"))?
            .apply_percentage_discount(discount_bps);

        Ok(PricedLine {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            quantity: line.quantity,
            unit_price,
            unit_cost: product.cost(),
            discount_bps,
            total_price,
        })
    }

    /// Snapshot row for this line.
    pub fn to_item(&self, sale_id: &str, created_at: DateTime<Utc>) -> SaleItem {
        SaleItem {
            id: uuid::Uuid::new_v4().to_string(),
            sale_id: sale_id.to_string(),
            product_id: self.product_id.clone(),
            quantity: self.quantity,
            unit_price_cents: self.unit_price.cents(),
            unit_cost_cents: self.unit_cost.cents(),
            discount_bps: self.discount_bps,
            total_price_cents: self.total_price.cents(),
            created_at,
        }
    }
}

/// Header amounts of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
}

impl SaleTotals {
    /// Sums the lines and applies header tax and discount.
    pub fn compute(lines: &[PricedLine], tax_cents: i64, discount_cents: i64) -> CoreResult<SaleTotals> {
        let subtotal = lines
            .iter()
            .try_fold(Money::zero(), |acc, l| acc.checked_add(l.total_price))
            .ok_or_else(|| out_of_range("subtotal"))?;
        let tax = Money::from_cents(tax_cents);
        let discount = Money::from_cents(discount_cents);
        // Subtotal, tax and discount are all non-negative, so only the
        // addition can overflow
        let total = subtotal
            .checked_add(tax)
            .ok_or_else(|| out_of_range("total"))?
            - discount;

        if total.is_negative() {
            return Err(CoreError::NegativeTotal {
                subtotal: subtotal.cents(),
                tax: tax_cents,
                discount: discount_cents,
            });
        }

        Ok(SaleTotals {
            subtotal,
            tax,
            discount,
            total,
        })
    }
}

fn out_of_range(field: &str) -> CoreError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: i64::MAX,
    }
    .into()
}

// =============================================================================
// Filters
// =============================================================================

/// Filters for listing sales. All fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleFilter {
    pub user_id: Option<String>,
    /// Case-insensitive substring match on the client name.
    pub client_name: Option<String>,
    pub status: Option<SaleStatus>,
    pub sale_type: Option<SaleType>,
    /// Inclusive lower bound on the sale date.
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the sale date.
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

    fn product(stock: i64) -> Product {
        let mut p = Product::new("TEA-100", "Green tea");
        p.stock = stock;
        p.cost_cents = 500;
        p.retail_price_cents = 800;
        p.wholesale_price_cents = 650;
        p
    }

    fn sale(items: Vec<SaleLineRequest>) -> NewSale {
        NewSale::new("user-1", ClientInfo::named("Walk-in"), items)
    }

    #[test]
    fn test_validate_rejects_empty_items_and_missing_client() {
        assert!(matches!(
            sale(vec![]).validate(),
            Err(ValidationError::Empty { .. })
        ));

        let mut no_client = sale(vec![SaleLineRequest::new("p", 1)]);
        no_client.client.name = "  ".into();
        assert!(matches!(
            no_client.validate(),
            Err(ValidationError::Required { .. })
        ));

        let mut no_user = sale(vec![SaleLineRequest::new("p", 1)]);
        no_user.user_id.clear();
        assert!(no_user.validate().is_err());
    }

    #[test]
    fn test_validate_lines() {
        assert!(sale(vec![SaleLineRequest::new("p", 0)]).validate().is_err());
        assert!(sale(vec![SaleLineRequest::new("p", 1).discount_bps(10_001)])
            .validate()
            .is_err());
        assert!(sale(vec![SaleLineRequest::new("p", 1).unit_price(-5)])
            .validate()
            .is_err());
        assert!(sale(vec![SaleLineRequest::new("p", 1)]).tax(-1).validate().is_err());
        assert!(sale(vec![SaleLineRequest::new("p", 2)]).validate().is_ok());
    }

    #[test]
    fn test_shortage_check() {
        let line = SaleLineRequest::new("p", 5);
        let shortage = StockShortage::check(&line, &product(2)).unwrap();
        assert_eq!(shortage.requested, 5);
        assert_eq!(shortage.available, 2);
        assert_eq!(shortage.product_name, "Green tea");

        assert!(StockShortage::check(&line, &product(5)).is_none());
    }

    #[test]
    fn test_line_pricing_defaults_by_sale_type() {
        let p = product(10);
        let line = SaleLineRequest::new(p.id.clone(), 2);

        let retail = PricedLine::price(&line, &p, SaleType::Retail).unwrap();
        assert_eq!(retail.unit_price.cents(), 800);
        assert_eq!(retail.total_price.cents(), 1600);
        assert_eq!(retail.unit_cost.cents(), 500);

        let wholesale = PricedLine::price(&line, &p, SaleType::Wholesale).unwrap();
        assert_eq!(wholesale.total_price.cents(), 1300);
    }

    #[test]
    fn test_line_pricing_explicit_price_and_discount() {
        let p = product(10);
        let line = SaleLineRequest::new(p.id.clone(), 3)
            .unit_price(1000)
            .discount_bps(2500);
        let priced = PricedLine::price(&line, &p, SaleType::Retail).unwrap();
        assert_eq!(priced.total_price.cents(), 2250);

        let item = priced.to_item("sale-1", Utc::now());
        assert_eq!(item.unit_price_cents, 1000);
        assert_eq!(item.discount_bps, 2500);
        assert_eq!(item.total_price_cents, 2250);
    }

    #[test]
    fn test_totals_identity() {
        let p = product(10);
        let lines = vec![
            PricedLine::price(&SaleLineRequest::new(p.id.clone(), 2), &p, SaleType::Retail).unwrap(),
            PricedLine::price(&SaleLineRequest::new(p.id.clone(), 1), &p, SaleType::Retail).unwrap(),
        ];
        let totals = SaleTotals::compute(&lines, 200, 100).unwrap();
        assert_eq!(totals.subtotal.cents(), 2400);
        assert_eq!(totals.total.cents(), 2500);
        assert_eq!(
            totals.total,
            totals.subtotal + totals.tax - totals.discount
        );
    }

    #[test]
    fn test_negative_total_rejected() {
        let p = product(10);
        let lines = vec![PricedLine::price(
            &SaleLineRequest::new(p.id.clone(), 1),
            &p,
            SaleType::Retail,
        )
        .unwrap()];
        let err = SaleTotals::compute(&lines, 0, 801).unwrap_err();
        assert!(matches!(err, CoreError::NegativeTotal { .. }));
    }

    #[test]
    fn test_amounts_past_i64_are_rejected() {
        let p = product(10);

        let huge_line = SaleLineRequest::new(p.id.clone(), 2).unit_price(i64::MAX / 2 + 1);
        assert!(sale(vec![huge_line.clone()]).validate().is_ok());
        let err = PricedLine::price(&huge_line, &p, SaleType::Retail).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { ref field, .. }) if field == "line_total"
        ));

        // Largest line that still fits
        let edge = PricedLine::price(
            &SaleLineRequest::new(p.id.clone(), 1).unit_price(i64::MAX),
            &p,
            SaleType::Retail,
        )
        .unwrap();
        assert_eq!(edge.total_price.cents(), i64::MAX);

        let exact = SaleTotals::compute(std::slice::from_ref(&edge), 0, 0).unwrap();
        assert_eq!(exact.total.cents(), i64::MAX);

        let tax = SaleTotals::compute(std::slice::from_ref(&edge), 1, 0).unwrap_err();
        assert!(matches!(
            tax,
            CoreError::Validation(ValidationError::OutOfRange { ref field, .. }) if field == "total"
        ));

        let two = [edge.clone(), edge];
        let subtotal = SaleTotals::compute(&two, 0, 0).unwrap_err();
        assert_eq!(subtotal.kind(), crate::ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_payment_method_default() {
        let s = sale(vec![SaleLineRequest::new("p", 1)]);
        assert_eq!(s.resolved_payment_method(), "cash");
        assert_eq!(s.clone().payment_method("card").resolved_payment_method(), "card");
        assert_eq!(s.payment_method(" ").resolved_payment_method(), "cash");
    }
}
