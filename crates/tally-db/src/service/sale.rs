//! # Sale Transaction Engine
//!
//! Multi-line sales and their cancellation, each as one transaction.
//!
//! ## create_sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate request                        → InvalidArgument             │
//! │  BEGIN IMMEDIATE                                                       │
//! │  ├── load every product (in line order)  → NotFound on first unknown   │
//! │  ├── check every line against stock      → collect ALL shortages       │
//! │  │      shortages? ─────────────────────→ InsufficientStock(report)    │
//! │  ├── price lines, compute totals         → InvalidArgument if total<0  │
//! │  ├── INSERT sale (completed)                                           │
//! │  ├── per line: INSERT sale_item                                        │
//! │  │             StockLedger::record(output, reason sale, ref sale id)   │
//! │  │               conditional decrement; a refusal here (concurrent     │
//! │  │               sale, or repeated product) → InsufficientStock(report)│
//! │  COMMIT                                                                │
//! │  └── read back with items, products and user                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The up-front check produces the full insufficiency report; the
//! conditional decrement is what actually guarantees stock never goes
//! negative under concurrent writers.
//!
//! ## cancel_sale
//! ```text
//! completed ──► cancelled   status guarded in the UPDATE; a second cancel
//!                           fails with Conflict
//! per item: StockLedger::record(input, reason return, ref sale id)
//! inactive or missing product → Conflict; everything rolls back
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::repository::product::ProductRepository;
use crate::repository::sale::SaleRepository;
use crate::repository::user::UserRepository;
use crate::service::ledger::StockLedger;
use crate::service::BEGIN_IMMEDIATE;
use tally_core::sale::{PricedLine, SaleFilter, SaleTotals};
use tally_core::validation::{validate_page_limit, validate_required};
use tally_core::{
    CoreError, MovementKind, MovementReason, NewMovement, NewSale, Page, Product, Sale,
    SaleDetails, SaleStatus, StockShortage,
};

/// The sale transaction engine.
#[derive(Debug, Clone)]
pub struct SaleService {
    pool: SqlitePool,
}

impl SaleService {
    pub fn new(pool: SqlitePool) -> Self {
        SaleService { pool }
    }

    /// Records a completed sale, its line snapshots and one output movement
    /// per line.
    ///
    /// ## Returns
    /// * `Err(CoreError::ProductNotFound)` - first unknown product; nothing written
    /// * `Err(CoreError::InsufficientStockForSale)` - every short line; nothing written
    /// * `Err(CoreError::NegativeTotal)` - discount exceeds subtotal plus tax
    pub async fn create_sale(&self, request: NewSale) -> ServiceResult<SaleDetails> {
        request.validate()?;

        let mut tx = self.pool.begin_with(BEGIN_IMMEDIATE).await?;

        let mut products: Vec<Product> = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let product = ProductRepository::find_by_id(&mut *tx, &line.product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;
            products.push(product);
        }

        let shortages: Vec<StockShortage> = request
            .items
            .iter()
            .zip(&products)
            .filter_map(|(line, product)| StockShortage::check(line, product))
            .collect();

        if !shortages.is_empty() {
            warn!(lines = shortages.len(), "Sale refused: insufficient stock");
            return Err(CoreError::InsufficientStockForSale(shortages).into());
        }

        let priced: Vec<PricedLine> = request
            .items
            .iter()
            .zip(&products)
            .map(|(line, product)| PricedLine::price(line, product, request.sale_type))
            .collect::<Result<_, _>>()?;
        let totals = SaleTotals::compute(&priced, request.tax_cents, request.discount_cents)?;

        let now = Utc::now();
        let sale = Sale {
            id: uuid::Uuid::new_v4().to_string(),
            date: now,
            user_id: request.user_id.clone(),
            client_name: request.client.name.trim().to_string(),
            client_document: request.client.document.clone(),
            client_phone: request.client.phone.clone(),
            client_email: request.client.email.clone(),
            subtotal_cents: totals.subtotal.cents(),
            tax_cents: totals.tax.cents(),
            discount_cents: totals.discount.cents(),
            total_cents: totals.total.cents(),
            notes: request.notes.clone(),
            status: SaleStatus::Completed,
            sale_type: request.sale_type,
            document_number: request.document_number.clone(),
            payment_method: request.resolved_payment_method(),
            created_at: now,
            updated_at: now,
        };

        SaleRepository::insert_sale(&mut *tx, &sale).await?;

        for line in &priced {
            SaleRepository::insert_item(&mut *tx, &line.to_item(&sale.id, now)).await?;

            let movement = NewMovement::new(
                &line.product_id,
                &sale.user_id,
                MovementKind::Output,
                line.quantity,
                line.unit_cost.cents(),
            )
            .reason(MovementReason::Sale)
            .notes(format!("Sale #{}", sale.id))
            .document_reference(&sale.id)
            .reference_id(&sale.id);

            match StockLedger::record(&mut tx, movement).await {
                Ok(_) => {}
                Err(ServiceError::Core(CoreError::InsufficientStock {
                    product_id,
                    available,
                    requested,
                })) => {
                    warn!(
                        product_id = %product_id,
                        available,
                        requested,
                        "Sale refused at decrement"
                    );
                    return Err(CoreError::InsufficientStockForSale(vec![StockShortage {
                        product_id,
                        product_name: line.product_name.clone(),
                        requested,
                        available,
                    }])
                    .into());
                }
                Err(e) => return Err(e),
            }
        }

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            lines = priced.len(),
            total = %totals.total,
            sale_type = ?sale.sale_type,
            "Sale completed"
        );

        self.get_sale_by_id(&sale.id).await
    }

    /// Cancels a sale and returns every line's quantity to stock.
    ///
    /// Not idempotent: a second call fails with
    /// `CoreError::SaleAlreadyCancelled`.
    pub async fn cancel_sale(&self, sale_id: &str, user_id: &str) -> ServiceResult<SaleDetails> {
        validate_required("sale_id", sale_id)?;
        validate_required("user_id", user_id)?;

        let mut tx = self.pool.begin_with(BEGIN_IMMEDIATE).await?;

        let sale = SaleRepository::find_by_id(&mut *tx, sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;

        if !sale.status.is_cancellable() {
            return Err(CoreError::SaleAlreadyCancelled(sale_id.to_string()).into());
        }

        let now = Utc::now();
        if !SaleRepository::mark_cancelled(&mut *tx, sale_id, now).await? {
            return Err(CoreError::SaleAlreadyCancelled(sale_id.to_string()).into());
        }

        let items = SaleRepository::items(&mut *tx, sale_id).await?;
        for item in &items {
            let product = ProductRepository::find_by_id(&mut *tx, &item.product_id).await?;
            let reason = match &product {
                None => Some("product no longer exists"),
                Some(p) if !p.is_active => Some("product is inactive"),
                Some(_) => None,
            };
            if let Some(reason) = reason {
                warn!(sale_id = %sale_id, product_id = %item.product_id, reason, "Cancellation refused");
                return Err(CoreError::ProductUnavailable {
                    product_id: item.product_id.clone(),
                    reason: reason.to_string(),
                }
                .into());
            }

            let movement = NewMovement::new(
                &item.product_id,
                user_id,
                MovementKind::Input,
                item.quantity,
                item.unit_cost_cents,
            )
            .reason(MovementReason::Return)
            .notes(format!("Cancellation of sale #{}", sale_id))
            .document_reference(sale_id)
            .reference_id(sale_id);

            StockLedger::record(&mut tx, movement).await?;
        }

        tx.commit().await?;

        info!(sale_id = %sale_id, lines = items.len(), "Sale cancelled");

        self.get_sale_by_id(sale_id).await
    }

    /// A sale with its lines, their products and the acting user.
    ///
    /// Any id that names no sale, well-formed or not, is `SaleNotFound`.
    pub async fn get_sale_by_id(&self, sale_id: &str) -> ServiceResult<SaleDetails> {
        validate_required("sale_id", sale_id)?;

        let sale = SaleRepository::find_by_id(&self.pool, sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;

        self.details(sale).await
    }

    /// Lists sales, most recent first.
    pub async fn get_sales(&self, filter: SaleFilter) -> ServiceResult<Page<SaleDetails>> {
        let limit = validate_page_limit(filter.limit)?;
        let page = SaleRepository::new(self.pool.clone())
            .list(&filter, limit)
            .await?;

        debug!(total = page.total, returned = page.items.len(), "Sales listed");

        let mut items = Vec::with_capacity(page.items.len());
        for sale in page.items {
            items.push(self.details(sale).await?);
        }

        Ok(Page {
            items,
            total: page.total,
            limit: page.limit,
            offset: page.offset,
        })
    }

    async fn details(&self, sale: Sale) -> ServiceResult<SaleDetails> {
        let user = UserRepository::find_summary(&self.pool, &sale.user_id).await?;
        let lines = SaleRepository::new(self.pool.clone()).lines(&sale.id).await?;
        Ok(SaleDetails { sale, user, lines })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
