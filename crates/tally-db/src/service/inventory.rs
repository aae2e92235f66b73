//! # Inventory Service
//!
//! Single-movement stock operations, ledger queries and the
//! rebuild-from-ledger audit.
//!
//! ## Operation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  register_input / register_output / register_movement(kind, ..)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StockRequest → NewMovement (kind's default reason unless overridden)  │
//! │       │   validate                       → InvalidArgument             │
//! │       ▼                                                                 │
//! │  BEGIN                                                                 │
//! │    StockLedger::record                   → NotFound / InsufficientStock│
//! │  COMMIT                                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  MovementReceipt { movement, stock }                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::ServiceResult;
use crate::repository::movement::StockMovementRepository;
use crate::repository::product::ProductRepository;
use crate::service::ledger::StockLedger;
use tally_core::ledger::{replay, StockReconciliation};
use tally_core::movement::MovementFilter;
use tally_core::validation::{validate_page_limit, validate_required};
use tally_core::{CoreError, MovementKind, MovementReason, NewMovement, Page, StockMovement};

// =============================================================================
// Requests & Results
// =============================================================================

/// Caller-supplied part of a single stock movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRequest {
    pub product_id: String,
    pub user_id: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
    /// Overrides the kind's default reason.
    pub reason: Option<MovementReason>,
    pub notes: Option<String>,
    pub document_reference: Option<String>,
    pub reference_id: Option<String>,
    pub location_id: Option<String>,
}

impl StockRequest {
    pub fn new(
        product_id: impl Into<String>,
        user_id: impl Into<String>,
        quantity: i64,
        unit_cost_cents: i64,
    ) -> Self {
        StockRequest {
            product_id: product_id.into(),
            user_id: user_id.into(),
            quantity,
            unit_cost_cents,
            reason: None,
            notes: None,
            document_reference: None,
            reference_id: None,
            location_id: None,
        }
    }

    pub fn reason(mut self, reason: MovementReason) -> Self {
        self.reason = Some(reason);
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

    pub fn location(mut self, location_id: impl Into<String>) -> Self {
        self.location_id = Some(location_id.into());
        self
    }

    fn into_movement(self, kind: MovementKind) -> NewMovement {
        NewMovement {
            reason: self.reason.unwrap_or_else(|| kind.default_reason()),
            product_id: self.product_id,
            user_id: self.user_id,
            kind,
            quantity: self.quantity,
            unit_cost_cents: self.unit_cost_cents,
            notes: self.notes,
            document_reference: self.document_reference,
            reference_id: self.reference_id,
            location_id: self.location_id,
        }
    }
}

/// The created ledger entry and the product's stock after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovementReceipt {
    pub movement: StockMovement,
    pub stock: i64,
}

/// A product's current stock with one page of its ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductMovements {
    pub product_id: String,
    pub current_stock: i64,
    pub movements: Page<StockMovement>,
}

// =============================================================================
// Service
// =============================================================================

/// Single-movement stock operations.
#[derive(Debug, Clone)]
pub struct InventoryService {
    pool: SqlitePool,
}

impl InventoryService {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryService { pool }
    }

    /// Receives stock. Default reason `purchase`.
    pub async fn register_input(&self, request: StockRequest) -> ServiceResult<MovementReceipt> {
        self.register_movement(MovementKind::Input, request).await
    }

    /// Takes stock out. Default reason `sale`.
    ///
    /// ## Returns
    /// * `Err(CoreError::InsufficientStock)` - stock below the quantity;
    ///   nothing written
    pub async fn register_output(&self, request: StockRequest) -> ServiceResult<MovementReceipt> {
        self.register_movement(MovementKind::Output, request).await
    }

    /// Records one movement of any kind in its own transaction.
    pub async fn register_movement(
        &self,
        kind: MovementKind,
        request: StockRequest,
    ) -> ServiceResult<MovementReceipt> {
        let request = request.into_movement(kind);
        request.validate()?;

        let mut tx = self.pool.begin().await?;
        let movement = StockLedger::record(&mut tx, request).await?;
        tx.commit().await?;

        info!(
            movement_id = %movement.id,
            product_id = %movement.product_id,
            kind = kind.as_str(),
            quantity = movement.quantity,
            stock = movement.current_stock,
            "Stock movement committed"
        );

        Ok(MovementReceipt {
            stock: movement.current_stock,
            movement,
        })
    }

    /// Lists ledger entries, newest first.
    pub async fn movements(&self, filter: MovementFilter) -> ServiceResult<Page<StockMovement>> {
        let limit = validate_page_limit(filter.limit)?;
        let page = StockMovementRepository::new(self.pool.clone())
            .list(&filter, limit)
            .await?;
        Ok(page)
    }

    /// A product's current stock and one page of its ledger.
    pub async fn product_movements(
        &self,
        product_id: &str,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> ServiceResult<ProductMovements> {
        validate_required("product_id", product_id)?;

        let current_stock = ProductRepository::current_stock(&self.pool, product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        let movements = self
            .movements(MovementFilter {
                product_id: Some(product_id.to_string()),
                limit,
                offset,
                ..Default::default()
            })
            .await?;

        Ok(ProductMovements {
            product_id: product_id.to_string(),
            current_stock,
            movements,
        })
    }

    /// Replays a product's ledger against its stock projection.
    ///
    /// Both are read inside one transaction so they describe the same
    /// instant.
    pub async fn reconcile(&self, product_id: &str) -> ServiceResult<StockReconciliation> {
        validate_required("product_id", product_id)?;

        let mut tx = self.pool.begin().await?;
        let projected = ProductRepository::current_stock(&mut *tx, product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;
        let ledger = StockMovementRepository::for_product_in_order(&mut *tx, product_id).await?;
        tx.commit().await?;

        let report = replay(product_id, projected, &ledger);
        if !report.is_consistent() {
            warn!(
                product_id = %product_id,
                projected = report.projected_stock,
                ledger = report.ledger_stock,
                chain_breaks = report.chain_breaks,
                "Stock projection disagrees with ledger"
            );
        }
        Ok(report)
    }

    /// Reconciles every product and returns the inconsistent ones.
    pub async fn reconcile_all(&self) -> ServiceResult<Vec<StockReconciliation>> {
        let ids = ProductRepository::new(self.pool.clone()).list_ids().await?;

        let mut drifted = Vec::new();
        for id in &ids {
            let report = self.reconcile(id).await?;
            if !report.is_consistent() {
                drifted.push(report);
            }
        }

        info!(
            products = ids.len(),
            inconsistent = drifted.len(),
            "Ledger audit finished"
        );
        Ok(drifted)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
