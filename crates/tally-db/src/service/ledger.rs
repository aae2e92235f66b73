//! # Stock Ledger
//!
//! The one way stock changes. Every caller (single movements, sales,
//! cancellations, batch receipts) hands a [`NewMovement`] to
//! [`StockLedger::record`] on its own open transaction.
//!
//! ## Recording a Movement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. validate request                     → InvalidArgument             │
//! │  2. UPDATE products stock ± qty          (decrease: only if stock≥qty) │
//! │       RETURNING stock                                                  │
//! │         │                                                              │
//! │         ├── no row → SELECT stock                                      │
//! │         │     ├── no product       → ProductNotFound                   │
//! │         │     └── stock < qty      → InsufficientStock{available}      │
//! │         ▼                                                              │
//! │  3. previous = current ∓ qty                                           │
//! │  4. INSERT stock_movements (previous, current)                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The UPDATE takes SQLite's write lock, so from step 2 until the caller
//! commits no other writer can touch the product. `previous` and `current`
//! therefore describe exactly this movement.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::{debug, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::repository::movement::StockMovementRepository;
use crate::repository::product::ProductRepository;
use tally_core::{CoreError, NewMovement, StockDirection, StockMovement};

/// Appends ledger entries and keeps the stock projection in step.
#[derive(Debug, Clone, Copy, Default)]
pub struct StockLedger;

impl StockLedger {
    /// Applies one movement inside the caller's transaction.
    ///
    /// On error nothing has been written by this call; the caller's
    /// transaction is still usable but is normally dropped.
    pub async fn record(
        conn: &mut SqliteConnection,
        request: NewMovement,
    ) -> ServiceResult<StockMovement> {
        request.validate()?;

        let now = Utc::now();
        let direction = request.kind.direction();

        let level = match direction {
            StockDirection::Increase => {
                ProductRepository::increase_stock(
                    &mut *conn,
                    &request.product_id,
                    request.quantity,
                    now,
                )
                .await?
            }
            StockDirection::Decrease => {
                ProductRepository::decrease_stock(
                    &mut *conn,
                    &request.product_id,
                    request.quantity,
                    now,
                )
                .await?
            }
        };

        let Some(level) = level else {
            return Err(Self::rejection(conn, &request).await);
        };

        let previous = direction.revert(level.stock, request.quantity);
        let movement = request.into_movement(previous, level.stock);
        StockMovementRepository::insert(&mut *conn, &movement).await?;

        debug!(
            product_id = %movement.product_id,
            kind = movement.kind.as_str(),
            quantity = movement.quantity,
            previous = movement.previous_stock,
            current = movement.current_stock,
            "Stock movement recorded"
        );

        if direction == StockDirection::Decrease && level.is_low() {
            warn!(
                product_id = %movement.product_id,
                stock = level.stock,
                min_stock = level.min_stock,
                "Product at or below minimum stock"
            );
        }

        Ok(movement)
    }

    /// Explains why the projection write matched no row.
    async fn rejection(conn: &mut SqliteConnection, request: &NewMovement) -> ServiceError {
        match ProductRepository::current_stock(&mut *conn, &request.product_id).await {
            Ok(None) => CoreError::ProductNotFound(request.product_id.clone()).into(),
            Ok(Some(available)) => {
                debug!(
                    product_id = %request.product_id,
                    available,
                    requested = request.quantity,
                    "Decrease refused"
                );
                CoreError::InsufficientStock {
                    product_id: request.product_id.clone(),
                    available,
                    requested: request.quantity,
                }
                .into()
            }
            Err(e) => e.into(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
