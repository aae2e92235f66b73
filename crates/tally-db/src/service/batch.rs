//! # Batch Service
//!
//! Receives stock as a batch: one `batches` row and one `input` movement
//! referencing it, committed together.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::ServiceResult;
use crate::repository::batch::BatchRepository;
use crate::service::ledger::StockLedger;
use tally_core::validation::validate_required;
use tally_core::{Batch, CoreError, MovementKind, MovementReason, NewMovement, StockMovement};

/// A request to receive a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBatch {
    pub product_id: String,
    pub user_id: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
    pub notes: Option<String>,
}

/// The stored batch and the movement that brought it into stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReceipt {
    pub batch: Batch,
    pub movement: StockMovement,
}

#[derive(Debug, Clone)]
pub struct BatchService {
    pool: SqlitePool,
}

impl BatchService {
    pub fn new(pool: SqlitePool) -> Self {
        BatchService { pool }
    }

    /// Records a batch and its `input`/`purchase` movement.
    pub async fn receive_batch(&self, request: NewBatch) -> ServiceResult<BatchReceipt> {
        let now = Utc::now();
        let batch = Batch {
            id: uuid::Uuid::new_v4().to_string(),
            product_id: request.product_id.clone(),
            initial_quantity: request.quantity,
            available_quantity: request.quantity,
            unit_cost_cents: request.unit_cost_cents,
            created_at: now,
            updated_at: now,
        };

        let mut movement = NewMovement::new(
            request.product_id,
            request.user_id,
            MovementKind::Input,
            request.quantity,
            request.unit_cost_cents,
        )
        .reason(MovementReason::Purchase)
        .document_reference(format!("batch:{}", batch.id))
        .reference_id(&batch.id);
        movement.notes = request.notes;
        movement.validate()?;

        let mut tx = self.pool.begin().await?;
        // Ledger first: it reports an unknown product as NotFound
        let movement = StockLedger::record(&mut tx, movement).await?;
        BatchRepository::insert(&mut *tx, &batch).await?;
        tx.commit().await?;

        info!(
            batch_id = %batch.id,
            product_id = %batch.product_id,
            quantity = batch.initial_quantity,
            value = %batch.received_value(),
            "Batch received"
        );

        Ok(BatchReceipt { batch, movement })
    }

    pub async fn get_batch(&self, batch_id: &str) -> ServiceResult<Batch> {
        validate_required("batch_id", batch_id)?;
        let batch = BatchRepository::new(self.pool.clone())
            .get_by_id(batch_id)
            .await?
            .ok_or_else(|| CoreError::BatchNotFound(batch_id.to_string()))?;
        Ok(batch)
    }

    /// A product's batches, oldest first.
    pub async fn product_batches(&self, product_id: &str) -> ServiceResult<Vec<Batch>> {
        validate_required("product_id", product_id)?;
        let batches = BatchRepository::new(self.pool.clone())
            .for_product(product_id)
            .await?;
        Ok(batches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_product, seed_user, test_db};
    use tally_core::ErrorKind;

    fn request(product_id: &str, user_id: &str, quantity: i64) -> NewBatch {
        NewBatch {
            product_id: product_id.to_string(),
            user_id: user_id.to_string(),
            quantity,
            unit_cost_cents: 450,
            notes: Some("Supplier delivery".to_string()),
        }
    }

    #[tokio::test]
    async fn test_receive_batch_records_input() {
        let db = test_db().await;
        let user = seed_user(&db).await;
        let product = seed_product(&db, &user.id, 4).await;

        let receipt = db
            .batches()
            .receive_batch(request(&product.id, &user.id, 12))
            .await
            .unwrap();

        assert_eq!(receipt.batch.initial_quantity, 12);
        assert_eq!(receipt.batch.available_quantity, 12);
        assert_eq!(receipt.batch.received_value().cents(), 5400);
        assert_eq!(receipt.movement.kind, MovementKind::Input);
        assert_eq!(receipt.movement.reason, MovementReason::Purchase);
        assert_eq!(receipt.movement.reference_id.as_deref(), Some(receipt.batch.id.as_str()));
        assert_eq!((receipt.movement.previous_stock, receipt.movement.current_stock), (4, 16));

        let stored = db.batches().get_batch(&receipt.batch.id).await.unwrap();
        assert_eq!(stored, receipt.batch);
        assert_eq!(db.batches().product_batches(&product.id).await.unwrap().len(), 1);

        assert!(db.inventory().reconcile(&product.id).await.unwrap().is_consistent());
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_nothing() {
        let db = test_db().await;
        let user = seed_user(&db).await;

        let missing = db
            .batches()
            .receive_batch(request("missing", &user.id, 3))
            .await
            .unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::NotFound);

        let product = seed_product(&db, &user.id, 0).await;
        let zero = db
            .batches()
            .receive_batch(request(&product.id, &user.id, 0))
            .await
            .unwrap_err();
        assert_eq!(zero.kind(), ErrorKind::InvalidArgument);
        assert!(db.batches().product_batches(&product.id).await.unwrap().is_empty());

        let unknown = db
            .batches()
            .get_batch(&uuid::Uuid::new_v4().to_string())
            .await
            .unwrap_err();
        assert_eq!(unknown.kind(), ErrorKind::NotFound);
    }
}
