//! # Batch Repository

use sqlx::{SqliteExecutor, SqlitePool};

use crate::error::DbResult;
use tally_core::Batch;

const BATCH_COLUMNS: &str =
    "id, product_id, initial_quantity, available_quantity, unit_cost_cents, created_at, updated_at";

/// Repository for received batches.
#[derive(Debug, Clone)]
pub struct BatchRepository {
    pool: SqlitePool,
}

impl BatchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BatchRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Batch>> {
        let sql = format!("SELECT {} FROM batches WHERE id = ?1", BATCH_COLUMNS);
        let batch = sqlx::query_as::<_, Batch>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(batch)
    }

    /// A product's batches, oldest first.
    pub async fn for_product(&self, product_id: &str) -> DbResult<Vec<Batch>> {
        let sql = format!(
            "SELECT {} FROM batches WHERE product_id = ?1 ORDER BY created_at ASC, rowid ASC",
            BATCH_COLUMNS
        );
        let batches = sqlx::query_as::<_, Batch>(&sql)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(batches)
    }

    pub async fn insert<'e, E>(executor: E, batch: &Batch) -> DbResult<()>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query(
            r#"
            INSERT INTO batches (
                id, product_id, initial_quantity, available_quantity,
                unit_cost_cents, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&batch.id)
        .bind(&batch.product_id)
        .bind(batch.initial_quantity)
        .bind(batch.available_quantity)
        .bind(batch.unit_cost_cents)
        .bind(batch.created_at)
        .bind(batch.updated_at)
        .execute(executor)
        .await?;
        Ok(())
    }
}
