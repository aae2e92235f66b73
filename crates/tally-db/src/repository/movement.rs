//! # Stock Movement Repository
//!
//! The ledger table is append-only: this repository has an insert and
//! reads, and the schema's triggers reject anything else.
//!
//! Rows are replayed in `rowid` order, which is insertion order. Listings
//! sort newest first by `created_at`.

use sqlx::{QueryBuilder, Sqlite, SqliteExecutor, SqlitePool};

use crate::error::DbResult;
use crate::repository::offset_or_zero;
use tally_core::movement::MovementFilter;
use tally_core::{Page, StockMovement};

const MOVEMENT_COLUMNS: &str = "id, product_id, quantity, kind, reason, unit_cost_cents, \
     total_cost_cents, notes, document_reference, reference_id, previous_stock, \
     current_stock, location_id, user_id, created_at";

/// Repository for ledger entries.
#[derive(Debug, Clone)]
pub struct StockMovementRepository {
    pool: SqlitePool,
}

impl StockMovementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StockMovementRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<StockMovement>> {
        let sql = format!("SELECT {} FROM stock_movements WHERE id = ?1", MOVEMENT_COLUMNS);
        let movement = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(movement)
    }

    /// Lists entries matching `filter`, newest first.
    ///
    /// `limit` has already been resolved against the page bounds.
    pub async fn list(&self, filter: &MovementFilter, limit: u32) -> DbResult<Page<StockMovement>> {
        let offset = offset_or_zero(filter.offset);

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM stock_movements");
        push_filter(&mut count, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM stock_movements",
            MOVEMENT_COLUMNS
        ));
        push_filter(&mut query, filter);
        query
            .push(" ORDER BY created_at DESC, rowid DESC LIMIT ")
            .push_bind(limit as i64)
            .push(" OFFSET ")
            .push_bind(offset as i64);

        let items = query
            .build_query_as::<StockMovement>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items,
            total,
            limit,
            offset,
        })
    }

    /// Entries caused by one sale or batch, in insertion order.
    pub async fn by_reference(&self, reference_id: &str) -> DbResult<Vec<StockMovement>> {
        let sql = format!(
            "SELECT {} FROM stock_movements WHERE reference_id = ?1 ORDER BY rowid ASC",
            MOVEMENT_COLUMNS
        );
        let movements = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(reference_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(movements)
    }

    // =========================================================================
    // Executor-generic operations
    // =========================================================================

    /// Appends one entry.
    pub async fn insert<'e, E>(executor: E, movement: &StockMovement) -> DbResult<()>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query(
            r#"
            INSERT INTO stock_movements (
                id, product_id, quantity, kind, reason,
                unit_cost_cents, total_cost_cents, notes, document_reference, reference_id,
                previous_stock, current_stock, location_id, user_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.product_id)
        .bind(movement.quantity)
        .bind(movement.kind)
        .bind(movement.reason)
        .bind(movement.unit_cost_cents)
        .bind(movement.total_cost_cents)
        .bind(&movement.notes)
        .bind(&movement.document_reference)
        .bind(&movement.reference_id)
        .bind(movement.previous_stock)
        .bind(movement.current_stock)
        .bind(&movement.location_id)
        .bind(&movement.user_id)
        .bind(movement.created_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// A product's whole ledger in insertion order, for replay.
    pub async fn for_product_in_order<'e, E>(
        executor: E,
        product_id: &str,
    ) -> DbResult<Vec<StockMovement>>
    where
        E: SqliteExecutor<'e>,
    {
        let sql = format!(
            "SELECT {} FROM stock_movements WHERE product_id = ?1 ORDER BY rowid ASC",
            MOVEMENT_COLUMNS
        );
        let movements = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(product_id)
            .fetch_all(executor)
            .await?;
        Ok(movements)
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &MovementFilter) {
    builder.push(" WHERE 1 = 1");

    if let Some(product_id) = &filter.product_id {
        builder.push(" AND product_id = ").push_bind(product_id.clone());
    }
    if let Some(kind) = filter.kind {
        builder.push(" AND kind = ").push_bind(kind);
    }
    if let Some(reason) = filter.reason {
        builder.push(" AND reason = ").push_bind(reason);
    }
    if let Some(reference_id) = &filter.reference_id {
        builder.push(" AND reference_id = ").push_bind(reference_id.clone());
    }
    if let Some(start) = filter.start {
        builder.push(" AND created_at >= ").push_bind(start);
    }
    if let Some(end) = filter.end {
        builder.push(" AND created_at <= ").push_bind(end);
    }
}
