//! # Sale Repository
//!
//! Database operations for sale headers and their line snapshots.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE (one transaction, SaleService::create_sale)                 │
//! │     └── insert_sale()  → Sale { status: Completed }                    │
//! │     └── insert_item()  → SaleItem (price/cost snapshot)                │
//! │     └── insert_item()  → ...                                           │
//! │                                                                         │
//! │  2. CANCEL (one transaction, SaleService::cancel_sale)                 │
//! │     └── mark_cancelled() → Sale { status: Cancelled }                  │
//! │         guarded on status, so only one canceller wins                  │
//! │                                                                         │
//! │  Items are never edited after insert.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteExecutor, SqlitePool};

use crate::error::DbResult;
use crate::repository::offset_or_zero;
use tally_core::sale::SaleFilter;
use tally_core::{Page, ProductSummary, Sale, SaleItem, SaleLine};

const SALE_COLUMNS: &str = "id, date, user_id, client_name, client_document, client_phone, \
     client_email, subtotal_cents, tax_cents, discount_cents, total_cents, notes, status, \
     sale_type, document_number, payment_method, created_at, updated_at";

/// Item row joined with its product, if the product still exists.
#[derive(Debug, sqlx::FromRow)]
struct SaleLineRow {
    #[sqlx(flatten)]
    item: SaleItem,
    product_sku: Option<String>,
    product_name: Option<String>,
}

impl From<SaleLineRow> for SaleLine {
    fn from(row: SaleLineRow) -> Self {
        let product = match (row.product_sku, row.product_name) {
            (Some(sku), Some(name)) => Some(ProductSummary {
                id: row.item.product_id.clone(),
                sku,
                name,
            }),
            _ => None,
        };
        SaleLine {
            item: row.item,
            product,
        }
    }
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale header by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        Self::find_by_id(&self.pool, id).await
    }

    /// Lists sale headers matching `filter`, most recent first.
    pub async fn list(&self, filter: &SaleFilter, limit: u32) -> DbResult<Page<Sale>> {
        let offset = offset_or_zero(filter.offset);

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM sales");
        push_filter(&mut count, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM sales", SALE_COLUMNS));
        push_filter(&mut query, filter);
        query
            .push(" ORDER BY date DESC, rowid DESC LIMIT ")
            .push_bind(limit as i64)
            .push(" OFFSET ")
            .push_bind(offset as i64);

        let items = query.build_query_as::<Sale>().fetch_all(&self.pool).await?;

        Ok(Page {
            items,
            total,
            limit,
            offset,
        })
    }

    /// Items of a sale with their products attached, in insertion order.
    pub async fn lines(&self, sale_id: &str) -> DbResult<Vec<SaleLine>> {
        let rows = sqlx::query_as::<_, SaleLineRow>(
            r#"
            SELECT
                i.id, i.sale_id, i.product_id, i.quantity,
                i.unit_price_cents, i.unit_cost_cents, i.discount_bps,
                i.total_price_cents, i.created_at,
                p.sku  AS product_sku,
                p.name AS product_name
            FROM sale_items i
            LEFT JOIN products p ON p.id = i.product_id
            WHERE i.sale_id = ?1
            ORDER BY i.rowid ASC
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SaleLine::from).collect())
    }

    // =========================================================================
    // Executor-generic operations
    // =========================================================================

    pub async fn find_by_id<'e, E>(executor: E, id: &str) -> DbResult<Option<Sale>>
    where
        E: SqliteExecutor<'e>,
    {
        let sql = format!("SELECT {} FROM sales WHERE id = ?1", SALE_COLUMNS);
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(sale)
    }

    pub async fn items<'e, E>(executor: E, sale_id: &str) -> DbResult<Vec<SaleItem>>
    where
        E: SqliteExecutor<'e>,
    {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT id, sale_id, product_id, quantity, unit_price_cents, unit_cost_cents,
                   discount_bps, total_price_cents, created_at
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY rowid ASC
            "#,
        )
        .bind(sale_id)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    pub async fn insert_sale<'e, E>(executor: E, sale: &Sale) -> DbResult<()>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query(
            r#"
            INSERT INTO sales (
                id, date, user_id, client_name, client_document, client_phone, client_email,
                subtotal_cents, tax_cents, discount_cents, total_cents, notes,
                status, sale_type, document_number, payment_method, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
            "#,
        )
        .bind(&sale.id)
        .bind(sale.date)
        .bind(&sale.user_id)
        .bind(&sale.client_name)
        .bind(&sale.client_document)
        .bind(&sale.client_phone)
        .bind(&sale.client_email)
        .bind(sale.subtotal_cents)
        .bind(sale.tax_cents)
        .bind(sale.discount_cents)
        .bind(sale.total_cents)
        .bind(&sale.notes)
        .bind(sale.status)
        .bind(sale.sale_type)
        .bind(&sale.document_number)
        .bind(&sale.payment_method)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn insert_item<'e, E>(executor: E, item: &SaleItem) -> DbResult<()>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query(
            r#"
            INSERT INTO sale_items (
                id, sale_id, product_id, quantity, unit_price_cents, unit_cost_cents,
                discount_bps, total_price_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&item.id)
        .bind(&item.sale_id)
        .bind(&item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.unit_cost_cents)
        .bind(item.discount_bps)
        .bind(item.total_price_cents)
        .bind(item.created_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Moves a sale to `cancelled` unless it already is.
    ///
    /// Returns `false` when no row changed (missing or already cancelled).
    pub async fn mark_cancelled<'e, E>(executor: E, id: &str, now: DateTime<Utc>) -> DbResult<bool>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE sales SET status = 'cancelled', updated_at = ?1 \
             WHERE id = ?2 AND status != 'cancelled'",
        )
        .bind(now)
        .bind(id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &SaleFilter) {
    builder.push(" WHERE 1 = 1");

    if let Some(user_id) = &filter.user_id {
        builder.push(" AND user_id = ").push_bind(user_id.clone());
    }
    if let Some(name) = filter.client_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        // SQLite LIKE is case-insensitive for ASCII
        builder
            .push(" AND client_name LIKE ")
            .push_bind(format!("%{}%", name));
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(sale_type) = filter.sale_type {
        builder.push(" AND sale_type = ").push_bind(sale_type);
    }
    if let Some(start) = filter.start {
        builder.push(" AND date >= ").push_bind(start);
    }
    if let Some(end) = filter.end {
        builder.push(" AND date <= ").push_bind(end);
    }
}
