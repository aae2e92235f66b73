//! # Product Repository
//!
//! Reads of the product record and the two projection writes the engine
//! owns: the stock counter and the mirrored price fields.
//!
//! ## Conditional Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UPDATE products                                                        │
//! │     SET stock = stock - :qty                                           │
//! │   WHERE id = :id AND stock >= :qty                                     │
//! │  RETURNING stock, min_stock                                            │
//! │                                                                         │
//! │  1 row  → decrement applied, new level returned                        │
//! │  0 rows → product missing OR stock < qty; nothing written              │
//! │                                                                         │
//! │  The check and the write are one statement, so two concurrent sales    │
//! │  can never both pass the check against the same units.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Functions taking an executor run on whatever they are handed: the pool
//! for standalone reads, `&mut *tx` inside a service transaction.

use chrono::{DateTime, Utc};
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tally_core::{PriceKind, Product, ProductSummary};

const PRODUCT_COLUMNS: &str = "id, sku, name, stock, min_stock, cost_cents, retail_price_cents, \
     wholesale_price_cents, is_active, created_at, updated_at";

/// Stock level returned by a projection write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct StockLevel {
    pub stock: i64,
    pub min_stock: i64,
}

impl StockLevel {
    #[inline]
    pub fn is_low(&self) -> bool {
        self.stock <= self.min_stock
    }
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        Self::find_by_id(&self.pool, id).await
    }

    /// Gets a product by its SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE sku = ?1", PRODUCT_COLUMNS);
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(sku)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Active products at or below their minimum stock, lowest first.
    pub async fn list_low_stock(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products \
             WHERE is_active = 1 AND stock <= min_stock \
             ORDER BY stock ASC, name ASC LIMIT ?1",
            PRODUCT_COLUMNS
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    /// Ids of every product, for whole-ledger audits.
    pub async fn list_ids(&self) -> DbResult<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>("SELECT id FROM products ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    /// Inserts a new product.
    ///
    /// Stock always starts at zero; opening stock is recorded as an
    /// `initial` input movement so the projection stays reconstructible.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, stock, min_stock,
                cost_cents, retail_price_cents, wholesale_price_cents,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, 0, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.min_stock)
        .bind(product.cost_cents)
        .bind(product.retail_price_cents)
        .bind(product.wholesale_price_cents)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        self.get_by_id(&product.id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &product.id))
    }

    /// Activates or deactivates (soft-deletes) a product.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE products SET is_active = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(active)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        debug!(id = %id, active, "Product activation changed");
        Ok(())
    }

    // =========================================================================
    // Executor-generic operations (usable inside a transaction)
    // =========================================================================

    pub async fn find_by_id<'e, E>(executor: E, id: &str) -> DbResult<Option<Product>>
    where
        E: SqliteExecutor<'e>,
    {
        let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(product)
    }

    pub async fn find_summary<'e, E>(executor: E, id: &str) -> DbResult<Option<ProductSummary>>
    where
        E: SqliteExecutor<'e>,
    {
        let summary = sqlx::query_as::<_, ProductSummary>(
            "SELECT id, sku, name FROM products WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(summary)
    }

    /// Reads only the stock counter.
    pub async fn current_stock<'e, E>(executor: E, id: &str) -> DbResult<Option<i64>>
    where
        E: SqliteExecutor<'e>,
    {
        let stock = sqlx::query_scalar::<_, i64>("SELECT stock FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(stock)
    }

    /// Adds `quantity` to the stock counter.
    ///
    /// Returns `None` when the product does not exist.
    pub async fn increase_stock<'e, E>(
        executor: E,
        id: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> DbResult<Option<StockLevel>>
    where
        E: SqliteExecutor<'e>,
    {
        let level = sqlx::query_as::<_, StockLevel>(
            r#"
            UPDATE products
               SET stock = stock + ?1, updated_at = ?2
             WHERE id = ?3
            RETURNING stock, min_stock
            "#,
        )
        .bind(quantity)
        .bind(now)
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(level)
    }

    /// Takes `quantity` from the stock counter if at least that much is on
    /// hand.
    ///
    /// Returns `None` when nothing was written: the product is missing or
    /// its stock is below `quantity`.
    pub async fn decrease_stock<'e, E>(
        executor: E,
        id: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> DbResult<Option<StockLevel>>
    where
        E: SqliteExecutor<'e>,
    {
        let level = sqlx::query_as::<_, StockLevel>(
            r#"
            UPDATE products
               SET stock = stock - ?1, updated_at = ?2
             WHERE id = ?3 AND stock >= ?1
            RETURNING stock, min_stock
            "#,
        )
        .bind(quantity)
        .bind(now)
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(level)
    }

    /// Mirrors an active price into the matching product field.
    pub async fn set_price<'e, E>(
        executor: E,
        id: &str,
        kind: PriceKind,
        value_cents: i64,
        now: DateTime<Utc>,
    ) -> DbResult<()>
    where
        E: SqliteExecutor<'e>,
    {
        let sql = format!(
            "UPDATE products SET {} = ?1, updated_at = ?2 WHERE id = ?3",
            kind.product_column()
        );
        let result = sqlx::query(&sql)
            .bind(value_cents)
            .bind(now)
            .bind(id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    async fn db_with_product() -> (Database, Product) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .insert(&Product::new("RICE-5KG", "Rice 5kg").with_min_stock(2))
            .await
            .unwrap();
        (db, product)
    }

    #[tokio::test]
    async fn test_insert_forces_zero_stock() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut product = Product::new("OIL-1L", "Oil 1L");
        product.stock = 40;

        let stored = db.products().insert(&product).await.unwrap();
        assert_eq!(stored.stock, 0);
        assert_eq!(stored.sku, "OIL-1L");

        let by_sku = db.products().get_by_sku("OIL-1L").await.unwrap().unwrap();
        assert_eq!(by_sku.id, product.id);
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected() {
        let (db, _) = db_with_product().await;
        let err = db
            .products()
            .insert(&Product::new("RICE-5KG", "Other rice"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_conditional_decrement() {
        let (db, product) = db_with_product().await;
        let pool = db.pool();

        let up = ProductRepository::increase_stock(pool, &product.id, 5, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(up.stock, 5);

        let down = ProductRepository::decrease_stock(pool, &product.id, 3, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(down.stock, 2);
        assert!(down.is_low());

        // Not enough: nothing written
        let refused = ProductRepository::decrease_stock(pool, &product.id, 3, Utc::now())
            .await
            .unwrap();
        assert!(refused.is_none());
        assert_eq!(
            ProductRepository::current_stock(pool, &product.id).await.unwrap(),
            Some(2)
        );

        // Missing product
        assert!(ProductRepository::decrease_stock(pool, "missing", 1, Utc::now())
            .await
            .unwrap()
            .is_none());
        assert!(ProductRepository::increase_stock(pool, "missing", 1, Utc::now())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_set_price_targets_matching_column() {
        let (db, product) = db_with_product().await;
        let pool = db.pool();

        ProductRepository::set_price(pool, &product.id, PriceKind::Wholesale, 650, Utc::now())
            .await
            .unwrap();
        ProductRepository::set_price(pool, &product.id, PriceKind::Cost, 500, Utc::now())
            .await
            .unwrap();

        let stored = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.wholesale_price_cents, 650);
        assert_eq!(stored.cost_cents, 500);
        assert_eq!(stored.retail_price_cents, 0);

        let err = ProductRepository::set_price(pool, "missing", PriceKind::Retail, 1, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_low_stock_listing_and_deactivation() {
        let (db, product) = db_with_product().await;

        let low = db.products().list_low_stock(10).await.unwrap();
        assert_eq!(low.len(), 1);

        db.products().set_active(&product.id, false).await.unwrap();
        assert!(db.products().list_low_stock(10).await.unwrap().is_empty());

        let stored = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert!(!stored.is_active);

        assert!(db.products().set_active("missing", true).await.is_err());
    }
}
