//! # Price History Service
//!
//! ## Registering a Price Change
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate                                  → InvalidArgument           │
//! │  BEGIN IMMEDIATE                                                       │
//! │  ├── product exists?                       → NotFound                  │
//! │  ├── find open entry for (product, kind)                               │
//! │  ├── start < open.valid_from?              → Conflict                  │
//! │  ├── close open entry at start             (before the insert)         │
//! │  ├── insert new open entry [start, ∞)                                  │
//! │  └── mirror value into products.<kind column>                          │
//! │  COMMIT                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two concurrent changes for the same pair cannot both open an entry: the
//! loser either finds the entry already closed or trips the partial unique
//! index, and rolls back with `Conflict`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::ServiceResult;
use crate::repository::price::PriceHistoryRepository;
use crate::repository::product::ProductRepository;
use crate::service::BEGIN_IMMEDIATE;
use tally_core::price::{ensure_follows, CurrentPrices, PriceChange, PriceHistoryFilter};
use tally_core::validation::{validate_page_limit, validate_required};
use tally_core::{CoreError, Page, PriceHistoryEntry, PriceKind};

/// A product's mirrored prices with one page of its timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductPriceHistory {
    pub product_id: String,
    pub current_prices: CurrentPrices,
    pub history: Page<PriceHistoryEntry>,
}

/// Price timeline changes and queries.
#[derive(Debug, Clone)]
pub struct PriceHistoryService {
    pool: SqlitePool,
}

impl PriceHistoryService {
    pub fn new(pool: SqlitePool) -> Self {
        PriceHistoryService { pool }
    }

    /// Closes the active interval for (product, kind), opens a new one at
    /// `change.starts_at` (default now) and mirrors the value.
    ///
    /// ## Returns
    /// * `Err(CoreError::ProductNotFound)` - unknown product
    /// * `Err(CoreError::PriceTimelineConflict)` - start before the active
    ///   entry's start, or a concurrent change won
    pub async fn register_price_change(&self, change: PriceChange) -> ServiceResult<PriceHistoryEntry> {
        change.validate()?;

        let mut tx = self.pool.begin_with(BEGIN_IMMEDIATE).await?;

        // Taken under the write lock so default starts follow commit order
        let now = Utc::now();
        let start = change.starts_at.unwrap_or(now);

        if ProductRepository::find_summary(&mut *tx, &change.product_id)
            .await?
            .is_none()
        {
            return Err(CoreError::ProductNotFound(change.product_id.clone()).into());
        }

        let active = PriceHistoryRepository::find_open(&mut *tx, &change.product_id, change.kind).await?;
        ensure_follows(active.as_ref(), start)?;

        if let Some(active) = &active {
            if !PriceHistoryRepository::close(&mut *tx, &active.id, start).await? {
                return Err(CoreError::PriceTimelineConflict {
                    product_id: change.product_id.clone(),
                    kind: change.kind,
                    reason: "active entry was closed by another change".to_string(),
                }
                .into());
            }
        }

        let entry = PriceHistoryEntry {
            id: uuid::Uuid::new_v4().to_string(),
            product_id: change.product_id.clone(),
            price_kind: change.kind,
            value_cents: change.value_cents,
            valid_from: start,
            valid_to: None,
            user_id: change.user_id.clone(),
            created_at: now,
        };
        PriceHistoryRepository::insert(&mut *tx, &entry).await?;

        ProductRepository::set_price(
            &mut *tx,
            &change.product_id,
            change.kind,
            change.value_cents,
            now,
        )
        .await?;

        tx.commit().await?;

        info!(
            product_id = %entry.product_id,
            kind = %entry.price_kind,
            value = %entry.value(),
            closed = active.is_some(),
            "Price change registered"
        );

        Ok(entry)
    }

    /// Lists timeline entries, newest start first.
    pub async fn price_history(&self, filter: PriceHistoryFilter) -> ServiceResult<Page<PriceHistoryEntry>> {
        let limit = validate_page_limit(filter.limit)?;
        let page = PriceHistoryRepository::new(self.pool.clone())
            .list(&filter, limit)
            .await?;
        Ok(page)
    }

    /// A product's current prices with one page of its timeline,
    /// optionally for a single kind.
    pub async fn product_price_history(
        &self,
        product_id: &str,
        kind: Option<PriceKind>,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> ServiceResult<ProductPriceHistory> {
        validate_required("product_id", product_id)?;

        let product = ProductRepository::find_by_id(&self.pool, product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        let history = self
            .price_history(PriceHistoryFilter {
                product_id: Some(product_id.to_string()),
                kind,
                limit,
                offset,
                ..Default::default()
            })
            .await?;

        Ok(ProductPriceHistory {
            product_id: product.id.clone(),
            current_prices: CurrentPrices::from(&product),
            history,
        })
    }

    /// The entry in effect for (product, kind) at `at`.
    pub async fn price_at(
        &self,
        product_id: &str,
        kind: PriceKind,
        at: DateTime<Utc>,
    ) -> ServiceResult<Option<PriceHistoryEntry>> {
        validate_required("product_id", product_id)?;
        let entry = PriceHistoryRepository::new(self.pool.clone())
            .covering(product_id, kind, at)
            .await?;
        Ok(entry)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{drop_file_db, file_db, seed_product, seed_user, test_db, RETAIL_CENTS};
    use chrono::Duration;
    use tally_core::price::timeline_is_consistent;
    use tally_core::{ErrorKind, Product};

    #[tokio::test]
    async fn test_successive_changes_chain_intervals() {
        let db = test_db().await;
        let user = seed_user(&db).await;
        let product = db
            .products()
            .insert(&Product::new("COFFEE-250", "Coffee 250g"))
            .await
            .unwrap();

        let t1 = Utc::now();
        let t2 = t1 + Duration::hours(2);

        let first = db
            .prices()
            .register_price_change(
                PriceChange::new(&product.id, PriceKind::Retail, 900, &user.id).starting_at(t1),
            )
            .await
            .unwrap();
        let second = db
            .prices()
            .register_price_change(
                PriceChange::new(&product.id, PriceKind::Retail, 1000, &user.id).starting_at(t2),
            )
            .await
            .unwrap();

        let timeline = db
            .price_entries()
            .timeline(&product.id, PriceKind::Retail)
            .await
            .unwrap();
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0].id, first.id);
        assert_eq!(timeline[0].valid_to, Some(t2));
        assert_eq!(timeline[1].id, second.id);
        assert_eq!(timeline[1].valid_from, t2);
        assert!(timeline[1].is_open());
        assert!(timeline_is_consistent(&timeline));

        let stored = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.retail_price_cents, 1000);
        assert_eq!(stored.cost_cents, 0);
        assert_eq!(stored.wholesale_price_cents, 0);

        let at_t1 = db
            .prices()
            .price_at(&product.id, PriceKind::Retail, t1 + Duration::minutes(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(at_t1.value_cents, 900);
        let at_t2 = db
            .prices()
            .price_at(&product.id, PriceKind::Retail, t2)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(at_t2.value_cents, 1000);
        assert!(db
            .prices()
            .price_at(&product.id, PriceKind::Retail, t1 - Duration::minutes(1))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_start_before_active_is_rejected() {
        let db = test_db().await;
        let user = seed_user(&db).await;
        let product = seed_product(&db, &user.id, 0).await;

        let err = db
            .prices()
            .register_price_change(
                PriceChange::new(&product.id, PriceKind::Retail, 700, &user.id)
                    .starting_at(Utc::now() - Duration::days(1)),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        // Previous entry still open, mirror untouched
        let open = db
            .price_entries()
            .timeline(&product.id, PriceKind::Retail)
            .await
            .unwrap();
        assert_eq!(open.len(), 1);
        assert!(open[0].is_open());
        let stored = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.retail_price_cents, RETAIL_CENTS);
    }

    #[tokio::test]
    async fn test_failed_change_rolls_back_close() {
        let db = test_db().await;
        let user = seed_user(&db).await;
        let product = seed_product(&db, &user.id, 0).await;

        // Unknown acting user: the close succeeds, the insert trips the
        // foreign key, and the whole change rolls back
        let err = db
            .prices()
            .register_price_change(PriceChange::new(
                &product.id,
                PriceKind::Wholesale,
                999,
                "ghost-user",
            ))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let timeline = db
            .price_entries()
            .timeline(&product.id, PriceKind::Wholesale)
            .await
            .unwrap();
        assert_eq!(timeline.len(), 1);
        assert!(timeline[0].is_open());
    }

    #[tokio::test]
    async fn test_validation_and_not_found() {
        let db = test_db().await;
        let user = seed_user(&db).await;

        let negative = db
            .prices()
            .register_price_change(PriceChange::new("p", PriceKind::Cost, -5, &user.id))
            .await
            .unwrap_err();
        assert_eq!(negative.kind(), ErrorKind::InvalidArgument);

        let missing = db
            .prices()
            .register_price_change(PriceChange::new("missing", PriceKind::Cost, 5, &user.id))
            .await
            .unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_history_queries() {
        let db = test_db().await;
        let user = seed_user(&db).await;
        let product = seed_product(&db, &user.id, 0).await;

        for value in [810, 820, 830] {
            db.prices()
                .register_price_change(PriceChange::new(&product.id, PriceKind::Retail, value, &user.id))
                .await
                .unwrap();
        }

        let all = db
            .prices()
            .product_price_history(&product.id, None, None, None)
            .await
            .unwrap();
        // Three seeded kinds plus three retail changes
        assert_eq!(all.history.total, 6);
        assert_eq!(all.current_prices.retail_price_cents, 830);

        let retail = db
            .prices()
            .product_price_history(&product.id, Some(PriceKind::Retail), Some(2), None)
            .await
            .unwrap();
        assert_eq!(retail.history.total, 4);
        assert_eq!(retail.history.items.len(), 2);
        assert_eq!(retail.history.items[0].value_cents, 830);

        let open_count = retail.history.items.iter().filter(|e| e.is_open()).count();
        assert_eq!(open_count, 1);

        let unknown = db
            .prices()
            .product_price_history("missing", None, None, None)
            .await
            .unwrap_err();
        assert_eq!(unknown.kind(), ErrorKind::NotFound);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_changes_keep_one_open_entry() {
        let (db, path) = file_db().await;
        let user = seed_user(&db).await;
        let product = seed_product(&db, &user.id, 0).await;

        let mut handles = Vec::new();
        for value in 901..=908 {
            let db = db.clone();
            let product_id = product.id.clone();
            let user_id = user.id.clone();
            handles.push(tokio::spawn(async move {
                db.prices()
                    .register_price_change(PriceChange::new(&product_id, PriceKind::Retail, value, &user_id))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let timeline = db
            .price_entries()
            .timeline(&product.id, PriceKind::Retail)
            .await
            .unwrap();
        assert_eq!(timeline.len(), 9);
        assert!(timeline_is_consistent(&timeline));

        let open: Vec<_> = timeline.iter().filter(|e| e.is_open()).collect();
        assert_eq!(open.len(), 1);
        let stored = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.retail_price_cents, open[0].value_cents);

        drop_file_db(db, path).await;
    }
}
