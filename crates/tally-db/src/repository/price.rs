//! # Price History Repository
//!
//! Timeline intervals per (product, kind). The partial unique index
//! `idx_price_history_open` keeps at most one open interval per pair; a
//! second concurrent opener fails with a unique violation.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteExecutor, SqlitePool};

use crate::error::DbResult;
use crate::repository::offset_or_zero;
use tally_core::price::PriceHistoryFilter;
use tally_core::{Page, PriceHistoryEntry, PriceKind};

const ENTRY_COLUMNS: &str =
    "id, product_id, price_kind, value_cents, valid_from, valid_to, user_id, created_at";

/// Repository for price timeline entries.
#[derive(Debug, Clone)]
pub struct PriceHistoryRepository {
    pool: SqlitePool,
}

impl PriceHistoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PriceHistoryRepository { pool }
    }

    /// Lists entries matching `filter`, newest start first.
    pub async fn list(
        &self,
        filter: &PriceHistoryFilter,
        limit: u32,
    ) -> DbResult<Page<PriceHistoryEntry>> {
        let offset = offset_or_zero(filter.offset);

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM price_history");
        push_filter(&mut count, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut query =
            QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM price_history", ENTRY_COLUMNS));
        push_filter(&mut query, filter);
        query
            .push(" ORDER BY valid_from DESC, rowid DESC LIMIT ")
            .push_bind(limit as i64)
            .push(" OFFSET ")
            .push_bind(offset as i64);

        let items = query
            .build_query_as::<PriceHistoryEntry>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items,
            total,
            limit,
            offset,
        })
    }

    /// The entry whose `[valid_from, valid_to)` contains `at`.
    pub async fn covering(
        &self,
        product_id: &str,
        kind: PriceKind,
        at: DateTime<Utc>,
    ) -> DbResult<Option<PriceHistoryEntry>> {
        let sql = format!(
            "SELECT {} FROM price_history \
             WHERE product_id = ?1 AND price_kind = ?2 \
               AND valid_from <= ?3 AND (valid_to IS NULL OR valid_to > ?3) \
             ORDER BY valid_from DESC LIMIT 1",
            ENTRY_COLUMNS
        );
        let entry = sqlx::query_as::<_, PriceHistoryEntry>(&sql)
            .bind(product_id)
            .bind(kind)
            .bind(at)
            .fetch_optional(&self.pool)
            .await?;
        Ok(entry)
    }

    /// One (product, kind) timeline, oldest first.
    pub async fn timeline(
        &self,
        product_id: &str,
        kind: PriceKind,
    ) -> DbResult<Vec<PriceHistoryEntry>> {
        let sql = format!(
            "SELECT {} FROM price_history WHERE product_id = ?1 AND price_kind = ?2 \
             ORDER BY valid_from ASC, rowid ASC",
            ENTRY_COLUMNS
        );
        let entries = sqlx::query_as::<_, PriceHistoryEntry>(&sql)
            .bind(product_id)
            .bind(kind)
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }

    // =========================================================================
    // Executor-generic operations
    // =========================================================================

    /// The open (active) entry for a pair, if any.
    pub async fn find_open<'e, E>(
        executor: E,
        product_id: &str,
        kind: PriceKind,
    ) -> DbResult<Option<PriceHistoryEntry>>
    where
        E: SqliteExecutor<'e>,
    {
        let sql = format!(
            "SELECT {} FROM price_history \
             WHERE product_id = ?1 AND price_kind = ?2 AND valid_to IS NULL",
            ENTRY_COLUMNS
        );
        let entry = sqlx::query_as::<_, PriceHistoryEntry>(&sql)
            .bind(product_id)
            .bind(kind)
            .fetch_optional(executor)
            .await?;
        Ok(entry)
    }

    /// Closes an open entry at `valid_to`.
    ///
    /// Returns `false` if the entry was no longer open.
    pub async fn close<'e, E>(executor: E, id: &str, valid_to: DateTime<Utc>) -> DbResult<bool>
    where
        E: SqliteExecutor<'e>,
    {
        let result =
            sqlx::query("UPDATE price_history SET valid_to = ?1 WHERE id = ?2 AND valid_to IS NULL")
                .bind(valid_to)
                .bind(id)
                .execute(executor)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn insert<'e, E>(executor: E, entry: &PriceHistoryEntry) -> DbResult<()>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query(
            r#"
            INSERT INTO price_history (
                id, product_id, price_kind, value_cents, valid_from, valid_to, user_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.product_id)
        .bind(entry.price_kind)
        .bind(entry.value_cents)
        .bind(entry.valid_from)
        .bind(entry.valid_to)
        .bind(&entry.user_id)
        .bind(entry.created_at)
        .execute(executor)
        .await?;
        Ok(())
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &PriceHistoryFilter) {
    builder.push(" WHERE 1 = 1");

    if let Some(product_id) = &filter.product_id {
        builder.push(" AND product_id = ").push_bind(product_id.clone());
    }
    if let Some(kind) = filter.kind {
        builder.push(" AND price_kind = ").push_bind(kind);
    }
    if let Some(start) = filter.start {
        builder.push(" AND valid_from >= ").push_bind(start);
    }
    if let Some(end) = filter.end {
        builder.push(" AND valid_from <= ").push_bind(end);
    }
}
