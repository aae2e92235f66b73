//! Shared fixtures for the crate's tests.

use std::path::PathBuf;

use tally_core::price::PriceChange;
use tally_core::{MovementReason, PriceKind, Product, UserSummary};

use crate::service::inventory::StockRequest;
use crate::{Database, DbConfig};

pub(crate) const COST_CENTS: i64 = 500;
pub(crate) const RETAIL_CENTS: i64 = 800;
pub(crate) const WHOLESALE_CENTS: i64 = 650;

pub(crate) async fn test_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// A file-backed database with a pool of eight connections, for tests that
/// need real concurrent writers. Pair with [`drop_file_db`].
pub(crate) async fn file_db() -> (Database, PathBuf) {
    let path = std::env::temp_dir().join(format!("tally-{}.db", uuid::Uuid::new_v4()));
    let db = Database::new(DbConfig::new(path.clone()).max_connections(8))
        .await
        .unwrap();
    (db, path)
}

pub(crate) async fn drop_file_db(db: Database, path: PathBuf) {
    db.close().await;
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
    }
}

pub(crate) async fn seed_user(db: &Database) -> UserSummary {
    let email = format!("{}@example.com", uuid::Uuid::new_v4());
    db.users().insert("Cashier", &email).await.unwrap()
}

/// A product with cost 5.00, retail 8.00, wholesale 6.50 and `stock` units
/// on hand from an `initial` movement.
pub(crate) async fn seed_product(db: &Database, user_id: &str, stock: i64) -> Product {
    let sku = format!("SKU-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]);
    let product = db
        .products()
        .insert(&Product::new(sku, "Green tea"))
        .await
        .unwrap();

    for (kind, value) in [
        (PriceKind::Cost, COST_CENTS),
        (PriceKind::Retail, RETAIL_CENTS),
        (PriceKind::Wholesale, WHOLESALE_CENTS),
    ] {
        db.prices()
            .register_price_change(PriceChange::new(&product.id, kind, value, user_id))
            .await
            .unwrap();
    }

    if stock > 0 {
        db.inventory()
            .register_input(
                StockRequest::new(&product.id, user_id, stock, COST_CENTS)
                    .reason(MovementReason::Initial),
            )
            .await
            .unwrap();
    }

    db.products().get_by_id(&product.id).await.unwrap().unwrap()
}
