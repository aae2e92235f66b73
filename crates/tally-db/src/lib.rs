//! # tally-db: Persistence and Transactions for the Tally Ledger
//!
//! SQLite storage through sqlx, and the services that turn a request into
//! exactly one committed transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Tally Data Flow                                 │
//! │                                                                         │
//! │  Transport / CLI (supplies the acting user)                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Services    │    │ Repositories  │    │  Migrations  │  │   │
//! │  │   │ (service/)    │───►│ (repository/) │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SaleService   │    │ products      │    │ 001_initial  │  │   │
//! │  │   │ Inventory     │    │ movements     │    │   _schema    │  │   │
//! │  │   │ PriceHistory  │    │ price_history │    │              │  │   │
//! │  │   │ Batch         │    │ sales, ...    │    │              │  │   │
//! │  │   └───────┬───────┘    └───────────────┘    └──────────────┘  │   │
//! │  │           │ pure rules from tally-core                         │   │
//! │  └───────────┼─────────────────────────────────────────────────────┘   │
//! │              ▼                                                          │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and the [`Database`] handle
//! - [`config`] - Environment configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database, service and response error types
//! - [`repository`] - SQL per table
//! - [`service`] - Transactional operations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{AppConfig, Database};
//! use tally_core::{NewSale, SaleLineRequest};
//!
//! let db = Database::new(AppConfig::from_env()?.db_config()).await?;
//!
//! let sale = db
//!     .sales()
//!     .create_sale(NewSale::new(user_id, client, vec![SaleLineRequest::new(product_id, 2)]))
//!     .await?;
//! db.sales().cancel_sale(&sale.sale.id, user_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

#[cfg(test)]
pub(crate) mod test_support;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{AppConfig, ConfigError, DEFAULT_LOG_FILTER};
pub use error::{DbError, DbResult, ErrorResponse, ServiceError, ServiceResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::batch::BatchRepository;
pub use repository::movement::StockMovementRepository;
pub use repository::price::PriceHistoryRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
pub use repository::user::UserRepository;

// Service re-exports
pub use service::batch::{BatchReceipt, BatchService, NewBatch};
pub use service::inventory::{InventoryService, MovementReceipt, ProductMovements, StockRequest};
pub use service::ledger::StockLedger;
pub use service::price::{PriceHistoryService, ProductPriceHistory};
pub use service::sale::SaleService;
