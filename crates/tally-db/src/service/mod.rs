//! # Service Module
//!
//! Transactional operations. Each public service method either commits all
//! of its writes or none of them.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  SaleService ──────┐                                                   │
//! │  InventoryService ─┼──► StockLedger::record(&mut tx, NewMovement)      │
//! │  BatchService ─────┘        │                                          │
//! │                             ├── conditional stock UPDATE … RETURNING   │
//! │                             └── INSERT stock_movements                 │
//! │                                                                         │
//! │  PriceHistoryService ──► close open entry, insert new, mirror price    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every transaction is committed explicitly; returning early with `?`
//! drops it, which rolls back.
//!
//! A transaction whose first statement is a write (movements, batch
//! receipts) opens with `pool.begin()`. One that reads before it writes
//! (sales, cancellations, price changes) opens with [`BEGIN_IMMEDIATE`]:
//! a deferred SQLite transaction that upgrades from read to write after
//! another writer committed fails with `SQLITE_BUSY` at once instead of
//! waiting out the busy timeout.

pub mod batch;
pub mod inventory;
pub mod ledger;
pub mod price;
pub mod sale;

/// Takes the database write lock when the transaction starts.
pub(crate) const BEGIN_IMMEDIATE: &str = "BEGIN IMMEDIATE";
