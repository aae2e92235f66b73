//! # Repository Module
//!
//! SQL for every table lives here and nowhere else.
//!
//! ## Two Kinds of Methods
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  &self methods            read through the pool                        │
//! │  ───────────────          db.products().get_by_sku("RICE-5KG")         │
//! │                                                                         │
//! │  associated functions     run on any SqliteExecutor; services pass     │
//! │  ────────────────────     `&mut *tx` so several writes share one       │
//! │                           transaction                                  │
//! │                           ProductRepository::decrease_stock(&mut *tx,..)│
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories never open transactions; the services in
//! [`crate::service`] own the BEGIN/COMMIT boundaries.
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Product reads, stock and price projections
//! - [`user::UserRepository`] - Acting users
//! - [`movement::StockMovementRepository`] - The append-only stock ledger
//! - [`price::PriceHistoryRepository`] - Price timeline intervals
//! - [`sale::SaleRepository`] - Sale headers and line snapshots
//! - [`batch::BatchRepository`] - Received batches

pub mod batch;
pub mod movement;
pub mod price;
pub mod product;
pub mod sale;
pub mod user;

/// Clamps an optional offset to a bind-able value.
pub(crate) fn offset_or_zero(offset: Option<u32>) -> u32 {
    offset.unwrap_or(0)
}
