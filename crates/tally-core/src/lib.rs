//! # tally-core: Pure Domain Logic for the Tally Ledger
//!
//! This crate holds the stock and sale accounting rules as pure functions
//! and plain types with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Transport layer (routes, auth) - external            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ validated request + acting user       │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │         tally-db services (one transaction per operation)       │   │
//! │  │   InventoryService, SaleService, PriceHistoryService, Batches   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │  ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌───────┐ │   │
//! │  │  │ movement │ │  price   │ │   sale   │ │  ledger  │ │ money │ │   │
//! │  │  │ kinds +  │ │ kinds +  │ │ lines +  │ │  replay  │ │ cents │ │   │
//! │  │  │direction │ │ timeline │ │  totals  │ │          │ │       │ │   │
//! │  │  └──────────┘ └──────────┘ └──────────┘ └──────────┘ └───────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Product projection, sales, users, batches, pagination
//! - [`movement`] - Ledger entries and the kind → direction table
//! - [`price`] - Price timeline entries and the kind → product field table
//! - [`sale`] - Sale requests, line pricing, totals, insufficiency reports
//! - [`ledger`] - Rebuilding stock from the movement ledger
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types and their stable kinds
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::movement::{MovementKind, StockDirection};
//!
//! assert_eq!(MovementKind::ReturnIn.direction(), StockDirection::Increase);
//! assert_eq!(MovementKind::TransferOut.direction().apply(10, 4), 6);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod money;
pub mod movement;
pub mod price;
pub mod sale;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::Money;
pub use movement::{MovementKind, MovementReason, NewMovement, StockDirection, StockMovement};
pub use price::{PriceHistoryEntry, PriceKind};
pub use sale::{NewSale, SaleLineRequest, StockShortage};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Page size used when a listing request does not name one.
pub const DEFAULT_PAGE_LIMIT: u32 = 50;

/// Upper bound on a single page.
pub const MAX_PAGE_LIMIT: u32 = 500;

/// Payment method recorded when the caller does not supply one.
pub const DEFAULT_PAYMENT_METHOD: &str = "cash";

/// Basis points in 100%. Item discounts are expressed in basis points.
pub const FULL_DISCOUNT_BPS: u32 = 10_000;
