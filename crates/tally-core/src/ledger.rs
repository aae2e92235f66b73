//! # Ledger Replay
//!
//! The stock projection is defined by its ledger:
//!
//! ```text
//! product.stock == Σ signed_delta(m)   for every committed movement m
//! ```
//!
//! and consecutive entries chain: each entry's `previous_stock` equals the
//! preceding entry's `current_stock`. [`replay`] folds a product's ledger in
//! creation order and reports both properties against the projection.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::movement::StockMovement;

/// Result of replaying one product's ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockReconciliation {
    pub product_id: String,
    /// Value currently stored on the product.
    pub projected_stock: i64,
    /// Value rebuilt from the ledger, starting at zero.
    pub ledger_stock: i64,
    pub movement_count: i64,
    /// Entries whose `previous_stock` does not continue the chain, or whose
    /// snapshots disagree with kind and quantity.
    pub chain_breaks: i64,
    /// Lowest running total seen; negative means the ledger went below zero.
    pub lowest_running_stock: i64,
}

impl StockReconciliation {
    pub fn is_consistent(&self) -> bool {
        self.projected_stock == self.ledger_stock
            && self.chain_breaks == 0
            && self.lowest_running_stock >= 0
    }

    /// Amount the projection is ahead of the ledger.
    pub fn drift(&self) -> i64 {
        self.projected_stock - self.ledger_stock
    }
}

/// Replays `movements` (oldest first) against `projected_stock`.
pub fn replay(product_id: &str, projected_stock: i64, movements: &[StockMovement]) -> StockReconciliation {
    let mut running = 0i64;
    let mut lowest = 0i64;
    let mut breaks = 0i64;

    for movement in movements {
        if movement.previous_stock != running || !movement.snapshots_agree() {
            breaks += 1;
        }
        running += movement.signed_delta();
        lowest = lowest.min(running);
    }

    StockReconciliation {
        product_id: product_id.to_string(),
        projected_stock,
        ledger_stock: running,
        movement_count: movements.len() as i64,
        chain_breaks: breaks,
        lowest_running_stock: lowest,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::{MovementKind, NewMovement};

    fn mv(kind: MovementKind, qty: i64, prev: i64) -> StockMovement {
        let current = kind.direction().apply(prev, qty);
        NewMovement::new("p", "u", kind, qty, 0).into_movement(prev, current)
    }

    #[test]
    fn test_consistent_ledger() {
        let ledger = vec![
            mv(MovementKind::Input, 10, 0),
            mv(MovementKind::Output, 3, 10),
            mv(MovementKind::ReturnIn, 1, 7),
            mv(MovementKind::TransferOut, 8, 8),
        ];
        let rec = replay("p", 0, &ledger);
        assert_eq!(rec.ledger_stock, 0);
        assert_eq!(rec.movement_count, 4);
        assert!(rec.is_consistent());
    }

    #[test]
    fn test_projection_drift_detected() {
        let ledger = vec![mv(MovementKind::Input, 10, 0), mv(MovementKind::Output, 3, 10)];
        let rec = replay("p", 9, &ledger);
        assert_eq!(rec.drift(), 2);
        assert!(!rec.is_consistent());
    }

    #[test]
    fn test_chain_break_detected() {
        let ledger = vec![
            mv(MovementKind::Input, 10, 0),
            // Claims to start from 4 although the chain is at 10
            mv(MovementKind::Output, 3, 4),
        ];
        let rec = replay("p", 7, &ledger);
        assert_eq!(rec.chain_breaks, 1);
        assert!(!rec.is_consistent());
    }

    #[test]
    fn test_empty_ledger() {
        let rec = replay("p", 0, &[]);
        assert!(rec.is_consistent());
        assert_eq!(rec.movement_count, 0);
    }
}
