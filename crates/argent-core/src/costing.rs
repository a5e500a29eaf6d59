//! # Weighted-Average Costing
//!
//! Pure arithmetic for per-product `(quantity, cost_basis_total)` pairs.
//!
//! ## The Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Weighted-Average Cost Tracking                       │
//! │                                                                         │
//! │  Receive 100 g @ 2.00/g     quantity 100.0   cost 200.0   avg 2.00     │
//! │  Receive  50 g @ 5.00/g     quantity 150.0   cost 450.0   avg 3.00     │
//! │  Sell     30 g              quantity 120.0   cost 360.0   avg 3.00     │
//! │                                                                         │
//! │  Sales remove cost at the current average, so the average is           │
//! │  unchanged by consumption and only moves when stock arrives at a       │
//! │  different unit cost.                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Apply vs Reverse
//! Every ledger event kind has an `apply_*` function (recording it) and a
//! `reverse_*` function (undoing it for an edit or delete). Reversal is
//! history-blind by default: it prices grams at the average in effect *now*,
//! not at the average when the event happened. [`CostingPolicy::ExactSnapshot`]
//! opts sale reversals into the recorded per-sale cost instead.
//!
//! ## Clamping
//! Reversals can push a component below zero when intervening events already
//! consumed the stock being un-done. That is expected drift, not an error:
//! the component clamps to zero and the caller logs a warning. The [`Clamp`]
//! report says which components were touched.

use crate::error::{CoreError, CoreResult};
use crate::types::{CostingPolicy, ProductStock};

/// Tolerance for floating-point stock comparisons.
///
/// Quantities are grams with at most a few decimal places in practice, so a
/// nanogram-scale epsilon absorbs accumulated rounding without ever masking a
/// real shortfall.
pub const EPSILON: f64 = 1e-9;

// =============================================================================
// Clamp Report
// =============================================================================

/// Which stock components were clamped to zero by an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Clamp {
    pub quantity: bool,
    pub cost: bool,
}

impl Clamp {
    /// True if any component was clamped.
    pub fn any(self) -> bool {
        self.quantity || self.cost
    }

    /// Combines two reports.
    pub fn merge(self, other: Clamp) -> Clamp {
        Clamp {
            quantity: self.quantity || other.quantity,
            cost: self.cost || other.cost,
        }
    }
}

fn clamp_floor(value: &mut f64) -> bool {
    if *value < 0.0 {
        *value = 0.0;
        true
    } else {
        false
    }
}

fn clamp_stock(stock: &mut ProductStock) -> Clamp {
    Clamp {
        quantity: clamp_floor(&mut stock.quantity),
        cost: clamp_floor(&mut stock.cost_basis_total),
    }
}

// =============================================================================
// Sale Application
// =============================================================================

/// Result of applying a sale to a stock row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaleApplication {
    /// Average cost per gram the sale was costed at. Recorded on the entry
    /// under [`CostingPolicy::ExactSnapshot`].
    pub unit_cost: f64,
    pub clamp: Clamp,
}

// =============================================================================
// Apply
// =============================================================================

/// Applies a stock receipt: `quantity` grams arrive at `unit_cost` per gram.
pub fn apply_receipt(stock: &mut ProductStock, quantity: f64, unit_cost: f64) {
    stock.quantity += quantity;
    stock.cost_basis_total += quantity * unit_cost;
}

/// Applies a scrap-material purchase: `quantity` grams arrive for
/// `total_cost` currency in one lot.
pub fn apply_scrap_purchase(stock: &mut ProductStock, quantity: f64, total_cost: f64) {
    stock.quantity += quantity;
    stock.cost_basis_total += total_cost;
}

/// Applies a sale: `quantity` grams leave at the current average cost.
///
/// Fails with [`CoreError::InsufficientStock`] when the branch does not hold
/// enough grams (within [`EPSILON`]).
pub fn apply_sale(stock: &mut ProductStock, quantity: f64) -> CoreResult<SaleApplication> {
    if quantity > stock.quantity + EPSILON {
        return Err(CoreError::InsufficientStock {
            product: stock.name.clone(),
            available: stock.quantity,
            requested: quantity,
        });
    }

    let unit_cost = stock.average_unit_cost();
    stock.quantity -= quantity;
    stock.cost_basis_total -= unit_cost * quantity;
    let clamp = clamp_stock(stock);

    Ok(SaleApplication { unit_cost, clamp })
}

/// Applies a customer return to an existing stock row: `quantity` grams come
/// back priced at the average before the add.
///
/// When the row held zero grams the pre-add average is undefined; the grams
/// are then priced at the post-add average, which re-spreads any stranded
/// cost basis over the returned quantity.
pub fn apply_return(stock: &mut ProductStock, quantity: f64) {
    let quantity_before = stock.quantity;
    stock.quantity += quantity;

    let unit_cost = if quantity_before > 0.0 {
        stock.cost_basis_total / quantity_before
    } else if stock.quantity > 0.0 {
        stock.cost_basis_total / stock.quantity
    } else {
        0.0
    };

    stock.cost_basis_total += unit_cost * quantity;
}

// =============================================================================
// Reverse
// =============================================================================

/// Reverses a stock receipt: the batch's grams and cost leave again.
pub fn reverse_receipt(stock: &mut ProductStock, quantity: f64, unit_cost: f64) -> Clamp {
    stock.quantity -= quantity;
    stock.cost_basis_total -= quantity * unit_cost;
    clamp_stock(stock)
}

/// Reverses a scrap-material purchase.
pub fn reverse_scrap_purchase(stock: &mut ProductStock, quantity: f64, total_cost: f64) -> Clamp {
    stock.quantity -= quantity;
    stock.cost_basis_total -= total_cost;
    clamp_stock(stock)
}

/// Reverses a sale: the sold grams come back.
///
/// Under [`CostingPolicy::ExactSnapshot`] with a recorded snapshot the grams
/// restore exactly the cost the sale removed. Otherwise they are priced at
/// the average after the add-back, computed from the pre-reversal cost basis.
pub fn reverse_sale(
    stock: &mut ProductStock,
    quantity: f64,
    snapshot: Option<f64>,
    policy: CostingPolicy,
) {
    stock.quantity += quantity;

    let unit_cost = match (policy, snapshot) {
        (CostingPolicy::ExactSnapshot, Some(recorded)) => recorded,
        _ => {
            if stock.quantity > 0.0 {
                stock.cost_basis_total / stock.quantity
            } else {
                0.0
            }
        }
    };

    stock.cost_basis_total += unit_cost * quantity;
}

/// Reverses a customer return: the returned grams leave again, priced at the
/// average before the removal.
pub fn reverse_return(stock: &mut ProductStock, quantity: f64) -> Clamp {
    let unit_cost = stock.average_unit_cost();
    stock.quantity -= quantity;
    stock.cost_basis_total -= unit_cost * quantity;
    clamp_stock(stock)
}

/// Adjusts the cost basis by the amount delta of an edited scrap purchase.
pub fn adjust_scrap_amount(stock: &mut ProductStock, amount_delta: f64) -> Clamp {
    stock.cost_basis_total += amount_delta;
    Clamp {
        quantity: false,
        cost: clamp_floor(&mut stock.cost_basis_total),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
