//! # Movement Report
//!
//! Sales movement for one product in a date window, newest first.
//!
//! The cost column is an estimate at the product's *current* average cost:
//! sale records before the snapshot policy existed carry no per-sale cost,
//! so a historical figure is not reconstructable. Sales that do carry a
//! snapshot use it.

use chrono::{DateTime, NaiveDate, Utc};

use crate::book::BranchBook;

/// One sale of the product inside the window.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementRow {
    pub date: DateTime<Utc>,
    pub quantity: f64,
    pub sale_price: f64,
    /// Quantity priced at the recorded snapshot, or at the current average.
    pub estimated_cost: f64,
}

/// The report: rows newest-first plus totals.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementReport {
    pub product: String,
    pub rows: Vec<MovementRow>,
    pub total_quantity: f64,
    pub total_sale_price: f64,
    pub total_estimated_cost: f64,
}

/// Builds the movement report for `product` between `from` and `to`
/// (both inclusive, either side open when `None`).
pub fn product_movement(
    book: &BranchBook,
    product: &str,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> MovementReport {
    let current_average = book
        .product(product)
        .map(|p| p.average_unit_cost())
        .unwrap_or(0.0);

    let mut rows: Vec<MovementRow> = book
        .sales
        .iter()
        .filter(|sale| sale.product == product)
        .filter(|sale| {
            let day = sale.date.date_naive();
            from.map(|f| day >= f).unwrap_or(true) && to.map(|t| day <= t).unwrap_or(true)
        })
        .map(|sale| MovementRow {
            date: sale.date,
            quantity: sale.quantity,
            sale_price: sale.price,
            estimated_cost: sale.unit_cost_at_sale.unwrap_or(current_average) * sale.quantity,
        })
        .collect();

    rows.sort_by(|a, b| b.date.cmp(&a.date));

    let total_quantity = rows.iter().map(|r| r.quantity).sum();
    let total_sale_price = rows.iter().map(|r| r.sale_price).sum();
    let total_estimated_cost = rows.iter().map(|r| r.estimated_cost).sum();

    MovementReport {
        product: product.to_string(),
        rows,
        total_quantity,
        total_sale_price,
        total_estimated_cost,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
