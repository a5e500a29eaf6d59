//! # Domain Types
//!
//! Core domain types for Argent Ledger.
//!
//! ## Type Relationships
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Branch Collections                                  │
//! │                                                                         │
//! │   products:  [ProductStock]   ← quantity + running cost basis          │
//! │   sales:     [SaleEntry]      ← consumes stock at average cost         │
//! │   returns:   [ReturnEntry]    ← restores stock at average cost         │
//! │   receiving: [ReceivingEntry] ← adds stock at batch unit cost          │
//! │   expenses:  [ExpenseEntry]   ← ScrapPurchase variant adds stock       │
//! │                                                                         │
//! │   Every ledger entry carries a surrogate EntryId so corrections        │
//! │   address entries directly instead of matching natural keys.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Persisted Shape
//! Serde renames keep the JSON tree compatible with existing stored data:
//! the cost-basis total serializes as `purchasePrice` on products, sale and
//! return totals as `price`, the receiving batch cost as `purchasePrice`
//! (per gram), and expenses as flat records with `expenseType` plus the
//! variant-specific `expenseUser` / `scrapType` / `scrapQuantity` fields.
//! Fields added by this implementation (`id`, `unitCostAtSale`) are optional
//! on read so legacy records load unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// Entry Id
// =============================================================================

/// Surrogate identifier for a ledger entry.
///
/// ## Why UUID v4?
/// Globally unique without coordination, so entries created on different
/// terminals never collide. Legacy records without an id get a fresh one at
/// deserialization time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(Uuid);

impl EntryId {
    /// Generates a new random entry id.
    pub fn new() -> Self {
        EntryId(Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        EntryId::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// =============================================================================
// Product Stock
// =============================================================================

/// Per-branch stock row for one product.
///
/// `quantity` is grams, `cost_basis_total` is the total currency paid for the
/// grams currently held. The average unit cost is always derived, never
/// stored, so the pair stays consistent under partial consumption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStock {
    /// Product name, unique within a branch.
    pub name: String,

    /// Grams on hand. Never negative (clamped).
    pub quantity: f64,

    /// Total cost basis in currency for the grams on hand. Never negative.
    /// Persisted as `purchasePrice` for compatibility with existing trees.
    #[serde(rename = "purchasePrice")]
    pub cost_basis_total: f64,
}

impl ProductStock {
    /// Creates a stock row with an explicit quantity and cost basis.
    pub fn new(name: impl Into<String>, quantity: f64, cost_basis_total: f64) -> Self {
        ProductStock {
            name: name.into(),
            quantity,
            cost_basis_total,
        }
    }

    /// Creates a stock row with zero cost basis.
    ///
    /// Used when a return names a product the branch has never stocked: the
    /// grams come back but no purchase cost is known for them.
    pub fn zero_cost(name: impl Into<String>, quantity: f64) -> Self {
        ProductStock::new(name, quantity, 0.0)
    }

    /// Derived average cost per gram. Zero when no stock is held.
    pub fn average_unit_cost(&self) -> f64 {
        if self.quantity > 0.0 {
            self.cost_basis_total / self.quantity
        } else {
            0.0
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a sale was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    Transfer,
}

// =============================================================================
// Costing Policy
// =============================================================================

/// How sale reversals price the grams being restored.
///
/// ## CurrentAverage
/// The restored grams are priced at the product's average cost at reversal
/// time (history-blind). Cheap, and matches the legacy data where no per-sale
/// cost snapshot exists.
///
/// ## ExactSnapshot
/// New sales record `unitCostAtSale`; reversing such a sale restores exactly
/// the cost that was removed. Sales without a snapshot still reverse at the
/// current average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CostingPolicy {
    #[default]
    CurrentAverage,
    ExactSnapshot,
}

// =============================================================================
// Ledger Entries
// =============================================================================

/// Tag field persisted on sale records (`"type": "sale"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SaleRecordType {
    #[default]
    Sale,
}

/// A recorded sale: grams leave stock at the current average cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleEntry {
    #[serde(default = "EntryId::new")]
    pub id: EntryId,
    pub date: DateTime<Utc>,
    pub product: String,
    /// Grams sold.
    pub quantity: f64,
    /// Total sale price, not per gram.
    pub price: f64,
    #[serde(default)]
    pub customer_phone: String,
    #[serde(default)]
    pub customer_details: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub user: String,
    #[serde(rename = "type", default)]
    pub record_type: SaleRecordType,
    /// Average cost per gram at sale time. Recorded under
    /// [`CostingPolicy::ExactSnapshot`], absent on legacy records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_cost_at_sale: Option<f64>,
}

/// A customer return: grams come back at the current average cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnEntry {
    #[serde(default = "EntryId::new")]
    pub id: EntryId,
    pub date: DateTime<Utc>,
    pub product: String,
    /// Grams returned.
    pub quantity: f64,
    /// Total amount refunded. Persisted as `price`.
    #[serde(rename = "price")]
    pub refund_amount: f64,
    #[serde(default)]
    pub reason: String,
    pub user: String,
}

/// A stock receipt from a supplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivingEntry {
    #[serde(default = "EntryId::new")]
    pub id: EntryId,
    pub date: DateTime<Utc>,
    pub product: String,
    /// Grams received in this batch.
    pub quantity: f64,
    /// Cost per gram for this batch. Persisted as `purchasePrice`; the
    /// product row's `purchasePrice` is the running total, this one is not.
    #[serde(rename = "purchasePrice")]
    pub unit_cost: f64,
    #[serde(rename = "supplierName", default)]
    pub supplier: String,
    pub user: String,
}

// =============================================================================
// Expenses
// =============================================================================

/// Closed set of expense kinds.
///
/// The legacy tree stores expenses as flat records with a free-form
/// `expenseType` string; the variant data lives in optional fields. The enum
/// keeps the set closed in code while [`RawExpenseRecord`] preserves the flat
/// shape on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpenseKind {
    /// Salary payment to a named employee. Admin-only to record.
    Salary { employee: String },
    /// Purchase of scrap material: `amount` on the entry is the total paid,
    /// and the named product gains `quantity` grams at that total cost.
    ScrapPurchase { product: String, quantity: f64 },
    /// Anything else, labeled free-form.
    Other { label: String },
}

impl ExpenseKind {
    /// The `expenseType` string persisted for this kind.
    pub fn type_label(&self) -> &str {
        match self {
            ExpenseKind::Salary { .. } => "salary",
            ExpenseKind::ScrapPurchase { .. } => "scrapPurchase",
            ExpenseKind::Other { label } => label,
        }
    }
}

/// A recorded expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawExpenseRecord", into = "RawExpenseRecord")]
pub struct ExpenseEntry {
    pub id: EntryId,
    pub date: DateTime<Utc>,
    /// Total currency spent. For scrap purchases this is also the cost basis
    /// added to the product.
    pub amount: f64,
    pub description: String,
    pub user: String,
    pub kind: ExpenseKind,
}

/// Flat persisted shape for [`ExpenseEntry`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawExpenseRecord {
    #[serde(default = "EntryId::new")]
    pub id: EntryId,
    pub date: DateTime<Utc>,
    pub expense_type: String,
    pub amount: f64,
    #[serde(default)]
    pub description: String,
    pub user: String,
    /// Salary recipient, present only on salary records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expense_user: Option<String>,
    /// Product receiving the scrap grams, present only on scrap purchases.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scrap_type: Option<String>,
    /// Grams of scrap purchased, present only on scrap purchases.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scrap_quantity: Option<f64>,
}

impl TryFrom<RawExpenseRecord> for ExpenseEntry {
    type Error = String;

    fn try_from(raw: RawExpenseRecord) -> Result<Self, Self::Error> {
        // Shape-driven first: legacy records carry localized expenseType
        // strings, so the variant fields are the reliable signal.
        let kind = if raw.scrap_type.is_some() || raw.scrap_quantity.is_some() {
            let product = raw
                .scrap_type
                .clone()
                .ok_or("scrap purchase record missing scrapType")?;
            let quantity = raw
                .scrap_quantity
                .ok_or("scrap purchase record missing scrapQuantity")?;
            ExpenseKind::ScrapPurchase { product, quantity }
        } else if let Some(employee) = raw.expense_user.clone() {
            ExpenseKind::Salary { employee }
        } else {
            match raw.expense_type.as_str() {
                "salary" => return Err("salary expense record missing expenseUser".to_string()),
                "scrapPurchase" => {
                    return Err("scrap purchase record missing scrapType".to_string())
                }
                label => ExpenseKind::Other {
                    label: label.to_string(),
                },
            }
        };

        Ok(ExpenseEntry {
            id: raw.id,
            date: raw.date,
            amount: raw.amount,
            description: raw.description,
            user: raw.user,
            kind,
        })
    }
}

impl From<ExpenseEntry> for RawExpenseRecord {
    fn from(entry: ExpenseEntry) -> Self {
        let expense_type = entry.kind.type_label().to_string();
        let (expense_user, scrap_type, scrap_quantity) = match entry.kind {
            ExpenseKind::Salary { employee } => (Some(employee), None, None),
            ExpenseKind::ScrapPurchase { product, quantity } => {
                (None, Some(product), Some(quantity))
            }
            ExpenseKind::Other { .. } => (None, None, None),
        };

        RawExpenseRecord {
            id: entry.id,
            date: entry.date,
            expense_type,
            amount: entry.amount,
            description: entry.description,
            user: entry.user,
            expense_user,
            scrap_type,
            scrap_quantity,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
