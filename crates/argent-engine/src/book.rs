//! # Branch Book
//!
//! The in-memory mirror of one branch's `branchData/{branchId}` subtree:
//! five collections plus the revision counter and last-updated stamp.
//!
//! Serde defaults keep legacy trees loading: collections may be missing,
//! records may lack ids (they get fresh ones), and unknown keys (such as the
//! retired `workshopOperations` list) are ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use argent_core::{EntryId, ExpenseEntry, ProductStock, ReceivingEntry, ReturnEntry, SaleEntry};

/// One branch's ledger collections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchBook {
    #[serde(default)]
    pub products: Vec<ProductStock>,
    #[serde(default)]
    pub sales: Vec<SaleEntry>,
    #[serde(default)]
    pub returns: Vec<ReturnEntry>,
    #[serde(default)]
    pub receiving: Vec<ReceivingEntry>,
    #[serde(default)]
    pub expenses: Vec<ExpenseEntry>,

    /// Bumped on every committed mutation; the store rejects writes that do
    /// not carry a strictly newer value.
    #[serde(default)]
    pub revision: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl BranchBook {
    pub fn product_index(&self, name: &str) -> Option<usize> {
        self.products.iter().position(|p| p.name == name)
    }

    pub fn product(&self, name: &str) -> Option<&ProductStock> {
        self.products.iter().find(|p| p.name == name)
    }

    pub fn sale_index(&self, id: EntryId) -> Option<usize> {
        self.sales.iter().position(|e| e.id == id)
    }

    pub fn return_index(&self, id: EntryId) -> Option<usize> {
        self.returns.iter().position(|e| e.id == id)
    }

    pub fn receiving_index(&self, id: EntryId) -> Option<usize> {
        self.receiving.iter().position(|e| e.id == id)
    }

    pub fn expense_index(&self, id: EntryId) -> Option<usize> {
        self.expenses.iter().position(|e| e.id == id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
