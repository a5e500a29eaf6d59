//! # argent-core: Pure Business Logic for Argent Ledger
//!
//! This crate is the **heart** of Argent Ledger. It contains all costing
//! logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Argent Ledger Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  argent-engine (Operation Processor)            │   │
//! │  │    record_sale, record_return, edit_receiving, reload, ...      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ argent-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐                  │   │
//! │  │   │   types   │  │  costing  │  │ validation│                  │   │
//! │  │   │ProductStk │  │ apply_*   │  │   rules   │                  │   │
//! │  │   │ entries   │  │ reverse_* │  │  checks   │                  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘                  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO TREE ACCESS • NO NETWORK • PURE FUNCTIONS        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  argent-store (Persistence Gateway)             │   │
//! │  │            path-addressed JSON tree, merge writes               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (ProductStock, ledger entries, policies)
//! - [`costing`] - Weighted-average apply/reverse arithmetic
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Tree, network, file system access is FORBIDDEN here
//! 3. **Clamp, Don't Fail**: Negative intermediate results clamp to zero and
//!    are reported, never raised as errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use argent_core::costing;
//! use argent_core::types::ProductStock;
//!
//! let mut stock = ProductStock::zero_cost("ring-925", 0.0);
//!
//! // Receive 100 g at 2.00 per gram, then sell 40 g.
//! costing::apply_receipt(&mut stock, 100.0, 2.0);
//! costing::apply_sale(&mut stock, 40.0).unwrap();
//!
//! assert_eq!(stock.quantity, 60.0);
//! assert_eq!(stock.cost_basis_total, 120.0);
//! assert_eq!(stock.average_unit_cost(), 2.0);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod costing;
pub mod error;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use argent_core::ProductStock` instead of
// `use argent_core::types::ProductStock`

pub use error::{CoreError, CoreResult, ValidationError};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of product, branch, supplier and user names.
pub const MAX_NAME_LEN: usize = 120;

/// Maximum length of free-form text fields (details, reasons, descriptions).
pub const MAX_TEXT_LEN: usize = 500;

/// Maximum grams accepted in a single operation.
///
/// ## Business Reason
/// One metric ton of silver in one entry is a typo, not a transaction.
pub const MAX_QUANTITY_GRAMS: f64 = 1_000_000.0;

/// Maximum currency amount accepted in a single operation.
pub const MAX_AMOUNT: f64 = 100_000_000.0;
