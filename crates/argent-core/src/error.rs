//! # Error Types
//!
//! Domain-specific error types for argent-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  argent-core errors (this file)                                        │
//! │  ├── CoreError        - Costing / domain errors                        │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  argent-store errors (separate crate)                                  │
//! │  └── StoreError       - JSON tree persistence failures                 │
//! │                                                                         │
//! │  argent-engine errors (separate crate)                                 │
//! │  └── EngineError      - What callers of the ledger see                 │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → Caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product name, quantities)
//! 3. Errors are enum variants, never String
//! 4. A negative intermediate result is NOT an error: it clamps to zero

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations in the costing engine.
/// They should be caught and translated to user-facing messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found in the branch product list.
    ///
    /// ## When This Occurs
    /// - Selling or receiving against a name that was never stocked
    /// - Scrap purchase against a product that must pre-exist
    /// - Product was deleted by an admin
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Insufficient stock to complete a sale.
    ///
    /// ## When This Occurs
    /// - Selling more grams than the branch holds
    /// - Editing a sale to a quantity the post-reversal stock cannot cover
    ///
    /// ## User Workflow
    /// ```text
    /// Record sale (qty: 50.0 g)
    ///      │
    ///      ▼
    /// Check stock: available = 32.5 g
    ///      │
    ///      ▼
    /// InsufficientStock { product: "ring-925", available: 32.5, requested: 50.0 }
    /// ```
    #[error("Insufficient stock for {product}: available {available:.2}, requested {requested:.2}")]
    InsufficientStock {
        product: String,
        available: f64,
        requested: f64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before costing logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    CannotBeNegative { field: String },

    /// Value is not a finite number (NaN or infinity).
    #[error("{field} is not a finite number")]
    NotFinite { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: f64, max: f64 },

    /// Duplicate value (e.g., duplicate product name in a branch).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product: "ring-925".to_string(),
            available: 32.5,
            requested: 50.0,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for ring-925: available 32.50, requested 50.00"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "supplier".to_string(),
        };
        assert_eq!(err.to_string(), "supplier is required");

        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "product".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
