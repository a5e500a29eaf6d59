//! # Input Validation
//!
//! Business rule validation for user input.
//!
//! ## Design
//! Free functions that return `Result<(), ValidationError>`. Each operation
//! validates its inputs with these before any costing logic runs, so a bad
//! request never touches branch state.
//!
//! Numeric inputs are `f64` (grams and currency), so every check starts by
//! rejecting NaN and infinities.

use crate::error::ValidationError;
use crate::{MAX_AMOUNT, MAX_NAME_LEN, MAX_QUANTITY_GRAMS, MAX_TEXT_LEN};

fn require_finite(value: f64, field: &str) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NotFinite {
            field: field.to_string(),
        })
    }
}

fn require_text(value: &str, field: &str, max: usize) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    if value.len() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Validates a product name: required, bounded length.
pub fn validate_product_name(name: &str) -> Result<(), ValidationError> {
    require_text(name, "product name", MAX_NAME_LEN)
}

/// Validates a branch name: required, bounded length.
pub fn validate_branch_name(name: &str) -> Result<(), ValidationError> {
    require_text(name, "branch name", MAX_NAME_LEN)
}

/// Validates a supplier name: required on receipts.
pub fn validate_supplier(name: &str) -> Result<(), ValidationError> {
    require_text(name, "supplier", MAX_NAME_LEN)
}

/// Validates a return reason: required on returns.
pub fn validate_reason(reason: &str) -> Result<(), ValidationError> {
    require_text(reason, "reason", MAX_TEXT_LEN)
}

/// Validates a username: required.
pub fn validate_username(name: &str) -> Result<(), ValidationError> {
    require_text(name, "username", MAX_NAME_LEN)
}

/// Validates free-form detail text: optional, bounded length.
pub fn validate_details(text: &str) -> Result<(), ValidationError> {
    if text.len() > MAX_TEXT_LEN {
        return Err(ValidationError::TooLong {
            field: "details".to_string(),
            max: MAX_TEXT_LEN,
        });
    }
    Ok(())
}

/// Validates a gram quantity: finite, strictly positive, bounded.
pub fn validate_quantity(quantity: f64) -> Result<(), ValidationError> {
    require_finite(quantity, "quantity")?;
    if quantity <= 0.0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    if quantity > MAX_QUANTITY_GRAMS {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0.0,
            max: MAX_QUANTITY_GRAMS,
        });
    }
    Ok(())
}

/// Validates a corrected stock level: finite, non-negative, bounded.
///
/// Unlike [`validate_quantity`] this allows zero, since an admin correction
/// may legitimately set a product's stock to nothing.
pub fn validate_stock_level(quantity: f64) -> Result<(), ValidationError> {
    require_finite(quantity, "quantity")?;
    if quantity < 0.0 {
        return Err(ValidationError::CannotBeNegative {
            field: "quantity".to_string(),
        });
    }
    if quantity > MAX_QUANTITY_GRAMS {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0.0,
            max: MAX_QUANTITY_GRAMS,
        });
    }
    Ok(())
}

/// Validates a per-gram cost: finite, strictly positive.
pub fn validate_unit_cost(unit_cost: f64) -> Result<(), ValidationError> {
    require_finite(unit_cost, "unit cost")?;
    if unit_cost <= 0.0 {
        return Err(ValidationError::MustBePositive {
            field: "unit cost".to_string(),
        });
    }
    Ok(())
}

/// Validates a currency amount that must be strictly positive
/// (sale totals, expense amounts).
pub fn validate_positive_amount(amount: f64, field: &str) -> Result<(), ValidationError> {
    require_finite(amount, field)?;
    if amount <= 0.0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    if amount > MAX_AMOUNT {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0.0,
            max: MAX_AMOUNT,
        });
    }
    Ok(())
}

/// Validates a currency amount that may be zero
/// (refunds, initial product cost).
pub fn validate_non_negative_amount(amount: f64, field: &str) -> Result<(), ValidationError> {
    require_finite(amount, field)?;
    if amount < 0.0 {
        return Err(ValidationError::CannotBeNegative {
            field: field.to_string(),
        });
    }
    if amount > MAX_AMOUNT {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0.0,
            max: MAX_AMOUNT,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_name_required() {
        assert!(validate_product_name("ring-925").is_ok());
        assert!(matches!(
            validate_product_name("   "),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_product_name_too_long() {
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(
            validate_product_name(&long),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_quantity_bounds() {
        assert!(validate_quantity(12.5).is_ok());
        assert!(matches!(
            validate_quantity(0.0),
            Err(ValidationError::MustBePositive { .. })
        ));
        assert!(matches!(
            validate_quantity(-3.0),
            Err(ValidationError::MustBePositive { .. })
        ));
        assert!(matches!(
            validate_quantity(f64::NAN),
            Err(ValidationError::NotFinite { .. })
        ));
        assert!(matches!(
            validate_quantity(MAX_QUANTITY_GRAMS * 2.0),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_amounts() {
        assert!(validate_positive_amount(100.0, "price").is_ok());
        assert!(validate_positive_amount(0.0, "price").is_err());
        assert!(validate_non_negative_amount(0.0, "refund").is_ok());
        assert!(validate_non_negative_amount(-1.0, "refund").is_err());
        assert!(validate_non_negative_amount(f64::INFINITY, "refund").is_err());
    }

    #[test]
    fn test_details_optional_but_bounded() {
        assert!(validate_details("").is_ok());
        assert!(validate_details(&"x".repeat(MAX_TEXT_LEN + 1)).is_err());
    }
}
