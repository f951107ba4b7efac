//! # Validation Module
//!
//! Input validation for the engine's operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Controllers (outside this workspace)                         │
//! │  ├── Shape checks during deserialization                               │
//! │  └── Immediate caller feedback                                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Business rule validation, rejected BEFORE any write               │
//! │  └── Same rules regardless of which controller calls in               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (stock_qty >= 0), UNIQUE, foreign keys                      │
//! │  └── Last line of defense                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::MIN_VOID_REASON_LEN;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Quantity Validators
// =============================================================================

/// Validates a quantity that must be strictly positive (stock-in, transfer,
/// stock-out, sale line items).
pub fn validate_positive_qty(field: &str, qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates an opname actual count: zero is a legitimate physical count,
/// negative is not.
pub fn validate_actual_qty(qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::OutOfRange {
            field: "actual_qty".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates an adjustment delta: any sign, but never zero (a no-op
/// adjustment would still write an audit row).
pub fn validate_adjustment_delta(delta: i64) -> ValidationResult<()> {
    if delta == 0 {
        return Err(ValidationError::Invalid(
            "adjustment_qty must not be zero".to_string(),
        ));
    }
    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required free-text field (auditor name, adjustment reason).
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a void reason: required, minimum length.
///
/// ## Example
/// ```rust
/// use lumbung_core::validation::validate_void_reason;
///
/// assert!(validate_void_reason("wrong item scanned").is_ok());
/// assert!(validate_void_reason("oops").is_err());
/// assert!(validate_void_reason("   ").is_err());
/// ```
pub fn validate_void_reason(reason: &str) -> ValidationResult<()> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(ValidationError::Required {
            field: "reason".to_string(),
        });
    }
    if reason.chars().count() < MIN_VOID_REASON_LEN {
        return Err(ValidationError::TooShort {
            field: "reason".to_string(),
            min: MIN_VOID_REASON_LEN,
        });
    }
    Ok(())
}

// =============================================================================
// Operation Shape Validators
// =============================================================================

/// Validates the transfer endpoints: distinct stores.
pub fn validate_transfer_stores(from_store_id: &str, to_store_id: &str) -> ValidationResult<()> {
    if from_store_id == to_store_id {
        return Err(ValidationError::Invalid(
            "source and destination store must differ".to_string(),
        ));
    }
    Ok(())
}

/// Validates that a batch operation carries at least one item
/// (opname submissions, transaction carts).
pub fn validate_non_empty_batch(field: &str, len: usize) -> ValidationResult<()> {
    if len == 0 {
        return Err(ValidationError::Required {
            field: field.to_string(),
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
    fn test_positive_qty() {
        assert!(validate_positive_qty("qty", 1).is_ok());
        assert!(validate_positive_qty("qty", 0).is_err());
        assert!(validate_positive_qty("qty", -5).is_err());
    }

    #[test]
    fn test_actual_qty_allows_zero() {
        assert!(validate_actual_qty(0).is_ok());
        assert!(validate_actual_qty(7).is_ok());
        assert!(validate_actual_qty(-1).is_err());
    }

    #[test]
    fn test_adjustment_delta_rejects_zero() {
        assert!(validate_adjustment_delta(5).is_ok());
        assert!(validate_adjustment_delta(-5).is_ok());
        assert!(validate_adjustment_delta(0).is_err());
    }

    #[test]
    fn test_void_reason() {
        assert!(validate_void_reason("salah input qty").is_ok());
        assert!(validate_void_reason("dup").is_err());
        assert!(validate_void_reason("").is_err());
        // whitespace padding doesn't help
        assert!(validate_void_reason("  ab  ").is_err());
    }

    #[test]
    fn test_transfer_stores() {
        assert!(validate_transfer_stores("a", "b").is_ok());
        assert!(validate_transfer_stores("a", "a").is_err());
    }

    #[test]
    fn test_non_empty_batch() {
        assert!(validate_non_empty_batch("items", 3).is_ok());
        assert!(validate_non_empty_batch("items", 0).is_err());
    }
}
