//! # Error Types
//!
//! Domain-specific error types for lumbung-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  lumbung-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  lumbung-db errors (separate crate)                                    │
//! │  └── DbError          - Database operation failures (wraps CoreError)  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (SKU, ID, quantities)
//! 3. Errors are enum variants, never String
//! 4. Every variant detected inside an atomic unit of work aborts the whole
//!    unit - nothing partially commits and reports success

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These map one-to-one onto the engine's error taxonomy: validation,
/// not-found, insufficient stock, conflict, integrity violation. None of
/// them is retried automatically - stock conflicts are business rule
/// violations, not infrastructure failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Referenced entity doesn't exist or doesn't belong to the tenant.
    ///
    /// Tenant mismatches deliberately surface as NotFound rather than a
    /// dedicated "forbidden" error, so a tenant cannot probe for the
    /// existence of another tenant's data.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A decrement would push a stock row negative.
    ///
    /// ## When This Occurs
    /// - Selling more than the backing base stock covers
    /// - Transferring more than the source store holds
    /// - Stock-out exceeding available quantity
    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// Duplicate key or an operation repeated against a terminal state
    /// (e.g. voiding an already-void transaction).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Server-recomputed total diverges from the client-declared total
    /// beyond the allowed tolerance. Possible tampering or a stale cart.
    #[error("Total mismatch: server computed {computed}, request declared {declared}")]
    IntegrityViolation { computed: i64, declared: i64 },

    /// A PARCEL variant has no bundle components configured.
    #[error("Parcel {name} has no components configured")]
    EmptyBundle { name: String },

    /// Setting this parent would create a cycle in the variant graph.
    #[error("Variant {variant_id} parent assignment would create a cycle")]
    UnitGraphCycle { variant_id: String },

    /// Parent chain exceeds [`crate::MAX_UNIT_DEPTH`].
    #[error("Variant {variant_id} parent chain exceeds maximum depth")]
    UnitGraphTooDeep { variant_id: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Detected before any write; the enclosing operation is rejected whole.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Operation parameters contradict each other
    /// (e.g. transfer source equals destination).
    #[error("{0}")]
    Invalid(String),
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
