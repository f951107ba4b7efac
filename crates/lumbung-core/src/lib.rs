//! # lumbung-core: Pure Business Logic for Lumbung POS
//!
//! This crate is the **heart** of the stock & transaction engine. It contains
//! all business rules as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Lumbung POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Controllers / HTTP (outside this workspace)          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                lumbung-db (Engine Services)                     │   │
//! │  │   Stock Ledger • Mutation Ops • Posting Pipeline • Void Engine  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ lumbung-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ unit_graph │  │  pricing  │  │   │
//! │  │   │  Variant  │  │   Money   │  │StockSource │  │  margins  │  │   │
//! │  │   │   Stock   │  │  rounding │  │ bottleneck │  │  status   │  │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Variant, InventoryStock, Transaction, etc.)
//! - [`money`] - Integer money type (no floating point!)
//! - [`unit_graph`] - Base/derived/parcel stock resolution math
//! - [`pricing`] - Margin suggestion, totals, payment status derivation
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation rules
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Quantities**: Stock is i64 end to end; floats only at display
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod pricing;
pub mod types;
pub mod unit_graph;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;
pub use unit_graph::{BundleSource, StockSource};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum depth of the variant parent chain the resolver will follow.
///
/// In practice base units have no parent and derived units sit one level
/// deep, but the resolver never assumes a fixed depth. Anything beyond this
/// bound is a data error (or a cycle that slipped past write validation).
pub const MAX_UNIT_DEPTH: usize = 8;

/// Tolerance (in rupiah) between the server-computed transaction total and
/// the client-declared total. Anything beyond this is rejected as tampering
/// or a stale cart.
pub const TOTAL_TOLERANCE: i64 = 2;

/// Fallback margin applied by the stock-in price suggestion when the product
/// carries no category margin.
pub const DEFAULT_MARGIN: f64 = 0.20;

/// Sale prices suggested by stock-in are rounded up to this step.
pub const PRICE_ROUNDING_STEP: i64 = 500;

/// Minimum length of a void reason.
pub const MIN_VOID_REASON_LEN: usize = 5;
