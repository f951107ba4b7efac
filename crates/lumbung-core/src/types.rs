//! # Domain Types
//!
//! Core domain types used throughout Lumbung POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Product ──owns──► Variant ──parent──► Variant (base unit)             │
//! │                       │                    │                            │
//! │                       │ (PARCEL)           │ backs                      │
//! │                       ▼                    ▼                            │
//! │                BundleComponent      InventoryStock ◄──── StockBatch    │
//! │                                            │                            │
//! │                                            ▼                            │
//! │                                     InventoryLog (append-only)         │
//! │                                                                         │
//! │  Transaction ──owns──► TransactionItem (frozen snapshots)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where one exists: (sku, receipt_number, opname reference)
//!
//! ## Tenancy
//! Every entity carries or inherits a `tenant_id`. Data access functions in
//! lumbung-db take the tenant as a mandatory parameter - it is never
//! optional, so a query cannot accidentally span tenants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Product Type
// =============================================================================

/// What kind of good a product is. Drives stock resolution: PHYSICAL
/// variants resolve through the parent chain, PARCEL variants resolve per
/// bundle component, DIGITAL goods hold no stock at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductType {
    Physical,
    Parcel,
    Digital,
}

// =============================================================================
// Stock Log Type
// =============================================================================

/// Classification of an inventory log entry.
///
/// WASTE / EXPIRED / DAMAGE / LOST are the stock-out loss tags; the rest are
/// written by exactly one engine operation each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockLogType {
    Restock,
    Adjustment,
    Sale,
    TransferIn,
    TransferOut,
    VoidRestore,
    Waste,
    Expired,
    Damage,
    Lost,
}

impl StockLogType {
    /// True for the loss tags accepted by the stock-out operation.
    pub const fn is_loss(&self) -> bool {
        matches!(
            self,
            StockLogType::Waste | StockLogType::Expired | StockLogType::Damage | StockLogType::Lost
        )
    }

    /// Stable string form, matching the database representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            StockLogType::Restock => "RESTOCK",
            StockLogType::Adjustment => "ADJUSTMENT",
            StockLogType::Sale => "SALE",
            StockLogType::TransferIn => "TRANSFER_IN",
            StockLogType::TransferOut => "TRANSFER_OUT",
            StockLogType::VoidRestore => "VOID_RESTORE",
            StockLogType::Waste => "WASTE",
            StockLogType::Expired => "EXPIRED",
            StockLogType::Damage => "DAMAGE",
            StockLogType::Lost => "LOST",
        }
    }
}

// =============================================================================
// Payment Status
// =============================================================================

/// Payment lifecycle: `UNPAID → PARTIAL → PAID`, and independently any
/// non-VOID status → `VOID` (one-way, irreversible).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
    Void,
}

// =============================================================================
// Shift Status
// =============================================================================

/// A cashier's session state. Posting requires an OPEN shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShiftStatus {
    Open,
    Closed,
}

// =============================================================================
// Store & Shift
// =============================================================================

/// A physical store location. Only the fields the engine validates against;
/// store CRUD is an external collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Store {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A cashier shift bounding which transactions a user may post.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Shift {
    pub id: String,
    pub tenant_id: String,
    pub store_id: String,
    pub user_id: String,
    pub status: ShiftStatus,
    pub starting_cash: i64,
    /// Starting cash plus cash sales, computed at close.
    pub expected_cash: Option<i64>,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Product & Variant
// =============================================================================

/// A sellable good owning one or more variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub product_type: ProductType,
    /// Category margin flattened onto the product; consumed by the stock-in
    /// price suggestion. None falls back to [`crate::DEFAULT_MARGIN`].
    pub default_margin: Option<f64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A sellable unit of a product.
///
/// Invariants (enforced at write time in lumbung-db):
/// - exactly one base-unit variant per product (multiplier = 1, no parent)
/// - parent edges never form a cycle and the chain bottoms out at a base unit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Variant {
    pub id: String,
    pub tenant_id: String,
    pub product_id: String,
    pub name: String,
    /// Business identifier, unique per tenant.
    pub sku: String,
    /// Display unit ("pcs", "dus", "lusin").
    pub unit_name: String,
    /// How many base units one of this variant represents (>= 1).
    pub multiplier: i64,
    /// Sale price in whole rupiah.
    pub price: i64,
    /// Derived variants point at the variant whose stock backs them.
    pub parent_variant_id: Option<String>,
    pub is_base_unit: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Variant {
    /// Returns the sale price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::new(self.price)
    }

    /// True when this variant's stock lives on another variant's row.
    #[inline]
    pub fn is_derived(&self) -> bool {
        self.parent_variant_id.is_some()
    }
}

/// Edge from a PARCEL variant to a component variant with a required
/// quantity. The component may itself be a derived variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BundleComponent {
    pub id: String,
    pub parcel_variant_id: String,
    pub component_variant_id: String,
    pub qty: i64,
}

// =============================================================================
// Inventory
// =============================================================================

/// The only place physical quantity is stored. Unique per (variant, store);
/// the variant is always a base unit. `stock_qty >= 0` at all times.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryStock {
    pub id: String,
    pub variant_id: String,
    pub store_id: String,
    pub stock_qty: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only audit record. Never mutated or deleted; the sole source of
/// truth for history and reconciliation reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryLog {
    pub id: String,
    pub inventory_stock_id: String,
    pub log_type: StockLogType,
    /// Signed delta applied to the stock row.
    pub qty_change: i64,
    /// Groups related rows: one opname session, one transaction, one transfer.
    pub reference_id: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// FIFO costing record, drained oldest-first on outbound stock. Not
/// authoritative for totals; consumers tolerate partial batch coverage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockBatch {
    pub id: String,
    pub inventory_stock_id: String,
    pub qty: i64,
    pub purchase_price: i64,
    pub unit_price: i64,
    pub batch_number: Option<String>,
    pub supplier_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Purchase-cost history entry written by stock-in when the cost rises.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PriceHistory {
    pub id: String,
    pub variant_id: String,
    pub old_price: i64,
    pub new_price: i64,
    pub note: Option<String>,
    pub changed_at: DateTime<Utc>,
}

// =============================================================================
// Transaction
// =============================================================================

/// Sale header. Created atomically with its items and stock effects; voided
/// (never hard-deleted) by the void engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Transaction {
    pub id: String,
    pub tenant_id: String,
    pub store_id: String,
    pub shift_id: String,
    pub created_by: String,
    pub customer_name: Option<String>,
    pub receipt_number: String,
    pub total_amount: i64,
    pub paid_amount: i64,
    pub balance_due: i64,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub void_reason: Option<String>,
    pub void_by: Option<String>,
    pub void_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Returns the grand total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::new(self.total_amount)
    }
}

/// A line item with price and cost frozen at posting time, so the sale
/// history survives later price edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TransactionItem {
    pub id: String,
    pub transaction_id: String,
    pub variant_id: String,
    pub qty: i64,
    /// Unit price at time of sale (frozen).
    pub unit_price: i64,
    /// Latest known batch cost at time of sale (frozen; 0 if no batch).
    pub cost_price: i64,
    pub discount_amount: i64,
    pub tax_amount: i64,
    pub subtotal: i64,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
