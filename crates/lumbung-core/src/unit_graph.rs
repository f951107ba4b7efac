//! # Unit Graph
//!
//! Pure math for resolving a sellable variant to the stock that physically
//! backs it.
//!
//! ## The Three Shapes of a Variant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  BASE UNIT          DERIVED (grosir)          PARCEL (bundle)          │
//! │  ─────────          ────────────────          ────────────────         │
//! │  "Beras 1kg"        "Beras 1 dus"             "Paket Sembako"          │
//! │  multiplier=1       multiplier=12             no stock of its own      │
//! │  owns the stock     parent = "Beras 1kg"      components:              │
//! │  row                stock row = parent's        2 × "Beras 1kg"        │
//! │                     sellable = floor(stock/12)  1 × "Minyak 1L"        │
//! │                                                sellable = bottleneck   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Bottleneck Rule
//! A parcel cannot be sold if any ingredient is short, so its sellable
//! quantity is the MINIMUM across components of
//! `floor(floor(component_stock / component_multiplier) / qty_needed)`.
//!
//! The db-side resolver loads the live rows; everything in this module is a
//! pure function over the loaded data, so the whole conversion model is
//! testable without a database.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::types::InventoryStock;
use crate::MAX_UNIT_DEPTH;

// =============================================================================
// Stock Source
// =============================================================================

/// Where a variant's stock physically lives, with the conversion factors
/// needed to move between the variant's unit and base units.
///
/// Modeled as a tagged enum so resolution logic lives in one place instead
/// of type-string branches scattered across call sites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StockSource {
    /// A plain or derived variant: one backing stock row.
    Simple {
        stock: InventoryStock,
        /// Base units per one sold unit of the variant.
        multiplier: i64,
        /// Variant name, carried for error messages.
        display_name: String,
    },
    /// A parcel: one entry per bundle component.
    Bundle { components: Vec<BundleSource> },
}

/// One resolved bundle component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleSource {
    pub stock: InventoryStock,
    /// Base units per one unit of the component variant.
    pub multiplier: i64,
    /// Component units needed per parcel.
    pub qty_needed: i64,
    pub display_name: String,
}

/// A queued stock decrement produced by [`StockSource::deductions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deduction {
    pub stock_id: String,
    pub display_name: String,
    /// Base units to remove from the stock row.
    pub qty: i64,
}

impl StockSource {
    /// How many units of the variant the current stock supports.
    ///
    /// Zero is a valid answer ("out of stock") and distinct from a missing
    /// stock row, which the resolver reports as NotFound before this is
    /// ever reached.
    pub fn sellable_qty(&self) -> i64 {
        match self {
            StockSource::Simple {
                stock, multiplier, ..
            } => in_unit(stock.stock_qty, *multiplier),
            StockSource::Bundle { components } => components
                .iter()
                .map(|c| in_unit(c.stock.stock_qty, c.multiplier) / c.qty_needed.max(1))
                .min()
                .unwrap_or(0),
        }
    }

    /// The base-unit decrements required to sell `qty_sold` units.
    ///
    /// Simple: one decrement of `qty_sold × multiplier`.
    /// Bundle: per component, `qty_sold × qty_needed × multiplier`.
    pub fn deductions(&self, qty_sold: i64) -> Vec<Deduction> {
        match self {
            StockSource::Simple {
                stock,
                multiplier,
                display_name,
            } => vec![Deduction {
                stock_id: stock.id.clone(),
                display_name: display_name.clone(),
                qty: qty_sold * multiplier,
            }],
            StockSource::Bundle { components } => components
                .iter()
                .map(|c| Deduction {
                    stock_id: c.stock.id.clone(),
                    display_name: c.display_name.clone(),
                    qty: qty_sold * c.qty_needed * c.multiplier,
                })
                .collect(),
        }
    }
}

/// Converts a base-unit quantity into the variant's own unit (floor).
#[inline]
pub fn in_unit(base_qty: i64, multiplier: i64) -> i64 {
    base_qty / multiplier.max(1)
}

// =============================================================================
// Parent Chain Validation
// =============================================================================

/// Walks the parent chain from `start` until a variant with no parent,
/// returning the id of that base variant.
///
/// ## Errors
/// - [`CoreError::UnitGraphTooDeep`] when the chain exceeds [`MAX_UNIT_DEPTH`]
///   (which also catches cycles that slipped past write validation)
/// - [`CoreError::NotFound`] when a parent id points at a variant missing
///   from `parent_of`
pub fn walk_to_base<'a>(
    start: &'a str,
    parent_of: &'a HashMap<String, Option<String>>,
) -> CoreResult<&'a str> {
    let mut current = start;
    for _ in 0..=MAX_UNIT_DEPTH {
        match parent_of.get(current) {
            None => return Err(CoreError::not_found("Variant", current)),
            Some(None) => return Ok(current),
            Some(Some(parent)) => current = parent,
        }
    }
    Err(CoreError::UnitGraphTooDeep {
        variant_id: start.to_string(),
    })
}

/// Rejects a parent assignment that would create a cycle or an over-deep
/// chain. Called at write time, before the edge is persisted.
pub fn ensure_acyclic(
    variant_id: &str,
    new_parent_id: &str,
    parent_of: &HashMap<String, Option<String>>,
) -> CoreResult<()> {
    if variant_id == new_parent_id {
        return Err(CoreError::UnitGraphCycle {
            variant_id: variant_id.to_string(),
        });
    }

    let mut current = new_parent_id;
    for _ in 0..=MAX_UNIT_DEPTH {
        match parent_of.get(current) {
            None => return Err(CoreError::not_found("Variant", current)),
            Some(None) => return Ok(()),
            Some(Some(parent)) => {
                if parent == variant_id {
                    return Err(CoreError::UnitGraphCycle {
                        variant_id: variant_id.to_string(),
                    });
                }
                current = parent;
            }
        }
    }
    Err(CoreError::UnitGraphTooDeep {
        variant_id: variant_id.to_string(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
