//! # Unit Graph Resolver
//!
//! Resolves a sellable variant to the stock row(s) that physically back it.
//!
//! ## Resolution Paths
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  variant ──product_type──┬── DIGITAL  → no stock (None)                │
//! │                          │                                              │
//! │                          ├── PHYSICAL → walk parent chain to the base  │
//! │                          │              variant, load its stock row    │
//! │                          │              → Simple { stock, multiplier } │
//! │                          │                                              │
//! │                          └── PARCEL   → load bundle_components; walk   │
//! │                                         each component to ITS base     │
//! │                                         → Bundle { components }        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The loaded `StockSource` is pure data; the math (bottleneck rule,
//! deduction scaling) lives in lumbung-core so it stays testable without a
//! database. A missing stock row is `NotFound`, deliberately distinct from
//! a present row with quantity zero.

use sqlx::SqliteConnection;
use tracing::debug;

use lumbung_core::unit_graph::{BundleSource, StockSource};
use lumbung_core::{CoreError, ProductType, Variant, MAX_UNIT_DEPTH};

use crate::error::{DbError, DbResult};
use crate::repository::product::{fetch_bundle_components, fetch_product, fetch_variant};
use crate::repository::stock::fetch_stock;

/// Resolves variants to their backing stock inside an open transaction.
pub struct UnitGraphResolver;

impl UnitGraphResolver {
    /// Resolves `variant_id` at `store_id`.
    ///
    /// Returns `None` for DIGITAL goods (no stock to resolve).
    ///
    /// ## Errors
    /// - `NotFound` — variant outside the tenant, or no stock row at the store
    /// - `EmptyBundle` — PARCEL variant with zero components
    /// - `UnitGraphTooDeep` — runaway parent chain (corrupt data; write-time
    ///   validation should have prevented it)
    pub async fn resolve(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        variant_id: &str,
        store_id: &str,
    ) -> DbResult<Option<StockSource>> {
        let variant = fetch_variant(conn, tenant_id, variant_id).await?;
        let product = fetch_product(conn, tenant_id, &variant.product_id).await?;

        match product.product_type {
            ProductType::Digital => Ok(None),

            ProductType::Physical => {
                let source = Self::resolve_simple(conn, tenant_id, &variant, store_id).await?;
                Ok(Some(source))
            }

            ProductType::Parcel => {
                let components = fetch_bundle_components(conn, &variant.id).await?;
                if components.is_empty() {
                    return Err(CoreError::EmptyBundle {
                        name: variant.name.clone(),
                    }
                    .into());
                }

                let mut resolved = Vec::with_capacity(components.len());
                for component in &components {
                    let comp_variant =
                        fetch_variant(conn, tenant_id, &component.component_variant_id).await?;
                    let base = Self::walk_to_base(conn, tenant_id, &comp_variant).await?;
                    let stock = fetch_stock(conn, &base.id, store_id)
                        .await?
                        .ok_or_else(|| stock_not_found(&comp_variant.name, store_id))?;
                    resolved.push(BundleSource {
                        stock,
                        multiplier: comp_variant.multiplier,
                        qty_needed: component.qty,
                        display_name: comp_variant.name.clone(),
                    });
                }

                debug!(
                    variant_id,
                    components = resolved.len(),
                    "Resolved parcel stock source"
                );
                Ok(Some(StockSource::Bundle {
                    components: resolved,
                }))
            }
        }
    }

    /// Resolves a plain or derived variant to `Simple`.
    async fn resolve_simple(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        variant: &Variant,
        store_id: &str,
    ) -> DbResult<StockSource> {
        let base = Self::walk_to_base(conn, tenant_id, variant).await?;
        let stock = fetch_stock(conn, &base.id, store_id)
            .await?
            .ok_or_else(|| stock_not_found(&variant.name, store_id))?;

        Ok(StockSource::Simple {
            stock,
            multiplier: variant.multiplier,
            display_name: variant.name.clone(),
        })
    }

    /// Follows the parent chain until a variant with no parent. Bounded by
    /// [`MAX_UNIT_DEPTH`] so a cycle that slipped past write validation
    /// surfaces as an error instead of a hang.
    pub(crate) async fn walk_to_base(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        variant: &Variant,
    ) -> DbResult<Variant> {
        let mut current = variant.clone();
        for _ in 0..=MAX_UNIT_DEPTH {
            match &current.parent_variant_id {
                None => return Ok(current),
                Some(parent_id) => {
                    current = fetch_variant(conn, tenant_id, parent_id).await?;
                }
            }
        }
        Err(DbError::Core(CoreError::UnitGraphTooDeep {
            variant_id: variant.id.clone(),
        }))
    }
}

fn stock_not_found(variant_name: &str, store_id: &str) -> DbError {
    DbError::not_found("Stock", format!("{variant_name} at store {store_id}"))
}

// =============================================================================
// Unit Tests
// =============================================================================
