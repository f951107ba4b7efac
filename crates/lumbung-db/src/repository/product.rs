//! # Product & Variant Repository
//!
//! Master data behind the engine: products, sellable variants, parcel
//! composition, and the unit-graph edges between variants.
//!
//! ## Write-Time Graph Validation
//! The parent chain invariants (acyclic, bounded depth, one base unit per
//! product) are enforced HERE, when an edge is written, so the read-side
//! resolver can trust the graph and treat a runaway chain as data
//! corruption rather than normal input.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use lumbung_core::unit_graph::ensure_acyclic;
use lumbung_core::{BundleComponent, CoreError, Product, ProductType, Variant};

use crate::error::{DbError, DbResult};

// =============================================================================
// Requests
// =============================================================================

/// Input for creating a product.
#[derive(Debug, Clone)]
pub struct CreateProductRequest {
    pub tenant_id: String,
    pub name: String,
    pub product_type: ProductType,
    /// Margin used by the stock-in price suggestion; None falls back to the
    /// engine default.
    pub default_margin: Option<f64>,
}

/// Input for creating a variant.
#[derive(Debug, Clone)]
pub struct CreateVariantRequest {
    pub tenant_id: String,
    pub product_id: String,
    pub name: String,
    pub sku: String,
    pub unit_name: String,
    pub multiplier: i64,
    pub price: i64,
    pub parent_variant_id: Option<String>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for products, variants and bundle composition.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Finds a product by ID within a tenant.
    pub async fn product(&self, tenant_id: &str, product_id: &str) -> DbResult<Product> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, tenant_id, product_id).await
    }

    /// Finds a variant by ID within a tenant.
    pub async fn variant(&self, tenant_id: &str, variant_id: &str) -> DbResult<Variant> {
        let mut conn = self.pool.acquire().await?;
        fetch_variant(&mut conn, tenant_id, variant_id).await
    }

    /// Finds a variant by SKU within a tenant (barcode scan path).
    pub async fn variant_by_sku(&self, tenant_id: &str, sku: &str) -> DbResult<Variant> {
        sqlx::query_as::<_, Variant>(
            "SELECT * FROM product_variants WHERE tenant_id = ?1 AND sku = ?2",
        )
        .bind(tenant_id)
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Variant", sku))
    }

    /// All variants of a product, base unit first.
    pub async fn variants_of(&self, tenant_id: &str, product_id: &str) -> DbResult<Vec<Variant>> {
        let variants = sqlx::query_as::<_, Variant>(
            "SELECT * FROM product_variants
             WHERE tenant_id = ?1 AND product_id = ?2
             ORDER BY is_base_unit DESC, multiplier ASC",
        )
        .bind(tenant_id)
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(variants)
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Creates a product.
    pub async fn create_product(&self, req: CreateProductRequest) -> DbResult<Product> {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            tenant_id: req.tenant_id,
            name: req.name,
            product_type: req.product_type,
            default_margin: req.default_margin,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO products
                (id, tenant_id, name, product_type, default_margin, is_active,
                 created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&product.id)
        .bind(&product.tenant_id)
        .bind(&product.name)
        .bind(product.product_type)
        .bind(product.default_margin)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        info!(product_id = %product.id, name = %product.name, "Product created");
        Ok(product)
    }

    /// Creates a variant.
    ///
    /// ## Graph Invariants Enforced
    /// - `multiplier >= 1`
    /// - at most one base unit (multiplier 1, no parent) per product
    /// - a parent edge must not create a cycle or exceed the depth bound
    /// - the parent must belong to the same product
    pub async fn create_variant(&self, req: CreateVariantRequest) -> DbResult<Variant> {
        if req.multiplier < 1 {
            return Err(CoreError::Validation(
                lumbung_core::ValidationError::OutOfRange {
                    field: "multiplier".to_string(),
                    min: 1,
                    max: i64::MAX,
                },
            )
            .into());
        }

        let mut conn = self.pool.acquire().await?;

        // Ownership check before any graph work
        fetch_product(&mut conn, &req.tenant_id, &req.product_id).await?;

        let is_base_unit = req.parent_variant_id.is_none() && req.multiplier == 1;
        if is_base_unit {
            let existing: Option<(String,)> = sqlx::query_as(
                "SELECT id FROM product_variants
                 WHERE product_id = ?1 AND is_base_unit = 1",
            )
            .bind(&req.product_id)
            .fetch_optional(&mut *conn)
            .await?;
            if existing.is_some() {
                return Err(CoreError::Conflict(
                    "product already has a base unit variant".to_string(),
                )
                .into());
            }
        }

        if let Some(parent_id) = &req.parent_variant_id {
            let parent = fetch_variant(&mut conn, &req.tenant_id, parent_id).await?;
            if parent.product_id != req.product_id {
                return Err(CoreError::Validation(lumbung_core::ValidationError::Invalid(
                    "parent variant belongs to a different product".to_string(),
                ))
                .into());
            }
        }

        let now = Utc::now();
        let variant = Variant {
            id: Uuid::new_v4().to_string(),
            tenant_id: req.tenant_id,
            product_id: req.product_id,
            name: req.name,
            sku: req.sku,
            unit_name: req.unit_name,
            multiplier: req.multiplier,
            price: req.price,
            parent_variant_id: req.parent_variant_id,
            is_base_unit,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO product_variants
                (id, tenant_id, product_id, name, sku, unit_name, multiplier,
                 price, parent_variant_id, is_base_unit, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )
        .bind(&variant.id)
        .bind(&variant.tenant_id)
        .bind(&variant.product_id)
        .bind(&variant.name)
        .bind(&variant.sku)
        .bind(&variant.unit_name)
        .bind(variant.multiplier)
        .bind(variant.price)
        .bind(&variant.parent_variant_id)
        .bind(variant.is_base_unit)
        .bind(variant.created_at)
        .bind(variant.updated_at)
        .execute(&mut *conn)
        .await?;

        info!(
            variant_id = %variant.id,
            sku = %variant.sku,
            multiplier = variant.multiplier,
            "Variant created"
        );
        Ok(variant)
    }

    /// Re-points a variant's parent edge, rejecting cycles.
    pub async fn set_variant_parent(
        &self,
        tenant_id: &str,
        variant_id: &str,
        new_parent_id: &str,
    ) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;

        let variant = fetch_variant(&mut conn, tenant_id, variant_id).await?;
        let parent = fetch_variant(&mut conn, tenant_id, new_parent_id).await?;
        if parent.product_id != variant.product_id {
            return Err(CoreError::Validation(lumbung_core::ValidationError::Invalid(
                "parent variant belongs to a different product".to_string(),
            ))
            .into());
        }

        let parents = parent_map(&mut conn, tenant_id, &variant.product_id).await?;
        ensure_acyclic(variant_id, new_parent_id, &parents).map_err(DbError::Core)?;

        sqlx::query(
            "UPDATE product_variants
             SET parent_variant_id = ?1, is_base_unit = 0, updated_at = ?2
             WHERE id = ?3",
        )
        .bind(new_parent_id)
        .bind(Utc::now())
        .bind(variant_id)
        .execute(&mut *conn)
        .await?;

        debug!(variant_id, new_parent_id, "Variant parent updated");
        Ok(())
    }

    /// Adds a bundle component edge to a PARCEL variant.
    pub async fn add_bundle_component(
        &self,
        tenant_id: &str,
        parcel_variant_id: &str,
        component_variant_id: &str,
        qty: i64,
    ) -> DbResult<BundleComponent> {
        lumbung_core::validation::validate_positive_qty("qty", qty)?;

        let mut conn = self.pool.acquire().await?;

        let parcel = fetch_variant(&mut conn, tenant_id, parcel_variant_id).await?;
        let product = fetch_product(&mut conn, tenant_id, &parcel.product_id).await?;
        if product.product_type != ProductType::Parcel {
            return Err(CoreError::Validation(lumbung_core::ValidationError::Invalid(
                "components can only be added to a PARCEL variant".to_string(),
            ))
            .into());
        }
        fetch_variant(&mut conn, tenant_id, component_variant_id).await?;

        let component = BundleComponent {
            id: Uuid::new_v4().to_string(),
            parcel_variant_id: parcel_variant_id.to_string(),
            component_variant_id: component_variant_id.to_string(),
            qty,
        };

        sqlx::query(
            "INSERT INTO bundle_components
                (id, parcel_variant_id, component_variant_id, qty)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&component.id)
        .bind(&component.parcel_variant_id)
        .bind(&component.component_variant_id)
        .bind(component.qty)
        .execute(&mut *conn)
        .await?;

        Ok(component)
    }
}

// =============================================================================
// Connection-Scoped Helpers (shared with engine services)
// =============================================================================

/// Fetches a variant inside an open transaction or borrowed connection.
pub(crate) async fn fetch_variant(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    variant_id: &str,
) -> DbResult<Variant> {
    sqlx::query_as::<_, Variant>(
        "SELECT * FROM product_variants WHERE tenant_id = ?1 AND id = ?2",
    )
    .bind(tenant_id)
    .bind(variant_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("Variant", variant_id))
}

/// Fetches a product inside an open transaction or borrowed connection.
pub(crate) async fn fetch_product(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    product_id: &str,
) -> DbResult<Product> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE tenant_id = ?1 AND id = ?2")
        .bind(tenant_id)
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Product", product_id))
}

/// Bundle components of a parcel variant.
pub(crate) async fn fetch_bundle_components(
    conn: &mut SqliteConnection,
    parcel_variant_id: &str,
) -> DbResult<Vec<BundleComponent>> {
    let components = sqlx::query_as::<_, BundleComponent>(
        "SELECT * FROM bundle_components WHERE parcel_variant_id = ?1",
    )
    .bind(parcel_variant_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(components)
}

/// The variant → parent edges for one product, as the map shape the
/// unit-graph validators consume.
pub(crate) async fn parent_map(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    product_id: &str,
) -> DbResult<HashMap<String, Option<String>>> {
    let rows: Vec<(String, Option<String>)> = sqlx::query_as(
        "SELECT id, parent_variant_id FROM product_variants
         WHERE tenant_id = ?1 AND product_id = ?2",
    )
    .bind(tenant_id)
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().collect())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    #[tokio::test]
    async fn test_create_product_and_variants() {
        let db = testutil::test_db().await;
        let repo = db.products();

        let product = repo
            .create_product(CreateProductRequest {
                tenant_id: "t1".to_string(),
                name: "Beras Rojolele".to_string(),
                product_type: ProductType::Physical,
                default_margin: Some(0.15),
            })
            .await
            .unwrap();

        let base = repo
            .create_variant(CreateVariantRequest {
                tenant_id: "t1".to_string(),
                product_id: product.id.clone(),
                name: "Beras 1kg".to_string(),
                sku: "BRS-1".to_string(),
                unit_name: "kg".to_string(),
                multiplier: 1,
                price: 15_000,
                parent_variant_id: None,
            })
            .await
            .unwrap();
        assert!(base.is_base_unit);

        let dus = repo
            .create_variant(CreateVariantRequest {
                tenant_id: "t1".to_string(),
                product_id: product.id.clone(),
                name: "Beras 1 dus".to_string(),
                sku: "BRS-DUS".to_string(),
                unit_name: "dus".to_string(),
                multiplier: 12,
                price: 170_000,
                parent_variant_id: Some(base.id.clone()),
            })
            .await
            .unwrap();
        assert!(!dus.is_base_unit);
        assert_eq!(dus.parent_variant_id.as_deref(), Some(base.id.as_str()));
    }

    #[tokio::test]
    async fn test_second_base_unit_rejected() {
        let db = testutil::test_db().await;
        let repo = db.products();
        let (_, base) = testutil::seed_simple_product(&db, "t1", "Gula", "GLA", 12_000).await;

        let err = repo
            .create_variant(CreateVariantRequest {
                tenant_id: "t1".to_string(),
                product_id: base.product_id.clone(),
                name: "Gula duplicate base".to_string(),
                sku: "GLA-2".to_string(),
                unit_name: "pcs".to_string(),
                multiplier: 1,
                price: 12_000,
                parent_variant_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected_per_tenant() {
        let db = testutil::test_db().await;
        let repo = db.products();
        let (product, _) = testutil::seed_simple_product(&db, "t1", "Kopi", "KOP", 5_000).await;

        let err = repo
            .create_variant(CreateVariantRequest {
                tenant_id: "t1".to_string(),
                product_id: product.id.clone(),
                name: "Kopi sachet".to_string(),
                sku: "KOP".to_string(),
                unit_name: "pcs".to_string(),
                multiplier: 2,
                price: 9_000,
                parent_variant_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_set_parent_rejects_cycle() {
        let db = testutil::test_db().await;
        let repo = db.products();
        let (product, base) = testutil::seed_simple_product(&db, "t1", "Teh", "TEH", 3_000).await;

        let dus = repo
            .create_variant(CreateVariantRequest {
                tenant_id: "t1".to_string(),
                product_id: product.id.clone(),
                name: "Teh 1 dus".to_string(),
                sku: "TEH-DUS".to_string(),
                unit_name: "dus".to_string(),
                multiplier: 24,
                price: 70_000,
                parent_variant_id: Some(base.id.clone()),
            })
            .await
            .unwrap();

        // base -> dus would close the loop dus -> base
        let err = repo
            .set_variant_parent("t1", &base.id, &dus.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::UnitGraphCycle { .. })
        ));
    }

    #[tokio::test]
    async fn test_tenant_isolation_on_lookup() {
        let db = testutil::test_db().await;
        let (_, base) = testutil::seed_simple_product(&db, "t1", "Susu", "SSU", 18_000).await;

        let err = db.products().variant("t2", &base.id).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
