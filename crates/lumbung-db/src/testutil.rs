//! Test fixtures: in-memory database plus seed helpers for the handful of
//! entities the engine operates on. Master-data rows that have no
//! repository (stores, raw stock rows, batches) are inserted directly.

use chrono::Utc;
use std::sync::Once;
use uuid::Uuid;

use lumbung_core::{InventoryStock, Product, ProductType, Shift, Store, Variant};

use crate::pool::{Database, DbConfig};
use crate::repository::product::{CreateProductRequest, CreateVariantRequest};

static TRACING: Once = Once::new();

/// Fresh in-memory database with migrations applied. Engine logs show up
/// under `RUST_LOG=debug cargo test -- --nocapture`.
pub(crate) async fn test_db() -> Database {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
    Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database")
}

pub(crate) async fn seed_store(db: &Database, tenant_id: &str, name: &str) -> Store {
    let now = Utc::now();
    let store = Store {
        id: Uuid::new_v4().to_string(),
        tenant_id: tenant_id.to_string(),
        name: name.to_string(),
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    sqlx::query(
        "INSERT INTO stores (id, tenant_id, name, is_active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(&store.id)
    .bind(&store.tenant_id)
    .bind(&store.name)
    .bind(store.is_active)
    .bind(store.created_at)
    .bind(store.updated_at)
    .execute(db.pool())
    .await
    .expect("seed store");
    store
}

/// PHYSICAL product with one base variant priced at `price`.
pub(crate) async fn seed_simple_product(
    db: &Database,
    tenant_id: &str,
    name: &str,
    sku: &str,
    price: i64,
) -> (Product, Variant) {
    let product = db
        .products()
        .create_product(CreateProductRequest {
            tenant_id: tenant_id.to_string(),
            name: name.to_string(),
            product_type: ProductType::Physical,
            default_margin: None,
        })
        .await
        .expect("seed product");
    let variant = db
        .products()
        .create_variant(CreateVariantRequest {
            tenant_id: tenant_id.to_string(),
            product_id: product.id.clone(),
            name: format!("{name} 1pcs"),
            sku: sku.to_string(),
            unit_name: "pcs".to_string(),
            multiplier: 1,
            price,
            parent_variant_id: None,
        })
        .await
        .expect("seed base variant");
    (product, variant)
}

/// Derived variant on top of an existing base.
pub(crate) async fn seed_derived_variant(
    db: &Database,
    tenant_id: &str,
    product_id: &str,
    parent_id: &str,
    sku: &str,
    multiplier: i64,
) -> Variant {
    db.products()
        .create_variant(CreateVariantRequest {
            tenant_id: tenant_id.to_string(),
            product_id: product_id.to_string(),
            name: format!("derived {sku}"),
            sku: sku.to_string(),
            unit_name: "pack".to_string(),
            multiplier,
            price: 0,
            parent_variant_id: Some(parent_id.to_string()),
        })
        .await
        .expect("seed derived variant")
}

/// PARCEL product with its sellable bundle variant (components added by the
/// caller).
pub(crate) async fn seed_parcel(
    db: &Database,
    tenant_id: &str,
    name: &str,
    sku: &str,
    price: i64,
) -> Variant {
    let product = db
        .products()
        .create_product(CreateProductRequest {
            tenant_id: tenant_id.to_string(),
            name: name.to_string(),
            product_type: ProductType::Parcel,
            default_margin: None,
        })
        .await
        .expect("seed parcel product");
    db.products()
        .create_variant(CreateVariantRequest {
            tenant_id: tenant_id.to_string(),
            product_id: product.id,
            name: name.to_string(),
            sku: sku.to_string(),
            unit_name: "paket".to_string(),
            multiplier: 1,
            price,
            parent_variant_id: None,
        })
        .await
        .expect("seed parcel variant")
}

/// DIGITAL product (no stock) with one sellable variant.
pub(crate) async fn seed_digital(
    db: &Database,
    tenant_id: &str,
    name: &str,
    sku: &str,
    price: i64,
) -> Variant {
    let product = db
        .products()
        .create_product(CreateProductRequest {
            tenant_id: tenant_id.to_string(),
            name: name.to_string(),
            product_type: ProductType::Digital,
            default_margin: None,
        })
        .await
        .expect("seed digital product");
    db.products()
        .create_variant(CreateVariantRequest {
            tenant_id: tenant_id.to_string(),
            product_id: product.id,
            name: name.to_string(),
            sku: sku.to_string(),
            unit_name: "pcs".to_string(),
            multiplier: 1,
            price,
            parent_variant_id: None,
        })
        .await
        .expect("seed digital variant")
}

/// Raw stock row, bypassing the ledger (so tests control the exact state).
pub(crate) async fn seed_stock(
    db: &Database,
    variant_id: &str,
    store_id: &str,
    qty: i64,
) -> InventoryStock {
    let now = Utc::now();
    let stock = InventoryStock {
        id: Uuid::new_v4().to_string(),
        variant_id: variant_id.to_string(),
        store_id: store_id.to_string(),
        stock_qty: qty,
        created_at: now,
        updated_at: now,
    };
    sqlx::query(
        "INSERT INTO inventory_stock (id, variant_id, store_id, stock_qty, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(&stock.id)
    .bind(&stock.variant_id)
    .bind(&stock.store_id)
    .bind(stock.stock_qty)
    .bind(stock.created_at)
    .bind(stock.updated_at)
    .execute(db.pool())
    .await
    .expect("seed stock");
    stock
}

/// Costing batch with a fixed created_at so FIFO ordering is deterministic.
pub(crate) async fn seed_batch(
    db: &Database,
    stock_id: &str,
    qty: i64,
    purchase_price: i64,
    created_at: &str,
) -> String {
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO stock_batches
            (id, inventory_stock_id, qty, purchase_price, unit_price, created_at)
         VALUES (?1, ?2, ?3, ?4, 0, ?5)",
    )
    .bind(&id)
    .bind(stock_id)
    .bind(qty)
    .bind(purchase_price)
    .bind(created_at)
    .execute(db.pool())
    .await
    .expect("seed batch");
    id
}

/// Opens a shift with a zero float.
pub(crate) async fn open_shift(
    db: &Database,
    tenant_id: &str,
    store_id: &str,
    user_id: &str,
) -> Shift {
    db.shifts()
        .open_shift(tenant_id, store_id, user_id, 0)
        .await
        .expect("open shift")
}

/// Current quantity of the (variant, store) row; panics if the row is
/// missing (seed it first).
pub(crate) async fn stock_qty(db: &Database, variant_id: &str, store_id: &str) -> i64 {
    let (qty,): (i64,) = sqlx::query_as(
        "SELECT stock_qty FROM inventory_stock WHERE variant_id = ?1 AND store_id = ?2",
    )
    .bind(variant_id)
    .bind(store_id)
    .fetch_one(db.pool())
    .await
    .expect("stock row present");
    qty
}
