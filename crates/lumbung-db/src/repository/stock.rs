//! # Stock Read Repository
//!
//! Read-side views over `inventory_stock` and the append-only
//! `inventory_logs` trail. All mutations go through the stock ledger; this
//! repository never writes.

use sqlx::{SqliteConnection, SqlitePool};
use serde::Serialize;

use lumbung_core::{InventoryLog, InventoryStock};

use crate::error::DbResult;
use crate::page::{Page, PageRequest};

// =============================================================================
// Read Models
// =============================================================================

/// One row of the stock listing: the stock row joined with its variant.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StockListRow {
    pub stock_id: String,
    pub variant_id: String,
    pub store_id: String,
    pub variant_name: String,
    pub sku: String,
    pub unit_name: String,
    pub stock_qty: i64,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for stock listings and movement history.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Paginated stock listing for one store, newest movement first.
    /// `search` narrows by variant name or SKU.
    pub async fn list_stock(
        &self,
        tenant_id: &str,
        store_id: &str,
        search: Option<&str>,
        page: PageRequest,
    ) -> DbResult<Page<StockListRow>> {
        let pattern = like_pattern(search);

        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*)
             FROM inventory_stock s
             JOIN product_variants v ON v.id = s.variant_id
             WHERE v.tenant_id = ?1 AND s.store_id = ?2
               AND (v.name LIKE ?3 OR v.sku LIKE ?3)",
        )
        .bind(tenant_id)
        .bind(store_id)
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, StockListRow>(
            "SELECT s.id AS stock_id, s.variant_id, s.store_id,
                    v.name AS variant_name, v.sku, v.unit_name,
                    s.stock_qty, s.updated_at
             FROM inventory_stock s
             JOIN product_variants v ON v.id = s.variant_id
             WHERE v.tenant_id = ?1 AND s.store_id = ?2
               AND (v.name LIKE ?3 OR v.sku LIKE ?3)
             ORDER BY s.updated_at DESC
             LIMIT ?4 OFFSET ?5",
        )
        .bind(tenant_id)
        .bind(store_id)
        .bind(&pattern)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(rows, total, page))
    }

    /// Stock rows at or below a threshold, emptiest first. Restock radar for
    /// the storefront dashboard.
    pub async fn low_stock(
        &self,
        tenant_id: &str,
        store_id: &str,
        threshold: i64,
        page: PageRequest,
    ) -> DbResult<Page<StockListRow>> {
        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*)
             FROM inventory_stock s
             JOIN product_variants v ON v.id = s.variant_id
             WHERE v.tenant_id = ?1 AND s.store_id = ?2 AND s.stock_qty <= ?3",
        )
        .bind(tenant_id)
        .bind(store_id)
        .bind(threshold)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, StockListRow>(
            "SELECT s.id AS stock_id, s.variant_id, s.store_id,
                    v.name AS variant_name, v.sku, v.unit_name,
                    s.stock_qty, s.updated_at
             FROM inventory_stock s
             JOIN product_variants v ON v.id = s.variant_id
             WHERE v.tenant_id = ?1 AND s.store_id = ?2 AND s.stock_qty <= ?3
             ORDER BY s.stock_qty ASC
             LIMIT ?4 OFFSET ?5",
        )
        .bind(tenant_id)
        .bind(store_id)
        .bind(threshold)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(rows, total, page))
    }

    /// Movement history for one variant at one store, newest first.
    ///
    /// History lives on the BASE variant's stock row; passing a derived
    /// variant returns the rows of whichever stock row it owns directly
    /// (none, for purely derived variants).
    pub async fn variant_history(
        &self,
        tenant_id: &str,
        variant_id: &str,
        store_id: &str,
        page: PageRequest,
    ) -> DbResult<Page<InventoryLog>> {
        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*)
             FROM inventory_logs l
             JOIN inventory_stock s ON s.id = l.inventory_stock_id
             JOIN product_variants v ON v.id = s.variant_id
             WHERE v.tenant_id = ?1 AND s.variant_id = ?2 AND s.store_id = ?3",
        )
        .bind(tenant_id)
        .bind(variant_id)
        .bind(store_id)
        .fetch_one(&self.pool)
        .await?;

        let logs = sqlx::query_as::<_, InventoryLog>(
            "SELECT l.*
             FROM inventory_logs l
             JOIN inventory_stock s ON s.id = l.inventory_stock_id
             JOIN product_variants v ON v.id = s.variant_id
             WHERE v.tenant_id = ?1 AND s.variant_id = ?2 AND s.store_id = ?3
             ORDER BY l.created_at DESC, l.id DESC
             LIMIT ?4 OFFSET ?5",
        )
        .bind(tenant_id)
        .bind(variant_id)
        .bind(store_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(logs, total, page))
    }
}

// =============================================================================
// Connection-Scoped Helpers (shared with engine services)
// =============================================================================

/// LIKE pattern for an optional search term. None (or a blank term) matches
/// every row, so listings can share one static query.
pub(crate) fn like_pattern(search: Option<&str>) -> String {
    match search.map(str::trim) {
        Some(term) if !term.is_empty() => format!("%{term}%"),
        _ => "%".to_string(),
    }
}

/// The stock row for (variant, store), if one exists. Callers decide whether
/// a missing row is NotFound (mutations) or displayed as zero (opname prep).
pub(crate) async fn fetch_stock(
    conn: &mut SqliteConnection,
    variant_id: &str,
    store_id: &str,
) -> DbResult<Option<InventoryStock>> {
    let stock = sqlx::query_as::<_, InventoryStock>(
        "SELECT * FROM inventory_stock WHERE variant_id = ?1 AND store_id = ?2",
    )
    .bind(variant_id)
    .bind(store_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(stock)
}

/// The stock row by primary key.
pub(crate) async fn fetch_stock_by_id(
    conn: &mut SqliteConnection,
    stock_id: &str,
) -> DbResult<Option<InventoryStock>> {
    let stock =
        sqlx::query_as::<_, InventoryStock>("SELECT * FROM inventory_stock WHERE id = ?1")
            .bind(stock_id)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(stock)
}

/// Validates that a store exists and belongs to the tenant.
pub(crate) async fn ensure_store(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    store_id: &str,
) -> DbResult<()> {
    let found: Option<(String,)> =
        sqlx::query_as("SELECT id FROM stores WHERE tenant_id = ?1 AND id = ?2")
            .bind(tenant_id)
            .bind(store_id)
            .fetch_optional(&mut *conn)
            .await?;
    match found {
        Some(_) => Ok(()),
        None => Err(crate::error::DbError::not_found("Store", store_id)),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
