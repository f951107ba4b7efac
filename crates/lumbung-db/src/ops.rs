//! # Stock Mutation Operations
//!
//! The five inbound/outbound/corrective stock operations, each one atomic
//! database transaction:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stock_in     RESTOCK       + margin-rule price suggestion + batch     │
//! │  adjust       ADJUSTMENT    signed delta on an existing row            │
//! │  transfer     TRANSFER_OUT / TRANSFER_IN, one shared reference         │
//! │  opname       ADJUSTMENT    physical count, OPN-<year>-NNN reference   │
//! │  stock_out    WASTE/EXPIRED/DAMAGE/LOST, FIFO batch drain              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every operation validates its whole input (tenant ownership included)
//! before the first write; any failure rolls back every write.

use chrono::{Datelike, Utc};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use lumbung_core::pricing::suggest_price;
use lumbung_core::validation::{
    validate_actual_qty, validate_adjustment_delta, validate_non_empty_batch,
    validate_positive_qty, validate_required, validate_transfer_stores,
};
use lumbung_core::{
    InventoryLog, InventoryStock, Money, StockLogType, ValidationError, Variant, DEFAULT_MARGIN,
};

use crate::error::{DbError, DbResult};
use crate::ledger::StockLedger;
use crate::page::{Page, PageRequest};
use crate::repository::product::{fetch_product, fetch_variant};
use crate::repository::stock::{ensure_store, fetch_stock, like_pattern};
use crate::resolver::UnitGraphResolver;

// =============================================================================
// Requests & Results
// =============================================================================

/// Goods received from a supplier.
#[derive(Debug, Clone)]
pub struct StockInRequest {
    pub tenant_id: String,
    pub store_id: String,
    pub variant_id: String,
    /// Quantity in the purchased variant's own unit.
    pub qty: i64,
    /// Purchase cost per unit of the purchased variant, integer rupiah.
    pub cost_price: i64,
    pub batch_number: Option<String>,
    pub supplier_id: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StockInResult {
    pub stock: InventoryStock,
    pub batch_id: String,
    /// Set when the margin rule raised the variant's sale price.
    pub new_price: Option<i64>,
}

/// Manual correction with a mandatory reason.
#[derive(Debug, Clone)]
pub struct AdjustmentRequest {
    pub tenant_id: String,
    pub store_id: String,
    pub variant_id: String,
    /// Signed delta, never zero.
    pub delta: i64,
    pub reason: String,
}

/// Inter-store movement.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub tenant_id: String,
    pub variant_id: String,
    pub from_store_id: String,
    pub to_store_id: String,
    /// Quantity in the variant's own unit.
    pub qty: i64,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferResult {
    /// Shared reference written on both the OUT and IN log rows.
    pub reference_id: String,
    pub base_qty: i64,
}

/// One counted line of a stock opname.
#[derive(Debug, Clone)]
pub struct OpnameItem {
    pub variant_id: String,
    pub actual_qty: i64,
    pub note: Option<String>,
}

/// A full physical count session for one store.
#[derive(Debug, Clone)]
pub struct OpnameRequest {
    pub tenant_id: String,
    pub store_id: String,
    pub auditor: String,
    pub items: Vec<OpnameItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpnameAuditRow {
    pub variant_id: String,
    pub variant_name: String,
    pub system_qty: i64,
    pub actual_qty: i64,
    pub difference: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpnameResult {
    /// `OPN-<year>-NNN`, shared by every log row of the session.
    pub reference_id: String,
    pub rows: Vec<OpnameAuditRow>,
}

/// Goods written off: waste, expiry, damage, loss.
#[derive(Debug, Clone)]
pub struct StockOutRequest {
    pub tenant_id: String,
    pub store_id: String,
    pub variant_id: String,
    /// Quantity in the variant's own unit.
    pub qty: i64,
    /// One of the loss tags (WASTE, EXPIRED, DAMAGE, LOST).
    pub loss_type: StockLogType,
    pub note: Option<String>,
}

/// One row of the opname preparation sheet.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OpnameProductRow {
    pub variant_id: String,
    pub variant_name: String,
    pub sku: String,
    pub unit_name: String,
    /// 0 when no stock row exists yet; display-only tolerance, the
    /// mutation paths still treat a missing row as NotFound.
    pub system_qty: i64,
}

/// One past opname session, summarized from its log rows.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OpnameSessionRow {
    pub reference_id: String,
    pub item_count: i64,
    pub total_difference: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

// =============================================================================
// Service
// =============================================================================

/// Stock mutation engine. Each method opens one SQLite transaction.
#[derive(Debug, Clone)]
pub struct InventoryService {
    pool: SqlitePool,
}

impl InventoryService {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryService { pool }
    }

    // -------------------------------------------------------------------------
    // Stock-In
    // -------------------------------------------------------------------------

    /// Receives goods: increments base stock (RESTOCK log), applies the
    /// margin rule, records a FIFO costing batch.
    ///
    /// ## Margin Rule
    /// When the new cost exceeds the last recorded cost (0 if none), the
    /// variant's sale price is raised to `cost × (1 + margin)` rounded up to
    /// the nearest 500, and a `price_history` row records the cost change.
    pub async fn stock_in(&self, req: StockInRequest) -> DbResult<StockInResult> {
        validate_positive_qty("qty", req.qty)?;
        if req.cost_price < 0 {
            return Err(ValidationError::MustBePositive {
                field: "cost_price".to_string(),
            }
            .into());
        }

        let mut tx = self.pool.begin().await?;

        ensure_store(&mut tx, &req.tenant_id, &req.store_id).await?;
        let variant = fetch_variant(&mut tx, &req.tenant_id, &req.variant_id).await?;
        let product = fetch_product(&mut tx, &req.tenant_id, &variant.product_id).await?;
        let base = UnitGraphResolver::walk_to_base(&mut tx, &req.tenant_id, &variant).await?;

        let base_qty = req.qty * variant.multiplier;
        let stock = StockLedger::increment(
            &mut tx,
            &base.id,
            &req.store_id,
            base_qty,
            StockLogType::Restock,
            None,
            req.note.as_deref(),
        )
        .await?;

        // Costing batch, in base units. Per-base-unit cost loses sub-rupiah
        // precision for multi-unit purchases; batches are metadata, not
        // authoritative.
        let batch_id = Uuid::new_v4().to_string();
        let unit_cost = req.cost_price / variant.multiplier.max(1);
        sqlx::query(
            "INSERT INTO stock_batches
                (id, inventory_stock_id, qty, purchase_price, unit_price,
                 batch_number, supplier_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&batch_id)
        .bind(&stock.id)
        .bind(base_qty)
        .bind(unit_cost)
        .bind(variant.price)
        .bind(&req.batch_number)
        .bind(&req.supplier_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let last_cost = last_recorded_cost(&mut tx, &variant.id).await?;
        let new_price = if req.cost_price > last_cost {
            let margin = product.default_margin.unwrap_or(DEFAULT_MARGIN);
            let suggested = suggest_price(Money::new(req.cost_price), Some(margin));

            sqlx::query(
                "UPDATE product_variants SET price = ?1, updated_at = ?2 WHERE id = ?3",
            )
            .bind(suggested.amount())
            .bind(Utc::now())
            .bind(&variant.id)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO price_history (id, variant_id, old_price, new_price, note, changed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&variant.id)
            .bind(last_cost)
            .bind(req.cost_price)
            .bind(format!("Restock cost {} > {}", req.cost_price, last_cost))
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

            Some(suggested.amount())
        } else {
            None
        };

        tx.commit().await?;

        info!(
            variant_id = %req.variant_id,
            store_id = %req.store_id,
            base_qty,
            price_updated = new_price.is_some(),
            "Stock-in committed"
        );
        Ok(StockInResult {
            stock,
            batch_id,
            new_price,
        })
    }

    // -------------------------------------------------------------------------
    // Adjustment
    // -------------------------------------------------------------------------

    /// Applies a signed correction to an EXISTING stock row. A missing row
    /// is NotFound, not an implicit create; negative deltas respect the
    /// non-negativity guard.
    pub async fn adjust(&self, req: AdjustmentRequest) -> DbResult<InventoryStock> {
        validate_adjustment_delta(req.delta)?;
        validate_required("reason", &req.reason)?;

        let mut tx = self.pool.begin().await?;

        ensure_store(&mut tx, &req.tenant_id, &req.store_id).await?;
        let variant = fetch_variant(&mut tx, &req.tenant_id, &req.variant_id).await?;
        let stock = fetch_stock(&mut tx, &variant.id, &req.store_id)
            .await?
            .ok_or_else(|| DbError::not_found("Stock", &req.variant_id))?;

        let stock = if req.delta > 0 {
            StockLedger::increment(
                &mut tx,
                &variant.id,
                &req.store_id,
                req.delta,
                StockLogType::Adjustment,
                None,
                Some(&req.reason),
            )
            .await?
        } else {
            StockLedger::decrement(
                &mut tx,
                &stock.id,
                &variant.name,
                -req.delta,
                StockLogType::Adjustment,
                None,
                Some(&req.reason),
            )
            .await?;
            fetch_stock(&mut tx, &variant.id, &req.store_id)
                .await?
                .ok_or_else(|| DbError::Internal("stock row vanished".to_string()))?
        };

        tx.commit().await?;

        info!(
            variant_id = %req.variant_id,
            delta = req.delta,
            new_qty = stock.stock_qty,
            "Adjustment committed"
        );
        Ok(stock)
    }

    // -------------------------------------------------------------------------
    // Transfer
    // -------------------------------------------------------------------------

    /// Moves stock between two stores of the same tenant. Source decrement
    /// and destination increment happen in one transaction; the two log
    /// rows share one generated reference id.
    pub async fn transfer(&self, req: TransferRequest) -> DbResult<TransferResult> {
        validate_positive_qty("qty", req.qty)?;
        validate_transfer_stores(&req.from_store_id, &req.to_store_id)?;

        let mut tx = self.pool.begin().await?;

        ensure_store(&mut tx, &req.tenant_id, &req.from_store_id).await?;
        ensure_store(&mut tx, &req.tenant_id, &req.to_store_id).await?;
        let variant = fetch_variant(&mut tx, &req.tenant_id, &req.variant_id).await?;
        let base = UnitGraphResolver::walk_to_base(&mut tx, &req.tenant_id, &variant).await?;

        let source = fetch_stock(&mut tx, &base.id, &req.from_store_id)
            .await?
            .ok_or_else(|| DbError::not_found("Stock", &req.variant_id))?;

        let reference_id = Uuid::new_v4().to_string();
        let base_qty = req.qty * variant.multiplier;

        StockLedger::decrement(
            &mut tx,
            &source.id,
            &variant.name,
            base_qty,
            StockLogType::TransferOut,
            Some(&reference_id),
            req.note.as_deref(),
        )
        .await?;

        StockLedger::increment(
            &mut tx,
            &base.id,
            &req.to_store_id,
            base_qty,
            StockLogType::TransferIn,
            Some(&reference_id),
            req.note.as_deref(),
        )
        .await?;

        tx.commit().await?;

        info!(
            variant_id = %req.variant_id,
            from = %req.from_store_id,
            to = %req.to_store_id,
            base_qty,
            reference_id = %reference_id,
            "Transfer committed"
        );
        Ok(TransferResult {
            reference_id,
            base_qty,
        })
    }

    // -------------------------------------------------------------------------
    // Opname (physical count)
    // -------------------------------------------------------------------------

    /// Reconciles counted quantities against the system for one store.
    ///
    /// The whole batch is validated (store and every variant) before any
    /// write; one `OPN-<year>-NNN` reference is allocated per session from
    /// the counter table inside the same transaction.
    pub async fn opname(&self, req: OpnameRequest) -> DbResult<OpnameResult> {
        validate_required("auditor", &req.auditor)?;
        validate_non_empty_batch("items", req.items.len())?;
        for item in &req.items {
            validate_actual_qty(item.actual_qty)?;
        }

        let mut tx = self.pool.begin().await?;

        ensure_store(&mut tx, &req.tenant_id, &req.store_id).await?;

        // Validate every variant before the first write
        let mut variants: Vec<Variant> = Vec::with_capacity(req.items.len());
        for item in &req.items {
            let variant = fetch_variant(&mut tx, &req.tenant_id, &item.variant_id).await?;
            if variant.is_derived() {
                return Err(ValidationError::Invalid(format!(
                    "opname counts base units; '{}' is a derived variant",
                    variant.name
                ))
                .into());
            }
            variants.push(variant);
        }

        let reference_id = allocate_opname_reference(&mut tx).await?;

        let mut rows = Vec::with_capacity(req.items.len());
        for (item, variant) in req.items.iter().zip(&variants) {
            let system_qty = fetch_stock(&mut tx, &variant.id, &req.store_id)
                .await?
                .map(|s| s.stock_qty)
                .unwrap_or(0);

            let note = format!(
                "Opname by {}. Sys: {}, Act: {}. Note: {}",
                req.auditor.trim(),
                system_qty,
                item.actual_qty,
                item.note.as_deref().unwrap_or("-"),
            );

            let (previous, actual, _) = StockLedger::set_absolute(
                &mut tx,
                &variant.id,
                &req.store_id,
                item.actual_qty,
                Some(&reference_id),
                Some(&note),
            )
            .await?;

            rows.push(OpnameAuditRow {
                variant_id: variant.id.clone(),
                variant_name: variant.name.clone(),
                system_qty: previous,
                actual_qty: actual,
                difference: actual - previous,
            });
        }

        tx.commit().await?;

        info!(
            reference_id = %reference_id,
            store_id = %req.store_id,
            items = rows.len(),
            "Opname committed"
        );
        Ok(OpnameResult { reference_id, rows })
    }

    /// The preparation sheet for an opname: every base variant of an active
    /// PHYSICAL product, with its system quantity at the store (0 when no row
    /// exists yet). DIGITAL products have nothing to count and deactivated
    /// products stay off the sheet. `search` narrows by variant name or SKU.
    pub async fn products_for_opname(
        &self,
        tenant_id: &str,
        store_id: &str,
        search: Option<&str>,
        page: PageRequest,
    ) -> DbResult<Page<OpnameProductRow>> {
        let pattern = like_pattern(search);

        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*)
             FROM product_variants v
             JOIN products p ON p.id = v.product_id
             WHERE v.tenant_id = ?1 AND v.is_base_unit = 1
               AND p.product_type = 'PHYSICAL' AND p.is_active = 1
               AND (v.name LIKE ?2 OR v.sku LIKE ?2)",
        )
        .bind(tenant_id)
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, OpnameProductRow>(
            "SELECT v.id AS variant_id, v.name AS variant_name, v.sku, v.unit_name,
                    COALESCE(s.stock_qty, 0) AS system_qty
             FROM product_variants v
             JOIN products p ON p.id = v.product_id
             LEFT JOIN inventory_stock s ON s.variant_id = v.id AND s.store_id = ?2
             WHERE v.tenant_id = ?1 AND v.is_base_unit = 1
               AND p.product_type = 'PHYSICAL' AND p.is_active = 1
               AND (v.name LIKE ?3 OR v.sku LIKE ?3)
             ORDER BY v.name ASC
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

    /// Past opname sessions, newest first, summarized from their log rows.
    pub async fn opname_history(
        &self,
        tenant_id: &str,
        page: PageRequest,
    ) -> DbResult<Page<OpnameSessionRow>> {
        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(DISTINCT l.reference_id)
             FROM inventory_logs l
             JOIN inventory_stock s ON s.id = l.inventory_stock_id
             JOIN product_variants v ON v.id = s.variant_id
             WHERE v.tenant_id = ?1 AND l.reference_id LIKE 'OPN-%'",
        )
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, OpnameSessionRow>(
            "SELECT l.reference_id AS reference_id,
                    COUNT(*) AS item_count,
                    SUM(l.qty_change) AS total_difference,
                    MIN(l.created_at) AS created_at
             FROM inventory_logs l
             JOIN inventory_stock s ON s.id = l.inventory_stock_id
             JOIN product_variants v ON v.id = s.variant_id
             WHERE v.tenant_id = ?1 AND l.reference_id LIKE 'OPN-%'
             GROUP BY l.reference_id
             ORDER BY MIN(l.created_at) DESC
             LIMIT ?2 OFFSET ?3",
        )
        .bind(tenant_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(rows, total, page))
    }

    /// Every log row of one opname session.
    pub async fn opname_detail(
        &self,
        tenant_id: &str,
        reference_id: &str,
    ) -> DbResult<Vec<InventoryLog>> {
        let logs = sqlx::query_as::<_, InventoryLog>(
            "SELECT l.*
             FROM inventory_logs l
             JOIN inventory_stock s ON s.id = l.inventory_stock_id
             JOIN product_variants v ON v.id = s.variant_id
             WHERE v.tenant_id = ?1 AND l.reference_id = ?2
             ORDER BY l.created_at ASC, l.id ASC",
        )
        .bind(tenant_id)
        .bind(reference_id)
        .fetch_all(&self.pool)
        .await?;

        if logs.is_empty() {
            return Err(DbError::not_found("Opname", reference_id));
        }
        Ok(logs)
    }

    // -------------------------------------------------------------------------
    // Stock-Out
    // -------------------------------------------------------------------------

    /// Writes stock off with a loss tag. Decrements the backing base row,
    /// drains FIFO batches, and logs the negative delta under the tag.
    pub async fn stock_out(&self, req: StockOutRequest) -> DbResult<InventoryStock> {
        validate_positive_qty("qty", req.qty)?;
        if !req.loss_type.is_loss() {
            return Err(ValidationError::Invalid(format!(
                "'{}' is not a loss type",
                req.loss_type.as_str()
            ))
            .into());
        }

        let mut tx = self.pool.begin().await?;

        ensure_store(&mut tx, &req.tenant_id, &req.store_id).await?;
        let variant = fetch_variant(&mut tx, &req.tenant_id, &req.variant_id).await?;
        let base = UnitGraphResolver::walk_to_base(&mut tx, &req.tenant_id, &variant).await?;

        let stock = fetch_stock(&mut tx, &base.id, &req.store_id)
            .await?
            .ok_or_else(|| DbError::not_found("Stock", &req.variant_id))?;

        let base_qty = req.qty * variant.multiplier;
        StockLedger::decrement(
            &mut tx,
            &stock.id,
            &variant.name,
            base_qty,
            req.loss_type,
            None,
            req.note.as_deref(),
        )
        .await?;

        let stock = fetch_stock(&mut tx, &base.id, &req.store_id)
            .await?
            .ok_or_else(|| DbError::Internal("stock row vanished".to_string()))?;

        tx.commit().await?;

        info!(
            variant_id = %req.variant_id,
            loss_type = req.loss_type.as_str(),
            base_qty,
            "Stock-out committed"
        );
        Ok(stock)
    }
}

// =============================================================================
// Internals
// =============================================================================

/// Last recorded purchase cost for a variant: the `new_price` of the most
/// recent price_history row, 0 when there is none.
async fn last_recorded_cost(conn: &mut SqliteConnection, variant_id: &str) -> DbResult<i64> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT new_price FROM price_history
         WHERE variant_id = ?1
         ORDER BY changed_at DESC, id DESC
         LIMIT 1",
    )
    .bind(variant_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.map(|(p,)| p).unwrap_or(0))
}

/// Allocates the next `OPN-<year>-NNN` reference. The counter upsert runs
/// inside the caller's transaction; SQLite's single-writer rule makes the
/// sequence monotonic without a read-modify-write race.
async fn allocate_opname_reference(conn: &mut SqliteConnection) -> DbResult<String> {
    let year = Utc::now().year();

    sqlx::query(
        "INSERT INTO opname_counters (year, last_seq) VALUES (?1, 1)
         ON CONFLICT (year) DO UPDATE SET last_seq = last_seq + 1",
    )
    .bind(year)
    .execute(&mut *conn)
    .await?;

    let (seq,): (i64,) = sqlx::query_as("SELECT last_seq FROM opname_counters WHERE year = ?1")
        .bind(year)
        .fetch_one(&mut *conn)
        .await?;

    let reference = format!("OPN-{year}-{seq:03}");
    debug!(reference = %reference, "Opname reference allocated");
    Ok(reference)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use lumbung_core::CoreError;

    #[tokio::test]
    async fn test_stock_in_applies_margin_rule() {
        let db = testutil::test_db().await;
        let store = testutil::seed_store(&db, "t1", "Toko A").await;
        // margin 20%: cost 10_000 → 12_000, already a multiple of 500
        let (_, base) = testutil::seed_simple_product(&db, "t1", "Beras", "BRS", 11_000).await;

        let result = db
            .inventory()
            .stock_in(StockInRequest {
                tenant_id: "t1".to_string(),
                store_id: store.id.clone(),
                variant_id: base.id.clone(),
                qty: 10,
                cost_price: 10_100,
                batch_number: None,
                supplier_id: None,
                note: None,
            })
            .await
            .unwrap();

        assert_eq!(result.stock.stock_qty, 10);
        // 10_100 * 1.2 = 12_120 → rounded up to 12_500
        assert_eq!(result.new_price, Some(12_500));

        let variant = db.products().variant("t1", &base.id).await.unwrap();
        assert_eq!(variant.price, 12_500);
    }

    #[tokio::test]
    async fn test_stock_in_cheaper_cost_keeps_price() {
        let db = testutil::test_db().await;
        let store = testutil::seed_store(&db, "t1", "Toko A").await;
        let (_, base) = testutil::seed_simple_product(&db, "t1", "Gula", "GLA", 14_000).await;

        let svc = db.inventory();
        let first = svc
            .stock_in(StockInRequest {
                tenant_id: "t1".to_string(),
                store_id: store.id.clone(),
                variant_id: base.id.clone(),
                qty: 5,
                cost_price: 10_000,
                batch_number: None,
                supplier_id: None,
                note: None,
            })
            .await
            .unwrap();
        assert!(first.new_price.is_some());

        // cheaper restock: no price update, no history row
        let second = svc
            .stock_in(StockInRequest {
                tenant_id: "t1".to_string(),
                store_id: store.id.clone(),
                variant_id: base.id.clone(),
                qty: 5,
                cost_price: 9_000,
                batch_number: None,
                supplier_id: None,
                note: None,
            })
            .await
            .unwrap();
        assert_eq!(second.new_price, None);
        assert_eq!(second.stock.stock_qty, 10);
    }

    #[tokio::test]
    async fn test_adjust_requires_existing_row() {
        let db = testutil::test_db().await;
        let store = testutil::seed_store(&db, "t1", "Toko A").await;
        let (_, base) = testutil::seed_simple_product(&db, "t1", "Kopi", "KOP", 5_000).await;

        let err = db
            .inventory()
            .adjust(AdjustmentRequest {
                tenant_id: "t1".to_string(),
                store_id: store.id.clone(),
                variant_id: base.id.clone(),
                delta: 5,
                reason: "initial count".to_string(),
            })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_adjust_negative_respects_guard() {
        let db = testutil::test_db().await;
        let store = testutil::seed_store(&db, "t1", "Toko A").await;
        let (_, base) = testutil::seed_simple_product(&db, "t1", "Kopi", "KOP", 5_000).await;
        testutil::seed_stock(&db, &base.id, &store.id, 3).await;

        let err = db
            .inventory()
            .adjust(AdjustmentRequest {
                tenant_id: "t1".to_string(),
                store_id: store.id.clone(),
                variant_id: base.id.clone(),
                delta: -10,
                reason: "damaged in storage".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::InsufficientStock { .. })
        ));
    }

    #[tokio::test]
    async fn test_transfer_moves_stock_with_shared_reference() {
        let db = testutil::test_db().await;
        let store_a = testutil::seed_store(&db, "t1", "Toko A").await;
        let store_b = testutil::seed_store(&db, "t1", "Toko B").await;
        let (_, base) = testutil::seed_simple_product(&db, "t1", "Beras", "BRS", 15_000).await;
        testutil::seed_stock(&db, &base.id, &store_a.id, 20).await;

        let result = db
            .inventory()
            .transfer(TransferRequest {
                tenant_id: "t1".to_string(),
                variant_id: base.id.clone(),
                from_store_id: store_a.id.clone(),
                to_store_id: store_b.id.clone(),
                qty: 8,
                note: None,
            })
            .await
            .unwrap();

        assert_eq!(testutil::stock_qty(&db, &base.id, &store_a.id).await, 12);
        assert_eq!(testutil::stock_qty(&db, &base.id, &store_b.id).await, 8);

        // both legs share the reference
        let (legs,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM inventory_logs WHERE reference_id = ?1",
        )
        .bind(&result.reference_id)
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(legs, 2);
    }

    #[tokio::test]
    async fn test_insufficient_transfer_leaves_both_stores_unchanged() {
        let db = testutil::test_db().await;
        let store_a = testutil::seed_store(&db, "t1", "Toko A").await;
        let store_b = testutil::seed_store(&db, "t1", "Toko B").await;
        let (_, base) = testutil::seed_simple_product(&db, "t1", "Beras", "BRS", 15_000).await;
        testutil::seed_stock(&db, &base.id, &store_a.id, 5).await;

        let err = db
            .inventory()
            .transfer(TransferRequest {
                tenant_id: "t1".to_string(),
                variant_id: base.id.clone(),
                from_store_id: store_a.id.clone(),
                to_store_id: store_b.id.clone(),
                qty: 50,
                note: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::InsufficientStock { .. })
        ));

        assert_eq!(testutil::stock_qty(&db, &base.id, &store_a.id).await, 5);
        // destination row never created
        let mut conn = db.pool().acquire().await.unwrap();
        assert!(fetch_stock(&mut conn, &base.id, &store_b.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_same_store_transfer_rejected() {
        let db = testutil::test_db().await;
        let store = testutil::seed_store(&db, "t1", "Toko A").await;
        let (_, base) = testutil::seed_simple_product(&db, "t1", "Beras", "BRS", 15_000).await;

        let err = db
            .inventory()
            .transfer(TransferRequest {
                tenant_id: "t1".to_string(),
                variant_id: base.id.clone(),
                from_store_id: store.id.clone(),
                to_store_id: store.id.clone(),
                qty: 1,
                note: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::Validation(ValidationError::Invalid(_)))
        ));
    }

    #[tokio::test]
    async fn test_opname_writes_delta_with_reference() {
        let db = testutil::test_db().await;
        let store = testutil::seed_store(&db, "t1", "Toko A").await;
        let (_, base) = testutil::seed_simple_product(&db, "t1", "Beras", "BRS", 15_000).await;
        testutil::seed_stock(&db, &base.id, &store.id, 10).await;

        let result = db
            .inventory()
            .opname(OpnameRequest {
                tenant_id: "t1".to_string(),
                store_id: store.id.clone(),
                auditor: "Budi".to_string(),
                items: vec![OpnameItem {
                    variant_id: base.id.clone(),
                    actual_qty: 7,
                    note: Some("3 karung rusak".to_string()),
                }],
            })
            .await
            .unwrap();

        let year = Utc::now().year();
        assert_eq!(result.reference_id, format!("OPN-{year}-001"));
        assert_eq!(result.rows[0].system_qty, 10);
        assert_eq!(result.rows[0].actual_qty, 7);
        assert_eq!(result.rows[0].difference, -3);
        assert_eq!(testutil::stock_qty(&db, &base.id, &store.id).await, 7);

        let detail = db
            .inventory()
            .opname_detail("t1", &result.reference_id)
            .await
            .unwrap();
        assert_eq!(detail.len(), 1);
        assert_eq!(detail[0].qty_change, -3);
        assert_eq!(detail[0].log_type, StockLogType::Adjustment);
        let note = detail[0].note.as_deref().unwrap();
        assert!(note.contains("Opname by Budi"));
        assert!(note.contains("Sys: 10, Act: 7"));
    }

    #[tokio::test]
    async fn test_opname_reference_sequence_increments() {
        let db = testutil::test_db().await;
        let store = testutil::seed_store(&db, "t1", "Toko A").await;
        let (_, base) = testutil::seed_simple_product(&db, "t1", "Beras", "BRS", 15_000).await;
        testutil::seed_stock(&db, &base.id, &store.id, 10).await;

        let svc = db.inventory();
        let req = |qty| OpnameRequest {
            tenant_id: "t1".to_string(),
            store_id: store.id.clone(),
            auditor: "Budi".to_string(),
            items: vec![OpnameItem {
                variant_id: base.id.clone(),
                actual_qty: qty,
                note: None,
            }],
        };

        let first = svc.opname(req(9)).await.unwrap();
        let second = svc.opname(req(8)).await.unwrap();
        let year = Utc::now().year();
        assert_eq!(first.reference_id, format!("OPN-{year}-001"));
        assert_eq!(second.reference_id, format!("OPN-{year}-002"));

        let history = svc
            .opname_history("t1", crate::page::PageRequest::default())
            .await
            .unwrap();
        assert_eq!(history.meta.total, 2);
    }

    #[tokio::test]
    async fn test_opname_validates_whole_batch_before_writing() {
        let db = testutil::test_db().await;
        let store = testutil::seed_store(&db, "t1", "Toko A").await;
        let (_, base) = testutil::seed_simple_product(&db, "t1", "Beras", "BRS", 15_000).await;
        testutil::seed_stock(&db, &base.id, &store.id, 10).await;

        let err = db
            .inventory()
            .opname(OpnameRequest {
                tenant_id: "t1".to_string(),
                store_id: store.id.clone(),
                auditor: "Budi".to_string(),
                items: vec![
                    OpnameItem {
                        variant_id: base.id.clone(),
                        actual_qty: 3,
                        note: None,
                    },
                    OpnameItem {
                        variant_id: "no-such-variant".to_string(),
                        actual_qty: 1,
                        note: None,
                    },
                ],
            })
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        // first item untouched by the rollback
        assert_eq!(testutil::stock_qty(&db, &base.id, &store.id).await, 10);
    }

    #[tokio::test]
    async fn test_products_for_opname_tolerates_missing_rows() {
        let db = testutil::test_db().await;
        let store = testutil::seed_store(&db, "t1", "Toko A").await;
        let (_, beras) = testutil::seed_simple_product(&db, "t1", "Beras", "BRS", 15_000).await;
        let (_, _gula) = testutil::seed_simple_product(&db, "t1", "Gula", "GLA", 12_000).await;
        testutil::seed_stock(&db, &beras.id, &store.id, 10).await;

        let sheet = db
            .inventory()
            .products_for_opname("t1", &store.id, None, crate::page::PageRequest::default())
            .await
            .unwrap();
        assert_eq!(sheet.meta.total, 2);
        let gula_row = sheet.data.iter().find(|r| r.sku == "GLA").unwrap();
        assert_eq!(gula_row.system_qty, 0);
    }

    #[tokio::test]
    async fn test_products_for_opname_only_lists_active_physical() {
        let db = testutil::test_db().await;
        let store = testutil::seed_store(&db, "t1", "Toko A").await;
        let (_, beras) = testutil::seed_simple_product(&db, "t1", "Beras", "BRS", 15_000).await;
        testutil::seed_stock(&db, &beras.id, &store.id, 10).await;

        // nothing physical to count on these
        testutil::seed_digital(&db, "t1", "Pulsa 10k", "PLS-10", 11_000).await;
        let (discontinued, _) =
            testutil::seed_simple_product(&db, "t1", "Galon", "GLN", 20_000).await;
        sqlx::query("UPDATE products SET is_active = 0 WHERE id = ?1")
            .bind(&discontinued.id)
            .execute(db.pool())
            .await
            .unwrap();

        let sheet = db
            .inventory()
            .products_for_opname("t1", &store.id, None, crate::page::PageRequest::default())
            .await
            .unwrap();
        let skus: Vec<&str> = sheet.data.iter().map(|r| r.sku.as_str()).collect();
        assert_eq!(skus, vec!["BRS"]);
        assert_eq!(sheet.meta.total, 1);
    }

    #[tokio::test]
    async fn test_products_for_opname_search() {
        let db = testutil::test_db().await;
        let store = testutil::seed_store(&db, "t1", "Toko A").await;
        testutil::seed_simple_product(&db, "t1", "Beras", "BRS", 15_000).await;
        testutil::seed_simple_product(&db, "t1", "Gula", "GLA", 12_000).await;

        let sheet = db
            .inventory()
            .products_for_opname("t1", &store.id, Some("gul"), crate::page::PageRequest::default())
            .await
            .unwrap();
        assert_eq!(sheet.meta.total, 1);
        assert_eq!(sheet.data[0].sku, "GLA");
    }

    #[tokio::test]
    async fn test_stock_out_round_trip_and_loss_tag() {
        let db = testutil::test_db().await;
        let store = testutil::seed_store(&db, "t1", "Toko A").await;
        let (_, base) = testutil::seed_simple_product(&db, "t1", "Roti", "RTI", 8_000).await;

        db.inventory()
            .stock_in(StockInRequest {
                tenant_id: "t1".to_string(),
                store_id: store.id.clone(),
                variant_id: base.id.clone(),
                qty: 12,
                cost_price: 5_000,
                batch_number: None,
                supplier_id: None,
                note: None,
            })
            .await
            .unwrap();

        let stock = db
            .inventory()
            .stock_out(StockOutRequest {
                tenant_id: "t1".to_string(),
                store_id: store.id.clone(),
                variant_id: base.id.clone(),
                qty: 12,
                loss_type: StockLogType::Expired,
                note: Some("lewat tanggal".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(stock.stock_qty, 0);

        let (tagged,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM inventory_logs WHERE log_type = 'EXPIRED' AND qty_change = -12",
        )
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(tagged, 1);
    }

    #[tokio::test]
    async fn test_stock_out_rejects_non_loss_tag() {
        let db = testutil::test_db().await;
        let store = testutil::seed_store(&db, "t1", "Toko A").await;
        let (_, base) = testutil::seed_simple_product(&db, "t1", "Roti", "RTI", 8_000).await;
        testutil::seed_stock(&db, &base.id, &store.id, 5).await;

        let err = db
            .inventory()
            .stock_out(StockOutRequest {
                tenant_id: "t1".to_string(),
                store_id: store.id.clone(),
                variant_id: base.id.clone(),
                qty: 1,
                loss_type: StockLogType::Sale,
                note: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::Validation(ValidationError::Invalid(_)))
        ));
    }
}
