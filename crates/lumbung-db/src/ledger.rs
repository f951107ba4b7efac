//! # Stock Ledger
//!
//! The ONLY code that mutates `inventory_stock.stock_qty`. Every mutation
//! writes its matching `inventory_logs` row in the same database
//! transaction, so the append-only trail always reconciles with the live
//! quantity.
//!
//! ## Non-Negativity
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  decrement(stock_id, qty)                                               │
//! │                                                                         │
//! │  UPDATE inventory_stock                                                 │
//! │     SET stock_qty = stock_qty - ?qty                                    │
//! │   WHERE id = ?stock_id AND stock_qty >= ?qty    ◄── guard in the WHERE  │
//! │                                                                         │
//! │  rows_affected == 1  → success, write log                               │
//! │  rows_affected == 0  → InsufficientStock (re-read for the message)      │
//! │                                                                         │
//! │  Two requests racing for the last unit: SQLite serializes the writes,  │
//! │  the second UPDATE matches nothing, its whole transaction rolls back.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All methods take `&mut SqliteConnection` so they compose inside the
//! caller's transaction; the ledger never commits anything itself.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use lumbung_core::{CoreError, InventoryStock, StockLogType};

use crate::error::{DbError, DbResult};
use crate::repository::stock::{fetch_stock, fetch_stock_by_id};

/// Ledger over `inventory_stock` + `inventory_logs`.
pub struct StockLedger;

impl StockLedger {
    /// Adds `qty` base units to the (variant, store) row, creating it at
    /// zero first if absent. Writes one log row.
    pub async fn increment(
        conn: &mut SqliteConnection,
        variant_id: &str,
        store_id: &str,
        qty: i64,
        log_type: StockLogType,
        reference_id: Option<&str>,
        note: Option<&str>,
    ) -> DbResult<InventoryStock> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO inventory_stock (id, variant_id, store_id, stock_qty, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT (variant_id, store_id)
             DO UPDATE SET stock_qty = stock_qty + excluded.stock_qty, updated_at = excluded.updated_at",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(variant_id)
        .bind(store_id)
        .bind(qty)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        let stock = fetch_stock(conn, variant_id, store_id)
            .await?
            .ok_or_else(|| DbError::Internal("stock row vanished after upsert".to_string()))?;

        Self::write_log(conn, &stock.id, log_type, qty, reference_id, note).await?;

        debug!(stock_id = %stock.id, qty, new_qty = stock.stock_qty, "Stock incremented");
        Ok(stock)
    }

    /// Removes `qty` base units from a stock row, draining FIFO batches and
    /// writing one negative-delta log row.
    ///
    /// `display_name` only feeds the InsufficientStock message.
    pub async fn decrement(
        conn: &mut SqliteConnection,
        stock_id: &str,
        display_name: &str,
        qty: i64,
        log_type: StockLogType,
        reference_id: Option<&str>,
        note: Option<&str>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE inventory_stock
             SET stock_qty = stock_qty - ?2, updated_at = ?3
             WHERE id = ?1 AND stock_qty >= ?2",
        )
        .bind(stock_id)
        .bind(qty)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            // Re-read only to build an accurate error message
            let available = fetch_stock_by_id(conn, stock_id)
                .await?
                .map(|s| s.stock_qty)
                .unwrap_or(0);
            return Err(CoreError::InsufficientStock {
                name: display_name.to_string(),
                available,
                requested: qty,
            }
            .into());
        }

        Self::drain_batches(conn, stock_id, qty).await?;
        Self::write_log(conn, stock_id, log_type, -qty, reference_id, note).await?;

        debug!(stock_id, qty, "Stock decremented");
        Ok(())
    }

    /// Sets the (variant, store) quantity to an absolute count (opname). An
    /// absent row is treated as system quantity 0 and created. Returns
    /// `(previous, new, stock_id)`; the log row carries the signed delta.
    pub async fn set_absolute(
        conn: &mut SqliteConnection,
        variant_id: &str,
        store_id: &str,
        actual_qty: i64,
        reference_id: Option<&str>,
        note: Option<&str>,
    ) -> DbResult<(i64, i64, String)> {
        let now = Utc::now();
        let (previous, stock_id) = match fetch_stock(conn, variant_id, store_id).await? {
            Some(stock) => {
                sqlx::query("UPDATE inventory_stock SET stock_qty = ?1, updated_at = ?2 WHERE id = ?3")
                    .bind(actual_qty)
                    .bind(now)
                    .bind(&stock.id)
                    .execute(&mut *conn)
                    .await?;
                (stock.stock_qty, stock.id)
            }
            None => {
                let id = Uuid::new_v4().to_string();
                sqlx::query(
                    "INSERT INTO inventory_stock (id, variant_id, store_id, stock_qty, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                )
                .bind(&id)
                .bind(variant_id)
                .bind(store_id)
                .bind(actual_qty)
                .bind(now)
                .execute(&mut *conn)
                .await?;
                (0, id)
            }
        };

        let delta = actual_qty - previous;
        Self::write_log(
            conn,
            &stock_id,
            StockLogType::Adjustment,
            delta,
            reference_id,
            note,
        )
        .await?;

        debug!(stock_id = %stock_id, previous, actual_qty, delta, "Stock counted");
        Ok((previous, actual_qty, stock_id))
    }

    /// Adds `qty` base units back onto an existing stock row by primary
    /// key (void reversal replaying SALE logs). Writes one log row.
    pub async fn restore(
        conn: &mut SqliteConnection,
        stock_id: &str,
        qty: i64,
        log_type: StockLogType,
        reference_id: Option<&str>,
        note: Option<&str>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE inventory_stock SET stock_qty = stock_qty + ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(stock_id)
        .bind(qty)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Stock", stock_id));
        }

        Self::write_log(conn, stock_id, log_type, qty, reference_id, note).await?;
        debug!(stock_id, qty, "Stock restored");
        Ok(())
    }

    /// Drains FIFO costing batches, oldest first, until `qty` is covered or
    /// the batches run out. Partial coverage is fine: batches are costing
    /// metadata, `inventory_stock` stays authoritative.
    pub async fn drain_batches(
        conn: &mut SqliteConnection,
        stock_id: &str,
        qty: i64,
    ) -> DbResult<()> {
        let batches: Vec<(String, i64)> = sqlx::query_as(
            "SELECT id, qty FROM stock_batches
             WHERE inventory_stock_id = ?1 AND qty > 0
             ORDER BY created_at ASC, id ASC",
        )
        .bind(stock_id)
        .fetch_all(&mut *conn)
        .await?;

        let mut remaining = qty;
        for (batch_id, batch_qty) in batches {
            if remaining <= 0 {
                break;
            }
            let take = batch_qty.min(remaining);
            sqlx::query("UPDATE stock_batches SET qty = qty - ?1 WHERE id = ?2")
                .bind(take)
                .bind(&batch_id)
                .execute(&mut *conn)
                .await?;
            remaining -= take;
        }
        Ok(())
    }

    /// Latest batch cost for a stock row; 0 when no batch exists (legacy
    /// rows predating batch tracking).
    pub async fn latest_batch_cost(
        conn: &mut SqliteConnection,
        stock_id: &str,
    ) -> DbResult<i64> {
        let cost: Option<(i64,)> = sqlx::query_as(
            "SELECT purchase_price FROM stock_batches
             WHERE inventory_stock_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT 1",
        )
        .bind(stock_id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(cost.map(|(c,)| c).unwrap_or(0))
    }

    /// Appends one audit row. Internal: every public ledger method calls
    /// this exactly once.
    async fn write_log(
        conn: &mut SqliteConnection,
        stock_id: &str,
        log_type: StockLogType,
        qty_change: i64,
        reference_id: Option<&str>,
        note: Option<&str>,
    ) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO inventory_logs
                (id, inventory_stock_id, log_type, qty_change, reference_id, note, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(stock_id)
        .bind(log_type)
        .bind(qty_change)
        .bind(reference_id)
        .bind(note)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
