//! # Void / Reversal Engine
//!
//! Reverses a posted transaction without deleting anything: stock comes
//! back, the audit trail grows, the header flips to VOID.
//!
//! ## Reversal Source
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  The SALE log rows written at posting time ARE the reversal plan:      │
//! │                                                                         │
//! │  inventory_logs (reference_id = tx id, log_type = SALE)                 │
//! │      (stock_id, qty_change = −n)  →  restore +n, log VOID_RESTORE      │
//! │                                                                         │
//! │  The unit graph is NOT re-resolved at void time, so edits to           │
//! │  multipliers or bundle composition between sale and void cannot        │
//! │  skew the restored quantities.                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! VOID is one-way. Items and amounts stay frozen; only the status columns
//! and stock change.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use lumbung_core::validation::validate_void_reason;
use lumbung_core::{CoreError, PaymentStatus, StockLogType, Transaction};

use crate::error::DbResult;
use crate::ledger::StockLedger;
use crate::repository::transaction::fetch_transaction;

/// Transaction reversal engine.
#[derive(Debug, Clone)]
pub struct VoidEngine {
    pool: SqlitePool,
}

impl VoidEngine {
    pub fn new(pool: SqlitePool) -> Self {
        VoidEngine { pool }
    }

    /// Voids a transaction: restores stock from the SALE logs, stamps the
    /// header, flips the status.
    ///
    /// ## Errors
    /// - `Validation` — reason missing or shorter than the minimum
    /// - `NotFound` — unknown id, or the transaction belongs to another tenant
    /// - `Conflict` — already VOID
    pub async fn void_transaction(
        &self,
        tenant_id: &str,
        transaction_id: &str,
        actor: &str,
        reason: &str,
    ) -> DbResult<Transaction> {
        validate_void_reason(reason)?;

        let mut tx = self.pool.begin().await?;

        let transaction = fetch_transaction(&mut tx, tenant_id, transaction_id).await?;
        if transaction.payment_status == PaymentStatus::Void {
            return Err(CoreError::Conflict("transaction is already void".to_string()).into());
        }

        // The posting-time SALE rows are the exact base-unit quantities taken
        let sale_rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT inventory_stock_id, qty_change FROM inventory_logs
             WHERE reference_id = ?1 AND log_type = 'SALE'",
        )
        .bind(transaction_id)
        .fetch_all(&mut *tx)
        .await?;

        let note = format!("Void: {}", reason.trim());
        for (stock_id, qty_change) in &sale_rows {
            StockLedger::restore(
                &mut tx,
                stock_id,
                -qty_change,
                StockLogType::VoidRestore,
                Some(transaction_id),
                Some(&note),
            )
            .await?;
        }

        let void_at = Utc::now();
        sqlx::query(
            "UPDATE transactions
             SET payment_status = 'VOID', void_reason = ?1, void_by = ?2, void_at = ?3
             WHERE id = ?4",
        )
        .bind(reason.trim())
        .bind(actor)
        .bind(void_at)
        .bind(transaction_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            transaction_id,
            actor,
            restored_rows = sale_rows.len(),
            "Transaction voided"
        );
        Ok(Transaction {
            payment_status: PaymentStatus::Void,
            void_reason: Some(reason.trim().to_string()),
            void_by: Some(actor.to_string()),
            void_at: Some(void_at),
            ..transaction
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::posting::{CreateTransactionRequest, SaleItemRequest};
    use crate::testutil;
    use lumbung_core::ValidationError;

    async fn post_sale(db: &crate::Database, store_id: &str, variant_id: &str, qty: i64) -> String {
        let receipt = db
            .sales()
            .create_transaction(CreateTransactionRequest {
                tenant_id: "t1".to_string(),
                store_id: store_id.to_string(),
                user_id: "kasir-1".to_string(),
                customer_name: None,
                payment_method: "CASH".to_string(),
                paid_amount: 15_000 * qty,
                declared_total: 15_000 * qty,
                items: vec![SaleItemRequest {
                    variant_id: variant_id.to_string(),
                    qty,
                    discount_amount: 0,
                }],
            })
            .await
            .unwrap();
        receipt.transaction.id
    }

    #[tokio::test]
    async fn test_void_restores_stock_and_stamps_header() {
        let db = testutil::test_db().await;
        let store = testutil::seed_store(&db, "t1", "Toko A").await;
        let (_, base) = testutil::seed_simple_product(&db, "t1", "Beras", "BRS", 15_000).await;
        testutil::seed_stock(&db, &base.id, &store.id, 30).await;
        testutil::open_shift(&db, "t1", &store.id, "kasir-1").await;

        let tx_id = post_sale(&db, &store.id, &base.id, 4).await;
        assert_eq!(testutil::stock_qty(&db, &base.id, &store.id).await, 26);

        let voided = db
            .void_engine()
            .void_transaction("t1", &tx_id, "manager-1", "salah input pelanggan")
            .await
            .unwrap();

        assert_eq!(voided.payment_status, PaymentStatus::Void);
        assert_eq!(voided.void_by.as_deref(), Some("manager-1"));
        assert!(voided.void_at.is_some());
        assert_eq!(testutil::stock_qty(&db, &base.id, &store.id).await, 30);

        // one VOID_RESTORE row mirrors the single SALE row
        let (restores,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM inventory_logs
             WHERE reference_id = ?1 AND log_type = 'VOID_RESTORE'",
        )
        .bind(&tx_id)
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(restores, 1);

        // amounts frozen
        let receipt = db.transactions().receipt("t1", &tx_id).await.unwrap();
        assert_eq!(receipt.transaction.total_amount, 60_000);
        assert_eq!(receipt.items.len(), 1);
    }

    #[tokio::test]
    async fn test_double_void_rejected_single_net_restore() {
        let db = testutil::test_db().await;
        let store = testutil::seed_store(&db, "t1", "Toko A").await;
        let (_, base) = testutil::seed_simple_product(&db, "t1", "Beras", "BRS", 15_000).await;
        testutil::seed_stock(&db, &base.id, &store.id, 30).await;
        testutil::open_shift(&db, "t1", &store.id, "kasir-1").await;

        let tx_id = post_sale(&db, &store.id, &base.id, 4).await;
        db.void_engine()
            .void_transaction("t1", &tx_id, "manager-1", "barang dikembalikan")
            .await
            .unwrap();

        let err = db
            .void_engine()
            .void_transaction("t1", &tx_id, "manager-1", "barang dikembalikan")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Conflict(_))));

        // stock restored exactly once
        assert_eq!(testutil::stock_qty(&db, &base.id, &store.id).await, 30);
    }

    #[tokio::test]
    async fn test_void_wrong_tenant_is_not_found() {
        let db = testutil::test_db().await;
        let store = testutil::seed_store(&db, "t1", "Toko A").await;
        let (_, base) = testutil::seed_simple_product(&db, "t1", "Beras", "BRS", 15_000).await;
        testutil::seed_stock(&db, &base.id, &store.id, 30).await;
        testutil::open_shift(&db, "t1", &store.id, "kasir-1").await;

        let tx_id = post_sale(&db, &store.id, &base.id, 1).await;

        let err = db
            .void_engine()
            .void_transaction("t2", &tx_id, "manager-x", "mencoba lintas tenant")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_void_reason_too_short_rejected() {
        let db = testutil::test_db().await;

        let err = db
            .void_engine()
            .void_transaction("t1", "any-id", "manager-1", "dup")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::Validation(ValidationError::TooShort { .. }))
        ));
    }

    #[tokio::test]
    async fn test_void_parcel_restores_every_component() {
        let db = testutil::test_db().await;
        let store = testutil::seed_store(&db, "t1", "Toko A").await;
        let (_, beras) = testutil::seed_simple_product(&db, "t1", "Beras", "BRS", 15_000).await;
        let (_, minyak) = testutil::seed_simple_product(&db, "t1", "Minyak", "MNY", 20_000).await;
        let parcel = testutil::seed_parcel(&db, "t1", "Paket Sembako", "PKT", 45_000).await;
        db.products()
            .add_bundle_component("t1", &parcel.id, &beras.id, 2)
            .await
            .unwrap();
        db.products()
            .add_bundle_component("t1", &parcel.id, &minyak.id, 1)
            .await
            .unwrap();
        testutil::seed_stock(&db, &beras.id, &store.id, 10).await;
        testutil::seed_stock(&db, &minyak.id, &store.id, 5).await;
        testutil::open_shift(&db, "t1", &store.id, "kasir-1").await;

        let receipt = db
            .sales()
            .create_transaction(CreateTransactionRequest {
                tenant_id: "t1".to_string(),
                store_id: store.id.clone(),
                user_id: "kasir-1".to_string(),
                customer_name: None,
                payment_method: "CASH".to_string(),
                paid_amount: 45_000,
                declared_total: 45_000,
                items: vec![SaleItemRequest {
                    variant_id: parcel.id.clone(),
                    qty: 1,
                    discount_amount: 0,
                }],
            })
            .await
            .unwrap();
        assert_eq!(testutil::stock_qty(&db, &beras.id, &store.id).await, 8);
        assert_eq!(testutil::stock_qty(&db, &minyak.id, &store.id).await, 4);

        db.void_engine()
            .void_transaction("t1", &receipt.transaction.id, "manager-1", "paket dibatalkan")
            .await
            .unwrap();

        assert_eq!(testutil::stock_qty(&db, &beras.id, &store.id).await, 10);
        assert_eq!(testutil::stock_qty(&db, &minyak.id, &store.id).await, 5);
    }
}
