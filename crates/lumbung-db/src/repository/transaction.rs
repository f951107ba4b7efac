//! # Transaction Read Repository
//!
//! Read-side views over posted transactions: receipt reconstruction and the
//! outstanding-debt ledger. Posting, voiding and debt payment are engine
//! services; this repository never writes.

use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};

use lumbung_core::{Transaction, TransactionItem};

use crate::error::{DbError, DbResult};
use crate::page::{Page, PageRequest};

// =============================================================================
// Read Models
// =============================================================================

/// A full receipt: the header plus its frozen line items.
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub transaction: Transaction,
    pub items: Vec<TransactionItem>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for transaction reads.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Reconstructs a receipt by transaction ID.
    pub async fn receipt(&self, tenant_id: &str, transaction_id: &str) -> DbResult<Receipt> {
        let mut conn = self.pool.acquire().await?;
        fetch_receipt(&mut conn, tenant_id, transaction_id).await
    }

    /// Outstanding debts (UNPAID or PARTIAL), oldest first so the longest
    /// standing kasbon surfaces at the top.
    pub async fn debts(&self, tenant_id: &str, page: PageRequest) -> DbResult<Page<Transaction>> {
        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM transactions
             WHERE tenant_id = ?1 AND payment_status IN ('UNPAID', 'PARTIAL')",
        )
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, Transaction>(
            "SELECT * FROM transactions
             WHERE tenant_id = ?1 AND payment_status IN ('UNPAID', 'PARTIAL')
             ORDER BY created_at ASC
             LIMIT ?2 OFFSET ?3",
        )
        .bind(tenant_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(rows, total, page))
    }
}

// =============================================================================
// Connection-Scoped Helpers (shared with engine services)
// =============================================================================

/// Fetches a transaction header inside an open transaction.
pub(crate) async fn fetch_transaction(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    transaction_id: &str,
) -> DbResult<Transaction> {
    sqlx::query_as::<_, Transaction>(
        "SELECT * FROM transactions WHERE tenant_id = ?1 AND id = ?2",
    )
    .bind(tenant_id)
    .bind(transaction_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("Transaction", transaction_id))
}

/// Fetches a receipt (header + items) inside an open transaction.
pub(crate) async fn fetch_receipt(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    transaction_id: &str,
) -> DbResult<Receipt> {
    let transaction = fetch_transaction(conn, tenant_id, transaction_id).await?;

    let items = sqlx::query_as::<_, TransactionItem>(
        "SELECT * FROM transaction_items WHERE transaction_id = ?1 ORDER BY created_at ASC, id ASC",
    )
    .bind(transaction_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Receipt { transaction, items })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::testutil;
    use crate::page::PageRequest;

    #[tokio::test]
    async fn test_receipt_not_found_for_wrong_tenant() {
        let db = testutil::test_db().await;
        let err = db.transactions().receipt("t1", "no-such-tx").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_debts_empty() {
        let db = testutil::test_db().await;
        let debts = db
            .transactions()
            .debts("t1", PageRequest::default())
            .await
            .unwrap();
        assert_eq!(debts.meta.total, 0);
        assert!(debts.data.is_empty());
    }
}
