//! # Shift Repository
//!
//! Cashier shift lifecycle. Minimal on purpose: transaction posting depends
//! on an OPEN shift for the (store, user) pair, and closing reconciles the
//! cash drawer, so those two moments live here.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

use lumbung_core::{CoreError, Shift, ShiftStatus};

use crate::error::{DbError, DbResult};

/// Repository for cashier shifts.
#[derive(Debug, Clone)]
pub struct ShiftRepository {
    pool: SqlitePool,
}

impl ShiftRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ShiftRepository { pool }
    }

    /// Opens a shift for a (store, user) pair.
    ///
    /// ## Errors
    /// - `Conflict` if the user already has an OPEN shift at this store
    /// - `NotFound` if the store doesn't belong to the tenant
    pub async fn open_shift(
        &self,
        tenant_id: &str,
        store_id: &str,
        user_id: &str,
        starting_cash: i64,
    ) -> DbResult<Shift> {
        let mut conn = self.pool.acquire().await?;

        crate::repository::stock::ensure_store(&mut conn, tenant_id, store_id).await?;

        if fetch_open_shift(&mut conn, tenant_id, store_id, user_id)
            .await?
            .is_some()
        {
            return Err(CoreError::Conflict(
                "user already has an open shift at this store".to_string(),
            )
            .into());
        }

        let shift = Shift {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            store_id: store_id.to_string(),
            user_id: user_id.to_string(),
            status: ShiftStatus::Open,
            starting_cash,
            expected_cash: None,
            opened_at: Utc::now(),
            closed_at: None,
        };

        sqlx::query(
            "INSERT INTO store_shifts
                (id, tenant_id, store_id, user_id, status, starting_cash,
                 expected_cash, opened_at, closed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&shift.id)
        .bind(&shift.tenant_id)
        .bind(&shift.store_id)
        .bind(&shift.user_id)
        .bind(shift.status)
        .bind(shift.starting_cash)
        .bind(shift.expected_cash)
        .bind(shift.opened_at)
        .bind(shift.closed_at)
        .execute(&mut *conn)
        .await?;

        info!(shift_id = %shift.id, store_id, user_id, "Shift opened");
        Ok(shift)
    }

    /// Closes a shift, computing the expected cash in the drawer:
    /// starting cash plus the cash takings of non-void transactions posted
    /// during the shift.
    pub async fn close_shift(&self, tenant_id: &str, shift_id: &str) -> DbResult<Shift> {
        let mut conn = self.pool.acquire().await?;

        let shift = sqlx::query_as::<_, Shift>(
            "SELECT * FROM store_shifts WHERE tenant_id = ?1 AND id = ?2",
        )
        .bind(tenant_id)
        .bind(shift_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Shift", shift_id))?;

        if shift.status == ShiftStatus::Closed {
            return Err(CoreError::Conflict("shift is already closed".to_string()).into());
        }

        let (cash_sales,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(paid_amount), 0)
             FROM transactions
             WHERE shift_id = ?1
               AND payment_method = 'CASH'
               AND payment_status != 'VOID'",
        )
        .bind(shift_id)
        .fetch_one(&mut *conn)
        .await?;

        let expected_cash = shift.starting_cash + cash_sales;
        let closed_at = Utc::now();

        sqlx::query(
            "UPDATE store_shifts
             SET status = 'CLOSED', expected_cash = ?1, closed_at = ?2
             WHERE id = ?3",
        )
        .bind(expected_cash)
        .bind(closed_at)
        .bind(shift_id)
        .execute(&mut *conn)
        .await?;

        info!(shift_id, expected_cash, "Shift closed");

        Ok(Shift {
            status: ShiftStatus::Closed,
            expected_cash: Some(expected_cash),
            closed_at: Some(closed_at),
            ..shift
        })
    }

    /// The user's OPEN shift at a store, if any.
    pub async fn find_open(
        &self,
        tenant_id: &str,
        store_id: &str,
        user_id: &str,
    ) -> DbResult<Option<Shift>> {
        let mut conn = self.pool.acquire().await?;
        fetch_open_shift(&mut conn, tenant_id, store_id, user_id).await
    }
}

// =============================================================================
// Connection-Scoped Helpers (shared with the posting pipeline)
// =============================================================================

/// The OPEN shift for (store, user), inside an open transaction.
pub(crate) async fn fetch_open_shift(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    store_id: &str,
    user_id: &str,
) -> DbResult<Option<Shift>> {
    let shift = sqlx::query_as::<_, Shift>(
        "SELECT * FROM store_shifts
         WHERE tenant_id = ?1 AND store_id = ?2 AND user_id = ?3 AND status = 'OPEN'
         ORDER BY opened_at DESC
         LIMIT 1",
    )
    .bind(tenant_id)
    .bind(store_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(shift)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    #[tokio::test]
    async fn test_open_and_close_shift() {
        let db = testutil::test_db().await;
        let store = testutil::seed_store(&db, "t1", "Toko A").await;

        let shift = db
            .shifts()
            .open_shift("t1", &store.id, "kasir-1", 100_000)
            .await
            .unwrap();
        assert_eq!(shift.status, ShiftStatus::Open);

        let closed = db.shifts().close_shift("t1", &shift.id).await.unwrap();
        assert_eq!(closed.status, ShiftStatus::Closed);
        // no sales: expected cash is just the float
        assert_eq!(closed.expected_cash, Some(100_000));
        assert!(closed.closed_at.is_some());
    }

    #[tokio::test]
    async fn test_double_open_rejected() {
        let db = testutil::test_db().await;
        let store = testutil::seed_store(&db, "t1", "Toko A").await;

        db.shifts()
            .open_shift("t1", &store.id, "kasir-1", 0)
            .await
            .unwrap();
        let err = db
            .shifts()
            .open_shift("t1", &store.id, "kasir-1", 0)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_double_close_rejected() {
        let db = testutil::test_db().await;
        let store = testutil::seed_store(&db, "t1", "Toko A").await;
        let shift = db
            .shifts()
            .open_shift("t1", &store.id, "kasir-1", 0)
            .await
            .unwrap();

        db.shifts().close_shift("t1", &shift.id).await.unwrap();
        let err = db.shifts().close_shift("t1", &shift.id).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Conflict(_))));
    }
}
