//! # Transaction Posting Pipeline
//!
//! Turns a cart into a committed sale: one SQLite transaction covering
//! price derivation, stock deduction, total verification, and the header +
//! item inserts.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. OPEN shift required for (store, creator)                            │
//! │  2. per line: authoritative price from the variant row                  │
//! │     (client-sent prices are ignored), subtotal = price×qty − discount  │
//! │  3. resolve stock source, queue base-unit deductions                    │
//! │  4. |server_total − declared_total| > tolerance → IntegrityViolation   │
//! │  5. insert header (status derived from paid vs total)                   │
//! │  6. guarded ledger decrements, SALE logs referencing the tx id         │
//! │  7. insert items with frozen price/cost snapshots                       │
//! │                                                                         │
//! │  ANY failure at ANY step rolls back EVERYTHING.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use lumbung_core::pricing::{derive_payment_status, line_subtotal, totals_match};
use lumbung_core::unit_graph::{Deduction, StockSource};
use lumbung_core::validation::{validate_non_empty_batch, validate_positive_qty};
use lumbung_core::{
    CoreError, Money, PaymentStatus, StockLogType, Transaction, ValidationError,
};

use crate::error::{DbError, DbResult};
use crate::ledger::StockLedger;
use crate::repository::product::{fetch_product, fetch_variant};
use crate::repository::shift::fetch_open_shift;
use crate::repository::stock::ensure_store;
use crate::repository::transaction::{fetch_receipt, Receipt};
use crate::resolver::UnitGraphResolver;

// =============================================================================
// Requests
// =============================================================================

/// One cart line. The client's idea of the price is deliberately absent:
/// only quantity and discount are taken from the request.
#[derive(Debug, Clone)]
pub struct SaleItemRequest {
    pub variant_id: String,
    pub qty: i64,
    pub discount_amount: i64,
}

/// A cart to post.
#[derive(Debug, Clone)]
pub struct CreateTransactionRequest {
    pub tenant_id: String,
    pub store_id: String,
    /// The posting cashier; must hold an OPEN shift at the store.
    pub user_id: String,
    pub customer_name: Option<String>,
    pub payment_method: String,
    pub paid_amount: i64,
    /// The total the client computed; cross-checked against the server's.
    pub declared_total: i64,
    pub items: Vec<SaleItemRequest>,
}

// =============================================================================
// Service
// =============================================================================

/// Sale posting and debt settlement.
#[derive(Debug, Clone)]
pub struct SalesService {
    pool: SqlitePool,
}

impl SalesService {
    pub fn new(pool: SqlitePool) -> Self {
        SalesService { pool }
    }

    /// Posts a transaction atomically. See the module docs for the pipeline.
    pub async fn create_transaction(&self, req: CreateTransactionRequest) -> DbResult<Receipt> {
        validate_non_empty_batch("items", req.items.len())?;
        for item in &req.items {
            validate_positive_qty("qty", item.qty)?;
            if item.discount_amount < 0 {
                return Err(ValidationError::Invalid(
                    "discount_amount must not be negative".to_string(),
                )
                .into());
            }
        }
        if req.paid_amount < 0 {
            return Err(ValidationError::Invalid(
                "paid_amount must not be negative".to_string(),
            )
            .into());
        }

        let mut tx = self.pool.begin().await?;

        ensure_store(&mut tx, &req.tenant_id, &req.store_id).await?;

        let shift = fetch_open_shift(&mut tx, &req.tenant_id, &req.store_id, &req.user_id)
            .await?
            .ok_or_else(|| {
                DbError::Core(CoreError::Conflict(
                    "no open shift for this user at this store".to_string(),
                ))
            })?;

        // Price every line and queue its stock effects before writing anything
        struct PricedLine {
            variant_id: String,
            qty: i64,
            unit_price: i64,
            cost_price: i64,
            discount_amount: i64,
            subtotal: Money,
            deductions: Vec<Deduction>,
        }

        let mut server_total = Money::zero();
        let mut lines = Vec::with_capacity(req.items.len());

        for item in &req.items {
            let variant = fetch_variant(&mut tx, &req.tenant_id, &item.variant_id).await?;
            fetch_product(&mut tx, &req.tenant_id, &variant.product_id).await?;

            let subtotal = line_subtotal(
                variant.price(),
                item.qty,
                Money::new(item.discount_amount),
            );
            server_total += subtotal;

            let source =
                UnitGraphResolver::resolve(&mut tx, &req.tenant_id, &variant.id, &req.store_id)
                    .await?;

            let (deductions, cost_price) = match &source {
                None => (Vec::new(), 0),
                Some(source) => {
                    let cost = Self::unit_cost(&mut tx, source).await?;
                    (source.deductions(item.qty), cost)
                }
            };

            lines.push(PricedLine {
                variant_id: variant.id,
                qty: item.qty,
                unit_price: variant.price,
                cost_price,
                discount_amount: item.discount_amount,
                subtotal,
                deductions,
            });
        }

        if !totals_match(server_total, Money::new(req.declared_total)) {
            return Err(CoreError::IntegrityViolation {
                computed: server_total.amount(),
                declared: req.declared_total,
            }
            .into());
        }

        let (payment_status, balance_due) =
            derive_payment_status(server_total, Money::new(req.paid_amount));

        let transaction_id = Uuid::new_v4().to_string();
        let receipt_number = generate_receipt_number();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO transactions
                (id, tenant_id, store_id, shift_id, created_by, customer_name,
                 receipt_number, total_amount, paid_amount, balance_due,
                 payment_method, payment_status, void_reason, void_by, void_at,
                 created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                     NULL, NULL, NULL, ?13)",
        )
        .bind(&transaction_id)
        .bind(&req.tenant_id)
        .bind(&req.store_id)
        .bind(&shift.id)
        .bind(&req.user_id)
        .bind(&req.customer_name)
        .bind(&receipt_number)
        .bind(server_total.amount())
        .bind(req.paid_amount)
        .bind(balance_due.amount())
        .bind(&req.payment_method)
        .bind(payment_status)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for line in &lines {
            for deduction in &line.deductions {
                StockLedger::decrement(
                    &mut tx,
                    &deduction.stock_id,
                    &deduction.display_name,
                    deduction.qty,
                    StockLogType::Sale,
                    Some(&transaction_id),
                    None,
                )
                .await?;
            }

            sqlx::query(
                "INSERT INTO transaction_items
                    (id, transaction_id, variant_id, qty, unit_price, cost_price,
                     discount_amount, tax_amount, subtotal, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?9)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&transaction_id)
            .bind(&line.variant_id)
            .bind(line.qty)
            .bind(line.unit_price)
            .bind(line.cost_price)
            .bind(line.discount_amount)
            .bind(line.subtotal.amount())
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        let receipt = fetch_receipt(&mut tx, &req.tenant_id, &transaction_id).await?;
        tx.commit().await?;

        info!(
            transaction_id = %transaction_id,
            receipt_number = %receipt_number,
            total = server_total.amount(),
            status = ?payment_status,
            items = lines.len(),
            "Transaction posted"
        );
        Ok(receipt)
    }

    /// Settles (part of) an outstanding balance.
    ///
    /// ## Errors
    /// - `Conflict` — transaction is VOID or already fully paid
    /// - `Validation` — amount not positive, or more than the remaining balance
    pub async fn pay_debt(
        &self,
        tenant_id: &str,
        transaction_id: &str,
        amount: i64,
    ) -> DbResult<Transaction> {
        validate_positive_qty("amount", amount)?;

        let mut tx = self.pool.begin().await?;

        let transaction =
            crate::repository::transaction::fetch_transaction(&mut tx, tenant_id, transaction_id)
                .await?;

        match transaction.payment_status {
            PaymentStatus::Void => {
                return Err(CoreError::Conflict(
                    "cannot pay a voided transaction".to_string(),
                )
                .into());
            }
            PaymentStatus::Paid => {
                return Err(CoreError::Conflict(
                    "transaction is already settled".to_string(),
                )
                .into());
            }
            PaymentStatus::Unpaid | PaymentStatus::Partial => {}
        }

        if amount > transaction.balance_due {
            return Err(ValidationError::Invalid(format!(
                "payment {} exceeds remaining balance {}",
                amount, transaction.balance_due
            ))
            .into());
        }

        let new_paid = transaction.paid_amount + amount;
        let new_balance = transaction.balance_due - amount;
        let new_status = if new_balance == 0 {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Partial
        };

        sqlx::query(
            "UPDATE transactions
             SET paid_amount = ?1, balance_due = ?2, payment_status = ?3
             WHERE id = ?4",
        )
        .bind(new_paid)
        .bind(new_balance)
        .bind(new_status)
        .bind(transaction_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(transaction_id, amount, new_balance, "Debt payment applied");
        Ok(Transaction {
            paid_amount: new_paid,
            balance_due: new_balance,
            payment_status: new_status,
            ..transaction
        })
    }

    /// Per-sold-unit cost snapshot from the latest FIFO batch (0 when no
    /// batch exists).
    async fn unit_cost(
        conn: &mut sqlx::SqliteConnection,
        source: &StockSource,
    ) -> DbResult<i64> {
        match source {
            StockSource::Simple {
                stock, multiplier, ..
            } => {
                let base_cost = StockLedger::latest_batch_cost(conn, &stock.id).await?;
                Ok(base_cost * multiplier)
            }
            StockSource::Bundle { components } => {
                let mut total = 0;
                for c in components {
                    let base_cost = StockLedger::latest_batch_cost(conn, &c.stock.id).await?;
                    total += base_cost * c.multiplier * c.qty_needed;
                }
                Ok(total)
            }
        }
    }
}

/// Human-readable receipt number: date plus a short unique suffix.
fn generate_receipt_number() -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("TRX-{date}-{suffix}")
}

// =============================================================================
// Unit Tests
// =============================================================================
