//! # Purchase Invoice Repository
//!
//! Database operations for purchase invoices and their lines, plus the
//! module's [`AggregateStore`] wiring. Invoices take their numbers from the
//! reservation pool rather than a counter: a clerk reserves a number while
//! keying the invoice in, and the save claims it permanently.
//!
//! Posting (or post-and-pay) receives the goods: stock balance is
//! incremented once per line when the invoice enters the posted/paid states.

use async_trait::async_trait;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use atlas_core::workflow::status;
use atlas_core::{PurchaseInvoice, PurchaseInvoiceLine};

use crate::error::{DbError, DbResult};
use crate::orchestrator::{AggregateStore, AllocationStrategy};
use crate::repository::stock::StockRepository;

/// Repository for purchase invoice database operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Gets an invoice by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<PurchaseInvoice>> {
        let invoice: Option<PurchaseInvoice> = sqlx::query_as(
            r#"
            SELECT id, code, status, supplier, org_unit_id, created_by,
                   created_at, updated_at
            FROM purchase_invoices
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invoice)
    }

    /// Gets all lines for an invoice, insertion order.
    pub async fn get_lines(&self, invoice_id: i64) -> DbResult<Vec<PurchaseInvoiceLine>> {
        let lines: Vec<PurchaseInvoiceLine> = sqlx::query_as(
            r#"
            SELECT id, invoice_id, product_code, quantity, unit_cost_cents, created_at
            FROM purchase_invoice_lines
            WHERE invoice_id = ?1
            ORDER BY id ASC
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Counts persisted invoices (diagnostics and tests).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM purchase_invoices")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl AggregateStore for InvoiceRepository {
    type Root = PurchaseInvoice;
    type Child = PurchaseInvoiceLine;

    fn allocation(&self) -> AllocationStrategy {
        AllocationStrategy::ReservationPool
    }

    fn side_effect_statuses(&self) -> &[&str] {
        // PAID is reachable straight from DRAFT via POST_AND_PAY; goods are
        // received on entry into either state, never twice
        &[status::POSTED, status::PAID]
    }

    async fn insert_root(
        &self,
        conn: &mut SqliteConnection,
        root: &PurchaseInvoice,
    ) -> DbResult<i64> {
        debug!(code = ?root.code, supplier = %root.supplier, "Inserting purchase invoice");

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO purchase_invoices (
                code, status, supplier, org_unit_id, created_by,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            RETURNING id
            "#,
        )
        .bind(&root.code)
        .bind(&root.status)
        .bind(&root.supplier)
        .bind(root.org_unit_id)
        .bind(root.created_by)
        .bind(root.created_at)
        .bind(root.updated_at)
        .fetch_one(&mut *conn)
        .await?;

        Ok(id)
    }

    async fn update_root(
        &self,
        conn: &mut SqliteConnection,
        root: &PurchaseInvoice,
    ) -> DbResult<()> {
        let id = root
            .id
            .ok_or_else(|| DbError::persist_failed("purchase_invoices"))?;

        let result = sqlx::query(
            r#"
            UPDATE purchase_invoices SET
                code = ?2, status = ?3, supplier = ?4, org_unit_id = ?5, updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&root.code)
        .bind(&root.status)
        .bind(&root.supplier)
        .bind(root.org_unit_id)
        .bind(root.updated_at)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::persist_failed("purchase_invoices"));
        }

        Ok(())
    }

    async fn persist_child(
        &self,
        conn: &mut SqliteConnection,
        root_id: i64,
        child: &mut PurchaseInvoiceLine,
    ) -> DbResult<()> {
        child.invoice_id = Some(root_id);

        match child.id {
            None => {
                let id: i64 = sqlx::query_scalar(
                    r#"
                    INSERT INTO purchase_invoice_lines (
                        invoice_id, product_code, quantity, unit_cost_cents, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5)
                    RETURNING id
                    "#,
                )
                .bind(root_id)
                .bind(&child.product_code)
                .bind(child.quantity)
                .bind(child.unit_cost_cents)
                .bind(child.created_at)
                .fetch_one(&mut *conn)
                .await?;

                child.id = Some(id);
            }
            Some(id) => {
                let result = sqlx::query(
                    r#"
                    UPDATE purchase_invoice_lines SET
                        invoice_id = ?2, product_code = ?3, quantity = ?4, unit_cost_cents = ?5
                    WHERE id = ?1
                    "#,
                )
                .bind(id)
                .bind(root_id)
                .bind(&child.product_code)
                .bind(child.quantity)
                .bind(child.unit_cost_cents)
                .execute(&mut *conn)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(DbError::persist_failed("purchase_invoice_lines"));
                }
            }
        }

        Ok(())
    }

    async fn apply_side_effect(
        &self,
        conn: &mut SqliteConnection,
        _root: &PurchaseInvoice,
        child: &PurchaseInvoiceLine,
    ) -> DbResult<()> {
        // Posted invoices move stock INTO the org unit
        StockRepository::adjust(conn, &child.product_code, child.quantity).await
    }
}
