//! # Inventory Check-Out Repository
//!
//! Database operations for check-out documents and their lines, plus the
//! module's [`AggregateStore`] wiring (counter-allocated codes, stock
//! decrement on approval).
//!
//! ## Document Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   Check-Out Lifecycle                                   │
//! │                                                                         │
//! │  1. DRAFT                                                              │
//! │     └── CheckOutDocument::draft() - no id, no code yet                 │
//! │                                                                         │
//! │  2. ORCHESTRATED SAVE (SUBMIT / SUBMIT_AND_APPROVE)                    │
//! │     └── code allocated from the InventoryCheckOut counter              │
//! │     └── root inserted, lines backfilled with the root id               │
//! │     └── history row DRAFT → <resulting status>                         │
//! │                                                                         │
//! │  3. APPROVED (terminal effect)                                         │
//! │     └── stock balance decremented once per line                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use atlas_core::workflow::status;
use atlas_core::{CheckOutDocument, CheckOutLine};

use crate::error::{DbError, DbResult};
use crate::orchestrator::{AggregateStore, AllocationStrategy};
use crate::repository::stock::StockRepository;

/// Repository for check-out database operations.
#[derive(Debug, Clone)]
pub struct CheckOutRepository {
    pool: SqlitePool,
}

impl CheckOutRepository {
    /// Creates a new CheckOutRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CheckOutRepository { pool }
    }

    /// Gets a check-out document by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<CheckOutDocument>> {
        let doc: Option<CheckOutDocument> = sqlx::query_as(
            r#"
            SELECT id, code, status, org_unit_id, requested_by, note,
                   created_at, updated_at
            FROM checkout_documents
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(doc)
    }

    /// Gets a check-out document by its business code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<CheckOutDocument>> {
        let doc: Option<CheckOutDocument> = sqlx::query_as(
            r#"
            SELECT id, code, status, org_unit_id, requested_by, note,
                   created_at, updated_at
            FROM checkout_documents
            WHERE code = ?1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(doc)
    }

    /// Gets all lines for a document, insertion order.
    pub async fn get_lines(&self, document_id: i64) -> DbResult<Vec<CheckOutLine>> {
        let lines: Vec<CheckOutLine> = sqlx::query_as(
            r#"
            SELECT id, document_id, product_code, quantity, created_at
            FROM checkout_lines
            WHERE document_id = ?1
            ORDER BY id ASC
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Counts persisted documents (diagnostics and tests).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM checkout_documents")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl AggregateStore for CheckOutRepository {
    type Root = CheckOutDocument;
    type Child = CheckOutLine;

    fn allocation(&self) -> AllocationStrategy {
        AllocationStrategy::Counter
    }

    fn side_effect_statuses(&self) -> &[&str] {
        &[status::APPROVED]
    }

    async fn insert_root(
        &self,
        conn: &mut SqliteConnection,
        root: &CheckOutDocument,
    ) -> DbResult<i64> {
        debug!(code = ?root.code, "Inserting check-out document");

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO checkout_documents (
                code, status, org_unit_id, requested_by, note,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            RETURNING id
            "#,
        )
        .bind(&root.code)
        .bind(&root.status)
        .bind(root.org_unit_id)
        .bind(root.requested_by)
        .bind(&root.note)
        .bind(root.created_at)
        .bind(root.updated_at)
        .fetch_one(&mut *conn)
        .await?;

        Ok(id)
    }

    async fn update_root(
        &self,
        conn: &mut SqliteConnection,
        root: &CheckOutDocument,
    ) -> DbResult<()> {
        let id = root
            .id
            .ok_or_else(|| DbError::persist_failed("checkout_documents"))?;

        let result = sqlx::query(
            r#"
            UPDATE checkout_documents SET
                code = ?2, status = ?3, org_unit_id = ?4, note = ?5, updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&root.code)
        .bind(&root.status)
        .bind(root.org_unit_id)
        .bind(&root.note)
        .bind(root.updated_at)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::persist_failed("checkout_documents"));
        }

        Ok(())
    }

    async fn persist_child(
        &self,
        conn: &mut SqliteConnection,
        root_id: i64,
        child: &mut CheckOutLine,
    ) -> DbResult<()> {
        child.document_id = Some(root_id);

        match child.id {
            None => {
                let id: i64 = sqlx::query_scalar(
                    r#"
                    INSERT INTO checkout_lines (document_id, product_code, quantity, created_at)
                    VALUES (?1, ?2, ?3, ?4)
                    RETURNING id
                    "#,
                )
                .bind(root_id)
                .bind(&child.product_code)
                .bind(child.quantity)
                .bind(child.created_at)
                .fetch_one(&mut *conn)
                .await?;

                child.id = Some(id);
            }
            Some(id) => {
                let result = sqlx::query(
                    r#"
                    UPDATE checkout_lines SET
                        document_id = ?2, product_code = ?3, quantity = ?4
                    WHERE id = ?1
                    "#,
                )
                .bind(id)
                .bind(root_id)
                .bind(&child.product_code)
                .bind(child.quantity)
                .execute(&mut *conn)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(DbError::persist_failed("checkout_lines"));
                }
            }
        }

        Ok(())
    }

    async fn apply_side_effect(
        &self,
        conn: &mut SqliteConnection,
        _root: &CheckOutDocument,
        child: &CheckOutLine,
    ) -> DbResult<()> {
        // Approved check-outs move stock OUT of the org unit
        StockRepository::adjust(conn, &child.product_code, -child.quantity).await
    }
}
