//! # Workflow History Repository
//!
//! Append-only audit of executed transitions, plus the dated workflow-config
//! lookup.
//!
//! ## The Audit Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  History Rides The Save Transaction                     │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │                                                                 │   │
//! │  │  1. UPDATE checkout_documents SET status = 'APPROVED' ...      │   │
//! │  │                                                                 │   │
//! │  │  2. INSERT INTO workflow_history (.., 'DRAFT', 'APPROVED', ..) │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ← Both succeed or both fail                                    │
//! │                                                                         │
//! │  A transition never "happened" unless its history row is durable in    │
//! │  the same commit as the entity change. Rows are never updated or       │
//! │  deleted afterwards.                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use atlas_core::{WorkflowConfigVersion, WorkflowHistoryEntry};

use crate::error::{DbError, DbResult};

/// Repository for workflow history and workflow config.
#[derive(Debug, Clone)]
pub struct HistoryRepository {
    pool: SqlitePool,
}

impl HistoryRepository {
    /// Creates a new HistoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        HistoryRepository { pool }
    }

    /// Appends one history row inside the caller's transaction.
    ///
    /// ## Returns
    /// The generated row id. A failed insert (no id comes back) is fatal for
    /// the enclosing transaction.
    pub async fn append(
        conn: &mut SqliteConnection,
        entry: &WorkflowHistoryEntry,
    ) -> DbResult<i64> {
        let id: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO workflow_history (
                linked_object_id, linked_object_type, user_id, org_unit_id,
                action_code, from_status, to_status, remark,
                created_at, modified_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            RETURNING id
            "#,
        )
        .bind(entry.linked_object_id)
        .bind(&entry.linked_object_type)
        .bind(entry.user_id)
        .bind(entry.org_unit_id)
        .bind(&entry.action_code)
        .bind(&entry.from_status)
        .bind(&entry.to_status)
        .bind(&entry.remark)
        .bind(entry.created_at)
        .bind(entry.modified_at)
        .fetch_optional(&mut *conn)
        .await?;

        let id = match id {
            Some(id) if id > 0 => id,
            _ => return Err(DbError::persist_failed("workflow_history")),
        };

        debug!(
            entity = %entry.linked_object_type,
            entity_id = entry.linked_object_id,
            from = %entry.from_status,
            to = %entry.to_status,
            "Appended workflow history"
        );

        Ok(id)
    }

    /// Returns all history rows for one entity, oldest first.
    pub async fn list_for(
        &self,
        linked_object_id: i64,
        linked_object_type: &str,
    ) -> DbResult<Vec<WorkflowHistoryEntry>> {
        let rows: Vec<WorkflowHistoryEntry> = sqlx::query_as(
            r#"
            SELECT id, linked_object_id, linked_object_type, user_id, org_unit_id,
                   action_code, from_status, to_status, remark,
                   created_at, modified_at
            FROM workflow_history
            WHERE linked_object_id = ?1 AND linked_object_type = ?2
            ORDER BY id ASC
            "#,
        )
        .bind(linked_object_id)
        .bind(linked_object_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Counts history rows for one entity.
    pub async fn count_for(
        &self,
        linked_object_id: i64,
        linked_object_type: &str,
    ) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM workflow_history
            WHERE linked_object_id = ?1 AND linked_object_type = ?2
            "#,
        )
        .bind(linked_object_id)
        .bind(linked_object_type)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Returns the workflow-config version active for an object class on a
    /// business date.
    ///
    /// A version applies when `start_date <= date` and its `end_date` is
    /// absent or on/after the date. With overlapping rows the latest
    /// `start_date` wins.
    pub async fn active_config(
        &self,
        object_class: &str,
        date: NaiveDate,
    ) -> DbResult<Option<WorkflowConfigVersion>> {
        let row: Option<WorkflowConfigVersion> = sqlx::query_as(
            r#"
            SELECT id, object_class, start_date, end_date, version
            FROM workflow_config
            WHERE object_class = ?1
              AND start_date <= ?2
              AND (end_date IS NULL OR end_date >= ?2)
            ORDER BY start_date DESC
            LIMIT 1
            "#,
        )
        .bind(object_class)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Registers a dated workflow-config version.
    pub async fn add_config(
        &self,
        object_class: &str,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
        version: &str,
    ) -> DbResult<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO workflow_config (object_class, start_date, end_date, version)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING id
            "#,
        )
        .bind(object_class)
        .bind(start_date)
        .bind(end_date)
        .bind(version)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use atlas_core::clock::{Clock, FixedClock};
    use atlas_core::workflow::object_type;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_append_and_read_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = FixedClock::at_date(2024, 3, 7).now();
        let user = Uuid::new_v4();

        let entry = WorkflowHistoryEntry::record(
            42,
            object_type::RECEIPT,
            user,
            1,
            "SUBMIT",
            "DRAFT",
            "COMPLETED",
            Some("till 3".to_string()),
            now,
        );

        let mut conn = db.pool().acquire().await.unwrap();
        let id = HistoryRepository::append(&mut conn, &entry).await.unwrap();
        assert!(id > 0);
        drop(conn);

        let rows = db.history().list_for(42, object_type::RECEIPT).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, id);
        assert_eq!(rows[0].user_id, user);
        assert_eq!(rows[0].from_status, "DRAFT");
        assert_eq!(rows[0].to_status, "COMPLETED");
        assert_eq!(rows[0].remark.as_deref(), Some("till 3"));
        assert_eq!(rows[0].created_at, now);
    }

    #[tokio::test]
    async fn test_active_config_by_date_range() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let history = db.history();

        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();

        history
            .add_config(object_type::RECEIPT, d(2023, 1, 1), Some(d(2023, 12, 31)), "v1")
            .await
            .unwrap();
        history
            .add_config(object_type::RECEIPT, d(2024, 1, 1), None, "v2")
            .await
            .unwrap();

        let v1 = history
            .active_config(object_type::RECEIPT, d(2023, 6, 1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(v1.version, "v1");

        let v2 = history
            .active_config(object_type::RECEIPT, d(2024, 6, 1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(v2.version, "v2");

        let none = history
            .active_config(object_type::RECEIPT, d(2022, 6, 1))
            .await
            .unwrap();
        assert!(none.is_none());
    }
}
