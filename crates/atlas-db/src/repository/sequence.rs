//! # Sequence Counter Repository
//!
//! Allocation of interval-scoped business codes from persisted counters.
//!
//! ## Allocation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Counter Allocation                                   │
//! │                                                                         │
//! │  allocate_next(tx, "InventoryCheckOut")                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UPDATE sequence_counters                                              │
//! │     SET current_number = current_number + 1                            │
//! │   WHERE object_class = ? AND is_current = 1                            │
//! │   RETURNING current_number, interval fields, template_id               │
//! │       │                                                                 │
//! │       │  ONE statement: increment and read back together.              │
//! │       │  Concurrent allocators serialize on the row lock, so no        │
//! │       │  number is ever issued twice.                                  │
//! │       ▼                                                                 │
//! │  SELECT prefix, suffix FROM sequence_templates                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  format_code(template, scope, number) ──► "CO-2403070042"              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A read-modify-write (SELECT the value, add one, UPDATE it back) would lose
//! updates under concurrency; the single UPDATE..RETURNING is the whole
//! correctness argument here.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use atlas_core::sequence::{format_code, IntervalScope, SequenceTemplate};

use crate::error::{DbError, DbResult};

/// A freshly allocated business code.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Allocation {
    /// Fully formatted code (prefix + interval + padded counter + suffix).
    pub code: String,

    /// Raw post-increment counter value.
    pub number: i64,
}

/// Post-increment read-back of the current counter row.
#[derive(Debug, Clone, sqlx::FromRow)]
struct CounterRow {
    current_number: i64,
    interval_year: Option<i64>,
    interval_month: Option<i64>,
    interval_day: Option<i64>,
    template_id: i64,
}

impl CounterRow {
    fn scope(&self) -> IntervalScope {
        IntervalScope::from_parts(
            self.interval_year.map(|y| y as i32),
            self.interval_month.map(|m| m as u32),
            self.interval_day.map(|d| d as u32),
        )
    }
}

/// Repository for sequence counter operations.
#[derive(Debug, Clone)]
pub struct SequenceRepository {
    pool: SqlitePool,
}

impl SequenceRepository {
    /// Creates a new SequenceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SequenceRepository { pool }
    }

    /// Allocates the next code for an object class inside the caller's
    /// transaction.
    ///
    /// ## Errors
    /// [`DbError::CounterNotFound`] if no current counter row exists for the
    /// object class - fatal for the caller's transaction; counters must be
    /// provisioned up front.
    pub async fn allocate_next(
        conn: &mut SqliteConnection,
        object_class: &str,
    ) -> DbResult<Allocation> {
        // Increment-and-return in one statement, never read-modify-write
        let row: Option<CounterRow> = sqlx::query_as(
            r#"
            UPDATE sequence_counters
            SET current_number = current_number + 1
            WHERE object_class = ?1 AND is_current = 1
            RETURNING current_number, interval_year, interval_month, interval_day, template_id
            "#,
        )
        .bind(object_class)
        .fetch_optional(&mut *conn)
        .await?;

        let row = row.ok_or_else(|| DbError::CounterNotFound {
            object_class: object_class.to_string(),
        })?;

        let template: Option<(String, String)> =
            sqlx::query_as("SELECT prefix, suffix FROM sequence_templates WHERE id = ?1")
                .bind(row.template_id)
                .fetch_optional(&mut *conn)
                .await?;

        // A counter pointing at a missing template is a provisioning defect
        let (prefix, suffix) = template.ok_or_else(|| DbError::CounterNotFound {
            object_class: object_class.to_string(),
        })?;

        let code = format_code(
            &SequenceTemplate::new(prefix, suffix),
            row.scope(),
            row.current_number,
        );

        debug!(
            object_class = %object_class,
            number = row.current_number,
            code = %code,
            "Allocated sequence code"
        );

        Ok(Allocation {
            code,
            number: row.current_number,
        })
    }

    /// Allocates the next code in a transaction of its own.
    ///
    /// Convenience for callers that only need a code; orchestrated saves use
    /// [`SequenceRepository::allocate_next`] with their own transaction.
    pub async fn allocate(&self, object_class: &str) -> DbResult<Allocation> {
        let mut tx = self.pool.begin().await?;
        let allocation = Self::allocate_next(&mut tx, object_class).await?;
        tx.commit().await?;
        Ok(allocation)
    }

    /// Provisions a template and a current counter row for an object class.
    ///
    /// ## Arguments
    /// * `scope` - interval fields written to the counter row; determines
    ///   both code format and reset granularity
    /// * `start` - counter value before the first allocation (0 → first
    ///   code is number 1)
    ///
    /// Provisioning a class that already has a current row fails on the
    /// unique index.
    pub async fn provision(
        &self,
        object_class: &str,
        scope: IntervalScope,
        template: &SequenceTemplate,
        start: i64,
    ) -> DbResult<()> {
        let (year, month, day) = match scope {
            IntervalScope::Day { year, month, day } => {
                (Some(year as i64), Some(month as i64), Some(day as i64))
            }
            IntervalScope::Month { year, month } => (Some(year as i64), Some(month as i64), None),
            IntervalScope::Year { year } => (Some(year as i64), None, None),
            IntervalScope::None => (None, None, None),
        };

        let mut tx = self.pool.begin().await?;

        let template_id: i64 = sqlx::query_scalar(
            "INSERT INTO sequence_templates (prefix, suffix) VALUES (?1, ?2) RETURNING id",
        )
        .bind(&template.prefix)
        .bind(&template.suffix)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO sequence_counters (
                object_class, is_current, current_number,
                interval_year, interval_month, interval_day, template_id
            ) VALUES (?1, 1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(object_class)
        .bind(start)
        .bind(year)
        .bind(month)
        .bind(day)
        .bind(template_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(object_class = %object_class, start = start, "Provisioned sequence counter");

        Ok(())
    }

    /// Reads the current raw counter value without incrementing.
    pub async fn current_number(&self, object_class: &str) -> DbResult<i64> {
        let number: Option<i64> = sqlx::query_scalar(
            "SELECT current_number FROM sequence_counters WHERE object_class = ?1 AND is_current = 1",
        )
        .bind(object_class)
        .fetch_optional(&self.pool)
        .await?;

        number.ok_or_else(|| DbError::CounterNotFound {
            object_class: object_class.to_string(),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_allocate_increments_and_formats() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sequences = db.sequences();

        sequences
            .provision(
                "InventoryCheckOut",
                IntervalScope::Day {
                    year: 2024,
                    month: 3,
                    day: 7,
                },
                &SequenceTemplate::new("CO-", ""),
                0,
            )
            .await
            .unwrap();

        let first = sequences.allocate("InventoryCheckOut").await.unwrap();
        assert_eq!(first.number, 1);
        assert_eq!(first.code, "CO-2403070001");

        let second = sequences.allocate("InventoryCheckOut").await.unwrap();
        assert_eq!(second.number, 2);
        assert_eq!(second.code, "CO-2403070002");
    }

    #[tokio::test]
    async fn test_missing_counter_is_fatal() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let err = db.sequences().allocate("Unprovisioned").await.unwrap_err();
        assert!(matches!(err, DbError::CounterNotFound { .. }));
    }

    #[tokio::test]
    async fn test_second_current_row_is_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sequences = db.sequences();

        sequences
            .provision("Receipt", IntervalScope::None, &SequenceTemplate::bare(), 0)
            .await
            .unwrap();

        let err = sequences
            .provision("Receipt", IntervalScope::None, &SequenceTemplate::bare(), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }
}
