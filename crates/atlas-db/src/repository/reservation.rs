//! # Reservation Pool Repository
//!
//! Lock, release, and claim operations over a pool of pre-generated numbers.
//!
//! ## Pool Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Reservation Pool Lifecycle                           │
//! │                                                                         │
//! │  populate() ──► rows: unlocked, unbound                                │
//! │                   │                                                     │
//! │     acquire_and_lock(type, user)                                       │
//! │                   │    ONE statement locks the lowest free number:     │
//! │                   │    UPDATE .. WHERE id = (SELECT id .. WHERE free   │
//! │                   │    ORDER BY number LIMIT 1) RETURNING *            │
//! │                   │    Two concurrent callers can never pick the same  │
//! │                   │    row - the select and the lock are one write.    │
//! │                   ▼                                                     │
//! │            locked-by-user ──── release_*(user) ──► back to free        │
//! │                   │                                                     │
//! │            claim(number, entity, user)                                 │
//! │                   │    binds entity id/type; row stays locked forever  │
//! │                   ▼                                                     │
//! │               claimed (final - never released, never re-issued)        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Model
//! Expected-but-unhappy outcomes are ordinary values: an empty pool returns
//! `None`, a release that holds nothing returns `false`, a claim that finds
//! no matching row returns `false`. None of these raise errors - callers
//! decide what they mean.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use atlas_core::ReservedCode;

use crate::error::DbResult;

/// Repository for reservation pool operations.
#[derive(Debug, Clone)]
pub struct ReservationRepository {
    pool: SqlitePool,
}

impl ReservationRepository {
    /// Creates a new ReservationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReservationRepository { pool }
    }

    /// Locks the lowest free number of a pool for a user.
    ///
    /// ## Returns
    /// * `Some(row)` - the number is now locked and attributed to `user`
    /// * `None` - pool exhausted; the caller decides whether that fails the
    ///   user-facing operation or triggers provisioning
    pub async fn acquire_and_lock(
        &self,
        object_type: &str,
        user: Uuid,
    ) -> DbResult<Option<ReservedCode>> {
        let mut conn = self.pool.acquire().await?;
        Self::acquire_and_lock_on(&mut conn, object_type, user).await
    }

    /// [`Self::acquire_and_lock`] against a caller-owned connection, so an
    /// orchestrated save can reserve inside its own transaction.
    pub async fn acquire_and_lock_on(
        conn: &mut SqliteConnection,
        object_type: &str,
        user: Uuid,
    ) -> DbResult<Option<ReservedCode>> {
        // Select-and-lock in one write statement; a SELECT followed by a
        // separate UPDATE would let two callers pick the same row first.
        let row: Option<ReservedCode> = sqlx::query_as(
            r#"
            UPDATE reserved_codes
            SET is_locked = 1, locked_by_user = ?2
            WHERE id = (
                SELECT id FROM reserved_codes
                WHERE object_type = ?1 AND is_locked = 0 AND linked_entity_id IS NULL
                ORDER BY number ASC
                LIMIT 1
            )
            RETURNING id, object_type, number, is_locked, locked_by_user,
                      linked_entity_id, linked_entity_type
            "#,
        )
        .bind(object_type)
        .bind(user)
        .fetch_optional(&mut *conn)
        .await?;

        match &row {
            Some(code) => {
                debug!(object_type = %object_type, number = code.number, user = %user, "Reserved code locked")
            }
            None => warn!(object_type = %object_type, "Reservation pool exhausted"),
        }

        Ok(row)
    }

    /// Releases one row by id, if `user` holds it and it is unbound.
    ///
    /// Releasing a lock not held by the user is a no-op returning `false`,
    /// never an error - releases are idempotent.
    pub async fn release_by_id(&self, id: i64, user: Uuid) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE reserved_codes
            SET is_locked = 0, locked_by_user = NULL
            WHERE id = ?1 AND locked_by_user = ?2 AND is_locked = 1
              AND linked_entity_id IS NULL
            "#,
        )
        .bind(id)
        .bind(user)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Releases one row by (object type, number), same preconditions as
    /// [`Self::release_by_id`].
    pub async fn release_by_number(
        &self,
        object_type: &str,
        number: i64,
        user: Uuid,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE reserved_codes
            SET is_locked = 0, locked_by_user = NULL
            WHERE object_type = ?1 AND number = ?2 AND locked_by_user = ?3
              AND is_locked = 1 AND linked_entity_id IS NULL
            "#,
        )
        .bind(object_type)
        .bind(number)
        .bind(user)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Releases every unbound row a user holds for an object type.
    ///
    /// ## Returns
    /// Number of rows released (0 is a legal outcome).
    pub async fn release_by_type(&self, object_type: &str, user: Uuid) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE reserved_codes
            SET is_locked = 0, locked_by_user = NULL
            WHERE object_type = ?1 AND locked_by_user = ?2 AND is_locked = 1
              AND linked_entity_id IS NULL
            "#,
        )
        .bind(object_type)
        .bind(user)
        .execute(&self.pool)
        .await?;

        debug!(object_type = %object_type, user = %user, released = result.rows_affected(), "Released held codes");

        Ok(result.rows_affected())
    }

    /// Permanently binds a locked number to a created entity.
    ///
    /// Runs on the caller's connection: an orchestrated save claims in the
    /// same transaction as the entity insert, so a failed claim rolls the
    /// insert back too.
    ///
    /// ## Returns
    /// `false` when the row is no longer locked by `user` or is already
    /// bound - the caller must treat that as a failed save.
    pub async fn claim(
        conn: &mut SqliteConnection,
        object_type: &str,
        number: i64,
        entity_id: i64,
        entity_type: &str,
        user: Uuid,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE reserved_codes
            SET linked_entity_id = ?3, linked_entity_type = ?4
            WHERE object_type = ?1 AND number = ?2 AND locked_by_user = ?5
              AND is_locked = 1 AND linked_entity_id IS NULL
            "#,
        )
        .bind(object_type)
        .bind(number)
        .bind(entity_id)
        .bind(entity_type)
        .bind(user)
        .execute(&mut *conn)
        .await?;

        let claimed = result.rows_affected() > 0;
        if claimed {
            debug!(object_type = %object_type, number = number, entity_id = entity_id, "Reserved code claimed");
        } else {
            warn!(object_type = %object_type, number = number, user = %user, "Claim matched no row");
        }

        Ok(claimed)
    }

    /// Bulk-inserts pool numbers `from..=to` for an object type.
    ///
    /// Numbers already present are skipped, so repeated seeding is safe.
    pub async fn populate(&self, object_type: &str, from: i64, to: i64) -> DbResult<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;

        for number in from..=to {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO reserved_codes (object_type, number) VALUES (?1, ?2)",
            )
            .bind(object_type)
            .bind(number)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;

        debug!(object_type = %object_type, inserted = inserted, "Populated reservation pool");

        Ok(inserted)
    }

    /// Looks up one pool row by (object type, number).
    pub async fn find_by_number(
        &self,
        object_type: &str,
        number: i64,
    ) -> DbResult<Option<ReservedCode>> {
        let row: Option<ReservedCode> = sqlx::query_as(
            r#"
            SELECT id, object_type, number, is_locked, locked_by_user,
                   linked_entity_id, linked_entity_type
            FROM reserved_codes
            WHERE object_type = ?1 AND number = ?2
            "#,
        )
        .bind(object_type)
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Counts free (unlocked, unbound) numbers for an object type.
    pub async fn free_count(&self, object_type: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM reserved_codes
            WHERE object_type = ?1 AND is_locked = 0 AND linked_entity_id IS NULL
            "#,
        )
        .bind(object_type)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use atlas_core::workflow::object_type;

    async fn pool_db() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.reservations()
            .populate(object_type::PURCHASE_INVOICE, 1, 5)
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn test_acquire_takes_lowest_free_number() {
        let db = pool_db().await;
        let user = Uuid::new_v4();

        let first = db
            .reservations()
            .acquire_and_lock(object_type::PURCHASE_INVOICE, user)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.number, 1);
        assert!(first.is_locked);
        assert_eq!(first.locked_by_user, Some(user));

        let second = db
            .reservations()
            .acquire_and_lock(object_type::PURCHASE_INVOICE, user)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.number, 2);
    }

    #[tokio::test]
    async fn test_exhausted_pool_returns_none() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let got = db
            .reservations()
            .acquire_and_lock(object_type::PURCHASE_INVOICE, Uuid::new_v4())
            .await
            .unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let db = pool_db().await;
        let holder = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        let held = db
            .reservations()
            .acquire_and_lock(object_type::PURCHASE_INVOICE, holder)
            .await
            .unwrap()
            .unwrap();

        // A stranger cannot release someone else's lock
        assert!(!db
            .reservations()
            .release_by_id(held.id, stranger)
            .await
            .unwrap());

        // The holder can, exactly once
        assert!(db.reservations().release_by_id(held.id, holder).await.unwrap());
        assert!(!db.reservations().release_by_id(held.id, holder).await.unwrap());

        // Released numbers return to the front of the pool
        let reacquired = db
            .reservations()
            .acquire_and_lock(object_type::PURCHASE_INVOICE, stranger)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reacquired.number, held.number);
    }

    #[tokio::test]
    async fn test_claim_binds_and_blocks_release() {
        let db = pool_db().await;
        let user = Uuid::new_v4();

        let held = db
            .reservations()
            .acquire_and_lock(object_type::PURCHASE_INVOICE, user)
            .await
            .unwrap()
            .unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let claimed = ReservationRepository::claim(
            &mut conn,
            object_type::PURCHASE_INVOICE,
            held.number,
            77,
            object_type::PURCHASE_INVOICE,
            user,
        )
        .await
        .unwrap();
        assert!(claimed);
        drop(conn);

        // Bound rows can never be released, even by the holder
        assert!(!db.reservations().release_by_id(held.id, user).await.unwrap());

        let row = db
            .reservations()
            .find_by_number(object_type::PURCHASE_INVOICE, held.number)
            .await
            .unwrap()
            .unwrap();
        assert!(row.is_claimed());
        assert!(row.is_locked);
        assert_eq!(row.linked_entity_id, Some(77));
    }

    #[tokio::test]
    async fn test_claim_by_non_holder_fails() {
        let db = pool_db().await;
        let holder = Uuid::new_v4();

        let held = db
            .reservations()
            .acquire_and_lock(object_type::PURCHASE_INVOICE, holder)
            .await
            .unwrap()
            .unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let claimed = ReservationRepository::claim(
            &mut conn,
            object_type::PURCHASE_INVOICE,
            held.number,
            77,
            object_type::PURCHASE_INVOICE,
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        assert!(!claimed);
    }

    #[tokio::test]
    async fn test_release_by_type_clears_all_held() {
        let db = pool_db().await;
        let user = Uuid::new_v4();

        for _ in 0..3 {
            db.reservations()
                .acquire_and_lock(object_type::PURCHASE_INVOICE, user)
                .await
                .unwrap()
                .unwrap();
        }

        let released = db
            .reservations()
            .release_by_type(object_type::PURCHASE_INVOICE, user)
            .await
            .unwrap();
        assert_eq!(released, 3);
        assert_eq!(
            db.reservations()
                .free_count(object_type::PURCHASE_INVOICE)
                .await
                .unwrap(),
            5
        );
    }
}
