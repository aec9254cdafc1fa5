//! # Stock Balance Repository
//!
//! The side-effect target: a running quantity per product, adjusted only
//! when a document's workflow enters a terminal-effect status (check-out
//! approval decrements, invoice posting increments).

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use atlas_core::StockBalance;

use crate::error::DbResult;

/// Repository for stock balance reads and adjustments.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    /// Creates a new StockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Adjusts one product's balance by a signed delta, inside the caller's
    /// transaction. Upserts: an unseen product starts from zero.
    pub async fn adjust(
        conn: &mut SqliteConnection,
        product_code: &str,
        delta: i64,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_balances (product_code, quantity)
            VALUES (?1, ?2)
            ON CONFLICT(product_code) DO UPDATE SET quantity = quantity + excluded.quantity
            "#,
        )
        .bind(product_code)
        .bind(delta)
        .execute(&mut *conn)
        .await?;

        debug!(product_code = %product_code, delta = delta, "Adjusted stock balance");

        Ok(())
    }

    /// Current balance for one product (0 if never touched).
    pub async fn level(&self, product_code: &str) -> DbResult<i64> {
        let quantity: Option<i64> =
            sqlx::query_scalar("SELECT quantity FROM stock_balances WHERE product_code = ?1")
                .bind(product_code)
                .fetch_optional(&self.pool)
                .await?;

        Ok(quantity.unwrap_or(0))
    }

    /// Full balance row, if present.
    pub async fn get(&self, product_code: &str) -> DbResult<Option<StockBalance>> {
        let row: Option<StockBalance> = sqlx::query_as(
            "SELECT product_code, quantity FROM stock_balances WHERE product_code = ?1",
        )
        .bind(product_code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_adjust_upserts_and_accumulates() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        StockRepository::adjust(&mut conn, "SKU-1", 10).await.unwrap();
        StockRepository::adjust(&mut conn, "SKU-1", -3).await.unwrap();
        drop(conn);

        assert_eq!(db.stock().level("SKU-1").await.unwrap(), 7);
        assert_eq!(db.stock().level("SKU-2").await.unwrap(), 0);
    }
}
