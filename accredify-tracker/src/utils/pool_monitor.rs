//! Connection pool monitoring utilities
//!
//! Instrumented transactions that log how long a connection took to acquire
//! and how long it was held, for diagnosing writer contention.

use accredify_common::{Error, Result};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::time::Instant;

/// Transaction wrapper that logs acquisition and release timing
pub struct MonitoredTransaction<'c> {
    tx: Option<Transaction<'c, Sqlite>>,
    caller: &'static str,
    acquired_at: Instant,
}

fn consumed() -> Error {
    Error::Internal("Transaction already consumed".to_string())
}

impl<'c> MonitoredTransaction<'c> {
    fn new(tx: Transaction<'c, Sqlite>, caller: &'static str, acquired_at: Instant) -> Self {
        Self {
            tx: Some(tx),
            caller,
            acquired_at,
        }
    }

    /// Connection to run repository calls on
    pub fn conn(&mut self) -> Result<&mut SqliteConnection> {
        let tx = self.tx.as_mut().ok_or_else(consumed)?;
        Ok(&mut **tx)
    }

    /// Commit the transaction and log release timing
    pub async fn commit(mut self) -> Result<()> {
        let held_ms = self.acquired_at.elapsed().as_millis();
        let tx = self.tx.take().ok_or_else(consumed)?;

        tx.commit().await?;

        // Long-held write transactions block every other writer
        if held_ms > 2000 {
            tracing::warn!(
                caller = self.caller,
                held_ms = held_ms,
                "LONG TRANSACTION - Connection held for extended period, other writers were blocked"
            );
        } else if held_ms > 1000 {
            tracing::info!(
                caller = self.caller,
                held_ms = held_ms,
                "Transaction held longer than expected (>1s)"
            );
        } else {
            tracing::debug!(
                caller = self.caller,
                held_ms = held_ms,
                "Connection released (commit)"
            );
        }

        Ok(())
    }

    /// Roll back the transaction and log release timing
    pub async fn rollback(mut self) -> Result<()> {
        let held_ms = self.acquired_at.elapsed().as_millis();
        let tx = self.tx.take().ok_or_else(consumed)?;

        tx.rollback().await?;

        if held_ms > 2000 {
            tracing::warn!(
                caller = self.caller,
                held_ms = held_ms,
                "LONG TRANSACTION - Connection held for extended period before rollback"
            );
        } else {
            tracing::debug!(
                caller = self.caller,
                held_ms = held_ms,
                "Connection released (rollback)"
            );
        }

        Ok(())
    }
}

impl<'c> Drop for MonitoredTransaction<'c> {
    fn drop(&mut self) {
        if self.tx.is_some() {
            let held_ms = self.acquired_at.elapsed().as_millis();

            // sqlx rolls back on drop; this is normally an early `?` return
            if held_ms > 2000 {
                tracing::warn!(
                    caller = self.caller,
                    held_ms = held_ms,
                    "LONG TRANSACTION DROPPED - Connection held then released via Drop (error path?)"
                );
            } else {
                tracing::debug!(
                    caller = self.caller,
                    held_ms = held_ms,
                    "Connection released (drop)"
                );
            }
        }
    }
}

/// Begin a monitored transaction with connection pool timing logs
///
/// # Example
/// ```ignore
/// let mut tx = begin_monitored(&pool, "review_workflow::accept").await?;
/// db::evidence::load(tx.conn()?, evidence_id).await?;
/// tx.commit().await?;
/// ```
pub async fn begin_monitored<'c>(
    pool: &'c SqlitePool,
    caller: &'static str,
) -> Result<MonitoredTransaction<'c>> {
    let start = Instant::now();

    tracing::debug!(caller = caller, "Connection acquisition requested");

    let tx = pool.begin().await?;

    let wait_ms = start.elapsed().as_millis();

    if wait_ms > 1000 {
        tracing::warn!(
            caller = caller,
            wait_ms = wait_ms,
            "SLOW CONNECTION ACQUISITION - Pool may be saturated (all connections in use)"
        );
    } else if wait_ms > 500 {
        tracing::info!(
            caller = caller,
            wait_ms = wait_ms,
            "Connection acquisition slower than expected (>500ms)"
        );
    } else {
        tracing::debug!(caller = caller, wait_ms = wait_ms, "Connection acquired");
    }

    Ok(MonitoredTransaction::new(tx, caller, Instant::now()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_pool() -> (TempDir, SqlitePool) {
        let dir = TempDir::new().unwrap();
        let pool = accredify_common::db::init_database(&dir.path().join("test.db"))
            .await
            .unwrap();
        (dir, pool)
    }

    #[tokio::test]
    async fn test_commit_persists_writes() {
        let (_dir, pool) = test_pool().await;

        let mut tx = begin_monitored(&pool, "test::commit").await.unwrap();
        sqlx::query("INSERT INTO projects (id, name, created_at) VALUES ('p1', 'Kept', '2024-01-01T00:00:00Z')")
            .execute(tx.conn().unwrap())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_rollback_and_drop_discard_writes() {
        let (_dir, pool) = test_pool().await;

        let mut tx = begin_monitored(&pool, "test::rollback").await.unwrap();
        sqlx::query("INSERT INTO projects (id, name, created_at) VALUES ('p1', 'Gone', '2024-01-01T00:00:00Z')")
            .execute(tx.conn().unwrap())
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        {
            let mut tx = begin_monitored(&pool, "test::drop").await.unwrap();
            sqlx::query("INSERT INTO projects (id, name, created_at) VALUES ('p2', 'Gone', '2024-01-01T00:00:00Z')")
                .execute(tx.conn().unwrap())
                .await
                .unwrap();
        }

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
