use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::backend::storage::repositories::{LoanRepository, PaymentRepository};
use crate::backend::storage::traits::Connection;

/// DbConnection manages the SQLite pool and the loan schema
#[derive(Clone)]
pub struct DbConnection {
    pool: Arc<SqlitePool>,
}

impl DbConnection {
    /// Create a new database connection, creating the database file if needed
    pub async fn new(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        Self::setup_schema(&pool).await?;
        info!(url, max_connections, "Loan database ready");

        Ok(Self { pool: Arc::new(pool) })
    }

    /// Initialize a private in-memory database for tests.
    ///
    /// A single pooled connection that is never recycled keeps the in-memory
    /// database alive for the lifetime of the pool.
    #[cfg(test)]
    pub async fn init_test() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::setup_schema(&pool).await?;

        Ok(Self { pool: Arc::new(pool) })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Set up the required database schema
    async fn setup_schema(pool: &SqlitePool) -> Result<()> {
        // Amounts are stored as decimal strings to keep them exact
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS loans (
                id TEXT PRIMARY KEY,
                borrower_id TEXT NOT NULL,
                guarantor_id TEXT,
                principal TEXT NOT NULL,
                interest_rate_percent TEXT NOT NULL,
                origination_date TEXT NOT NULL,
                due_date TEXT NOT NULL,
                grace_period_months INTEGER NOT NULL CHECK (grace_period_months > 0),
                reconduction_count INTEGER NOT NULL DEFAULT 0 CHECK (reconduction_count >= 0),
                status TEXT NOT NULL,
                total_paid TEXT NOT NULL DEFAULT '0',
                version INTEGER NOT NULL DEFAULT 0,
                overdue_notified_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                CHECK (guarantor_id IS NULL OR guarantor_id <> borrower_id)
            );
            "#,
        )
        .execute(pool)
        .await?;

        // At most one active/partial/overdue loan per borrower
        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_loans_one_open_per_borrower
            ON loans(borrower_id)
            WHERE status IN ('active', 'partial', 'overdue');
            "#,
        )
        .execute(pool)
        .await?;

        // Overdue scans read by status
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_loans_status
            ON loans(status, due_date);
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS payments (
                id TEXT PRIMARY KEY,
                loan_id TEXT NOT NULL,
                amount TEXT NOT NULL,
                payment_date TEXT NOT NULL,
                mode TEXT NOT NULL,
                notes TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (loan_id) REFERENCES loans (id)
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_payments_loan_id
            ON payments(loan_id, payment_date);
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

impl Connection for DbConnection {
    type LoanRepository = LoanRepository;
    type PaymentRepository = PaymentRepository;

    fn create_loan_repository(&self) -> Self::LoanRepository {
        LoanRepository::new(self.clone())
    }

    fn create_payment_repository(&self) -> Self::PaymentRepository {
        PaymentRepository::new(self.clone())
    }
}
