use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::str::FromStr;
use tracing::debug;

use crate::backend::domain::models::loan::{Loan, LoanStatus};
use crate::backend::storage::connection::DbConnection;
use crate::backend::storage::traits::{LoanInsertOutcome, LoanStorage};

const LOAN_COLUMNS: &str = "id, borrower_id, guarantor_id, principal, interest_rate_percent, \
     origination_date, due_date, grace_period_months, reconduction_count, status, total_paid, \
     version, overdue_notified_at, created_at, updated_at";

/// Repository for loan operations
#[derive(Clone)]
pub struct LoanRepository {
    db: DbConnection,
}

impl LoanRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    fn row_to_loan(row: &SqliteRow) -> Result<Loan> {
        let status: String = row.try_get("status")?;
        let grace_period_months: i64 = row.try_get("grace_period_months")?;
        let reconduction_count: i64 = row.try_get("reconduction_count")?;

        Ok(Loan {
            id: row.try_get("id")?,
            borrower_id: row.try_get("borrower_id")?,
            guarantor_id: row.try_get("guarantor_id")?,
            principal: parse_decimal(row, "principal")?,
            interest_rate_percent: parse_decimal(row, "interest_rate_percent")?,
            origination_date: row.try_get("origination_date")?,
            due_date: row.try_get("due_date")?,
            grace_period_months: u32::try_from(grace_period_months)
                .context("grace_period_months out of range")?,
            reconduction_count: u32::try_from(reconduction_count)
                .context("reconduction_count out of range")?,
            status: LoanStatus::from_string(&status).map_err(anyhow::Error::msg)?,
            total_paid: parse_decimal(row, "total_paid")?,
            version: row.try_get("version")?,
            overdue_notified_at: row.try_get("overdue_notified_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

pub(crate) fn parse_decimal(row: &SqliteRow, column: &str) -> Result<Decimal> {
    let raw: String = row.try_get(column)?;
    Decimal::from_str(&raw).with_context(|| format!("invalid decimal in column {}: {}", column, raw))
}

#[async_trait]
impl LoanStorage for LoanRepository {
    async fn insert_loan(&self, loan: &Loan) -> Result<LoanInsertOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO loans (id, borrower_id, guarantor_id, principal, interest_rate_percent,
                               origination_date, due_date, grace_period_months, reconduction_count,
                               status, total_paid, version, overdue_notified_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&loan.id)
        .bind(&loan.borrower_id)
        .bind(&loan.guarantor_id)
        .bind(loan.principal.to_string())
        .bind(loan.interest_rate_percent.to_string())
        .bind(loan.origination_date)
        .bind(loan.due_date)
        .bind(i64::from(loan.grace_period_months))
        .bind(i64::from(loan.reconduction_count))
        .bind(loan.status.as_str())
        .bind(loan.total_paid.to_string())
        .bind(loan.version)
        .bind(loan.overdue_notified_at)
        .bind(loan.created_at)
        .bind(loan.updated_at)
        .execute(self.db.pool())
        .await;

        match result {
            Ok(_) => Ok(LoanInsertOutcome::Inserted),
            // The partial unique index rejects a second open loan for the borrower
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                debug!(borrower_id = %loan.borrower_id, "Open-loan unique index rejected insert");
                Ok(LoanInsertOutcome::BorrowerHasOpenLoan)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_loan(&self, loan_id: &str) -> Result<Option<Loan>> {
        let query = format!("SELECT {} FROM loans WHERE id = ?", LOAN_COLUMNS);
        let row = sqlx::query(&query)
            .bind(loan_id)
            .fetch_optional(self.db.pool())
            .await?;

        row.as_ref().map(Self::row_to_loan).transpose()
    }

    async fn find_open_loan(&self, borrower_id: &str) -> Result<Option<Loan>> {
        let query = format!(
            "SELECT {} FROM loans WHERE borrower_id = ? AND status IN ('active', 'partial', 'overdue') LIMIT 1",
            LOAN_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(borrower_id)
            .fetch_optional(self.db.pool())
            .await?;

        row.as_ref().map(Self::row_to_loan).transpose()
    }

    async fn list_loans(&self, borrower_id: Option<&str>, statuses: &[LoanStatus]) -> Result<Vec<Loan>> {
        let mut conditions = Vec::new();
        if borrower_id.is_some() {
            conditions.push("borrower_id = ?".to_string());
        }
        if !statuses.is_empty() {
            let placeholders = statuses.iter().map(|_| "?").collect::<Vec<_>>().join(",");
            conditions.push(format!("status IN ({})", placeholders));
        }

        let mut query_str = format!("SELECT {} FROM loans", LOAN_COLUMNS);
        if !conditions.is_empty() {
            query_str.push_str(" WHERE ");
            query_str.push_str(&conditions.join(" AND "));
        }
        query_str.push_str(" ORDER BY origination_date ASC, created_at ASC");

        let mut query = sqlx::query(&query_str);
        if let Some(borrower_id) = borrower_id {
            query = query.bind(borrower_id);
        }
        for status in statuses {
            query = query.bind(status.as_str());
        }

        let rows = query.fetch_all(self.db.pool()).await?;
        rows.iter().map(Self::row_to_loan).collect()
    }

    async fn update_loan(&self, loan: &Loan, expected_version: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE loans
            SET due_date = ?, reconduction_count = ?, status = ?, total_paid = ?,
                version = ?, overdue_notified_at = ?, updated_at = ?
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(loan.due_date)
        .bind(i64::from(loan.reconduction_count))
        .bind(loan.status.as_str())
        .bind(loan.total_paid.to_string())
        .bind(loan.version)
        .bind(loan.overdue_notified_at)
        .bind(loan.updated_at)
        .bind(&loan.id)
        .bind(expected_version)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
