use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::debug;

use super::loan_repository::parse_decimal;
use crate::backend::domain::models::loan::Loan;
use crate::backend::domain::models::payment::{Payment, PaymentMode};
use crate::backend::storage::connection::DbConnection;
use crate::backend::storage::traits::PaymentStorage;

/// Repository for payment operations
#[derive(Clone)]
pub struct PaymentRepository {
    db: DbConnection,
}

impl PaymentRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    fn row_to_payment(row: &SqliteRow) -> Result<Payment> {
        let mode: String = row.try_get("mode")?;
        Ok(Payment {
            id: row.try_get("id")?,
            loan_id: row.try_get("loan_id")?,
            amount: parse_decimal(row, "amount")?,
            payment_date: row.try_get("payment_date")?,
            mode: PaymentMode::from_string(&mode).map_err(anyhow::Error::msg)?,
            notes: row.try_get("notes")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl PaymentStorage for PaymentRepository {
    async fn append_payment(&self, payment: &Payment, loan: &Loan, expected_version: i64) -> Result<bool> {
        let mut tx = self.db.pool().begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE loans
            SET status = ?, total_paid = ?, version = ?, updated_at = ?
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(loan.status.as_str())
        .bind(loan.total_paid.to_string())
        .bind(loan.version)
        .bind(loan.updated_at)
        .bind(&loan.id)
        .bind(expected_version)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            debug!(loan_id = %loan.id, expected_version, "Stale loan version, payment not stored");
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO payments (id, loan_id, amount, payment_date, mode, notes, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.loan_id)
        .bind(payment.amount.to_string())
        .bind(payment.payment_date)
        .bind(payment.mode.as_str())
        .bind(&payment.notes)
        .bind(payment.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn list_payments(&self, loan_id: &str) -> Result<Vec<Payment>> {
        let rows = sqlx::query(
            r#"
            SELECT id, loan_id, amount, payment_date, mode, notes, created_at
            FROM payments
            WHERE loan_id = ?
            ORDER BY payment_date ASC, ROWID ASC
            "#,
        )
        .bind(loan_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(Self::row_to_payment).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::models::loan::LoanStatus;
    use crate::backend::storage::repositories::LoanRepository;
    use crate::backend::storage::traits::LoanStorage;
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    async fn setup() -> (LoanRepository, PaymentRepository, Loan) {
        let db = DbConnection::init_test().await.unwrap();
        let loans = LoanRepository::new(db.clone());
        let payments = PaymentRepository::new(db);
        let now = Utc::now();
        let loan = Loan {
            id: Loan::generate_id(),
            borrower_id: "member::1".to_string(),
            guarantor_id: None,
            principal: dec!(50000),
            interest_rate_percent: dec!(5),
            origination_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            grace_period_months: 2,
            reconduction_count: 0,
            status: LoanStatus::Active,
            total_paid: Decimal::ZERO,
            version: 0,
            overdue_notified_at: None,
            created_at: now,
            updated_at: now,
        };
        loans.insert_loan(&loan).await.unwrap();
        (loans, payments, loan)
    }

    fn payment_for(loan: &Loan, amount: Decimal, day: u32) -> Payment {
        Payment {
            id: Payment::generate_id(),
            loan_id: loan.id.clone(),
            amount,
            payment_date: NaiveDate::from_ymd_opt(2025, 2, day).unwrap(),
            mode: PaymentMode::MobileMoney,
            notes: Some("acompte".to_string()),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_append_payment_updates_loan_atomically() {
        let (loans, payments, loan) = setup().await;

        let mut updated = loan.clone();
        updated.total_paid = dec!(20000);
        updated.status = LoanStatus::Partial;
        updated.version = 1;

        let payment = payment_for(&loan, dec!(20000), 1);
        assert!(payments.append_payment(&payment, &updated, 0).await.unwrap());

        let stored = loans.get_loan(&loan.id).await.unwrap().unwrap();
        assert_eq!(stored.total_paid, dec!(20000));
        assert_eq!(stored.status, LoanStatus::Partial);
        assert_eq!(stored.version, 1);

        let history = payments.list_payments(&loan.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].mode, PaymentMode::MobileMoney);
        assert_eq!(history[0].notes.as_deref(), Some("acompte"));
    }

    #[tokio::test]
    async fn test_stale_version_stores_nothing() {
        let (loans, payments, loan) = setup().await;

        let mut updated = loan.clone();
        updated.total_paid = dec!(1000);
        updated.version = 6;

        let payment = payment_for(&loan, dec!(1000), 1);
        assert!(!payments.append_payment(&payment, &updated, 5).await.unwrap());

        assert!(payments.list_payments(&loan.id).await.unwrap().is_empty());
        let stored = loans.get_loan(&loan.id).await.unwrap().unwrap();
        assert_eq!(stored.total_paid, Decimal::ZERO);
        assert_eq!(stored.version, 0);
    }

    #[tokio::test]
    async fn test_history_ordered_by_payment_date() {
        let (_loans, payments, loan) = setup().await;

        let mut current = loan.clone();
        for (amount, day) in [(dec!(300), 20), (dec!(100), 5), (dec!(200), 12)] {
            let expected = current.version;
            current.version += 1;
            current.total_paid += amount;
            assert!(payments
                .append_payment(&payment_for(&loan, amount, day), &current, expected)
                .await
                .unwrap());
        }

        let amounts: Vec<Decimal> = payments
            .list_payments(&loan.id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.amount)
            .collect();
        assert_eq!(amounts, vec![dec!(100), dec!(200), dec!(300)]);
    }
}
