//! Payment ledger domain logic.
//!
//! Records repayments against loans and keeps each loan's cached `total_paid`
//! and status in step with its payment history. A payment and the loan update
//! it causes are stored together or not at all.
//!
//! ## Business Rules
//!
//! - Amounts are positive with at most two decimal places
//! - A payment never exceeds the remaining balance
//! - A payment is dated between the loan's origination and today
//! - Settled and cancelled loans accept no payments
//! - Settling in full pays whatever remains, dated today, and closes the loan

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

use crate::backend::domain::accrual::AMOUNT_SCALE;
use crate::backend::domain::commands::payments::{RecordPaymentCommand, SettleLoanCommand};
use crate::backend::domain::errors::{LoanError, LoanResult};
use crate::backend::domain::lifecycle::LifecycleStateMachine;
use crate::backend::domain::models::loan::{Loan, LoanStatus};
use crate::backend::domain::models::payment::{Payment, PaymentMode};
use crate::backend::storage::{Connection, LoanStorage, PaymentStorage};

const SETTLEMENT_NOTE: &str = "settled in full";

#[derive(Clone)]
pub struct PaymentLedger<C: Connection> {
    loan_repository: C::LoanRepository,
    payment_repository: C::PaymentRepository,
}

impl<C: Connection> PaymentLedger<C> {
    pub fn new(connection: Arc<C>) -> Self {
        Self {
            loan_repository: connection.create_loan_repository(),
            payment_repository: connection.create_payment_repository(),
        }
    }

    /// Record a repayment and return the updated loan
    pub async fn record_payment(&self, command: RecordPaymentCommand, now: DateTime<Utc>) -> LoanResult<Loan> {
        if command.amount <= Decimal::ZERO {
            return Err(LoanError::validation("payment amount must be positive"));
        }
        if command.amount.normalize().scale() > AMOUNT_SCALE {
            return Err(LoanError::validation(format!(
                "payment amount cannot have more than {} decimal places",
                AMOUNT_SCALE
            )));
        }

        let mut loan = self.load(&command.loan_id).await?;
        if loan.status.is_terminal() {
            return Err(LoanError::state(&loan.id, loan.status, "record a payment on"));
        }

        let today = now.date_naive();
        let payment_date = command.payment_date.unwrap_or(today);
        if payment_date < loan.origination_date {
            return Err(LoanError::validation(format!(
                "payment date {} is before the loan was granted on {}",
                payment_date, loan.origination_date
            )));
        }
        if payment_date > today {
            return Err(LoanError::validation(format!(
                "payment date {} is in the future",
                payment_date
            )));
        }

        let expected_version = loan.version;
        let paid_so_far = self.ledger_total(&loan).await?;
        let total_due = loan.total_due()?;
        let remaining_due = total_due - paid_so_far;
        if command.amount > remaining_due {
            return Err(LoanError::Overpayment {
                loan_id: loan.id,
                amount: command.amount,
                remaining_due,
            });
        }

        let payment = Payment {
            id: Payment::generate_id(),
            loan_id: loan.id.clone(),
            amount: command.amount,
            payment_date,
            mode: command.mode,
            notes: command
                .notes
                .map(|notes| notes.trim().to_string())
                .filter(|notes| !notes.is_empty()),
            created_at: now,
        };

        loan.total_paid = paid_so_far + command.amount;
        let next = LifecycleStateMachine::derive(loan.status, loan.total_paid, total_due, loan.due_date, today);
        LifecycleStateMachine::transition(&mut loan, next, "record a payment on")?;
        self.store(&payment, &mut loan, expected_version, now).await?;

        info!(
            loan_id = %loan.id,
            payment_id = %payment.id,
            amount = %payment.amount,
            mode = payment.mode.as_str(),
            total_paid = %loan.total_paid,
            status = %loan.status,
            "Payment recorded"
        );
        Ok(loan)
    }

    /// Pay off whatever remains on a loan today and mark it settled
    pub async fn settle_in_full(&self, command: SettleLoanCommand, now: DateTime<Utc>) -> LoanResult<Loan> {
        let mut loan = self.load(&command.loan_id).await?;
        if loan.status.is_terminal() {
            return Err(LoanError::state(&loan.id, loan.status, "settle"));
        }

        let expected_version = loan.version;
        let paid_so_far = self.ledger_total(&loan).await?;
        let total_due = loan.total_due()?;
        let remaining_due = total_due - paid_so_far;

        LifecycleStateMachine::transition(&mut loan, LoanStatus::Settled, "settle")?;

        if remaining_due > Decimal::ZERO {
            let payment = Payment {
                id: Payment::generate_id(),
                loan_id: loan.id.clone(),
                amount: remaining_due,
                payment_date: now.date_naive(),
                mode: command.mode.unwrap_or(PaymentMode::Cash),
                notes: Some(SETTLEMENT_NOTE.to_string()),
                created_at: now,
            };
            loan.total_paid = total_due;
            self.store(&payment, &mut loan, expected_version, now).await?;
        } else {
            loan.total_paid = paid_so_far;
            loan.version = expected_version + 1;
            loan.updated_at = now;
            if !self.loan_repository.update_loan(&loan, expected_version).await? {
                return Err(LoanError::ConcurrentModification { loan_id: loan.id });
            }
        }

        info!(
            loan_id = %loan.id,
            amount = %remaining_due,
            "Loan settled in full"
        );
        Ok(loan)
    }

    /// Payment history of a loan, oldest first
    pub async fn list_payments(&self, loan_id: &str) -> LoanResult<Vec<Payment>> {
        let loan = self.load(loan_id).await?;
        Ok(self.payment_repository.list_payments(&loan.id).await?)
    }

    async fn load(&self, loan_id: &str) -> LoanResult<Loan> {
        self.loan_repository
            .get_loan(loan_id)
            .await?
            .ok_or_else(|| LoanError::NotFound(loan_id.to_string()))
    }

    /// Sum of the stored payments; the payment rows win over the cached total
    async fn ledger_total(&self, loan: &Loan) -> LoanResult<Decimal> {
        let payments = self.payment_repository.list_payments(&loan.id).await?;
        let total: Decimal = payments.iter().map(|payment| payment.amount).sum();
        if total != loan.total_paid {
            warn!(
                loan_id = %loan.id,
                cached = %loan.total_paid,
                ledger = %total,
                "Cached total paid disagrees with payment history"
            );
        }
        Ok(total)
    }

    async fn store(
        &self,
        payment: &Payment,
        loan: &mut Loan,
        expected_version: i64,
        now: DateTime<Utc>,
    ) -> LoanResult<()> {
        loan.version = expected_version + 1;
        loan.updated_at = now;
        if !self
            .payment_repository
            .append_payment(payment, loan, expected_version)
            .await?
        {
            return Err(LoanError::ConcurrentModification {
                loan_id: loan.id.clone(),
            });
        }
        Ok(())
    }
}
