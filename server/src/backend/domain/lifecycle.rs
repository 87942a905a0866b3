//! Loan lifecycle state machine.
//!
//! The single place where a loan's status is decided. Every mutator (payment,
//! settlement, reconduction, cancellation, overdue scan) goes through
//! [`LifecycleStateMachine::derive`] and [`LifecycleStateMachine::transition`].
//!
//! ```text
//! active  -> partial | overdue | settled | cancelled
//! partial -> overdue | settled | cancelled
//! overdue -> partial | settled | cancelled | active (reconduction)
//! settled, cancelled: terminal
//! ```

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::backend::domain::errors::{LoanError, LoanResult};
use crate::backend::domain::models::loan::{Loan, LoanStatus};

pub struct LifecycleStateMachine;

impl LifecycleStateMachine {
    /// Derive the status a loan should have given its balance and the date.
    ///
    /// Overdue dominates partial; a fully repaid loan is settled even when its
    /// due date has passed.
    pub fn derive(
        current: LoanStatus,
        total_paid: Decimal,
        total_due: Decimal,
        due_date: NaiveDate,
        today: NaiveDate,
    ) -> LoanStatus {
        if current.is_terminal() {
            current
        } else if total_paid >= total_due {
            LoanStatus::Settled
        } else if due_date < today {
            LoanStatus::Overdue
        } else if total_paid > Decimal::ZERO {
            LoanStatus::Partial
        } else {
            LoanStatus::Active
        }
    }

    /// Derive the status for `loan` as currently stored.
    pub fn derive_for(loan: &Loan, today: NaiveDate) -> LoanResult<LoanStatus> {
        Ok(Self::derive(
            loan.status,
            loan.total_paid,
            loan.total_due()?,
            loan.due_date,
            today,
        ))
    }

    pub fn can_transition(from: LoanStatus, to: LoanStatus) -> bool {
        use LoanStatus::*;

        match (from, to) {
            (Settled | Cancelled, _) => false,
            (a, b) if a == b => true,
            (Active, Partial | Overdue | Settled | Cancelled) => true,
            (Partial, Overdue | Settled | Cancelled) => true,
            (Overdue, Partial | Settled | Cancelled | Active) => true,
            _ => false,
        }
    }

    /// Move `loan` to `next`, rejecting edges outside the transition graph.
    pub fn transition(loan: &mut Loan, next: LoanStatus, action: &str) -> LoanResult<()> {
        if !Self::can_transition(loan.status, next) {
            return Err(LoanError::state(&loan.id, loan.status, action));
        }
        loan.status = next;
        Ok(())
    }
}
