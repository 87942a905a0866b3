//! Domain model for a member loan.
use chrono::{DateTime, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::backend::domain::accrual::compute_total_due;
use crate::backend::domain::errors::{LoanError, LoanResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanStatus {
    Active,
    Partial,
    Overdue,
    Settled,
    Cancelled,
}

impl LoanStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoanStatus::Settled | LoanStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "active",
            LoanStatus::Partial => "partial",
            LoanStatus::Overdue => "overdue",
            LoanStatus::Settled => "settled",
            LoanStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_string(value: &str) -> Result<Self, String> {
        match value {
            "active" => Ok(LoanStatus::Active),
            "partial" => Ok(LoanStatus::Partial),
            "overdue" => Ok(LoanStatus::Overdue),
            "settled" => Ok(LoanStatus::Settled),
            "cancelled" => Ok(LoanStatus::Cancelled),
            other => Err(format!("unknown loan status '{}'", other)),
        }
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: String,
    pub borrower_id: String,
    pub guarantor_id: Option<String>,
    pub principal: Decimal,
    pub interest_rate_percent: Decimal,
    pub origination_date: NaiveDate,
    pub due_date: NaiveDate,
    pub grace_period_months: u32,
    pub reconduction_count: u32,
    pub status: LoanStatus,
    /// Sum of recorded payments, written in the same storage transaction as
    /// each payment.
    pub total_paid: Decimal,
    /// Optimistic-locking counter, bumped on every write.
    pub version: i64,
    /// When the current overdue notice was sent; cleared by reconduction.
    pub overdue_notified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Balance view derived from a loan and its payments
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoanBalance {
    pub total_due: Decimal,
    pub total_paid: Decimal,
    pub remaining_due: Decimal,
    pub status: LoanStatus,
}

impl Loan {
    pub fn generate_id() -> String {
        format!("loan::{}", uuid::Uuid::new_v4())
    }

    pub fn total_due(&self) -> LoanResult<Decimal> {
        compute_total_due(
            self.principal,
            self.interest_rate_percent,
            self.reconduction_count,
        )
    }

    pub fn remaining_due(&self) -> LoanResult<Decimal> {
        Ok(self.total_due()? - self.total_paid)
    }

    pub fn balance(&self) -> LoanResult<LoanBalance> {
        let total_due = self.total_due()?;
        Ok(LoanBalance {
            total_due,
            total_paid: self.total_paid,
            remaining_due: total_due - self.total_paid,
            status: self.status,
        })
    }
}

/// Add a grace period of whole calendar months to `date`.
///
/// Days past the end of the target month are clamped (Jan 31 + 1 month is
/// the last day of February).
pub fn add_grace_period(date: NaiveDate, months: u32) -> LoanResult<NaiveDate> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| LoanError::validation(format!("due date out of range: {} + {} months", date, months)))
}
