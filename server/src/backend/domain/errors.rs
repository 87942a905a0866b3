//! Error taxonomy for the loan engine.
//!
//! Every variant except `Storage` is a caller-correctable condition and carries
//! enough context (loan id, status, remaining balance) for the API layer to
//! render an actionable message.

use rust_decimal::Decimal;

use crate::backend::domain::models::loan::LoanStatus;

#[derive(Debug, thiserror::Error)]
pub enum LoanError {
    #[error("{0}")]
    Validation(String),

    #[error("this member already has an active loan")]
    Conflict {
        borrower_id: String,
        existing_loan_id: Option<String>,
    },

    #[error("amount exceeds remaining balance of {remaining_due}")]
    Overpayment {
        loan_id: String,
        amount: Decimal,
        remaining_due: Decimal,
    },

    #[error("{message}")]
    State {
        loan_id: String,
        status: LoanStatus,
        message: String,
    },

    #[error("loan {0} not found")]
    NotFound(String),

    #[error("loan {loan_id} was modified concurrently, retry the operation")]
    ConcurrentModification { loan_id: String },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type LoanResult<T> = std::result::Result<T, LoanError>;

impl LoanError {
    pub fn validation(message: impl Into<String>) -> Self {
        LoanError::Validation(message.into())
    }

    /// Build the error returned when `action` is attempted on a loan whose
    /// status does not allow it.
    pub fn state(loan_id: &str, status: LoanStatus, action: &str) -> Self {
        let message = if status.is_terminal() {
            format!("this loan is already {}", status)
        } else {
            format!("cannot {} a loan that is {}", action, status)
        };
        LoanError::State {
            loan_id: loan_id.to_string(),
            status,
            message,
        }
    }
}
