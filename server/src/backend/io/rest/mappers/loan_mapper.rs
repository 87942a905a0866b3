use rust_decimal::Decimal;
use shared::{
    AccrualPreviewEntry, AccrualPreviewResponse, CreateLoanRequest, Loan as SharedLoan,
    LoanBalanceResponse, LoanListRequest, LoanStatus as SharedLoanStatus,
};

use crate::backend::domain::commands::loans::{CreateLoanCommand, LoanListQuery};
use crate::backend::domain::errors::LoanResult;
use crate::backend::domain::models::loan::{Loan, LoanBalance, LoanStatus};
use crate::backend::io::rest::parse_date;

pub struct LoanMapper;

impl LoanMapper {
    pub fn status_to_dto(status: LoanStatus) -> SharedLoanStatus {
        match status {
            LoanStatus::Active => SharedLoanStatus::Active,
            LoanStatus::Partial => SharedLoanStatus::Partial,
            LoanStatus::Overdue => SharedLoanStatus::Overdue,
            LoanStatus::Settled => SharedLoanStatus::Settled,
            LoanStatus::Cancelled => SharedLoanStatus::Cancelled,
        }
    }

    pub fn status_to_domain(status: SharedLoanStatus) -> LoanStatus {
        match status {
            SharedLoanStatus::Active => LoanStatus::Active,
            SharedLoanStatus::Partial => LoanStatus::Partial,
            SharedLoanStatus::Overdue => LoanStatus::Overdue,
            SharedLoanStatus::Settled => LoanStatus::Settled,
            SharedLoanStatus::Cancelled => LoanStatus::Cancelled,
        }
    }

    /// Convert a domain loan to its DTO, filling in the derived balance
    pub fn to_dto(loan: Loan) -> LoanResult<SharedLoan> {
        let balance = loan.balance()?;
        Ok(SharedLoan {
            id: loan.id,
            borrower_id: loan.borrower_id,
            guarantor_id: loan.guarantor_id,
            principal: loan.principal,
            interest_rate_percent: loan.interest_rate_percent,
            origination_date: loan.origination_date.format("%Y-%m-%d").to_string(),
            due_date: loan.due_date.format("%Y-%m-%d").to_string(),
            grace_period_months: loan.grace_period_months,
            reconduction_count: loan.reconduction_count,
            status: Self::status_to_dto(loan.status),
            total_due: balance.total_due,
            total_paid: balance.total_paid,
            remaining_due: balance.remaining_due,
            created_at: loan.created_at.to_rfc3339(),
            updated_at: loan.updated_at.to_rfc3339(),
        })
    }

    pub fn to_dto_list(loans: Vec<Loan>) -> LoanResult<Vec<SharedLoan>> {
        loans.into_iter().map(Self::to_dto).collect()
    }

    pub fn to_balance_response(loan_id: String, balance: LoanBalance) -> LoanBalanceResponse {
        LoanBalanceResponse {
            loan_id,
            total_due: balance.total_due,
            total_paid: balance.total_paid,
            remaining_due: balance.remaining_due,
            status: Self::status_to_dto(balance.status),
        }
    }

    pub fn to_create_command(request: CreateLoanRequest) -> LoanResult<CreateLoanCommand> {
        let origination_date = request
            .origination_date
            .as_deref()
            .map(|value| parse_date(value, "origination_date"))
            .transpose()?;

        Ok(CreateLoanCommand {
            borrower_id: request.borrower_id,
            guarantor_id: request.guarantor_id,
            principal: request.principal,
            interest_rate_percent: request.interest_rate_percent,
            origination_date,
            grace_period_months: request.grace_period_months,
        })
    }

    pub fn to_list_query(request: LoanListRequest) -> LoanListQuery {
        LoanListQuery {
            borrower_id: request.borrower_id.filter(|id| !id.trim().is_empty()),
            status: request.status.map(Self::status_to_domain),
        }
    }

    pub fn to_preview_response(
        principal: Decimal,
        interest_rate_percent: Decimal,
        schedule: Vec<(u32, Decimal)>,
    ) -> AccrualPreviewResponse {
        AccrualPreviewResponse {
            principal,
            interest_rate_percent,
            entries: schedule
                .into_iter()
                .map(|(reconduction_count, total_due)| AccrualPreviewEntry {
                    reconduction_count,
                    total_due,
                })
                .collect(),
        }
    }
}
