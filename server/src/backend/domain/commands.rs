//! Domain-level command and query types
//! These structs are used by services inside the domain layer and are **not**
//! exposed over the public API. The REST layer is responsible for mapping the
//! public DTOs defined in the `shared` crate to these internal types.

pub mod loans {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use crate::backend::domain::models::loan::LoanStatus;

    /// Input for creating a new loan.
    #[derive(Debug, Clone)]
    pub struct CreateLoanCommand {
        pub borrower_id: String,
        pub guarantor_id: Option<String>,
        pub principal: Decimal,
        pub interest_rate_percent: Option<Decimal>,
        pub origination_date: Option<NaiveDate>,
        pub grace_period_months: Option<u32>,
    }

    /// Filter for listing loans. Empty fields match everything.
    #[derive(Debug, Clone, Default)]
    pub struct LoanListQuery {
        pub borrower_id: Option<String>,
        pub status: Option<LoanStatus>,
    }
}

pub mod payments {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use crate::backend::domain::models::payment::PaymentMode;

    /// Input for recording a repayment.
    #[derive(Debug, Clone)]
    pub struct RecordPaymentCommand {
        pub loan_id: String,
        pub amount: Decimal,
        /// Defaults to today when omitted
        pub payment_date: Option<NaiveDate>,
        pub mode: PaymentMode,
        pub notes: Option<String>,
    }

    /// Input for settling the whole remaining balance today.
    #[derive(Debug, Clone)]
    pub struct SettleLoanCommand {
        pub loan_id: String,
        pub mode: Option<PaymentMode>,
    }
}
