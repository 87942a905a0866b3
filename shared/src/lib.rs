use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a loan as exposed over the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    /// Running, nothing repaid yet
    Active,
    /// Running, partially repaid
    Partial,
    /// Due date passed without full repayment
    Overdue,
    /// Fully repaid (terminal)
    Settled,
    /// Cancelled by an administrator (terminal)
    Cancelled,
}

/// How a repayment was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    Cash,
    Transfer,
    Check,
    MobileMoney,
}

/// A member loan with its derived balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    /// Loan ID in format: "loan::<uuid>"
    pub id: String,
    pub borrower_id: String,
    pub guarantor_id: Option<String>,
    pub principal: Decimal,
    /// Interest applied per grace period, in percent
    pub interest_rate_percent: Decimal,
    /// Calendar date (YYYY-MM-DD)
    pub origination_date: String,
    /// Calendar date (YYYY-MM-DD)
    pub due_date: String,
    pub grace_period_months: u32,
    pub reconduction_count: u32,
    pub status: LoanStatus,
    /// Principal plus compounded interest
    pub total_due: Decimal,
    pub total_paid: Decimal,
    pub remaining_due: Decimal,
    /// RFC 3339 timestamp
    pub created_at: String,
    /// RFC 3339 timestamp
    pub updated_at: String,
}

/// A single repayment recorded against a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    /// Payment ID in format: "payment::<uuid>"
    pub id: String,
    pub loan_id: String,
    pub amount: Decimal,
    /// Calendar date (YYYY-MM-DD)
    pub payment_date: String,
    pub mode: PaymentMode,
    pub notes: Option<String>,
    /// RFC 3339 timestamp
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateLoanRequest {
    pub borrower_id: String,
    pub guarantor_id: Option<String>,
    pub principal: Decimal,
    /// Defaults to the configured rate when omitted
    pub interest_rate_percent: Option<Decimal>,
    /// Optional date override (YYYY-MM-DD) - uses today if not provided
    pub origination_date: Option<String>,
    /// Defaults to the configured grace period when omitted
    pub grace_period_months: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateLoanResponse {
    pub loan: Loan,
    pub success_message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoanListRequest {
    pub borrower_id: Option<String>,
    pub status: Option<LoanStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanListResponse {
    pub loans: Vec<Loan>,
}

/// Read-only balance view of a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanBalanceResponse {
    pub loan_id: String,
    pub total_due: Decimal,
    pub total_paid: Decimal,
    pub remaining_due: Decimal,
    pub status: LoanStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPaymentRequest {
    pub amount: Decimal,
    /// Optional date override (YYYY-MM-DD) - uses today if not provided
    pub payment_date: Option<String>,
    pub mode: PaymentMode,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettleLoanRequest {
    /// Defaults to cash
    pub mode: Option<PaymentMode>,
}

/// Response shared by every mutating loan operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanActionResponse {
    pub loan: Loan,
    pub success_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentListResponse {
    pub loan_id: String,
    pub payments: Vec<Payment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccrualPreviewRequest {
    pub principal: Decimal,
    /// Defaults to the configured rate; `rate` is accepted as a short query name
    #[serde(default, alias = "rate")]
    pub interest_rate_percent: Option<Decimal>,
    /// Number of reconductions to project (defaults to 3)
    #[serde(default)]
    pub horizon: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccrualPreviewEntry {
    pub reconduction_count: u32,
    pub total_due: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccrualPreviewResponse {
    pub principal: Decimal,
    pub interest_rate_percent: Decimal,
    pub entries: Vec<AccrualPreviewEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverdueScanResponse {
    /// RFC 3339 timestamp the scan was evaluated at
    pub scanned_at: String,
    pub transitioned: Vec<Loan>,
}

/// Error body returned by every failing endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error kind, e.g. "overpayment"
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LoanStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_due: Option<Decimal>,
}
