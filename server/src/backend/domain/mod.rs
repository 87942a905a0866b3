//! # Domain Module
//!
//! Contains all business logic for member loans.
//!
//! This module encapsulates the rules that decide what a member owes, how
//! repayments are applied and when a loan changes state. It operates
//! independently of the HTTP layer and of the storage backend, which it
//! reaches only through the traits in [`crate::backend::storage`].
//!
//! ## Module Organization
//!
//! - **accrual**: Pure compounding-interest calculation and previews
//! - **lifecycle**: The loan state machine; the only place status is decided
//! - **loan_registry**: Loan creation, reconduction, cancellation and queries
//! - **payment_ledger**: Repayments and settlement in full
//! - **overdue_scanner**: Periodic overdue detection and notification requests
//! - **members**: Lookup of borrowers and guarantors
//! - **notifications**: Outbound overdue notices
//!
//! ## Core Concepts
//!
//! - **Loan**: A principal lent to a borrower, optionally backed by a guarantor
//! - **Grace period**: Months between origination (or reconduction) and the due date
//! - **Reconduction**: Rolling an unpaid loan over for one more grace period,
//!   compounding one more period of interest
//! - **Payment**: A partial or full repayment; the payment rows are the ledger
//!
//! ## Business Rules
//!
//! - `total_due = principal × (1 + rate/100)^(1 + reconductions)`, rounded to cents
//! - A borrower has at most one active, partial or overdue loan
//! - Payments never exceed the remaining balance
//! - Settled and cancelled loans never change again

pub mod accrual;
pub mod commands;
pub mod errors;
pub mod lifecycle;
pub mod loan_registry;
pub mod members;
pub mod models;
pub mod notifications;
pub mod overdue_scanner;
pub mod payment_ledger;

pub use errors::{LoanError, LoanResult};
pub use lifecycle::LifecycleStateMachine;
pub use loan_registry::{LoanPolicy, LoanRegistry};
pub use overdue_scanner::OverdueScanner;
pub use payment_ledger::PaymentLedger;
