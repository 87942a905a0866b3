//! # Storage Traits
//!
//! This module defines the storage abstraction traits that allow different
//! storage backends to be used interchangeably in the domain layer.

use anyhow::Result;
use async_trait::async_trait;

use crate::backend::domain::models::loan::{Loan, LoanStatus};
use crate::backend::domain::models::payment::Payment;

/// Result of an attempt to insert a new loan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanInsertOutcome {
    Inserted,
    /// The borrower already holds an active, partial or overdue loan
    BorrowerHasOpenLoan,
}

/// Trait defining the interface for loan storage operations
///
/// Implementations must enforce "one open loan per borrower" atomically at
/// insert time and must apply updates only when the stored version matches.
#[async_trait]
pub trait LoanStorage: Send + Sync {
    /// Insert a new loan unless the borrower already has an open one
    async fn insert_loan(&self, loan: &Loan) -> Result<LoanInsertOutcome>;

    /// Retrieve a specific loan by ID
    async fn get_loan(&self, loan_id: &str) -> Result<Option<Loan>>;

    /// Find the borrower's active, partial or overdue loan, if any
    async fn find_open_loan(&self, borrower_id: &str) -> Result<Option<Loan>>;

    /// List loans, optionally restricted to one borrower and to a set of statuses
    /// (an empty slice matches every status). Ordered by origination date, oldest first.
    async fn list_loans(&self, borrower_id: Option<&str>, statuses: &[LoanStatus]) -> Result<Vec<Loan>>;

    /// Write `loan` if the stored row still has `expected_version`
    /// Returns false when another writer got there first
    async fn update_loan(&self, loan: &Loan, expected_version: i64) -> Result<bool>;
}

/// Trait defining the interface for payment storage operations
#[async_trait]
pub trait PaymentStorage: Send + Sync {
    /// Append a payment and write the updated loan in one atomic step,
    /// guarded by the loan's `expected_version`
    /// Returns false (and stores nothing) when the version check fails
    async fn append_payment(&self, payment: &Payment, loan: &Loan, expected_version: i64) -> Result<bool>;

    /// List a loan's payments ordered by payment date, then insertion
    async fn list_payments(&self, loan_id: &str) -> Result<Vec<Payment>>;
}

/// Trait defining the interface for storage connections
///
/// This trait abstracts away the specific connection type and provides
/// factory methods for creating repositories.
pub trait Connection: Send + Sync + Clone + 'static {
    type LoanRepository: LoanStorage + Clone + 'static;
    type PaymentRepository: PaymentStorage + Clone + 'static;

    fn create_loan_repository(&self) -> Self::LoanRepository;

    fn create_payment_repository(&self) -> Self::PaymentRepository;
}
