//! Loan registry domain logic.
//!
//! Owns loan records: creation, reconduction (rollover for one more grace
//! period), administrative cancellation and read-only queries.
//!
//! ## Business Rules
//!
//! - The guarantor, when present, must be a different member than the borrower
//! - A borrower holds at most one active, partial or overdue loan
//! - A new loan is due one grace period after origination
//! - Reconduction compounds interest for one more period and moves the due date
//! - Settled and cancelled loans are frozen

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

use crate::backend::domain::accrual::{compute_total_due, preview_schedule, AMOUNT_SCALE};
use crate::backend::domain::commands::loans::{CreateLoanCommand, LoanListQuery};
use crate::backend::domain::errors::{LoanError, LoanResult};
use crate::backend::domain::lifecycle::LifecycleStateMachine;
use crate::backend::domain::members::MemberDirectory;
use crate::backend::domain::models::loan::{add_grace_period, Loan, LoanBalance, LoanStatus};
use crate::backend::storage::{Connection, LoanInsertOutcome, LoanStorage};

/// Reconductions projected by an accrual preview when none is requested
pub const DEFAULT_PREVIEW_HORIZON: u32 = 3;

/// Defaults applied when a create request leaves terms unspecified
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoanPolicy {
    pub default_interest_rate_percent: Decimal,
    pub default_grace_period_months: u32,
}

impl Default for LoanPolicy {
    fn default() -> Self {
        Self {
            default_interest_rate_percent: Decimal::new(5, 0),
            default_grace_period_months: 2,
        }
    }
}

#[derive(Clone)]
pub struct LoanRegistry<C: Connection> {
    loan_repository: C::LoanRepository,
    member_directory: Arc<dyn MemberDirectory>,
    policy: LoanPolicy,
}

impl<C: Connection> LoanRegistry<C> {
    pub fn new(connection: Arc<C>, member_directory: Arc<dyn MemberDirectory>, policy: LoanPolicy) -> Self {
        Self {
            loan_repository: connection.create_loan_repository(),
            member_directory,
            policy,
        }
    }

    /// Create a new active loan for a member
    pub async fn create(&self, command: CreateLoanCommand, now: DateTime<Utc>) -> LoanResult<Loan> {
        let borrower_id = command.borrower_id.trim().to_string();
        if borrower_id.is_empty() {
            return Err(LoanError::validation("borrower is required"));
        }
        let guarantor_id = match command.guarantor_id.as_deref().map(str::trim) {
            Some("") => return Err(LoanError::validation("guarantor id cannot be blank")),
            Some(id) => Some(id.to_string()),
            None => None,
        };
        if guarantor_id.as_deref() == Some(borrower_id.as_str()) {
            return Err(LoanError::validation(
                "the guarantor must be a different member than the borrower",
            ));
        }

        self.ensure_known_member(&borrower_id, "borrower").await?;
        if let Some(guarantor_id) = &guarantor_id {
            self.ensure_known_member(guarantor_id, "guarantor").await?;
        }

        if command.principal.normalize().scale() > AMOUNT_SCALE {
            return Err(LoanError::validation(format!(
                "principal cannot have more than {} decimal places",
                AMOUNT_SCALE
            )));
        }
        let interest_rate_percent = command
            .interest_rate_percent
            .unwrap_or(self.policy.default_interest_rate_percent);
        let grace_period_months = command
            .grace_period_months
            .unwrap_or(self.policy.default_grace_period_months);
        if grace_period_months == 0 {
            return Err(LoanError::validation("grace period must be at least one month"));
        }

        // Validates principal and rate
        let total_due = compute_total_due(command.principal, interest_rate_percent, 0)?;

        let origination_date = command.origination_date.unwrap_or_else(|| now.date_naive());
        let due_date = add_grace_period(origination_date, grace_period_months)?;

        if let Some(existing) = self.loan_repository.find_open_loan(&borrower_id).await? {
            return Err(LoanError::Conflict {
                borrower_id,
                existing_loan_id: Some(existing.id),
            });
        }

        let loan = Loan {
            id: Loan::generate_id(),
            borrower_id,
            guarantor_id,
            principal: command.principal,
            interest_rate_percent,
            origination_date,
            due_date,
            grace_period_months,
            reconduction_count: 0,
            status: LoanStatus::Active,
            total_paid: Decimal::ZERO,
            version: 0,
            overdue_notified_at: None,
            created_at: now,
            updated_at: now,
        };

        match self.loan_repository.insert_loan(&loan).await? {
            LoanInsertOutcome::Inserted => {}
            LoanInsertOutcome::BorrowerHasOpenLoan => {
                warn!(borrower_id = %loan.borrower_id, "Concurrent loan creation lost the race");
                return Err(LoanError::Conflict {
                    borrower_id: loan.borrower_id,
                    existing_loan_id: None,
                });
            }
        }

        info!(
            loan_id = %loan.id,
            borrower_id = %loan.borrower_id,
            principal = %loan.principal,
            total_due = %total_due,
            due_date = %loan.due_date,
            "Loan created"
        );
        Ok(loan)
    }

    /// Roll an unpaid loan over for one more grace period
    pub async fn reconduct(&self, loan_id: &str, now: DateTime<Utc>) -> LoanResult<Loan> {
        let mut loan = self.load(loan_id).await?;
        if loan.status.is_terminal() {
            return Err(LoanError::state(&loan.id, loan.status, "reconduct"));
        }

        let expected_version = loan.version;
        loan.reconduction_count = loan
            .reconduction_count
            .checked_add(1)
            .ok_or_else(|| LoanError::validation("reconduction limit reached"))?;
        loan.due_date = add_grace_period(loan.due_date, loan.grace_period_months)?;
        // A new due date earns a new overdue notice
        loan.overdue_notified_at = None;

        let next = LifecycleStateMachine::derive_for(&loan, now.date_naive())?;
        LifecycleStateMachine::transition(&mut loan, next, "reconduct")?;
        self.save(&mut loan, expected_version, now).await?;

        info!(
            loan_id = %loan.id,
            reconduction_count = loan.reconduction_count,
            due_date = %loan.due_date,
            status = %loan.status,
            "Loan reconducted"
        );
        Ok(loan)
    }

    /// Cancel a loan; no further payments are accepted afterwards
    pub async fn cancel(&self, loan_id: &str, now: DateTime<Utc>) -> LoanResult<Loan> {
        let mut loan = self.load(loan_id).await?;
        let expected_version = loan.version;

        LifecycleStateMachine::transition(&mut loan, LoanStatus::Cancelled, "cancel")?;
        self.save(&mut loan, expected_version, now).await?;

        info!(loan_id = %loan.id, "Loan cancelled");
        Ok(loan)
    }

    pub async fn get_loan(&self, loan_id: &str) -> LoanResult<Loan> {
        self.load(loan_id).await
    }

    /// Read-only balance of a loan: total due, total paid, remaining and status
    pub async fn loan_balance(&self, loan_id: &str) -> LoanResult<LoanBalance> {
        self.load(loan_id).await?.balance()
    }

    pub async fn list_loans(&self, query: LoanListQuery) -> LoanResult<Vec<Loan>> {
        let statuses: Vec<LoanStatus> = query.status.into_iter().collect();
        Ok(self
            .loan_repository
            .list_loans(query.borrower_id.as_deref(), &statuses)
            .await?)
    }

    /// Amount owed after 0..=horizon reconductions, without touching storage
    pub fn preview_accrual(
        &self,
        principal: Decimal,
        interest_rate_percent: Option<Decimal>,
        horizon: Option<u32>,
    ) -> LoanResult<(Decimal, Vec<(u32, Decimal)>)> {
        let rate = interest_rate_percent.unwrap_or(self.policy.default_interest_rate_percent);
        let schedule = preview_schedule(principal, rate, horizon.unwrap_or(DEFAULT_PREVIEW_HORIZON))?;
        Ok((rate, schedule))
    }

    async fn load(&self, loan_id: &str) -> LoanResult<Loan> {
        self.loan_repository
            .get_loan(loan_id)
            .await?
            .ok_or_else(|| LoanError::NotFound(loan_id.to_string()))
    }

    async fn save(&self, loan: &mut Loan, expected_version: i64, now: DateTime<Utc>) -> LoanResult<()> {
        loan.version = expected_version + 1;
        loan.updated_at = now;
        if !self.loan_repository.update_loan(loan, expected_version).await? {
            return Err(LoanError::ConcurrentModification {
                loan_id: loan.id.clone(),
            });
        }
        Ok(())
    }

    async fn ensure_known_member(&self, member_id: &str, role: &str) -> LoanResult<()> {
        if self.member_directory.is_known_member(member_id).await? {
            Ok(())
        } else {
            Err(LoanError::validation(format!("unknown {} '{}'", role, member_id)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::commands::payments::RecordPaymentCommand;
    use crate::backend::domain::members::{OpenMemberDirectory, StaticMemberDirectory};
    use crate::backend::domain::models::payment::PaymentMode;
    use crate::backend::domain::notifications::LoggingNotificationGateway;
    use crate::backend::domain::overdue_scanner::OverdueScanner;
    use crate::backend::domain::payment_ledger::PaymentLedger;
    use crate::backend::storage::DbConnection;
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal_macros::dec;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn create_test_registry() -> LoanRegistry<DbConnection> {
        let db = Arc::new(DbConnection::init_test().await.expect("Failed to init test DB"));
        LoanRegistry::new(db, Arc::new(OpenMemberDirectory), LoanPolicy::default())
    }

    async fn create_test_services() -> (
        LoanRegistry<DbConnection>,
        PaymentLedger<DbConnection>,
        OverdueScanner<DbConnection>,
    ) {
        let db = Arc::new(DbConnection::init_test().await.expect("Failed to init test DB"));
        (
            LoanRegistry::new(db.clone(), Arc::new(OpenMemberDirectory), LoanPolicy::default()),
            PaymentLedger::new(db.clone()),
            OverdueScanner::new(db, Arc::new(LoggingNotificationGateway)),
        )
    }

    fn pay(loan_id: &str, amount: Decimal) -> RecordPaymentCommand {
        RecordPaymentCommand {
            loan_id: loan_id.to_string(),
            amount,
            payment_date: None,
            mode: PaymentMode::Cash,
            notes: None,
        }
    }

    fn create_command(borrower_id: &str) -> CreateLoanCommand {
        CreateLoanCommand {
            borrower_id: borrower_id.to_string(),
            guarantor_id: Some("member::guarantor".to_string()),
            principal: dec!(50000),
            interest_rate_percent: None,
            origination_date: None,
            grace_period_months: None,
        }
    }

    #[tokio::test]
    async fn test_create_loan_with_defaults() {
        let registry = create_test_registry().await;

        let loan = registry
            .create(create_command("member::b"), at(2025, 1, 10))
            .await
            .expect("Failed to create loan");

        assert!(loan.id.starts_with("loan::"));
        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(loan.interest_rate_percent, dec!(5));
        assert_eq!(loan.origination_date, date(2025, 1, 10));
        assert_eq!(loan.due_date, date(2025, 3, 10));
        assert_eq!(loan.reconduction_count, 0);

        let balance = registry.loan_balance(&loan.id).await.unwrap();
        assert_eq!(balance.total_due, dec!(52500));
        assert_eq!(balance.total_paid, Decimal::ZERO);
        assert_eq!(balance.remaining_due, dec!(52500));
    }

    #[tokio::test]
    async fn test_create_with_explicit_terms() {
        let registry = create_test_registry().await;
        let command = CreateLoanCommand {
            interest_rate_percent: Some(dec!(3)),
            origination_date: Some(date(2024, 11, 30)),
            grace_period_months: Some(3),
            ..create_command("member::b")
        };

        let loan = registry.create(command, at(2025, 1, 10)).await.unwrap();
        assert_eq!(loan.due_date, date(2025, 2, 28));
        assert_eq!(loan.balance().unwrap().total_due, dec!(51500));
    }

    #[tokio::test]
    async fn test_guarantor_cannot_be_borrower() {
        let registry = create_test_registry().await;
        let command = CreateLoanCommand {
            guarantor_id: Some("member::b".to_string()),
            ..create_command("member::b")
        };

        let result = registry.create(command, at(2025, 1, 10)).await;
        assert!(matches!(result, Err(LoanError::Validation(_))));
    }

    #[tokio::test]
    async fn test_second_open_loan_conflicts() {
        let registry = create_test_registry().await;
        let first = registry
            .create(create_command("member::b"), at(2025, 1, 10))
            .await
            .unwrap();

        let result = registry.create(create_command("member::b"), at(2025, 1, 11)).await;
        match result {
            Err(LoanError::Conflict { borrower_id, existing_loan_id }) => {
                assert_eq!(borrower_id, "member::b");
                assert_eq!(existing_loan_id, Some(first.id));
            }
            other => panic!("expected conflict, got {:?}", other),
        }

        // Another borrower is unaffected
        assert!(registry.create(create_command("member::c"), at(2025, 1, 11)).await.is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_loan_frees_the_borrower() {
        let registry = create_test_registry().await;
        let first = registry
            .create(create_command("member::b"), at(2025, 1, 10))
            .await
            .unwrap();
        registry.cancel(&first.id, at(2025, 1, 12)).await.unwrap();

        let second = registry
            .create(create_command("member::b"), at(2025, 1, 13))
            .await
            .unwrap();
        assert_eq!(second.status, LoanStatus::Active);
    }

    #[tokio::test]
    async fn test_concurrent_creates_yield_exactly_one_loan() {
        let registry = create_test_registry().await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    registry.create(create_command("member::b"), at(2025, 1, 10)).await
                })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(LoanError::Conflict { .. }) => {}
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }
        assert_eq!(created, 1);

        let open = registry
            .list_loans(LoanListQuery {
                borrower_id: Some("member::b".to_string()),
                status: None,
            })
            .await
            .unwrap();
        assert_eq!(open.len(), 1);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let registry = create_test_registry().await;

        let zero = CreateLoanCommand {
            principal: Decimal::ZERO,
            ..create_command("member::b")
        };
        assert!(matches!(registry.create(zero, at(2025, 1, 10)).await, Err(LoanError::Validation(_))));

        let negative_rate = CreateLoanCommand {
            interest_rate_percent: Some(dec!(-1)),
            ..create_command("member::b")
        };
        assert!(matches!(
            registry.create(negative_rate, at(2025, 1, 10)).await,
            Err(LoanError::Validation(_))
        ));

        let sub_cent = CreateLoanCommand {
            principal: dec!(100.005),
            ..create_command("member::b")
        };
        assert!(matches!(registry.create(sub_cent, at(2025, 1, 10)).await, Err(LoanError::Validation(_))));

        let no_grace = CreateLoanCommand {
            grace_period_months: Some(0),
            ..create_command("member::b")
        };
        assert!(matches!(registry.create(no_grace, at(2025, 1, 10)).await, Err(LoanError::Validation(_))));

        assert!(matches!(
            registry.create(create_command("  "), at(2025, 1, 10)).await,
            Err(LoanError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_members_are_rejected() {
        let db = Arc::new(DbConnection::init_test().await.unwrap());
        let directory = StaticMemberDirectory::new(["member::b", "member::guarantor"]);
        let registry = LoanRegistry::new(db, Arc::new(directory), LoanPolicy::default());

        assert!(registry.create(create_command("member::b"), at(2025, 1, 10)).await.is_ok());

        let result = registry.create(create_command("member::stranger"), at(2025, 1, 10)).await;
        assert!(matches!(result, Err(LoanError::Validation(msg)) if msg.contains("unknown borrower")));
    }

    #[tokio::test]
    async fn test_reconduct_compounds_and_moves_due_date() {
        let registry = create_test_registry().await;
        let loan = registry
            .create(create_command("member::b"), at(2025, 1, 10))
            .await
            .unwrap();

        let reconducted = registry.reconduct(&loan.id, at(2025, 3, 1)).await.unwrap();
        assert_eq!(reconducted.reconduction_count, 1);
        assert_eq!(reconducted.due_date, date(2025, 5, 10));
        assert_eq!(reconducted.status, LoanStatus::Active);
        assert_eq!(reconducted.balance().unwrap().total_due, dec!(55125));
        assert_eq!(reconducted.version, loan.version + 1);
    }

    #[tokio::test]
    async fn test_reconducting_overdue_loan_resets_the_clock() {
        let registry = create_test_registry().await;
        let loan = registry
            .create(create_command("member::b"), at(2025, 1, 10))
            .await
            .unwrap();

        // Simulate the scanner having flagged it
        let mut overdue = loan.clone();
        overdue.status = LoanStatus::Overdue;
        overdue.version = 1;
        registry.loan_repository.update_loan(&overdue, 0).await.unwrap();

        let reconducted = registry.reconduct(&loan.id, at(2025, 3, 20)).await.unwrap();
        assert_eq!(reconducted.status, LoanStatus::Active);
        assert_eq!(reconducted.due_date, date(2025, 5, 10));
    }

    #[tokio::test]
    async fn test_terminal_loans_are_frozen() {
        let registry = create_test_registry().await;
        let loan = registry
            .create(create_command("member::b"), at(2025, 1, 10))
            .await
            .unwrap();
        registry.cancel(&loan.id, at(2025, 1, 15)).await.unwrap();

        let reconduct = registry.reconduct(&loan.id, at(2025, 1, 16)).await;
        assert!(matches!(
            reconduct,
            Err(LoanError::State { status: LoanStatus::Cancelled, .. })
        ));
        let cancel_again = registry.cancel(&loan.id, at(2025, 1, 16)).await;
        assert!(matches!(cancel_again, Err(LoanError::State { .. })));
        assert_eq!(
            cancel_again.unwrap_err().to_string(),
            "this loan is already cancelled"
        );

        let stored = registry.get_loan(&loan.id).await.unwrap();
        assert_eq!(stored.reconduction_count, 0);
    }

    #[tokio::test]
    async fn test_unknown_loan_is_not_found() {
        let registry = create_test_registry().await;
        assert!(matches!(
            registry.reconduct("loan::nope", at(2025, 1, 10)).await,
            Err(LoanError::NotFound(_))
        ));
        assert!(matches!(
            registry.loan_balance("loan::nope").await,
            Err(LoanError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_preview_accrual_uses_default_rate_and_horizon() {
        let registry = create_test_registry().await;
        let (rate, schedule) = registry.preview_accrual(dec!(50000), None, None).unwrap();
        assert_eq!(rate, dec!(5));
        assert_eq!(schedule.len(), 4);
        assert_eq!(schedule[0], (0, dec!(52500)));
        assert_eq!(schedule[2], (2, dec!(57881.25)));

        assert!(matches!(
            registry.preview_accrual(dec!(50000), None, Some(25)),
            Err(LoanError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_list_loans_by_status() {
        let registry = create_test_registry().await;
        let a = registry.create(create_command("member::a"), at(2025, 1, 10)).await.unwrap();
        registry.create(create_command("member::b"), at(2025, 1, 11)).await.unwrap();
        registry.cancel(&a.id, at(2025, 1, 12)).await.unwrap();

        let cancelled = registry
            .list_loans(LoanListQuery {
                borrower_id: None,
                status: Some(LoanStatus::Cancelled),
            })
            .await
            .unwrap();
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].id, a.id);

        let everything = registry.list_loans(LoanListQuery::default()).await.unwrap();
        assert_eq!(everything.len(), 2);
    }

    #[tokio::test]
    async fn test_settled_loan_cannot_be_reconducted() {
        let (registry, ledger, _) = create_test_services().await;
        let loan = registry.create(create_command("member::b"), at(2025, 1, 10)).await.unwrap();
        ledger.record_payment(pay(&loan.id, dec!(52500)), at(2025, 2, 1)).await.unwrap();

        let result = registry.reconduct(&loan.id, at(2025, 2, 2)).await;
        assert!(matches!(
            result,
            Err(LoanError::State { status: LoanStatus::Settled, .. })
        ));

        let stored = registry.get_loan(&loan.id).await.unwrap();
        assert_eq!(stored.status, LoanStatus::Settled);
        assert_eq!(stored.reconduction_count, 0);
        assert_eq!(stored.due_date, date(2025, 3, 10));
    }

    #[tokio::test]
    async fn test_reconducting_overdue_loan_with_payments_returns_to_partial() {
        let (registry, ledger, scanner) = create_test_services().await;
        let loan = registry.create(create_command("member::b"), at(2025, 1, 10)).await.unwrap();
        ledger.record_payment(pay(&loan.id, dec!(1000)), at(2025, 2, 1)).await.unwrap();

        let flagged = scanner.tick(at(2025, 3, 11)).await.unwrap();
        assert_eq!(flagged.len(), 1);
        assert_eq!(registry.get_loan(&loan.id).await.unwrap().status, LoanStatus::Overdue);

        let reconducted = registry.reconduct(&loan.id, at(2025, 3, 12)).await.unwrap();
        assert_eq!(reconducted.status, LoanStatus::Partial);
        assert_eq!(reconducted.due_date, date(2025, 5, 10));
        assert_eq!(reconducted.total_paid, dec!(1000));
        assert_eq!(reconducted.remaining_due().unwrap(), dec!(54125));
    }

    #[tokio::test]
    async fn test_cancel_from_partial_and_overdue() {
        let (registry, ledger, scanner) = create_test_services().await;

        let partial = registry.create(create_command("member::p"), at(2025, 1, 10)).await.unwrap();
        let partial = ledger.record_payment(pay(&partial.id, dec!(500)), at(2025, 2, 1)).await.unwrap();
        assert_eq!(partial.status, LoanStatus::Partial);

        let cancelled = registry.cancel(&partial.id, at(2025, 2, 2)).await.unwrap();
        assert_eq!(cancelled.status, LoanStatus::Cancelled);
        assert_eq!(cancelled.total_paid, dec!(500));

        let overdue = registry.create(create_command("member::o"), at(2025, 1, 10)).await.unwrap();
        scanner.tick(at(2025, 3, 11)).await.unwrap();
        assert_eq!(registry.get_loan(&overdue.id).await.unwrap().status, LoanStatus::Overdue);

        let cancelled = registry.cancel(&overdue.id, at(2025, 3, 12)).await.unwrap();
        assert_eq!(cancelled.status, LoanStatus::Cancelled);

        // Both borrowers are free to borrow again
        assert!(registry.create(create_command("member::p"), at(2025, 3, 13)).await.is_ok());
        assert!(registry.create(create_command("member::o"), at(2025, 3, 13)).await.is_ok());
    }
}
