//! Overdue detection.
//!
//! A scan moves every active or partial loan whose due date has passed to
//! overdue and asks the notification gateway to tell the borrower. Loans that
//! reached overdue some other way (a late payment or a late reconduction) are
//! picked up by the next scan too. Each loan carries an `overdue_notified_at`
//! marker, written in the same versioned update, so a due date is notified
//! once no matter how many scans run.

use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::backend::domain::errors::LoanResult;
use crate::backend::domain::lifecycle::LifecycleStateMachine;
use crate::backend::domain::models::loan::{Loan, LoanStatus};
use crate::backend::domain::notifications::{NotificationGateway, OverdueNotice};
use crate::backend::storage::{Connection, LoanStorage};

#[derive(Clone)]
pub struct OverdueScanner<C: Connection> {
    loan_repository: C::LoanRepository,
    gateway: Arc<dyn NotificationGateway>,
    running: Arc<Mutex<()>>,
}

impl<C: Connection> OverdueScanner<C> {
    pub fn new(connection: Arc<C>, gateway: Arc<dyn NotificationGateway>) -> Self {
        Self {
            loan_repository: connection.create_loan_repository(),
            gateway,
            running: Arc::new(Mutex::new(())),
        }
    }

    /// Run one scan as of `now` and return the loans this scan flagged: those it
    /// moved to overdue and overdue loans that had not been notified yet.
    ///
    /// Returns an empty list without scanning when another scan is in progress.
    pub async fn tick(&self, now: DateTime<Utc>) -> LoanResult<Vec<Loan>> {
        let Ok(_guard) = self.running.try_lock() else {
            info!("Overdue scan already in progress, skipping");
            return Ok(Vec::new());
        };

        let today = now.date_naive();
        let candidates = self
            .loan_repository
            .list_loans(
                None,
                &[LoanStatus::Active, LoanStatus::Partial, LoanStatus::Overdue],
            )
            .await?;
        let scanned = candidates.len();

        let mut transitioned = Vec::new();
        for mut loan in candidates
            .into_iter()
            .filter(|loan| loan.due_date < today && loan.overdue_notified_at.is_none())
        {
            match self.mark_overdue(&mut loan, today, now).await {
                Ok(true) => {
                    self.notify(&loan).await;
                    transitioned.push(loan);
                }
                Ok(false) => {}
                Err(e) => {
                    error!(loan_id = %loan.id, error = %e, "Failed to mark loan overdue");
                }
            }
        }

        info!(
            scanned,
            transitioned = transitioned.len(),
            as_of = %today,
            "Overdue scan complete"
        );
        Ok(transitioned)
    }

    /// Scan on a fixed period until the task is dropped.
    ///
    /// The first scan runs immediately. Periods missed while a scan was slow
    /// are skipped rather than replayed.
    pub async fn run(&self, period: Duration) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(period_secs = period.as_secs(), "Overdue scanner started");

        loop {
            interval.tick().await;
            if let Err(e) = self.tick(Utc::now()).await {
                error!(error = %e, "Overdue scan failed");
            }
        }
    }

    async fn mark_overdue(&self, loan: &mut Loan, today: NaiveDate, now: DateTime<Utc>) -> LoanResult<bool> {
        let next = LifecycleStateMachine::derive_for(loan, today)?;
        if next != LoanStatus::Overdue {
            debug!(loan_id = %loan.id, status = %next, "Past-due loan not overdue, skipping");
            return Ok(false);
        }

        let expected_version = loan.version;
        LifecycleStateMachine::transition(loan, next, "mark overdue")?;
        loan.overdue_notified_at = Some(now);
        loan.version = expected_version + 1;
        loan.updated_at = now;

        if !self.loan_repository.update_loan(loan, expected_version).await? {
            debug!(loan_id = %loan.id, "Loan changed during scan, skipping");
            return Ok(false);
        }
        Ok(true)
    }

    async fn notify(&self, loan: &Loan) {
        let remaining_due = match loan.remaining_due() {
            Ok(remaining_due) => remaining_due,
            Err(e) => {
                warn!(loan_id = %loan.id, error = %e, "Cannot compute balance for overdue notice");
                return;
            }
        };
        let notice = OverdueNotice {
            loan_id: loan.id.clone(),
            borrower_id: loan.borrower_id.clone(),
            guarantor_id: loan.guarantor_id.clone(),
            remaining_due,
            due_date: loan.due_date,
        };
        if let Err(e) = self.gateway.notify_overdue(&notice).await {
            warn!(loan_id = %loan.id, error = %e, "Overdue notification failed");
        }
    }
}
