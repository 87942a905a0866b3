//! Outbound overdue notifications.
//!
//! The engine only produces notification requests. Delivery, templating and
//! retries belong to whatever implements [`NotificationGateway`].

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

/// Request to tell a borrower (and guarantor, if any) that a loan is overdue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverdueNotice {
    pub loan_id: String,
    pub borrower_id: String,
    pub guarantor_id: Option<String>,
    pub remaining_due: Decimal,
    pub due_date: NaiveDate,
}

#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn notify_overdue(&self, notice: &OverdueNotice) -> Result<()>;
}

/// Gateway that records each notice as a structured log event.
///
/// Used when no delivery pipeline is wired in.
#[derive(Debug, Clone, Default)]
pub struct LoggingNotificationGateway;

#[async_trait]
impl NotificationGateway for LoggingNotificationGateway {
    async fn notify_overdue(&self, notice: &OverdueNotice) -> Result<()> {
        info!(
            loan_id = %notice.loan_id,
            borrower_id = %notice.borrower_id,
            guarantor_id = notice.guarantor_id.as_deref().unwrap_or("-"),
            remaining_due = %notice.remaining_due,
            due_date = %notice.due_date,
            "Overdue notification requested"
        );
        Ok(())
    }
}
