//! Domain model for a loan repayment.
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMode {
    Cash,
    Transfer,
    Check,
    MobileMoney,
}

impl PaymentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMode::Cash => "cash",
            PaymentMode::Transfer => "transfer",
            PaymentMode::Check => "check",
            PaymentMode::MobileMoney => "mobile_money",
        }
    }

    pub fn from_string(value: &str) -> Result<Self, String> {
        match value {
            "cash" => Ok(PaymentMode::Cash),
            "transfer" => Ok(PaymentMode::Transfer),
            "check" => Ok(PaymentMode::Check),
            "mobile_money" => Ok(PaymentMode::MobileMoney),
            other => Err(format!("unknown payment mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub loan_id: String,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub mode: PaymentMode,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn generate_id() -> String {
        format!("payment::{}", uuid::Uuid::new_v4())
    }
}
