use shared::{
    Payment as SharedPayment, PaymentMode as SharedPaymentMode, RecordPaymentRequest,
    SettleLoanRequest,
};

use crate::backend::domain::commands::payments::{RecordPaymentCommand, SettleLoanCommand};
use crate::backend::domain::errors::LoanResult;
use crate::backend::domain::models::payment::{Payment, PaymentMode};
use crate::backend::io::rest::parse_date;

pub struct PaymentMapper;

impl PaymentMapper {
    pub fn mode_to_dto(mode: PaymentMode) -> SharedPaymentMode {
        match mode {
            PaymentMode::Cash => SharedPaymentMode::Cash,
            PaymentMode::Transfer => SharedPaymentMode::Transfer,
            PaymentMode::Check => SharedPaymentMode::Check,
            PaymentMode::MobileMoney => SharedPaymentMode::MobileMoney,
        }
    }

    pub fn mode_to_domain(mode: SharedPaymentMode) -> PaymentMode {
        match mode {
            SharedPaymentMode::Cash => PaymentMode::Cash,
            SharedPaymentMode::Transfer => PaymentMode::Transfer,
            SharedPaymentMode::Check => PaymentMode::Check,
            SharedPaymentMode::MobileMoney => PaymentMode::MobileMoney,
        }
    }

    pub fn to_dto(payment: Payment) -> SharedPayment {
        SharedPayment {
            id: payment.id,
            loan_id: payment.loan_id,
            amount: payment.amount,
            payment_date: payment.payment_date.format("%Y-%m-%d").to_string(),
            mode: Self::mode_to_dto(payment.mode),
            notes: payment.notes,
            created_at: payment.created_at.to_rfc3339(),
        }
    }

    pub fn to_dto_list(payments: Vec<Payment>) -> Vec<SharedPayment> {
        payments.into_iter().map(Self::to_dto).collect()
    }

    pub fn to_record_command(loan_id: String, request: RecordPaymentRequest) -> LoanResult<RecordPaymentCommand> {
        let payment_date = request
            .payment_date
            .as_deref()
            .map(|value| parse_date(value, "payment_date"))
            .transpose()?;

        Ok(RecordPaymentCommand {
            loan_id,
            amount: request.amount,
            payment_date,
            mode: Self::mode_to_domain(request.mode),
            notes: request.notes,
        })
    }

    pub fn to_settle_command(loan_id: String, request: SettleLoanRequest) -> SettleLoanCommand {
        SettleLoanCommand {
            loan_id,
            mode: request.mode.map(Self::mode_to_domain),
        }
    }
}
