//! # REST API for Repayments
//!
//! Recording payments against a loan, settling a loan in full and reading
//! its payment history.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::post,
    Router,
};
use chrono::Utc;
use shared::{LoanActionResponse, PaymentListResponse, RecordPaymentRequest, SettleLoanRequest};
use tracing::info;

use crate::backend::io::rest::error_response;
use crate::backend::io::rest::mappers::loan_mapper::LoanMapper;
use crate::backend::io::rest::mappers::payment_mapper::PaymentMapper;
use crate::backend::AppState;

/// Create a router for payment related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:id/payments", post(record_payment).get(list_payments))
        .route("/:id/settle", post(settle_loan))
}

/// Record a repayment against a loan
pub async fn record_payment(
    State(state): State<AppState>,
    Path(loan_id): Path<String>,
    Json(request): Json<RecordPaymentRequest>,
) -> impl IntoResponse {
    info!("POST /api/loans/{}/payments - request: {:?}", loan_id, request);

    let result = match PaymentMapper::to_record_command(loan_id, request) {
        Ok(command) => state.payment_ledger.record_payment(command, Utc::now()).await,
        Err(e) => Err(e),
    };

    match result.and_then(LoanMapper::to_dto) {
        Ok(loan) => {
            let response = LoanActionResponse {
                success_message: format!("Payment recorded, {} remaining", loan.remaining_due),
                loan,
            };
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// Pay off the remaining balance today
pub async fn settle_loan(
    State(state): State<AppState>,
    Path(loan_id): Path<String>,
    request: Option<Json<SettleLoanRequest>>,
) -> impl IntoResponse {
    info!("POST /api/loans/{}/settle", loan_id);

    let request = request.map(|Json(request)| request).unwrap_or_default();
    let command = PaymentMapper::to_settle_command(loan_id, request);

    match state
        .payment_ledger
        .settle_in_full(command, Utc::now())
        .await
        .and_then(LoanMapper::to_dto)
    {
        Ok(loan) => {
            let response = LoanActionResponse {
                success_message: "Loan settled in full".to_string(),
                loan,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(e),
    }
}

pub async fn list_payments(State(state): State<AppState>, Path(loan_id): Path<String>) -> impl IntoResponse {
    info!("GET /api/loans/{}/payments", loan_id);

    match state.payment_ledger.list_payments(&loan_id).await {
        Ok(payments) => {
            let response = PaymentListResponse {
                loan_id,
                payments: PaymentMapper::to_dto_list(payments),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(e),
    }
}
