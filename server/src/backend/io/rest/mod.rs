//! # REST API Interface Layer
//!
//! HTTP endpoints for the loan engine, mounted under `/api/loans`.
//! This layer handles:
//! - JSON request/response serialization through the `shared` DTOs
//! - Translation of [`LoanError`] into HTTP status codes and error bodies
//! - Request logging
//!
//! Handlers carry no business rules; they map DTOs to commands, call a
//! domain service with the current time and map the result back.
//!
//! ## Error mapping
//!
//! | Error | Status |
//! |---|---|
//! | Validation | 400 |
//! | NotFound | 404 |
//! | Conflict, State, ConcurrentModification | 409 |
//! | Overpayment | 422 |
//! | Storage | 500 |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Router,
};
use chrono::NaiveDate;
use shared::ErrorResponse;
use tracing::{error, warn};

use crate::backend::domain::errors::{LoanError, LoanResult};
use crate::backend::AppState;

pub mod loan_apis;
pub mod mappers;
pub mod payment_apis;

use mappers::loan_mapper::LoanMapper;

/// Every loan and payment endpoint, to be nested under `/loans`
pub fn router() -> Router<AppState> {
    loan_apis::router().merge(payment_apis::router())
}

/// Parse a `YYYY-MM-DD` request field
pub fn parse_date(value: &str, field: &str) -> LoanResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        LoanError::validation(format!("{} must be a date in YYYY-MM-DD format, got '{}'", field, value))
    })
}

/// Render a domain error as an HTTP response with an [`ErrorResponse`] body
pub fn error_response(err: LoanError) -> Response {
    let status = match &err {
        LoanError::Validation(_) => StatusCode::BAD_REQUEST,
        LoanError::NotFound(_) => StatusCode::NOT_FOUND,
        LoanError::Conflict { .. } | LoanError::State { .. } | LoanError::ConcurrentModification { .. } => {
            StatusCode::CONFLICT
        }
        LoanError::Overpayment { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        LoanError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let mut body = ErrorResponse {
        error: error_kind(&err).to_string(),
        message: err.to_string(),
        loan_id: None,
        status: None,
        remaining_due: None,
    };

    match &err {
        LoanError::Validation(_) => {}
        LoanError::Conflict { existing_loan_id, .. } => body.loan_id = existing_loan_id.clone(),
        LoanError::Overpayment { loan_id, remaining_due, .. } => {
            body.loan_id = Some(loan_id.clone());
            body.remaining_due = Some(*remaining_due);
        }
        LoanError::State { loan_id, status, .. } => {
            body.loan_id = Some(loan_id.clone());
            body.status = Some(LoanMapper::status_to_dto(*status));
        }
        LoanError::NotFound(loan_id) | LoanError::ConcurrentModification { loan_id } => {
            body.loan_id = Some(loan_id.clone());
        }
        LoanError::Storage(e) => {
            error!("Storage failure: {:#}", e);
            body.message = "internal storage error".to_string();
        }
    }

    if status.is_client_error() {
        warn!(status = status.as_u16(), error = %body.error, "{}", body.message);
    }

    (status, Json(body)).into_response()
}

fn error_kind(err: &LoanError) -> &'static str {
    match err {
        LoanError::Validation(_) => "validation",
        LoanError::Conflict { .. } => "conflict",
        LoanError::Overpayment { .. } => "overpayment",
        LoanError::State { .. } => "invalid_state",
        LoanError::NotFound(_) => "not_found",
        LoanError::ConcurrentModification { .. } => "concurrent_modification",
        LoanError::Storage(_) => "storage",
    }
}
