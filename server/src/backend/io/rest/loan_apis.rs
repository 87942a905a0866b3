//! # REST API for Loans
//!
//! Endpoints for creating, listing, reconducting and cancelling loans, plus
//! the accrual preview and the overdue scan trigger.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use shared::{
    AccrualPreviewRequest, CreateLoanRequest, CreateLoanResponse, LoanActionResponse,
    LoanListRequest, LoanListResponse, OverdueScanResponse,
};
use tracing::info;

use crate::backend::io::rest::error_response;
use crate::backend::io::rest::mappers::loan_mapper::LoanMapper;
use crate::backend::AppState;

/// Create a router for loan related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_loan).get(list_loans))
        .route("/accrual-preview", get(preview_accrual))
        .route("/overdue-scan", post(run_overdue_scan))
        .route("/:id", get(get_loan))
        .route("/:id/balance", get(get_loan_balance))
        .route("/:id/reconduct", post(reconduct_loan))
        .route("/:id/cancel", post(cancel_loan))
}

/// Create a new loan
pub async fn create_loan(
    State(state): State<AppState>,
    Json(request): Json<CreateLoanRequest>,
) -> impl IntoResponse {
    info!("POST /api/loans - request: {:?}", request);

    let result = match LoanMapper::to_create_command(request) {
        Ok(command) => state.loan_registry.create(command, Utc::now()).await,
        Err(e) => Err(e),
    };

    match result.and_then(LoanMapper::to_dto) {
        Ok(loan) => {
            let response = CreateLoanResponse {
                success_message: format!("Loan created for {}, due {}", loan.borrower_id, loan.due_date),
                loan,
            };
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// List loans, optionally filtered by borrower and status
pub async fn list_loans(
    State(state): State<AppState>,
    Query(query): Query<LoanListRequest>,
) -> impl IntoResponse {
    info!("GET /api/loans - query: {:?}", query);

    let loans = state
        .loan_registry
        .list_loans(LoanMapper::to_list_query(query))
        .await
        .and_then(LoanMapper::to_dto_list);

    match loans {
        Ok(loans) => (StatusCode::OK, Json(LoanListResponse { loans })).into_response(),
        Err(e) => error_response(e),
    }
}

/// Get one loan with its balance
pub async fn get_loan(State(state): State<AppState>, Path(loan_id): Path<String>) -> impl IntoResponse {
    info!("GET /api/loans/{}", loan_id);

    match state.loan_registry.get_loan(&loan_id).await.and_then(LoanMapper::to_dto) {
        Ok(loan) => (StatusCode::OK, Json(loan)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn get_loan_balance(
    State(state): State<AppState>,
    Path(loan_id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/loans/{}/balance", loan_id);

    match state.loan_registry.loan_balance(&loan_id).await {
        Ok(balance) => {
            let response = LoanMapper::to_balance_response(loan_id, balance);
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// Roll a loan over for one more grace period
pub async fn reconduct_loan(
    State(state): State<AppState>,
    Path(loan_id): Path<String>,
) -> impl IntoResponse {
    info!("POST /api/loans/{}/reconduct", loan_id);

    match state
        .loan_registry
        .reconduct(&loan_id, Utc::now())
        .await
        .and_then(LoanMapper::to_dto)
    {
        Ok(loan) => {
            let response = LoanActionResponse {
                success_message: format!(
                    "Loan reconducted, {} now due by {}",
                    loan.remaining_due, loan.due_date
                ),
                loan,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(e),
    }
}

pub async fn cancel_loan(State(state): State<AppState>, Path(loan_id): Path<String>) -> impl IntoResponse {
    info!("POST /api/loans/{}/cancel", loan_id);

    match state
        .loan_registry
        .cancel(&loan_id, Utc::now())
        .await
        .and_then(LoanMapper::to_dto)
    {
        Ok(loan) => {
            let response = LoanActionResponse {
                success_message: "Loan cancelled".to_string(),
                loan,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// Project what a loan would cost if rolled over repeatedly
pub async fn preview_accrual(
    State(state): State<AppState>,
    Query(query): Query<AccrualPreviewRequest>,
) -> impl IntoResponse {
    info!("GET /api/loans/accrual-preview - query: {:?}", query);

    match state
        .loan_registry
        .preview_accrual(query.principal, query.interest_rate_percent, query.horizon)
    {
        Ok((rate, schedule)) => {
            let response = LoanMapper::to_preview_response(query.principal, rate, schedule);
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// Run an overdue scan now, for external schedulers
pub async fn run_overdue_scan(State(state): State<AppState>) -> impl IntoResponse {
    info!("POST /api/loans/overdue-scan");

    let now = Utc::now();
    let transitioned = state
        .overdue_scanner
        .tick(now)
        .await
        .and_then(LoanMapper::to_dto_list);

    match transitioned {
        Ok(transitioned) => {
            let response = OverdueScanResponse {
                scanned_at: now.to_rfc3339(),
                transitioned,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(e),
    }
}
