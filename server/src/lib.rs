//! Member loan engine: loan lifecycle, compounding interest, repayments and
//! overdue detection, served over a JSON REST API.

pub mod backend;
pub mod config;

pub use backend::{create_router, initialize_backend, AppState};
pub use config::AppConfig;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::test_app_state;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use axum::Router;
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(body) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_full_flow() {
        let app = create_router(test_app_state().await, None).unwrap();

        // 1. Create a loan
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/loans",
            Some(json!({
                "borrower_id": "member::b",
                "guarantor_id": "member::g",
                "principal": "50000",
                "interest_rate_percent": null,
                "origination_date": null,
                "grace_period_months": null
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let loan_id = body["loan"]["id"].as_str().unwrap().to_string();

        // 2. Partial repayment
        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/loans/{}/payments", loan_id),
            Some(json!({"amount": "20000", "payment_date": null, "mode": "cash", "notes": null})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["loan"]["status"], "partial");

        // 3. Overpayment is refused
        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/loans/{}/payments", loan_id),
            Some(json!({"amount": "40000", "payment_date": null, "mode": "cash", "notes": null})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "overpayment");

        // 4. Balance
        let (status, body) = send(&app, Method::GET, &format!("/api/loans/{}/balance", loan_id), None).await;
        assert_eq!(status, StatusCode::OK);
        let balance: shared::LoanBalanceResponse = serde_json::from_value(body).unwrap();
        assert_eq!(balance.remaining_due, dec!(32500));

        // 5. Settle with an empty body
        let (status, body) = send(&app, Method::POST, &format!("/api/loans/{}/settle", loan_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["loan"]["status"], "settled");

        // 6. History and listing
        let (_, body) = send(&app, Method::GET, &format!("/api/loans/{}/payments", loan_id), None).await;
        assert_eq!(body["payments"].as_array().unwrap().len(), 2);

        let (_, body) = send(&app, Method::GET, "/api/loans?borrower_id=member::b&status=settled", None).await;
        assert_eq!(body["loans"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_preview_and_scan_routes() {
        let app = create_router(test_app_state().await, Some("http://localhost:8080")).unwrap();

        let (status, body) = send(
            &app,
            Method::GET,
            "/api/loans/accrual-preview?principal=50000&rate=5&horizon=1",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let preview: shared::AccrualPreviewResponse = serde_json::from_value(body).unwrap();
        assert_eq!(preview.entries.len(), 2);
        assert_eq!(preview.entries[1].total_due, dec!(55125));

        let (status, body) = send(&app, Method::POST, "/api/loans/overdue-scan", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["transitioned"].as_array().unwrap().is_empty());

        let (status, _) = send(&app, Method::GET, "/api/loans/loan::missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_origin_is_rejected() {
        let state = test_app_state().await;
        assert!(create_router(state, Some("not a header\n")).is_err());
    }
}
