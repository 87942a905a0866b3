//! # Backend Module
//!
//! Contains all non-transport-specific logic for the loan engine.
//!
//! This module serves as the orchestration layer that brings together:
//! - **Domain**: Loan lifecycle, interest accrual and repayment rules
//! - **Storage**: SQLite persistence through sqlx
//! - **IO**: REST interface exposing the domain services
//!
//! ## Architecture
//!
//! ```text
//! IO Layer (REST API, handlers)
//!     ↓
//! Domain Layer (LoanRegistry, PaymentLedger, OverdueScanner)
//!     ↓
//! Storage Layer (LoanStorage, PaymentStorage on SQLite)
//! ```

pub mod domain;
pub mod io;
pub mod storage;

use anyhow::{Context, Result};
use axum::{
    http::{HeaderValue, Method},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::backend::domain::loan_registry::{LoanPolicy, LoanRegistry};
use crate::backend::domain::members::{MemberDirectory, OpenMemberDirectory, StaticMemberDirectory};
use crate::backend::domain::notifications::{LoggingNotificationGateway, NotificationGateway};
use crate::backend::domain::overdue_scanner::OverdueScanner;
use crate::backend::domain::payment_ledger::PaymentLedger;
use crate::backend::storage::DbConnection;
use crate::config::AppConfig;

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub loan_registry: LoanRegistry<DbConnection>,
    pub payment_ledger: PaymentLedger<DbConnection>,
    pub overdue_scanner: OverdueScanner<DbConnection>,
}

impl AppState {
    /// Wire the services over one database connection
    pub fn new(
        db: Arc<DbConnection>,
        member_directory: Arc<dyn MemberDirectory>,
        notification_gateway: Arc<dyn NotificationGateway>,
        policy: LoanPolicy,
    ) -> Self {
        Self {
            loan_registry: LoanRegistry::new(db.clone(), member_directory, policy),
            payment_ledger: PaymentLedger::new(db.clone()),
            overdue_scanner: OverdueScanner::new(db, notification_gateway),
        }
    }
}

/// Initialize the backend with all required services
pub async fn initialize_backend(config: &AppConfig) -> Result<AppState> {
    if let Some(path) = config.database_path() {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory {:?}", parent))?;
        }
    }

    info!("Setting up database");
    let db = DbConnection::new(&config.database_url, config.max_connections)
        .await
        .with_context(|| format!("Failed to open database {}", config.database_url))?;

    info!("Setting up domain services");
    let member_directory: Arc<dyn MemberDirectory> = match &config.known_members {
        Some(members) => {
            info!(count = members.len(), "Restricting loans to configured members");
            Arc::new(StaticMemberDirectory::new(members.iter().cloned()))
        }
        None => Arc::new(OpenMemberDirectory),
    };

    Ok(AppState::new(
        Arc::new(db),
        member_directory,
        Arc::new(LoggingNotificationGateway),
        config.loan_policy(),
    ))
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState, allowed_origin: Option<&str>) -> Result<Router> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);
    let cors = match allowed_origin {
        Some(origin) => cors.allow_origin(
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("Invalid allowed_origin {:?}", origin))?,
        ),
        None => cors.allow_origin(Any),
    };

    let api_routes = Router::new().nest("/loans", io::rest::router());

    Ok(Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state))
}

/// Application state over a fresh in-memory database
#[cfg(test)]
pub(crate) async fn test_app_state() -> AppState {
    let db = DbConnection::init_test().await.expect("Failed to init test DB");
    AppState::new(
        Arc::new(db),
        Arc::new(OpenMemberDirectory),
        Arc::new(LoggingNotificationGateway),
        LoanPolicy::default(),
    )
}
