//! # IO Module
//!
//! Interface layer between HTTP clients and the domain services.
//!
//! Translates requests into domain commands, calls the services and formats
//! their results (or their errors) as JSON responses.
//!
//! ## Supported Operations
//!
//! - **POST /api/loans**, **GET /api/loans**: Create and list loans
//! - **GET /api/loans/:id**, **GET /api/loans/:id/balance**: Loan detail and balance
//! - **POST /api/loans/:id/payments**, **GET /api/loans/:id/payments**: Repayments
//! - **POST /api/loans/:id/settle | reconduct | cancel**: Lifecycle actions
//! - **GET /api/loans/accrual-preview**: Cost of future reconductions
//! - **POST /api/loans/overdue-scan**: Run an overdue scan on demand

pub mod rest;
