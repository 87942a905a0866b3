//! # Storage Module
//!
//! Handles all data persistence for the loan engine.
//!
//! The domain layer talks to the [`traits::LoanStorage`] and
//! [`traits::PaymentStorage`] abstractions; this crate ships a SQLite
//! implementation built on SQLx.
//!
//! ## Guarantees the domain relies on
//!
//! - **One open loan per borrower**: a partial unique index on
//!   `loans(borrower_id)` restricted to active/partial/overdue rows, so a
//!   concurrent create that slips past the service-level check still fails.
//! - **Optimistic locking**: every loan write is conditional on the version the
//!   writer read; a lost race surfaces as `false` instead of a silent overwrite.
//! - **Atomic payments**: a payment row and the loan's new total/status are
//!   committed in one SQLite transaction.
//! - **Exact amounts**: decimals are stored as text, never as floating point.

pub mod connection;
pub mod repositories;
pub mod traits;

// Re-export the main types that other modules need
pub use connection::DbConnection;
pub use repositories::{LoanRepository, PaymentRepository};
pub use traits::{Connection, LoanInsertOutcome, LoanStorage, PaymentStorage};
