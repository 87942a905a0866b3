// Repository modules
pub mod loan_repository;
pub mod payment_repository;

// Re-export repository types
pub use loan_repository::LoanRepository;
pub use payment_repository::PaymentRepository;
