pub mod loan;
pub mod payment;
