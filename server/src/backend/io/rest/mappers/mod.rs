//! Conversions between the `shared` wire DTOs and domain types.

pub mod loan_mapper;
pub mod payment_mapper;
