//! Interest accrual for member loans.
//!
//! Interest compounds once per grace period. The first period always accrues,
//! and each reconduction adds one more period on top of the then-current total:
//!
//! ```text
//! total_due = principal × (1 + rate_percent / 100) ^ (1 + reconduction_count)
//! ```
//!
//! Everything here is pure: no storage, no clock.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::backend::domain::errors::{LoanError, LoanResult};

/// Decimal places kept on amounts owed
pub const AMOUNT_SCALE: u32 = 2;

/// Upper bound on the number of reconductions an accrual preview may project
pub const MAX_PREVIEW_HORIZON: u32 = 24;

/// Compute the interest-inclusive amount owed on a loan.
pub fn compute_total_due(
    principal: Decimal,
    rate_percent: Decimal,
    reconduction_count: u32,
) -> LoanResult<Decimal> {
    if principal <= Decimal::ZERO {
        return Err(LoanError::validation("principal must be positive"));
    }
    if rate_percent < Decimal::ZERO {
        return Err(LoanError::validation("interest rate cannot be negative"));
    }

    let factor = Decimal::ONE + rate_percent / Decimal::ONE_HUNDRED;
    let periods = u64::from(reconduction_count) + 1;
    let growth = checked_pow(factor, periods)
        .ok_or_else(|| LoanError::validation("amount due is too large to represent"))?;
    let total = principal
        .checked_mul(growth)
        .ok_or_else(|| LoanError::validation("amount due is too large to represent"))?;

    Ok(round_amount(total))
}

/// Project the amount owed after 0..=horizon reconductions.
pub fn preview_schedule(
    principal: Decimal,
    rate_percent: Decimal,
    horizon: u32,
) -> LoanResult<Vec<(u32, Decimal)>> {
    if horizon > MAX_PREVIEW_HORIZON {
        return Err(LoanError::validation(format!(
            "preview horizon cannot exceed {} reconductions",
            MAX_PREVIEW_HORIZON
        )));
    }

    (0..=horizon)
        .map(|count| compute_total_due(principal, rate_percent, count).map(|due| (count, due)))
        .collect()
}

pub fn round_amount(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

// Exponentiation by squaring.
fn checked_pow(base: Decimal, mut exponent: u64) -> Option<Decimal> {
    let mut result = Decimal::ONE;
    let mut square = base;
    while exponent > 0 {
        if exponent & 1 == 1 {
            result = result.checked_mul(square)?;
        }
        exponent >>= 1;
        if exponent > 0 {
            square = square.checked_mul(square)?;
        }
    }
    Some(result)
}
