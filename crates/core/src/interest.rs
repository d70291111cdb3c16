//! Interest Engine
//!
//! Pure interest math for short-term loans. Two conventions are used on
//! purpose:
//!
//! - the daily rate is always `monthly_rate / 30 / 100` (fixed 30-day month,
//!   not calendar-accurate);
//! - previews charge `max(requested_days, min_days)` days, while ongoing
//!   accrual charges the actual calendar days elapsed since the last
//!   calculation. The minimum-days floor is never re-applied during accrual.

use crate::loan::{Loan, LoanStatus};
use crate::money::round_money;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Days in the fixed accounting month
pub const DAYS_PER_MONTH: i64 = 30;

/// Interest preview for a prospective loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestPreview {
    pub principal: Decimal,
    pub interest_rate_monthly: Decimal,
    /// Requested duration
    pub days: u32,
    pub min_days: u32,
    /// `max(days, min_days)`
    pub effective_days: u32,
    /// Daily rate in percent (monthly / 30)
    pub daily_rate_percent: Decimal,
    /// Rounded to cents
    pub interest_amount: Decimal,
    /// Rounded to cents
    pub total_due: Decimal,
}

/// Daily rate as a fraction (10%/month -> 0.00333..)
pub fn daily_rate(monthly_rate_percent: Decimal) -> Decimal {
    monthly_rate_percent / Decimal::from(DAYS_PER_MONTH) / Decimal::ONE_HUNDRED
}

/// Simple interest on `principal` for `days` days.
///
/// Multiplies before dividing to keep full precision on repeating fractions.
pub fn simple_interest(principal: Decimal, monthly_rate_percent: Decimal, days: i64) -> Decimal {
    principal * monthly_rate_percent * Decimal::from(days)
        / Decimal::from(DAYS_PER_MONTH * 100)
}

/// Preview interest and total due for a prospective loan.
///
/// Inputs are validated by the caller (principal > 0, days > 0).
pub fn preview_interest(
    principal: Decimal,
    monthly_rate_percent: Decimal,
    requested_days: u32,
    min_days: u32,
) -> InterestPreview {
    let effective_days = requested_days.max(min_days);
    let interest = simple_interest(principal, monthly_rate_percent, i64::from(effective_days));

    InterestPreview {
        principal,
        interest_rate_monthly: monthly_rate_percent,
        days: requested_days,
        min_days,
        effective_days,
        daily_rate_percent: monthly_rate_percent / Decimal::from(DAYS_PER_MONTH),
        interest_amount: round_money(interest),
        total_due: round_money(principal + interest),
    }
}

/// Absolute number of calendar days between two dates
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days().abs()
}

/// Accrued interest of `loan` as of `today`, unrounded.
///
/// Paid loans are frozen at their stored value. Nothing is persisted here.
pub fn accrued_interest(loan: &Loan, today: NaiveDate) -> Decimal {
    if loan.status != LoanStatus::Active {
        return loan.interest_accrued;
    }

    let days_elapsed = days_between(loan.last_interest_calc, today);
    if days_elapsed == 0 {
        return loan.interest_accrued;
    }

    loan.interest_accrued + simple_interest(loan.principal, loan.interest_rate_monthly, days_elapsed)
}
