//! # Loan Module
//!
//! Loan records and the pure state transitions applied to them.
//!
//! A loan moves `active -> paid` exactly once. Paid loans are kept as
//! historical records and are excluded from accrual and repayment.

use crate::error::{CoreError, CoreResult};
use crate::interest::accrued_interest;
use crate::money::round_money;
use crate::user::UserId;
use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix of generated loan ids
pub const LOAN_ID_PREFIX: &str = "loan_";

/// Longest accepted loan term in days
pub const MAX_LOAN_DAYS: u32 = 3650;

/// Largest accepted principal for one loan (1_000_000_000_000)
pub const MAX_PRINCIPAL: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

/// Loan lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Active,
    Paid,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "active",
            LoanStatus::Paid => "paid",
        }
    }

    pub fn parse(s: &str) -> CoreResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(LoanStatus::Active),
            "paid" => Ok(LoanStatus::Paid),
            other => Err(CoreError::UnknownLoanStatus(other.to_string())),
        }
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A short-term loan owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: String,
    pub user_id: UserId,
    /// Policy identifier the loan was taken against
    pub card_id: String,
    /// Outstanding principal; shrinks with partial repayments
    pub principal: Decimal,
    /// Principal at creation, never mutated
    pub original_principal: Decimal,
    /// Snapshot of the policy rate at creation
    pub interest_rate_monthly: Decimal,
    pub interest_accrued: Decimal,
    pub created_at: NaiveDate,
    pub due_date: NaiveDate,
    pub status: LoanStatus,
    pub last_interest_calc: NaiveDate,
    pub days_duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_amount: Option<Decimal>,
}

impl Loan {
    /// New active loan created on `today`, due `days` later.
    ///
    /// Fails when the due date falls outside the calendar range.
    pub fn new(
        id: String,
        user_id: UserId,
        card_id: String,
        principal: Decimal,
        interest_rate_monthly: Decimal,
        days: u32,
        today: NaiveDate,
    ) -> CoreResult<Self> {
        let due_date = today
            .checked_add_days(Days::new(u64::from(days)))
            .ok_or(CoreError::InvalidTerm(days))?;

        Ok(Self {
            id,
            user_id,
            card_id,
            principal,
            original_principal: principal,
            interest_rate_monthly,
            interest_accrued: Decimal::ZERO,
            created_at: today,
            due_date,
            status: LoanStatus::Active,
            last_interest_calc: today,
            days_duration: days,
            paid_at: None,
            paid_amount: None,
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == LoanStatus::Active
    }

    /// Principal plus stored interest
    pub fn total_due(&self) -> Decimal {
        self.principal + self.interest_accrued
    }

    /// Copy of this loan with interest recomputed as of `today` (not persisted)
    pub fn current(&self, today: NaiveDate) -> LoanView {
        let mut loan = self.clone();
        loan.interest_accrued = accrued_interest(self, today);
        LoanView::from(loan)
    }

    /// Persistable accrual refresh. Returns false when nothing changed
    /// (same-day refresh).
    pub fn refresh_interest(&mut self, today: NaiveDate) -> bool {
        if self.last_interest_calc == today {
            return false;
        }
        self.interest_accrued = accrued_interest(self, today);
        self.last_interest_calc = today;
        true
    }

    /// Smallest amount that settles the loan and largest amount accepted,
    /// given recomputed `accrued` interest.
    ///
    /// Both the exact total and its cent-rounded form settle, so a total
    /// with sub-cent interest can be paid off in whole cents.
    pub fn payoff_bounds(&self, accrued: Decimal) -> (Decimal, Decimal) {
        let total_due = self.principal + accrued;
        let payable = round_money(total_due);
        (total_due.min(payable), total_due.max(payable))
    }

    /// Reject amounts outside `(0, payoff]`
    pub fn check_repayment(&self, amount: Decimal, accrued: Decimal) -> CoreResult<()> {
        let (_, max_amount) = self.payoff_bounds(accrued);
        if amount <= Decimal::ZERO || amount > max_amount {
            return Err(CoreError::InvalidAmount(format!(
                "repayment {} outside (0, {}]",
                amount, max_amount
            )));
        }
        Ok(())
    }

    /// Apply a repayment of `amount` against `accrued` interest.
    ///
    /// Paying the total due settles the loan: status becomes paid,
    /// principal is kept as history and interest freezes at `accrued`.
    /// Otherwise interest is paid first and any excess reduces principal.
    /// `last_interest_calc` always moves to `today`.
    pub fn apply_repayment(
        &mut self,
        amount: Decimal,
        accrued: Decimal,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> CoreResult<RepaymentOutcome> {
        self.check_repayment(amount, accrued)?;
        let (settle_at, _) = self.payoff_bounds(accrued);

        if amount >= settle_at {
            self.status = LoanStatus::Paid;
            self.paid_at = Some(now);
            self.paid_amount = Some(amount);
            self.interest_accrued = accrued;
        } else if amount > accrued {
            self.principal -= amount - accrued;
            self.interest_accrued = Decimal::ZERO;
        } else {
            self.interest_accrued = accrued - amount;
        }
        self.last_interest_calc = today;

        Ok(RepaymentOutcome {
            loan_id: self.id.clone(),
            amount_paid: amount,
            remaining_principal: self.principal,
            remaining_interest: self.interest_accrued,
            status: self.status,
        })
    }
}

impl fmt::Display for Loan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Loan {} (card: {}, principal: {}, interest: {}, status: {})",
            self.id, self.card_id, self.principal, self.interest_accrued, self.status
        )
    }
}

/// Loan with its derived `total_due`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanView {
    #[serde(flatten)]
    pub loan: Loan,
    pub total_due: Decimal,
}

impl From<Loan> for LoanView {
    fn from(loan: Loan) -> Self {
        let total_due = loan.total_due();
        Self { loan, total_due }
    }
}

/// Post-repayment snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepaymentOutcome {
    pub loan_id: String,
    pub amount_paid: Decimal,
    pub remaining_principal: Decimal,
    pub remaining_interest: Decimal,
    pub status: LoanStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, d).unwrap()
    }

    fn loan_with_interest(principal: Decimal, interest: Decimal) -> Loan {
        let mut loan = Loan::new(
            "loan_abc".to_string(),
            7,
            "default".to_string(),
            principal,
            dec!(10),
            10,
            day(1),
        )
        .unwrap();
        loan.interest_accrued = interest;
        loan
    }

    #[test]
    fn test_new_loan_fields() {
        let loan = Loan::new(
            "loan_1".to_string(),
            7,
            "gold-credit".to_string(),
            dec!(500),
            dec!(10),
            10,
            day(1),
        )
        .unwrap();
        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(loan.interest_accrued, Decimal::ZERO);
        assert_eq!(loan.due_date, day(11));
        assert_eq!(loan.last_interest_calc, day(1));
        assert_eq!(loan.original_principal, dec!(500));
    }

    #[test]
    fn test_new_loan_rejects_due_date_out_of_range() {
        let last_day = NaiveDate::MAX;
        let result = Loan::new(
            "loan_far".to_string(),
            7,
            "default".to_string(),
            dec!(100),
            dec!(10),
            1,
            last_day,
        );
        assert!(matches!(result, Err(CoreError::InvalidTerm(1))));
    }

    #[test]
    fn test_max_principal_constant() {
        assert_eq!(MAX_PRINCIPAL, dec!(1000000000000));
    }

    #[test]
    fn test_partial_repayment_within_interest() {
        let mut loan = loan_with_interest(dec!(500), dec!(16.67));
        let out = loan
            .apply_repayment(dec!(10), dec!(16.67), day(1), Utc::now())
            .unwrap();
        assert_eq!(out.remaining_principal, dec!(500));
        assert_eq!(out.remaining_interest, dec!(6.67));
        assert_eq!(out.status, LoanStatus::Active);
    }

    #[test]
    fn test_partial_repayment_exactly_interest() {
        let mut loan = loan_with_interest(dec!(500), dec!(16.67));
        loan.apply_repayment(dec!(16.67), dec!(16.67), day(1), Utc::now())
            .unwrap();
        assert_eq!(loan.principal, dec!(500));
        assert_eq!(loan.interest_accrued, Decimal::ZERO);
        assert!(loan.is_active());
    }

    #[test]
    fn test_partial_repayment_reduces_principal() {
        let mut loan = loan_with_interest(dec!(500), dec!(16.67));
        loan.apply_repayment(dec!(116.67), dec!(16.67), day(3), Utc::now())
            .unwrap();
        assert_eq!(loan.principal, dec!(400));
        assert_eq!(loan.interest_accrued, Decimal::ZERO);
        assert_eq!(loan.last_interest_calc, day(3));
        assert_eq!(loan.original_principal, dec!(500));
    }

    #[test]
    fn test_full_settlement_keeps_principal() {
        let mut loan = loan_with_interest(dec!(500), dec!(16.67));
        let now = Utc::now();
        let out = loan
            .apply_repayment(dec!(516.67), dec!(16.67), day(1), now)
            .unwrap();
        assert_eq!(out.status, LoanStatus::Paid);
        assert_eq!(loan.principal, dec!(500));
        assert_eq!(loan.interest_accrued, dec!(16.67));
        assert_eq!(loan.paid_amount, Some(dec!(516.67)));
        assert_eq!(loan.paid_at, Some(now));
    }

    #[test]
    fn test_overpayment_rejected() {
        let mut loan = loan_with_interest(dec!(500), dec!(16.67));
        let before = loan.clone();
        let result = loan.apply_repayment(dec!(516.68), dec!(16.67), day(1), Utc::now());
        assert!(matches!(result, Err(CoreError::InvalidAmount(_))));
        assert_eq!(loan, before);
    }

    #[test]
    fn test_rounded_total_settles_sub_cent_interest() {
        // 500 at 10%/month for 10 days accrues 16.666..
        let accrued = dec!(500) * dec!(10) * dec!(10) / dec!(3000);
        let (settle_at, max_amount) = loan_with_interest(dec!(500), Decimal::ZERO).payoff_bounds(accrued);
        assert_eq!(max_amount, dec!(516.67));
        assert!(settle_at < max_amount);

        let mut loan = loan_with_interest(dec!(500), Decimal::ZERO);
        let out = loan
            .apply_repayment(dec!(516.67), accrued, day(11), Utc::now())
            .unwrap();
        assert_eq!(out.status, LoanStatus::Paid);
        assert_eq!(loan.interest_accrued, accrued);

        let mut loan = loan_with_interest(dec!(500), Decimal::ZERO);
        let out = loan
            .apply_repayment(dec!(500) + accrued, accrued, day(11), Utc::now())
            .unwrap();
        assert_eq!(out.status, LoanStatus::Paid);
        assert_eq!(loan.principal, dec!(500));
    }

    #[test]
    fn test_non_positive_repayment_rejected() {
        let mut loan = loan_with_interest(dec!(500), Decimal::ZERO);
        assert!(loan
            .apply_repayment(Decimal::ZERO, Decimal::ZERO, day(1), Utc::now())
            .is_err());
        assert!(loan
            .apply_repayment(dec!(-5), Decimal::ZERO, day(1), Utc::now())
            .is_err());
    }

    #[test]
    fn test_refresh_interest_idempotent_same_day() {
        let mut loan = loan_with_interest(dec!(600), Decimal::ZERO);
        assert!(!loan.refresh_interest(day(1)));
        assert!(loan.refresh_interest(day(2)));
        assert_eq!(loan.interest_accrued, dec!(2));
        assert!(!loan.refresh_interest(day(2)));
        assert_eq!(loan.interest_accrued, dec!(2));
    }

    #[test]
    fn test_current_view_does_not_mutate() {
        let loan = loan_with_interest(dec!(600), Decimal::ZERO);
        let view = loan.current(day(4));
        assert_eq!(view.loan.interest_accrued, dec!(6));
        assert_eq!(view.total_due, dec!(606));
        assert_eq!(loan.interest_accrued, Decimal::ZERO);
    }

    #[test]
    fn test_view_serializes_flat() {
        let view = LoanView::from(loan_with_interest(dec!(100), dec!(1)));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["id"], "loan_abc");
        assert_eq!(json["total_due"], "101");
        assert_eq!(json["status"], "active");
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(LoanStatus::parse("PAID").unwrap(), LoanStatus::Paid);
        assert!(LoanStatus::parse("defaulted").is_err());
    }
}
