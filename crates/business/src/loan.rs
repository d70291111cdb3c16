//! Loan lifecycle - creation, accrual refresh, repayment
//!
//! A loan moves `active -> paid` only. Interest accrues lazily: reads
//! recompute it without persisting, `refresh_interest` persists it, and
//! `repay` settles against the recomputed figure.
//!
//! Every write runs under the owning user's lock. Repayment debits the
//! central wallet and updates the loan in one SQLite transaction.

use crate::config::YearlyCapBasis;
use crate::error::{BusinessError, BusinessResult};
use crate::rate_limit::RateAction;
use crate::services::ServiceContext;
use chrono::Datelike;
use rcard_core::loan::{LOAN_ID_PREFIX, MAX_LOAN_DAYS, MAX_PRINCIPAL};
use rcard_core::{
    accrued_interest, preview_interest, CardGrant, Event, EventType, InterestPreview, Loan,
    LoanStatus, LoanView, Policy, RepaymentOutcome, UserId, CENTRAL_WALLET,
};
use rcard_persistence::{BalanceRepo, CardGrantRepo, LoanRepo};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::SqliteExecutor;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

fn new_loan_id() -> String {
    format!("{}{}", LOAN_ID_PREFIX, Uuid::new_v4().simple())
}

/// Year-to-date borrowing against a policy cap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearlyLimit {
    pub used: Decimal,
    pub max: Decimal,
    pub remaining: Decimal,
    /// Whether the previewed principal still fits under the cap
    pub can_borrow: bool,
}

/// Interest preview for a prospective loan plus the yearly cap position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanPreview {
    pub card_id: String,
    pub policy_id: String,
    #[serde(flatten)]
    pub interest: InterestPreview,
    pub yearly_limit: YearlyLimit,
}

/// Active loans with the cards and policies behind them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoansOverview {
    pub active_loans: Vec<LoanView>,
    pub cards: Vec<CardGrant>,
    /// Policy per held card id
    pub policies: BTreeMap<String, Policy>,
}

fn validate_request(principal: Decimal, days: u32) -> BusinessResult<()> {
    if principal <= Decimal::ZERO {
        return Err(BusinessError::InvalidInput(format!(
            "principal must be positive: {}",
            principal
        )));
    }
    if principal > MAX_PRINCIPAL {
        return Err(BusinessError::InvalidInput(format!(
            "principal must not exceed {}: {}",
            MAX_PRINCIPAL, principal
        )));
    }
    if days == 0 {
        return Err(BusinessError::InvalidInput(
            "days must be positive".to_string(),
        ));
    }
    if days > MAX_LOAN_DAYS {
        return Err(BusinessError::InvalidInput(format!(
            "days must not exceed {}: {}",
            MAX_LOAN_DAYS, days
        )));
    }
    Ok(())
}

pub struct LoanLifecycle<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> LoanLifecycle<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    // ========================================================================
    // Yearly cap accounting
    // ========================================================================

    async fn yearly_total_in<'e, E>(
        &self,
        executor: E,
        user_id: UserId,
        year: i32,
    ) -> BusinessResult<Decimal>
    where
        E: SqliteExecutor<'e>,
    {
        let basis = self.ctx.config().yearly_cap_basis;
        let loans = LoanRepo::list_by_user(executor, user_id, None).await?;

        Ok(loans
            .iter()
            .filter(|loan| loan.created_at.year() == year)
            .map(|loan| match basis {
                YearlyCapBasis::LivePrincipal => loan.principal,
                YearlyCapBasis::OriginalPrincipal => loan.original_principal,
            })
            .sum())
    }

    /// Principal borrowed this calendar year across all of the user's loans
    pub async fn yearly_total(&self, user_id: UserId) -> BusinessResult<Decimal> {
        let year = self.ctx.today().year();
        self.yearly_total_in(self.ctx.pool(), user_id, year).await
    }

    // ========================================================================
    // Preview / create
    // ========================================================================

    pub async fn preview(
        &self,
        user_id: UserId,
        card_id: &str,
        principal: Decimal,
        days: u32,
    ) -> BusinessResult<LoanPreview> {
        validate_request(principal, days)?;
        self.ctx.ensure_user(self.ctx.pool(), user_id).await?;

        let policy = self.ctx.catalog().lookup(card_id);
        let interest = preview_interest(
            principal,
            policy.interest_rate_monthly,
            days,
            policy.min_interest_days,
        );

        let used = self.yearly_total(user_id).await?;
        let max = policy.max_yearly_loans;
        let yearly_limit = YearlyLimit {
            used,
            max,
            remaining: (max - used).max(Decimal::ZERO),
            can_borrow: used.checked_add(principal).is_some_and(|total| total <= max),
        };

        Ok(LoanPreview {
            card_id: card_id.to_string(),
            policy_id: policy.id.clone(),
            interest,
            yearly_limit,
        })
    }

    /// Open a loan against the policy of `card_id` (default policy when
    /// the id is unknown). The policy rate is snapshotted on the loan.
    pub async fn create(
        &self,
        user_id: UserId,
        card_id: &str,
        principal: Decimal,
        days: u32,
    ) -> BusinessResult<LoanView> {
        self.ctx
            .rate_limit(&user_id.to_string(), RateAction::LoanCreate)?;
        validate_request(principal, days)?;

        let _guard = self.ctx.lock_user(user_id).await;
        let today = self.ctx.today();
        let mut tx = self.ctx.pool().begin().await?;

        self.ctx.ensure_user(&mut *tx, user_id).await.map_err(|e| {
            warn!(user_id, "loan creation failed: user not found");
            e
        })?;

        let policy = self.ctx.catalog().lookup(card_id);
        if days < policy.min_interest_days {
            warn!(user_id, card_id, days, min_days = policy.min_interest_days, "loan creation failed: below minimum days");
            return Err(BusinessError::BelowMinDays {
                days,
                min_days: policy.min_interest_days,
            });
        }

        let used = self.yearly_total_in(&mut *tx, user_id, today.year()).await?;
        let requested = used.checked_add(principal).ok_or_else(|| {
            BusinessError::InvalidInput(format!("principal {} overflows the yearly total", principal))
        })?;
        if requested > policy.max_yearly_loans {
            warn!(
                user_id,
                card_id,
                %used,
                %principal,
                max = %policy.max_yearly_loans,
                "loan creation failed: yearly limit exceeded"
            );
            return Err(BusinessError::yearly_limit_exceeded(
                used,
                principal,
                policy.max_yearly_loans,
            ));
        }

        let loan = Loan::new(
            new_loan_id(),
            user_id,
            card_id.to_string(),
            principal,
            policy.interest_rate_monthly,
            days,
            today,
        )?;
        LoanRepo::insert(&mut *tx, &loan).await?;
        tx.commit().await?;

        info!(user_id, loan_id = %loan.id, card_id, %principal, days, "loan created");
        self.ctx.record(&Event::loan_created(
            &self.ctx.events().next_event_id(),
            self.ctx.now(),
            &loan,
        ));

        Ok(loan.current(today))
    }

    // ========================================================================
    // Reads
    // ========================================================================

    async fn load(&self, user_id: UserId, loan_id: &str) -> BusinessResult<Loan> {
        LoanRepo::get(self.ctx.pool(), user_id, loan_id)
            .await?
            .ok_or_else(|| BusinessError::LoanNotFound(loan_id.to_string()))
    }

    /// Loan with interest recomputed as of today. Nothing is persisted.
    pub async fn get_current(&self, user_id: UserId, loan_id: &str) -> BusinessResult<LoanView> {
        let loan = self.load(user_id, loan_id).await?;
        Ok(loan.current(self.ctx.today()))
    }

    /// Loans newest first, each recomputed as in `get_current`
    pub async fn list(
        &self,
        user_id: UserId,
        status: Option<LoanStatus>,
    ) -> BusinessResult<Vec<LoanView>> {
        let today = self.ctx.today();
        let loans = LoanRepo::list_by_user(self.ctx.pool(), user_id, status).await?;
        Ok(loans.iter().map(|loan| loan.current(today)).collect())
    }

    pub async fn overview(&self, user_id: UserId) -> BusinessResult<LoansOverview> {
        self.ctx.ensure_user(self.ctx.pool(), user_id).await?;

        let active_loans = self.list(user_id, Some(LoanStatus::Active)).await?;
        let cards = CardGrantRepo::list_by_user(self.ctx.pool(), user_id).await?;
        let catalog = self.ctx.catalog();
        let policies = cards
            .iter()
            .map(|card| (card.id.clone(), catalog.lookup(&card.id).clone()))
            .collect();

        Ok(LoansOverview {
            active_loans,
            cards,
            policies,
        })
    }

    // ========================================================================
    // Accrual refresh
    // ========================================================================

    /// Persist accrued interest up to today. Same-day calls change nothing.
    pub async fn refresh_interest(&self, user_id: UserId, loan_id: &str) -> BusinessResult<LoanView> {
        let _guard = self.ctx.lock_user(user_id).await;
        let today = self.ctx.today();
        let mut loan = self.load(user_id, loan_id).await?;

        if !loan.is_active() {
            return Err(BusinessError::LoanNotActive(loan.id));
        }

        if loan.refresh_interest(today) {
            LoanRepo::update(self.ctx.pool(), &loan).await?;
            debug!(user_id, loan_id, interest = %loan.interest_accrued, "interest refreshed");
            self.ctx.record(
                &self
                    .ctx
                    .event(EventType::InterestRefreshed, user_id)
                    .with_loan(&loan.id)
                    .with_amount(loan.interest_accrued),
            );
        }

        Ok(LoanView::from(loan))
    }

    /// Refresh every active loan of a user; returns how many changed
    pub async fn refresh_all(&self, user_id: UserId) -> BusinessResult<usize> {
        let _guard = self.ctx.lock_user(user_id).await;
        let today = self.ctx.today();
        let loans = LoanRepo::list_by_user(self.ctx.pool(), user_id, Some(LoanStatus::Active)).await?;

        let mut refreshed = Vec::new();
        let mut tx = self.ctx.pool().begin().await?;
        for mut loan in loans {
            if loan.refresh_interest(today) {
                LoanRepo::update(&mut *tx, &loan).await?;
                refreshed.push(loan);
            }
        }
        tx.commit().await?;

        for loan in &refreshed {
            self.ctx.record(
                &self
                    .ctx
                    .event(EventType::InterestRefreshed, user_id)
                    .with_loan(&loan.id)
                    .with_amount(loan.interest_accrued),
            );
        }
        info!(user_id, count = refreshed.len(), "interest refreshed for active loans");
        Ok(refreshed.len())
    }

    // ========================================================================
    // Repayment
    // ========================================================================

    /// Repay `amount` from the central wallet.
    ///
    /// Fails before touching anything when the amount is outside
    /// `(0, total_due]` (or its cent-rounded value if larger) or the wallet
    /// holds less than `amount`. The wallet debit and the loan update commit
    /// together.
    pub async fn repay(
        &self,
        user_id: UserId,
        loan_id: &str,
        amount: Decimal,
    ) -> BusinessResult<RepaymentOutcome> {
        let _guard = self.ctx.lock_user(user_id).await;
        let today = self.ctx.today();
        let now = self.ctx.now();

        let mut tx = self.ctx.pool().begin().await?;
        let mut loan = LoanRepo::get(&mut *tx, user_id, loan_id)
            .await?
            .ok_or_else(|| BusinessError::LoanNotFound(loan_id.to_string()))?;

        if !loan.is_active() {
            warn!(user_id, loan_id, "repayment rejected: loan not active");
            return Err(BusinessError::LoanNotActive(loan.id));
        }

        let accrued = accrued_interest(&loan, today);
        if let Err(e) = loan.check_repayment(amount, accrued) {
            warn!(user_id, loan_id, %amount, %accrued, "repayment rejected: invalid amount");
            return Err(BusinessError::InvalidAmount(e.to_string()));
        }

        let balance = BalanceRepo::get(&mut *tx, user_id, CENTRAL_WALLET)
            .await?
            .unwrap_or(Decimal::ZERO);
        if balance < amount {
            warn!(user_id, loan_id, %amount, %balance, "repayment rejected: insufficient balance");
            return Err(BusinessError::insufficient_balance(amount, balance));
        }

        let outcome = loan.apply_repayment(amount, accrued, today, now)?;
        BalanceRepo::set(&mut *tx, user_id, CENTRAL_WALLET, balance - amount, now).await?;
        LoanRepo::update(&mut *tx, &loan).await?;
        tx.commit().await?;

        info!(
            user_id,
            loan_id,
            %amount,
            status = %outcome.status,
            remaining_principal = %outcome.remaining_principal,
            remaining_interest = %outcome.remaining_interest,
            "loan repayment"
        );
        self.ctx.record(&Event::loan_repayment(
            &self.ctx.events().next_event_id(),
            now,
            user_id,
            &outcome,
        ));

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_request() {
        assert!(validate_request(Decimal::ONE, 1).is_ok());
        assert!(matches!(
            validate_request(Decimal::ZERO, 10),
            Err(BusinessError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_request(Decimal::ONE, 0),
            Err(BusinessError::InvalidInput(_))
        ));
        assert!(validate_request(MAX_PRINCIPAL, MAX_LOAN_DAYS).is_ok());
        assert!(matches!(
            validate_request(MAX_PRINCIPAL + Decimal::ONE, 10),
            Err(BusinessError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_request(Decimal::ONE, MAX_LOAN_DAYS + 1),
            Err(BusinessError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_loan_ids_are_prefixed_and_unique() {
        let a = new_loan_id();
        let b = new_loan_id();
        assert!(a.starts_with("loan_"));
        assert_ne!(a, b);
    }
}
