//! Wallet ledger - per-user cash balances
//!
//! `set_balance` writes a whole value; callers compute the new amount.
//! Both writers hold the user's lock across their read-modify-write.

use crate::error::{BusinessError, BusinessResult};
use crate::services::ServiceContext;
use rcard_core::{EventType, UserId, CENTRAL_WALLET};
use rcard_persistence::BalanceRepo;
use rust_decimal::Decimal;
use tracing::info;

pub struct WalletLedger<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> WalletLedger<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Balance of one type, 0 when never set
    pub async fn get_balance(&self, user_id: UserId, balance_type: &str) -> BusinessResult<Decimal> {
        Ok(BalanceRepo::get(self.ctx.pool(), user_id, balance_type)
            .await?
            .unwrap_or(Decimal::ZERO))
    }

    pub async fn central_wallet(&self, user_id: UserId) -> BusinessResult<Decimal> {
        self.get_balance(user_id, CENTRAL_WALLET).await
    }

    /// Overwrite a balance
    pub async fn set_balance(
        &self,
        user_id: UserId,
        balance_type: &str,
        amount: Decimal,
    ) -> BusinessResult<()> {
        if amount < Decimal::ZERO {
            return Err(BusinessError::InvalidAmount(format!(
                "balance must not be negative: {}",
                amount
            )));
        }

        let _guard = self.ctx.lock_user(user_id).await;
        self.ctx.ensure_user(self.ctx.pool(), user_id).await?;
        BalanceRepo::set(self.ctx.pool(), user_id, balance_type, amount, self.ctx.now()).await?;

        info!(user_id, balance_type, %amount, "balance set");
        self.ctx.record(
            &self
                .ctx
                .event(EventType::BalanceSet, user_id)
                .with_amount(amount)
                .with_description(balance_type),
        );
        Ok(())
    }

    /// Add `amount` to the central wallet; returns the new balance
    pub async fn deposit(&self, user_id: UserId, amount: Decimal) -> BusinessResult<Decimal> {
        if amount <= Decimal::ZERO {
            return Err(BusinessError::InvalidAmount(format!(
                "deposit amount must be positive: {}",
                amount
            )));
        }

        let _guard = self.ctx.lock_user(user_id).await;
        let mut tx = self.ctx.pool().begin().await?;
        self.ctx.ensure_user(&mut *tx, user_id).await?;

        let current = BalanceRepo::get(&mut *tx, user_id, CENTRAL_WALLET)
            .await?
            .unwrap_or(Decimal::ZERO);
        let balance = current.checked_add(amount).ok_or_else(|| {
            BusinessError::InvalidAmount(format!("deposit of {} overflows the balance", amount))
        })?;
        BalanceRepo::set(&mut *tx, user_id, CENTRAL_WALLET, balance, self.ctx.now()).await?;
        tx.commit().await?;

        info!(user_id, %amount, %balance, "wallet deposit");
        self.ctx.record(
            &self
                .ctx
                .event(EventType::WalletDeposit, user_id)
                .with_amount(amount),
        );
        Ok(balance)
    }
}
