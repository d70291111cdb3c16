//! Shared fixtures for integration tests

#![allow(dead_code)]

use chrono::NaiveDate;
use rcard_business::{PlatformConfig, RcardApi, ServiceContext, Session};
use rcard_core::{CardType, Clock, FixedClock, Policy, PolicyCatalog};
use rcard_persistence::Database;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tempfile::TempDir;

pub const STARTER: &str = "starter-credit";

pub struct Harness {
    pub _dir: TempDir,
    pub clock: FixedClock,
    pub api: RcardApi,
}

impl Harness {
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Catalog with a 10%/month, cap 1000, min 5 days credit card
pub fn starter_config() -> PlatformConfig {
    let mut catalog = PolicyCatalog::builtin();
    let mut starter = Policy::fallback();
    starter.id = STARTER.to_string();
    starter.name = "Starter Credit".to_string();
    starter.card_type = CardType::Credit;
    starter.interest_rate_monthly = dec!(10);
    starter.max_yearly_loans = dec!(1000);
    starter.min_interest_days = 5;
    catalog.credit.push(starter);

    PlatformConfig {
        catalog,
        initial_wallet_balance: dec!(10000),
        ..PlatformConfig::default()
    }
}

pub async fn harness_with(config: PlatformConfig) -> Harness {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite:{}", dir.path().join("rcard.db").display());
    let db = Database::open(&url, dir.path().join("events")).await.unwrap();

    let clock = FixedClock::at_date(date(2026, 3, 1));
    let ctx = ServiceContext::new(db, config, Arc::new(clock.clone()));

    Harness {
        _dir: dir,
        clock,
        api: RcardApi::new(ctx),
    }
}

pub async fn harness() -> Harness {
    harness_with(starter_config()).await
}

/// Register and log in a user
pub async fn login(h: &Harness, username: &str) -> Session {
    h.api.register(username, "secret123").await.unwrap();
    h.api.login(username, "secret123").await.unwrap()
}
