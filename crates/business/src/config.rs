//! Platform configuration
//!
//! Loaded from a JSON file at startup. Every field has a default, so a
//! partial file (or none at all) yields a working configuration.

use crate::error::{BusinessError, BusinessResult};
use rcard_core::PolicyCatalog;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for the card and loan platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Card policy catalog
    #[serde(default = "PolicyCatalog::builtin")]
    pub catalog: PolicyCatalog,

    #[serde(default)]
    pub rate_limits: RateLimitConfig,

    /// Which principal counts toward the yearly borrowing cap
    #[serde(default)]
    pub yearly_cap_basis: YearlyCapBasis,

    /// Central wallet balance given to new users
    #[serde(default)]
    pub initial_wallet_balance: Decimal,

    #[serde(default = "default_min_password_len")]
    pub min_password_len: usize,
}

/// Principal used when summing a user's loans for the yearly cap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum YearlyCapBasis {
    /// Current (possibly partially repaid) principal
    #[default]
    LivePrincipal,
    /// Principal as borrowed, unaffected by repayments
    OriginalPrincipal,
}

/// Fixed-window limit: `max_attempts` per `window_secs`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub max_attempts: u32,
    pub window_secs: u64,
}

impl RateLimit {
    pub const fn new(max_attempts: u32, window_secs: u64) -> Self {
        Self {
            max_attempts,
            window_secs,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_login_limit")]
    pub login: RateLimit,
    #[serde(default = "default_loan_create_limit")]
    pub loan_create: RateLimit,
    #[serde(default = "default_api_limit")]
    pub api: RateLimit,
}

// Default value functions for serde
fn default_min_password_len() -> usize {
    6
}

fn default_login_limit() -> RateLimit {
    RateLimit::new(5, 300)
}

fn default_loan_create_limit() -> RateLimit {
    RateLimit::new(3, 60)
}

fn default_api_limit() -> RateLimit {
    RateLimit::new(100, 60)
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            login: default_login_limit(),
            loan_create: default_loan_create_limit(),
            api: default_api_limit(),
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            catalog: PolicyCatalog::builtin(),
            rate_limits: RateLimitConfig::default(),
            yearly_cap_basis: YearlyCapBasis::default(),
            initial_wallet_balance: Decimal::ZERO,
            min_password_len: default_min_password_len(),
        }
    }
}

impl PlatformConfig {
    /// Load from a JSON file and validate
    pub fn from_file(path: &Path) -> BusinessResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BusinessError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> BusinessResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| BusinessError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> BusinessResult<()> {
        self.catalog.validate()?;

        if self.initial_wallet_balance < Decimal::ZERO {
            return Err(BusinessError::InvalidConfig(
                "initial_wallet_balance must not be negative".to_string(),
            ));
        }
        if self.min_password_len == 0 {
            return Err(BusinessError::InvalidConfig(
                "min_password_len must be at least 1".to_string(),
            ));
        }

        let limits = [
            ("login", self.rate_limits.login),
            ("loan_create", self.rate_limits.loan_create),
            ("api", self.rate_limits.api),
        ];
        for (name, limit) in limits {
            if limit.max_attempts == 0 || limit.window_secs == 0 {
                return Err(BusinessError::InvalidConfig(format!(
                    "rate limit {} needs positive max_attempts and window_secs",
                    name
                )));
            }
        }

        Ok(())
    }
}
